//! Error taxonomy shared by every component boundary in the crate.
//!
//! Four kinds, matching the design doc: contract violations (fatal, not
//! recovered), resource exhaustion (a typed search-result variant the caller
//! may recover from), solver infeasibility (local, silent, folded into a
//! heuristic's worst-case value by the caller), and external-interface
//! errors (fatal at the process boundary, never seen by the core).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrstapseError {
    /// A contract violation: malformed input that should never occur if
    /// callers respect the type-level invariants (non-square matrix, a task
    /// network with a cycle, a heuristic producing NaN, ...).
    #[error("logic error at {location}: {message}")]
    LogicError {
        location: &'static str,
        message: String,
    },

    /// A search exhausted its time budget or its open set before reaching a
    /// goal.
    #[error("search {search} timed out or exhausted its open set: {reason}")]
    NoGoal { search: &'static str, reason: NoGoalReason },

    /// A sub-solver (MILP scheduler, motion planner) proved the query it was
    /// handed has no solution.
    #[error("{solver} reported infeasibility: {detail}")]
    SolverInfeasible {
        solver: &'static str,
        detail: String,
    },

    /// A boundary format (JSON, XML) failed to parse or was missing a
    /// required field.
    #[error("failed to read {format} input: {source}")]
    InterfaceError {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoGoalReason {
    Timeout,
    OpenSetExhausted,
}

impl std::fmt::Display for NoGoalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoGoalReason::Timeout => write!(f, "timeout"),
            NoGoalReason::OpenSetExhausted => write!(f, "open set exhausted"),
        }
    }
}

impl GrstapseError {
    pub fn logic(location: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        // Aborts in debug builds per the contract-violation policy; release
        // builds fall through and return the typed error so an embedding
        // caller still gets a chance to report it.
        debug_assert!(false, "logic error at {location}: {message}");
        GrstapseError::LogicError { location, message }
    }

    pub fn solver_infeasible(solver: &'static str, detail: impl Into<String>) -> Self {
        GrstapseError::SolverInfeasible {
            solver,
            detail: detail.into(),
        }
    }

    pub fn no_goal(search: &'static str, reason: NoGoalReason) -> Self {
        GrstapseError::NoGoal { search, reason }
    }

    pub fn interface(format: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        GrstapseError::InterfaceError {
            format,
            source: Box::new(source),
        }
    }

    /// The `status` token written into the §6 solver-output document.
    pub fn status(&self) -> &'static str {
        match self {
            GrstapseError::LogicError { .. } => "solver_error",
            GrstapseError::NoGoal { .. } => "timeout",
            GrstapseError::SolverInfeasible { .. } => "infeasible",
            GrstapseError::InterfaceError { .. } => "solver_error",
        }
    }

    /// The `reason` diagnostic string written alongside `status`.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, GrstapseError>;
