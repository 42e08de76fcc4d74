//! Problem inputs for the allocation search (§6 "Problem input format").

use super::reduction::RobotTraitsMatrixReduction;

/// One task's requirements and the precomputed costs of assigning it to any
/// robot (§4.5 "Parameters"), already resolved against the motion planners
/// of §4.3 by the caller that builds an [`ItagsProblemInputs`].
#[derive(Debug, Clone)]
pub struct ItagsProblemInputs {
    pub num_tasks: usize,
    pub num_robots: usize,
    pub num_traits: usize,

    /// R: task x trait requirement matrix.
    pub trait_requirements: Vec<Vec<f64>>,
    /// T: robot x trait matrix.
    pub robot_traits: Vec<Vec<f64>>,
    pub reduction: RobotTraitsMatrixReduction,

    /// Precedence edges (i, j): task j cannot start before task i finishes.
    pub precedence: Vec<(usize, usize)>,

    /// duration[task][robot]: motion-plan duration of `robot` alone
    /// traversing `task`'s initial-to-terminal configuration. `d_i` for a
    /// coalition is taken from its widest assigned robot (§4.5, §3
    /// "widest matters" — largest `bounding_radius`, not largest duration).
    pub task_durations: Vec<Vec<Option<f64>>>,
    /// initial_transition[robot][task]: δ_r→i.
    pub initial_transition: Vec<Vec<f64>>,
    /// transition[robot][i][j]: τ_{i→j}^r.
    pub transition: Vec<Vec<Vec<f64>>>,
    /// Per-robot bounding radius, used to pick the "widest" robot of a
    /// coalition for `d_i` and for mutex transition durations (§3 "Species",
    /// §4.5 "widest matters").
    pub robot_bounding_radius: Vec<f64>,

    /// α in TETAQ's h = α·APR + (1−α)·NSQ.
    pub alpha: f64,
    /// worst_case_makespan, a problem-level constant used to normalize NSQ.
    pub schedule_worst_makespan: f64,
    /// Optional makespan bound the goal test must satisfy in addition to
    /// APR=0 (§4.7 "Goal test").
    pub quality_bound: Option<f64>,
    /// Capacity cap used by prepruning's "robot already at full
    /// utilization" check; `None` means robots have unlimited capacity.
    pub max_tasks_per_robot: Option<usize>,
}

impl ItagsProblemInputs {
    pub fn trait_requirement_norm(&self) -> f64 {
        self.trait_requirements.iter().flatten().sum()
    }
}

/// A single (task, robot) assignment flipped on in the allocation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub task: usize,
    pub robot: usize,
}
