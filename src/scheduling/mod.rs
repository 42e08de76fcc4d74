//! MILP scheduling (C5, §4.5): deterministic and stochastic scenario
//! variants over a fixed allocation's durations and transitions.

pub mod milp;
pub mod stochastic;

pub use milp::{MutexPair, Schedule, SchedulingProblem};
pub use stochastic::{acceptance_fraction, solve_scenarios, ScenarioProblem};
