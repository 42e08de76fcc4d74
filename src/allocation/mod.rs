//! Simultaneous task allocation (ITAGS/DITAGS, C6+C7): a TETAQ-heuristic A*
//! over partial task/robot allocation matrices, with an incremental repair
//! discipline for when the underlying problem changes mid-search.

pub mod heuristic;
pub mod matrix;
pub mod problem;
pub mod reduction;
pub mod search;

pub use heuristic::{apr, nsq, tetaq};
pub use matrix::{AllocationMatrix, AllocationNode};
pub use problem::{Assignment, ItagsProblemInputs};
pub use reduction::{threshold_cumulative, ReductionKind, RobotTraitsMatrixReduction};
pub use search::{AllocationSearchNode, ItagsSearch, ItagsSearchResult, ProblemChange};
