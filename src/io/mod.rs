//! External I/O layer (C8, §6): JSON/XML problem documents, environment
//! loading, resolution against the motion planners of §4.3, and the
//! solver-output document. The library core (allocation, search, geometry,
//! scheduling) never depends on this module; only [`crate::io`] depends on
//! them.

pub mod build;
pub mod environment;
pub mod model;
pub mod output;
pub mod persist;

pub use build::{build_problem, build_problem_from_document};
pub use environment::{load_grid_map, load_point_graph, load_sampled_point_graph, Environment};
pub use model::{EnvironmentSpec, ProblemDocument};
pub use output::{build_success_output, SolverOutput};
pub use persist::{PersistedSearch, PERSISTED_SEARCH_VERSION};
