//! Raw problem-input schema (§6 "Problem input format"): the JSON-facing
//! structs `serde_json` deserializes directly, before [`super::build`]
//! resolves them against an environment into an [`crate::allocation::ItagsProblemInputs`].

use serde::{Deserialize, Serialize};

use crate::geometry::{GridCell, PointGraphConfiguration, Se2Configuration};

use super::environment::{GridMapDocument, PointGraphDocument, SampledPointGraphDocument};

/// The environment a problem document's motion queries resolve against,
/// embedded inline so a `solve`/`repair` call only needs one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentSpec {
    Grid(GridMapDocument),
    PointGraph(PointGraphDocument),
    SampledPointGraph(SampledPointGraphDocument),
}

/// Endpoint configuration as written in a problem document. Untagged: the
/// variant is inferred from which fields are present, so a document never
/// has to name its own configuration type twice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigurationSpec {
    #[serde(deny_unknown_fields)]
    Grid { x: i32, y: i32 },
    #[serde(deny_unknown_fields)]
    PointGraph { id: u32, x: f64, y: f64 },
    #[serde(deny_unknown_fields)]
    Se2 { x: f64, y: f64, yaw: f64 },
}

impl ConfigurationSpec {
    pub fn as_grid_cell(&self) -> Option<GridCell> {
        match self {
            ConfigurationSpec::Grid { x, y } => Some(GridCell::new(*x, *y)),
            _ => None,
        }
    }

    pub fn as_point_graph_configuration(&self) -> Option<PointGraphConfiguration> {
        match self {
            ConfigurationSpec::PointGraph { id, x, y } => Some(PointGraphConfiguration::new(*id, *x, *y)),
            _ => None,
        }
    }

    pub fn as_se2_configuration(&self) -> Option<Se2Configuration> {
        match self {
            ConfigurationSpec::Se2 { x, y, yaw } => Some(Se2Configuration::new(*x, *y, *yaw)),
            _ => None,
        }
    }
}

/// Which planner (§4.3) resolves a species' motion queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPlannerType {
    Grid,
    PointGraph,
    SampledPointGraph,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSpec {
    pub name: String,
    pub motion_planner_type: MotionPlannerType,
    /// Bounding radius, used to pick the "widest" robot of a coalition for
    /// task duration and mutex transition times (§3 "Species", §4.5).
    pub bounding_radius: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotSpec {
    pub name: String,
    pub species: String,
    pub initial_configuration: ConfigurationSpec,
    /// This robot's own row of the robot x trait matrix T (§3).
    pub traits: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub initial_configuration: ConfigurationSpec,
    pub terminal_configuration: ConfigurationSpec,
    /// This task's row of the task x trait requirement matrix R (§3).
    pub requirements: Vec<f64>,
}

/// One cell's reduction strategy, as written in a document (§4.6). The
/// `Custom` variant of [`crate::allocation::ReductionKind`] has no JSON
/// representation — a document cannot describe an arbitrary closure — so
/// custom reductions are only reachable by embedding this crate as a
/// library and calling [`crate::allocation::RobotTraitsMatrixReduction::with_custom_functions`]
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionCellSpec {
    Sum,
    Product,
    Min,
    Max,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionSpec {
    /// §4.6 fast path: every cell sums (reduction is a plain matrix product).
    MatrixMultiply,
    PerCell { kinds: Vec<Vec<ReductionCellSpec>> },
}

/// Top-level problem document (§6 "External interfaces").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDocument {
    pub robots: Vec<RobotSpec>,
    pub species: Vec<SpeciesSpec>,
    pub tasks: Vec<TaskSpec>,
    pub environment: EnvironmentSpec,
    #[serde(default)]
    pub precedence_constraints: Vec<(usize, usize)>,
    pub robot_traits_matrix_reduction: ReductionSpec,
    pub alpha: f64,
    pub schedule_worst_makespan: f64,
    #[serde(default)]
    pub quality_bound: Option<f64>,
    #[serde(default)]
    pub max_tasks_per_robot: Option<usize>,
}
