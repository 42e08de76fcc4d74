//! Resolves a raw [`ProblemDocument`] plus its [`Environment`] into a fully
//! resolved [`ItagsProblemInputs`] (§6 "resolved against the motion
//! planners of §4.3"), by querying the species' motion planner for every
//! task duration, initial transition, and inter-task transition.

use std::time::Duration;

use log::debug;

use crate::allocation::{ItagsProblemInputs, ReductionKind, RobotTraitsMatrixReduction};
use crate::error::{GrstapseError, Result};
use crate::geometry::{GridMotionPlanner, MemoizedMotionPlanner, MotionPlanResult, PointGraphMotionPlanner};

use super::environment::Environment;
use super::model::{ConfigurationSpec, MotionPlannerType, ProblemDocument, ReductionCellSpec, ReductionSpec, SpeciesSpec};

fn malformed(detail: impl Into<String>) -> GrstapseError {
    GrstapseError::interface(
        "problem_document",
        std::io::Error::new(std::io::ErrorKind::InvalidData, detail.into()),
    )
}

fn reduction_kind(spec: ReductionCellSpec) -> ReductionKind {
    match spec {
        ReductionCellSpec::Sum => ReductionKind::Sum,
        ReductionCellSpec::Product => ReductionKind::Product,
        ReductionCellSpec::Min => ReductionKind::Min,
        ReductionCellSpec::Max => ReductionKind::Max,
    }
}

fn build_reduction(spec: &ReductionSpec, num_tasks: usize, num_traits: usize) -> RobotTraitsMatrixReduction {
    match spec {
        ReductionSpec::MatrixMultiply => RobotTraitsMatrixReduction::matrix_multiply(num_tasks, num_traits),
        ReductionSpec::PerCell { kinds } => {
            RobotTraitsMatrixReduction::per_cell(kinds.iter().map(|row| row.iter().map(|k| reduction_kind(*k)).collect()).collect())
        }
    }
}

fn species_lookup<'a>(doc: &'a ProblemDocument, name: &str) -> Result<&'a SpeciesSpec> {
    doc.species
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| malformed(format!("robot references undeclared species '{name}'")))
}

/// Resolves one directed motion-plan query to a duration, dispatching on the
/// species' declared planner type and failing loudly if the environment
/// doesn't carry the matching planner or the endpoints are the wrong
/// configuration variant.
pub(crate) struct MotionPlanners {
    grid: Option<MemoizedMotionPlanner<String, crate::geometry::GridCell, GridMotionPlanner>>,
    point_graph: Option<MemoizedMotionPlanner<String, crate::geometry::PointGraphConfiguration, PointGraphMotionPlanner>>,
}

impl MotionPlanners {
    pub(crate) fn new(environment: &Environment) -> Self {
        MotionPlanners {
            grid: environment.grid.clone().map(|map| MemoizedMotionPlanner::new(GridMotionPlanner::new(map))),
            point_graph: environment
                .point_graph
                .clone()
                .map(|graph| MemoizedMotionPlanner::new(PointGraphMotionPlanner::new(graph))),
        }
    }

    pub(crate) fn duration(
        &self,
        species: &SpeciesSpec,
        species_id: &str,
        from: &ConfigurationSpec,
        to: &ConfigurationSpec,
        timeout: Option<Duration>,
    ) -> Result<f64> {
        match species.motion_planner_type {
            MotionPlannerType::Grid => {
                let planner = self.grid.as_ref().ok_or_else(|| malformed("species declares a grid planner but no grid map was loaded"))?;
                let from = from.as_grid_cell().ok_or_else(|| malformed("expected a grid configuration"))?;
                let to = to.as_grid_cell().ok_or_else(|| malformed("expected a grid configuration"))?;
                let result = planner.query(species_id.to_string(), &species_id.to_string(), &from, &to, timeout);
                Ok(duration_from_result(&result, species.speed))
            }
            MotionPlannerType::PointGraph => {
                let planner = self
                    .point_graph
                    .as_ref()
                    .ok_or_else(|| malformed("species declares a point-graph planner but no point graph was loaded"))?;
                let from = from.as_point_graph_configuration().ok_or_else(|| malformed("expected a point-graph configuration"))?;
                let to = to.as_point_graph_configuration().ok_or_else(|| malformed("expected a point-graph configuration"))?;
                let result = planner.query(species_id.to_string(), &species_id.to_string(), &from, &to, timeout);
                Ok(duration_from_result(&result, species.speed))
            }
            MotionPlannerType::SampledPointGraph => {
                // The deterministic allocation search resolves against the
                // nominal (scenario 0) sample; the stochastic scheduler
                // (§4.5) queries every scenario independently at schedule
                // time instead of through this path.
                Err(malformed("sampled point-graph species are not resolvable by the deterministic problem builder"))
            }
        }
    }

    /// Re-resolves the actual path (not just its duration) for one leg of a
    /// robot's realized route, for the solver-output document's motion
    /// plans (§6). Relies on the same memoization cache `duration` already
    /// populated, so this rarely issues a fresh query.
    pub(crate) fn path(
        &self,
        species: &SpeciesSpec,
        species_id: &str,
        from: &ConfigurationSpec,
        to: &ConfigurationSpec,
        timeout: Option<Duration>,
    ) -> Result<Vec<ConfigurationSpec>> {
        match species.motion_planner_type {
            MotionPlannerType::Grid => {
                let planner = self.grid.as_ref().ok_or_else(|| malformed("species declares a grid planner but no grid map was loaded"))?;
                let from = from.as_grid_cell().ok_or_else(|| malformed("expected a grid configuration"))?;
                let to = to.as_grid_cell().ok_or_else(|| malformed("expected a grid configuration"))?;
                match planner.query(species_id.to_string(), &species_id.to_string(), &from, &to, timeout) {
                    MotionPlanResult::Success { path, .. } => Ok(path.into_iter().map(|c| ConfigurationSpec::Grid { x: c.x, y: c.y }).collect()),
                    _ => Ok(Vec::new()),
                }
            }
            MotionPlannerType::PointGraph => {
                let planner = self
                    .point_graph
                    .as_ref()
                    .ok_or_else(|| malformed("species declares a point-graph planner but no point graph was loaded"))?;
                let from = from.as_point_graph_configuration().ok_or_else(|| malformed("expected a point-graph configuration"))?;
                let to = to.as_point_graph_configuration().ok_or_else(|| malformed("expected a point-graph configuration"))?;
                match planner.query(species_id.to_string(), &species_id.to_string(), &from, &to, timeout) {
                    MotionPlanResult::Success { path, .. } => {
                        Ok(path.into_iter().map(|c| ConfigurationSpec::PointGraph { id: c.id, x: c.x, y: c.y }).collect())
                    }
                    _ => Ok(Vec::new()),
                }
            }
            MotionPlannerType::SampledPointGraph => Ok(Vec::new()),
        }
    }
}

fn duration_from_result<C>(result: &MotionPlanResult<C>, speed: f64) -> f64 {
    match result.length() {
        Some(length) if speed > 0.0 => length / speed,
        _ => -1.0,
    }
}

/// Builds the fully-resolved [`ItagsProblemInputs`] for `doc` against
/// `environment` (§6). `timeout` bounds each individual motion-plan query,
/// not the resolution pass as a whole.
pub fn build_problem(doc: &ProblemDocument, environment: &Environment, timeout: Option<Duration>) -> Result<ItagsProblemInputs> {
    let num_robots = doc.robots.len();
    let num_tasks = doc.tasks.len();
    let num_traits = doc.tasks.first().map(|t| t.requirements.len()).unwrap_or(0);

    let planners = MotionPlanners::new(environment);

    let robot_species: Vec<&SpeciesSpec> = doc
        .robots
        .iter()
        .map(|r| species_lookup(doc, &r.species))
        .collect::<Result<_>>()?;

    debug!("resolving problem: {num_robots} robots, {num_tasks} tasks, {num_traits} traits");

    let mut task_durations = vec![vec![None; num_robots]; num_tasks];
    for (task_idx, task) in doc.tasks.iter().enumerate() {
        for (robot_idx, species) in robot_species.iter().enumerate() {
            let duration = planners.duration(
                species,
                &species.name,
                &task.initial_configuration,
                &task.terminal_configuration,
                timeout,
            )?;
            task_durations[task_idx][robot_idx] = if duration >= 0.0 { Some(duration) } else { None };
        }
    }

    let mut initial_transition = vec![vec![0.0; num_tasks]; num_robots];
    for (robot_idx, robot) in doc.robots.iter().enumerate() {
        let species = robot_species[robot_idx];
        for (task_idx, task) in doc.tasks.iter().enumerate() {
            let duration = planners.duration(species, &species.name, &robot.initial_configuration, &task.initial_configuration, timeout)?;
            initial_transition[robot_idx][task_idx] = duration.max(0.0);
        }
    }

    let mut transition = vec![vec![vec![0.0; num_tasks]; num_tasks]; num_robots];
    for robot_idx in 0..num_robots {
        let species = robot_species[robot_idx];
        for (i, task_i) in doc.tasks.iter().enumerate() {
            for (j, task_j) in doc.tasks.iter().enumerate() {
                if i == j {
                    continue;
                }
                let duration = planners.duration(species, &species.name, &task_i.terminal_configuration, &task_j.initial_configuration, timeout)?;
                transition[robot_idx][i][j] = duration.max(0.0);
            }
        }
    }

    let robot_traits: Vec<Vec<f64>> = doc.robots.iter().map(|r| r.traits.clone()).collect();
    let robot_bounding_radius: Vec<f64> = robot_species.iter().map(|s| s.bounding_radius).collect();
    let trait_requirements: Vec<Vec<f64>> = doc.tasks.iter().map(|t| t.requirements.clone()).collect();
    let reduction = build_reduction(&doc.robot_traits_matrix_reduction, num_tasks, num_traits);

    Ok(ItagsProblemInputs {
        num_tasks,
        num_robots,
        num_traits,
        trait_requirements,
        robot_traits,
        reduction,
        precedence: doc.precedence_constraints.clone(),
        task_durations,
        initial_transition,
        transition,
        robot_bounding_radius,
        alpha: doc.alpha,
        schedule_worst_makespan: doc.schedule_worst_makespan,
        quality_bound: doc.quality_bound,
        max_tasks_per_robot: doc.max_tasks_per_robot,
    })
}

/// Resolves `doc`'s embedded environment and then its problem inputs in one
/// call (§6, the `solve`/`repair` CLI entry points' single-file path).
pub fn build_problem_from_document(doc: &ProblemDocument, timeout: Option<Duration>) -> Result<(ItagsProblemInputs, Environment)> {
    let environment = Environment::from_spec(&doc.environment)?;
    let inputs = build_problem(doc, &environment, timeout)?;
    Ok((inputs, environment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::model::{RobotSpec, TaskSpec};

    fn grid_config(x: i32, y: i32) -> ConfigurationSpec {
        ConfigurationSpec::Grid { x, y }
    }

    #[test]
    fn resolves_durations_against_a_grid_environment() {
        let map = grid_map();
        let doc = ProblemDocument {
            robots: vec![RobotSpec {
                name: "r0".to_string(),
                species: "ground".to_string(),
                initial_configuration: grid_config(0, 0),
                traits: vec![1.0],
            }],
            species: vec![SpeciesSpec {
                name: "ground".to_string(),
                motion_planner_type: MotionPlannerType::Grid,
                bounding_radius: 0.5,
                speed: 1.0,
            }],
            tasks: vec![TaskSpec {
                name: "t0".to_string(),
                initial_configuration: grid_config(0, 0),
                terminal_configuration: grid_config(2, 0),
                requirements: vec![1.0],
            }],
            environment: crate::io::model::EnvironmentSpec::Grid(crate::io::environment::GridMapDocument {
                width: 3,
                height: 3,
                obstacles: vec![],
            }),
            precedence_constraints: vec![],
            robot_traits_matrix_reduction: ReductionSpec::PerCell {
                kinds: vec![vec![ReductionCellSpec::Sum]],
            },
            alpha: 0.5,
            schedule_worst_makespan: 10.0,
            quality_bound: None,
            max_tasks_per_robot: None,
        };
        let environment = Environment {
            grid: Some(map),
            point_graph: None,
            sampled_point_graph: None,
        };

        let inputs = build_problem(&doc, &environment, None).unwrap();
        assert_eq!(inputs.task_durations[0][0], Some(2.0));
    }

    fn grid_map() -> std::sync::Arc<crate::geometry::GridMap> {
        std::sync::Arc::new(crate::geometry::GridMap::new(3, 3, std::collections::HashSet::new()))
    }
}
