//! Solver-output document (§6 "solver output"): allocation matrix, per-task
//! start/finish times, makespan, and motion plans on success; a typed
//! `status`/`reason` pair on failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationSearchNode;
use crate::error::{GrstapseError, Result};

use super::build::MotionPlanners;
use super::environment::Environment;
use super::model::{ConfigurationSpec, ProblemDocument};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskScheduleEntry {
    pub task: String,
    pub robots: Vec<String>,
    pub start: f64,
    pub finish: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotMotionPlan {
    pub robot: String,
    /// Concatenated legs: initial-to-first-task, then task-to-task, in the
    /// order this robot's assigned tasks run per the schedule.
    pub path: Vec<ConfigurationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolverOutput {
    Success {
        allocation: Vec<Vec<bool>>,
        schedule: Vec<TaskScheduleEntry>,
        makespan: f64,
        motion_plans: Vec<RobotMotionPlan>,
    },
    Timeout { reason: String },
    Infeasible { reason: String },
    SolverError { reason: String },
}

impl SolverOutput {
    pub fn from_error(err: &GrstapseError) -> Self {
        match err.status() {
            "timeout" => SolverOutput::Timeout { reason: err.reason() },
            "infeasible" => SolverOutput::Infeasible { reason: err.reason() },
            _ => SolverOutput::SolverError { reason: err.reason() },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GrstapseError::interface("json", e))
    }
}

/// Builds the success document for a goal node (§6), re-querying the
/// environment's motion planners for each robot's realized route.
pub fn build_success_output(
    doc: &ProblemDocument,
    environment: &Environment,
    goal: &AllocationSearchNode,
    timeout: Option<Duration>,
) -> Result<SolverOutput> {
    let matrix = &goal.matrix;
    let schedule = goal
        .schedule()
        .ok_or_else(|| GrstapseError::logic("io::output", "goal node has no associated schedule"))?;

    let allocation: Vec<Vec<bool>> = (0..matrix.num_tasks())
        .map(|task| (0..matrix.num_robots()).map(|robot| matrix.is_assigned(task, robot)).collect())
        .collect();

    let schedule_entries: Vec<TaskScheduleEntry> = (0..matrix.num_tasks())
        .map(|task| TaskScheduleEntry {
            task: doc.tasks[task].name.clone(),
            robots: matrix.assigned_robots(task).into_iter().map(|r| doc.robots[r].name.clone()).collect(),
            start: schedule.starts[task],
            finish: schedule.finishes[task],
        })
        .collect();

    let planners = MotionPlanners::new(environment);
    let mut motion_plans = Vec::with_capacity(doc.robots.len());
    for (robot_idx, robot) in doc.robots.iter().enumerate() {
        let species = doc
            .species
            .iter()
            .find(|s| s.name == robot.species)
            .ok_or_else(|| GrstapseError::logic("io::output", format!("robot references undeclared species '{}'", robot.species)))?;

        let mut tasks: Vec<usize> = (0..matrix.num_tasks()).filter(|&t| matrix.is_assigned(t, robot_idx)).collect();
        tasks.sort_by(|&a, &b| schedule.starts[a].partial_cmp(&schedule.starts[b]).unwrap());

        let mut path = Vec::new();
        let mut cursor = robot.initial_configuration;
        for &task in &tasks {
            let leg = planners.path(species, &species.name, &cursor, &doc.tasks[task].initial_configuration, timeout)?;
            path.extend(leg);
            cursor = doc.tasks[task].terminal_configuration;
        }
        motion_plans.push(RobotMotionPlan {
            robot: robot.name.clone(),
            path,
        });
    }

    Ok(SolverOutput::Success {
        allocation,
        schedule: schedule_entries,
        makespan: schedule.makespan,
        motion_plans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_error_maps_to_timeout_status() {
        let err = GrstapseError::no_goal("itags", crate::error::NoGoalReason::Timeout);
        let output = SolverOutput::from_error(&err);
        assert!(matches!(output, SolverOutput::Timeout { .. }));
    }

    #[test]
    fn solver_infeasible_error_maps_to_infeasible_status() {
        let err = GrstapseError::solver_infeasible("milp_scheduler", "no schedule");
        let output = SolverOutput::from_error(&err);
        assert!(matches!(output, SolverOutput::Infeasible { .. }));
    }
}
