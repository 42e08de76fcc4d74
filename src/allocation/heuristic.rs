//! TETAQ heuristic (C6, §4.6): maps a partial allocation to a value in
//! `[0,1]` (lower is better) blending an Allocation-Percent-Remaining term
//! with a Normalized-Schedule-Quality term obtained by running the MILP
//! scheduler (C5) on the allocation.

use crate::scheduling::{MutexPair, Schedule, SchedulingProblem};

use super::matrix::AllocationMatrix;
use super::problem::ItagsProblemInputs;

/// APR: fraction of the trait-requirement matrix left unmet by the
/// allocation's reduced traits (§4.6 "APR").
pub fn apr(problem: &ItagsProblemInputs, allocation: &AllocationMatrix) -> f64 {
    let norm = problem.trait_requirement_norm();
    if norm <= 0.0 {
        return 0.0;
    }
    let allocated = problem.reduction.reduce(allocation, &problem.robot_traits);
    let deficit: f64 = problem
        .trait_requirements
        .iter()
        .zip(allocated.iter())
        .flat_map(|(r_row, p_row)| r_row.iter().zip(p_row.iter()).map(|(r, p)| (r - p).max(0.0)))
        .sum();
    deficit / norm
}

/// The widest (largest `bounding_radius`) robot among `candidates`, breaking
/// ties by the lower robot index (§3 "Species", §4.5 "widest matters").
fn widest_robot(problem: &ItagsProblemInputs, candidates: &[usize]) -> Option<usize> {
    candidates
        .iter()
        .copied()
        .max_by(|&a, &b| {
            problem.robot_bounding_radius[a]
                .partial_cmp(&problem.robot_bounding_radius[b])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.cmp(&a))
        })
}

/// Builds the §4.5 scheduling problem implied by a fixed allocation: per-task
/// durations (widest assigned robot), per-task initial-transition lower
/// bounds, and mutex pairs for every pair of tasks sharing a robot (duration
/// taken from the widest shared robot, "widest matters").
pub fn build_scheduling_problem(problem: &ItagsProblemInputs, allocation: &AllocationMatrix) -> SchedulingProblem {
    let n = problem.num_tasks;
    let mut durations = Vec::with_capacity(n);
    let mut initial_transitions = vec![Vec::new(); n];

    for task in 0..n {
        let assigned = allocation.assigned_robots(task);
        if assigned.is_empty() {
            durations.push(None);
            continue;
        }
        let feasible: Vec<usize> = assigned.iter().copied().filter(|&r| problem.task_durations[task][r].is_some()).collect();
        let d = widest_robot(problem, &feasible).and_then(|r| problem.task_durations[task][r]);
        durations.push(d);
        for &r in &assigned {
            initial_transitions[task].push(problem.initial_transition[r][task]);
        }
    }

    let mut mutex_pairs = Vec::new();
    for i in 0..n {
        let assigned_i = allocation.assigned_robots(i);
        for j in (i + 1)..n {
            let assigned_j = allocation.assigned_robots(j);
            let shared: Vec<usize> = assigned_i.iter().filter(|r| assigned_j.contains(r)).copied().collect();
            if shared.is_empty() {
                continue;
            }
            let widest = widest_robot(problem, &shared).expect("shared is non-empty");
            let duration_i_to_j = problem.transition[widest][i][j];
            let duration_j_to_i = problem.transition[widest][j][i];
            mutex_pairs.push(MutexPair {
                i,
                j,
                duration_i_to_j,
                duration_j_to_i,
            });
        }
    }

    SchedulingProblem {
        durations,
        precedence: problem.precedence.clone(),
        initial_transitions,
        mutex_pairs,
    }
}

/// NSQ: makespan normalized by the problem's worst-case makespan constant,
/// or the worst-case value `1.0` if the scheduler finds the allocation
/// infeasible (§4.6 "NSQ").
pub fn nsq(problem: &ItagsProblemInputs, allocation: &AllocationMatrix) -> (f64, Option<Schedule>) {
    let scheduling_problem = build_scheduling_problem(problem, allocation);
    match crate::scheduling::milp::solve_schedule(&scheduling_problem) {
        Ok(schedule) => {
            let value = if problem.schedule_worst_makespan > 0.0 {
                schedule.makespan / problem.schedule_worst_makespan
            } else {
                1.0
            };
            (value, Some(schedule))
        }
        Err(_) => (1.0, None),
    }
}

/// h = alpha*APR + (1-alpha)*NSQ (§4.6 "Combined value"). Neither term is
/// admissible, so the search this heuristic drives must not rely on
/// no-reopening (§9 open question).
pub fn tetaq(problem: &ItagsProblemInputs, allocation: &AllocationMatrix) -> (f64, f64, Option<Schedule>) {
    let apr_value = apr(problem, allocation);
    let (nsq_value, schedule) = nsq(problem, allocation);
    let h = problem.alpha * apr_value + (1.0 - problem.alpha) * nsq_value;
    (h, apr_value, schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::reduction::RobotTraitsMatrixReduction;

    fn problem_with(requirements: Vec<Vec<f64>>, robot_traits: Vec<Vec<f64>>) -> ItagsProblemInputs {
        let num_tasks = requirements.len();
        let num_robots = robot_traits.len();
        let num_traits = robot_traits.first().map(|r| r.len()).unwrap_or(0);
        ItagsProblemInputs {
            num_tasks,
            num_robots,
            num_traits,
            trait_requirements: requirements,
            robot_traits,
            reduction: RobotTraitsMatrixReduction::matrix_multiply(num_tasks, num_traits),
            precedence: vec![],
            task_durations: vec![vec![Some(1.0); num_robots]; num_tasks],
            initial_transition: vec![vec![0.0; num_tasks]; num_robots],
            transition: vec![vec![vec![0.0; num_tasks]; num_tasks]; num_robots],
            robot_bounding_radius: vec![1.0; num_robots],
            alpha: 0.5,
            schedule_worst_makespan: 10.0,
            quality_bound: None,
            max_tasks_per_robot: None,
        }
    }

    #[test]
    fn apr_is_zero_when_fully_covered() {
        let problem = problem_with(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let mut allocation = AllocationMatrix::empty(2, 2);
        allocation.set_direct(0, 0, 1.0);
        allocation.set_direct(1, 1, 1.0);
        assert_eq!(apr(&problem, &allocation), 0.0);
    }

    #[test]
    fn apr_is_one_when_nothing_is_allocated() {
        let problem = problem_with(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let allocation = AllocationMatrix::empty(2, 2);
        assert_eq!(apr(&problem, &allocation), 1.0);
    }

    #[test]
    fn nsq_is_worst_case_for_empty_coalition() {
        let problem = problem_with(vec![vec![1.0]], vec![vec![1.0]]);
        let allocation = AllocationMatrix::empty(1, 1);
        let (value, schedule) = nsq(&problem, &allocation);
        assert_eq!(value, 1.0);
        assert!(schedule.is_none());
    }

    #[test]
    fn tetaq_blends_apr_and_nsq() {
        let problem = problem_with(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let mut allocation = AllocationMatrix::empty(2, 2);
        allocation.set_direct(0, 0, 1.0);
        allocation.set_direct(1, 1, 1.0);
        let (h, apr_value, schedule) = tetaq(&problem, &allocation);
        assert_eq!(apr_value, 0.0);
        assert!(schedule.is_some());
        assert!(h >= 0.0 && h <= 1.0);
    }
}
