//! MILP scheduler (C5, §4.5): given a fixed allocation's per-task durations
//! and transition times, computes start/finish times minimizing makespan.

use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use log::warn;

use crate::error::{GrstapseError, Result};

/// A mutex pair: two tasks whose assigned coalitions share a robot, so they
/// cannot run concurrently (§4.5 "Mutex").
#[derive(Debug, Clone, Copy)]
pub struct MutexPair {
    pub i: usize,
    pub j: usize,
    /// τ_{i→j}: transition duration from i's terminal to j's initial
    /// configuration, widest shared robot.
    pub duration_i_to_j: f64,
    /// τ_{j→i}: the reverse transition.
    pub duration_j_to_i: f64,
}

/// Everything the scheduler needs for one allocation (§4.5 "Variables",
/// "Parameters").
#[derive(Debug, Clone, Default)]
pub struct SchedulingProblem {
    /// d_i per task; `None` means the task's coalition is empty (infeasible).
    pub durations: Vec<Option<f64>>,
    /// (i, j) precedence edges: s_j ≥ f_i.
    pub precedence: Vec<(usize, usize)>,
    /// δ_r→i per task: every assigned robot's initial-transition duration.
    pub initial_transitions: Vec<Vec<f64>>,
    pub mutex_pairs: Vec<MutexPair>,
}

impl SchedulingProblem {
    pub fn num_tasks(&self) -> usize {
        self.durations.len()
    }
}

#[derive(Debug, Clone)]
pub struct Schedule {
    pub starts: Vec<f64>,
    pub finishes: Vec<f64>,
    pub makespan: f64,
}

/// A conservative big-M: no feasible start/finish in this problem can exceed
/// the sum of every duration and transition in it.
fn big_m(problem: &SchedulingProblem) -> f64 {
    let duration_sum: f64 = problem.durations.iter().filter_map(|d| *d).sum();
    let initial_sum: f64 = problem.initial_transitions.iter().flatten().sum();
    let mutex_sum: f64 = problem
        .mutex_pairs
        .iter()
        .map(|m| m.duration_i_to_j + m.duration_j_to_i)
        .sum();
    (duration_sum + initial_sum + mutex_sum + 1.0).max(1.0)
}

/// Solves §4.5's MILP for a single (deterministic) scenario.
///
/// Fails early with [`GrstapseError::SolverInfeasible`] if any task has an
/// empty coalition (`durations[i] == None`), matching "if deterministic
/// duration d_i is negative, fail early".
pub fn solve_schedule(problem: &SchedulingProblem) -> Result<Schedule> {
    if problem.durations.iter().any(|d| d.is_none()) {
        warn!("scheduling problem has a task with an empty assigned coalition, failing early");
        return Err(GrstapseError::solver_infeasible(
            "milp_scheduler",
            "task has an empty assigned coalition",
        ));
    }

    let n = problem.num_tasks();
    let m = big_m(problem);

    let mut vars = ProblemVariables::new();
    let starts: Vec<Variable> = (0..n).map(|_| vars.add(variable().min(0.0))).collect();
    let finishes: Vec<Variable> = (0..n).map(|_| vars.add(variable().min(0.0))).collect();
    let makespan = vars.add(variable().min(0.0));
    let mutex_flags: Vec<Variable> = problem.mutex_pairs.iter().map(|_| vars.add(variable().binary())).collect();

    let mut model = coin_cbc(vars.minimise(makespan));
    model.set_parameter("logLevel", "0");

    for i in 0..n {
        let d = problem.durations[i].unwrap();
        model.add_constraint(constraint!(finishes[i] == starts[i] + d));
        model.add_constraint(constraint!(makespan >= finishes[i]));
        for &delta in &problem.initial_transitions[i] {
            model.add_constraint(constraint!(starts[i] >= delta));
        }
    }

    for &(i, j) in &problem.precedence {
        model.add_constraint(constraint!(starts[j] >= finishes[i]));
    }

    for (idx, pair) in problem.mutex_pairs.iter().enumerate() {
        let p = mutex_flags[idx];
        let i = pair.i;
        let j = pair.j;
        // p=1 => s_j >= f_i + tau_i_to_j; p=0 => s_i >= f_j + tau_j_to_i.
        let not_p: Expression = Expression::from(1.0) - p;
        let lhs_a: Expression = starts[j] - finishes[i] - pair.duration_i_to_j + m * not_p;
        model.add_constraint(constraint!(lhs_a >= 0));
        let lhs_b: Expression = starts[i] - finishes[j] - pair.duration_j_to_i + m * p;
        model.add_constraint(constraint!(lhs_b >= 0));
    }

    let solution = model.solve().map_err(|e| {
        warn!("coin_cbc reported infeasibility: {e:?}");
        GrstapseError::solver_infeasible("milp_scheduler", format!("{e:?}"))
    })?;

    Ok(Schedule {
        starts: starts.iter().map(|v| solution.value(*v)).collect(),
        finishes: finishes.iter().map(|v| solution.value(*v)).collect(),
        makespan: solution.value(makespan),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_independent_tasks_run_concurrently() {
        let problem = SchedulingProblem {
            durations: vec![Some(3.0), Some(5.0)],
            precedence: vec![],
            initial_transitions: vec![vec![], vec![]],
            mutex_pairs: vec![],
        };
        let schedule = solve_schedule(&problem).unwrap();
        assert!((schedule.makespan - 5.0).abs() < 1e-6);
    }

    #[test]
    fn precedence_forces_sequential_execution() {
        let problem = SchedulingProblem {
            durations: vec![Some(3.0), Some(5.0)],
            precedence: vec![(0, 1)],
            initial_transitions: vec![vec![], vec![]],
            mutex_pairs: vec![],
        };
        let schedule = solve_schedule(&problem).unwrap();
        assert!(schedule.starts[1] >= schedule.finishes[0] - 1e-6);
        assert!((schedule.makespan - 8.0).abs() < 1e-6);
    }

    #[test]
    fn mutex_pair_separates_overlapping_tasks() {
        let problem = SchedulingProblem {
            durations: vec![Some(4.0), Some(4.0)],
            precedence: vec![],
            initial_transitions: vec![vec![], vec![]],
            mutex_pairs: vec![MutexPair {
                i: 0,
                j: 1,
                duration_i_to_j: 1.0,
                duration_j_to_i: 1.0,
            }],
        };
        let schedule = solve_schedule(&problem).unwrap();
        let disjoint = schedule.starts[1] >= schedule.finishes[0] - 1e-6 + 1.0 - 1e-6
            || schedule.starts[0] >= schedule.finishes[1] - 1e-6 + 1.0 - 1e-6;
        assert!(disjoint);
    }

    #[test]
    fn empty_coalition_is_infeasible() {
        let problem = SchedulingProblem {
            durations: vec![None],
            precedence: vec![],
            initial_transitions: vec![vec![]],
            mutex_pairs: vec![],
        };
        assert!(solve_schedule(&problem).is_err());
    }
}
