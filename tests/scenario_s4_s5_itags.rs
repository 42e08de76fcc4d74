//! ITAGS minimal allocation and DITAGS add-robot repair, driven through
//! the public crate API.

use std::time::Duration;

use ditags::allocation::{ItagsProblemInputs, ItagsSearch, ProblemChange, RobotTraitsMatrixReduction};
use ditags::search::SearchOutcome;

fn s4_problem() -> ItagsProblemInputs {
    ItagsProblemInputs {
        num_tasks: 2,
        num_robots: 2,
        num_traits: 2,
        trait_requirements: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        robot_traits: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        reduction: RobotTraitsMatrixReduction::matrix_multiply(2, 2),
        precedence: vec![],
        task_durations: vec![vec![Some(3.0), Some(3.0)], vec![Some(5.0), Some(5.0)]],
        initial_transition: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        transition: vec![vec![vec![0.0, 0.0], vec![0.0, 0.0]]; 2],
        robot_bounding_radius: vec![1.0, 1.0],
        alpha: 0.5,
        schedule_worst_makespan: 10.0,
        quality_bound: None,
        max_tasks_per_robot: None,
    }
}

#[test]
fn s4_two_tasks_two_robots_fully_covered() {
    let mut search = ItagsSearch::new(s4_problem());
    let result = search.search(Some(Duration::from_secs(5)));

    assert_eq!(result.outcome, SearchOutcome::Goal);
    let goal = result.goal.unwrap();
    assert_eq!(goal.apr(), 0.0);
    assert!(goal.matrix.is_assigned(0, 0));
    assert!(goal.matrix.is_assigned(1, 1));
    let schedule = goal.schedule().unwrap();
    assert!((schedule.makespan - 5.0).abs() < 1e-6);
}

#[test]
fn s5_adding_a_robot_preserves_the_optimal_allocation_and_costs_fewer_expansions() {
    let mut search = ItagsSearch::new(s4_problem());
    let baseline = search.search(Some(Duration::from_secs(5)));
    assert_eq!(baseline.outcome, SearchOutcome::Goal);
    let fresh_solve_expansions = search.stats().nodes_expanded;

    let mut repaired_problem = s4_problem();
    repaired_problem.num_robots = 3;
    repaired_problem.robot_traits.push(vec![1.0, 1.0]);
    for row in repaired_problem.task_durations.iter_mut() {
        row.push(Some(3.0));
    }
    repaired_problem.initial_transition.push(vec![0.0, 0.0]);
    repaired_problem.transition.push(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    repaired_problem.robot_bounding_radius.push(1.0);

    let result = search.repair(repaired_problem, &[ProblemChange::RobotAdded(2)], Some(Duration::from_secs(5)));
    assert_eq!(result.outcome, SearchOutcome::Goal);
    let goal = result.goal.unwrap();
    assert!(goal.matrix.is_assigned(0, 0));
    assert!(goal.matrix.is_assigned(1, 1));

    let repair_expansions = search.stats().nodes_expanded - fresh_solve_expansions;
    assert!(repair_expansions < fresh_solve_expansions);
}
