//! CBS vertex and edge conflict resolution, driven through the public
//! crate API.

use std::collections::HashSet;
use std::sync::Arc;

use ditags::geometry::{GridCell, GridMap};
use ditags::mapf::{get_first_conflict, CbsCostFunction, CbsProblem, ConflictBasedSearch};

#[test]
fn s2_vertex_conflict_on_a_three_wide_corridor() {
    let map = Arc::new(GridMap::new(3, 1, HashSet::new()));
    let starts = vec![GridCell::new(0, 0), GridCell::new(2, 0)];
    let goals = vec![GridCell::new(2, 0), GridCell::new(0, 0)];

    let problem = CbsProblem::new(map, starts, goals, CbsCostFunction::Makespan, None);
    let mut cbs = ConflictBasedSearch::new(problem);
    let solution = cbs.solve(Some(std::time::Duration::from_secs(5))).unwrap();

    assert_eq!(solution.cost, 3.0);
    assert!(get_first_conflict(&solution.trajectories).is_none());
}

#[test]
fn s3_edge_conflict_on_a_two_wide_corridor() {
    let map = Arc::new(GridMap::new(2, 1, HashSet::new()));
    let starts = vec![GridCell::new(0, 0), GridCell::new(1, 0)];
    let goals = vec![GridCell::new(1, 0), GridCell::new(0, 0)];

    let problem = CbsProblem::new(map, starts, goals, CbsCostFunction::Makespan, None);
    let mut cbs = ConflictBasedSearch::new(problem);
    let solution = cbs.solve(Some(std::time::Duration::from_secs(5))).unwrap();

    assert!(solution.cost >= 2.0);
    assert!(get_first_conflict(&solution.trajectories).is_none());
}
