//! Conflict-Based Search (C4): multi-agent pathfinding over a shared grid
//! via a low-level constrained space-time A* (§4.4) and a high-level
//! constraint-tree search (§4.4, §3 "Constraint tree node (CBS)").

pub mod constraint;
pub mod conflict;
pub mod low_level;
pub mod high_level;

pub use conflict::{get_first_conflict, position_at, Conflict};
pub use constraint::Constraint;
pub use high_level::{CbsCostFunction, CbsProblem, ConflictBasedSearch, ConstraintTreeNode, MapfSolution};
pub use low_level::{solve_space_time_path, SpaceTimeAstarProblem, TemporalGridCell};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GridCell, GridMap};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn agents_on_disjoint_corners_need_no_branching() {
        let map = Arc::new(GridMap::new(6, 6, HashSet::new()));
        let starts = vec![GridCell::new(0, 0), GridCell::new(5, 5)];
        let goals = vec![GridCell::new(2, 0), GridCell::new(5, 3)];
        let problem = CbsProblem::new(map, starts, goals, CbsCostFunction::SumOfCosts, None);
        let mut cbs = ConflictBasedSearch::new(problem);
        let solution = cbs.solve(Some(std::time::Duration::from_secs(5))).unwrap();
        assert_eq!(solution.cost, 4.0);
        assert!(get_first_conflict(&solution.trajectories).is_none());
    }
}
