//! Grid motion planner (C3): A* over a 4-connected occupancy grid (§4.3).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::search::{BestFirstNode, SearchProblem, Successor};

use super::config::GridCell;
use super::motion_planner::{MotionPlanResult, MotionPlanner};

/// Immutable 2-D boolean occupancy grid (§3 "Grid map").
#[derive(Debug, Clone)]
pub struct GridMap {
    width: i32,
    height: i32,
    obstacles: HashSet<GridCell>,
}

impl GridMap {
    pub fn new(width: i32, height: i32, obstacles: HashSet<GridCell>) -> Self {
        GridMap {
            width,
            height,
            obstacles,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: &GridCell) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    pub fn is_obstacle(&self, x: i32, y: i32) -> bool {
        self.obstacles.contains(&GridCell::new(x, y))
    }

    fn cardinals(&self, cell: &GridCell) -> Vec<GridCell> {
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .iter()
            .map(|(dx, dy)| GridCell::new(cell.x + dx, cell.y + dy))
            .filter(|c| self.in_bounds(c) && !self.is_obstacle(c.x, c.y))
            .collect()
    }
}

/// Single-agent A* search problem over a [`GridMap`] with a fixed goal and
/// Euclidean-distance heuristic (admissible since a 4-connected step always
/// covers at least as much Euclidean distance as a diagonal would allow).
pub struct GridAstarProblem {
    map: Arc<GridMap>,
    start: GridCell,
    goal: GridCell,
}

impl GridAstarProblem {
    pub fn new(map: Arc<GridMap>, start: GridCell, goal: GridCell) -> Self {
        GridAstarProblem { map, start, goal }
    }
}

impl SearchProblem for GridAstarProblem {
    type State = GridCell;
    type DedupKey = GridCell;

    fn root_state(&mut self) -> Arc<Self::State> {
        Arc::new(self.start)
    }

    fn successors(&mut self, node: &Arc<BestFirstNode<Self::State>>) -> Vec<Successor<Self::State>> {
        self.map
            .cardinals(&node.state)
            .into_iter()
            .map(|cell| Successor {
                state: Arc::new(cell),
                edge_cost: 1.0,
            })
            .collect()
    }

    fn heuristic(&mut self, state: &Self::State) -> Option<f64> {
        Some(state.euclidean_distance(&self.goal))
    }

    fn is_goal(&mut self, state: &Self::State) -> bool {
        *state == self.goal
    }

    fn dedup_key(&self, state: &Self::State) -> Self::DedupKey {
        *state
    }
}

/// Resolves a grid A* query into a path of cells, or `None` if the start or
/// goal cell is itself an obstacle or no path exists within `timeout`.
pub fn solve_grid_path(
    map: Arc<GridMap>,
    start: GridCell,
    goal: GridCell,
    timeout: Option<std::time::Duration>,
) -> Option<Vec<GridCell>> {
    if map.is_obstacle(start.x, start.y) || map.is_obstacle(goal.x, goal.y) {
        return None;
    }
    let mut kernel = crate::search::SearchKernel::new(GridAstarProblem::new(map, start, goal));
    let result = kernel.search(timeout);
    match result.outcome {
        crate::search::SearchOutcome::Goal => {
            let node = result.goal.unwrap();
            Some(node.trace().into_iter().map(|s| *s).collect())
        }
        _ => None,
    }
}

/// A grid planner over one fixed map, suitable for wrapping in
/// [`super::motion_planner::MemoizedMotionPlanner`] (mirrors
/// [`super::sampled::PointGraphMotionPlanner`]'s role for point graphs).
pub struct GridMotionPlanner {
    map: Arc<GridMap>,
}

impl GridMotionPlanner {
    pub fn new(map: Arc<GridMap>) -> Self {
        GridMotionPlanner { map }
    }
}

impl MotionPlanner<String, GridCell> for GridMotionPlanner {
    fn query(&self, _species: &String, from: &GridCell, to: &GridCell, timeout: Option<Duration>) -> MotionPlanResult<GridCell> {
        match solve_grid_path(self.map.clone(), *from, *to, timeout) {
            Some(path) => {
                let length = (path.len() - 1) as f64;
                MotionPlanResult::Success { path, length }
            }
            None => MotionPlanResult::Unreachable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s1_grid_astar_around_obstacle() {
        let mut obstacles = HashSet::new();
        obstacles.insert(GridCell::new(1, 1));
        obstacles.insert(GridCell::new(2, 2));
        let map = Arc::new(GridMap::new(3, 3, obstacles));

        let path = solve_grid_path(map, GridCell::new(0, 0), GridCell::new(1, 2), None).unwrap();

        assert_eq!(
            path,
            vec![
                GridCell::new(0, 0),
                GridCell::new(0, 1),
                GridCell::new(0, 2),
                GridCell::new(1, 2),
            ]
        );
        assert_eq!(path.len() - 1, 3);
    }

    #[test]
    fn empty_grid_path_length_is_manhattan_distance() {
        let map = Arc::new(GridMap::new(10, 10, HashSet::new()));
        let path = solve_grid_path(map, GridCell::new(0, 0), GridCell::new(4, 3), None).unwrap();
        assert_eq!((path.len() - 1) as i64, GridCell::new(0, 0).manhattan_distance(&GridCell::new(4, 3)));
    }

    #[test]
    fn obstacle_start_is_unsolvable() {
        let mut obstacles = HashSet::new();
        obstacles.insert(GridCell::new(0, 0));
        let map = Arc::new(GridMap::new(3, 3, obstacles));
        assert!(solve_grid_path(map, GridCell::new(0, 0), GridCell::new(2, 2), None).is_none());
    }

    #[test]
    fn grid_motion_planner_reports_path_length() {
        let map = Arc::new(GridMap::new(5, 5, HashSet::new()));
        let planner = GridMotionPlanner::new(map);
        let result = planner.query(&"ground".to_string(), &GridCell::new(0, 0), &GridCell::new(3, 0), None);
        assert_eq!(result.length(), Some(3.0));
    }

    #[test]
    fn grid_motion_planner_reports_unreachable_when_blocked() {
        let mut obstacles = HashSet::new();
        for y in 0..3 {
            obstacles.insert(GridCell::new(1, y));
        }
        let map = Arc::new(GridMap::new(3, 3, obstacles));
        let planner = GridMotionPlanner::new(map);
        let result = planner.query(&"ground".to_string(), &GridCell::new(0, 0), &GridCell::new(2, 0), None);
        assert!(matches!(result, MotionPlanResult::Unreachable));
    }
}
