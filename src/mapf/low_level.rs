//! Low-level single-agent space-time A* with constraints (§4.4 "Low-level
//! space-time A*"). State is `(t,x,y)`; successors are the four cardinals
//! plus wait, each advancing time by one step.

use std::sync::Arc;

use crate::geometry::{GridCell, GridMap};
use crate::search::{BestFirstNode, SearchProblem, Successor};

use super::constraint::Constraint;

/// A position in space-time (§3 "temporal grid cell").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemporalGridCell {
    pub time: u32,
    pub cell: GridCell,
}

/// Single-agent shortest path search respecting a set of inherited
/// constraints (§4.4 "Low-level space-time A*").
pub struct SpaceTimeAstarProblem<'a> {
    map: &'a GridMap,
    start: GridCell,
    goal: GridCell,
    constraints: &'a [Constraint],
    max_time: u32,
    max_goal_constraint_time: Option<u32>,
}

impl<'a> SpaceTimeAstarProblem<'a> {
    pub fn new(map: &'a GridMap, start: GridCell, goal: GridCell, constraints: &'a [Constraint]) -> Self {
        let max_constraint_time = constraints.iter().map(Constraint::time).max().unwrap_or(0);
        // Grid diameter bounds how long a detour can plausibly need to be;
        // padding it out past the latest constraint keeps the search space
        // finite even when constraints crowd the goal cell.
        let diameter = (map.width() + map.height()) as u32;
        let max_time = max_constraint_time + diameter + 1;

        let max_goal_constraint_time = constraints
            .iter()
            .filter(|c| c.forbids_vertex_at_cell(goal))
            .map(Constraint::time)
            .max();

        SpaceTimeAstarProblem {
            map,
            start,
            goal,
            constraints,
            max_time,
            max_goal_constraint_time,
        }
    }

    fn is_forbidden_vertex(&self, time: u32, cell: GridCell) -> bool {
        self.constraints.iter().any(|c| c.forbids_vertex(time, cell))
    }

    fn is_forbidden_edge(&self, time: u32, from: GridCell, to: GridCell) -> bool {
        self.constraints.iter().any(|c| c.forbids_edge(time, from, to))
    }
}

impl Constraint {
    fn forbids_vertex_at_cell(&self, cell: GridCell) -> bool {
        matches!(self, Constraint::Vertex { cell: c, .. } if *c == cell)
    }
}

impl<'a> SearchProblem for SpaceTimeAstarProblem<'a> {
    type State = TemporalGridCell;
    type DedupKey = TemporalGridCell;

    fn root_state(&mut self) -> Arc<Self::State> {
        Arc::new(TemporalGridCell {
            time: 0,
            cell: self.start,
        })
    }

    fn successors(&mut self, node: &Arc<BestFirstNode<Self::State>>) -> Vec<Successor<Self::State>> {
        let current = node.state.as_ref();
        if current.time >= self.max_time {
            return vec![];
        }
        let next_time = current.time + 1;

        let mut candidates = vec![current.cell];
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            candidates.push(GridCell::new(current.cell.x + dx, current.cell.y + dy));
        }

        candidates
            .into_iter()
            .filter(|cell| self.map.in_bounds(cell) && !self.map.is_obstacle(cell.x, cell.y))
            .filter(|cell| !self.is_forbidden_vertex(next_time, *cell))
            .filter(|cell| !self.is_forbidden_edge(current.time, current.cell, *cell))
            .map(|cell| Successor {
                state: Arc::new(TemporalGridCell {
                    time: next_time,
                    cell,
                }),
                edge_cost: 1.0,
            })
            .collect()
    }

    fn heuristic(&mut self, state: &Self::State) -> Option<f64> {
        Some(state.cell.manhattan_distance(&self.goal) as f64)
    }

    fn is_goal(&mut self, state: &Self::State) -> bool {
        state.cell == self.goal
            && self
                .max_goal_constraint_time
                .map(|forbidden| state.time > forbidden)
                .unwrap_or(true)
    }

    fn dedup_key(&self, state: &Self::State) -> Self::DedupKey {
        *state
    }
}

/// Resolves a constrained single-agent path, returning the full space-time
/// trajectory (one cell per time step, 0-indexed) or `None` if no path
/// respects the constraints within `timeout`.
pub fn solve_space_time_path(
    map: &GridMap,
    start: GridCell,
    goal: GridCell,
    constraints: &[Constraint],
    timeout: Option<std::time::Duration>,
) -> Option<Vec<GridCell>> {
    let mut kernel =
        crate::search::SearchKernel::new(SpaceTimeAstarProblem::new(map, start, goal, constraints));
    let result = kernel.search(timeout);
    match result.outcome {
        crate::search::SearchOutcome::Goal => {
            let node = result.goal.unwrap();
            Some(node.trace().into_iter().map(|s| s.cell).collect())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unconstrained_path_is_direct() {
        let map = GridMap::new(3, 1, HashSet::new());
        let path = solve_space_time_path(&map, GridCell::new(0, 0), GridCell::new(2, 0), &[], None).unwrap();
        assert_eq!(path.len() - 1, 2);
    }

    #[test]
    fn vertex_constraint_forces_a_wait() {
        let map = GridMap::new(3, 1, HashSet::new());
        let constraints = [Constraint::Vertex {
            time: 1,
            cell: GridCell::new(1, 0),
        }];
        let path =
            solve_space_time_path(&map, GridCell::new(0, 0), GridCell::new(2, 0), &constraints, None).unwrap();
        // Must arrive at (1,0) at some time other than 1: waiting once at
        // the start (or elsewhere) makes the three-step trip take four.
        assert!(path.len() - 1 >= 3);
        assert_ne!(path[1], GridCell::new(1, 0));
    }
}
