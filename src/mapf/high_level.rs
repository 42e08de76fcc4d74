//! CBS high-level search: expansion of the constraint tree, keyed by
//! makespan or sum-of-costs (§3 "Constraint tree node (CBS)", §4.4
//! "High-level loop"). Implemented as an instantiation of the generic
//! search kernel (C1): the constraint-tree cost is uniform-cost priority
//! (`h` is always zero), and "successors" are the (at most two) children a
//! conflict splits off.

use std::sync::Arc;
use std::time::Duration;

use fxhash::FxHashMap;

use crate::geometry::{GridCell, GridMap};
use crate::search::{BestFirstNode, SearchKernel, SearchOutcome, SearchProblem, Successor};

use super::constraint::Constraint;
use super::conflict::get_first_conflict;
use super::low_level::solve_space_time_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbsCostFunction {
    Makespan,
    SumOfCosts,
}

fn compute_cost(cost_fn: CbsCostFunction, lengths: &[usize]) -> f64 {
    match cost_fn {
        CbsCostFunction::Makespan => lengths.iter().copied().max().unwrap_or(0) as f64,
        CbsCostFunction::SumOfCosts => lengths.iter().sum::<usize>() as f64,
    }
}

/// One agent's realized space-time trajectory.
#[derive(Debug, Clone)]
pub struct AgentSolution {
    pub positions: Vec<GridCell>,
}

impl AgentSolution {
    pub fn len(&self) -> usize {
        self.positions.len()
    }
}

enum Kind {
    Root {
        solutions: Vec<Arc<AgentSolution>>,
    },
    Internal {
        agent: usize,
        constraint: Constraint,
        solution: Arc<AgentSolution>,
    },
}

/// A node of the constraint tree (§3). The root stores every agent's
/// solution directly; an internal node stores only the one new constraint
/// and the new solution for the agent it constrains, deferring everything
/// else to its parent.
pub struct ConstraintTreeNode {
    parent: Option<Arc<ConstraintTreeNode>>,
    kind: Kind,
    cost: f64,
    num_agents: usize,
}

impl ConstraintTreeNode {
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn solution(self: &Arc<Self>, agent: usize) -> Arc<AgentSolution> {
        match &self.kind {
            Kind::Root { solutions } => solutions[agent].clone(),
            Kind::Internal { agent: a, solution, .. } if *a == agent => solution.clone(),
            Kind::Internal { .. } => self.parent.as_ref().unwrap().solution(agent),
        }
    }

    pub fn all_solutions(self: &Arc<Self>) -> Vec<Arc<AgentSolution>> {
        (0..self.num_agents).map(|a| self.solution(a)).collect()
    }

    /// Constraints inherited from the path to the root for one agent.
    pub fn constraints_for(self: &Arc<Self>, agent: usize) -> Vec<Constraint> {
        let mut out = vec![];
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if let Kind::Internal { agent: a, constraint, .. } = &node.kind {
                if *a == agent {
                    out.push(*constraint);
                }
            }
            current = node.parent.clone();
        }
        out
    }

    fn root(
        map: &GridMap,
        starts: &[GridCell],
        goals: &[GridCell],
        cost_fn: CbsCostFunction,
        timeout: Option<Duration>,
    ) -> Option<Arc<Self>> {
        let mut solutions = Vec::with_capacity(starts.len());
        for (start, goal) in starts.iter().zip(goals) {
            let path = solve_space_time_path(map, *start, *goal, &[], timeout)?;
            solutions.push(Arc::new(AgentSolution { positions: path }));
        }
        let lengths: Vec<usize> = solutions.iter().map(|s| s.len()).collect();
        let cost = compute_cost(cost_fn, &lengths);
        Some(Arc::new(ConstraintTreeNode {
            parent: None,
            kind: Kind::Root { solutions },
            cost,
            num_agents: starts.len(),
        }))
    }

    fn child(
        parent: &Arc<Self>,
        map: &GridMap,
        starts: &[GridCell],
        goals: &[GridCell],
        cost_fn: CbsCostFunction,
        agent: usize,
        constraint: Constraint,
        timeout: Option<Duration>,
    ) -> Option<Arc<Self>> {
        let mut constraints = parent.constraints_for(agent);
        constraints.push(constraint);
        let path = solve_space_time_path(map, starts[agent], goals[agent], &constraints, timeout)?;
        let solution = Arc::new(AgentSolution { positions: path });

        let lengths: Vec<usize> = (0..parent.num_agents)
            .map(|a| if a == agent { solution.len() } else { parent.solution(a).len() })
            .collect();
        let cost = compute_cost(cost_fn, &lengths);

        Some(Arc::new(ConstraintTreeNode {
            parent: Some(parent.clone()),
            kind: Kind::Internal { agent, constraint, solution },
            cost,
            num_agents: parent.num_agents,
        }))
    }
}

/// The CBS search problem: constraint-tree nodes identified by a registry
/// id so the generic kernel's `State` bound (`Eq + Hash + Clone + Debug`) is
/// satisfied trivially, without forcing pointer-identity semantics onto
/// [`ConstraintTreeNode`] itself.
pub struct CbsProblem {
    map: Arc<GridMap>,
    starts: Vec<GridCell>,
    goals: Vec<GridCell>,
    cost_fn: CbsCostFunction,
    low_level_timeout: Option<Duration>,
    registry: FxHashMap<u64, Arc<ConstraintTreeNode>>,
    next_id: u64,
    root_failed: bool,
}

impl CbsProblem {
    pub fn new(
        map: Arc<GridMap>,
        starts: Vec<GridCell>,
        goals: Vec<GridCell>,
        cost_fn: CbsCostFunction,
        low_level_timeout: Option<Duration>,
    ) -> Self {
        CbsProblem {
            map,
            starts,
            goals,
            cost_fn,
            low_level_timeout,
            registry: FxHashMap::default(),
            next_id: 0,
            root_failed: false,
        }
    }

    fn register(&mut self, node: Arc<ConstraintTreeNode>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.registry.insert(id, node);
        id
    }

    pub fn node(&self, id: u64) -> &Arc<ConstraintTreeNode> {
        &self.registry[&id]
    }

    pub fn num_agents(&self) -> usize {
        self.starts.len()
    }
}

impl SearchProblem for CbsProblem {
    type State = u64;
    type DedupKey = u64;

    fn root_state(&mut self) -> Arc<Self::State> {
        match ConstraintTreeNode::root(
            &self.map,
            &self.starts,
            &self.goals,
            self.cost_fn,
            self.low_level_timeout,
        ) {
            Some(root) => {
                let id = self.register(root);
                Arc::new(id)
            }
            None => {
                // No single-agent path exists for some robot: MAPF is
                // infeasible from the start. Registering a dead node with
                // infinite cost and no successors lets the kernel report
                // "no goal" cleanly instead of panicking.
                self.root_failed = true;
                let id = self.next_id;
                self.next_id += 1;
                Arc::new(id)
            }
        }
    }

    fn successors(&mut self, node: &Arc<BestFirstNode<Self::State>>) -> Vec<Successor<Self::State>> {
        if self.root_failed {
            return vec![];
        }
        let id = *node.state.as_ref();
        let ct_node = self.registry[&id].clone();
        let solutions: Vec<Vec<GridCell>> = ct_node
            .all_solutions()
            .into_iter()
            .map(|s| s.positions.clone())
            .collect();

        let Some(conflict) = get_first_conflict(&solutions) else {
            return vec![];
        };
        let (left, right) = conflict.to_constraints();

        let mut out = vec![];
        for (agent, constraint) in [left, right] {
            if let Some(child) = ConstraintTreeNode::child(
                &ct_node,
                &self.map,
                &self.starts,
                &self.goals,
                self.cost_fn,
                agent,
                constraint,
                self.low_level_timeout,
            ) {
                let edge_cost = child.cost() - ct_node.cost();
                let child_id = self.register(child);
                out.push(Successor {
                    state: Arc::new(child_id),
                    edge_cost,
                });
            }
            // A child whose low-level search fails is silently dropped
            // (§4.4 "Failure semantics").
        }
        out
    }

    fn heuristic(&mut self, _state: &Self::State) -> Option<f64> {
        Some(0.0)
    }

    fn is_goal(&mut self, state: &Self::State) -> bool {
        if self.root_failed {
            return false;
        }
        let ct_node = &self.registry[state];
        let solutions: Vec<Vec<GridCell>> = ct_node
            .all_solutions()
            .into_iter()
            .map(|s| s.positions.clone())
            .collect();
        get_first_conflict(&solutions).is_none()
    }

    fn dedup_key(&self, state: &Self::State) -> Self::DedupKey {
        *state
    }
}

/// Result of a CBS solve: per-agent trajectories and the realized cost.
pub struct MapfSolution {
    pub trajectories: Vec<Vec<GridCell>>,
    pub cost: f64,
}

/// Driver for the CBS high-level loop (§4.4).
pub struct ConflictBasedSearch {
    kernel: SearchKernel<CbsProblem>,
}

impl ConflictBasedSearch {
    pub fn new(problem: CbsProblem) -> Self {
        ConflictBasedSearch {
            kernel: SearchKernel::new(problem),
        }
    }

    /// Solves the MAPF instance, or returns `None` if infeasible or timed
    /// out (§4.4 "Repeat until open is empty (infeasible) or timeout").
    pub fn solve(&mut self, timeout: Option<Duration>) -> Option<MapfSolution> {
        let result = self.kernel.search(timeout);
        match result.outcome {
            SearchOutcome::Goal => {
                let node = result.goal.unwrap();
                let id = *node.state.as_ref();
                let ct_node = self.kernel.problem().node(id).clone();
                let trajectories = ct_node
                    .all_solutions()
                    .into_iter()
                    .map(|s| s.positions.clone())
                    .collect();
                Some(MapfSolution {
                    trajectories,
                    cost: ct_node.cost(),
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn scenario_s2_vertex_conflict_resolved() {
        // Two agents crossing at the centre of a 3x3 grid: their direct
        // two-step paths both want the centre cell at t=1, so one must wait
        // a single step, raising its cost from 2 to 3.
        let map = Arc::new(GridMap::new(3, 3, HashSet::new()));
        let starts = vec![GridCell::new(0, 1), GridCell::new(1, 0)];
        let goals = vec![GridCell::new(2, 1), GridCell::new(1, 2)];
        let problem = CbsProblem::new(map, starts, goals, CbsCostFunction::Makespan, None);
        let mut cbs = ConflictBasedSearch::new(problem);
        let solution = cbs.solve(None).unwrap();
        assert_eq!(solution.cost, 3.0);
        assert!(get_first_conflict(&solution.trajectories).is_none());
    }

    #[test]
    fn scenario_s3_edge_conflict_resolved() {
        // Two agents occupying adjacent cells in a wider grid: their direct
        // paths swap across the same edge, but the extra row gives a way
        // around it, so a conflict-free solution exists.
        let map = Arc::new(GridMap::new(3, 2, HashSet::new()));
        let starts = vec![GridCell::new(0, 0), GridCell::new(1, 0)];
        let goals = vec![GridCell::new(1, 0), GridCell::new(0, 0)];
        let problem = CbsProblem::new(map, starts, goals, CbsCostFunction::Makespan, None);
        let mut cbs = ConflictBasedSearch::new(problem);
        let solution = cbs.solve(Some(Duration::from_secs(5))).unwrap();
        assert!(solution.cost >= 1.0);
        assert!(get_first_conflict(&solution.trajectories).is_none());
    }

    #[test]
    fn swap_on_a_single_wide_corridor_is_infeasible() {
        // A corridor one cell wide gives agents no way to pass each other;
        // swapping endpoints is a textbook unsolvable MAPF instance.
        let map = Arc::new(GridMap::new(3, 1, HashSet::new()));
        let starts = vec![GridCell::new(0, 0), GridCell::new(2, 0)];
        let goals = vec![GridCell::new(2, 0), GridCell::new(0, 0)];
        let problem = CbsProblem::new(map, starts, goals, CbsCostFunction::Makespan, None);
        let mut cbs = ConflictBasedSearch::new(problem);
        assert!(cbs.solve(Some(Duration::from_millis(200))).is_none());
    }

    #[test]
    fn infeasible_when_a_robot_starts_on_an_obstacle() {
        let mut obstacles = HashSet::new();
        obstacles.insert(GridCell::new(0, 0));
        let map = Arc::new(GridMap::new(2, 1, obstacles));
        let problem = CbsProblem::new(
            map,
            vec![GridCell::new(0, 0)],
            vec![GridCell::new(1, 0)],
            CbsCostFunction::Makespan,
            None,
        );
        let mut cbs = ConflictBasedSearch::new(problem);
        assert!(cbs.solve(None).is_none());
    }
}
