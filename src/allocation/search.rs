//! ITAGS / DITAGS allocation search (C7, §4.7): A* over partial allocation
//! matrices, guided by the TETAQ heuristic (C6), plus an incremental repair
//! discipline that reuses the open/closed/pruned sets under problem changes
//! rather than re-solving from scratch.
//!
//! Unlike the grid/graph/CBS planners (§4.3, §4.4), which are plain
//! instantiations of the generic kernel (C1), ITAGS owns its open/closed/
//! pruned buckets directly: repair needs to scan and mutate them in ways the
//! kernel's [`crate::search::SearchKernel`] does not expose.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fxhash::FxHashMap;
use log::{debug, info};
use ordered_float::OrderedFloat;

use crate::search::node::{node_priority_key, NodeIdAllocator};
use crate::search::statistics::SearchStatistics;
use crate::search::{MutablePriorityQueue, NodeStatus, SearchNode, SearchOutcome};
use crate::scheduling::Schedule;

use super::heuristic;
use super::matrix::{AllocationMatrix, AllocationNode};
use super::problem::{Assignment, ItagsProblemInputs};

type PriorityKey = (OrderedFloat<f64>, std::cmp::Reverse<OrderedFloat<f64>>, u64);

/// One node of the ITAGS search tree: a partial allocation (via its
/// [`AllocationNode`] parent chain, §3 "incremental allocation node") with
/// cached APR/NSQ terms so the DITAGS repair discipline can invalidate and
/// recompute either independently (§4.7 "Invalidation strategy").
pub struct AllocationSearchNode {
    id: u64,
    pub parent: Option<Arc<AllocationSearchNode>>,
    pub allocation: Arc<AllocationNode>,
    pub matrix: AllocationMatrix,
    pub g: f64,
    apr: Cell<f64>,
    nsq: Cell<f64>,
    h: Cell<f64>,
    schedule: RefCell<Option<Schedule>>,
    status: Cell<NodeStatus>,
}

impl AllocationSearchNode {
    fn new(
        id: u64,
        parent: Option<Arc<AllocationSearchNode>>,
        allocation: Arc<AllocationNode>,
        matrix: AllocationMatrix,
        g: f64,
        problem: &ItagsProblemInputs,
    ) -> Arc<Self> {
        let (h, apr_value, schedule) = heuristic::tetaq(problem, &matrix);
        let nsq_value = Self::nsq_from_schedule(problem, schedule.as_ref());
        Arc::new(AllocationSearchNode {
            id,
            parent,
            allocation,
            matrix,
            g,
            apr: Cell::new(apr_value),
            nsq: Cell::new(nsq_value),
            h: Cell::new(h),
            schedule: RefCell::new(schedule),
            status: Cell::new(NodeStatus::Open),
        })
    }

    /// A node pruned by capacity before the (expensive, MILP-backed)
    /// heuristic is ever evaluated (§4.7 prepruning item (i)) — the whole
    /// point of checking capacity first is to avoid paying for TETAQ on
    /// children that are dropped immediately.
    fn new_capacity_pruned(
        id: u64,
        parent: Option<Arc<AllocationSearchNode>>,
        allocation: Arc<AllocationNode>,
        matrix: AllocationMatrix,
        g: f64,
    ) -> Arc<Self> {
        Arc::new(AllocationSearchNode {
            id,
            parent,
            allocation,
            matrix,
            g,
            apr: Cell::new(1.0),
            nsq: Cell::new(1.0),
            h: Cell::new(1.0),
            schedule: RefCell::new(None),
            status: Cell::new(NodeStatus::Pruned),
        })
    }

    fn nsq_from_schedule(problem: &ItagsProblemInputs, schedule: Option<&Schedule>) -> f64 {
        match schedule {
            Some(s) if problem.schedule_worst_makespan > 0.0 => s.makespan / problem.schedule_worst_makespan,
            _ => 1.0,
        }
    }

    pub fn status(&self) -> NodeStatus {
        self.status.get()
    }

    fn set_status(&self, status: NodeStatus) {
        self.status.set(status);
    }

    pub fn schedule(&self) -> Option<Schedule> {
        self.schedule.borrow().clone()
    }

    pub fn apr(&self) -> f64 {
        self.apr.get()
    }

    pub fn nsq(&self) -> f64 {
        self.nsq.get()
    }

    fn refresh_h(&self, alpha: f64) {
        self.h.set(alpha * self.apr.get() + (1.0 - alpha) * self.nsq.get());
    }

    fn recompute_apr(&self, problem: &ItagsProblemInputs) {
        self.apr.set(heuristic::apr(problem, &self.matrix));
        self.refresh_h(problem.alpha);
    }

    fn recompute_nsq(&self, problem: &ItagsProblemInputs) {
        let (value, schedule) = heuristic::nsq(problem, &self.matrix);
        self.nsq.set(value);
        *self.schedule.borrow_mut() = schedule;
        self.refresh_h(problem.alpha);
    }

    fn fully_covered(&self, problem: &ItagsProblemInputs) -> bool {
        (0..problem.num_tasks).all(|t| !self.matrix.assigned_robots(t).is_empty())
    }

    /// §4.7 postprune item (ii): a fully-covered allocation the scheduler
    /// still proves infeasible cannot be rescued by further assignments —
    /// adding more robots only adds more mutex constraints, never removes
    /// a precedence cycle or duration impossibility.
    fn is_postpruned(&self, problem: &ItagsProblemInputs) -> bool {
        self.fully_covered(problem) && self.schedule().is_none()
    }

    /// §4.7 "Goal test": full trait coverage and a schedule respecting any
    /// configured quality bound.
    fn is_goal(&self, problem: &ItagsProblemInputs) -> bool {
        if self.apr.get() > 0.0 {
            return false;
        }
        match self.schedule().as_ref() {
            Some(schedule) => problem.quality_bound.map(|bound| schedule.makespan <= bound).unwrap_or(true),
            None => false,
        }
    }
}

impl SearchNode for AllocationSearchNode {
    fn id(&self) -> u64 {
        self.id
    }
    fn g(&self) -> f64 {
        self.g
    }
    fn h(&self) -> f64 {
        self.h.get()
    }
}

fn exceeds_capacity(matrix: &AllocationMatrix, robot: usize, cap: Option<usize>) -> bool {
    match cap {
        None => false,
        Some(cap) => (0..matrix.num_tasks()).filter(|&t| matrix.is_assigned(t, robot)).count() > cap,
    }
}

/// A classified external-problem change DITAGS repairs against, per §4.7's
/// change table. Produced by the caller (typically by diffing the old and
/// new [`ItagsProblemInputs`]); classification itself is not specified by
/// the source design, so this crate does not attempt to infer it from raw
/// before/after problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemChange {
    RobotAdded(usize),
    RobotLost(usize),
    TraitRequirementIncreased,
    TraitRequirementDecreased,
    RobotTraitIncreased,
    RobotTraitDecreased,
    DurationOrPrecedenceChanged,
}

pub struct ItagsSearchResult {
    pub outcome: SearchOutcome,
    pub goal: Option<Arc<AllocationSearchNode>>,
    pub stats: SearchStatistics,
}

/// Driver for the ITAGS/DITAGS allocation search (§4.7).
pub struct ItagsSearch {
    problem: ItagsProblemInputs,
    ids: NodeIdAllocator,
    root: Arc<AllocationSearchNode>,
    open: MutablePriorityQueue<u64, PriorityKey, Arc<AllocationSearchNode>>,
    closed: FxHashMap<u64, Arc<AllocationSearchNode>>,
    pruned: FxHashMap<u64, Arc<AllocationSearchNode>>,
    goal: Option<Arc<AllocationSearchNode>>,
    stats: SearchStatistics,
    open_apr_stale: bool,
    open_nsq_stale: bool,
    closed_apr_stale: bool,
    closed_nsq_stale: bool,
    pruned_apr_stale: bool,
    pruned_nsq_stale: bool,
}

impl ItagsSearch {
    pub fn new(problem: ItagsProblemInputs) -> Self {
        let ids = NodeIdAllocator::new();
        let root_id = ids.next();
        let root_allocation = AllocationNode::root(root_id);
        let root_matrix = root_allocation.reconstruct(problem.num_tasks, problem.num_robots);
        let root = AllocationSearchNode::new(root_id, None, root_allocation, root_matrix, 0.0, &problem);

        let mut open = MutablePriorityQueue::new();
        open.push(Self::key(&root), Self::priority(&root), root.clone());

        let mut stats = SearchStatistics::default();
        stats.nodes_generated += 1;

        ItagsSearch {
            problem,
            ids,
            root,
            open,
            closed: FxHashMap::default(),
            pruned: FxHashMap::default(),
            goal: None,
            stats,
            open_apr_stale: false,
            open_nsq_stale: false,
            closed_apr_stale: false,
            closed_nsq_stale: false,
            pruned_apr_stale: false,
            pruned_nsq_stale: false,
        }
    }

    pub fn problem(&self) -> &ItagsProblemInputs {
        &self.problem
    }

    pub fn stats(&self) -> SearchStatistics {
        self.stats
    }

    fn key(node: &AllocationSearchNode) -> u64 {
        node.matrix.content_hash()
    }

    fn priority(node: &AllocationSearchNode) -> PriorityKey {
        node_priority_key(node)
    }

    /// §4.1 `search()`: runs from the already-pushed root.
    pub fn search(&mut self, timeout: Option<Duration>) -> ItagsSearchResult {
        self.run_loop(timeout)
    }

    /// Shallow copy of the search state for checkpointing before a
    /// speculative repair (§4.7 "Shallow versus deep copy ... exposed").
    /// Shares node `Arc`s with `self`; mutating the clone's own buckets
    /// (push/pop/erase) never affects the original, but in-place node
    /// mutation (staleness recompute) would be visible to both, which is
    /// why callers checkpoint before a repair that recomputes heuristics.
    pub fn checkpoint(&self) -> ItagsSearch {
        ItagsSearch {
            problem: self.problem.clone(),
            ids: NodeIdAllocator::new(),
            root: self.root.clone(),
            open: self.open.clone(),
            closed: self.closed.clone(),
            pruned: self.pruned.clone(),
            goal: self.goal.clone(),
            stats: self.stats,
            open_apr_stale: self.open_apr_stale,
            open_nsq_stale: self.open_nsq_stale,
            closed_apr_stale: self.closed_apr_stale,
            closed_nsq_stale: self.closed_nsq_stale,
            pruned_apr_stale: self.pruned_apr_stale,
            pruned_nsq_stale: self.pruned_nsq_stale,
        }
    }

    /// Applies a new problem plus its classified changes (§4.7 DITAGS
    /// table), then resumes the search (`continueSearch`).
    pub fn repair(
        &mut self,
        new_problem: ItagsProblemInputs,
        changes: &[ProblemChange],
        timeout: Option<Duration>,
    ) -> ItagsSearchResult {
        debug!("repairing search for {} problem change(s): {changes:?}", changes.len());
        self.apply_change(new_problem, changes);
        self.continue_search(timeout)
    }

    fn apply_change(&mut self, new_problem: ItagsProblemInputs, changes: &[ProblemChange]) {
        self.problem = new_problem;

        for change in changes {
            match change {
                ProblemChange::RobotAdded(robot) => self.expand_root_with_new_robot(*robot),
                ProblemChange::RobotLost(robot) => self.drop_nodes_using_robot(*robot),
                ProblemChange::TraitRequirementIncreased => {
                    self.open_apr_stale = true;
                    self.closed_apr_stale = true;
                }
                ProblemChange::TraitRequirementDecreased => {
                    self.open_apr_stale = true;
                    self.pruned_apr_stale = true;
                }
                ProblemChange::RobotTraitIncreased => {
                    self.open_apr_stale = true;
                    self.closed_apr_stale = true;
                }
                ProblemChange::RobotTraitDecreased => {
                    self.open_apr_stale = true;
                    self.pruned_apr_stale = true;
                }
                ProblemChange::DurationOrPrecedenceChanged => {
                    self.open_nsq_stale = true;
                    self.closed_nsq_stale = true;
                    self.pruned_nsq_stale = true;
                }
            }
        }

        // Previous-solution fast-path (§4.7): re-offer the old goal first so
        // the search can immediately confirm it still satisfies the goal
        // conditions under the new problem.
        if let Some(goal) = self.goal.take() {
            goal.set_status(NodeStatus::Open);
            self.open.push(Self::key(&goal), Self::priority(&goal), goal);
        }
    }

    fn expand_root_with_new_robot(&mut self, robot: usize) {
        for task in 0..self.problem.num_tasks {
            let assignment = Assignment { task, robot };
            let id = self.ids.next();
            let allocation_node = AllocationNode::child(id, &self.root.allocation, assignment);
            let matrix = allocation_node.reconstruct(self.problem.num_tasks, self.problem.num_robots);
            let node = AllocationSearchNode::new(id, Some(self.root.clone()), allocation_node, matrix, self.root.g, &self.problem);
            let key = Self::key(&node);
            if self.closed.contains_key(&key) {
                continue;
            }
            self.stats.nodes_generated += 1;
            self.open.push(key, Self::priority(&node), node);
        }
    }

    fn drop_nodes_using_robot(&mut self, robot: usize) {
        let victims: Vec<u64> = self
            .open
            .iter()
            .filter(|(_, _, node)| node.matrix.uses_robot(robot))
            .map(|(key, _, _)| *key)
            .collect();
        for key in victims {
            self.open.erase(&key);
        }
        self.closed.retain(|_, node| !node.matrix.uses_robot(robot));
        self.pruned.retain(|_, node| !node.matrix.uses_robot(robot));

        // Surviving nodes' heuristics may no longer reflect the problem
        // (robot rosters feed both APR's reduction and NSQ's transitions).
        self.open_apr_stale = true;
        self.open_nsq_stale = true;
        self.closed_apr_stale = true;
        self.closed_nsq_stale = true;
        self.pruned_apr_stale = true;
        self.pruned_nsq_stale = true;
    }

    fn drain_stale(&mut self) {
        if self.open_apr_stale || self.open_nsq_stale {
            let apr_stale = self.open_apr_stale;
            let nsq_stale = self.open_nsq_stale;
            let problem = &self.problem;
            self.open.reprioritize_all(|_, node| {
                if apr_stale {
                    node.recompute_apr(problem);
                }
                if nsq_stale {
                    node.recompute_nsq(problem);
                }
                node_priority_key(node.as_ref())
            });
            self.open_apr_stale = false;
            self.open_nsq_stale = false;
        }

        if self.closed_apr_stale || self.closed_nsq_stale {
            self.drain_closed(self.closed_apr_stale, self.closed_nsq_stale);
            self.closed_apr_stale = false;
            self.closed_nsq_stale = false;
        }

        if self.pruned_apr_stale || self.pruned_nsq_stale {
            self.drain_pruned(self.pruned_apr_stale, self.pruned_nsq_stale);
            self.pruned_apr_stale = false;
            self.pruned_nsq_stale = false;
        }
    }

    /// Closed nodes that no longer satisfy the goal test under the updated
    /// problem (§4.7 "closed nodes may become unsolved") are reopened.
    fn drain_closed(&mut self, apr_stale: bool, nsq_stale: bool) {
        let problem = &self.problem;
        let mut requeue = Vec::new();
        self.closed.retain(|_, node| {
            if apr_stale {
                node.recompute_apr(problem);
            }
            if nsq_stale {
                node.recompute_nsq(problem);
            }
            if node.is_goal(problem) {
                true
            } else {
                node.set_status(NodeStatus::Open);
                requeue.push(node.clone());
                false
            }
        });
        for node in requeue {
            self.open.push(Self::key(&node), Self::priority(&node), node);
        }
    }

    /// Pruned nodes whose schedule-infeasibility no longer holds (§4.7
    /// "previously pruned may become reachable") are reopened; capacity
    /// prunes are untouched since they are not heuristic-driven.
    fn drain_pruned(&mut self, apr_stale: bool, nsq_stale: bool) {
        let problem = &self.problem;
        let mut requeue = Vec::new();
        self.pruned.retain(|_, node| {
            if apr_stale {
                node.recompute_apr(problem);
            }
            if nsq_stale {
                node.recompute_nsq(problem);
            }
            if node.is_postpruned(problem) {
                true
            } else {
                node.set_status(NodeStatus::Open);
                requeue.push(node.clone());
                false
            }
        });
        for node in requeue {
            self.open.push(Self::key(&node), Self::priority(&node), node);
        }
    }

    /// `continueSearch`: drains stale buckets first, then resumes the main
    /// loop over whatever remains in open (§4.7 "Invalidation strategy").
    pub fn continue_search(&mut self, timeout: Option<Duration>) -> ItagsSearchResult {
        self.drain_stale();
        self.run_loop(timeout)
    }

    fn expand(&mut self, current: &Arc<AllocationSearchNode>) -> Vec<Arc<AllocationSearchNode>> {
        let mut children = Vec::new();
        for task in 0..self.problem.num_tasks {
            for robot in 0..self.problem.num_robots {
                if current.matrix.is_assigned(task, robot) {
                    continue;
                }
                let assignment = Assignment { task, robot };
                let id = self.ids.next();
                let allocation_node = AllocationNode::child(id, &current.allocation, assignment);
                let matrix = allocation_node.reconstruct(self.problem.num_tasks, self.problem.num_robots);
                self.stats.nodes_generated += 1;

                if exceeds_capacity(&matrix, robot, self.problem.max_tasks_per_robot) {
                    let node = AllocationSearchNode::new_capacity_pruned(id, Some(current.clone()), allocation_node, matrix, current.g);
                    self.stats.nodes_pruned += 1;
                    self.pruned.insert(Self::key(&node), node);
                    continue;
                }

                let node = AllocationSearchNode::new(id, Some(current.clone()), allocation_node, matrix, current.g, &self.problem);
                self.stats.nodes_evaluated += 1;
                children.push(node);
            }
        }
        children
    }

    fn run_loop(&mut self, timeout: Option<Duration>) -> ItagsSearchResult {
        let deadline = timeout.map(|d| Instant::now() + d);

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    info!("itags search timed out after {} expansions", self.stats.nodes_expanded);
                    return ItagsSearchResult {
                        outcome: SearchOutcome::NoGoalTimeout,
                        goal: None,
                        stats: self.stats,
                    };
                }
            }

            let Some((key, _, current)) = self.open.pop() else {
                info!("itags search exhausted its open set after {} expansions", self.stats.nodes_expanded);
                return ItagsSearchResult {
                    outcome: SearchOutcome::NoGoalExhausted,
                    goal: None,
                    stats: self.stats,
                };
            };

            current.set_status(NodeStatus::Closed);
            self.stats.nodes_expanded += 1;

            if current.is_goal(&self.problem) {
                self.closed.insert(key, current.clone());
                self.goal = Some(current.clone());
                info!("itags search reached a goal after {} expansions", self.stats.nodes_expanded);
                return ItagsSearchResult {
                    outcome: SearchOutcome::Goal,
                    goal: Some(current),
                    stats: self.stats,
                };
            }

            self.closed.insert(key, current.clone());

            let children = self.expand(&current);
            if children.is_empty() {
                self.stats.nodes_deadend += 1;
            }

            for child in children {
                let child_key = Self::key(&child);

                if let Some(existing) = self.closed.get(&child_key) {
                    if existing.g <= child.g {
                        continue;
                    }
                    self.closed.remove(&child_key);
                    self.stats.nodes_reopened += 1;
                }

                if child.is_postpruned(&self.problem) {
                    child.set_status(NodeStatus::Pruned);
                    self.stats.nodes_pruned += 1;
                    self.pruned.insert(child_key, child);
                    continue;
                }

                self.open.push(child_key, Self::priority(&child), child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::reduction::RobotTraitsMatrixReduction;

    /// Scenario S4: two tasks, two robots, each trait covered by exactly one
    /// robot, no precedence. Expected: {T0<-R0, T1<-R1}, APR=0, makespan
    /// equal to the longer task duration.
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
    fn scenario_s4_minimal_allocation() {
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
    fn scenario_s5_ditags_add_robot_preserves_optimal_allocation() {
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
        // The original allocation was already optimal, so repair should
        // rediscover it via the previous-solution fast-path rather than
        // building a new one from scratch.
        assert!(goal.matrix.is_assigned(0, 0));
        assert!(goal.matrix.is_assigned(1, 1));
        let repair_expansions = search.stats().nodes_expanded - fresh_solve_expansions;
        assert!(repair_expansions < fresh_solve_expansions);
    }

    #[test]
    fn empty_coalition_never_satisfies_the_goal_test() {
        let search = ItagsSearch::new(s4_problem());
        assert!(!search.root.is_goal(&search.problem));
    }
}
