//! Generic best-first / A* search kernel (C1, §4.1). Templated over the
//! strategy set a concrete planner provides through [`SearchProblem`]:
//! successor generation, heuristic evaluation, goal test, deduplication, and
//! pre/post pruning. Every planner in the crate (grid A*, point-graph A*,
//! CBS's low-level space-time A*, and the ITAGS allocation search) drives
//! this same loop.

use std::cell::Cell;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fxhash::FxHashMap;
use log::{debug, info};

use super::node::{NodeIdAllocator, NodeStatus, SearchNode};
use super::pqueue::MutablePriorityQueue;
use super::statistics::{
    SearchInstrumentation, TIMER_HEURISTIC, TIMER_PATH_COST, TIMER_SUCCESSOR_GENERATION,
};

/// Domain-independent search node: a domain `State` plus path-cost `g` and
/// heuristic `h`, with a shared-ownership parent link for trace
/// reconstruction (§3 "Best-first node").
pub struct BestFirstNode<S> {
    id: u64,
    pub parent: Option<Arc<BestFirstNode<S>>>,
    pub state: Arc<S>,
    pub g: f64,
    pub h: f64,
    status: Cell<NodeStatus>,
}

impl<S> BestFirstNode<S> {
    pub fn status(&self) -> NodeStatus {
        self.status.get()
    }

    pub fn set_status(&self, status: NodeStatus) {
        self.status.set(status);
    }

    /// Walks the parent chain from this node to the root, returning states
    /// in root-to-node order.
    pub fn trace(self: &Arc<Self>) -> Vec<Arc<S>> {
        let mut states = vec![];
        let mut current = Some(self.clone());
        while let Some(node) = current {
            states.push(node.state.clone());
            current = node.parent.clone();
        }
        states.reverse();
        states
    }
}

impl<S> SearchNode for BestFirstNode<S> {
    fn id(&self) -> u64 {
        self.id
    }
    fn g(&self) -> f64 {
        self.g
    }
    fn h(&self) -> f64 {
        self.h
    }
}

impl<S: Debug> Debug for BestFirstNode<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestFirstNode")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("g", &self.g)
            .field("h", &self.h)
            .field("status", &self.status.get())
            .finish()
    }
}

/// A successor candidate before it is turned into a full node: the new
/// state plus the incremental path cost of the edge that produced it.
pub struct Successor<S> {
    pub state: Arc<S>,
    pub edge_cost: f64,
}

/// The pluggable strategy set a concrete search problem must provide.
/// `heuristic` returns `None` when the goal is provably unreachable from the
/// given state, which the kernel treats as an implicit prepruning signal.
pub trait SearchProblem {
    type State: Eq + Hash + Clone + Debug;
    /// Key used to detect that two different search paths reached
    /// equivalent states (§4.1 step b, "canonical representative").
    type DedupKey: Eq + Hash + Clone;

    fn root_state(&mut self) -> Arc<Self::State>;

    fn successors(&mut self, node: &Arc<BestFirstNode<Self::State>>) -> Vec<Successor<Self::State>>;

    fn heuristic(&mut self, state: &Self::State) -> Option<f64>;

    fn is_goal(&mut self, state: &Self::State) -> bool;

    fn dedup_key(&self, state: &Self::State) -> Self::DedupKey;

    /// Evaluated before the heuristic/memoization lookup; a `true` return
    /// drops the child immediately.
    fn preprune(&mut self, _node: &BestFirstNode<Self::State>) -> bool {
        false
    }

    /// Evaluated after the heuristic has been computed; lets a problem
    /// prune based on information only available post-evaluation (e.g. the
    /// scheduler's infeasibility signal in ITAGS, §4.7).
    fn postprune(&mut self, _node: &BestFirstNode<Self::State>) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Goal,
    NoGoalTimeout,
    NoGoalExhausted,
}

pub struct SearchResult<S> {
    pub outcome: SearchOutcome,
    pub goal: Option<Arc<BestFirstNode<S>>>,
    pub instrumentation: SearchInstrumentation,
}

/// Generic best-first/A* driver (§4.1). Owns the open/closed/pruned
/// bookkeeping so that a problem implementation only has to describe
/// successors, heuristics, goal tests, and pruning — never queue mechanics.
pub struct SearchKernel<P: SearchProblem> {
    problem: P,
    ids: NodeIdAllocator,
    open: MutablePriorityQueue<
        P::DedupKey,
        (ordered_float::OrderedFloat<f64>, std::cmp::Reverse<ordered_float::OrderedFloat<f64>>, u64),
        Arc<BestFirstNode<P::State>>,
    >,
    closed: FxHashMap<P::DedupKey, Arc<BestFirstNode<P::State>>>,
    pruned: Vec<Arc<BestFirstNode<P::State>>>,
    retain_pruned: bool,
}

impl<P: SearchProblem> SearchKernel<P> {
    pub fn new(problem: P) -> Self {
        SearchKernel {
            problem,
            ids: NodeIdAllocator::new(),
            open: MutablePriorityQueue::new(),
            closed: FxHashMap::default(),
            pruned: Vec::new(),
            retain_pruned: true,
        }
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn problem_mut(&mut self) -> &mut P {
        &mut self.problem
    }

    pub fn pruned(&self) -> &[Arc<BestFirstNode<P::State>>] {
        &self.pruned
    }

    fn priority_key(
        node: &BestFirstNode<P::State>,
    ) -> (ordered_float::OrderedFloat<f64>, std::cmp::Reverse<ordered_float::OrderedFloat<f64>>, u64)
    {
        super::node::node_priority_key(node)
    }

    fn make_root(&mut self) -> Arc<BestFirstNode<P::State>> {
        let state = self.problem.root_state();
        let h = self.problem.heuristic(&state).unwrap_or(f64::INFINITY);
        Arc::new(BestFirstNode {
            id: self.ids.next(),
            parent: None,
            state,
            g: 0.0,
            h,
            status: Cell::new(NodeStatus::Open),
        })
    }

    /// Creates the root via the problem's `root_state` and runs
    /// `search_from_node` from it (§4.1 `search()`).
    pub fn search(&mut self, timeout: Option<Duration>) -> SearchResult<P::State> {
        let root = self.make_root();
        self.search_from_node(root, timeout)
    }

    /// Main loop (§4.1 `searchFromNode`). Pushes `start` onto open and runs
    /// until a goal is popped, the open set empties, or `timeout` elapses.
    pub fn search_from_node(
        &mut self,
        start: Arc<BestFirstNode<P::State>>,
        timeout: Option<Duration>,
    ) -> SearchResult<P::State> {
        let mut instrumentation = SearchInstrumentation::default();
        let deadline = timeout.map(|d| Instant::now() + d);

        let start_key = self.problem.dedup_key(&start.state);
        self.open.push(start_key, Self::priority_key(&start), start);
        instrumentation.stats.nodes_generated += 1;
        debug!("search started from root node");

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    info!(
                        "search timed out after {} expansions",
                        instrumentation.stats.nodes_expanded
                    );
                    return SearchResult {
                        outcome: SearchOutcome::NoGoalTimeout,
                        goal: None,
                        instrumentation,
                    };
                }
            }

            let Some((_, _, current)) = self.open.pop() else {
                info!(
                    "search exhausted its open set after {} expansions",
                    instrumentation.stats.nodes_expanded
                );
                return SearchResult {
                    outcome: SearchOutcome::NoGoalExhausted,
                    goal: None,
                    instrumentation,
                };
            };

            current.set_status(NodeStatus::Closed);
            instrumentation.stats.nodes_expanded += 1;

            if self.problem.is_goal(&current.state) {
                self.closed
                    .insert(self.problem.dedup_key(&current.state), current.clone());
                info!(
                    "search reached a goal after {} expansions",
                    instrumentation.stats.nodes_expanded
                );
                return SearchResult {
                    outcome: SearchOutcome::Goal,
                    goal: Some(current),
                    instrumentation,
                };
            }

            let successors = {
                let _t = instrumentation.timers.scope(TIMER_SUCCESSOR_GENERATION);
                self.problem.successors(&current)
            };

            if successors.is_empty() {
                instrumentation.stats.nodes_deadend += 1;
            }

            self.closed
                .insert(self.problem.dedup_key(&current.state), current.clone());

            for successor in successors {
                instrumentation.stats.nodes_generated += 1;

                let g = {
                    let _t = instrumentation.timers.scope(TIMER_PATH_COST);
                    current.g + successor.edge_cost
                };

                let h = {
                    let _t = instrumentation.timers.scope(TIMER_HEURISTIC);
                    self.problem.heuristic(&successor.state)
                };
                let Some(h) = h else {
                    // Goal not reachable from this state: an implicit prune.
                    instrumentation.stats.nodes_pruned += 1;
                    continue;
                };
                instrumentation.stats.nodes_evaluated += 1;

                let child = Arc::new(BestFirstNode {
                    id: self.ids.next(),
                    parent: Some(current.clone()),
                    state: successor.state,
                    g,
                    h,
                    status: Cell::new(NodeStatus::Open),
                });

                if self.problem.preprune(&child) {
                    child.set_status(NodeStatus::Pruned);
                    instrumentation.stats.nodes_pruned += 1;
                    if self.retain_pruned {
                        self.pruned.push(child);
                    }
                    continue;
                }

                let key = self.problem.dedup_key(&child.state);
                if let Some(existing) = self.closed.get(&key) {
                    if existing.g <= child.g {
                        // A representative with equal or better cost was
                        // already closed; admissible h means no reopening
                        // is required.
                        continue;
                    }
                    instrumentation.stats.nodes_reopened += 1;
                    self.closed.remove(&key);
                }

                if self.problem.postprune(&child) {
                    child.set_status(NodeStatus::Pruned);
                    instrumentation.stats.nodes_pruned += 1;
                    if self.retain_pruned {
                        self.pruned.push(child);
                    }
                    continue;
                }

                self.open.push(key, Self::priority_key(&child), child);
            }
        }
    }
}
