//! Per-search statistics counters (§4.1: "Statistics recorded at minimum").

use super::timer::TimeKeeper;

#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStatistics {
    pub nodes_generated: u64,
    pub nodes_evaluated: u64,
    pub nodes_expanded: u64,
    pub nodes_reopened: u64,
    pub nodes_pruned: u64,
    pub nodes_deadend: u64,
}

/// Owns both the counters and the phase timers for a single search run.
pub struct SearchInstrumentation {
    pub stats: SearchStatistics,
    pub timers: TimeKeeper,
}

impl Default for SearchInstrumentation {
    fn default() -> Self {
        SearchInstrumentation {
            stats: SearchStatistics::default(),
            timers: TimeKeeper::new(),
        }
    }
}

pub const TIMER_PATH_COST: &str = "path_cost";
pub const TIMER_HEURISTIC: &str = "heuristic";
pub const TIMER_SUCCESSOR_GENERATION: &str = "successor_generation";
