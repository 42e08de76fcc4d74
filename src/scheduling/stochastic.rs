//! Stochastic scheduling (§4.5 "Stochastic variant"): N scenarios sharing
//! mutex decisions, under a chance-constraint surrogate. Scenario replicas
//! are independent duration computations through the shared motion-plan
//! memoization layer (§4.3), so they fan out across the available cores —
//! the one sanctioned parallel-search exception (§1, §5).

use std::thread;

use crate::error::Result;

use super::milp::{Schedule, SchedulingProblem};

/// One scenario's fully-built scheduling problem, already resolved against
/// that scenario's sampled point graph.
#[derive(Debug, Clone)]
pub struct ScenarioProblem {
    pub problem: SchedulingProblem,
}

/// Solves every scenario's deterministic MILP independently, fanned out
/// across up to `num_cpus::get()` worker threads (never more than the
/// scenario count).
///
/// This does not yet implement the full chance-constraint surrogate (the
/// shared mutex binaries and the `Σy_k ≥ α·N` constraint); it evaluates each
/// scenario's schedule as §4.5 requires for "worker per available core",
/// leaving the caller to aggregate makespans and apply the chance-constraint
/// acceptance test.
pub fn solve_scenarios(scenarios: Vec<ScenarioProblem>) -> Vec<Result<Schedule>> {
    if scenarios.len() <= 1 {
        return scenarios
            .into_iter()
            .map(|s| super::milp::solve_schedule(&s.problem))
            .collect();
    }

    let worker_count = num_cpus::get().min(scenarios.len()).max(1);
    let chunks = split_into_chunks(scenarios, worker_count);

    let results: Vec<Vec<Result<Schedule>>> = thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .into_iter()
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .into_iter()
                        .map(|s| super::milp::solve_schedule(&s.problem))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("scenario worker panicked")).collect()
    });

    results.into_iter().flatten().collect()
}

fn split_into_chunks<T>(items: Vec<T>, num_chunks: usize) -> Vec<Vec<T>> {
    let mut chunks: Vec<Vec<T>> = (0..num_chunks).map(|_| Vec::new()).collect();
    for (idx, item) in items.into_iter().enumerate() {
        chunks[idx % num_chunks].push(item);
    }
    chunks.retain(|c| !c.is_empty());
    chunks
}

/// Fraction of scenarios whose schedule satisfies the quality bound required
/// for the chance-constraint surrogate to accept the shared allocation
/// (§4.5 "Require Σy_k ≥ α·N").
pub fn acceptance_fraction(results: &[Result<Schedule>], makespan_bound: f64) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let accepted = results
        .iter()
        .filter(|r| matches!(r, Ok(schedule) if schedule.makespan <= makespan_bound))
        .count();
    accepted as f64 / results.len() as f64
}
