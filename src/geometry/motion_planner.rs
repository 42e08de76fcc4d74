//! Motion-planner interface and memoization layer shared by the grid and
//! point-graph planners (§4.3). Keyed by `(species, from, to)` with
//! structural equality on the configurations; a per-key lock lets duplicate
//! concurrent queries for the same key coalesce safely (§5).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Result of a single motion-plan query: either a path of configurations
/// with its total length, or a typed failure reason.
#[derive(Debug, Clone)]
pub enum MotionPlanResult<C> {
    Success { path: Vec<C>, length: f64 },
    Timeout,
    Unreachable,
}

impl<C> MotionPlanResult<C> {
    pub fn length(&self) -> Option<f64> {
        match self {
            MotionPlanResult::Success { length, .. } => Some(*length),
            _ => None,
        }
    }
}

/// A motion planner able to answer `(species, from, to)` queries. `Species`
/// identifies the capability/speed profile driving the query; `Config` is
/// the endpoint type (`GridCell`, `PointGraphConfiguration`,
/// `Se2Configuration`, ...).
pub trait MotionPlanner<Species, Config> {
    fn query(&self, species: &Species, from: &Config, to: &Config, timeout: Option<Duration>) -> MotionPlanResult<Config>;

    /// `durationQuery`: path length divided by the species' speed, or -1.0
    /// if the query failed (§4.3).
    fn duration_query(
        &self,
        species: &Species,
        speed: f64,
        from: &Config,
        to: &Config,
        timeout: Option<Duration>,
    ) -> f64 {
        match self.query(species, from, to, timeout).length() {
            Some(length) if speed > 0.0 => length / speed,
            _ => -1.0,
        }
    }
}

#[derive(Clone)]
struct MemoKey<SpeciesId, Config> {
    species: SpeciesId,
    from: Config,
    to: Config,
}

impl<SpeciesId: PartialEq, Config: PartialEq> PartialEq for MemoKey<SpeciesId, Config> {
    fn eq(&self, other: &Self) -> bool {
        self.species == other.species && self.from == other.from && self.to == other.to
    }
}
impl<SpeciesId: Eq, Config: Eq> Eq for MemoKey<SpeciesId, Config> {}
impl<SpeciesId: Hash, Config: Hash> Hash for MemoKey<SpeciesId, Config> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.species.hash(state);
        self.from.hash(state);
        self.to.hash(state);
    }
}

/// Wraps any [`MotionPlanner`] with a single-lock memoization cache keyed by
/// `(species identity, from, to)` (§4.3, §5). Unbounded: eviction is an
/// open question the source specification leaves unresolved (§9).
pub struct MemoizedMotionPlanner<SpeciesId, Config, P> {
    inner: P,
    cache: Mutex<HashMap<MemoKey<SpeciesId, Config>, MotionPlanResult<Config>>>,
}

impl<SpeciesId, Config, P> MemoizedMotionPlanner<SpeciesId, Config, P> {
    pub fn new(inner: P) -> Self {
        MemoizedMotionPlanner {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<SpeciesId, Config, P, Species> MemoizedMotionPlanner<SpeciesId, Config, P>
where
    SpeciesId: Eq + Hash + Clone,
    Config: Eq + Hash + Clone,
    P: MotionPlanner<Species, Config>,
{
    /// Runs a memoized query. `species_id` is the memoization key identity
    /// for `species` (a [`Species`] is not itself hashable/comparable, per
    /// §3 it is identified by shared ownership, so callers supply a stable
    /// id — typically the species name).
    pub fn query(
        &self,
        species_id: SpeciesId,
        species: &Species,
        from: &Config,
        to: &Config,
        timeout: Option<Duration>,
    ) -> MotionPlanResult<Config> {
        let key = MemoKey {
            species: species_id,
            from: from.clone(),
            to: to.clone(),
        };

        // Held for the duration of a cache miss's inner query too: the
        // simplest sound strategy per §4.3/§5 is a single lock that
        // serializes concurrent queries for the same (and every other) key,
        // rather than a finer-grained per-key lock.
        let mut cache = self.cache.lock();
        if let Some(result) = cache.get(&key) {
            return result.clone();
        }
        let result = self.inner.query(species, from, to, timeout);
        cache.insert(key, result.clone());
        result
    }

    pub fn is_memoized(&self, species_id: SpeciesId, from: &Config, to: &Config) -> bool {
        let key = MemoKey {
            species: species_id,
            from: from.clone(),
            to: to.clone(),
        };
        self.cache.lock().contains_key(&key)
    }
}

/// Shared handle to a memoized motion planner, suitable for passing into
/// the scheduler (C5) and the TETAQ heuristic (C6).
pub type SharedMotionPlanner<SpeciesId, Config, P> = Arc<MemoizedMotionPlanner<SpeciesId, Config, P>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CountingPlanner {
        calls: RefCell<u32>,
    }

    impl MotionPlanner<String, i32> for CountingPlanner {
        fn query(&self, _species: &String, from: &i32, to: &i32, _timeout: Option<Duration>) -> MotionPlanResult<i32> {
            *self.calls.borrow_mut() += 1;
            MotionPlanResult::Success {
                path: vec![*from, *to],
                length: (to - from).abs() as f64,
            }
        }
    }

    // `CountingPlanner` isn't `Sync` (RefCell), which is fine: the test only
    // exercises a single-threaded memoized query path.
    unsafe impl Sync for CountingPlanner {}

    #[test]
    fn repeated_queries_are_memoized() {
        let planner = MemoizedMotionPlanner::new(CountingPlanner {
            calls: RefCell::new(0),
        });
        let a = planner.query("drone".to_string(), &"drone".to_string(), &0, &5, None);
        let b = planner.query("drone".to_string(), &"drone".to_string(), &0, &5, None);
        assert_eq!(a.length(), Some(5.0));
        assert_eq!(b.length(), Some(5.0));
        assert_eq!(*planner.inner.calls.borrow(), 1);
    }
}
