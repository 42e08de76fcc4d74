//! Scoped timers (§9 design note: "Scoped timers via RAII"). A `TimeKeeper`
//! accumulates durations under stable string tags; a `TimerScope` is an RAII
//! guard that adds its elapsed time to the keeper on every exit path,
//! including early returns.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct TimeKeeper {
    accumulated: HashMap<&'static str, Duration>,
}

impl TimeKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope<'a>(&'a mut self, name: &'static str) -> TimerScope<'a> {
        TimerScope {
            keeper: self,
            name,
            start: Instant::now(),
        }
    }

    pub fn time(&self, name: &'static str) -> Duration {
        self.accumulated.get(name).copied().unwrap_or_default()
    }

    fn add(&mut self, name: &'static str, elapsed: Duration) {
        *self.accumulated.entry(name).or_default() += elapsed;
    }
}

/// RAII guard: records elapsed wall time into its `TimeKeeper` on `Drop`, so
/// every exit path (normal return, early `?`, or panic unwind) is accounted
/// for without a manual stop call at each return site.
pub struct TimerScope<'a> {
    keeper: &'a mut TimeKeeper,
    name: &'static str,
    start: Instant,
}

impl<'a> Drop for TimerScope<'a> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        self.keeper.add(self.name, elapsed);
    }
}
