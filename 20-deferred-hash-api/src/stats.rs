//! Request statistics shared by every write handler.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Aggregates the number of admitted writes and their cumulative latency.
///
/// Both fields sit behind one lock so a snapshot never mixes a count from one
/// moment with a latency sum from another. The lock is never held across an
/// await, so recording cannot be interrupted by a dropped request.
#[derive(Debug, Default)]
pub struct Stats {
    totals: Mutex<Totals>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    requests: u64,
    latency_micros: f64,
}

/// Point-in-time view of [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub total: u64,
    pub cumulative_latency: f64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one write that took `latency_micros` microseconds.
    pub fn update(&self, latency_micros: f64) {
        let mut totals = self.lock();
        totals.requests += 1;
        totals.latency_micros += latency_micros;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let totals = *self.lock();
        StatsSnapshot {
            total: totals.requests,
            cumulative_latency: totals.latency_micros,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Totals> {
        // Totals stay consistent even if a holder panicked.
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatsSnapshot {
    /// Mean latency per write. NaN when nothing has been recorded yet.
    pub fn average(&self) -> f64 {
        self.cumulative_latency / self.total as f64
    }

    /// Renders the JSON record served by `/stats`.
    ///
    /// Written by hand because the empty average must appear as a bare `NaN`,
    /// which strict JSON encoders refuse to emit.
    pub fn to_json(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"{{"total": {}, "average": {:.6}}}"#,
            self.total,
            self.average()
        )
    }
}
