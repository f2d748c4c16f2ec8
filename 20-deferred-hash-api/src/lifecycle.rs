//! Shutdown coordination for deferred work.
//!
//! The service starts in [`Phase::Running`]. A shutdown request moves it to
//! [`Phase::Draining`] exactly once; from then on no new deferred unit is
//! admitted and [`Lifecycle::drained`] resolves as soon as the units admitted
//! earlier have all finished.
//!
//! The phase and the in-flight counter live in a single `watch` value. The
//! admission check and the counter increment happen inside one
//! `send_if_modified` call, so a unit can never slip in after a drain has
//! observed the counter at zero.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Draining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleState {
    pub phase: Phase,
    pub in_flight: usize,
}

impl LifecycleState {
    fn is_drained(&self) -> bool {
        self.phase == Phase::Draining && self.in_flight == 0
    }
}

/// Returned when admission is attempted after shutdown has begun.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("service is draining")]
pub struct Draining;

#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState {
            phase: Phase::Running,
            in_flight: 0,
        });
        Self { state }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn in_flight(&self) -> usize {
        self.state().in_flight
    }

    /// Registers one deferred unit if the service is still running.
    ///
    /// The unit stays registered until the returned guard is dropped.
    pub fn admit(self: &Arc<Self>) -> Result<InFlight, Draining> {
        let admitted = self.state.send_if_modified(|state| match state.phase {
            Phase::Running => {
                state.in_flight += 1;
                true
            }
            Phase::Draining => false,
        });

        if admitted {
            Ok(InFlight {
                lifecycle: Arc::clone(self),
            })
        } else {
            Err(Draining)
        }
    }

    /// Moves the service to [`Phase::Draining`].
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn begin_shutdown(&self) -> bool {
        self.state.send_if_modified(|state| match state.phase {
            Phase::Running => {
                state.phase = Phase::Draining;
                true
            }
            Phase::Draining => false,
        })
    }

    /// Waits until shutdown has begun and every admitted unit has finished.
    ///
    /// There is no timeout; a unit that never finishes blocks this forever.
    pub async fn drained(&self) {
        let mut rx = self.state.subscribe();
        // `self` owns the sender, so the wait can only end once the predicate holds.
        let _ = rx.wait_for(LifecycleState::is_drained).await;
    }
}

/// Registration of one in-flight deferred unit. Deregisters on drop.
#[derive(Debug)]
pub struct InFlight {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.lifecycle.state.send_modify(|state| state.in_flight -= 1);
    }
}
