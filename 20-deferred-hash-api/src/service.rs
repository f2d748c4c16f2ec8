//! The shared context every handler and deferred unit works against.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::{
    error::ServiceError,
    lifecycle::{Lifecycle, Phase},
    scheduler::Scheduler,
    stats::{Stats, StatsSnapshot},
    store::{StoredValue, Ticket, TicketStore},
};

/// Delay before a submitted value is digested.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    pub delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
        }
    }
}

/// Ticket store, statistics and lifecycle bundled behind cheap clones.
#[derive(Debug, Clone)]
pub struct HashService {
    store: Arc<TicketStore>,
    stats: Arc<Stats>,
    lifecycle: Arc<Lifecycle>,
    scheduler: Scheduler,
}

impl Default for HashService {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}

impl HashService {
    pub fn new(config: ServiceConfig) -> Self {
        let store = Arc::new(TicketStore::new());
        let lifecycle = Arc::new(Lifecycle::new());
        let scheduler = Scheduler::new(Arc::clone(&store), Arc::clone(&lifecycle), config.delay);
        Self {
            store,
            stats: Arc::new(Stats::new()),
            lifecycle,
            scheduler,
        }
    }

    /// Reserves a ticket for `value` and schedules its digest.
    ///
    /// Returns as soon as the ticket is reserved. Only successful writes are
    /// counted in the statistics, timed in microseconds.
    pub async fn admit_write(&self, value: &str) -> Result<Ticket, ServiceError> {
        let started = Instant::now();

        // Cheap early exit so draining wins over input validation. The
        // authoritative check is the atomic admission inside `submit`.
        if self.lifecycle.phase() == Phase::Draining {
            return Err(ServiceError::ServiceUnavailable);
        }
        if value.is_empty() {
            return Err(ServiceError::InvalidInput);
        }

        let (ticket, _unit) = self.scheduler.submit(value.to_owned()).await?;

        // No await between the reservation above and this update, so every
        // reserved ticket is counted even if the caller goes away.
        let latency = started.elapsed().as_secs_f64() * 1e6;
        self.stats.update(latency);
        debug!(ticket, latency_us = latency, "write admitted");

        Ok(ticket)
    }

    /// Returns whatever is stored for `ticket`: the placeholder or its digest.
    pub async fn read(&self, ticket: Ticket) -> Result<StoredValue, ServiceError> {
        self.store
            .lookup(ticket)
            .await
            .ok_or(ServiceError::NotFound)
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stops admitting writes. Safe to call repeatedly; returns immediately.
    pub fn begin_shutdown(&self) -> bool {
        let transitioned = self.lifecycle.begin_shutdown();
        if transitioned {
            info!(
                in_flight = self.lifecycle.in_flight(),
                "shutdown requested, draining deferred work"
            );
        }
        transitioned
    }

    /// Resolves once shutdown has begun and all deferred work has finished.
    pub async fn drained(&self) {
        self.lifecycle.drained().await;
        info!("deferred work drained");
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn in_flight(&self) -> usize {
        self.lifecycle.in_flight()
    }

    pub fn delay(&self) -> Duration {
        self.scheduler.delay()
    }
}
