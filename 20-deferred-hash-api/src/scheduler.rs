//! Deferred digest computation.
//!
//! Each admitted write gets one independent task that waits out the configured
//! delay, digests the submitted value and finalizes the ticket. Tasks are never
//! cancelled, and nothing bounds how many can be in flight at once; a burst of
//! writes right before shutdown lengthens the drain accordingly.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    digest::digest,
    lifecycle::{Draining, InFlight, Lifecycle},
    store::{Ticket, TicketStore},
};

#[derive(Debug, Clone)]
pub struct Scheduler {
    store: Arc<TicketStore>,
    lifecycle: Arc<Lifecycle>,
    delay: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<TicketStore>, lifecycle: Arc<Lifecycle>, delay: Duration) -> Self {
        Self {
            store,
            lifecycle,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Reserves a ticket for `value` and starts its deferred unit.
    ///
    /// The unit is registered with the lifecycle before the ticket is
    /// reserved, so a draining service never hands out a ticket.
    pub async fn submit(&self, value: String) -> Result<(Ticket, JoinHandle<()>), Draining> {
        let slot = self.lifecycle.admit()?;
        let ticket = self.store.reserve().await;
        debug!(ticket, "ticket reserved");

        let handle = tokio::spawn(run_unit(
            Arc::clone(&self.store),
            ticket,
            value,
            self.delay,
            slot,
        ));
        Ok((ticket, handle))
    }
}

async fn run_unit(
    store: Arc<TicketStore>,
    ticket: Ticket,
    value: String,
    delay: Duration,
    _slot: InFlight,
) {
    tokio::time::sleep(delay).await;

    match store.finalize(ticket, digest(&value)).await {
        Ok(()) => debug!(ticket, "ticket finalized"),
        Err(err) => warn!(ticket, error = %err, "failed to finalize ticket"),
    }
}
