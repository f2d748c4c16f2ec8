//! Sequentially keyed storage for reserved tickets.
//!
//! Every write reserves the next ticket with a placeholder value. A deferred
//! unit later swaps the placeholder for the finished digest. Entries are
//! never removed, so a ticket handed to a caller always resolves.

use std::fmt;

use thiserror::Error;
use tokio::sync::RwLock;

/// Opaque ticket handed back on write admission. Numbering starts at 1.
pub type Ticket = u64;

/// Text rendered for a ticket whose digest is still being computed.
pub const PLACEHOLDER: &str = "pending";

/// Value currently held for a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Pending,
    Finalized(String),
}

impl StoredValue {
    pub fn is_pending(&self) -> bool {
        matches!(self, StoredValue::Pending)
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Pending => f.write_str(PLACEHOLDER),
            StoredValue::Finalized(digest) => f.write_str(digest),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("ticket {0} was never reserved")]
    UnknownTicket(Ticket),
    #[error("ticket {0} is already finalized")]
    AlreadyFinalized(Ticket),
}

/// Ticket store guarded by a reader/writer lock.
///
/// Lookups share the lock; `reserve` and `finalize` take it exclusively.
/// Ticket `n` lives at index `n - 1`.
#[derive(Debug, Default)]
pub struct TicketStore {
    slots: RwLock<Vec<StoredValue>>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a placeholder under the next ticket and returns that ticket.
    pub async fn reserve(&self) -> Ticket {
        let mut slots = self.slots.write().await;
        slots.push(StoredValue::Pending);
        slots.len() as Ticket
    }

    /// Replaces the placeholder for `ticket` with its digest.
    ///
    /// A ticket can only be finalized once; later calls leave the first value
    /// in place and report [`StoreError::AlreadyFinalized`].
    pub async fn finalize(&self, ticket: Ticket, digest: String) -> Result<(), StoreError> {
        let mut slots = self.slots.write().await;
        let slot = index(ticket)
            .and_then(|idx| slots.get_mut(idx))
            .ok_or(StoreError::UnknownTicket(ticket))?;

        if !slot.is_pending() {
            return Err(StoreError::AlreadyFinalized(ticket));
        }

        *slot = StoredValue::Finalized(digest);
        Ok(())
    }

    /// Returns the current value for `ticket`, or `None` if it was never reserved.
    pub async fn lookup(&self, ticket: Ticket) -> Option<StoredValue> {
        let slots = self.slots.read().await;
        index(ticket).and_then(|idx| slots.get(idx)).cloned()
    }

    /// Number of tickets reserved so far.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn index(ticket: Ticket) -> Option<usize> {
    ticket
        .checked_sub(1)
        .and_then(|idx| usize::try_from(idx).ok())
}
