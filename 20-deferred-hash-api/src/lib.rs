//! HTTP service that hands out a ticket for every submitted value and
//! computes the value's digest later, in the background.
//!
//! A write reserves the next ticket with a placeholder and returns at once.
//! A deferred task waits out a fixed delay, digests the value and finalizes
//! the ticket. Reads return whatever is currently stored. On shutdown the
//! service stops admitting writes and waits for outstanding digests before
//! the process exits.
//!
//! - [`digest`] is the SHA-512 / base64 digest function.
//! - [`store`] keeps tickets behind a reader/writer lock.
//! - [`stats`] aggregates write counts and latencies.
//! - [`lifecycle`] tracks the running/draining phase and in-flight work.
//! - [`scheduler`] launches the deferred digest tasks.
//! - [`service`] bundles the above into the context shared by handlers.
//! - [`http`] exposes the service over axum; [`cli`] parses flags.

pub mod cli;
pub mod digest;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod store;

pub use error::ServiceError;
pub use service::{HashService, ServiceConfig};
