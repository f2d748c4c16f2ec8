use thiserror::Error;

use crate::lifecycle::Draining;

pub const MISSING_TICKET_MSG: &str = "must include a hash id after /hash/";
pub const BAD_TICKET_MSG: &str = "id value after /hash/ must be an integer";
pub const MISSING_VALUE_MSG: &str = "a form field 'password' must be included with the POST";
pub const NOT_FOUND_MSG: &str = "no hash with that id was found";
pub const UNAVAILABLE_MSG: &str = "Shutting down...";

/// Failures surfaced to callers. None of them are retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{}", MISSING_VALUE_MSG)]
    InvalidInput,
    #[error("{}", MISSING_TICKET_MSG)]
    MissingTicket,
    #[error("{}", BAD_TICKET_MSG)]
    BadTicket,
    #[error("{}", NOT_FOUND_MSG)]
    NotFound,
    #[error("{}", UNAVAILABLE_MSG)]
    ServiceUnavailable,
}

impl From<Draining> for ServiceError {
    fn from(_: Draining) -> Self {
        ServiceError::ServiceUnavailable
    }
}
