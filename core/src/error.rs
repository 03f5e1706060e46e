//! Domain errors.
//!
//! Each variant corresponds to one rejection class of the API; the web layer
//! maps them onto HTTP status codes.

use thiserror::Error;

/// Errors raised by the purchase and charge rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller has no identity
    #[error("authentication required")]
    Unauthenticated,

    /// Balance does not cover the ticket price
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance {
        /// Balance at the time of the check
        balance: i64,
        /// Price that had to be covered
        required: i64,
    },

    /// Request body is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Ticket sales for the race have closed
    #[error("race {race_id} is closed for betting")]
    RaceClosed {
        /// Race ID
        race_id: String,
    },
}
