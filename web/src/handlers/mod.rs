//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by resource.

pub mod betting_tickets;
pub mod health;
pub mod initialize;
pub mod races;
pub mod users;

use crate::error::AppError;
use raceticket_core::RaceId;

/// Parses a race id path segment. A malformed id cannot name a race, so it
/// is reported as 404.
pub(crate) fn parse_race_id(raw: &str) -> Result<RaceId, AppError> {
    raw.parse().map_err(|_| AppError::not_found("Race", raw))
}

// Re-export common handler utilities
pub use health::{health_check, readiness_check};
