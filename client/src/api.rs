//! API paths.

use chrono::{DateTime, SecondsFormat, Utc};
use raceticket_core::RaceId;
use raceticket_core::repository::{RaceRelations, RaceWindow};

/// Prefix every API route is mounted under.
pub const API_PREFIX: &str = "/api";

/// `GET` the caller (or create an anonymous user).
#[must_use]
pub fn users_me() -> String {
    format!("{API_PREFIX}/users/me")
}

/// `POST` a balance charge.
#[must_use]
pub fn charge() -> String {
    format!("{API_PREFIX}/users/me/charge")
}

/// `GET` the hero image.
#[must_use]
pub fn hero() -> String {
    format!("{API_PREFIX}/hero")
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `GET` races starting inside `window`.
#[must_use]
pub fn races(window: RaceWindow) -> String {
    let mut params = Vec::new();
    if let Some(since) = window.since {
        params.push(format!("since={}", timestamp(since)));
    }
    if let Some(until) = window.until {
        params.push(format!("until={}", timestamp(until)));
    }

    if params.is_empty() {
        format!("{API_PREFIX}/races")
    } else {
        format!("{API_PREFIX}/races?{}", params.join("&"))
    }
}

/// `GET` one race, shaped by `relations`.
#[must_use]
pub fn race(id: RaceId, relations: RaceRelations) -> String {
    match (relations.entries, relations.player) {
        (true, true) => format!("{API_PREFIX}/races/{id}?entries=true&player=true"),
        (true, false) => format!("{API_PREFIX}/races/{id}?entries=true"),
        _ => format!("{API_PREFIX}/races/{id}"),
    }
}

/// `GET` a race with entries and players.
#[must_use]
pub fn race_entries(id: RaceId) -> String {
    format!("{API_PREFIX}/races/{id}/entries")
}

/// `GET` a race's trifecta odds.
#[must_use]
pub fn trifecta_odds(id: RaceId) -> String {
    format!("{API_PREFIX}/races/{id}/trifectaOdds")
}

/// `GET` or `POST` the caller's betting tickets for a race.
#[must_use]
pub fn betting_tickets(id: RaceId) -> String {
    format!("{API_PREFIX}/races/{id}/betting-tickets")
}

/// `POST` a data reset.
#[must_use]
pub fn initialize() -> String {
    format!("{API_PREFIX}/initialize")
}
