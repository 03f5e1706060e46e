//! Betting ticket endpoints.

use super::parse_race_id;
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use raceticket_core::purchase::{
    TICKET_PRICE, balance_after_purchase, ensure_affordable, ensure_race_open,
    parse_ticket_request,
};
use raceticket_core::repository::{Database, NewBettingTicket, RaceRelations, RepositoryError};
use raceticket_core::{BettingTicket, BettingTicketList, RaceId};
use raceticket_runtime::metrics::BettingMetrics;
use serde_json::Value;

/// The caller's tickets for a race, oldest first.
///
/// An id that is not a UUID cannot name a race and yields an empty list.
///
/// ```text
/// GET /api/races/:id/betting-tickets
/// ```
///
/// # Errors
///
/// Returns 401 without identity.
pub async fn list<D: Database>(
    State(state): State<AppState<D>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<BettingTicketList>, AppError> {
    let Ok(race_id) = id.parse::<RaceId>() else {
        return Ok(Json(BettingTicketList {
            betting_tickets: Vec::new(),
        }));
    };

    let betting_tickets = state.db.list_tickets(user.id, race_id).await?;
    Ok(Json(BettingTicketList { betting_tickets }))
}

fn rejected(reason: &'static str, err: impl Into<AppError>) -> AppError {
    BettingMetrics::record_rejection(reason);
    err.into()
}

/// Buys one ticket for the caller.
///
/// Checks run in a fixed order: identity (401), balance (412), body (400),
/// race existence (404), race closure (409). The ticket is then written and
/// the price deducted in one transaction that re-reads the balance under a
/// lock, so a concurrent purchase still ends in 412 rather than a negative
/// balance.
///
/// ```text
/// POST /api/races/:id/betting-tickets
/// Content-Type: application/json
///
/// {"key": [1, 2, 3], "type": "trifecta"}
/// ```
///
/// # Errors
///
/// See the check order above; storage failures are 500.
pub async fn purchase<D: Database>(
    State(state): State<AppState<D>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<BettingTicket>, AppError> {
    ensure_affordable(user.balance).map_err(|e| rejected("insufficient_balance", e))?;

    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        rejected(
            "invalid_request",
            AppError::bad_request(format!("invalid JSON body: {e}")),
        )
    })?;
    let request = parse_ticket_request(&body).map_err(|e| rejected("invalid_request", e))?;

    let race_id = parse_race_id(&id).map_err(|e| rejected("race_not_found", e))?;
    let race = state
        .db
        .find_race(race_id, RaceRelations::NONE)
        .await?
        .ok_or_else(|| rejected("race_not_found", AppError::not_found("Race", race_id)))?;

    ensure_race_open(&race, state.clock.now()).map_err(|e| rejected("race_closed", e))?;

    let ticket = NewBettingTicket {
        user_id: user.id,
        race_id,
        ticket_type: request.ticket_type,
        key: request.key,
    };

    let ticket = state
        .db
        .purchase_ticket(ticket, TICKET_PRICE)
        .await
        .map_err(|e| match e {
            RepositoryError::InsufficientBalance { .. } => rejected("insufficient_balance", e),
            other => other.into(),
        })?;

    BettingMetrics::record_purchase();
    tracing::info!(
        user_id = %user.id,
        race_id = %race_id,
        ticket_id = %ticket.id,
        key = ?ticket.key,
        balance = balance_after_purchase(user.balance),
        "Ticket purchased"
    );

    Ok(Json(ticket))
}
