//! User endpoints: the caller's profile and point charges.

use crate::error::AppError;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::state::AppState;
use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use raceticket_core::User;
use raceticket_core::purchase::parse_charge_amount;
use raceticket_core::repository::Database;
use raceticket_runtime::metrics::BettingMetrics;
use serde_json::Value;

/// Returns the caller, creating an anonymous user when the request carried
/// no identity.
///
/// There is no session: two anonymous calls create two users, and the client
/// is expected to remember the returned id.
///
/// # Endpoint
///
/// ```text
/// GET /api/users/me
/// ```
///
/// # Errors
///
/// Returns 500 if the user cannot be created.
pub async fn me<D: Database>(
    State(state): State<AppState<D>>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<User>, AppError> {
    if let Some(user) = user {
        return Ok(Json(user));
    }

    let user = state.db.create_anonymous_user().await?;
    tracing::info!(user_id = %user.id, "Created anonymous user");
    Ok(Json(user))
}

/// Adds points to the caller's balance.
///
/// # Endpoint
///
/// ```text
/// POST /api/users/me/charge
/// Content-Type: application/json
///
/// {"amount": 1000}
/// ```
///
/// # Errors
///
/// - 401 without identity
/// - 400 if the body is not JSON, `amount` is not an integer in
///   `1..=MAX_CHARGE_AMOUNT`, or the new balance would overflow
pub async fn charge<D: Database>(
    State(state): State<AppState<D>>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}")))?;
    let amount = parse_charge_amount(&body)?;

    let user = state.db.charge(user.id, amount).await?;
    BettingMetrics::record_charge();
    tracing::info!(user_id = %user.id, amount, balance = user.balance, "Charged balance");

    Ok(StatusCode::NO_CONTENT)
}
