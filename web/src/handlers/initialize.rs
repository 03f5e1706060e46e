//! Data reset endpoint.

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use raceticket_core::repository::Database;

/// Wipes every table and reseeds the fixture races.
///
/// # Endpoint
///
/// ```text
/// POST /api/initialize
/// ```
///
/// # Errors
///
/// Returns 500 if truncation or seeding fails.
pub async fn initialize<D: Database>(
    State(state): State<AppState<D>>,
) -> Result<StatusCode, AppError> {
    state.db.initialize().await?;
    tracing::info!("Database reset and reseeded");
    Ok(StatusCode::NO_CONTENT)
}
