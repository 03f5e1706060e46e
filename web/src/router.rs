//! Router composition.

use crate::handlers::{betting_tickets, health, initialize, races, users};
use crate::middleware::{cache_control_layer, correlation_id_layer, identify, record_http_metrics};
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use raceticket_core::repository::Database;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

/// Create the API router with every endpoint.
///
/// # Routes
///
/// ## Users
/// - `GET /api/users/me` - Current user, created anonymously if unidentified
/// - `POST /api/users/me/charge` - Add points to the balance
///
/// ## Races
/// - `GET /api/hero` - Landing page image
/// - `GET /api/races` - Races in a start-time window
/// - `GET /api/races/:id` - One race, relations by flag
/// - `GET /api/races/:id/entries` - Race with entries and players
/// - `GET /api/races/:id/trifectaOdds` - Odds for every ordered triple
///
/// ## Betting tickets
/// - `GET /api/races/:id/betting-tickets` - Caller's tickets for a race
/// - `POST /api/races/:id/betting-tickets` - Buy a ticket
///
/// ## Admin
/// - `POST /api/initialize` - Reset and reseed
///
/// ## Health
/// - `GET /health` - Liveness
/// - `GET /ready` - Readiness (database ping)
///
/// Every `/api` route resolves `x-app-userid` first. Every response gets the
/// correlation id and the cache header.
///
/// # Example
///
/// ```rust,ignore
/// let app = build_router(AppState::new(db));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// ```
pub fn build_router<D: Database>(state: AppState<D>) -> Router {
    let api = Router::new()
        .route("/users/me", get(users::me::<D>))
        .route("/users/me/charge", post(users::charge::<D>))
        .route("/hero", get(races::hero))
        .route("/races", get(races::list::<D>))
        .route("/races/:id", get(races::show::<D>))
        .route("/races/:id/entries", get(races::entries::<D>))
        .route("/races/:id/trifectaOdds", get(races::trifecta_odds::<D>))
        .route(
            "/races/:id/betting-tickets",
            get(betting_tickets::list::<D>).post(betting_tickets::purchase::<D>),
        )
        .route("/initialize", post(initialize::initialize::<D>))
        .route_layer(middleware::from_fn_with_state(state.clone(), identify::<D>));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check::<D>))
        .layer(
            ServiceBuilder::new()
                .layer(correlation_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(record_http_metrics))
                .layer(cache_control_layer())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
