//! Axum API server for Race Ticket.
//!
//! Thin handlers over the storage seams in `raceticket-core`: extract,
//! validate with the purchase rules, call the repository, answer JSON.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Layers: correlation id, trace, metrics │  ← every response
//! │          cache-control, compression     │
//! ├─────────────────────────────────────────┤
//! │  /api route layer: identify             │  ← x-app-userid → Identity
//! ├─────────────────────────────────────────┤
//! │  Handlers                               │  ← CurrentUser / MaybeUser
//! │  - purchase rules (raceticket-core)     │
//! │  - repository calls (Database)          │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raceticket_web::{AppState, build_router};
//!
//! let app = build_router(AppState::new(db));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CorrelationId, CurrentUser, MaybeUser};
pub use middleware::{CACHE_CONTROL_VALUE, CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
