//! Custom Axum extractors.
//!
//! - [`CurrentUser`]: the caller resolved from `x-app-userid`, 401 otherwise
//! - [`MaybeUser`]: the caller if one was identified
//! - [`CorrelationId`]: request correlation id
//!
//! Identity is resolved once per request by
//! [`identify`](crate::middleware::identify), which stores an [`Identity`] in
//! the request extensions; these extractors only read it.
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(CurrentUser(user): CurrentUser) -> Json<User> {
//!     Json(user)
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use raceticket_core::User;
use uuid::Uuid;

/// User identified for the current request.
#[derive(Debug, Clone)]
pub struct Identity(pub User);

/// The authenticated caller. Rejects with 401 when the request carried no
/// identity.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .map(|identity| Self(identity.0.clone()))
            .ok_or_else(|| AppError::unauthorized("authentication required"))
    }
}

/// The caller, if the request carried an identity.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<Identity>()
                .map(|identity| identity.0.clone()),
        ))
    }
}

/// Correlation ID for request tracing.
///
/// Reads the id stored by the correlation-id middleware, then the
/// `X-Correlation-ID` header, and generates a new UUID v4 if neither is present.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}
