//! Axum middleware for identity, caching headers and observability.
//!
//! - **Correlation ID tracking**: extract or generate a correlation id, open a
//!   tracing span with it and echo it back in `X-Correlation-ID`
//! - **Identity**: resolve `x-app-userid` to a stored user once per request
//! - **Cache control**: stamp every response with the long-lived cache header
//! - **HTTP metrics**: count requests and time them
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use raceticket_web::middleware::{cache_control_layer, correlation_id_layer};
//!
//! let app = Router::new()
//!     .route("/api/races", get(list_races))
//!     .layer(cache_control_layer())
//!     .layer(correlation_id_layer());
//! ```

use crate::error::AppError;
use crate::extractors::Identity;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum::http::{self, HeaderValue, header};
use raceticket_core::repository::Database;
use raceticket_core::{USER_ID_HEADER, UserId};
use raceticket_runtime::metrics::HttpMetrics;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// `Cache-Control` value sent with every response.
pub const CACHE_CONTROL_VALUE: &str = "public, max-age=604800, immutable";

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S, B> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = http::Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
            user_id = tracing::field::Empty,
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

/// Layer that sets `Cache-Control: public, max-age=604800, immutable` on
/// every response, overriding whatever a handler set.
#[must_use]
pub fn cache_control_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    )
}

/// Resolves the `x-app-userid` header.
///
/// - No header: the request continues anonymously.
/// - Header naming a stored user: an [`Identity`] is added to the request
///   extensions.
/// - Header that is not a UUID or names no user: 401 for every route.
///
/// # Errors
///
/// Returns 401 for unknown identities and 500 if storage fails.
pub async fn identify<D: Database>(
    State(state): State<AppState<D>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(raw) = request.headers().get(USER_ID_HEADER) else {
        return Ok(next.run(request).await);
    };

    let user_id: UserId = raw
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::unauthorized("invalid user id"))?;

    let user = state
        .db
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("unknown user"))?;

    tracing::Span::current().record("user_id", tracing::field::display(user.id));
    request.extensions_mut().insert(Identity(user));
    Ok(next.run(request).await)
}

/// Records `http_requests_total` and `http_request_duration_seconds`.
pub async fn record_http_metrics(request: Request, next: Next) -> impl IntoResponse {
    let method = request.method().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    HttpMetrics::record_request(method.as_str(), response.status().as_u16(), start.elapsed());
    response
}

/// Extension trait for extracting correlation ID from request extensions.
pub trait CorrelationIdExt {
    /// Try to get the correlation ID from request extensions.
    ///
    /// Returns `None` if the correlation ID middleware is not installed.
    fn try_correlation_id(&self) -> Option<Uuid>;
}

impl CorrelationIdExt for Request {
    fn try_correlation_id(&self) -> Option<Uuid> {
        self.extensions().get::<Uuid>().copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::Request;
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use raceticket_testing::InMemoryDatabase;
    use raceticket_core::User;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request = Request::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        let correlation_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present");

        let uuid_str = correlation_id.to_str().unwrap();
        assert!(Uuid::parse_str(uuid_str).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_from_request() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        let response_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap();

        assert_eq!(response_id, request_uuid.to_string());
    }

    #[tokio::test]
    async fn test_cache_control_overrides_handler_header() {
        let app = Router::new()
            .route(
                "/test",
                get(|| async { ([(header::CACHE_CONTROL, "no-store")], "ok") }),
            )
            .layer(cache_control_layer());

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            CACHE_CONTROL_VALUE
        );
    }

    fn identified_app(db: InMemoryDatabase) -> Router {
        let state = AppState::new(db);
        Router::new()
            .route(
                "/whoami",
                get(|crate::extractors::MaybeUser(user): crate::extractors::MaybeUser| async move {
                    user.map_or_else(|| "anonymous".to_string(), |u| u.id.to_string())
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                identify::<InMemoryDatabase>,
            ))
            .with_state(state)
    }

    async fn whoami(app: Router, header_value: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = header_value {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_identify_resolves_known_user() {
        let db = InMemoryDatabase::new();
        let user = User::anonymous();
        db.insert_user(user.clone());

        let (status, body) = whoami(identified_app(db), Some(&user.id.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user.id.to_string());
    }

    #[tokio::test]
    async fn test_identify_without_header_is_anonymous() {
        let (status, body) = whoami(identified_app(InMemoryDatabase::new()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_identify_rejects_unknown_and_malformed_ids() {
        let db = InMemoryDatabase::new();

        let (status, _) = whoami(identified_app(db.clone()), Some(&UserId::new().to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = whoami(identified_app(db), Some("not-a-uuid")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
