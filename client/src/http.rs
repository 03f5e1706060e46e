//! HTTP transport.
//!
//! Reducers describe requests as [`Request`] values and hand them to a
//! [`Fetcher`]. [`HttpFetcher`] is the reqwest implementation; tests swap in
//! an in-process one.

use crate::error::{ErrorBody, FetchError};
use raceticket_core::{USER_ID_HEADER, UserId};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

/// One API request.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Path including query, e.g. `/api/races?since=...`
    pub path: String,
    /// Identity sent as the `x-app-userid` header
    pub user_id: Option<UserId>,
    /// JSON body
    pub body: Option<Value>,
}

impl Request {
    /// A `GET` without identity.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            user_id: None,
            body: None,
        }
    }

    /// A request with a JSON body.
    #[must_use]
    pub fn with_body(method: Method, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            user_id: None,
            body: Some(body),
        }
    }

    /// Attach (or clear) the caller's identity.
    #[must_use]
    pub const fn identified(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }
}

/// Executes requests and returns the decoded JSON body.
///
/// An empty 2xx body is returned as `Value::Null`. Non-2xx responses become
/// [`FetchError`] with the status set.
pub trait Fetcher: Send + Sync + 'static {
    /// Perform one request. No retries.
    fn fetch(&self, request: Request) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Decodes a response body into `T`.
///
/// # Errors
///
/// Returns [`FetchError::decode`] when the body does not match `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::decode(e.to_string()))
}

/// reqwest-backed [`Fetcher`].
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    /// Create a fetcher for the server at `base_url` (e.g. `http://localhost:3000`)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a fetcher with a preconfigured client (timeouts, proxies)
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Server origin requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: Request) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!(method = %request.method, %url, "Sending request");

        let mut builder = self.client.request(request.method, url);
        if let Some(user_id) = request.user_id {
            builder = builder.header(USER_ID_HEADER, user_id.to_string());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes).map_or_else(
                |_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                },
                |body| body.message,
            );
            tracing::debug!(status = status.as_u16(), %message, "Request failed");
            return Err(FetchError::http(status.as_u16(), message));
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| FetchError::decode(e.to_string()))
    }
}
