//! Scripted [`Fetcher`] for client tests.

use raceticket_client::{FetchError, Fetcher, Request};
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Clone, Debug)]
struct Stub {
    result: Result<Value, FetchError>,
    delay: Duration,
}

#[derive(Debug, Default)]
struct Script {
    routes: HashMap<(Method, String), VecDeque<Stub>>,
    requests: Vec<Request>,
}

/// A [`Fetcher`] answering from per-route scripts and recording every request.
///
/// Responses queued for a route are consumed in order; the last one keeps
/// answering. Unscripted routes fail with 404.
///
/// # Example
///
/// ```ignore
/// let fetcher = MockFetcher::new();
/// fetcher.respond(Method::GET, "/api/users/me", json!({"id": id, "balance": 0, "payoff": 0}));
/// let user = Fetch::<User, _>::new(Arc::new(fetcher.clone()), "/api/users/me").await;
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockFetcher {
    script: Arc<Mutex<Script>>,
}

impl MockFetcher {
    /// Fetcher with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, method: Method, path: impl Into<String>, stub: Stub) -> &Self {
        self.lock()
            .routes
            .entry((method, path.into()))
            .or_default()
            .push_back(stub);
        self
    }

    /// Queues a successful response.
    pub fn respond(&self, method: Method, path: impl Into<String>, body: Value) -> &Self {
        self.respond_after(method, path, body, Duration::ZERO)
    }

    /// Queues a successful response delivered after `delay`.
    pub fn respond_after(
        &self,
        method: Method,
        path: impl Into<String>,
        body: Value,
        delay: Duration,
    ) -> &Self {
        self.push(
            method,
            path,
            Stub {
                result: Ok(body),
                delay,
            },
        )
    }

    /// Queues a failure.
    pub fn fail(&self, method: Method, path: impl Into<String>, error: FetchError) -> &Self {
        self.push(
            method,
            path,
            Stub {
                result: Err(error),
                delay: Duration::ZERO,
            },
        )
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// Number of requests received for a route.
    #[must_use]
    pub fn request_count(&self, method: &Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .count()
    }

    fn next(&self, request: Request) -> Stub {
        let mut script = self.lock();
        let key = (request.method.clone(), request.path.clone());
        script.requests.push(request);

        let Some(queue) = script.routes.get_mut(&key) else {
            return Stub {
                result: Err(FetchError::http(404, format!("no stub for {} {}", key.0, key.1))),
                delay: Duration::ZERO,
            };
        };

        if queue.len() > 1 {
            if let Some(stub) = queue.pop_front() {
                return stub;
            }
        }
        queue.front().cloned().unwrap_or_else(|| Stub {
            result: Err(FetchError::http(404, "empty stub queue")),
            delay: Duration::ZERO,
        })
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, request: Request) -> impl Future<Output = Result<Value, FetchError>> + Send {
        let stub = self.next(request);
        async move {
            if !stub.delay.is_zero() {
                tokio::time::sleep(stub.delay).await;
            }
            stub.result
        }
    }
}
