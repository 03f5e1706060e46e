//! Writes: `Mutation`.
//!
//! A mutation is a callable bound to a path and method. Each invocation gets
//! its own id and resolves on its own; two invocations in flight are two
//! requests, never merged.

use crate::error::FetchError;
use crate::http::{Fetcher, Request, decode};
use crate::session::Session;
use raceticket_core::{Effect, Reducer, SmallVec, smallvec};
use raceticket_runtime::{Store, StoreError};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of one invocation.
///
/// `loading` goes from `true` to `false` exactly once. Exactly one of
/// `error`/`data` is set afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationResult<T> {
    /// Request in flight
    pub loading: bool,
    /// Failure, if any
    pub error: Option<FetchError>,
    /// Decoded response body on success
    pub data: Option<T>,
}

impl<T> MutationResult<T> {
    const fn loading() -> Self {
        Self {
            loading: true,
            error: None,
            data: None,
        }
    }

    fn failed(error: FetchError) -> Self {
        Self {
            loading: false,
            error: Some(error),
            data: None,
        }
    }

    /// Converts into a `Result`, treating a still-loading invocation as an error.
    ///
    /// # Errors
    ///
    /// Returns the invocation's error.
    pub fn into_result(self) -> Result<T, FetchError> {
        match (self.error, self.data) {
            (Some(error), _) => Err(error),
            (None, Some(data)) => Ok(data),
            (None, None) => Err(FetchError::network("mutation did not complete")),
        }
    }
}

/// Per-invocation results.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationState<T> {
    /// Results keyed by invocation id
    pub invocations: HashMap<u64, MutationResult<T>>,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self {
            invocations: HashMap::new(),
        }
    }
}

/// Inputs of [`MutationReducer`].
#[derive(Clone, Debug, PartialEq)]
pub enum MutationAction<T> {
    /// Start invocation `id` with `body`
    Invoke {
        /// Invocation id
        id: u64,
        /// JSON body
        body: Value,
    },
    /// Invocation `id` finished
    Settled {
        /// Invocation id
        id: u64,
        /// Decoded body or failure
        result: Result<T, FetchError>,
    },
    /// Drop the record of invocation `id` once its caller has read it
    Forget {
        /// Invocation id
        id: u64,
    },
}

/// How a mutation is sent.
#[derive(Clone, Debug)]
pub struct MutationOptions {
    /// HTTP method
    pub method: Method,
    /// Identity to send with every invocation
    pub auth: Option<Session>,
}

impl MutationOptions {
    /// Anonymous `POST`.
    #[must_use]
    pub const fn post() -> Self {
        Self {
            method: Method::POST,
            auth: None,
        }
    }

    /// Send the session's identity.
    #[must_use]
    pub fn authorized(mut self, session: Session) -> Self {
        self.auth = Some(session);
        self
    }
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self::post()
    }
}

/// Dependencies of [`MutationReducer`].
#[derive(Debug)]
pub struct MutationEnvironment<F> {
    /// Transport
    pub fetcher: Arc<F>,
    /// Path to send to
    pub path: String,
    /// Method and identity
    pub options: MutationOptions,
}

/// Reducer for one mutation endpoint.
#[derive(Debug)]
pub struct MutationReducer<T, F> {
    _marker: PhantomData<fn() -> (T, F)>,
}

impl<T, F> MutationReducer<T, F> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T, F> Default for MutationReducer<T, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F> Reducer for MutationReducer<T, F>
where
    T: DeserializeOwned + Send + 'static,
    F: Fetcher,
{
    type State = MutationState<T>;
    type Action = MutationAction<T>;
    type Environment = MutationEnvironment<F>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            MutationAction::Invoke { id, body } => {
                if state.invocations.contains_key(&id) {
                    tracing::warn!(id, "Duplicate mutation invocation id");
                    return smallvec![Effect::None];
                }
                state.invocations.insert(id, MutationResult::loading());

                let fetcher = Arc::clone(&env.fetcher);
                let user_id = env.options.auth.as_ref().and_then(Session::user_id);
                let request = Request::with_body(env.options.method.clone(), env.path.clone(), body)
                    .identified(user_id);

                smallvec![Effect::future(async move {
                    let result = fetcher.fetch(request).await.and_then(decode::<T>);
                    Some(MutationAction::Settled { id, result })
                })]
            },
            MutationAction::Settled { id, result } => {
                let Some(entry) = state.invocations.get_mut(&id) else {
                    return smallvec![Effect::None];
                };
                if !entry.loading {
                    return smallvec![Effect::None];
                }

                entry.loading = false;
                match result {
                    Ok(data) => entry.data = Some(data),
                    Err(error) => {
                        tracing::debug!(path = %env.path, id, status = ?error.status, %error, "Mutation failed");
                        entry.error = Some(error);
                    },
                }
                smallvec![Effect::None]
            },
            MutationAction::Forget { id } => {
                state.invocations.remove(&id);
                smallvec![Effect::None]
            },
        }
    }
}

type MutationStore<T, F> =
    Store<MutationState<T>, MutationAction<T>, MutationEnvironment<F>, MutationReducer<T, F>>;

/// A write endpoint.
pub struct Mutation<T, F>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    F: Fetcher,
{
    store: MutationStore<T, F>,
    next_id: AtomicU64,
}

impl<T, F> Mutation<T, F>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    F: Fetcher,
{
    /// Binds a mutation to `path`.
    #[must_use]
    pub fn new(fetcher: Arc<F>, path: impl Into<String>, options: MutationOptions) -> Self {
        let env = MutationEnvironment {
            fetcher,
            path: path.into(),
            options,
        };

        Self {
            store: Store::new(MutationState::default(), MutationReducer::new(), env),
            next_id: AtomicU64::new(1),
        }
    }

    /// Performs one write with `body` and waits for it to resolve.
    pub async fn call<B: Serialize>(&self, body: &B) -> MutationResult<T> {
        let body = match serde_json::to_value(body) {
            Ok(body) => body,
            Err(e) => return MutationResult::failed(FetchError::decode(e.to_string())),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match self.store.send(MutationAction::Invoke { id, body }).await {
            Ok(mut handle) => handle.wait().await,
            Err(e) => return MutationResult::failed(FetchError::network(e.to_string())),
        }

        let result = self.result(id).await;
        if self.store.send(MutationAction::Forget { id }).await.is_err() {
            tracing::debug!(id, "Store closed, invocation record kept");
        }

        match result {
            Some(result) if !result.loading => result,
            // The effect task ended without settling (it panicked or was aborted)
            Some(_) => MutationResult::failed(FetchError::network("mutation did not complete")),
            None => MutationResult::failed(FetchError::network("mutation was dropped")),
        }
    }

    /// Result of invocation `id`, if it exists.
    pub async fn result(&self, id: u64) -> Option<MutationResult<T>> {
        self.store.state(|s| s.invocations.get(&id).cloned()).await
    }

    /// Number of invocations still in flight.
    pub async fn in_flight(&self) -> usize {
        self.store
            .state(|s| s.invocations.values().filter(|r| r.loading).count())
            .await
    }

    /// Number of invocations whose record is still held.
    pub async fn tracked(&self) -> usize {
        self.store.state(|s| s.invocations.len()).await
    }

    /// Stops applying results of invocations in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if requests are still running
    /// after `timeout`.
    pub async fn shutdown(&self, timeout: std::time::Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use raceticket_testing::ReducerTest;
    use raceticket_testing::assertions::{assert_has_future_effect, assert_no_effects};
    use serde_json::json;
    use std::future::Future;

    struct Echo;

    impl Fetcher for Echo {
        fn fetch(&self, request: Request) -> impl Future<Output = Result<Value, FetchError>> + Send {
            async move { request.body.ok_or_else(|| FetchError::http(400, "no body")) }
        }
    }

    fn env() -> MutationEnvironment<Echo> {
        MutationEnvironment {
            fetcher: Arc::new(Echo),
            path: "/api/echo".to_string(),
            options: MutationOptions::post(),
        }
    }

    #[test]
    fn test_invoke_marks_loading() {
        ReducerTest::new(MutationReducer::<Value, Echo>::new())
            .with_env(env())
            .given_state(MutationState::default())
            .when_action(MutationAction::Invoke {
                id: 1,
                body: json!({"a": 1}),
            })
            .then_state(|state| {
                assert_eq!(state.invocations.get(&1), Some(&MutationResult::loading()));
            })
            .then_effects(assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_settle_applies_once() {
        let mut given = MutationState::default();
        given.invocations.insert(
            1,
            MutationResult {
                loading: false,
                error: None,
                data: Some(json!("first")),
            },
        );

        ReducerTest::new(MutationReducer::<Value, Echo>::new())
            .with_env(env())
            .given_state(given)
            .when_action(MutationAction::Settled {
                id: 1,
                result: Err(FetchError::http(500, "late")),
            })
            .then_state(|state| {
                let result = &state.invocations[&1];
                assert!(!result.loading);
                assert_eq!(result.error, None);
                assert_eq!(result.data, Some(json!("first")));
            })
            .then_effects(assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn test_call_resolves_with_body() {
        let mutation: Mutation<Value, Echo> =
            Mutation::new(Arc::new(Echo), "/api/echo", MutationOptions::post());

        let result = mutation.call(&json!({"amount": 100})).await;
        assert!(!result.loading);
        assert_eq!(result.data, Some(json!({"amount": 100})));
        assert_eq!(mutation.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_call_forgets_its_invocation() {
        let mutation: Mutation<Value, Echo> =
            Mutation::new(Arc::new(Echo), "/api/echo", MutationOptions::post());

        for amount in [100, 200, 300] {
            let result = mutation.call(&json!({ "amount": amount })).await;
            assert_eq!(result.data, Some(json!({ "amount": amount })));
        }
        assert_eq!(mutation.tracked().await, 0);
    }

    #[test]
    fn test_forget_removes_record() {
        let mut given = MutationState::default();
        given.invocations.insert(1, MutationResult::failed(FetchError::http(500, "boom")));
        given.invocations.insert(2, MutationResult::loading());

        ReducerTest::new(MutationReducer::<Value, Echo>::new())
            .with_env(env())
            .given_state(given)
            .when_action(MutationAction::Forget { id: 1 })
            .then_state(|state| {
                assert!(!state.invocations.contains_key(&1));
                assert!(state.invocations.contains_key(&2));
            })
            .then_effects(assert_no_effects)
            .run();
    }

    /// Fetcher whose request future panics.
    struct Panicking;

    impl Fetcher for Panicking {
        #[allow(clippy::panic)]
        fn fetch(&self, _request: Request) -> impl Future<Output = Result<Value, FetchError>> + Send {
            async move { panic!("transport crashed") }
        }
    }

    #[tokio::test]
    async fn test_call_after_panicked_request_is_failed_not_loading() {
        let mutation: Mutation<Value, Panicking> =
            Mutation::new(Arc::new(Panicking), "/api/echo", MutationOptions::post());

        let result = mutation.call(&json!({})).await;
        assert!(!result.loading);
        assert!(result.data.is_none());
        assert!(result.error.is_some());
    }
}
