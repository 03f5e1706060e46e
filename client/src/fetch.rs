//! Reads: `Fetch` and `AuthorizedFetch`.
//!
//! Each instance owns a [`Store`] running [`FetchReducer`]. The state machine
//! is `idle → loading → {resolved | errored}`; `Revalidate` goes back to
//! `loading`. Every request gets a sequence number and only the response to
//! the latest request is applied, so a slow response to a superseded request
//! never overwrites newer data.

use crate::error::FetchError;
use crate::http::{Fetcher, Request, decode};
use crate::session::Session;
use raceticket_core::{Effect, Reducer, SmallVec, smallvec};
use raceticket_runtime::{EffectHandle, Store, StoreError};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where a fetch instance is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchPhase {
    /// No request issued (also the permanent phase of a logged-out authorized fetch)
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The latest request succeeded
    Resolved,
    /// The latest request failed
    Errored,
}

/// State of one fetch instance.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchState<T> {
    /// Lifecycle phase
    pub phase: FetchPhase,
    /// Last successfully decoded body. Absent until the first success.
    pub data: Option<T>,
    /// Error of the latest request, cleared by the next success
    pub error: Option<FetchError>,
    /// Sequence number of the latest request
    pub seq: u64,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            phase: FetchPhase::Idle,
            data: None,
            error: None,
            seq: 0,
        }
    }
}

impl<T> FetchState<T> {
    /// Whether a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == FetchPhase::Loading
    }
}

/// Inputs of [`FetchReducer`].
#[derive(Clone, Debug, PartialEq)]
pub enum FetchAction<T> {
    /// Issue the initial request (no-op once one was issued)
    Load,
    /// Re-issue the request
    Revalidate,
    /// Response to request `seq` decoded successfully
    Resolved {
        /// Request sequence number
        seq: u64,
        /// Decoded body
        data: T,
    },
    /// Request `seq` failed
    Failed {
        /// Request sequence number
        seq: u64,
        /// What went wrong
        error: FetchError,
    },
}

/// Dependencies of [`FetchReducer`].
#[derive(Debug)]
pub struct FetchEnvironment<F> {
    /// Transport
    pub fetcher: Arc<F>,
    /// Path to `GET`
    pub path: String,
    /// Identity to send; `Some` makes this an authorized fetch
    pub auth: Option<Session>,
}

/// Reducer for a single read.
#[derive(Debug)]
pub struct FetchReducer<T, F> {
    _marker: PhantomData<fn() -> (T, F)>,
}

impl<T, F> FetchReducer<T, F> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T, F> Default for FetchReducer<T, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F> FetchReducer<T, F>
where
    T: DeserializeOwned + Send + 'static,
    F: Fetcher,
{
    fn request(
        state: &mut FetchState<T>,
        env: &FetchEnvironment<F>,
    ) -> SmallVec<[Effect<FetchAction<T>>; 4]> {
        let user_id = match &env.auth {
            Some(session) => match session.user_id() {
                Some(user_id) => Some(user_id),
                None => {
                    tracing::trace!(path = %env.path, "Not logged in, skipping authorized fetch");
                    if state.seq > 0 {
                        // Forget the previous user's data and outdate any response in flight
                        *state = FetchState {
                            seq: state.seq + 1,
                            ..FetchState::default()
                        };
                    }
                    return smallvec![Effect::None];
                },
            },
            None => None,
        };

        state.seq += 1;
        state.phase = FetchPhase::Loading;

        let seq = state.seq;
        let fetcher = Arc::clone(&env.fetcher);
        let request = Request::get(env.path.clone()).identified(user_id);

        smallvec![Effect::future(async move {
            match fetcher.fetch(request).await.and_then(decode::<T>) {
                Ok(data) => Some(FetchAction::Resolved { seq, data }),
                Err(error) => Some(FetchAction::Failed { seq, error }),
            }
        })]
    }
}

impl<T, F> Reducer for FetchReducer<T, F>
where
    T: DeserializeOwned + Send + 'static,
    F: Fetcher,
{
    type State = FetchState<T>;
    type Action = FetchAction<T>;
    type Environment = FetchEnvironment<F>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FetchAction::Load => {
                if state.seq > 0 {
                    return smallvec![Effect::None];
                }
                Self::request(state, env)
            },
            FetchAction::Revalidate => Self::request(state, env),
            FetchAction::Resolved { seq, data } => {
                if seq != state.seq {
                    tracing::debug!(seq, latest = state.seq, "Ignoring superseded response");
                    return smallvec![Effect::None];
                }
                state.phase = FetchPhase::Resolved;
                state.data = Some(data);
                state.error = None;
                smallvec![Effect::None]
            },
            FetchAction::Failed { seq, error } => {
                if seq != state.seq {
                    tracing::debug!(seq, latest = state.seq, "Ignoring superseded failure");
                    return smallvec![Effect::None];
                }
                tracing::debug!(path = %env.path, status = ?error.status, %error, "Fetch failed");
                state.phase = FetchPhase::Errored;
                state.error = Some(error);
                smallvec![Effect::None]
            },
        }
    }
}

type FetchStore<T, F> = Store<FetchState<T>, FetchAction<T>, FetchEnvironment<F>, FetchReducer<T, F>>;

/// A read of one API path.
///
/// Creating one issues the request immediately; [`data`](Self::data) stays
/// `None` until it resolves. Instances are independent: no de-duplication and
/// no cache across them.
pub struct Fetch<T, F>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    F: Fetcher,
{
    store: FetchStore<T, F>,
    last: Mutex<EffectHandle>,
    session: Option<Session>,
}

impl<T, F> Fetch<T, F>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    F: Fetcher,
{
    /// Starts a read of `path`.
    pub async fn new(fetcher: Arc<F>, path: impl Into<String>) -> Self {
        Self::start(FetchEnvironment {
            fetcher,
            path: path.into(),
            auth: None,
        })
        .await
    }

    /// Starts a read of `path` that carries the session's identity.
    ///
    /// While the session is logged out no request is issued and `data` is
    /// never populated. Call [`revalidate`](Self::revalidate) after logging in.
    pub async fn authorized(fetcher: Arc<F>, path: impl Into<String>, session: Session) -> Self {
        Self::start(FetchEnvironment {
            fetcher,
            path: path.into(),
            auth: Some(session),
        })
        .await
    }

    async fn start(env: FetchEnvironment<F>) -> Self {
        let session = env.auth.clone();
        let store = Store::new(FetchState::default(), FetchReducer::new(), env);
        let handle = store
            .send(FetchAction::Load)
            .await
            .unwrap_or_else(|_| EffectHandle::completed());

        Self {
            store,
            last: Mutex::new(handle),
            session,
        }
    }

    /// Decoded body of the latest successful request.
    ///
    /// Always `None` for an authorized fetch whose session is logged out.
    pub async fn data(&self) -> Option<T> {
        if self.session.as_ref().is_some_and(|s| !s.is_logged_in()) {
            return None;
        }
        self.store.state(|s| s.data.clone()).await
    }

    /// Error of the latest request.
    pub async fn error(&self) -> Option<FetchError> {
        self.store.state(|s| s.error.clone()).await
    }

    /// Copy of the whole state.
    pub async fn snapshot(&self) -> FetchState<T> {
        self.store.state(Clone::clone).await
    }

    /// Waits until the latest request has been applied.
    pub async fn settled(&self) {
        let mut handle = self.last.lock().await.clone();
        handle.wait().await;
    }

    /// Re-issues the request and waits for its result to be applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn revalidate(&self) -> Result<(), StoreError> {
        let handle = self.store.send(FetchAction::Revalidate).await?;
        *self.last.lock().await = handle.clone();

        let mut handle = handle;
        handle.wait().await;
        Ok(())
    }

    /// Stops applying responses. Requests in flight finish but are dropped.
    pub fn close(&self) {
        self.store.close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::future::Future;

    /// Fetcher that answers every request with the same body.
    struct Constant(Value);

    impl Fetcher for Constant {
        fn fetch(&self, _request: Request) -> impl Future<Output = Result<Value, FetchError>> + Send {
            let value = self.0.clone();
            async move { Ok(value) }
        }
    }

    fn env(auth: Option<Session>) -> FetchEnvironment<Constant> {
        FetchEnvironment {
            fetcher: Arc::new(Constant(json!(1))),
            path: "/api/hero".to_string(),
            auth,
        }
    }

    fn reduce(
        state: &mut FetchState<u32>,
        action: FetchAction<u32>,
        env: &FetchEnvironment<Constant>,
    ) -> SmallVec<[Effect<FetchAction<u32>>; 4]> {
        FetchReducer::new().reduce(state, action, env)
    }

    #[test]
    fn test_load_issues_one_request() {
        let env = env(None);
        let mut state = FetchState::default();

        let effects = reduce(&mut state, FetchAction::Load, &env);
        assert!(matches!(effects.as_slice(), [Effect::Future(_)]));
        assert_eq!(state.phase, FetchPhase::Loading);
        assert_eq!(state.seq, 1);

        let effects = reduce(&mut state, FetchAction::Load, &env);
        assert!(effects.iter().all(Effect::is_none));
        assert_eq!(state.seq, 1);
    }

    #[test]
    fn test_superseded_response_is_ignored() {
        let env = env(None);
        let mut state = FetchState::default();

        let _ = reduce(&mut state, FetchAction::Load, &env);
        let _ = reduce(&mut state, FetchAction::Revalidate, &env);
        assert_eq!(state.seq, 2);

        let _ = reduce(&mut state, FetchAction::Resolved { seq: 2, data: 20 }, &env);
        let _ = reduce(&mut state, FetchAction::Resolved { seq: 1, data: 10 }, &env);

        assert_eq!(state.data, Some(20));
        assert_eq!(state.phase, FetchPhase::Resolved);
    }

    #[test]
    fn test_failure_keeps_data_absent() {
        let env = env(None);
        let mut state = FetchState::default();

        let _ = reduce(&mut state, FetchAction::Load, &env);
        let error = FetchError::http(500, "boom");
        let _ = reduce(
            &mut state,
            FetchAction::Failed {
                seq: 1,
                error: error.clone(),
            },
            &env,
        );

        assert_eq!(state.phase, FetchPhase::Errored);
        assert_eq!(state.data, None);
        assert_eq!(state.error, Some(error));
    }

    #[test]
    fn test_logged_out_authorized_fetch_stays_idle() {
        let env = env(Some(Session::new()));
        let mut state = FetchState::default();

        let effects = reduce(&mut state, FetchAction::Load, &env);
        assert!(effects.iter().all(Effect::is_none));
        assert_eq!(state.phase, FetchPhase::Idle);

        let effects = reduce(&mut state, FetchAction::Revalidate, &env);
        assert!(effects.iter().all(Effect::is_none));
        assert_eq!(state.seq, 0);
    }

    #[test]
    fn test_revalidate_after_logout_clears_data() {
        let session = Session::with_user(raceticket_core::UserId::new());
        let env = env(Some(session.clone()));
        let mut state = FetchState::default();

        let _ = reduce(&mut state, FetchAction::Load, &env);
        let _ = reduce(&mut state, FetchAction::Resolved { seq: 1, data: 500 }, &env);
        let _ = reduce(&mut state, FetchAction::Revalidate, &env);
        assert_eq!(state.seq, 2);

        session.logout();
        let effects = reduce(&mut state, FetchAction::Revalidate, &env);
        assert!(effects.iter().all(Effect::is_none));
        assert_eq!(state.phase, FetchPhase::Idle);
        assert_eq!(state.data, None);
        assert_eq!(state.seq, 3);

        // The response to the request issued while logged in is stale now
        let _ = reduce(&mut state, FetchAction::Resolved { seq: 2, data: 700 }, &env);
        assert_eq!(state.data, None);
    }

    #[tokio::test]
    async fn test_fetch_resolves() {
        let fetch: Fetch<u32, Constant> =
            Fetch::new(Arc::new(Constant(json!(7))), "/api/anything").await;
        fetch.settled().await;

        assert_eq!(fetch.data().await, Some(7));
        assert_eq!(fetch.error().await, None);
    }
}
