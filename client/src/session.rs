//! Caller identity.
//!
//! There is no login mechanism on the server: `GET /users/me` without an
//! identity creates a fresh anonymous user, and the client remembers its id.
//! A [`Session`] is that memory, shared by every primitive that sends the
//! identity header.

use crate::api;
use crate::error::FetchError;
use crate::http::{Fetcher, Request, decode};
use raceticket_core::{User, UserId};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared, cloneable handle to the remembered user id.
#[derive(Clone, Debug, Default)]
pub struct Session {
    user_id: Arc<RwLock<Option<UserId>>>,
}

impl Session {
    /// A logged-out session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that already knows its user.
    #[must_use]
    pub fn with_user(user_id: UserId) -> Self {
        Self {
            user_id: Arc::new(RwLock::new(Some(user_id))),
        }
    }

    /// The remembered user id.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        *self.user_id.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an identity is remembered.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user_id().is_some()
    }

    /// Obtains a new anonymous user and remembers it.
    ///
    /// # Errors
    ///
    /// Returns the request error; the session is left unchanged.
    pub async fn login<F: Fetcher>(&self, fetcher: &F) -> Result<User, FetchError> {
        let user: User = decode(fetcher.fetch(Request::get(api::users_me())).await?)?;
        self.set(Some(user.id));
        tracing::info!(user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// Forgets the identity.
    pub fn logout(&self) {
        self.set(None);
    }

    fn set(&self, user_id: Option<UserId>) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = user_id;
    }
}
