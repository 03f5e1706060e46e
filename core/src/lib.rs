//! # Race Ticket Core
//!
//! Core traits and types shared by the Race Ticket API server and its client
//! data-access layer.
//!
//! ## Core Concepts
//!
//! - **State**: what a feature currently knows (a fetched race, a mutation result)
//! - **Action**: every input a reducer reacts to (user intent and I/O results)
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of side work (an HTTP request) that the runtime executes
//! - **Environment**: injected dependencies (clock, HTTP fetcher)
//!
//! On top of these the crate defines the betting domain ([`domain`]), the rules
//! for buying tickets and charging points ([`purchase`]), the storage seams
//! the server is written against ([`repository`]) and the deterministic data
//! set a reset server is seeded with ([`fixture`]).
//!
//! ## Example
//!
//! ```ignore
//! use raceticket_core::*;
//!
//! impl Reducer for FetchReducer {
//!     type State = FetchState<Race>;
//!     type Action = FetchAction<Race>;
//!     type Environment = FetchEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut FetchState<Race>,
//!         action: FetchAction<Race>,
//!         env: &FetchEnvironment,
//!     ) -> SmallVec<[Effect<FetchAction<Race>>; 4]> {
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

#![forbid(unsafe_code)]

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

pub mod domain;
pub mod error;
pub mod fixture;
pub mod purchase;
pub mod repository;

pub use domain::{
    BettingTicket, BettingTicketId, BettingTicketList, Entry, EntryId, Hero, OddsItem, OddsItemId,
    Player, PlayerId, Race, RaceId, RaceList, USER_ID_HEADER, User, UserId,
};
pub use error::DomainError;
pub use effect::Effect;
pub use environment::{Clock, SystemClock};
pub use reducer::Reducer;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They hold the decisions (which request to issue, which response to keep) and
/// leave the I/O to effects.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for MutationReducer {
    ///     type State = MutationState<Ticket>;
    ///     type Action = MutationAction<Ticket>;
    ///     type Environment = MutationEnvironment<HttpFetcher>;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut Self::State,
    ///         action: Self::Action,
    ///         env: &Self::Environment,
    ///     ) -> SmallVec<[Effect<Self::Action>; 4]> {
    ///         match action {
    ///             MutationAction::Invoke { id, body } => {
    ///                 // Mark the invocation loading, describe the request
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Returns
        ///
        /// A list of effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side work to be performed by the runtime. They are values,
/// not execution, so reducers stay deterministic and testable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are returned from reducers and
    /// executed by the Store runtime, which feeds any produced action back into
    /// the reducer.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation whose result is fed back as an action
        #[must_use]
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected via the
/// Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Race closure is decided against this clock, both when the server
    /// accepts a ticket and when a client decides whether to offer one.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
        fn now(&self) -> DateTime<Utc> {
            (**self).now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[test]
    fn test_effect_is_none() {
        assert!(Effect::<()>::None.is_none());
        assert!(!Effect::<()>::future(async { None }).is_none());
    }

    #[test]
    fn test_effect_debug() {
        let effect = Effect::<()>::future(async { None });
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
        assert_eq!(format!("{:?}", Effect::<()>::None), "Effect::None");
    }
}
