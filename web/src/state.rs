//! Application state for Axum handlers.

use raceticket_core::environment::{Clock, SystemClock};
use raceticket_core::repository::Database;
use std::sync::Arc;

/// State shared by every handler: storage plus the clock used for race
/// closure checks.
///
/// # Examples
///
/// ```ignore
/// use raceticket_web::{AppState, build_router};
///
/// let state = AppState::new(db);
/// let app = build_router(state);
/// ```
#[derive(Clone)]
pub struct AppState<D> {
    /// Storage
    pub db: D,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl<D: Database> AppState<D> {
    /// State over `db` using the system clock.
    #[must_use]
    pub fn new(db: D) -> Self {
        Self::with_clock(db, SystemClock)
    }

    /// State over `db` with a custom clock.
    #[must_use]
    pub fn with_clock(db: D, clock: impl Clock + 'static) -> Self {
        Self {
            db,
            clock: Arc::new(clock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raceticket_testing::{InMemoryDatabase, test_clock};

    #[test]
    fn test_state_is_clone() {
        // Ensure AppState implements Clone (required for Axum)
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState<InMemoryDatabase>>();
    }

    #[test]
    fn test_with_clock() {
        let state = AppState::with_clock(InMemoryDatabase::new(), test_clock());
        assert_eq!(state.clock.now(), test_clock().now());
    }
}
