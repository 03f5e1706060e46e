//! # Race Ticket Testing
//!
//! Testing utilities shared by the Race Ticket crates.
//!
//! This crate provides:
//! - [`FixedClock`] and [`test_clock`] for deterministic time
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - [`InMemoryDatabase`], a [`Database`](raceticket_core::repository::Database)
//!   with the same contract as the Postgres one
//! - [`MockFetcher`], a scripted client transport
//!
//! ## Example
//!
//! ```ignore
//! use raceticket_testing::{InMemoryDatabase, test_clock};
//!
//! #[tokio::test]
//! async fn test_purchase_flow() {
//!     let db = InMemoryDatabase::new();
//!     db.initialize().await?;
//!     let app = build_router(AppState::with_clock(db.clone(), test_clock()));
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use raceticket_core::environment::Clock;

pub mod fetcher;
pub mod memory;
pub mod reducer_test;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeZone;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use raceticket_testing::mocks::FixedClock;
    /// use raceticket_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Default fixed clock for tests: 2025-01-01 00:00:00 UTC, before the
    /// first seeded race closes.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
        )
    }
}

/// Installs a test-writer subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fetcher::MockFetcher;
pub use memory::InMemoryDatabase;
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
