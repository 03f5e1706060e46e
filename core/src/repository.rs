//! Storage seams the API server is written against.
//!
//! Repositories return plain records. Relations are loaded only when asked for
//! through [`RaceRelations`]. Balance changes are atomic in every
//! implementation: a charge is a single increment and a purchase re-reads the
//! balance under a lock before writing the ticket.

use crate::domain::{BettingTicket, OddsItem, Race, RaceId, User, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;

/// Errors returned by repositories.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Referenced record does not exist
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of record
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Balance re-check inside the purchase transaction failed
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance {
        /// Balance read under lock
        balance: i64,
        /// Price that had to be covered
        required: i64,
    },

    /// Charging would push the balance past what storage can hold
    #[error("balance limit exceeded: have {balance}, adding {amount}")]
    BalanceOverflow {
        /// Balance before the charge
        balance: i64,
        /// Amount that was to be added
        amount: i64,
    },

    /// Underlying storage failure
    #[error("database error: {0}")]
    Database(String),
}

impl RepositoryError {
    /// Shorthand for a missing record.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Filter on race start time. Bounds are inclusive; `None` is unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RaceWindow {
    /// Earliest start time
    pub since: Option<DateTime<Utc>>,
    /// Latest start time
    pub until: Option<DateTime<Utc>>,
}

impl RaceWindow {
    /// Whether `start_at` falls inside the window.
    #[must_use]
    pub fn contains(&self, start_at: DateTime<Utc>) -> bool {
        self.since.is_none_or(|since| start_at >= since)
            && self.until.is_none_or(|until| start_at <= until)
    }
}

/// Which relations to load with a race.
///
/// `player` is only honoured together with `entries`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RaceRelations {
    /// Load the race's entries
    pub entries: bool,
    /// Load each entry's player
    pub player: bool,
}

impl RaceRelations {
    /// No relations.
    pub const NONE: Self = Self {
        entries: false,
        player: false,
    };

    /// Entries and their players.
    pub const FULL: Self = Self {
        entries: true,
        player: true,
    };
}

/// A ticket about to be purchased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBettingTicket {
    /// Buyer
    pub user_id: UserId,
    /// Race the ticket is for
    pub race_id: RaceId,
    /// Bet type
    pub ticket_type: String,
    /// Entry numbers
    pub key: Vec<i32>,
}

/// User storage.
pub trait UserRepository: Send + Sync {
    /// Creates a user with zero balance and payoff.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    fn create_anonymous_user(&self) -> impl Future<Output = Result<User>> + Send;

    /// Looks up a user. `Ok(None)` when no such user exists.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Adds `amount` to the user's balance in one atomic update and returns
    /// the updated user.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The user does not exist → `RepositoryError::NotFound`
    /// - The new balance does not fit → `RepositoryError::BalanceOverflow`
    /// - The update fails
    fn charge(&self, id: UserId, amount: i64) -> impl Future<Output = Result<User>> + Send;
}

/// Race, entry and odds storage.
pub trait RaceRepository: Send + Sync {
    /// Races whose start time falls in `window`, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_races(&self, window: RaceWindow) -> impl Future<Output = Result<Vec<Race>>> + Send;

    /// One race with the requested relations. `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_race(
        &self,
        id: RaceId,
        relations: RaceRelations,
    ) -> impl Future<Output = Result<Option<Race>>> + Send;

    /// Trifecta odds of a race. `Ok(None)` when the race is missing.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn trifecta_odds(&self, id: RaceId)
    -> impl Future<Output = Result<Option<Vec<OddsItem>>>> + Send;
}

/// Betting ticket storage.
pub trait BettingTicketRepository: Send + Sync {
    /// Tickets a user holds for a race, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_tickets(
        &self,
        user_id: UserId,
        race_id: RaceId,
    ) -> impl Future<Output = Result<Vec<BettingTicket>>> + Send;

    /// Writes the ticket and deducts `price` from the buyer in one
    /// transaction. The balance is re-read under a lock first, so concurrent
    /// purchases can never drive it below zero.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The buyer no longer exists → `RepositoryError::NotFound`
    /// - The locked balance is below `price` → `RepositoryError::InsufficientBalance`
    /// - The transaction fails
    fn purchase_ticket(
        &self,
        ticket: NewBettingTicket,
        price: i64,
    ) -> impl Future<Output = Result<BettingTicket>> + Send;
}

/// Everything the API needs from storage.
pub trait Database:
    UserRepository + RaceRepository + BettingTicketRepository + Clone + 'static
{
    /// Wipes all data and reseeds the fixture races.
    ///
    /// # Errors
    ///
    /// Returns error if truncation or seeding fails.
    fn initialize(&self) -> impl Future<Output = Result<()>> + Send;

    /// Cheap connectivity probe used by readiness checks.
    ///
    /// # Errors
    ///
    /// Returns error if storage is unreachable.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;
}
