//! Domain types for races and betting.
//!
//! These are plain data records as surfaced through the API. JSON field names
//! are camelCase. Relations that are only loaded on request (`entries`,
//! `player`) are `Option`s and are omitted from JSON when not loaded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Request header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-app-userid";

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a user
    UserId
);
uuid_id!(
    /// Unique identifier for a race
    RaceId
);
uuid_id!(
    /// Unique identifier for a race entry
    EntryId
);
uuid_id!(
    /// Unique identifier for a player
    PlayerId
);
uuid_id!(
    /// Unique identifier for an odds item
    OddsItemId
);
uuid_id!(
    /// Unique identifier for a betting ticket
    BettingTicketId
);

// ============================================================================
// Entities
// ============================================================================

/// A user and their point balance.
///
/// Users are created anonymously; the id is the only credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Point balance spent on tickets
    pub balance: i64,
    /// Total payoff received
    pub payoff: i64,
}

impl User {
    /// A freshly created user with empty balances
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            id: UserId::new(),
            balance: 0,
            payoff: 0,
        }
    }
}

/// A race participant's profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Player ID
    pub id: PlayerId,
    /// Full name
    pub name: String,
    /// Name used in compact tables
    pub short_name: String,
    /// Portrait image path
    pub image: String,
}

/// A player's entry in one race.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Entry ID
    pub id: EntryId,
    /// Starting number within the race
    pub number: i32,
    /// Player, present only when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<Player>,
    /// Forecast mark shown on the race card
    pub prediction_mark: String,
    /// Career first places
    pub first: i32,
    /// Career second places
    pub second: i32,
    /// Career third places
    pub third: i32,
    /// Career finishes outside the top three
    pub others: i32,
    /// Paper weight handicap
    pub paper_weight: f64,
    /// Short comment
    pub comment: String,
}

/// Payout odds for one combination of entry numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsItem {
    /// Odds item ID
    pub id: OddsItemId,
    /// Bet type (always `trifecta` today)
    #[serde(rename = "type")]
    pub odds_type: String,
    /// Entry numbers in finishing order
    pub key: Vec<i32>,
    /// Payout multiplier
    pub odds: f64,
}

/// A race and, when requested, its entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    /// Race ID
    pub id: RaceId,
    /// Display name
    pub name: String,
    /// Cover image path
    pub image: String,
    /// When the race starts
    pub start_at: DateTime<Utc>,
    /// When ticket sales close
    pub close_at: DateTime<Utc>,
    /// Entries, present only when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<Entry>>,
}

impl Race {
    /// Whether ticket sales have closed at `now`.
    #[must_use]
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.close_at < now
    }
}

/// A purchased prediction for a race.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingTicket {
    /// Ticket ID
    pub id: BettingTicketId,
    /// Bet type
    #[serde(rename = "type")]
    pub ticket_type: String,
    /// Chosen entry numbers
    pub key: Vec<i32>,
    /// Owner
    pub user_id: UserId,
    /// Race the ticket is for
    pub race_id: RaceId,
    /// Purchase time
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Response envelopes
// ============================================================================

/// Body of `GET /hero`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    /// Hero image URL
    pub url: String,
}

/// Body of `GET /races`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceList {
    /// Races in start order
    pub races: Vec<Race>,
}

/// Body of `GET /races/:id/betting-tickets`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingTicketList {
    /// The caller's tickets for the race
    pub betting_tickets: Vec<BettingTicket>,
}
