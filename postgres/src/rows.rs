//! Row shapes returned by queries and their conversion into domain records.

use chrono::{DateTime, Utc};
use raceticket_core::{
    BettingTicket, BettingTicketId, Entry, EntryId, OddsItem, OddsItemId, Player, PlayerId, Race,
    RaceId, User, UserId,
};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    balance: i64,
    payoff: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            balance: row.balance,
            payoff: row.payoff,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RaceRow {
    id: Uuid,
    name: String,
    image: String,
    start_at: DateTime<Utc>,
    close_at: DateTime<Utc>,
}

impl From<RaceRow> for Race {
    fn from(row: RaceRow) -> Self {
        Self {
            id: RaceId::from_uuid(row.id),
            name: row.name,
            image: row.image,
            start_at: row.start_at,
            close_at: row.close_at,
            entries: None,
        }
    }
}

/// An entry joined with its player.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryRow {
    id: Uuid,
    number: i32,
    prediction_mark: String,
    first: i32,
    second: i32,
    third: i32,
    others: i32,
    paper_weight: f64,
    comment: String,
    player_id: Uuid,
    player_name: String,
    player_short_name: String,
    player_image: String,
}

impl EntryRow {
    pub(crate) fn into_entry(self, with_player: bool) -> Entry {
        let player = with_player.then(|| Player {
            id: PlayerId::from_uuid(self.player_id),
            name: self.player_name,
            short_name: self.player_short_name,
            image: self.player_image,
        });

        Entry {
            id: EntryId::from_uuid(self.id),
            number: self.number,
            player,
            prediction_mark: self.prediction_mark,
            first: self.first,
            second: self.second,
            third: self.third,
            others: self.others,
            paper_weight: self.paper_weight,
            comment: self.comment,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OddsRow {
    id: Uuid,
    odds_type: String,
    key: Vec<i32>,
    odds: f64,
}

impl From<OddsRow> for OddsItem {
    fn from(row: OddsRow) -> Self {
        Self {
            id: OddsItemId::from_uuid(row.id),
            odds_type: row.odds_type,
            key: row.key,
            odds: row.odds,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TicketRow {
    id: Uuid,
    ticket_type: String,
    key: Vec<i32>,
    user_id: Uuid,
    race_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for BettingTicket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: BettingTicketId::from_uuid(row.id),
            ticket_type: row.ticket_type,
            key: row.key,
            user_id: UserId::from_uuid(row.user_id),
            race_id: RaceId::from_uuid(row.race_id),
            created_at: row.created_at,
        }
    }
}
