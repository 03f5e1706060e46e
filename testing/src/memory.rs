//! In-memory [`Database`] for tests.
//!
//! Same contract as the Postgres implementation: purchases re-check the
//! balance and deduct it under one lock, charges are a single update.

use chrono::{NaiveDate, Utc};
use raceticket_core::fixture::{Fixture, FixtureOptions};
use raceticket_core::repository::{
    BettingTicketRepository, Database, NewBettingTicket, RaceRelations, RaceRepository,
    RaceWindow, RepositoryError, Result, UserRepository,
};
use raceticket_core::{
    BettingTicket, BettingTicketId, OddsItem, Race, RaceId, User, UserId,
};
use std::collections::HashMap;
use std::future::{self, Future};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    /// Races stored with entries and players populated
    races: HashMap<RaceId, Race>,
    odds: HashMap<RaceId, Vec<OddsItem>>,
    tickets: Vec<BettingTicket>,
    unavailable: bool,
}

impl Tables {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            Err(RepositoryError::Database("database unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Thread-safe in-memory storage.
///
/// Clones share the same tables.
#[derive(Clone, Debug)]
pub struct InMemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    fixture: FixtureOptions,
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDatabase {
    /// Empty storage. `initialize` seeds one day of races on 2025-01-01.
    #[must_use]
    pub fn new() -> Self {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
        Self::with_fixture(FixtureOptions {
            days: 1,
            races_per_day: 4,
            players: 24,
            ..FixtureOptions::starting(start)
        })
    }

    /// Empty storage that `initialize` seeds from `fixture`.
    #[must_use]
    pub fn with_fixture(fixture: FixtureOptions) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            fixture,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a user.
    pub fn insert_user(&self, user: User) {
        self.lock().users.insert(user.id, user);
    }

    /// Inserts a race (entries and players populated) with its odds.
    pub fn insert_race(&self, race: Race, odds: Vec<OddsItem>) {
        let mut tables = self.lock();
        tables.odds.insert(race.id, odds);
        tables.races.insert(race.id, race);
    }

    /// Current state of a user.
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<User> {
        self.lock().users.get(&id).cloned()
    }

    /// Every ticket sold, oldest first.
    #[must_use]
    pub fn tickets(&self) -> Vec<BettingTicket> {
        self.lock().tickets.clone()
    }

    /// Every stored race with relations, by start time.
    #[must_use]
    pub fn races(&self) -> Vec<Race> {
        let mut races: Vec<Race> = self.lock().races.values().cloned().collect();
        races.sort_by_key(|race| race.start_at);
        races
    }

    /// Makes every operation fail with a database error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }
}

fn shape(race: &Race, relations: RaceRelations) -> Race {
    let entries = race.entries.as_ref().filter(|_| relations.entries).map(|entries| {
        entries
            .iter()
            .cloned()
            .map(|mut entry| {
                if !relations.player {
                    entry.player = None;
                }
                entry
            })
            .collect()
    });

    Race {
        entries,
        ..race.clone()
    }
}

impl UserRepository for InMemoryDatabase {
    fn create_anonymous_user(&self) -> impl Future<Output = Result<User>> + Send {
        let mut tables = self.lock();
        let result = tables.check_available().map(|()| {
            let user = User::anonymous();
            tables.users.insert(user.id, user.clone());
            user
        });
        future::ready(result)
    }

    fn find_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>>> + Send {
        let tables = self.lock();
        let result = tables
            .check_available()
            .map(|()| tables.users.get(&id).cloned());
        future::ready(result)
    }

    fn charge(&self, id: UserId, amount: i64) -> impl Future<Output = Result<User>> + Send {
        let mut tables = self.lock();
        let result = tables.check_available().and_then(|()| {
            let user = tables
                .users
                .get_mut(&id)
                .ok_or_else(|| RepositoryError::not_found("user", id))?;
            user.balance = user.balance.checked_add(amount).ok_or(
                RepositoryError::BalanceOverflow {
                    balance: user.balance,
                    amount,
                },
            )?;
            Ok(user.clone())
        });
        future::ready(result)
    }
}

impl RaceRepository for InMemoryDatabase {
    fn list_races(&self, window: RaceWindow) -> impl Future<Output = Result<Vec<Race>>> + Send {
        let tables = self.lock();
        let result = tables.check_available().map(|()| {
            let mut races: Vec<Race> = tables
                .races
                .values()
                .filter(|race| window.contains(race.start_at))
                .map(|race| shape(race, RaceRelations::NONE))
                .collect();
            races.sort_by_key(|race| race.start_at);
            races
        });
        future::ready(result)
    }

    fn find_race(
        &self,
        id: RaceId,
        relations: RaceRelations,
    ) -> impl Future<Output = Result<Option<Race>>> + Send {
        let tables = self.lock();
        let result = tables
            .check_available()
            .map(|()| tables.races.get(&id).map(|race| shape(race, relations)));
        future::ready(result)
    }

    fn trifecta_odds(
        &self,
        id: RaceId,
    ) -> impl Future<Output = Result<Option<Vec<OddsItem>>>> + Send {
        let tables = self.lock();
        let result = tables.check_available().map(|()| {
            tables
                .races
                .contains_key(&id)
                .then(|| tables.odds.get(&id).cloned().unwrap_or_default())
        });
        future::ready(result)
    }
}

impl BettingTicketRepository for InMemoryDatabase {
    fn list_tickets(
        &self,
        user_id: UserId,
        race_id: RaceId,
    ) -> impl Future<Output = Result<Vec<BettingTicket>>> + Send {
        let tables = self.lock();
        let result = tables.check_available().map(|()| {
            tables
                .tickets
                .iter()
                .filter(|t| t.user_id == user_id && t.race_id == race_id)
                .cloned()
                .collect()
        });
        future::ready(result)
    }

    fn purchase_ticket(
        &self,
        ticket: NewBettingTicket,
        price: i64,
    ) -> impl Future<Output = Result<BettingTicket>> + Send {
        let mut tables = self.lock();
        let result = tables.check_available().and_then(|()| {
            let user = tables
                .users
                .get_mut(&ticket.user_id)
                .ok_or_else(|| RepositoryError::not_found("user", ticket.user_id))?;
            if user.balance < price {
                return Err(RepositoryError::InsufficientBalance {
                    balance: user.balance,
                    required: price,
                });
            }
            user.balance -= price;

            let ticket = BettingTicket {
                id: BettingTicketId::new(),
                ticket_type: ticket.ticket_type,
                key: ticket.key,
                user_id: ticket.user_id,
                race_id: ticket.race_id,
                created_at: Utc::now(),
            };
            tables.tickets.push(ticket.clone());
            Ok(ticket)
        });
        future::ready(result)
    }
}

impl Database for InMemoryDatabase {
    fn initialize(&self) -> impl Future<Output = Result<()>> + Send {
        let fixture = Fixture::generate(&self.fixture);
        let mut tables = self.lock();
        let result = tables.check_available().map(|()| {
            tables.users.clear();
            tables.tickets.clear();
            tables.races.clear();
            tables.odds.clear();
            for race in fixture.races {
                tables.odds.insert(race.race.id, race.odds);
                tables.races.insert(race.race.id, race.race);
            }
        });
        future::ready(result)
    }

    fn ping(&self) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.lock().check_available())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use raceticket_core::purchase::{TICKET_PRICE, TRIFECTA};

    async fn seeded() -> InMemoryDatabase {
        let db = InMemoryDatabase::new();
        db.initialize().await.unwrap();
        db
    }

    fn new_ticket(user_id: UserId, race_id: RaceId) -> NewBettingTicket {
        NewBettingTicket {
            user_id,
            race_id,
            ticket_type: TRIFECTA.to_string(),
            key: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn test_initialize_seeds_races_without_relations_in_list() {
        let db = seeded().await;

        let races = db.list_races(RaceWindow::default()).await.unwrap();
        assert_eq!(races.len(), 4);
        assert!(races.iter().all(|race| race.entries.is_none()));
        assert!(races.windows(2).all(|w| w[0].start_at <= w[1].start_at));
    }

    #[tokio::test]
    async fn test_find_race_honours_relations() {
        let db = seeded().await;
        let id = db.races()[0].id;

        let bare = db.find_race(id, RaceRelations::NONE).await.unwrap().unwrap();
        assert!(bare.entries.is_none());

        let entries_only = db
            .find_race(
                id,
                RaceRelations {
                    entries: true,
                    player: false,
                },
            )
            .await
            .unwrap()
            .unwrap();
        let entries = entries_only.entries.unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.player.is_none()));

        let full = db.find_race(id, RaceRelations::FULL).await.unwrap().unwrap();
        assert!(full.entries.unwrap().iter().all(|e| e.player.is_some()));

        assert!(db.find_race(RaceId::new(), RaceRelations::FULL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purchase_deducts_and_rejects_when_short() {
        let db = seeded().await;
        let race_id = db.races()[0].id;
        let user = User {
            balance: 150,
            ..User::anonymous()
        };
        db.insert_user(user.clone());

        let ticket = db
            .purchase_ticket(new_ticket(user.id, race_id), TICKET_PRICE)
            .await
            .unwrap();
        assert_eq!(ticket.key, vec![1, 2, 3]);
        assert_eq!(db.user(user.id).unwrap().balance, 50);

        let err = db
            .purchase_ticket(new_ticket(user.id, race_id), TICKET_PRICE)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::InsufficientBalance {
                balance: 50,
                required: 100
            }
        );
        assert_eq!(db.list_tickets(user.id, race_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_charge_rejects_balance_overflow() {
        let db = seeded().await;
        let user = User {
            balance: i64::MAX - 10,
            ..User::anonymous()
        };
        db.insert_user(user.clone());

        let err = db.charge(user.id, 100).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::BalanceOverflow {
                balance: i64::MAX - 10,
                amount: 100
            }
        );
        assert_eq!(db.user(user.id).unwrap().balance, i64::MAX - 10);
    }

    #[tokio::test]
    async fn test_charge_missing_user() {
        let db = seeded().await;
        let err = db.charge(UserId::new(), 100).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { resource: "user", .. }));
    }

    #[tokio::test]
    async fn test_unavailable_fails_everything() {
        let db = seeded().await;
        db.set_unavailable(true);
        assert!(db.ping().await.is_err());
        assert!(db.create_anonymous_user().await.is_err());

        db.set_unavailable(false);
        assert!(db.ping().await.is_ok());
    }
}
