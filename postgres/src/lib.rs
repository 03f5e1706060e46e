//! `PostgreSQL` storage for Race Ticket.
//!
//! [`PostgresDatabase`] implements the repository traits from
//! `raceticket-core` over a `sqlx` connection pool:
//!
//! - Users, races, entries, players, odds and betting tickets
//! - Relations loaded only when asked for
//! - Atomic balance changes: a charge is one `UPDATE ... RETURNING`, a purchase
//!   locks the buyer's row before deducting
//! - `initialize` wipes everything and bulk-loads the generated fixture
//!
//! # Example
//!
//! ```ignore
//! use raceticket_postgres::PostgresDatabase;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = PostgresDatabase::connect("postgres://localhost/raceticket", 10, options).await?;
//!     db.migrate().await?;
//!     db.initialize().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
mod seed;

use raceticket_core::fixture::{Fixture, FixtureOptions};
use raceticket_core::repository::{
    BettingTicketRepository, Database, NewBettingTicket, RaceRelations, RaceRepository,
    RaceWindow, RepositoryError, Result, UserRepository,
};
use raceticket_core::purchase::TRIFECTA;
use raceticket_core::{BettingTicket, BettingTicketId, OddsItem, Race, RaceId, User, UserId};
use rows::{EntryRow, OddsRow, RaceRow, TicketRow, UserRow};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

fn database_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| RepositoryError::Database(format!("{context}: {e}"))
}

/// `PostgreSQL`-backed [`Database`].
#[derive(Clone, Debug)]
pub struct PostgresDatabase {
    pool: PgPool,
    fixture: FixtureOptions,
}

impl PostgresDatabase {
    /// Wraps an existing pool. `initialize` reseeds from `fixture`.
    #[must_use]
    pub const fn new(pool: PgPool, fixture: FixtureOptions) -> Self {
        Self { pool, fixture }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be reached.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        fixture: FixtureOptions,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(database_error("Failed to connect"))?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool, fixture))
    }

    /// Runs the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn race_exists(&self, id: RaceId) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM races WHERE id = $1)")
            .bind(*id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error("Failed to look up race"))?;
        Ok(exists)
    }
}

impl UserRepository for PostgresDatabase {
    async fn create_anonymous_user(&self) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (id, balance, payoff) VALUES ($1, 0, 0) RETURNING id, balance, payoff",
        )
        .bind(*UserId::new().as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(database_error("Failed to create user"))?;

        let user = User::from(row);
        tracing::debug!(user_id = %user.id, "Anonymous user created");
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, balance, payoff FROM users WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error("Failed to get user"))?;

        Ok(row.map(User::from))
    }

    async fn charge(&self, id: UserId, amount: i64) -> Result<User> {
        // The guard keeps BIGINT arithmetic from overflowing inside the UPDATE
        let row: Option<UserRow> = sqlx::query_as(
            r"
            UPDATE users SET balance = balance + $2
            WHERE id = $1 AND balance <= $3 - $2
            RETURNING id, balance, payoff
            ",
        )
        .bind(*id.as_uuid())
        .bind(amount)
        .bind(i64::MAX)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("Failed to charge user"))?;

        if let Some(row) = row {
            return Ok(User::from(row));
        }

        match self.find_user(id).await? {
            Some(user) => Err(RepositoryError::BalanceOverflow {
                balance: user.balance,
                amount,
            }),
            None => Err(RepositoryError::not_found("user", id)),
        }
    }
}

impl RaceRepository for PostgresDatabase {
    async fn list_races(&self, window: RaceWindow) -> Result<Vec<Race>> {
        let rows: Vec<RaceRow> = sqlx::query_as(
            r"
            SELECT id, name, image, start_at, close_at
            FROM races
            WHERE ($1::timestamptz IS NULL OR start_at >= $1)
              AND ($2::timestamptz IS NULL OR start_at <= $2)
            ORDER BY start_at, id
            ",
        )
        .bind(window.since)
        .bind(window.until)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("Failed to list races"))?;

        Ok(rows.into_iter().map(Race::from).collect())
    }

    async fn find_race(&self, id: RaceId, relations: RaceRelations) -> Result<Option<Race>> {
        let row: Option<RaceRow> = sqlx::query_as(
            "SELECT id, name, image, start_at, close_at FROM races WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("Failed to get race"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut race = Race::from(row);

        if relations.entries {
            let entries: Vec<EntryRow> = sqlx::query_as(
                r"
                SELECT e.id, e.number, e.prediction_mark, e.first, e.second, e.third,
                       e.others, e.paper_weight, e.comment,
                       p.id AS player_id, p.name AS player_name,
                       p.short_name AS player_short_name, p.image AS player_image
                FROM entries e
                JOIN players p ON p.id = e.player_id
                WHERE e.race_id = $1
                ORDER BY e.number
                ",
            )
            .bind(*id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("Failed to get entries"))?;

            race.entries = Some(
                entries
                    .into_iter()
                    .map(|entry| entry.into_entry(relations.player))
                    .collect(),
            );
        }

        Ok(Some(race))
    }

    async fn trifecta_odds(&self, id: RaceId) -> Result<Option<Vec<OddsItem>>> {
        if !self.race_exists(id).await? {
            return Ok(None);
        }

        let rows: Vec<OddsRow> = sqlx::query_as(
            r"
            SELECT id, odds_type, key, odds
            FROM odds_items
            WHERE race_id = $1 AND odds_type = $2
            ORDER BY key
            ",
        )
        .bind(*id.as_uuid())
        .bind(TRIFECTA)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("Failed to get odds"))?;

        Ok(Some(rows.into_iter().map(OddsItem::from).collect()))
    }
}

impl BettingTicketRepository for PostgresDatabase {
    async fn list_tickets(&self, user_id: UserId, race_id: RaceId) -> Result<Vec<BettingTicket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            r"
            SELECT id, ticket_type, key, user_id, race_id, created_at
            FROM betting_tickets
            WHERE user_id = $1 AND race_id = $2
            ORDER BY created_at, id
            ",
        )
        .bind(*user_id.as_uuid())
        .bind(*race_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("Failed to list betting tickets"))?;

        Ok(rows.into_iter().map(BettingTicket::from).collect())
    }

    async fn purchase_ticket(&self, ticket: NewBettingTicket, price: i64) -> Result<BettingTicket> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(database_error("Failed to begin transaction"))?;

        let balance: Option<(i64,)> =
            sqlx::query_as("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(*ticket.user_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(database_error("Failed to lock user"))?;

        let (balance,) = balance.ok_or_else(|| RepositoryError::not_found("user", ticket.user_id))?;
        if balance < price {
            // Dropping the transaction rolls it back and releases the lock
            return Err(RepositoryError::InsufficientBalance {
                balance,
                required: price,
            });
        }

        sqlx::query("UPDATE users SET balance = balance - $2 WHERE id = $1")
            .bind(*ticket.user_id.as_uuid())
            .bind(price)
            .execute(&mut *tx)
            .await
            .map_err(database_error("Failed to deduct balance"))?;

        let row: TicketRow = sqlx::query_as(
            r"
            INSERT INTO betting_tickets (id, user_id, race_id, ticket_type, key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, ticket_type, key, user_id, race_id, created_at
            ",
        )
        .bind(*BettingTicketId::new().as_uuid())
        .bind(*ticket.user_id.as_uuid())
        .bind(*ticket.race_id.as_uuid())
        .bind(&ticket.ticket_type)
        .bind(&ticket.key)
        .fetch_one(&mut *tx)
        .await
        .map_err(database_error("Failed to insert betting ticket"))?;

        tx.commit()
            .await
            .map_err(database_error("Failed to commit purchase"))?;

        Ok(row.into())
    }
}

impl Database for PostgresDatabase {
    async fn initialize(&self) -> Result<()> {
        let fixture = Fixture::generate(&self.fixture);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(database_error("Failed to begin transaction"))?;

        seed::wipe(&mut tx)
            .await
            .map_err(database_error("Failed to truncate tables"))?;
        let summary = seed::load(&mut tx, &fixture)
            .await
            .map_err(database_error("Failed to seed fixture"))?;

        tx.commit()
            .await
            .map_err(database_error("Failed to commit seed"))?;

        tracing::info!(
            players = summary.players,
            races = summary.races,
            entries = summary.entries,
            odds = summary.odds,
            "Database initialized"
        );
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(database_error("Database unreachable"))?;
        Ok(())
    }
}
