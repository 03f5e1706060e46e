//! Bulk loading of the generated fixture.

use raceticket_core::fixture::Fixture;
use raceticket_core::{Entry, OddsItem, Player, Race, RaceId};
use sqlx::{Postgres, QueryBuilder, Transaction};

/// Rows per multi-row `INSERT`. Keeps every statement well under the
/// protocol's 65535 bind parameter limit.
const BATCH_SIZE: usize = 1000;

/// Counts of what was written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    pub(crate) players: usize,
    pub(crate) races: usize,
    pub(crate) entries: usize,
    pub(crate) odds: usize,
}

pub(crate) async fn wipe(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query("TRUNCATE betting_tickets, odds_items, entries, races, players, users")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn load(
    tx: &mut Transaction<'_, Postgres>,
    fixture: &Fixture,
) -> Result<SeedSummary, sqlx::Error> {
    let mut summary = SeedSummary::default();

    for chunk in fixture.players.chunks(BATCH_SIZE) {
        insert_players(tx, chunk).await?;
        summary.players += chunk.len();
    }

    let races: Vec<&Race> = fixture.races.iter().map(|r| &r.race).collect();
    for chunk in races.chunks(BATCH_SIZE) {
        insert_races(tx, chunk).await?;
        summary.races += chunk.len();
    }

    let entries: Vec<(RaceId, &Entry)> = races
        .iter()
        .flat_map(|race| {
            race.entries
                .iter()
                .flatten()
                .map(move |entry| (race.id, entry))
        })
        .collect();
    for chunk in entries.chunks(BATCH_SIZE) {
        insert_entries(tx, chunk).await?;
        summary.entries += chunk.len();
    }

    let odds: Vec<(RaceId, &OddsItem)> = fixture
        .races
        .iter()
        .flat_map(|r| r.odds.iter().map(move |item| (r.race.id, item)))
        .collect();
    for chunk in odds.chunks(BATCH_SIZE) {
        insert_odds(tx, chunk).await?;
        summary.odds += chunk.len();
    }

    Ok(summary)
}

async fn insert_players(
    tx: &mut Transaction<'_, Postgres>,
    players: &[Player],
) -> Result<(), sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO players (id, name, short_name, image) ");
    builder.push_values(players, |mut row, player| {
        row.push_bind(*player.id.as_uuid())
            .push_bind(&player.name)
            .push_bind(&player.short_name)
            .push_bind(&player.image);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_races(tx: &mut Transaction<'_, Postgres>, races: &[&Race]) -> Result<(), sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("INSERT INTO races (id, name, image, start_at, close_at) ");
    builder.push_values(races, |mut row, race| {
        row.push_bind(*race.id.as_uuid())
            .push_bind(&race.name)
            .push_bind(&race.image)
            .push_bind(race.start_at)
            .push_bind(race.close_at);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_entries(
    tx: &mut Transaction<'_, Postgres>,
    entries: &[(RaceId, &Entry)],
) -> Result<(), sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO entries (id, race_id, player_id, number, prediction_mark, \
         first, second, third, others, paper_weight, comment) ",
    );
    builder.push_values(entries, |mut row, (race_id, entry)| {
        row.push_bind(*entry.id.as_uuid())
            .push_bind(*race_id.as_uuid())
            .push_bind(entry.player.as_ref().map(|p| *p.id.as_uuid()))
            .push_bind(entry.number)
            .push_bind(&entry.prediction_mark)
            .push_bind(entry.first)
            .push_bind(entry.second)
            .push_bind(entry.third)
            .push_bind(entry.others)
            .push_bind(entry.paper_weight)
            .push_bind(&entry.comment);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_odds(
    tx: &mut Transaction<'_, Postgres>,
    odds: &[(RaceId, &OddsItem)],
) -> Result<(), sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("INSERT INTO odds_items (id, race_id, odds_type, key, odds) ");
    builder.push_values(odds, |mut row, (race_id, item)| {
        row.push_bind(*item.id.as_uuid())
            .push_bind(*race_id.as_uuid())
            .push_bind(&item.odds_type)
            .push_bind(&item.key)
            .push_bind(item.odds);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}
