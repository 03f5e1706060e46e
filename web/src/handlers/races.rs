//! Race endpoints: listings, detail, entries and odds.
//!
//! Image paths are stored as `.jpg`; responses point at the AVIF variants
//! the client ships. Listings use the still image, detail views the
//! `-live` one.

use super::parse_race_id;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use raceticket_core::repository::{Database, RaceRelations, RaceWindow};
use raceticket_core::{Hero, OddsItem, Race, RaceList};
use serde::Deserialize;

/// Hero image served on the landing page.
pub const HERO_IMAGE: &str = "/assets/images/hero.avif";

fn avif(image: &str) -> String {
    image.replacen(".jpg", ".avif", 1)
}

fn live_avif(image: &str) -> String {
    image.replacen(".jpg", "-live.avif", 1)
}

fn shape_detail(mut race: Race) -> Race {
    race.image = live_avif(&race.image);
    if let Some(entries) = race.entries.as_mut() {
        for player in entries.iter_mut().filter_map(|e| e.player.as_mut()) {
            player.image = avif(&player.image);
        }
    }
    race
}

/// Landing page hero.
///
/// ```text
/// GET /api/hero
/// ```
#[allow(clippy::unused_async)]
pub async fn hero() -> Json<Hero> {
    Json(Hero {
        url: HERO_IMAGE.to_string(),
    })
}

/// Query of `GET /races`.
#[derive(Debug, Default, Deserialize)]
pub struct RaceListQuery {
    /// Earliest start time
    pub since: Option<String>,
    /// Latest start time
    pub until: Option<String>,
}

/// Which bound a date-only value stands for.
#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Accepts RFC 3339 timestamps and `YYYY-MM-DD` dates. A date covers the
/// whole UTC day: as a lower bound it means midnight, as an upper bound the
/// last millisecond.
fn parse_bound(name: &str, raw: &str, bound: Bound) -> Result<DateTime<Utc>, AppError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("`{name}` is not a valid date: {raw}")))?;
    let start = date.and_time(NaiveTime::MIN).and_utc();
    Ok(match bound {
        Bound::Start => start,
        Bound::End => start + Duration::days(1) - Duration::milliseconds(1),
    })
}

impl RaceListQuery {
    fn window(&self) -> Result<RaceWindow, AppError> {
        Ok(RaceWindow {
            since: self
                .since
                .as_deref()
                .map(|s| parse_bound("since", s, Bound::Start))
                .transpose()?,
            until: self
                .until
                .as_deref()
                .map(|s| parse_bound("until", s, Bound::End))
                .transpose()?,
        })
    }
}

/// Races starting inside the window, in start order.
///
/// ```text
/// GET /api/races?since=2025-01-01T00:00:00Z&until=2025-01-01T23:59:59Z
/// ```
///
/// # Errors
///
/// Returns 400 if `since` or `until` cannot be parsed.
pub async fn list<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<RaceListQuery>,
) -> Result<Json<RaceList>, AppError> {
    let window = query.window()?;

    let races = state
        .db
        .list_races(window)
        .await?
        .into_iter()
        .map(|mut race| {
            race.image = avif(&race.image);
            race
        })
        .collect();

    Ok(Json(RaceList { races }))
}

/// Relation flags of `GET /races/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct RaceDetailQuery {
    /// Include entries
    pub entries: Option<String>,
    /// Include each entry's player
    pub player: Option<String>,
}

fn flag(value: Option<&str>) -> bool {
    !matches!(value.map(str::trim), None | Some("" | "false" | "0"))
}

impl RaceDetailQuery {
    fn relations(&self) -> RaceRelations {
        RaceRelations {
            entries: flag(self.entries.as_deref()),
            player: flag(self.player.as_deref()),
        }
    }
}

/// One race, with the relations asked for.
///
/// ```text
/// GET /api/races/:id?entries=true&player=true
/// ```
///
/// # Errors
///
/// Returns 404 if the race does not exist.
pub async fn show<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
    Query(query): Query<RaceDetailQuery>,
) -> Result<Json<Race>, AppError> {
    let race_id = parse_race_id(&id)?;
    let race = state
        .db
        .find_race(race_id, query.relations())
        .await?
        .ok_or_else(|| AppError::not_found("Race", race_id))?;

    Ok(Json(shape_detail(race)))
}

/// A race with its entries and their players.
///
/// ```text
/// GET /api/races/:id/entries
/// ```
///
/// # Errors
///
/// Returns 404 if the race does not exist.
pub async fn entries<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<Json<Race>, AppError> {
    let race_id = parse_race_id(&id)?;
    let race = state
        .db
        .find_race(race_id, RaceRelations::FULL)
        .await?
        .ok_or_else(|| AppError::not_found("Race", race_id))?;

    Ok(Json(shape_detail(race)))
}

/// Trifecta odds of a race.
///
/// ```text
/// GET /api/races/:id/trifectaOdds
/// ```
///
/// # Errors
///
/// Returns 404 if the race does not exist.
pub async fn trifecta_odds<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OddsItem>>, AppError> {
    let race_id = parse_race_id(&id)?;
    let odds = state
        .db
        .trifecta_odds(race_id)
        .await?
        .ok_or_else(|| AppError::not_found("Race", race_id))?;

    Ok(Json(odds))
}
