//! Deterministic fixture data.
//!
//! The same [`FixtureOptions`] always produce the same players, races, entries
//! and odds, ids included, so a reset server can be compared against a
//! previous run.

use crate::domain::{Entry, EntryId, OddsItem, OddsItemId, Player, PlayerId, Race, RaceId};
use crate::purchase::TRIFECTA;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

const FAMILY_NAMES: &[&str] = &[
    "Aoki", "Fujita", "Hayashi", "Ikeda", "Kato", "Kimura", "Kobayashi", "Matsumoto", "Mori",
    "Nakamura", "Ogawa", "Saito", "Sasaki", "Shimizu", "Suzuki", "Takahashi", "Tanaka",
    "Watanabe", "Yamada", "Yoshida",
];

const GIVEN_NAMES: &[&str] = &[
    "Akira", "Daiki", "Haruto", "Hiroshi", "Kaito", "Kenji", "Makoto", "Ren", "Riku", "Ryota",
    "Shota", "Sora", "Takumi", "Yuki", "Yuto",
];

const STAGE_NAMES: &[&str] = &[
    "Hakone", "Kurobe", "Nikko", "Biwako", "Fuji", "Aso", "Izu", "Kiso", "Tama", "Sagami",
    "Shinano", "Tone",
];

const PREDICTION_MARKS: &[&str] = &["◎", "○", "▲", "△", "×", ""];

const COMMENTS: &[&str] = &[
    "Strong finish in the last race.",
    "Steady pace, rarely out of the top five.",
    "Returning after a short break.",
    "Good on a wet track.",
    "Fast starter, fades late.",
    "Best form of the season.",
];

/// Number of distinct player portraits shipped with the client.
const PLAYER_IMAGES: u32 = 60;

/// Number of distinct race cover images shipped with the client.
const RACE_IMAGES: u32 = 12;

/// Knobs for fixture generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixtureOptions {
    /// RNG seed
    pub seed: u64,
    /// First race day
    pub start_date: NaiveDate,
    /// Number of consecutive race days
    pub days: u32,
    /// Races per day
    pub races_per_day: u32,
    /// Size of the player pool
    pub players: u32,
}

impl FixtureOptions {
    /// Defaults anchored at `start_date`.
    #[must_use]
    pub const fn starting(start_date: NaiveDate) -> Self {
        Self {
            seed: 42,
            start_date,
            days: 3,
            races_per_day: 12,
            players: 60,
        }
    }
}

/// A race with everything hanging off it.
#[derive(Clone, Debug, PartialEq)]
pub struct RaceFixture {
    /// Race with `entries` populated, each entry with its player
    pub race: Race,
    /// Trifecta odds for every ordered triple of entry numbers
    pub odds: Vec<OddsItem>,
}

/// Generated data set.
#[derive(Clone, Debug, PartialEq)]
pub struct Fixture {
    /// Player pool
    pub players: Vec<Player>,
    /// Races in start order
    pub races: Vec<RaceFixture>,
}

impl Fixture {
    /// Generates the data set described by `options`.
    ///
    /// Odds come from a second RNG stream, so the race list stays stable
    /// when only the odds generation changes.
    #[must_use]
    pub fn generate(options: &FixtureOptions) -> Self {
        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut odds_rng = StdRng::seed_from_u64(options.seed.wrapping_add(1));

        let players: Vec<Player> = (0..options.players.max(3))
            .map(|i| generate_player(&mut rng, i))
            .collect();

        let mut races = Vec::new();
        for day in 0..options.days {
            let date = options.start_date + Duration::days(i64::from(day));
            for index in 0..options.races_per_day {
                let race = generate_race(&mut rng, &players, date, index);
                let entries = race
                    .entries
                    .as_ref()
                    .map_or(0, |entries| i32::try_from(entries.len()).unwrap_or(0));
                let odds = generate_trifecta_odds(&mut odds_rng, entries);
                races.push(RaceFixture { race, odds });
            }
        }

        Self { players, races }
    }
}

fn random_uuid(rng: &mut StdRng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.r#gen()).into_uuid()
}

fn generate_player(rng: &mut StdRng, index: u32) -> Player {
    let family = FAMILY_NAMES.choose(rng).copied().unwrap_or("Tanaka");
    let given = GIVEN_NAMES.choose(rng).copied().unwrap_or("Ren");

    Player {
        id: PlayerId::from_uuid(random_uuid(rng)),
        name: format!("{family} {given}"),
        short_name: family.to_string(),
        image: format!("/assets/images/players/{:03}.jpg", index % PLAYER_IMAGES),
    }
}

fn generate_race(rng: &mut StdRng, players: &[Player], date: NaiveDate, index: u32) -> Race {
    // First race at 10:00 UTC, then every 30 minutes; sales close 2 minutes before
    let day_start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    let start_at = day_start + Duration::hours(10) + Duration::minutes(30 * i64::from(index));
    let close_at = start_at - Duration::minutes(2);

    let stage = STAGE_NAMES
        .get(index as usize % STAGE_NAMES.len())
        .copied()
        .unwrap_or("Hakone");

    let entry_count = rng.gen_range(8..=12).min(players.len());
    let mut pool: Vec<&Player> = players.iter().collect();
    pool.shuffle(rng);

    let entries = pool
        .into_iter()
        .take(entry_count)
        .enumerate()
        .map(|(i, player)| generate_entry(rng, player, i))
        .collect();

    Race {
        id: RaceId::from_uuid(random_uuid(rng)),
        name: format!("{stage} Cup {}R", index + 1),
        image: format!("/assets/images/races/{:03}.jpg", index % RACE_IMAGES),
        start_at,
        close_at,
        entries: Some(entries),
    }
}

fn generate_entry(rng: &mut StdRng, player: &Player, position: usize) -> Entry {
    let number = i32::try_from(position + 1).unwrap_or(i32::MAX);

    Entry {
        id: EntryId::from_uuid(random_uuid(rng)),
        number,
        player: Some(player.clone()),
        prediction_mark: PREDICTION_MARKS
            .choose(rng)
            .copied()
            .unwrap_or_default()
            .to_string(),
        first: rng.gen_range(0..20),
        second: rng.gen_range(0..20),
        third: rng.gen_range(0..20),
        others: rng.gen_range(0..60),
        paper_weight: f64::from(rng.gen_range(0..100_u32)) / 100.0,
        comment: COMMENTS.choose(rng).copied().unwrap_or_default().to_string(),
    }
}

/// Odds for every ordered triple of distinct entry numbers in `1..=entries`.
#[must_use]
pub fn generate_trifecta_odds(rng: &mut StdRng, entries: i32) -> Vec<OddsItem> {
    let mut odds = Vec::new();
    for first in 1..=entries {
        for second in (1..=entries).filter(|n| *n != first) {
            for third in (1..=entries).filter(|n| *n != first && *n != second) {
                // One decimal place, 1.0 to 2000.0
                let tenths: u32 = rng.gen_range(10..=20_000);
                odds.push(OddsItem {
                    id: OddsItemId::from_uuid(random_uuid(rng)),
                    odds_type: TRIFECTA.to_string(),
                    key: vec![first, second, third],
                    odds: f64::from(tenths) / 10.0,
                });
            }
        }
    }
    odds
}
