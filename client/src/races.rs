//! Race view helpers.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use raceticket_core::repository::RaceWindow;
use raceticket_core::{OddsItem, Race};
use std::cmp::Ordering;

/// Whether ticket sales for `race` have closed at `now`.
#[must_use]
pub fn is_race_closed(race: &Race, now: DateTime<Utc>) -> bool {
    race.is_closed_at(now)
}

/// Odds by popularity: lowest payout first, ties broken by key.
#[must_use]
pub fn rank_odds(mut odds: Vec<OddsItem>) -> Vec<OddsItem> {
    odds.sort_by(|a, b| {
        a.odds
            .partial_cmp(&b.odds)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    odds
}

/// `since`/`until` covering the whole UTC day `date`, to the millisecond.
#[must_use]
pub fn day_window(date: NaiveDate) -> RaceWindow {
    let since = date.and_time(NaiveTime::MIN).and_utc();
    let until = since + Duration::days(1) - Duration::milliseconds(1);

    RaceWindow {
        since: Some(since),
        until: Some(until),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use raceticket_core::OddsItemId;

    fn item(key: [i32; 3], odds: f64) -> OddsItem {
        OddsItem {
            id: OddsItemId::new(),
            odds_type: "trifecta".to_string(),
            key: key.to_vec(),
            odds,
        }
    }

    #[test]
    fn test_rank_odds_ties_break_on_key() {
        let ranked = rank_odds(vec![
            item([3, 1, 2], 5.0),
            item([1, 2, 3], 12.5),
            item([2, 1, 3], 5.0),
        ]);

        let keys: Vec<_> = ranked.iter().map(|o| o.key.clone()).collect();
        assert_eq!(keys, vec![vec![2, 1, 3], vec![3, 1, 2], vec![1, 2, 3]]);
    }

    #[test]
    fn test_day_window() {
        let window = day_window(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());

        assert_eq!(
            window.since,
            Some(Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap())
        );
        let until = window.until.unwrap();
        assert_eq!(until.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert!(!window.contains(Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()));
    }

    proptest! {
        #[test]
        fn prop_rank_odds_is_sorted_permutation(
            raw in proptest::collection::vec((1i32..=6, 1i32..=6, 1i32..=6, 10u32..=500), 0..40)
        ) {
            let odds: Vec<OddsItem> = raw
                .iter()
                .map(|(a, b, c, tenths)| item([*a, *b, *c], f64::from(*tenths) / 10.0))
                .collect();

            let ranked = rank_odds(odds.clone());
            prop_assert_eq!(ranked.len(), odds.len());
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].odds <= pair[1].odds);
                if (pair[0].odds - pair[1].odds).abs() < f64::EPSILON {
                    prop_assert!(pair[0].key <= pair[1].key);
                }
            }
        }
    }
}
