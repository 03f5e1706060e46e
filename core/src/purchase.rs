//! Ticket purchase and balance charge rules.
//!
//! The request bodies are validated from raw JSON so that a wrongly typed field
//! is a `400` rather than a deserialization failure of some other shape. The
//! checks run in this order on the server: identity, balance, body, race.

use crate::domain::Race;
use crate::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed price of one betting ticket, in points.
pub const TICKET_PRICE: i64 = 100;

/// Largest amount accepted by a single charge, in points.
pub const MAX_CHARGE_AMOUNT: i64 = 1_000_000_000;

/// The only bet type the application sells.
pub const TRIFECTA: &str = "trifecta";

/// A validated purchase request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    /// Entry numbers in predicted finishing order
    pub key: Vec<i32>,
    /// Bet type as sent by the client
    #[serde(rename = "type")]
    pub ticket_type: String,
}

impl TicketRequest {
    /// A trifecta request for the given key.
    #[must_use]
    pub fn trifecta(key: Vec<i32>) -> Self {
        Self {
            key,
            ticket_type: TRIFECTA.to_string(),
        }
    }
}

/// Validates a purchase body: `type` must be a string and `key` an array of
/// integral numbers.
///
/// # Errors
///
/// Returns [`DomainError::InvalidRequest`] when either field has the wrong
/// shape.
pub fn parse_ticket_request(body: &Value) -> Result<TicketRequest, DomainError> {
    let ticket_type = body
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::InvalidRequest("`type` must be a string".to_string()))?;

    let items = body
        .get("key")
        .and_then(Value::as_array)
        .ok_or_else(|| DomainError::InvalidRequest("`key` must be an array".to_string()))?;

    let key = items
        .iter()
        .map(key_number)
        .collect::<Option<Vec<i32>>>()
        .ok_or_else(|| {
            DomainError::InvalidRequest("`key` must contain only entry numbers".to_string())
        })?;

    Ok(TicketRequest {
        key,
        ticket_type: ticket_type.to_string(),
    })
}

fn key_number(value: &Value) -> Option<i32> {
    if let Some(n) = value.as_i64() {
        return i32::try_from(n).ok();
    }
    // Accept `3.0` as 3, reject `2.5`
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX) {
        #[allow(clippy::cast_possible_truncation)]
        return Some(f as i32);
    }
    None
}

/// Checks that `balance` covers one ticket.
///
/// # Errors
///
/// Returns [`DomainError::InsufficientBalance`] when `balance < TICKET_PRICE`.
pub const fn ensure_affordable(balance: i64) -> Result<(), DomainError> {
    if balance < TICKET_PRICE {
        return Err(DomainError::InsufficientBalance {
            balance,
            required: TICKET_PRICE,
        });
    }
    Ok(())
}

/// Checks that ticket sales for `race` are still open at `now`.
///
/// # Errors
///
/// Returns [`DomainError::RaceClosed`] once `closeAt` has passed.
pub fn ensure_race_open(race: &Race, now: DateTime<Utc>) -> Result<(), DomainError> {
    if race.is_closed_at(now) {
        return Err(DomainError::RaceClosed {
            race_id: race.id.to_string(),
        });
    }
    Ok(())
}

/// Validates a charge body: `amount` must be a whole number between 1 and
/// [`MAX_CHARGE_AMOUNT`].
///
/// # Errors
///
/// Returns [`DomainError::InvalidRequest`] for a missing, non-numeric,
/// fractional, non-positive or oversized amount.
pub fn parse_charge_amount(body: &Value) -> Result<i64, DomainError> {
    let invalid = || {
        DomainError::InvalidRequest(format!(
            "`amount` must be an integer between 1 and {MAX_CHARGE_AMOUNT}"
        ))
    };

    let amount = body.get("amount").ok_or_else(invalid)?;
    let amount = match amount.as_i64() {
        Some(n) => n,
        None => {
            let f = amount.as_f64().ok_or_else(invalid)?;
            if f.fract() != 0.0 || f > 9.0e15 {
                return Err(invalid());
            }
            #[allow(clippy::cast_possible_truncation)]
            {
                f as i64
            }
        },
    };

    if !(1..=MAX_CHARGE_AMOUNT).contains(&amount) {
        return Err(invalid());
    }
    Ok(amount)
}

/// Balance left after buying one ticket.
#[must_use]
pub const fn balance_after_purchase(balance: i64) -> i64 {
    balance - TICKET_PRICE
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::RaceId;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_ticket() {
        let request = parse_ticket_request(&json!({"key": [1, 2, 3], "type": "trifecta"})).unwrap();
        assert_eq!(request, TicketRequest::trifecta(vec![1, 2, 3]));
    }

    #[test]
    fn test_parse_accepts_integral_floats() {
        let request = parse_ticket_request(&json!({"key": [1.0, 2, 3], "type": "trifecta"})).unwrap();
        assert_eq!(request.key, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        let cases = [
            json!({"key": [1, 2, 3]}),
            json!({"key": [1, 2, 3], "type": 3}),
            json!({"key": "1-2-3", "type": "trifecta"}),
            json!({"key": [1, "2", 3], "type": "trifecta"}),
            json!({"key": [1, 2.5, 3], "type": "trifecta"}),
            json!({"type": "trifecta"}),
            json!(null),
        ];

        for body in cases {
            assert!(
                matches!(parse_ticket_request(&body), Err(DomainError::InvalidRequest(_))),
                "expected rejection for {body}"
            );
        }
    }

    #[test]
    fn test_ensure_affordable_boundary() {
        assert!(ensure_affordable(100).is_ok());
        assert_eq!(
            ensure_affordable(99),
            Err(DomainError::InsufficientBalance {
                balance: 99,
                required: 100
            })
        );
    }

    #[test]
    fn test_ensure_race_open() {
        let close_at = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let race = Race {
            id: RaceId::new(),
            name: "Final".to_string(),
            image: "/images/races/0.jpg".to_string(),
            start_at: close_at + Duration::minutes(5),
            close_at,
            entries: None,
        };

        assert!(ensure_race_open(&race, close_at).is_ok());
        assert!(matches!(
            ensure_race_open(&race, close_at + Duration::seconds(1)),
            Err(DomainError::RaceClosed { .. })
        ));
    }

    #[test]
    fn test_parse_charge_amount() {
        assert_eq!(parse_charge_amount(&json!({"amount": 500})), Ok(500));
        assert_eq!(parse_charge_amount(&json!({"amount": 500.0})), Ok(500));
        assert!(parse_charge_amount(&json!({"amount": 0})).is_err());
        assert!(parse_charge_amount(&json!({"amount": -10})).is_err());
        assert!(parse_charge_amount(&json!({"amount": 1.5})).is_err());
        assert!(parse_charge_amount(&json!({"amount": "100"})).is_err());
        assert!(parse_charge_amount(&json!({})).is_err());
    }

    #[test]
    fn test_parse_charge_amount_upper_bound() {
        assert_eq!(
            parse_charge_amount(&json!({ "amount": MAX_CHARGE_AMOUNT })),
            Ok(MAX_CHARGE_AMOUNT)
        );
        assert!(parse_charge_amount(&json!({ "amount": MAX_CHARGE_AMOUNT + 1 })).is_err());
        assert!(parse_charge_amount(&json!({ "amount": i64::MAX })).is_err());
        assert!(parse_charge_amount(&json!({ "amount": u64::MAX })).is_err());
        assert!(parse_charge_amount(&json!({ "amount": 1.0e12 })).is_err());
    }

    proptest! {
        #[test]
        fn prop_affordable_iff_balance_covers_price(balance in -1_000i64..10_000) {
            let result = ensure_affordable(balance);
            prop_assert_eq!(result.is_ok(), balance >= TICKET_PRICE);
            if result.is_ok() {
                prop_assert!(balance_after_purchase(balance) >= 0);
            }
        }

        #[test]
        fn prop_integer_keys_always_parse(key in proptest::collection::vec(1i32..=18, 0..6)) {
            let body = json!({"key": key.clone(), "type": TRIFECTA});
            let parsed = parse_ticket_request(&body).unwrap();
            prop_assert_eq!(parsed.key, key);
        }

        #[test]
        fn prop_string_in_key_is_rejected(
            prefix in proptest::collection::vec(1i32..=18, 0..3),
            text in "[a-z]{1,4}",
        ) {
            let mut items: Vec<Value> = prefix.into_iter().map(Value::from).collect();
            items.push(Value::String(text));
            let body = json!({"key": items, "type": TRIFECTA});
            prop_assert!(parse_ticket_request(&body).is_err());
        }
    }
}
