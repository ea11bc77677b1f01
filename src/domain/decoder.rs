//! Payload Decoder - Raw Frames to Typed Values
//!
//! Stateless and pure: the supervisor calls `decode` per frame and the
//! status poller calls `decode_status` per poll. A failure rejects only
//! the payload at hand.
//!
//! Wire conventions (all optional apart from being a JSON object):
//! - category from `type`, falling back to `category`
//! - profit from `profit_eth`, `estimated_profit_eth`, then `profit`,
//!   as a JSON number or a numeric string
//! - identifier from `id`, falling back to `opportunity_id`

use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use uuid::Uuid;

use super::opportunity::{Category, Opportunity, RawRecord, StatusSnapshot};
use crate::error::DecodeError;

const CATEGORY_FIELDS: [&str; 2] = ["type", "category"];
const PROFIT_FIELDS: [&str; 3] = ["profit_eth", "estimated_profit_eth", "profit"];
const ID_FIELDS: [&str; 2] = ["id", "opportunity_id"];
const BATCH_FIELD: &str = "active_opportunities";

/// Magnitudes below half of `Decimal`'s smallest step round to zero.
const ROUNDS_TO_ZERO: f64 = 5e-29;
/// `Decimal::MAX` as a float; anything at or above is out of range.
const DECIMAL_MAX_F64: f64 = 7.922_816_251_426_434e28;
/// Finest scale `Decimal` supports.
const MAX_SCALE: u32 = 28;

/// Why a profit value could not become a `Decimal`.
enum AmountError {
    NotNumeric,
    OutOfRange,
}

/// Turns raw payloads into [`Opportunity`] and [`StatusSnapshot`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    pub const fn new() -> Self {
        Self
    }

    /// Decode one pushed frame into an opportunity.
    pub fn decode(&self, raw: &[u8]) -> Result<Opportunity, DecodeError> {
        let value: Value = serde_json::from_slice(raw)?;
        self.opportunity_from_value(value, Instant::now())
    }

    /// Decode a status response. Any JSON object is accepted.
    pub fn decode_status(&self, raw: &[u8], latency: Duration) -> Result<StatusSnapshot, DecodeError> {
        let value: Value = serde_json::from_slice(raw)?;
        let fields = into_record(value)?;
        Ok(StatusSnapshot::new(fields, latency, Utc::now()))
    }

    /// Decode an opportunity snapshot response.
    ///
    /// Accepts either a top-level array or an object carrying an
    /// `active_opportunities` array. Each entry decodes independently.
    pub fn decode_batch(&self, raw: &[u8]) -> Result<Vec<Result<Opportunity, DecodeError>>, DecodeError> {
        let value: Value = serde_json::from_slice(raw)?;
        let entries = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove(BATCH_FIELD) {
                Some(Value::Array(items)) => items,
                Some(other) => return Err(DecodeError::NotAnObject(kind(&other))),
                None => Vec::new(),
            },
            other => return Err(DecodeError::NotAnObject(kind(&other))),
        };

        let now = Instant::now();
        Ok(entries
            .into_iter()
            .map(|entry| self.opportunity_from_value(entry, now))
            .collect())
    }

    fn opportunity_from_value(&self, value: Value, received_at: Instant) -> Result<Opportunity, DecodeError> {
        let record = into_record(value)?;

        let category = CATEGORY_FIELDS
            .iter()
            .find_map(|f| record.get(*f).and_then(Value::as_str))
            .map_or(Category::Other, Category::from_tag);

        let estimated_profit = parse_profit(&record)?.unwrap_or(Decimal::ZERO);

        let id = ID_FIELDS
            .iter()
            .find_map(|f| match record.get(*f) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Opportunity::new(id, category, estimated_profit, record, received_at))
    }
}

/// First present profit field, validated as a non-negative decimal.
fn parse_profit(record: &RawRecord) -> Result<Option<Decimal>, DecodeError> {
    let Some((field, value)) = PROFIT_FIELDS
        .iter()
        .find_map(|f| record.get(*f).map(|v| (*f, v)))
    else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => parse_amount(&n.to_string(), n.as_f64()),
        Value::String(s) => {
            let s = s.trim();
            parse_amount(s, s.parse::<f64>().ok())
        }
        _ => Err(AmountError::NotNumeric),
    };

    let amount = parsed.map_err(|e| match e {
        AmountError::NotNumeric => DecodeError::InvalidProfit {
            field,
            value: value.to_string(),
        },
        AmountError::OutOfRange => DecodeError::ProfitOutOfRange {
            field,
            value: value.to_string(),
        },
    })?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DecodeError::NegativeProfit(amount));
    }
    Ok(Some(amount))
}

/// Exact decimal text first, then the float reading of the same value.
///
/// Numbers and numeric strings go through the same path, so `1e-400`
/// decodes to zero either way.
fn parse_amount(text: &str, approx: Option<f64>) -> Result<Decimal, AmountError> {
    if let Some(exact) = parse_decimal(text) {
        return Ok(exact);
    }

    let f = approx
        .filter(|f| f.is_finite())
        .ok_or(AmountError::NotNumeric)?;
    if f.abs() < ROUNDS_TO_ZERO {
        return Ok(Decimal::ZERO);
    }
    if f.abs() >= DECIMAL_MAX_F64 {
        return Err(AmountError::OutOfRange);
    }
    Decimal::from_f64(f)
        .map(|d| d.round_dp(MAX_SCALE))
        .ok_or(AmountError::OutOfRange)
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn into_record(value: Value) -> Result<RawRecord, DecodeError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject(kind(&other))),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_full_opportunity() {
        let raw = br#"{"id":"op-1","type":"arbitrage","profit_eth":0.12,"tokens":["WETH","DAI"]}"#;
        let opp = Decoder::new().decode(raw).unwrap();
        assert_eq!(opp.id(), "op-1");
        assert_eq!(opp.category(), Category::Arbitrage);
        assert_eq!(opp.estimated_profit(), dec!(0.12));
        assert!(opp.raw().contains_key("tokens"));
    }

    #[test]
    fn test_unknown_category_is_other() {
        let opp = Decoder::new().decode(br#"{"id":"x","type":"backrun"}"#).unwrap();
        assert_eq!(opp.category(), Category::Other);
        assert_eq!(opp.raw()["type"], "backrun");
    }

    #[test]
    fn test_profit_from_fallback_field_and_string() {
        let opp = Decoder::new()
            .decode(br#"{"type":"liquidation","estimated_profit_eth":"0.08"}"#)
            .unwrap();
        assert_eq!(opp.estimated_profit(), dec!(0.08));
    }

    #[test]
    fn test_missing_profit_defaults_to_zero() {
        let opp = Decoder::new().decode(br#"{"type":"sandwich"}"#).unwrap();
        assert_eq!(opp.estimated_profit(), Decimal::ZERO);
    }

    #[test]
    fn test_negative_profit_rejected() {
        let err = Decoder::new()
            .decode(br#"{"type":"arbitrage","profit_eth":-0.5}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::NegativeProfit(_)));
    }

    #[test]
    fn test_non_numeric_profit_rejected() {
        let err = Decoder::new()
            .decode(br#"{"type":"arbitrage","profit_eth":"lots"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidProfit { field: "profit_eth", .. }));

        let err = Decoder::new()
            .decode(br#"{"profit_eth":true}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidProfit { .. }));
    }

    #[test]
    fn test_tiny_profit_rounds_to_zero() {
        let decoder = Decoder::new();
        for raw in [
            &br#"{"profit_eth":1.5e-30}"#[..],
            br#"{"profit_eth":1e-400}"#,
            br#"{"profit_eth":"1e-400"}"#,
            br#"{"profit_eth":"1.5e-30"}"#,
        ] {
            let opp = decoder.decode(raw).unwrap();
            assert_eq!(opp.estimated_profit(), Decimal::ZERO, "{}", String::from_utf8_lossy(raw));
        }
    }

    #[test]
    fn test_inexact_float_profit_accepted() {
        let opp = Decoder::new()
            .decode(br#"{"profit_eth":1.2345678901234567e-20}"#)
            .unwrap();
        assert!(opp.estimated_profit() > Decimal::ZERO);
        assert!(opp.estimated_profit() < dec!(0.0000000000000000001));
    }

    #[test]
    fn test_huge_profit_out_of_range() {
        let decoder = Decoder::new();
        let err = decoder
            .decode(br#"{"profit_eth":123456789012345678901234567890123}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::ProfitOutOfRange { field: "profit_eth", .. }));

        let err = decoder.decode(br#"{"profit":"1e40"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::ProfitOutOfRange { field: "profit", .. }));
    }

    #[test]
    fn test_non_finite_strings_not_numeric() {
        let decoder = Decoder::new();
        for raw in [&br#"{"profit_eth":"inf"}"#[..], br#"{"profit_eth":"NaN"}"#] {
            assert!(matches!(decoder.decode(raw), Err(DecodeError::InvalidProfit { .. })));
        }
    }

    #[test]
    fn test_garbage_and_non_objects_rejected() {
        let decoder = Decoder::new();
        assert!(matches!(decoder.decode(b"not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decoder.decode(b"[1,2]"), Err(DecodeError::NotAnObject("array"))));
    }

    #[test]
    fn test_missing_id_gets_unique_uuid() {
        let decoder = Decoder::new();
        let a = decoder.decode(br#"{"type":"arbitrage"}"#).unwrap();
        let b = decoder.decode(br#"{"type":"arbitrage"}"#).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        let opp = Decoder::new().decode(br#"{"opportunity_id":42}"#).unwrap();
        assert_eq!(opp.id(), "42");
    }

    #[test]
    fn test_decode_status_keeps_fields() {
        let raw = br#"{"status":"healthy","service":"mev_shield","version":"1.0.0"}"#;
        let snap = Decoder::new()
            .decode_status(raw, Duration::from_millis(3))
            .unwrap();
        assert_eq!(snap.field_str("service"), Some("mev_shield"));
        assert_eq!(snap.latency(), Duration::from_millis(3));
    }

    #[test]
    fn test_decode_batch_wrapped_and_bare() {
        let decoder = Decoder::new();
        let wrapped = br#"{"active_opportunities":[
            {"type":"arbitrage","estimated_profit_eth":0.12},
            {"type":"liquidation","estimated_profit_eth":-1}
        ]}"#;
        let items = decoder.decode_batch(wrapped).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());

        let bare = br#"[{"type":"sandwich"}]"#;
        assert_eq!(decoder.decode_batch(bare).unwrap().len(), 1);

        assert!(decoder.decode_batch(b"{}").unwrap().is_empty());
        assert!(decoder.decode_batch(b"3").is_err());
    }
}
