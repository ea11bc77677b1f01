//! Opportunity and status value types.
//!
//! Everything here is immutable after construction: fields are private
//! and exposed through accessors, and events share values through `Arc`
//! so a consumer can hand them to other tasks without copying.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque JSON record as received from the wire.
pub type RawRecord = Map<String, Value>;

/// Kind of MEV opportunity reported by the service.
///
/// Unknown wire tags map to `Other` so new server-side categories
/// never break older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Arbitrage,
    Liquidation,
    Sandwich,
    Other,
}

impl Category {
    /// Map a wire tag onto the enumeration (case-insensitive).
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "arbitrage" | "arb" => Self::Arbitrage,
            "liquidation" => Self::Liquidation,
            "sandwich" => Self::Sandwich,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arbitrage => write!(f, "arbitrage"),
            Self::Liquidation => write!(f, "liquidation"),
            Self::Sandwich => write!(f, "sandwich"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A decoded, time-sensitive opportunity.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    id: String,
    category: Category,
    estimated_profit: Decimal,
    raw: RawRecord,
    received_at: Instant,
}

impl Opportunity {
    /// Build an opportunity. `received_at` is assigned by the client,
    /// never taken from the payload.
    pub const fn new(
        id: String,
        category: Category,
        estimated_profit: Decimal,
        raw: RawRecord,
        received_at: Instant,
    ) -> Self {
        Self {
            id,
            category,
            estimated_profit,
            raw,
            received_at,
        }
    }

    /// Identifier, unique per emission (not across reconnects).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn category(&self) -> Category {
        self.category
    }

    /// Estimated profit in base currency (ETH). Zero when the wire omits it.
    pub const fn estimated_profit(&self) -> Decimal {
        self.estimated_profit
    }

    /// The full original record, including fields this client does not know.
    pub const fn raw(&self) -> &RawRecord {
        &self.raw
    }

    /// Monotonic receive time.
    pub const fn received_at(&self) -> Instant {
        self.received_at
    }
}

/// Server health as observed by one status poll.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    fields: RawRecord,
    latency: Duration,
    fetched_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub const fn new(fields: RawRecord, latency: Duration, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fields,
            latency,
            fetched_at,
        }
    }

    /// Server-reported fields, decoded permissively.
    pub const fn fields(&self) -> &RawRecord {
        &self.fields
    }

    /// Convenience accessor for a string field such as `status`.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Client-observed request round-trip.
    pub const fn latency(&self) -> Duration {
        self.latency
    }

    pub const fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Tagged value delivered to the consumer, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorEvent {
    /// A decoded opportunity.
    Opportunity(Arc<Opportunity>),
    /// The push stream was lost and re-established; events in between are missing.
    Gap { disconnected_for: Duration },
    /// The event channel discarded `count` events since the last marker.
    Dropped { count: u64 },
    /// A successful status poll.
    Status(Arc<StatusSnapshot>),
    /// A status poll failed; streaming is unaffected.
    StatusUnavailable { reason: String },
}

impl ConnectorEvent {
    /// Gap markers are never evicted by the drop-oldest policy.
    pub const fn is_gap(&self) -> bool {
        matches!(self, Self::Gap { .. })
    }

    pub const fn as_opportunity(&self) -> Option<&Arc<Opportunity>> {
        match self {
            Self::Opportunity(o) => Some(o),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_known_tags() {
        assert_eq!(Category::from_tag("arbitrage"), Category::Arbitrage);
        assert_eq!(Category::from_tag("Liquidation"), Category::Liquidation);
        assert_eq!(Category::from_tag(" SANDWICH "), Category::Sandwich);
    }

    #[test]
    fn test_unknown_category_maps_to_other() {
        assert_eq!(Category::from_tag("jit_liquidity"), Category::Other);
        assert_eq!(Category::from_tag(""), Category::Other);
    }

    #[test]
    fn test_status_field_str() {
        let mut fields = RawRecord::new();
        fields.insert("status".into(), Value::from("healthy"));
        fields.insert("uptime_seconds".into(), Value::from(3600));
        let snap = StatusSnapshot::new(fields, Duration::from_millis(4), Utc::now());
        assert_eq!(snap.field_str("status"), Some("healthy"));
        assert_eq!(snap.field_str("uptime_seconds"), None);
    }
}
