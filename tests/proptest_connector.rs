//! Property-Based Tests - Connector Invariants
//!
//! Uses `proptest` to check reconnect delay bounds, drop accounting of
//! the event channel, and decoder robustness across random inputs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;

use mev_shield_connector::config::BackpressurePolicy;
use mev_shield_connector::domain::{BackoffPolicy, Category, Decoder, RawRecord};
use mev_shield_connector::usecases::{PushOutcome, event_channel};
use mev_shield_connector::{ConnectorEvent, Opportunity};

fn numbered(n: usize) -> ConnectorEvent {
    ConnectorEvent::Opportunity(Arc::new(Opportunity::new(
        n.to_string(),
        Category::Other,
        Decimal::ZERO,
        RawRecord::new(),
        Instant::now(),
    )))
}

// ── Backoff Properties ──────────────────────────────────────

proptest! {
    /// Every delay stays within the cap plus the jitter band.
    #[test]
    fn backoff_delay_bounded(
        base_ms in 1u64..2_000,
        cap_ms in 1u64..120_000,
        attempt in 0u32..64,
        seed in any::<u64>(),
    ) {
        let policy = BackoffPolicy::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms));
        let mut rng = StdRng::seed_from_u64(seed);
        let delay = policy.delay(attempt, &mut rng);

        prop_assert!(delay >= policy.ceiling(attempt));
        prop_assert!(
            delay <= policy.cap() + policy.max_jitter(),
            "delay {delay:?} above cap {:?} + jitter", policy.cap()
        );
    }

    /// Un-jittered ceilings never shrink as attempts grow.
    #[test]
    fn backoff_ceiling_monotone(
        base_ms in 1u64..2_000,
        cap_ms in 1u64..120_000,
        attempt in 0u32..63,
    ) {
        let policy = BackoffPolicy::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms));
        prop_assert!(policy.ceiling(attempt + 1) >= policy.ceiling(attempt));
    }

    /// Jittered delays grow from one attempt to the next until the cap
    /// starts clamping.
    #[test]
    fn backoff_delay_grows_before_cap(
        base_ms in 1u64..500,
        attempt in 0u32..8,
        seed in any::<u64>(),
    ) {
        let policy = BackoffPolicy::new(Duration::from_millis(base_ms), Duration::from_secs(600));
        prop_assume!(policy.ceiling(attempt) * 2 <= policy.cap());

        let mut rng = StdRng::seed_from_u64(seed);
        let current = policy.delay(attempt, &mut rng);
        let next = policy.delay(attempt + 1, &mut rng);
        prop_assert!(next >= current, "attempt {attempt}: {next:?} < {current:?}");
    }
}

// ── Event Channel Properties ────────────────────────────────

proptest! {
    /// Pushing C+k events into a drop-oldest channel of capacity C with
    /// no consumer yields the last C events in order followed by one
    /// drop marker carrying k.
    #[test]
    fn drop_oldest_keeps_newest(capacity in 1usize..16, overflow in 0usize..32) {
        let (tx, mut rx) = event_channel(capacity, BackpressurePolicy::DropOldest, Duration::from_millis(1));

        let total = capacity + overflow;
        let mut evicted = 0usize;
        for n in 0..total {
            let outcome = tokio_test::block_on(tx.push(numbered(n)));
            if outcome == PushOutcome::Evicted {
                evicted += 1;
            }
        }
        prop_assert_eq!(evicted, overflow);

        for n in overflow..total {
            let event = rx.try_recv().unwrap().unwrap();
            let expected = n.to_string();
            prop_assert_eq!(event.as_opportunity().map(|o| o.id()), Some(expected.as_str()));
        }
        if overflow > 0 {
            prop_assert_eq!(
                rx.try_recv().unwrap(),
                Some(ConnectorEvent::Dropped { count: overflow as u64 })
            );
        }
        prop_assert_eq!(rx.try_recv().unwrap(), None);
    }

    /// Gap markers survive any amount of eviction.
    #[test]
    fn drop_oldest_never_evicts_gap(capacity in 2usize..8, overflow in 1usize..24) {
        let (tx, mut rx) = event_channel(capacity, BackpressurePolicy::DropOldest, Duration::from_millis(1));

        tokio_test::block_on(tx.push(ConnectorEvent::Gap { disconnected_for: Duration::from_secs(1) }));
        for n in 0..capacity - 1 + overflow {
            tokio_test::block_on(tx.push(numbered(n)));
        }

        let first = rx.try_recv().unwrap().unwrap();
        prop_assert!(first.is_gap());
    }
}

// ── Decoder Properties ──────────────────────────────────────

proptest! {
    /// Arbitrary bytes never panic the decoder.
    #[test]
    fn decoder_total_on_garbage(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let decoder = Decoder::new();
        let _ = decoder.decode(&bytes);
        let _ = decoder.decode_batch(&bytes);
        let _ = decoder.decode_status(&bytes, Duration::ZERO);
    }

    /// Non-negative profits given as strings keep their exact value.
    #[test]
    fn decoder_profit_exact(units in 0i64..1_000_000_000, scale in 0u32..18) {
        let expected = Decimal::new(units, scale);
        let frame = format!(r#"{{"id":"p","type":"arbitrage","profit_eth":"{expected}"}}"#);

        let opportunity = Decoder::new().decode(frame.as_bytes()).unwrap();
        prop_assert_eq!(opportunity.estimated_profit(), expected);
        prop_assert_eq!(opportunity.category(), Category::Arbitrage);
    }
}
