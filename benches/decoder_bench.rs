//! Decoder Benchmarks - Hot-Path Performance Validation
//!
//! Every pushed frame is decoded before it reaches the consumer, and
//! snapshot responses can carry hundreds of entries.
//!
//! Run with: cargo bench --bench decoder_bench

use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use mev_shield_connector::config::BackpressurePolicy;
use mev_shield_connector::domain::{ConnectorEvent, Decoder};
use mev_shield_connector::usecases::event_channel;

const FRAME: &[u8] = br#"{"id":"0x3f9a1c","type":"arbitrage","profit_eth":"0.0421","block":19876543,"pools":["uniswap_v3","sushiswap"],"gas_estimate":210000}"#;

fn bench_decode_frame(c: &mut Criterion) {
    let decoder = Decoder::new();

    c.bench_function("decode_frame", |b| {
        b.iter(|| {
            let _opp = decoder.decode(black_box(FRAME));
        });
    });
}

fn bench_decode_batch(c: &mut Criterion) {
    let decoder = Decoder::new();
    let entries: Vec<&str> = std::iter::repeat_n(std::str::from_utf8(FRAME).unwrap_or("{}"), 200).collect();
    let payload = format!(r#"{{"active_opportunities":[{}]}}"#, entries.join(","));

    c.bench_function("decode_batch_200", |b| {
        b.iter(|| {
            let _batch = decoder.decode_batch(black_box(payload.as_bytes()));
        });
    });
}

fn bench_decode_status(c: &mut Criterion) {
    let decoder = Decoder::new();
    let status = br#"{"status":"ok","connected_relays":4,"uptime_secs":86400,"version":"1.4.2"}"#;

    c.bench_function("decode_status", |b| {
        b.iter(|| {
            let _status = decoder.decode_status(black_box(status), Duration::from_millis(3));
        });
    });
}

/// Push into a full drop-oldest channel (evict path).
fn bench_push_evicting(c: &mut Criterion) {
    let decoder = Decoder::new();
    let Ok(opportunity) = decoder.decode(FRAME) else {
        return;
    };
    let event = ConnectorEvent::Opportunity(std::sync::Arc::new(opportunity));
    let (tx, _rx) = event_channel(64, BackpressurePolicy::DropOldest, Duration::from_millis(1));
    let runtime = tokio::runtime::Builder::new_current_thread().build();
    let Ok(runtime) = runtime else {
        return;
    };

    c.bench_function("push_drop_oldest_full", |b| {
        b.iter(|| {
            runtime.block_on(tx.push(black_box(event.clone())));
        });
    });
}

criterion_group!(
    benches,
    bench_decode_frame,
    bench_decode_batch,
    bench_decode_status,
    bench_push_evicting,
);
criterion_main!(benches);
