//! End-to-end scenarios: window label -> cache -> service -> table.
//!
//! Tests:
//! 1. Every window survives an upstream that always fails
//! 2. Cache hits within the TTL are bit-identical and make no upstream call
//! 3. A live `24S` fetch is trimmed to the last 1440 minutes
//! 4. A network fault yields exactly the seeded synthetic table

mod common;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use common::{live_frame, ScriptedSource};
use goldspread_core::config::SyntheticConfig;
use goldspread_core::rng::{bucket_start, time_bucket, SeedHierarchy};
use goldspread_core::{
    Clock, DataSource, GoldSpreadConfig, ManualClock, ResilientDataService, SimulationRequest,
    SpreadModelConfig, SyntheticGenerator, TableProducer, WindowCache, WindowLabel, WindowSpec,
};
use std::sync::Arc;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 4, 15, 42, 17).unwrap()
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(now()))
}

fn service(
    source: Arc<ScriptedSource>,
    clock: Arc<ManualClock>,
) -> ResilientDataService<Arc<ScriptedSource>> {
    ResilientDataService::new(source, &GoldSpreadConfig::default(), clock)
}

// ──────────────────────────────────────────────
// 1. Fallback for every window
// ──────────────────────────────────────────────

#[test]
fn every_window_falls_back_to_a_conforming_table() {
    let source = Arc::new(ScriptedSource::failing("connection refused"));
    let svc = service(source.clone(), clock());

    for label in WindowLabel::ALL {
        let spec = label.spec();
        let table = svc.produce(label);

        assert!(!table.is_empty(), "{label} produced an empty table");
        assert_eq!(table.source(), DataSource::Synthetic);
        assert!(table.points().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(table.first().timestamp >= table.last().timestamp - spec.trim_duration);
        for p in table.points() {
            assert_eq!(p.physical_price, p.certificate_price + p.spread);
            assert!(p.certificate_price.is_finite() && p.spread.is_finite());
        }
    }

    // One batched attempt per window, never one per ticker.
    assert_eq!(source.calls(), WindowLabel::ALL.len());
    for (tickers, _, _) in source.requests() {
        assert_eq!(tickers, vec!["GC=F", "TRY=X", "ALTIN.IS"]);
    }
}

// ──────────────────────────────────────────────
// 2. Cache
// ──────────────────────────────────────────────

#[test]
fn cache_hit_is_bit_identical_and_skips_upstream() {
    let clock = clock();
    let source = Arc::new(ScriptedSource::ok(live_frame(
        300,
        TimeDelta::minutes(15),
        now(),
    )));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let cache = WindowCache::new(
        service(source.clone(), clock.clone()),
        TimeDelta::seconds(60),
        shared_clock,
    );

    let first = cache.get_or_compute(WindowLabel::OneDay);
    clock.advance(TimeDelta::seconds(45));
    let second = cache.get_or_compute(WindowLabel::OneDay);

    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(source.calls(), 1);

    clock.advance(TimeDelta::seconds(30));
    let _third = cache.get_or_compute(WindowLabel::OneDay);
    assert_eq!(source.calls(), 2);
}

#[test]
fn cached_fallback_may_change_after_expiry() {
    let clock = clock();
    let source = Arc::new(ScriptedSource::failing("timeout"));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let cache = WindowCache::new(
        service(source.clone(), clock.clone()),
        TimeDelta::seconds(60),
        shared_clock,
    );

    let first = cache.get_or_compute(WindowLabel::OneHour);
    clock.advance(TimeDelta::seconds(120));
    let later = cache.get_or_compute(WindowLabel::OneHour);

    assert_eq!(source.calls(), 2);
    assert_ne!(first.fingerprint(), later.fingerprint());
}

// ──────────────────────────────────────────────
// 3. Live 24S trim
// ──────────────────────────────────────────────

#[test]
fn live_day_window_is_trimmed_to_1440_minutes() {
    let spacing = TimeDelta::seconds(1038);
    let frame = live_frame(500, spacing, now());
    let span = frame.index()[499] - frame.index()[0];
    assert!(span > TimeDelta::days(5) && span <= TimeDelta::days(6));

    let source = Arc::new(ScriptedSource::ok(frame));
    let svc = service(source.clone(), clock());
    let spec = WindowSpec::for_code("24S");
    assert_eq!(
        (spec.upstream_period, spec.upstream_interval),
        ("5d", "15m")
    );

    let table = svc.produce_spec(&spec);
    let max_ts = now();
    let expected = (0..500i32)
        .filter(|i| max_ts - spacing * (499 - i) >= max_ts - TimeDelta::minutes(1440))
        .count();

    assert_eq!(table.source(), DataSource::Upstream);
    assert_eq!(table.len(), expected);
    assert_eq!(table.last().timestamp, max_ts);
    assert!(table
        .points()
        .iter()
        .all(|p| p.timestamp >= max_ts - TimeDelta::minutes(1440)));

    let requests = source.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1, "5d");
    assert_eq!(requests[0].2, "15m");
}

// ──────────────────────────────────────────────
// 4. Network fault -> seeded simulation
// ──────────────────────────────────────────────

#[test]
fn network_fault_matches_generator_output() {
    let source = Arc::new(ScriptedSource::failing("dns lookup failed"));
    let svc = service(source, clock());
    let spec = WindowLabel::OneDay.spec();

    let table = svc.produce_spec(&spec);

    let config = GoldSpreadConfig::default();
    let bucket = time_bucket(now(), config.synthetic.seed_bucket_secs);
    let seed = SeedHierarchy::new(config.synthetic.master_seed).sub_seed("24S", bucket);
    let generator = SyntheticGenerator::new(SpreadModelConfig::default(), &SyntheticConfig::default());
    let expected = generator
        .simulate(
            SimulationRequest::new(
                bucket_start(bucket, config.synthetic.seed_bucket_secs),
                spec.trim_duration,
            )
            .with_seed(seed),
        )
        .trimmed(spec.trim_duration);

    assert_eq!(table, expected);
    assert!(table
        .points()
        .iter()
        .all(|p| p.physical_price == p.certificate_price + p.spread));
}
