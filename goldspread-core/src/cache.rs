//! Per-window TTL cache in front of a `TableProducer`.
//!
//! One entry per window label, one TTL for all of them. Production runs
//! outside the lock, so two callers racing on the same missing key may both
//! compute; the later insert wins. Tables are shared behind `Arc` and never
//! mutated.

use crate::clock::Clock;
use crate::service::TableProducer;
use crate::table::TimeSeriesTable;
use crate::window::WindowLabel;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub table: Arc<TimeSeriesTable>,
    pub inserted_at: DateTime<Utc>,
    pub ttl: TimeDelta,
}

impl CacheEntry {
    /// Expired strictly after `ttl` has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.inserted_at > self.ttl
    }
}

pub struct WindowCache<P> {
    producer: P,
    entries: Mutex<HashMap<WindowLabel, CacheEntry>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl<P: TableProducer> WindowCache<P> {
    /// Construct once at startup and share.
    pub fn new(producer: P, ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            producer,
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Cached table for `label`, producing a fresh one on miss or expiry.
    pub fn get_or_compute(&self, label: WindowLabel) -> Arc<TimeSeriesTable> {
        let now = self.clock.now();
        {
            let mut entries = self.lock();
            let expired = match entries.get(&label) {
                Some(entry) if !entry.is_expired(now) => {
                    debug!(window = %label, "cache hit");
                    return Arc::clone(&entry.table);
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                entries.remove(&label);
            }
        }

        info!(window = %label, "cache miss, producing table");
        let table = Arc::new(self.producer.produce(label));
        let entry = CacheEntry {
            table: Arc::clone(&table),
            inserted_at: self.clock.now(),
            ttl: self.ttl,
        };
        self.lock().insert(label, entry);
        table
    }

    /// Lenient lookup by raw UI code; unknown codes use the default window.
    pub fn get_or_compute_code(&self, code: &str) -> Arc<TimeSeriesTable> {
        self.get_or_compute(WindowLabel::resolve(code))
    }

    /// Number of stored entries, expired ones included until next lookup.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<WindowLabel, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::data::DataSource;
    use crate::table::TimeSeriesPoint;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a one-point table whose price is the call count.
    struct Counting {
        calls: AtomicUsize,
        clock: Arc<ManualClock>,
    }

    impl TableProducer for Counting {
        fn produce(&self, _label: WindowLabel) -> TimeSeriesTable {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let point = TimeSeriesPoint::from_prices(self.clock.now(), n as f64, n as f64 + 1.0);
            TimeSeriesTable::new(vec![point], DataSource::Synthetic).unwrap()
        }
    }

    fn setup() -> (WindowCache<Counting>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 10, 1, 8, 0, 0).unwrap(),
        ));
        let producer = Counting {
            calls: AtomicUsize::new(0),
            clock: clock.clone(),
        };
        let cache = WindowCache::new(producer, TimeDelta::seconds(60), clock.clone());
        (cache, clock)
    }

    #[test]
    fn hit_within_ttl_shares_the_table() {
        let (cache, clock) = setup();
        let a = cache.get_or_compute(WindowLabel::OneDay);
        clock.advance(TimeDelta::seconds(60));
        let b = cache.get_or_compute(WindowLabel::OneDay);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.producer().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expiry_recomputes() {
        let (cache, clock) = setup();
        let a = cache.get_or_compute(WindowLabel::OneDay);
        clock.advance(TimeDelta::seconds(61));
        let b = cache.get_or_compute(WindowLabel::OneDay);

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.last().certificate_price, 2.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_are_independent() {
        let (cache, _clock) = setup();
        cache.get_or_compute(WindowLabel::OneHour);
        cache.get_or_compute(WindowLabel::OneYear);
        cache.get_or_compute(WindowLabel::OneHour);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.producer().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn codes_resolve_through_the_window_table() {
        let (cache, _clock) = setup();
        assert!(cache.is_empty());
        let a = cache.get_or_compute_code("24S");
        let b = cache.get_or_compute_code("bogus");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn entry_expiry_is_strict() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry {
            table: Arc::new(
                TimeSeriesTable::new(
                    vec![TimeSeriesPoint::from_prices(at, 1.0, 2.0)],
                    DataSource::Upstream,
                )
                .unwrap(),
            ),
            inserted_at: at,
            ttl: TimeDelta::seconds(60),
        };
        assert!(!entry.is_expired(at + TimeDelta::seconds(60)));
        assert!(entry.is_expired(at + TimeDelta::milliseconds(60_001)));
    }
}
