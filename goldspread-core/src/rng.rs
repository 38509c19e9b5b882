//! Deterministic seed derivation for the synthetic fallback.
//!
//! A master seed is expanded into per-(window, time bucket) sub-seeds via
//! BLAKE3. Every refresh inside the same bucket reproduces the same synthetic
//! table; once the bucket advances the series drifts visibly.

use chrono::{DateTime, Utc};

/// Index of the `bucket_secs`-wide bucket containing `at`.
pub fn time_bucket(at: DateTime<Utc>, bucket_secs: u64) -> i64 {
    let width = bucket_secs.max(1) as i64;
    at.timestamp().div_euclid(width)
}

/// First instant of a bucket.
pub fn bucket_start(bucket: i64, bucket_secs: u64) -> DateTime<Utc> {
    let width = bucket_secs.max(1) as i64;
    DateTime::from_timestamp(bucket.saturating_mul(width), 0).unwrap_or_default()
}

/// Hash-based seed hierarchy.
///
/// Derivation depends only on its inputs, never on call order, so two
/// services with the same master seed agree on every sub-seed.
#[derive(Debug, Clone)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Sub-seed for a window code inside one time bucket.
    pub fn sub_seed(&self, window: &str, bucket: i64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(window.as_bytes());
        hasher.update(&bucket.to_le_bytes());
        let hash = hasher.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(word)
    }
}
