//! The time-indexed spread table handed to the presentation layer.
//!
//! A `TimeSeriesTable` is never empty and its timestamps are strictly
//! ascending. Tables are immutable once built: trimming and tailing return
//! new tables, and the cache shares them behind `Arc`.

use crate::data::DataSource;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of the output table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub certificate_price: f64,
    pub physical_price: f64,
    pub spread: f64,
}

impl TimeSeriesPoint {
    /// Build a point from two prices; the spread is `physical - certificate`.
    pub fn from_prices(timestamp: DateTime<Utc>, certificate_price: f64, physical_price: f64) -> Self {
        Self {
            timestamp,
            certificate_price,
            physical_price,
            spread: physical_price - certificate_price,
        }
    }

    /// Build a point from a certificate price and a spread; the physical
    /// price is `certificate + spread`.
    pub fn from_spread(timestamp: DateTime<Utc>, certificate_price: f64, spread: f64) -> Self {
        Self {
            timestamp,
            certificate_price,
            physical_price: certificate_price + spread,
            spread,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("table has no points")]
    Empty,

    #[error("timestamps must be strictly ascending (violated at row {index})")]
    NotAscending { index: usize },
}

/// Ordered, non-empty sequence of `TimeSeriesPoint`s.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    points: Vec<TimeSeriesPoint>,
    source: DataSource,
}

impl TimeSeriesTable {
    /// Validate and wrap a sequence of points.
    pub fn new(points: Vec<TimeSeriesPoint>, source: DataSource) -> Result<Self, TableError> {
        if points.is_empty() {
            return Err(TableError::Empty);
        }
        if let Some(i) = points
            .windows(2)
            .position(|w| w[0].timestamp >= w[1].timestamp)
        {
            return Err(TableError::NotAscending { index: i + 1 });
        }
        Ok(Self { points, source })
    }

    /// Wrap points the caller built from an ordered timestamp axis.
    pub(crate) fn from_ordered(points: Vec<TimeSeriesPoint>, source: DataSource) -> Self {
        debug_assert!(!points.is_empty());
        debug_assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self { points, source }
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed table; kept for the `len` convention.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &TimeSeriesPoint {
        &self.points[0]
    }

    pub fn last(&self) -> &TimeSeriesPoint {
        &self.points[self.points.len() - 1]
    }

    /// Where the rows came from. Used for logging and tests, never shown to users.
    pub fn source(&self) -> DataSource {
        self.source
    }

    /// Keep only points with `timestamp >= last_timestamp - window`.
    ///
    /// The last point always survives, so the result is never empty; if the
    /// filter somehow removes everything the original table is returned.
    pub fn trimmed(&self, window: TimeDelta) -> TimeSeriesTable {
        let cutoff = self.last().timestamp - window;
        let kept: Vec<TimeSeriesPoint> = self
            .points
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .copied()
            .collect();
        if kept.is_empty() {
            return self.clone();
        }
        Self {
            points: kept,
            source: self.source,
        }
    }

    /// The last `n` points (at least one).
    pub fn tail(&self, n: usize) -> TimeSeriesTable {
        let n = n.clamp(1, self.points.len());
        Self {
            points: self.points[self.points.len() - n..].to_vec(),
            source: self.source,
        }
    }

    /// BLAKE3 over every timestamp and value, in row order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for p in &self.points {
            hasher.update(&p.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(&p.certificate_price.to_le_bytes());
            hasher.update(&p.physical_price.to_le_bytes());
            hasher.update(&p.spread.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
