//! Raw tabular responses and column extraction.
//!
//! Upstream tables come in exactly two shapes: flat columns named by field
//! (single-ticker downloads) or two-level columns keyed by a pair whose
//! order is either (field, ticker) or (ticker, field). `ColumnSet` makes
//! that a closed set, and `extract_column` resolves a (field, ticker)
//! request against it in a fixed order:
//!
//! 1. Flat: first column named `field` (duplicates resolve to the first).
//! 2. Two-level: exact `(field, ticker)`, then exact `(ticker, field)`.
//! 3. Two-level: first key with `field` as either component.

use super::provider::DataError;
use chrono::{DateTime, Utc};

/// One cell of a raw table. Integers are coerced to `f64` on extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawCell {
    Float(f64),
    Int(i64),
    Null,
}

impl RawCell {
    /// Numeric value, or `None` for missing cells (null or NaN).
    pub fn as_f64(self) -> Option<f64> {
        match self {
            RawCell::Float(v) if v.is_nan() => None,
            RawCell::Float(v) => Some(v),
            RawCell::Int(v) => Some(v as f64),
            RawCell::Null => None,
        }
    }
}

impl From<f64> for RawCell {
    fn from(v: f64) -> Self {
        RawCell::Float(v)
    }
}

impl From<i64> for RawCell {
    fn from(v: i64) -> Self {
        RawCell::Int(v)
    }
}

impl From<Option<f64>> for RawCell {
    fn from(v: Option<f64>) -> Self {
        v.map_or(RawCell::Null, RawCell::Float)
    }
}

/// The two recognized column layouts.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSet {
    Flat(Vec<(String, Vec<RawCell>)>),
    Hierarchical(Vec<((String, String), Vec<RawCell>)>),
}

impl ColumnSet {
    fn is_empty(&self) -> bool {
        match self {
            ColumnSet::Flat(cols) => cols.is_empty(),
            ColumnSet::Hierarchical(cols) => cols.is_empty(),
        }
    }
}

/// A timestamp-indexed table as returned by an upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    index: Vec<DateTime<Utc>>,
    columns: ColumnSet,
}

impl RawFrame {
    /// Frame with flat, field-named columns.
    pub fn flat(
        index: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<RawCell>)>,
    ) -> Result<Self, DataError> {
        Self::checked(index, ColumnSet::Flat(columns))
    }

    /// Frame with two-level column keys.
    pub fn hierarchical(
        index: Vec<DateTime<Utc>>,
        columns: Vec<((String, String), Vec<RawCell>)>,
    ) -> Result<Self, DataError> {
        Self::checked(index, ColumnSet::Hierarchical(columns))
    }

    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: ColumnSet::Flat(Vec::new()),
        }
    }

    fn checked(index: Vec<DateTime<Utc>>, columns: ColumnSet) -> Result<Self, DataError> {
        let n = index.len();
        let lengths: Vec<usize> = match &columns {
            ColumnSet::Flat(cols) => cols.iter().map(|(_, v)| v.len()).collect(),
            ColumnSet::Hierarchical(cols) => cols.iter().map(|(_, v)| v.len()).collect(),
        };
        if let Some(bad) = lengths.iter().find(|&&len| len != n) {
            return Err(DataError::unavailable(format!(
                "malformed frame: column has {bad} cells, index has {n}"
            )));
        }
        Ok(Self { index, columns })
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    /// No rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    pub fn extract(&self, field: &str, ticker: &str) -> Result<PriceSeries, DataError> {
        extract_column(self, field, ticker)
    }
}

/// A single numeric series keyed by timestamp, missing cells dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<(DateTime<Utc>, f64)>,
}

impl PriceSeries {
    /// Build from points; they are sorted by timestamp and later duplicates
    /// of a timestamp are dropped.
    pub fn new(mut points: Vec<(DateTime<Utc>, f64)>) -> Self {
        points.sort_by_key(|(ts, _)| *ts);
        points.dedup_by_key(|(ts, _)| *ts);
        Self { points }
    }

    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|(_, v)| *v)
    }
}

/// Resolve `(field, ticker)` against a raw frame.
///
/// Fails with `DataUnavailable` for an empty frame or when no column matches
/// after every resolution step. Never interpolates: null and NaN cells are
/// simply absent from the result.
pub fn extract_column(frame: &RawFrame, field: &str, ticker: &str) -> Result<PriceSeries, DataError> {
    if frame.is_empty() {
        return Err(DataError::unavailable("upstream returned an empty table"));
    }

    let cells = match &frame.columns {
        ColumnSet::Flat(cols) => cols
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, cells)| cells),
        ColumnSet::Hierarchical(cols) => {
            let exact = |a: &str, b: &str| {
                cols.iter()
                    .find(|((l0, l1), _)| l0 == a && l1 == b)
                    .map(|(_, cells)| cells)
            };
            exact(field, ticker)
                .or_else(|| exact(ticker, field))
                .or_else(|| {
                    cols.iter()
                        .find(|((l0, l1), _)| l0 == field || l1 == field)
                        .map(|(_, cells)| cells)
                })
        }
    };

    let cells = cells.ok_or_else(|| {
        DataError::unavailable(format!("no '{field}' column for {ticker} in upstream table"))
    })?;

    let points = frame
        .index
        .iter()
        .zip(cells.iter())
        .filter_map(|(ts, cell)| cell.as_f64().map(|v| (*ts, v)))
        .collect();
    Ok(PriceSeries::new(points))
}
