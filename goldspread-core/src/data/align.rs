//! Multi-series time alignment.
//!
//! Series sampled on slightly different clocks are joined on the union of
//! their timestamps. Each series is forward-filled from its last observation;
//! rows where any series still has no value (before its first observation)
//! are dropped.

use super::frame::PriceSeries;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Rows where every input series has a value.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRows {
    /// Common timestamp axis, strictly ascending.
    pub timestamps: Vec<DateTime<Utc>>,
    /// One column per input series, in input order; each has `timestamps.len()` values.
    pub columns: Vec<Vec<f64>>,
}

impl AlignedRows {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Align series on the union of their timestamps with forward fill.
pub fn align_forward_filled(series: &[&PriceSeries]) -> AlignedRows {
    let axis: BTreeSet<DateTime<Utc>> = series
        .iter()
        .flat_map(|s| s.points().iter().map(|(ts, _)| *ts))
        .collect();

    // Forward-filled value of every series at every axis timestamp.
    let filled: Vec<Vec<Option<f64>>> = series
        .iter()
        .map(|s| {
            let mut points = s.points().iter().peekable();
            let mut last = None;
            axis.iter()
                .map(|ts| {
                    while let Some((_, v)) = points.next_if(|(p, _)| p <= ts) {
                        last = Some(*v);
                    }
                    last
                })
                .collect()
        })
        .collect();

    let mut timestamps = Vec::with_capacity(axis.len());
    let mut columns = vec![Vec::with_capacity(axis.len()); series.len()];
    for (row, ts) in axis.into_iter().enumerate() {
        let values: Option<Vec<f64>> = filled.iter().map(|col| col[row]).collect();
        if let Some(values) = values {
            timestamps.push(ts);
            for (column, v) in columns.iter_mut().zip(values) {
                column.push(v);
            }
        }
    }

    AlignedRows {
        timestamps,
        columns,
    }
}
