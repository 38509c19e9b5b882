//! Derived metrics: scaled certificate price, implied physical price, spread.
//!
//! The physical gram price is implied from the ounce benchmark and the
//! exchange rate with the troy-ounce constant. The certificate trades in a
//! fractional-gram unit on some feeds; a single look at its most recent raw
//! value decides whether the whole series is rescaled.

use crate::config::{CalculatorConfig, InstrumentConfig};
use crate::data::{align_forward_filled, DataError, DataSource, PriceSeries};
use crate::table::{TimeSeriesPoint, TimeSeriesTable};
use std::collections::HashMap;
use tracing::debug;

/// Grams per troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

/// Implied physical price per gram.
pub fn physical_price(ounce_price: f64, exchange_rate: f64) -> f64 {
    (ounce_price * exchange_rate) / TROY_OUNCE_GRAMS
}

/// The three raw inputs, by role.
#[derive(Debug, Clone, Copy)]
pub struct CalculatorInputs<'a> {
    pub benchmark: &'a PriceSeries,
    pub fx: &'a PriceSeries,
    pub certificate: &'a PriceSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetricsCalculator {
    min_aligned_rows: usize,
    unit_threshold: f64,
    unit_multiplier: f64,
}

impl Default for DerivedMetricsCalculator {
    fn default() -> Self {
        Self::new(&CalculatorConfig::default())
    }
}

impl DerivedMetricsCalculator {
    pub fn new(config: &CalculatorConfig) -> Self {
        Self {
            min_aligned_rows: config.min_aligned_rows,
            unit_threshold: config.unit_threshold,
            unit_multiplier: config.unit_multiplier,
        }
    }

    pub fn min_aligned_rows(&self) -> usize {
        self.min_aligned_rows
    }

    /// Scale factor for the certificate series, decided from its most recent
    /// raw value only. An outlier last print misscales the whole series.
    pub fn certificate_scale(&self, last_raw: f64) -> f64 {
        if last_raw < self.unit_threshold {
            self.unit_multiplier
        } else {
            1.0
        }
    }

    /// Align the three series and derive one point per aligned row.
    ///
    /// Values pass through unchecked; only emptiness and the aligned-row
    /// minimum are enforced.
    pub fn compute(&self, inputs: CalculatorInputs<'_>) -> Result<TimeSeriesTable, DataError> {
        let rows = align_forward_filled(&[inputs.benchmark, inputs.fx, inputs.certificate]);
        if rows.len() < self.min_aligned_rows {
            return Err(DataError::InsufficientData {
                aligned: rows.len(),
                required: self.min_aligned_rows,
            });
        }

        let (ounce, fx, cert) = (&rows.columns[0], &rows.columns[1], &rows.columns[2]);
        let last_raw = cert.last().copied().ok_or(DataError::InsufficientData {
            aligned: 0,
            required: self.min_aligned_rows,
        })?;
        let scale = self.certificate_scale(last_raw);
        debug!(rows = rows.len(), last_raw, scale, "deriving metrics");

        let points = rows
            .timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| {
                TimeSeriesPoint::from_prices(ts, cert[i] * scale, physical_price(ounce[i], fx[i]))
            })
            .collect();

        Ok(TimeSeriesTable::from_ordered(points, DataSource::Upstream))
    }

    /// Look the three roles up by ticker in a fetch result.
    pub fn compute_from_map(
        &self,
        series: &HashMap<String, PriceSeries>,
        instruments: &InstrumentConfig,
    ) -> Result<TimeSeriesTable, DataError> {
        let get = |ticker: &str| {
            series
                .get(ticker)
                .ok_or_else(|| DataError::unavailable(format!("no series for {ticker}")))
        };
        self.compute(CalculatorInputs {
            benchmark: get(&instruments.benchmark)?,
            fx: get(&instruments.fx)?,
            certificate: get(&instruments.certificate)?,
        })
    }
}
