//! Batched market data fetching.
//!
//! One `download` call per `fetch`, whatever the number of tickers; the
//! upstream rate-limits per call. Each ticker's close series is then pulled
//! out of the shared frame by the column extractor.

use super::frame::{extract_column, PriceSeries};
use super::provider::{DataError, MarketDataSource};
use super::yahoo::CLOSE_FIELD;
use std::collections::HashMap;
use tracing::debug;

pub struct MarketDataFetcher<S> {
    source: S,
    field: String,
}

impl<S: MarketDataSource> MarketDataFetcher<S> {
    /// Fetcher that extracts the close price.
    pub fn new(source: S) -> Self {
        Self::with_field(source, CLOSE_FIELD)
    }

    pub fn with_field(source: S, field: impl Into<String>) -> Self {
        Self {
            source,
            field: field.into(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every ticker over `period` at `interval`.
    ///
    /// Duplicate tickers are requested once. Any upstream fault, an empty
    /// response, or a ticker with no matching column fails the whole fetch
    /// with `DataUnavailable`; no retries.
    pub fn fetch(
        &self,
        tickers: &[&str],
        period: &str,
        interval: &str,
    ) -> Result<HashMap<String, PriceSeries>, DataError> {
        let mut unique: Vec<&str> = Vec::with_capacity(tickers.len());
        for &t in tickers {
            if !unique.contains(&t) {
                unique.push(t);
            }
        }
        if unique.is_empty() {
            return Err(DataError::unavailable("no tickers requested"));
        }

        let frame = self.source.download(&unique, period, interval)?;
        if frame.is_empty() {
            return Err(DataError::unavailable(format!(
                "{} returned no rows for {}",
                self.source.name(),
                unique.join(",")
            )));
        }

        let mut out = HashMap::with_capacity(unique.len());
        for ticker in unique {
            let series = extract_column(&frame, &self.field, ticker)?;
            debug!(ticker, points = series.len(), "extracted series");
            out.insert(ticker.to_string(), series);
        }
        Ok(out)
    }
}
