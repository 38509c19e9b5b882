//! Yahoo Finance market data source.
//!
//! Uses the spark endpoint, which answers a comma-separated symbol list in a
//! single HTTP call. The upstream rate-limits per call, so the whole request
//! is one round trip; there are no retries here.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. Any transport, status or decode problem surfaces as
//! `DataUnavailable` and the service falls back to synthetic data.

use super::frame::{RawCell, RawFrame};
use super::provider::{DataError, MarketDataSource};
use crate::config::UpstreamConfig;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Field name the spark response is mapped to.
pub const CLOSE_FIELD: &str = "Close";

/// Yahoo Finance v7 spark API response.
#[derive(Debug, Deserialize)]
struct SparkResponse {
    spark: SparkBody,
}

#[derive(Debug, Deserialize)]
struct SparkBody {
    result: Option<Vec<SparkSymbol>>,
    error: Option<SparkError>,
}

#[derive(Debug, Deserialize)]
struct SparkError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SparkSymbol {
    symbol: String,
    #[serde(default)]
    response: Vec<ChartData>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance data source.
pub struct YahooSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooSource {
    pub fn new(config: &UpstreamConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DataError::unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn spark_url(&self) -> String {
        format!("{}/v7/finance/spark", self.base_url)
    }

    /// Turn a spark response into a ticker-first two-level frame over the
    /// union of every symbol's timestamps.
    fn parse_response(resp: SparkResponse) -> Result<RawFrame, DataError> {
        let symbols = match (resp.spark.result, resp.spark.error) {
            (_, Some(err)) => {
                return Err(DataError::unavailable(format!(
                    "upstream error {}: {}",
                    err.code, err.description
                )))
            }
            (Some(result), None) => result,
            (None, None) => {
                return Err(DataError::unavailable("empty result with no error"));
            }
        };

        let mut axis: BTreeSet<i64> = BTreeSet::new();
        let mut per_symbol: Vec<(String, HashMap<i64, f64>)> = Vec::with_capacity(symbols.len());

        for sym in symbols {
            let mut closes = HashMap::new();
            for chart in sym.response {
                let Some(timestamps) = chart.timestamp else {
                    continue;
                };
                let Some(quote) = chart.indicators.quote.into_iter().next() else {
                    continue;
                };
                for (i, ts) in timestamps.into_iter().enumerate() {
                    if let Some(close) = quote.close.get(i).copied().flatten() {
                        axis.insert(ts);
                        closes.insert(ts, close);
                    }
                }
            }
            per_symbol.push((sym.symbol, closes));
        }

        let secs: Vec<i64> = axis.into_iter().collect();
        let index = secs
            .iter()
            .map(|&ts| {
                DateTime::<Utc>::from_timestamp(ts, 0)
                    .ok_or_else(|| DataError::unavailable(format!("invalid timestamp: {ts}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let columns = per_symbol
            .into_iter()
            .map(|(symbol, closes)| {
                let cells = secs
                    .iter()
                    .map(|ts| RawCell::from(closes.get(ts).copied()))
                    .collect();
                ((symbol, CLOSE_FIELD.to_string()), cells)
            })
            .collect();

        RawFrame::hierarchical(index, columns)
    }
}

impl MarketDataSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn download(
        &self,
        tickers: &[&str],
        period: &str,
        interval: &str,
    ) -> Result<RawFrame, DataError> {
        let symbols = tickers.join(",");
        debug!(%symbols, period, interval, "requesting spark batch");

        let resp = self
            .client
            .get(self.spark_url())
            .query(&[
                ("symbols", symbols.as_str()),
                ("range", period),
                ("interval", interval),
            ])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    DataError::unavailable(format!("upstream timed out: {e}"))
                } else {
                    DataError::unavailable(format!("network error: {e}"))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::unavailable(format!(
                "HTTP {status} for {symbols}"
            )));
        }

        let body: SparkResponse = resp
            .json()
            .map_err(|e| DataError::unavailable(format!("failed to parse spark response: {e}")))?;

        let frame = Self::parse_response(body)?;
        debug!(rows = frame.index().len(), "spark batch decoded");
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::ColumnSet;

    const SAMPLE: &str = r#"{
        "spark": {
            "result": [
                {
                    "symbol": "GC=F",
                    "response": [{
                        "meta": {"currency": "USD", "symbol": "GC=F"},
                        "timestamp": [1717390800, 1717391700, 1717392600],
                        "indicators": {"quote": [{"close": [2350.5, null, 2352.0]}]}
                    }]
                },
                {
                    "symbol": "TRY=X",
                    "response": [{
                        "meta": {"currency": "TRY", "symbol": "TRY=X"},
                        "timestamp": [1717390800, 1717391700],
                        "indicators": {"quote": [{"close": [32.2, 32.25]}]}
                    }]
                }
            ],
            "error": null
        }
    }"#;

    #[test]
    fn parses_batch_into_ticker_first_frame() {
        let resp: SparkResponse = serde_json::from_str(SAMPLE).unwrap();
        let frame = YahooSource::parse_response(resp).unwrap();

        assert_eq!(frame.index().len(), 3);
        match frame.columns() {
            ColumnSet::Hierarchical(cols) => {
                assert_eq!(cols.len(), 2);
                assert_eq!(cols[0].0, ("GC=F".to_string(), "Close".to_string()));
                assert_eq!(cols[1].1[2], RawCell::Null);
            }
            ColumnSet::Flat(_) => panic!("expected hierarchical columns"),
        }

        let gold = frame.extract(CLOSE_FIELD, "GC=F").unwrap();
        assert_eq!(gold.values().collect::<Vec<_>>(), vec![2350.5, 2352.0]);
        let fx = frame.extract(CLOSE_FIELD, "TRY=X").unwrap();
        assert_eq!(fx.values().collect::<Vec<_>>(), vec![32.2, 32.25]);
    }

    #[test]
    fn upstream_error_object_is_unavailable() {
        let json = r#"{"spark": {"result": null, "error": {"code": "Bad Request", "description": "Missing value for the \"symbols\" argument"}}}"#;
        let resp: SparkResponse = serde_json::from_str(json).unwrap();
        let err = YahooSource::parse_response(resp).unwrap_err();
        assert!(err.to_string().contains("Bad Request"));
    }

    #[test]
    fn missing_result_and_error_is_unavailable() {
        let resp: SparkResponse =
            serde_json::from_str(r#"{"spark": {"result": null, "error": null}}"#).unwrap();
        assert!(YahooSource::parse_response(resp).is_err());
    }

    #[test]
    fn symbols_without_data_yield_an_empty_frame() {
        let json = r#"{"spark": {"result": [{"symbol": "ALTIN.IS", "response": []}], "error": null}}"#;
        let resp: SparkResponse = serde_json::from_str(json).unwrap();
        let frame = YahooSource::parse_response(resp).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn builds_from_default_config() {
        let source = YahooSource::new(&UpstreamConfig::default()).unwrap();
        assert_eq!(source.name(), "yahoo_finance");
        assert!(source.spark_url().ends_with("/v7/finance/spark"));
    }
}
