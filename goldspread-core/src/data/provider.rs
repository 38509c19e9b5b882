//! Market data source trait and structured error types.
//!
//! The `MarketDataSource` trait abstracts over upstreams (Yahoo Finance, an
//! always-failing offline source, test fakes) so the fetcher and the service
//! never know which one they talk to.

use super::frame::RawFrame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Internal faults of the acquisition pipeline.
///
/// Both variants are absorbed by the resilient service and trigger the
/// synthetic fallback. Network failure and "no data" share one variant.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("insufficient data: {aligned} aligned rows, need at least {required}")]
    InsufficientData { aligned: usize, required: usize },
}

impl DataError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        DataError::DataUnavailable(reason.into())
    }
}

/// Where a table's rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Upstream,
    Synthetic,
}

/// An upstream that answers one batched request for several tickers.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Download every ticker over `period` at `interval` in a single call.
    fn download(
        &self,
        tickers: &[&str],
        period: &str,
        interval: &str,
    ) -> Result<RawFrame, DataError>;
}

impl<S: MarketDataSource + ?Sized> MarketDataSource for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn download(
        &self,
        tickers: &[&str],
        period: &str,
        interval: &str,
    ) -> Result<RawFrame, DataError> {
        (**self).download(tickers, period, interval)
    }
}

impl<S: MarketDataSource + ?Sized> MarketDataSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn download(
        &self,
        tickers: &[&str],
        period: &str,
        interval: &str,
    ) -> Result<RawFrame, DataError> {
        (**self).download(tickers, period, interval)
    }
}

/// A source with no network: every download fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

impl MarketDataSource for OfflineSource {
    fn name(&self) -> &str {
        "offline"
    }

    fn download(
        &self,
        _tickers: &[&str],
        _period: &str,
        _interval: &str,
    ) -> Result<RawFrame, DataError> {
        Err(DataError::unavailable("offline mode: no upstream configured"))
    }
}
