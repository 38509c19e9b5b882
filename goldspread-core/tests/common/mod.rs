//! Shared fakes for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use goldspread_core::{DataError, MarketDataSource, RawCell, RawFrame};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Replays a fixed answer and counts calls.
pub struct ScriptedSource {
    answer: Result<RawFrame, DataError>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Vec<String>, String, String)>>,
}

impl ScriptedSource {
    pub fn ok(frame: RawFrame) -> Self {
        Self::new(Ok(frame))
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(Err(DataError::unavailable(reason)))
    }

    fn new(answer: Result<RawFrame, DataError>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (tickers, period, interval) of every call so far.
    pub fn requests(&self) -> Vec<(Vec<String>, String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl MarketDataSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn download(
        &self,
        tickers: &[&str],
        period: &str,
        interval: &str,
    ) -> Result<RawFrame, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((
            tickers.iter().map(|t| t.to_string()).collect(),
            period.to_string(),
            interval.to_string(),
        ));
        self.answer.clone()
    }
}

/// Ticker-first close columns for the default instruments, `n` rows at
/// `spacing` ending at `end`. Values are gold 2500 + i, fx 34, certificate 27.
pub fn live_frame(n: usize, spacing: TimeDelta, end: DateTime<Utc>) -> RawFrame {
    let index: Vec<DateTime<Utc>> = (0..n)
        .map(|i| end - spacing * (n - 1 - i) as i32)
        .collect();
    let col = |ticker: &str, f: &dyn Fn(usize) -> f64| {
        (
            (ticker.to_string(), "Close".to_string()),
            (0..n).map(|i| RawCell::Float(f(i))).collect::<Vec<_>>(),
        )
    };
    RawFrame::hierarchical(
        index,
        vec![
            col("GC=F", &|i: usize| 2500.0 + i as f64),
            col("TRY=X", &|_: usize| 34.0),
            col("ALTIN.IS", &|_: usize| 27.0),
        ],
    )
    .unwrap()
}
