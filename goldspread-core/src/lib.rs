//! GoldSpread Core: data acquisition and fallback engine for the gold spread monitor.
//!
//! This crate produces the time-indexed table the presentation layer renders:
//! - Raw frame decoding and column extraction (flat or two-level columns)
//! - Batched market data fetching behind the `MarketDataSource` trait
//! - Derived metrics: scaled certificate price, implied physical price, spread
//! - Synthetic fallback: random-walk certificate path with a mean-reverting spread
//! - Resilient data service that always returns a non-empty table
//! - Per-window TTL cache sized to the UI refresh cadence

pub mod cache;
pub mod calculator;
pub mod clock;
pub mod config;
pub mod data;
pub mod export;
pub mod rng;
pub mod service;
pub mod synthetic;
pub mod table;
pub mod window;

pub use cache::{CacheEntry, WindowCache};
pub use calculator::{CalculatorInputs, DerivedMetricsCalculator, TROY_OUNCE_GRAMS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GoldSpreadConfig};
pub use data::{
    DataError, DataSource, MarketDataFetcher, MarketDataSource, OfflineSource, PriceSeries,
    RawCell, RawFrame, YahooSource,
};
pub use service::{ResilientDataService, TableProducer};
pub use synthetic::{SimulationRequest, SpreadModelConfig, SyntheticGenerator};
pub use table::{TableError, TimeSeriesPoint, TimeSeriesTable};
pub use window::{WindowLabel, WindowSpec};
