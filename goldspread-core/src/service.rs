//! Resilient data service: fetch and derive, or fall back to synthetic data.
//!
//! `REQUESTING -> SUCCEEDED | FAILED`, `FAILED -> SIMULATING -> SUCCEEDED`.
//! Every fault from the fetcher, the extractor or the calculator ends in
//! `FAILED` and is logged, never returned. The caller always gets a
//! non-empty table trimmed to the window.

use crate::calculator::DerivedMetricsCalculator;
use crate::clock::Clock;
use crate::config::{GoldSpreadConfig, InstrumentConfig};
use crate::data::{DataError, MarketDataFetcher, MarketDataSource};
use crate::rng::{bucket_start, time_bucket, SeedHierarchy};
use crate::synthetic::{max_seed_bucket_secs, SimulationRequest, SyntheticGenerator};
use crate::table::TimeSeriesTable;
use crate::window::{WindowLabel, WindowSpec};
use std::sync::Arc;
use tracing::{debug, warn};

/// Anything that can produce a table for a window. The cache wraps one.
pub trait TableProducer: Send + Sync {
    fn produce(&self, label: WindowLabel) -> TimeSeriesTable;
}

#[derive(Debug)]
enum ServiceState {
    Requesting,
    Failed(DataError),
    Simulating,
    Succeeded(TimeSeriesTable),
}

pub struct ResilientDataService<S> {
    fetcher: MarketDataFetcher<S>,
    calculator: DerivedMetricsCalculator,
    generator: SyntheticGenerator,
    instruments: InstrumentConfig,
    seeds: SeedHierarchy,
    seed_bucket_secs: u64,
    clock: Arc<dyn Clock>,
}

impl<S: MarketDataSource> ResilientDataService<S> {
    pub fn new(source: S, config: &GoldSpreadConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher: MarketDataFetcher::new(source),
            calculator: DerivedMetricsCalculator::new(&config.calculator),
            generator: SyntheticGenerator::new(config.spread_model, &config.synthetic),
            instruments: config.instruments.clone(),
            seeds: SeedHierarchy::new(config.synthetic.master_seed),
            seed_bucket_secs: config.synthetic.seed_bucket_secs.clamp(1, max_seed_bucket_secs()),
            clock,
        }
    }

    pub fn source(&self) -> &S {
        self.fetcher.source()
    }

    pub fn generator(&self) -> &SyntheticGenerator {
        &self.generator
    }

    /// The live path on its own: one batched fetch, then derive.
    pub fn fetch_live(&self, spec: &WindowSpec) -> Result<TimeSeriesTable, DataError> {
        let series = self.fetcher.fetch(
            &self.instruments.tickers(),
            spec.upstream_period,
            spec.upstream_interval,
        )?;
        self.calculator.compute_from_map(&series, &self.instruments)
    }

    /// The request the fallback path makes right now for `spec`.
    ///
    /// Seed and end instant come from the current seed bucket, so repeated
    /// calls inside one bucket produce identical tables.
    pub fn simulation_request(&self, spec: &WindowSpec) -> SimulationRequest {
        let bucket = time_bucket(self.clock.now(), self.seed_bucket_secs);
        SimulationRequest::new(bucket_start(bucket, self.seed_bucket_secs), spec.trim_duration)
            .with_seed(self.seeds.sub_seed(spec.label.code(), bucket))
    }

    pub fn simulate(&self, spec: &WindowSpec) -> TimeSeriesTable {
        self.generator.simulate(self.simulation_request(spec))
    }

    /// Run the state machine for one window. Always succeeds.
    pub fn produce_spec(&self, spec: &WindowSpec) -> TimeSeriesTable {
        let mut state = ServiceState::Requesting;
        let table = loop {
            state = match state {
                ServiceState::Requesting => match self.fetch_live(spec) {
                    Ok(table) => ServiceState::Succeeded(table),
                    Err(fault) => ServiceState::Failed(fault),
                },
                ServiceState::Failed(fault) => {
                    warn!(
                        window = %spec.label,
                        source = self.fetcher.source().name(),
                        %fault,
                        "live data unavailable, using synthetic series"
                    );
                    ServiceState::Simulating
                }
                ServiceState::Simulating => ServiceState::Succeeded(self.simulate(spec)),
                ServiceState::Succeeded(table) => break table,
            };
        };

        let trimmed = table.trimmed(spec.trim_duration);
        debug!(
            window = %spec.label,
            points = trimmed.len(),
            source = ?trimmed.source(),
            "window produced"
        );
        trimmed
    }

    /// Lenient entry point for a raw UI code.
    pub fn produce_code(&self, code: &str) -> TimeSeriesTable {
        self.produce_spec(&WindowSpec::for_code(code))
    }
}

impl<S: MarketDataSource> TableProducer for ResilientDataService<S> {
    fn produce(&self, label: WindowLabel) -> TimeSeriesTable {
        self.produce_spec(&label.spec())
    }
}
