//! Synthetic fallback data.
//!
//! The certificate price is a discrete Brownian walk from a fixed base. The
//! spread follows a mean-reverting (Ornstein-Uhlenbeck style) recursion,
//! clipped to hard bounds at every step, and the physical price is
//! `certificate + spread`. Output has the same schema as live data.

use crate::config::{ConfigError, SyntheticConfig};
use crate::data::DataSource;
use crate::table::{TimeSeriesPoint, TimeSeriesTable};
use crate::window::WindowLabel;
use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Upper bound on generated points; longer requests get a coarser step.
pub const MAX_POINTS: i64 = 100_000;

/// Parameters of the mean-reverting spread process.
///
/// Only constructible through [`SpreadModelConfig::new`], which enforces
/// `min_spread <= base_spread <= max_spread`, `volatility >= 0` and
/// `mean_reversion_rate` in `[0, 1]`. Deserialization goes through the same
/// check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpreadModelParams", into = "SpreadModelParams")]
pub struct SpreadModelConfig {
    base_spread: f64,
    volatility: f64,
    mean_reversion_rate: f64,
    min_spread: f64,
    max_spread: f64,
}

/// Unvalidated wire form of [`SpreadModelConfig`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadModelParams {
    pub base_spread: f64,
    pub volatility: f64,
    pub mean_reversion_rate: f64,
    pub min_spread: f64,
    pub max_spread: f64,
}

impl Default for SpreadModelParams {
    fn default() -> Self {
        Self {
            base_spread: 25.0,
            volatility: 6.0,
            mean_reversion_rate: 0.15,
            min_spread: 5.0,
            max_spread: 120.0,
        }
    }
}

impl SpreadModelConfig {
    pub fn new(
        base_spread: f64,
        volatility: f64,
        mean_reversion_rate: f64,
        min_spread: f64,
        max_spread: f64,
    ) -> Result<Self, ConfigError> {
        let all = [base_spread, volatility, mean_reversion_rate, min_spread, max_spread];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid(
                "spread model parameters must be finite".into(),
            ));
        }
        if !(min_spread <= base_spread && base_spread <= max_spread) {
            return Err(ConfigError::Invalid(format!(
                "need min_spread <= base_spread <= max_spread, got {min_spread} <= {base_spread} <= {max_spread}"
            )));
        }
        if volatility < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "volatility must be >= 0, got {volatility}"
            )));
        }
        if !(0.0..=1.0).contains(&mean_reversion_rate) {
            return Err(ConfigError::Invalid(format!(
                "mean_reversion_rate must be in [0, 1], got {mean_reversion_rate}"
            )));
        }
        Ok(Self {
            base_spread,
            volatility,
            mean_reversion_rate,
            min_spread,
            max_spread,
        })
    }

    pub fn base_spread(&self) -> f64 {
        self.base_spread
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn mean_reversion_rate(&self) -> f64 {
        self.mean_reversion_rate
    }

    pub fn min_spread(&self) -> f64 {
        self.min_spread
    }

    pub fn max_spread(&self) -> f64 {
        self.max_spread
    }

    /// One step of the recursion from `prev` with standard normal draw `z`.
    pub fn step(&self, prev: f64, z: f64) -> f64 {
        let next = prev + self.mean_reversion_rate * (self.base_spread - prev) + self.volatility * z;
        next.clamp(self.min_spread, self.max_spread)
    }
}

impl Default for SpreadModelConfig {
    fn default() -> Self {
        let p = SpreadModelParams::default();
        Self {
            base_spread: p.base_spread,
            volatility: p.volatility,
            mean_reversion_rate: p.mean_reversion_rate,
            min_spread: p.min_spread,
            max_spread: p.max_spread,
        }
    }
}

impl TryFrom<SpreadModelParams> for SpreadModelConfig {
    type Error = ConfigError;

    fn try_from(p: SpreadModelParams) -> Result<Self, Self::Error> {
        Self::new(
            p.base_spread,
            p.volatility,
            p.mean_reversion_rate,
            p.min_spread,
            p.max_spread,
        )
    }
}

impl From<SpreadModelConfig> for SpreadModelParams {
    fn from(c: SpreadModelConfig) -> Self {
        Self {
            base_spread: c.base_spread,
            volatility: c.volatility,
            mean_reversion_rate: c.mean_reversion_rate,
            min_spread: c.min_spread,
            max_spread: c.max_spread,
        }
    }
}

/// Sampling step for a requested duration: finer for short windows.
pub fn step_for_duration(duration: TimeDelta) -> TimeDelta {
    if duration <= TimeDelta::minutes(60) {
        TimeDelta::minutes(1)
    } else if duration <= TimeDelta::days(1) {
        TimeDelta::minutes(5)
    } else if duration <= TimeDelta::days(7) {
        TimeDelta::minutes(30)
    } else if duration <= TimeDelta::days(31) {
        TimeDelta::hours(2)
    } else if duration <= TimeDelta::days(93) {
        TimeDelta::hours(6)
    } else {
        TimeDelta::days(1)
    }
}

/// What to simulate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationRequest {
    /// Timestamp of the last point.
    pub end: DateTime<Utc>,
    /// Span covered, `end - duration` to `end`.
    pub duration: TimeDelta,
    /// Overrides the step table when set.
    pub frequency_hint: Option<TimeDelta>,
    /// Fixed seed for reproducible output; entropy otherwise.
    pub seed: Option<u64>,
}

impl SimulationRequest {
    pub fn new(end: DateTime<Utc>, duration: TimeDelta) -> Self {
        Self {
            end,
            duration,
            frequency_hint: None,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_frequency(mut self, step: TimeDelta) -> Self {
        self.frequency_hint = Some(step);
        self
    }

    /// Step and point count actually used.
    ///
    /// The duration is clamped to the span between chrono's earliest
    /// instant and `end`, so every grid timestamp is representable.
    pub fn resolve_grid(&self) -> (TimeDelta, i64) {
        let representable = self.end.signed_duration_since(DateTime::<Utc>::MIN_UTC);
        let duration = self.duration.clamp(TimeDelta::zero(), representable);
        let mut step = self
            .frequency_hint
            .unwrap_or_else(|| step_for_duration(duration))
            .max(TimeDelta::seconds(1));

        let duration_ms = duration.num_milliseconds();
        let step_ms = step.num_milliseconds().max(1);
        let mut n = duration_ms / step_ms + 1;
        if n > MAX_POINTS {
            let coarse_ms = (duration_ms + MAX_POINTS - 2) / (MAX_POINTS - 1);
            step = TimeDelta::milliseconds(coarse_ms.max(step_ms));
            n = duration_ms / step.num_milliseconds().max(1) + 1;
        }
        (step, n.max(1))
    }
}

/// Smallest sampling step any window simulates with. A seed bucket wider
/// than this would anchor fallback output more than one period behind now.
pub fn finest_window_step() -> TimeDelta {
    WindowLabel::ALL
        .iter()
        .map(|label| step_for_duration(label.spec().trim_duration))
        .min()
        .unwrap_or(TimeDelta::minutes(1))
}

/// Widest seed bucket that keeps fallback output within one step of now.
pub fn max_seed_bucket_secs() -> u64 {
    u64::try_from(finest_window_step().num_seconds()).unwrap_or(60).max(1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticGenerator {
    model: SpreadModelConfig,
    certificate_base: f64,
    walk_volatility: f64,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new(SpreadModelConfig::default(), &SyntheticConfig::default())
    }
}

impl SyntheticGenerator {
    pub fn new(model: SpreadModelConfig, config: &SyntheticConfig) -> Self {
        Self {
            model,
            certificate_base: config.certificate_base,
            walk_volatility: config.walk_volatility,
        }
    }

    pub fn model(&self) -> &SpreadModelConfig {
        &self.model
    }

    /// Generate a table ending at `request.end`. Never fails, never empty.
    pub fn simulate(&self, request: SimulationRequest) -> TimeSeriesTable {
        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (step, n) = request.resolve_grid();

        let mut points = Vec::with_capacity(n as usize);
        let mut certificate = self.certificate_base;
        let mut spread = self.model.base_spread;
        for i in 0..n {
            if i > 0 {
                let walk: f64 = StandardNormal.sample(&mut rng);
                let shock: f64 = StandardNormal.sample(&mut rng);
                certificate += self.walk_volatility * walk;
                spread = self.model.step(spread, shock);
            }
            let timestamp = i32::try_from(n - 1 - i)
                .ok()
                .and_then(|k| step.checked_mul(k))
                .and_then(|offset| request.end.checked_sub_signed(offset));
            if let Some(timestamp) = timestamp {
                points.push(TimeSeriesPoint::from_spread(timestamp, certificate, spread));
            }
        }

        TimeSeriesTable::from_ordered(points, DataSource::Synthetic)
    }
}
