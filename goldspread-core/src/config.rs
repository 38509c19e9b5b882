//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) gives the stock
//! instruments, a 60 s cache and the standard spread model.

use crate::synthetic::{max_seed_bucket_secs, SpreadModelConfig};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tickers for the three roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Ounce benchmark (gold futures).
    pub benchmark: String,
    /// Local currency per benchmark currency.
    pub fx: String,
    /// Locally traded gold certificate.
    pub certificate: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            benchmark: "GC=F".into(),
            fx: "TRY=X".into(),
            certificate: "ALTIN.IS".into(),
        }
    }
}

impl InstrumentConfig {
    /// All three tickers, benchmark first.
    pub fn tickers(&self) -> [&str; 3] {
        [
            self.benchmark.as_str(),
            self.fx.as_str(),
            self.certificate.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".into(),
            timeout_secs: 10,
            user_agent: concat!("goldspread/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 60 }
    }
}

impl CacheConfig {
    /// Saturates at `TimeDelta::MAX`; `validate` rejects values that would.
    pub fn ttl(&self) -> TimeDelta {
        self.try_ttl().unwrap_or(TimeDelta::MAX)
    }

    fn try_ttl(&self) -> Option<TimeDelta> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Fewer aligned rows than this is `InsufficientData`.
    pub min_aligned_rows: usize,
    /// Certificate prints below this are in the fractional unit.
    pub unit_threshold: f64,
    pub unit_multiplier: f64,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            min_aligned_rows: 10,
            unit_threshold: 500.0,
            unit_multiplier: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Starting level of the certificate random walk.
    pub certificate_base: f64,
    /// Standard deviation of one walk increment.
    pub walk_volatility: f64,
    /// Width of the seed bucket; simulations inside one bucket are identical.
    pub seed_bucket_secs: u64,
    pub master_seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            certificate_base: 3000.0,
            walk_volatility: 2.0,
            seed_bucket_secs: 60,
            master_seed: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldSpreadConfig {
    pub instruments: InstrumentConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub calculator: CalculatorConfig,
    pub synthetic: SyntheticConfig,
    pub spread_model: SpreadModelConfig,
}

impl GoldSpreadConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Cross-field checks. The spread model validates itself on construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        let tickers = self.instruments.tickers();
        if tickers.iter().any(|t| t.trim().is_empty()) {
            return invalid("instrument tickers must not be empty");
        }
        if tickers[0] == tickers[1] || tickers[0] == tickers[2] || tickers[1] == tickers[2] {
            return invalid("instrument tickers must be distinct");
        }
        if self.upstream.timeout_secs == 0 {
            return invalid("upstream.timeout_secs must be > 0");
        }
        if self.cache.ttl_secs == 0 {
            return invalid("cache.ttl_secs must be > 0");
        }
        if self.cache.try_ttl().is_none() {
            return invalid("cache.ttl_secs is out of range");
        }
        if self.calculator.min_aligned_rows == 0 {
            return invalid("calculator.min_aligned_rows must be >= 1");
        }
        if !(self.calculator.unit_threshold.is_finite() && self.calculator.unit_multiplier.is_finite())
        {
            return invalid("calculator unit correction must be finite");
        }
        let max_bucket = max_seed_bucket_secs();
        if !(1..=max_bucket).contains(&self.synthetic.seed_bucket_secs) {
            return Err(ConfigError::Invalid(format!(
                "synthetic.seed_bucket_secs must be between 1 and {max_bucket}"
            )));
        }
        if !self.synthetic.certificate_base.is_finite()
            || !self.synthetic.walk_volatility.is_finite()
            || self.synthetic.walk_volatility < 0.0
        {
            return invalid("synthetic walk parameters must be finite, volatility >= 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_the_default() {
        let config = GoldSpreadConfig::from_toml("").unwrap();
        assert_eq!(config, GoldSpreadConfig::default());
        assert_eq!(config.instruments.tickers(), ["GC=F", "TRY=X", "ALTIN.IS"]);
        assert_eq!(config.cache.ttl(), TimeDelta::seconds(60));
        assert_eq!(config.upstream.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = GoldSpreadConfig::from_toml(
            r#"
            [instruments]
            certificate = "GLDGR.IS"

            [spread_model]
            base_spread = 30.0
            "#,
        )
        .unwrap();
        assert_eq!(config.instruments.certificate, "GLDGR.IS");
        assert_eq!(config.instruments.benchmark, "GC=F");
        assert_eq!(config.spread_model.base_spread(), 30.0);
        assert_eq!(config.spread_model.max_spread(), 120.0);
    }

    #[test]
    fn spread_model_invariants_are_enforced_on_load() {
        let err = GoldSpreadConfig::from_toml(
            r#"
            [spread_model]
            base_spread = 200.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("base_spread"));
    }

    #[test]
    fn rejects_zero_ttl_and_duplicate_tickers() {
        let err = GoldSpreadConfig::from_toml("[cache]\nttl_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GoldSpreadConfig::from_toml("[instruments]\nfx = \"GC=F\"\n").unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn seed_bucket_wider_than_finest_step_is_rejected() {
        let err = GoldSpreadConfig::from_toml("[synthetic]\nseed_bucket_secs = 3600\n").unwrap_err();
        assert!(err.to_string().contains("seed_bucket_secs"));
        assert!(GoldSpreadConfig::from_toml("[synthetic]\nseed_bucket_secs = 0\n").is_err());

        let config = GoldSpreadConfig::from_toml("[synthetic]\nseed_bucket_secs = 60\n").unwrap();
        assert_eq!(config.synthetic.seed_bucket_secs, 60);
    }

    #[test]
    fn huge_ttl_is_rejected_instead_of_overflowing() {
        let err = GoldSpreadConfig::from_toml("[cache]\nttl_secs = 4611686018427387904\n").unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let mut config = GoldSpreadConfig::default();
        config.cache.ttl_secs = u64::MAX;
        assert_eq!(config.cache.ttl(), TimeDelta::MAX);
    }

    #[test]
    fn toml_round_trip() {
        let config = GoldSpreadConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[spread_model]"));
        assert_eq!(GoldSpreadConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = GoldSpreadConfig::from_file(Path::new("/nonexistent/goldspread.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
