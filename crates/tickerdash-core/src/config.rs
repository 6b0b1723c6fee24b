//! Dashboard configuration.
//!
//! Values come from built-in defaults, an optional TOML file, then
//! `TICKERDASH_*` environment variables, in that order. Command-line flags are
//! applied by the binary on top of the loaded value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::indicators::IndicatorConfig;
use crate::provider_policy::ProviderPolicy;
use crate::scan::DEFAULT_CUTOFF;
use crate::session::DEFAULT_HISTORY_LIMIT;
use crate::{Interval, ScoringConfig, Symbol};

pub const ENV_PREFIX: &str = "TICKERDASH_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: String, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Ticker or company name shown to a fresh session.
    pub default_query: String,
    pub default_interval: Interval,
    pub history_limit: usize,
    /// Zero disables caching.
    pub cache_ttl_secs: u64,
    pub search_limit: usize,
    pub scan_cutoff: u8,
    pub bind: String,
    /// Serve synthetic data instead of calling the quote aggregator.
    pub offline: bool,
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub session_idle_secs: u64,
    pub indicators: IndicatorConfig,
    pub scoring: ScoringConfig,
    pub throttle: ProviderPolicy,
    /// Extra company-name aliases, merged over the built-in table.
    pub aliases: BTreeMap<String, String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_query: String::from("삼성전자"),
            default_interval: Interval::OneDay,
            history_limit: DEFAULT_HISTORY_LIMIT,
            cache_ttl_secs: 600,
            search_limit: 5,
            scan_cutoff: DEFAULT_CUTOFF,
            bind: String::from("127.0.0.1:8501"),
            offline: false,
            request_timeout_ms: 10_000,
            max_retries: 2,
            session_idle_secs: 6 * 60 * 60,
            indicators: IndicatorConfig::default(),
            scoring: ScoringConfig::default(),
            throttle: ProviderPolicy::yahoo_default(),
            aliases: BTreeMap::new(),
        }
    }
}

impl DashboardConfig {
    /// Loads defaults, the optional TOML file, then process environment
    /// overrides, and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or malformed, an
    /// override does not parse, or the merged values are inconsistent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok())?;
        config.validate()?;
        tracing::debug!(
            offline = config.offline,
            cache_ttl_secs = config.cache_ttl_secs,
            bind = %config.bind,
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `TICKERDASH_*` overrides read through `lookup`.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| {
            let name = format!("{ENV_PREFIX}{key}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, value)) = get("DEFAULT_QUERY") {
            self.default_query = value;
        }
        if let Some((name, value)) = get("DEFAULT_INTERVAL") {
            self.default_interval = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name, value })?;
        }
        if let Some((_, value)) = get("BIND") {
            self.bind = value;
        }
        if let Some((name, value)) = get("OFFLINE") {
            self.offline = parse_flag(&value).ok_or(ConfigError::InvalidEnv { name, value })?;
        }
        if let Some(pair) = get("CACHE_TTL_SECS") {
            self.cache_ttl_secs = parse_number(pair)?;
        }
        if let Some(pair) = get("SEARCH_LIMIT") {
            self.search_limit = parse_number(pair)?;
        }
        if let Some(pair) = get("SCAN_CUTOFF") {
            self.scan_cutoff = parse_number(pair)?;
        }
        if let Some(pair) = get("REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_number(pair)?;
        }
        if let Some(pair) = get("MAX_RETRIES") {
            self.max_retries = parse_number(pair)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first inconsistent field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_query.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from("default_query must not be empty")));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid(String::from("history_limit must be at least 1")));
        }
        if self.search_limit == 0 {
            return Err(ConfigError::Invalid(String::from("search_limit must be at least 1")));
        }
        if self.scan_cutoff > 100 {
            return Err(ConfigError::Invalid(format!(
                "scan_cutoff {} exceeds 100",
                self.scan_cutoff
            )));
        }
        let ind = &self.indicators;
        if ind.ma_window == 0 || ind.rsi_period == 0 || ind.bollinger_window < 2 {
            return Err(ConfigError::Invalid(String::from(
                "indicator windows must be positive (bollinger_window >= 2)",
            )));
        }
        if ind.macd_fast == 0 || ind.macd_fast >= ind.macd_slow || ind.macd_signal == 0 {
            return Err(ConfigError::Invalid(String::from(
                "macd periods must satisfy 0 < fast < slow and signal > 0",
            )));
        }
        if !(ind.bollinger_k.is_finite() && ind.bollinger_k > 0.0) {
            return Err(ConfigError::Invalid(String::from("bollinger_k must be positive")));
        }
        if self.scoring.accumulate_at > self.scoring.strong_buy_at {
            return Err(ConfigError::Invalid(String::from(
                "scoring.accumulate_at must not exceed scoring.strong_buy_at",
            )));
        }
        if self.throttle.quota_limit == 0 {
            return Err(ConfigError::Invalid(String::from("throttle.quota_limit must be positive")));
        }
        for (name, ticker) in &self.aliases {
            Symbol::parse(ticker).map_err(|error| {
                ConfigError::Invalid(format!("alias '{name}' -> '{ticker}': {error}"))
            })?;
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>((name, value): (String, String)) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = DashboardConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.scan_cutoff, 80);
    }

    #[test]
    fn reads_partial_toml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
default_query = "NVDA"
cache_ttl_secs = 30

[indicators]
rsi_period = 9
rsi_smoothing = "wilder"

[aliases]
"쿠팡" = "CPNG"
"#
        )
        .expect("write");

        let config = DashboardConfig::from_file(file.path()).expect("parses");
        assert_eq!(config.default_query, "NVDA");
        assert_eq!(config.cache_ttl_secs, 30);
        assert_eq!(config.indicators.rsi_period, 9);
        assert_eq!(config.indicators.ma_window, 20);
        assert_eq!(config.aliases.get("쿠팡").map(String::as_str), Some("CPNG"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "cache_ttl = 5").expect("write");
        assert!(matches!(
            DashboardConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = DashboardConfig::default();
        config
            .apply_env_from(env(&[
                ("TICKERDASH_OFFLINE", "yes"),
                ("TICKERDASH_SCAN_CUTOFF", "70"),
                ("TICKERDASH_DEFAULT_INTERVAL", "1wk"),
            ]))
            .expect("valid overrides");

        assert!(config.offline);
        assert_eq!(config.scan_cutoff, 70);
        assert_eq!(config.default_interval, Interval::OneWeek);
    }

    #[test]
    fn malformed_override_names_the_variable() {
        let mut config = DashboardConfig::default();
        let error = config
            .apply_env_from(env(&[("TICKERDASH_CACHE_TTL_SECS", "ten")]))
            .expect_err("not a number");
        match error {
            ConfigError::InvalidEnv { name, value } => {
                assert_eq!(name, "TICKERDASH_CACHE_TTL_SECS");
                assert_eq!(value, "ten");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_rejects_inverted_macd_periods() {
        let mut config = DashboardConfig::default();
        config.indicators.macd_fast = 30;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            DashboardConfig::load(Some(&path)),
            Err(ConfigError::Io { .. })
        ));
    }
}
