//! Pacing knobs for the quote aggregator, loaded from the `[throttle]`
//! config table.

use std::time::Duration;

use serde::Deserialize;

/// How many calls the dashboard may make per window, and how patiently a
/// sector scan waits when that budget runs out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderPolicy {
    #[serde(with = "secs")]
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub retry_backoff: BackoffPolicy,
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        Self::yahoo_default()
    }
}

impl ProviderPolicy {
    /// Thirty calls a minute stays clear of the aggregator's 429s for a
    /// single address.
    pub fn yahoo_default() -> Self {
        Self {
            quota_window: Duration::from_secs(60),
            quota_limit: 30,
            retry_backoff: BackoffPolicy::default(),
        }
    }

    /// For the synthetic source, which never throttles.
    pub fn offline() -> Self {
        Self {
            quota_window: Duration::from_secs(1),
            quota_limit: 1_000,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
                ..BackoffPolicy::default()
            },
        }
    }
}

/// Geometric delay schedule: `initial_delay * multiplier^step`, capped at
/// `max_delay`, with `max_retries + 1` steps in total.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    #[serde(with = "secs")]
    pub initial_delay: Duration,
    #[serde(with = "secs")]
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_retries: 3,
        }
    }
}

impl BackoffPolicy {
    /// Delay for `step` (0-based), or `None` once the schedule is spent.
    pub fn step(&self, step: u32) -> Option<Duration> {
        if step > self.max_retries {
            return None;
        }
        let exponent = i32::try_from(step).unwrap_or(i32::MAX);
        let grown = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = grown.min(self.max_delay.as_secs_f64());
        Some(Duration::from_secs_f64(capped.max(0.0)))
    }

    /// Sum of every step; the longest a caller can be kept waiting.
    pub fn total(&self) -> Duration {
        (0..=self.max_retries).filter_map(|step| self.step(step)).sum()
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    /// Fractional seconds, so `0.5` means half a second.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds).map_err(|_| {
            serde::de::Error::custom(format!("{seconds} is not a usable number of seconds"))
        })
    }
}
