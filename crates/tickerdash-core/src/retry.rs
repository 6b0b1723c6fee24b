//! When the Yahoo adapter tries a failed call again, and how long it waits.

use std::time::Duration;

use crate::http_client::HttpError;
use crate::provider_policy::BackoffPolicy;

/// Statuses worth asking again for. 429 is not among them: a rate limit
/// opens the circuit breaker instead.
const TRANSIENT_STATUSES: [u16; 5] = [408, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// `max_retries` here bounds the extra attempts after the first.
    pub backoff: BackoffPolicy,
    /// Spread each delay by up to half in either direction.
    pub jitter: bool,
    pub retry_on_status: Vec<u16>,
    pub retry_on_timeout: bool,
    pub retry_on_connect: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential(2)
    }
}

impl RetryConfig {
    /// 0.5 s doubling up to 8 s, jittered.
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            backoff: BackoffPolicy {
                initial_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(8),
                multiplier: 2.0,
                max_retries,
            },
            jitter: true,
            retry_on_status: TRANSIENT_STATUSES.to_vec(),
            retry_on_timeout: true,
            retry_on_connect: true,
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            backoff: BackoffPolicy {
                initial_delay: delay,
                max_delay: delay,
                multiplier: 1.0,
                max_retries,
            },
            jitter: false,
            ..Self::exponential(max_retries)
        }
    }

    pub fn no_retry() -> Self {
        Self {
            retry_on_status: Vec::new(),
            retry_on_timeout: false,
            retry_on_connect: false,
            ..Self::fixed(Duration::ZERO, 0)
        }
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn retries_transport(&self, error: &HttpError) -> bool {
        match error {
            HttpError::Timeout(_) => self.retry_on_timeout,
            HttpError::Connect(_) => self.retry_on_connect,
            HttpError::Transfer(_) => true,
            HttpError::Rejected(_) => false,
        }
    }

    /// Wait before retry number `attempt + 1`, or `None` when the budget is
    /// spent.
    pub fn delay_before_retry(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.backoff.max_retries {
            return None;
        }
        let delay = self.backoff.step(attempt)?;
        Some(if self.jitter { jittered(delay) } else { delay })
    }
}

fn jittered(delay: Duration) -> Duration {
    delay.mul_f64(fastrand::f64() + 0.5)
}
