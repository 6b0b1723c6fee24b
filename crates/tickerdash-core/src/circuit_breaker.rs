//! Upstream cooldown gate.
//!
//! Two things close the gate: a run of consecutive failures, and an explicit
//! "too many requests" answer from the quote aggregator. The second one
//! closes it at once and for longer, matching the "wait a minute" advice the
//! dashboard shows. Once the cooldown expires one probe call is let through;
//! its outcome decides whether the gate reopens or stays shut.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Why the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripReason {
    Failures,
    RateLimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    /// Cooldown after `failure_threshold` consecutive failures.
    pub failure_cooldown: Duration,
    /// Cooldown after the upstream reports a rate limit.
    pub rate_limit_cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            failure_cooldown: Duration::from_secs(30),
            rate_limit_cooldown: Duration::from_secs(60),
        }
    }
}

/// Returned while the circuit refuses calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    pub reason: TripReason,
    pub remaining: Duration,
}

#[derive(Debug, Clone, Copy)]
enum Gate {
    Closed { failures: u32 },
    Open { reason: TripReason, until: Instant },
    Probing { reason: TripReason },
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    gate: Mutex<Gate>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            gate: Mutex::new(Gate::Closed { failures: 0 }),
        }
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits a call, or reports how long the caller should wait.
    ///
    /// # Errors
    ///
    /// [`Cooldown`] while the circuit is open.
    pub fn check(&self) -> Result<(), Cooldown> {
        let mut gate = self.gate();
        match *gate {
            Gate::Closed { .. } | Gate::Probing { .. } => Ok(()),
            Gate::Open { reason, until } => {
                let now = Instant::now();
                if now >= until {
                    *gate = Gate::Probing { reason };
                    tracing::debug!(?reason, "cooldown over; probing upstream");
                    Ok(())
                } else {
                    Err(Cooldown {
                        reason,
                        remaining: until - now,
                    })
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut gate = self.gate();
        if matches!(*gate, Gate::Probing { .. } | Gate::Open { .. }) {
            tracing::info!("upstream recovered");
        }
        *gate = Gate::Closed { failures: 0 };
    }

    pub fn record_failure(&self) {
        let mut gate = self.gate();
        let failures = match *gate {
            Gate::Closed { failures } => failures.saturating_add(1),
            Gate::Probing { .. } => self.config.failure_threshold,
            Gate::Open { .. } => return,
        };
        if failures >= self.config.failure_threshold {
            tracing::warn!(failures, "upstream failing; pausing calls");
            *gate = Gate::Open {
                reason: TripReason::Failures,
                until: Instant::now() + self.config.failure_cooldown,
            };
        } else {
            *gate = Gate::Closed { failures };
        }
    }

    /// Opens immediately for the rate-limit cooldown.
    pub fn record_rate_limited(&self) {
        tracing::warn!(
            cooldown_secs = self.config.rate_limit_cooldown.as_secs(),
            "upstream rate limit hit"
        );
        *self.gate() = Gate::Open {
            reason: TripReason::RateLimited,
            until: Instant::now() + self.config.rate_limit_cooldown,
        };
    }

    pub fn state(&self) -> CircuitState {
        match *self.gate() {
            Gate::Closed { .. } => CircuitState::Closed,
            Gate::Open { .. } => CircuitState::Open,
            Gate::Probing { .. } => CircuitState::HalfOpen,
        }
    }

    /// Reason for the current or most recent trip, if the circuit is not
    /// closed.
    pub fn trip_reason(&self) -> Option<TripReason> {
        match *self.gate() {
            Gate::Closed { .. } => None,
            Gate::Open { reason, .. } | Gate::Probing { reason } => Some(reason),
        }
    }
}
