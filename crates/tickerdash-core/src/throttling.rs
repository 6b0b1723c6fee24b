//! Request budget shared by sector scans.
//!
//! A scan walks a preset ticker by ticker. Before each ticker it asks the
//! governor limiter for a cell; when none is free it sleeps along the
//! configured [`BackoffPolicy`] and gives up once the schedule runs out, so
//! one starved ticker becomes a scan failure instead of a hung request.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::provider_policy::{BackoffPolicy, ProviderPolicy};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct ThrottlingQueue {
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
    backoff: BackoffPolicy,
    waiting: Arc<AtomicUsize>,
}

/// The budget stayed empty for the whole backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleExhausted {
    pub waited: Duration,
}

impl ThrottlingQueue {
    /// `quota_limit` calls per `quota_window`, all of which may burst.
    /// A zero limit is treated as one.
    pub fn new(quota_window: Duration, quota_limit: u32, backoff: BackoffPolicy) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota(quota_window, quota_limit))),
            clock: DefaultClock::default(),
            backoff,
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(
            policy.quota_window,
            policy.quota_limit,
            policy.retry_backoff.clone(),
        )
    }

    /// Takes one cell, or says how long until the next one frees up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Callers currently sleeping in [`until_ready`](Self::until_ready).
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// # Errors
    ///
    /// [`ThrottleExhausted`] when no cell freed up within the backoff
    /// schedule.
    pub async fn until_ready(&self) -> Result<(), ThrottleExhausted> {
        if self.try_acquire().is_ok() {
            return Ok(());
        }

        self.waiting.fetch_add(1, Ordering::Relaxed);
        let mut waited = Duration::ZERO;
        let mut step = 0;
        let outcome = loop {
            let ready_in = match self.try_acquire() {
                Ok(()) => break Ok(()),
                Err(ready_in) => ready_in,
            };
            let Some(limit) = self.backoff.step(step) else {
                break Err(ThrottleExhausted { waited });
            };
            let delay = ready_in.min(limit);
            tracing::debug!(
                step,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "request budget empty; waiting"
            );
            tokio::time::sleep(delay).await;
            waited += delay;
            step += 1;
        };
        self.waiting.fetch_sub(1, Ordering::Relaxed);

        if let Err(exhausted) = &outcome {
            tracing::warn!(waited_ms = exhausted.waited.as_millis() as u64, "request budget exhausted");
        }
        outcome
    }
}

fn quota(window: Duration, limit: u32) -> Quota {
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
    let replenish = window / burst.get();
    Quota::with_period(replenish.max(Duration::from_millis(1)))
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
