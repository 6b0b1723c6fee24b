//! What the dashboard needs from a market-data provider.
//!
//! Three reads back every screen: price bars for the chart and indicators,
//! a fundamentals snapshot for the header cards, and a name search for the
//! sidebar. [`YahooAdapter`](crate::YahooAdapter) is the only production
//! implementation; tests plug in stubs.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BarSeries, Fundamental, HistoryRange, Instrument, Interval, Symbol};

/// Boxed future returned by [`DataSource`] reads.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Which read an error or cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Bars,
    Fundamentals,
    Search,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bars => "bars",
            Self::Fundamentals => "fundamentals",
            Self::Search => "search",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    /// Probing after a cooldown.
    Degraded,
    /// Cooling down; calls are answered locally.
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    /// False while the upstream would refuse a call.
    pub rate_available: bool,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool) -> Self {
        Self {
            state,
            rate_available,
        }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    NotFound,
    InvalidRequest,
    Internal,
}

impl SourceErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unavailable => "source.unavailable",
            Self::RateLimited => "source.rate_limited",
            Self::NotFound => "source.not_found",
            Self::InvalidRequest => "source.invalid_request",
            Self::Internal => "source.internal",
        }
    }

    /// Whether waiting and asking again can succeed.
    pub const fn retryable(self) -> bool {
        matches!(self, Self::Unavailable | Self::RateLimited)
    }
}

/// A failed provider read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({})", .kind.code())]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Internal, message)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.kind.retryable()
    }

    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Price history for one ticker at one bar size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    pub symbol: Symbol,
    pub interval: Interval,
    pub range: HistoryRange,
}

impl BarsRequest {
    pub fn new(symbol: Symbol, interval: Interval, range: HistoryRange) -> Self {
        Self {
            symbol,
            interval,
            range,
        }
    }

    /// Uses the lookback the chart shows for `interval`.
    pub fn with_default_range(symbol: Symbol, interval: Interval) -> Self {
        let range = interval.default_range();
        Self::new(symbol, interval, range)
    }

    pub fn cache_key(&self) -> String {
        [
            Endpoint::Bars.as_str(),
            self.symbol.as_str(),
            self.interval.as_str(),
            self.range.as_str(),
        ]
        .join(":")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundamentalsRequest {
    pub symbol: Symbol,
}

impl FundamentalsRequest {
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol }
    }

    pub fn cache_key(&self) -> String {
        [Endpoint::Fundamentals.as_str(), self.symbol.as_str()].join(":")
    }
}

/// Free-text instrument lookup; the query is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
}

impl SearchRequest {
    /// # Errors
    ///
    /// [`SourceErrorKind::InvalidRequest`] for a blank query or a zero limit.
    pub fn new(query: impl Into<String>, limit: usize) -> Result<Self, SourceError> {
        let query = query.into();
        let query = query.trim();
        if query.is_empty() {
            return Err(SourceError::invalid_request("nothing to search for"));
        }
        if limit == 0 {
            return Err(SourceError::invalid_request("search limit is zero"));
        }
        Ok(Self {
            query: query.to_owned(),
            limit,
        })
    }

    /// Case-insensitive in the query.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}",
            Endpoint::Search,
            self.query.to_lowercase(),
            self.limit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBatch {
    pub query: String,
    pub results: Vec<Instrument>,
}

/// A market-data provider shared by every request handler.
pub trait DataSource: Send + Sync {
    /// Name stamped on envelopes (`yahoo`, `yahoo-offline`).
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// [`SourceError`] when the provider is unreachable, throttling us, or
    /// has no price history for the ticker.
    fn bars<'a>(&'a self, req: BarsRequest) -> SourceFuture<'a, BarSeries>;

    fn fundamentals<'a>(&'a self, req: FundamentalsRequest) -> SourceFuture<'a, Fundamental>;

    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, SearchBatch>;

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>>;
}
