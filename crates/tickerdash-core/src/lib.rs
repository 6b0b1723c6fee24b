//! # tickerdash core
//!
//! Everything behind the stock dashboard that is not presentation:
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Validated tickers, bars, fundamentals, intervals, timestamps |
//! | [`data_source`] | The [`DataSource`] contract and its request types |
//! | [`adapters`] | Yahoo Finance adapter with a synthetic offline mode |
//! | [`http_client`] | Transport seam (`reqwest` in production, scripted in tests) |
//! | [`cache`] | Process-local TTL cache |
//! | [`circuit_breaker`] / [`retry`] / [`throttling`] | Upstream resilience |
//! | [`indicators`] | MA, VWAP, RSI, MACD, Bollinger Bands |
//! | [`scoring`] | Buy-score heuristic, verdict and guidance checklist |
//! | [`resolver`] | Company name or free text to ticker |
//! | [`scan`] | Preset sector watchlists |
//! | [`session`] | Per-browser UI state |
//! | [`dashboard`] | The service the web server and CLI call |
//! | [`config`] | TOML + environment configuration |
//! | [`envelope`] | JSON response envelope |
//!
//! ## Flow
//!
//! ```text
//! query ──▶ TickerResolver ──▶ CacheStore ──miss──▶ DataSource ──▶ HttpClient
//!                                   │
//!                                   ▼
//!                  indicators::compute ──▶ scoring::score / guidance
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use tickerdash_core::{DashboardService, Interval};
//!
//! let service = DashboardService::offline();
//! let analysis = service.analyze("삼성전자", Interval::OneDay, None).await?;
//! println!("{} {} {}", analysis.name, analysis.score.value, analysis.verdict.label());
//! ```
//!
//! ## Errors
//!
//! Each layer has its own error: [`ValidationError`] for inputs,
//! [`SourceError`] for upstream calls, [`AnalysisError`] for too little
//! history, and [`DashboardError`] wrapping all three for callers.

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod dashboard;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod provider_policy;
pub mod resolver;
pub mod retry;
pub mod scan;
pub mod scoring;
pub mod session;
pub mod throttling;

pub use adapters::{YahooAdapter, YahooAuthManager};
pub use cache::{CacheStats, CacheStore};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, Cooldown, TripReason,
};
pub use config::{ConfigError, DashboardConfig};
pub use dashboard::{Analysis, DashboardError, DashboardService, MarketSnapshot, ServiceHealth};
pub use data_source::{
    BarsRequest, DataSource, Endpoint, FundamentalsRequest, HealthState, HealthStatus,
    SearchBatch, SearchRequest, SourceError, SourceErrorKind, SourceFuture,
};
pub use domain::{
    AssetClass, Bar, BarSeries, Fundamental, HistoryRange, Instrument, Interval, Market, Symbol,
    UtcDateTime,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{AnalysisError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};
pub use indicators::{IndicatorConfig, IndicatorFrame, IndicatorSnapshot, RsiSmoothing};
pub use provider_policy::{BackoffPolicy, ProviderPolicy};
pub use resolver::{Resolution, ResolutionSource, TickerResolver};
pub use retry::RetryConfig;
pub use scan::{ScanFailure, ScanHit, ScanPreset, ScanReport};
pub use scoring::{
    GuidanceLine, GuidanceStatus, GuidanceTopic, PositionSummary, Score, ScoringConfig, Verdict,
};
pub use session::{SessionId, SessionState, SessionStore};
pub use throttling::{ThrottleExhausted, ThrottlingQueue};
