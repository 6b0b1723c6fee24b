//! Shared fixtures for the behaviour tests: a scripted [`DataSource`] and
//! bar-series builders.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub use tickerdash_core::{
    Bar, BarSeries, BarsRequest, CacheStore, DashboardService, DataSource, Fundamental,
    FundamentalsRequest, HealthStatus, Interval, SearchBatch, SearchRequest, SourceError, Symbol,
    UtcDateTime,
};

type Pinned<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Daily bars starting 2024-01-01, one per close.
pub fn series(symbol: &str, closes: &[f64]) -> BarSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let ts = UtcDateTime::from_unix_timestamp(1_704_067_200 + i as i64 * 86_400)
                .expect("timestamp");
            Bar::new(ts, *close, close + 1.0, close - 1.0, *close, Some(10_000))
                .expect("valid bar")
        })
        .collect();
    BarSeries::new(Symbol::parse(symbol).expect("symbol"), Interval::OneDay, bars)
}

/// Uptrend with a pullback every third bar; the last close sits above both
/// the moving average and VWAP.
pub fn uptrend(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 100.0 + i as f64 * 0.5 + if i % 3 == 0 { -1.2 } else { 0.0 })
        .collect()
}

/// Steady decline; the last close is under both MA and VWAP.
pub fn downtrend(len: usize) -> Vec<f64> {
    (0..len).map(|i| 300.0 - i as f64 * 1.5).collect()
}

/// Scripted source: fixed closes for every symbol, selected symbols fail.
pub struct StubSource {
    closes: Vec<f64>,
    failing: BTreeSet<String>,
    rate_limited: bool,
    bar_calls: AtomicUsize,
}

impl StubSource {
    pub fn new(closes: Vec<f64>) -> Self {
        Self {
            closes,
            failing: BTreeSet::new(),
            rate_limited: false,
            bar_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_for(mut self, symbols: &[&str]) -> Self {
        self.failing = symbols.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    /// Every call answers like an exhausted quota.
    pub fn rate_limited(mut self) -> Self {
        self.rate_limited = true;
        self
    }

    pub fn bar_calls(&self) -> usize {
        self.bar_calls.load(Ordering::SeqCst)
    }
}

impl DataSource for StubSource {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> Pinned<'a, Result<BarSeries, SourceError>> {
        Box::pin(async move {
            self.bar_calls.fetch_add(1, Ordering::SeqCst);
            if self.rate_limited {
                return Err(SourceError::rate_limited("Too Many Requests"));
            }
            if self.failing.contains(req.symbol.as_str()) {
                return Err(SourceError::not_found(format!("no chart for {}", req.symbol)));
            }
            Ok(series(req.symbol.as_str(), &self.closes))
        })
    }

    fn fundamentals<'a>(
        &'a self,
        req: FundamentalsRequest,
    ) -> Pinned<'a, Result<Fundamental, SourceError>> {
        Box::pin(async move {
            Err(SourceError::not_found(format!(
                "no fundamentals for {}",
                req.symbol
            )))
        })
    }

    fn search<'a>(&'a self, req: SearchRequest) -> Pinned<'a, Result<SearchBatch, SourceError>> {
        Box::pin(async move {
            if self.rate_limited {
                return Err(SourceError::rate_limited("Too Many Requests"));
            }
            Ok(SearchBatch {
                query: req.query,
                results: Vec::new(),
            })
        })
    }

    fn health<'a>(&'a self) -> Pinned<'a, HealthStatus> {
        Box::pin(async { HealthStatus::healthy() })
    }
}

/// Service over `source` with a default-TTL cache.
pub fn service_with(source: Arc<StubSource>) -> DashboardService {
    DashboardService::new(source, CacheStore::default())
}
