//! Dashboard service: resolve, fetch through the cache, compute, score.
//!
//! The HTML server and the CLI both drive this type; neither talks to a
//! [`DataSource`] directly.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::YahooAdapter;
use crate::cache::{CacheStats, CacheStore};
use crate::config::DashboardConfig;
use crate::data_source::{
    BarsRequest, DataSource, FundamentalsRequest, HealthStatus, SearchBatch, SearchRequest,
    SourceError, SourceErrorKind,
};
use crate::http_client::ReqwestHttpClient;
use crate::indicators::{self, IndicatorConfig, IndicatorFrame, IndicatorSnapshot};
use crate::provider_policy::ProviderPolicy;
use crate::resolver::{Resolution, TickerResolver};
use crate::retry::RetryConfig;
use crate::scan::{self, ScanFailure, ScanHit, ScanPreset, ScanReport};
use crate::scoring::{self, GuidanceLine, PositionSummary, Score, ScoringConfig, Verdict};
use crate::throttling::ThrottlingQueue;
use crate::{
    AnalysisError, BarSeries, Fundamental, HistoryRange, Interval, Symbol, UtcDateTime,
    ValidationError,
};

/// Anything that stops an analysis from being produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl DashboardError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::InvalidCostBasis) => "validation.cost_basis",
            Self::Validation(ValidationError::UnknownPreset { .. }) => "validation.preset",
            Self::Validation(_) => "validation.symbol",
            Self::Source(error) => error.code(),
            Self::Analysis(AnalysisError::EmptySeries) => "analysis.empty_series",
            Self::Analysis(AnalysisError::InsufficientHistory { .. }) => {
                "analysis.insufficient_history"
            }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Source(error) if error.kind() == SourceErrorKind::RateLimited)
    }

    pub fn retryable(&self) -> bool {
        matches!(self, Self::Source(error) if error.retryable())
    }

    /// Banner text for the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            Self::Source(error) => match error.kind() {
                SourceErrorKind::RateLimited => String::from(
                    "⚠️ API 호출 한도 초과 상태입니다. 1분 뒤 다시 시도하거나 '데이터 강제 갱신'을 눌러주세요.",
                ),
                SourceErrorKind::NotFound => {
                    String::from("🔎 종목을 찾을 수 없습니다. 종목명 또는 티커를 확인해주세요.")
                }
                SourceErrorKind::Unavailable => String::from(
                    "📡 시세 서버에 연결할 수 없습니다. 잠시 후 다시 시도해주세요.",
                ),
                SourceErrorKind::InvalidRequest | SourceErrorKind::Internal => {
                    format!("⚠️ 데이터를 불러오지 못했습니다: {}", error.message())
                }
            },
            Self::Validation(ValidationError::InvalidCostBasis) => {
                String::from("⚠️ 평단가는 0보다 큰 숫자로 입력해주세요.")
            }
            Self::Validation(error) => format!("⚠️ 입력을 확인해주세요: {error}"),
            Self::Analysis(AnalysisError::InsufficientHistory { required, available }) => format!(
                "📉 지표 계산에 필요한 데이터가 부족합니다 ({available}/{required}개 봉)."
            ),
            Self::Analysis(AnalysisError::EmptySeries) => {
                String::from("📉 가격 데이터가 비어 있습니다.")
            }
        }
    }
}

/// Bars plus optional fundamentals for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    pub interval: Interval,
    pub range: HistoryRange,
    pub bars: BarSeries,
    pub fundamentals: Option<Fundamental>,
    /// Every part was served from the cache.
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MarketSnapshot {
    pub fn display_name(&self) -> &str {
        self.fundamentals
            .as_ref()
            .map_or(self.symbol.as_str(), Fundamental::display_name)
    }
}

/// Everything the dashboard shows for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub resolution: Resolution,
    pub name: String,
    pub snapshot: MarketSnapshot,
    pub frame: IndicatorFrame,
    pub latest: IndicatorSnapshot,
    pub score: Score,
    pub verdict: Verdict,
    pub guidance: Vec<GuidanceLine>,
    pub position: Option<PositionSummary>,
    pub warnings: Vec<String>,
    pub synced_at: UtcDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub source: String,
    pub source_status: HealthStatus,
    pub cache: CacheStats,
}

pub struct DashboardService {
    source: Arc<dyn DataSource>,
    cache: CacheStore,
    resolver: TickerResolver,
    indicators: IndicatorConfig,
    scoring: ScoringConfig,
    throttle: ThrottlingQueue,
    scan_cutoff: u8,
    search_limit: usize,
}

impl DashboardService {
    pub fn new(source: Arc<dyn DataSource>, cache: CacheStore) -> Self {
        Self {
            source,
            cache,
            resolver: TickerResolver::default(),
            indicators: IndicatorConfig::default(),
            scoring: ScoringConfig::default(),
            throttle: ThrottlingQueue::from_policy(&ProviderPolicy::yahoo_default()),
            scan_cutoff: scan::DEFAULT_CUTOFF,
            search_limit: 5,
        }
    }

    /// Offline synthetic source with default settings.
    pub fn offline() -> Self {
        Self::new(Arc::new(YahooAdapter::offline()), CacheStore::default())
            .with_throttle(ThrottlingQueue::from_policy(&ProviderPolicy::offline()))
    }

    /// Wires the Yahoo adapter (real or offline) and every tunable from
    /// `config`.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] when a configured alias names an invalid ticker.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, ValidationError> {
        let (adapter, policy) = if config.offline {
            (YahooAdapter::offline(), ProviderPolicy::offline())
        } else {
            let adapter = YahooAdapter::with_http_client(Arc::new(ReqwestHttpClient::new()))
                .with_timeout_ms(config.request_timeout_ms)
                .with_retry(RetryConfig::exponential(config.max_retries));
            (adapter, config.throttle.clone())
        };

        let resolver = TickerResolver::new(config.search_limit).with_aliases(
            config
                .aliases
                .iter()
                .map(|(name, ticker)| (name.as_str(), ticker.as_str())),
        )?;

        tracing::info!(
            source = adapter.name(),
            cache_ttl_secs = config.cache_ttl_secs,
            "dashboard service ready"
        );

        Ok(Self::new(Arc::new(adapter), CacheStore::new(config.cache_ttl()))
            .with_resolver(resolver)
            .with_indicators(config.indicators.clone())
            .with_scoring(config.scoring.clone())
            .with_throttle(ThrottlingQueue::from_policy(&policy))
            .with_scan_cutoff(config.scan_cutoff)
            .with_search_limit(config.search_limit))
    }

    pub fn with_resolver(mut self, resolver: TickerResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_indicators(mut self, indicators: IndicatorConfig) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottlingQueue) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_scan_cutoff(mut self, cutoff: u8) -> Self {
        self.scan_cutoff = cutoff.min(100);
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }

    pub fn scan_cutoff(&self) -> u8 {
        self.scan_cutoff
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Read-through cache helper. Returns the value and whether it was a hit.
    async fn cached<T, F, Fut>(&self, key: String, fetch: F) -> Result<(T, bool), SourceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, SourceError>>,
    {
        if let Some(value) = self.cache.get_json::<T>(&key).await {
            tracing::debug!(key = %key, "cache hit");
            return Ok((value, true));
        }
        let value = fetch().await?;
        self.cache.put_json(key, &value).await;
        Ok((value, false))
    }

    async fn fetch_bars(&self, request: BarsRequest) -> Result<(BarSeries, bool), SourceError> {
        let key = request.cache_key();
        self.cached(key, || self.source.bars(request)).await
    }

    async fn fetch_search(&self, request: SearchRequest) -> Result<(SearchBatch, bool), SourceError> {
        let key = request.cache_key();
        self.cached(key, || self.source.search(request)).await
    }

    /// Fetches bars and fundamentals for `symbol`. A fundamentals failure is
    /// reported as a warning; a bars failure is an error.
    ///
    /// # Errors
    ///
    /// [`SourceError`] from the bars request.
    pub async fn snapshot(
        &self,
        symbol: &Symbol,
        interval: Interval,
    ) -> Result<MarketSnapshot, SourceError> {
        let request = BarsRequest::with_default_range(symbol.clone(), interval);
        let range = request.range;
        let (bars, bars_hit) = self.fetch_bars(request).await?;

        let fundamentals_request = FundamentalsRequest::new(symbol.clone());
        let key = fundamentals_request.cache_key();
        let mut warnings = Vec::new();
        let (fundamentals, fundamentals_hit) = match self
            .cached(key, || self.source.fundamentals(fundamentals_request))
            .await
        {
            Ok((fundamentals, hit)) => (Some(fundamentals), hit),
            Err(error) => {
                tracing::warn!(symbol = %symbol, %error, "fundamentals unavailable");
                warnings.push(format!("fundamentals unavailable: {error}"));
                (None, false)
            }
        };

        Ok(MarketSnapshot {
            symbol: symbol.clone(),
            interval,
            range,
            bars,
            fundamentals,
            cache_hit: bars_hit && fundamentals_hit,
            warnings,
        })
    }

    /// Resolves `query`, fetches its data and produces the full analysis.
    ///
    /// # Errors
    ///
    /// [`DashboardError`] for an invalid query or cost basis, an upstream
    /// failure, or too little history for the configured indicators.
    pub async fn analyze(
        &self,
        query: &str,
        interval: Interval,
        cost_basis: Option<f64>,
    ) -> Result<Analysis, DashboardError> {
        let cost_basis = cost_basis.map(scoring::validate_cost_basis).transpose()?;
        let resolution = self
            .resolver
            .resolve(query, |request| async move {
                self.fetch_search(request).await.map(|(batch, _)| batch)
            })
            .await?;

        let snapshot = self.snapshot(&resolution.symbol, interval).await?;
        let frame = indicators::compute(&snapshot.bars, &self.indicators)?;
        let latest = frame.latest().ok_or(AnalysisError::EmptySeries)?;
        let score = scoring::score(&latest, &self.scoring);
        let guidance = scoring::guidance(&latest, snapshot.fundamentals.as_ref(), &self.scoring);
        let position = cost_basis
            .map(|cost| PositionSummary::new(cost, &latest))
            .transpose()?;

        let name = match (&snapshot.fundamentals, &resolution.name) {
            (Some(fundamentals), _) => fundamentals.display_name().to_owned(),
            (None, Some(name)) => name.clone(),
            (None, None) => resolution.symbol.to_string(),
        };
        let warnings = snapshot.warnings.clone();

        tracing::info!(
            query = %resolution.query,
            symbol = %resolution.symbol,
            score = score.value,
            verdict = score.verdict.as_str(),
            cache_hit = snapshot.cache_hit,
            "analysis complete"
        );

        Ok(Analysis {
            resolution,
            name,
            snapshot,
            frame,
            latest,
            verdict: score.verdict,
            score,
            guidance,
            position,
            warnings,
            synced_at: UtcDateTime::now(),
        })
    }

    /// Cached symbol search.
    ///
    /// # Errors
    ///
    /// [`SourceError`] for a blank query or an upstream failure.
    pub async fn search(&self, query: &str, limit: usize) -> Result<(SearchBatch, bool), SourceError> {
        let request = SearchRequest::new(query, limit)?;
        self.fetch_search(request).await
    }

    /// Runs a preset sector scan. `cutoff` defaults to the configured value.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownPreset`] when `preset_id` matches no preset.
    pub async fn scan(&self, preset_id: &str, cutoff: Option<u8>) -> Result<ScanReport, DashboardError> {
        let preset = scan::find_preset(preset_id)?;
        let cutoff = cutoff.unwrap_or(self.scan_cutoff).min(100);
        Ok(scan::run_scan(preset, cutoff, &self.throttle, |symbol| self.evaluate(symbol)).await)
    }

    async fn evaluate(&self, symbol: Symbol) -> Result<ScanHit, ScanFailure> {
        let failure = |symbol: &Symbol, error: DashboardError| ScanFailure {
            symbol: symbol.clone(),
            code: error.code().to_owned(),
            message: error.to_string(),
        };

        let request = BarsRequest::with_default_range(symbol.clone(), Interval::OneDay);
        let (bars, _) = self
            .fetch_bars(request)
            .await
            .map_err(|error| failure(&symbol, error.into()))?;
        let frame = indicators::compute(&bars, &self.indicators)
            .map_err(|error| failure(&symbol, error.into()))?;
        let latest = frame
            .latest()
            .ok_or_else(|| failure(&symbol, AnalysisError::EmptySeries.into()))?;
        let score = scoring::score(&latest, &self.scoring);

        Ok(ScanHit {
            symbol,
            close: latest.close,
            score: score.value,
            verdict: score.verdict,
        })
    }

    /// Drops every cached response ("force refresh").
    pub async fn refresh(&self) -> usize {
        let dropped = self.cache.len().await;
        self.cache.clear().await;
        tracing::info!(dropped, "cache cleared");
        dropped
    }

    pub fn presets(&self) -> &'static [ScanPreset] {
        scan::presets()
    }

    pub async fn health(&self) -> ServiceHealth {
        ServiceHealth {
            source: self.source.name().to_owned(),
            source_status: self.source.health().await,
            cache: self.cache.stats().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn analyzes_alias_query_offline() {
        let service = DashboardService::offline();
        let analysis = service
            .analyze("삼성전자", Interval::OneDay, Some(70_000.0))
            .await
            .expect("offline analysis");

        assert_eq!(analysis.resolution.symbol.as_str(), "005930.KS");
        assert!(analysis.frame.len() >= IndicatorConfig::default().required_history());
        assert_eq!(analysis.guidance.len(), 6);
        assert_eq!(
            analysis.verdict,
            Verdict::from_score(analysis.score.value, &ScoringConfig::default())
        );
        assert!(analysis.position.is_some());
        assert!(!analysis.snapshot.cache_hit);
    }

    #[tokio::test]
    async fn second_analysis_is_served_from_cache() {
        let service = DashboardService::offline();
        service.analyze("AAPL", Interval::OneDay, None).await.expect("first");
        let second = service.analyze("AAPL", Interval::OneDay, None).await.expect("second");
        assert!(second.snapshot.cache_hit);

        assert!(service.refresh().await > 0);
        assert!(service.cache().is_empty().await);
    }

    #[tokio::test]
    async fn invalid_cost_basis_fails_before_fetching() {
        let service = DashboardService::offline();
        let error = service
            .analyze("AAPL", Interval::OneDay, Some(-5.0))
            .await
            .expect_err("negative cost basis");
        assert_eq!(error, DashboardError::Validation(ValidationError::InvalidCostBasis));
        assert!(service.cache().is_empty().await);
    }

    #[test]
    fn rate_limit_message_asks_to_wait() {
        let error = DashboardError::from(SourceError::rate_limited("429"));
        assert!(error.is_rate_limited());
        assert!(error.user_message().contains("1분"));
        assert_eq!(error.code(), "source.rate_limited");
    }

    #[tokio::test]
    async fn unknown_preset_is_a_validation_error() {
        let service = DashboardService::offline();
        let error = service.scan("crypto", None).await.expect_err("unknown preset");
        assert_eq!(error.code(), "validation.preset");
    }
}
