use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::adapters::synthetic;
use crate::circuit_breaker::{CircuitBreaker, CircuitState, TripReason};
use crate::data_source::{
    BarsRequest, DataSource, Endpoint, FundamentalsRequest, HealthState, HealthStatus,
    SearchBatch, SearchRequest, SourceError,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::retry::RetryConfig;
use crate::{AssetClass, Bar, BarSeries, Fundamental, Instrument, Symbol, UtcDateTime};

const REFERER: &str = "https://finance.yahoo.com/";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const SUMMARY_MODULES: &str = "financialData,price,summaryDetail";

// ============================================================================
// Cookie/crumb authentication
// ============================================================================

#[derive(Debug, Default)]
struct AuthState {
    crumb: Option<String>,
    refreshed_at: Option<Instant>,
}

/// Manages Yahoo Finance cookie/crumb authentication.
///
/// The unofficial endpoints want a session cookie from `fc.yahoo.com` (kept
/// by the transport's cookie jar) and a crumb token passed as a query
/// parameter. `YAHOO_COOKIE` overrides the jar for environments where the
/// cookie endpoint is blocked.
#[derive(Debug)]
pub struct YahooAuthManager {
    state: Mutex<AuthState>,
    ttl: Duration,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl YahooAuthManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(AuthState::default()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_crumb(&self) -> Option<String> {
        let state = self.lock();
        let fresh = state
            .refreshed_at
            .is_some_and(|refreshed| refreshed.elapsed() < self.ttl);
        if fresh {
            state.crumb.clone()
        } else {
            None
        }
    }

    /// Returns the cached crumb, refreshing it when missing or stale.
    pub async fn crumb(&self, http_client: &dyn HttpClient) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }

        let crumb = fetch_crumb(http_client).await?;
        let mut state = self.lock();
        state.crumb = Some(crumb.clone());
        state.refreshed_at = Some(Instant::now());
        tracing::debug!("yahoo crumb refreshed");
        Ok(crumb)
    }

    /// Drops the cached crumb so the next call refreshes it.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.crumb = None;
        state.refreshed_at = None;
    }

    /// `YAHOO_COOKIE`, when set and non-blank.
    fn env_cookie() -> Option<String> {
        std::env::var("YAHOO_COOKIE")
            .ok()
            .filter(|cookie| !cookie.trim().is_empty())
    }
}

fn browser_get(url: &str) -> HttpRequest {
    HttpRequest::get(url)
        .header("referer", REFERER)
        .cookie(YahooAuthManager::env_cookie().as_deref())
}

async fn fetch_crumb(http_client: &dyn HttpClient) -> Result<String, SourceError> {
    // fc.yahoo.com answers 404 while still setting the session cookie.
    http_client
        .execute(browser_get(COOKIE_URL))
        .await
        .map_err(|error| SourceError::unavailable(format!("failed to fetch yahoo cookie: {error}")))?;

    for endpoint in CRUMB_URLS {
        let response = match http_client.execute(browser_get(endpoint)).await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(endpoint, %error, "crumb endpoint failed");
                continue;
            }
        };

        if response.looks_rate_limited() {
            return Err(SourceError::rate_limited(
                "yahoo rate limited while fetching crumb",
            ));
        }
        let crumb = response.body.trim();
        let plausible = !crumb.is_empty() && crumb.len() < 100 && !crumb.contains(char::is_whitespace);
        if response.is_success() && !response.is_html() && plausible {
            return Ok(crumb.to_owned());
        }
    }

    Err(SourceError::unavailable(
        "failed to fetch yahoo crumb from all endpoints",
    ))
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance adapter.
///
/// With a real transport it talks to the chart, quoteSummary and search
/// endpoints. With a mock transport (see [`HttpClient::is_mock`]) it serves
/// deterministic synthetic data so the dashboard runs offline.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    auth_manager: Arc<YahooAuthManager>,
    retry: RetryConfig,
    timeout: Duration,
    use_real_api: bool,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl YahooAdapter {
    /// Synthetic offline source.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            auth_manager: Arc::new(YahooAuthManager::default()),
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(10),
            use_real_api,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub fn is_offline(&self) -> bool {
        !self.use_real_api
    }

    fn ensure_circuit_closed(&self) -> Result<(), SourceError> {
        self.circuit_breaker.check().map_err(|cooldown| {
            let wait = cooldown.remaining.as_secs().max(1);
            match cooldown.reason {
                TripReason::RateLimited => SourceError::rate_limited(format!(
                    "yahoo asked us to slow down; retry in {wait}s"
                )),
                TripReason::Failures => SourceError::unavailable(format!(
                    "yahoo is failing; calls paused for {wait}s"
                )),
            }
        })
    }

    /// Sends `request` with the crumb appended. Handles one auth refresh on 401/429, retries transient
    /// failures per [`RetryConfig`] and feeds the circuit breaker.
    async fn get_json(&self, endpoint: Endpoint, request: HttpRequest) -> Result<String, SourceError> {
        self.ensure_circuit_closed()?;

        let mut auth_refreshed = false;
        let mut attempt = 0_u32;

        loop {
            let crumb = match self.auth_manager.crumb(self.http_client.as_ref()).await {
                Ok(crumb) => crumb,
                Err(error) => {
                    self.circuit_breaker.record_failure();
                    return Err(error);
                }
            };

            let attempt_request = request
                .clone()
                .query("crumb", &crumb)
                .header("referer", REFERER)
                .cookie(YahooAuthManager::env_cookie().as_deref())
                .timeout(self.timeout);

            let response = match self.http_client.execute(attempt_request).await {
                Ok(response) => response,
                Err(error) => {
                    if self.retry.retries_transport(&error)
                        && self.pause_before_retry(endpoint, attempt, &error.to_string()).await
                    {
                        attempt += 1;
                        continue;
                    }
                    self.circuit_breaker.record_failure();
                    return Err(if error.retryable() {
                        SourceError::unavailable(format!("yahoo transport error: {error}"))
                    } else {
                        SourceError::internal(format!("yahoo transport error: {error}"))
                    });
                }
            };

            let status = response.status;
            if (status == 401 || status == 429) && !auth_refreshed {
                tracing::debug!(%endpoint, status, "refreshing yahoo auth and retrying");
                self.auth_manager.invalidate();
                auth_refreshed = true;
                continue;
            }

            if response.looks_rate_limited() {
                self.circuit_breaker.record_rate_limited();
                return Err(SourceError::rate_limited(format!(
                    "yahoo {endpoint} returned too many requests"
                )));
            }

            if status == 404 {
                self.circuit_breaker.record_success();
                return Err(SourceError::not_found(format!(
                    "yahoo {endpoint} has no data for this symbol"
                )));
            }

            if self.retry.retries_status(status)
                && self
                    .pause_before_retry(endpoint, attempt, &format!("status {status}"))
                    .await
            {
                attempt += 1;
                continue;
            }

            if !response.is_success() {
                self.circuit_breaker.record_failure();
                return Err(SourceError::unavailable(format!(
                    "yahoo {endpoint} returned status {status}"
                )));
            }

            self.circuit_breaker.record_success();
            return Ok(response.body);
        }
    }

    /// Sleeps before the next attempt; false when the retry budget is spent.
    async fn pause_before_retry(&self, endpoint: Endpoint, attempt: u32, reason: &str) -> bool {
        let Some(delay) = self.retry.delay_before_retry(attempt) else {
            return false;
        };
        tracing::warn!(
            %endpoint,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            reason,
            "retrying yahoo request"
        );
        tokio::time::sleep(delay).await;
        true
    }

    async fn fetch_real_bars(&self, req: &BarsRequest) -> Result<BarSeries, SourceError> {
        let request = HttpRequest::get(format!(
            "{CHART_URL}/{}",
            urlencoding::encode(req.symbol.as_str())
        ))
        .query("range", req.range.as_str())
        .query("interval", req.interval.as_str());
        let body = self.get_json(Endpoint::Bars, request).await?;
        parse_chart(&body, req)
    }

    async fn fetch_real_fundamentals(
        &self,
        req: &FundamentalsRequest,
    ) -> Result<Fundamental, SourceError> {
        let request = HttpRequest::get(format!(
            "{SUMMARY_URL}/{}",
            urlencoding::encode(req.symbol.as_str())
        ))
        .query("modules", SUMMARY_MODULES);
        let body = self.get_json(Endpoint::Fundamentals, request).await?;
        parse_quote_summary(&body, &req.symbol)
    }

    async fn fetch_real_search(&self, req: &SearchRequest) -> Result<SearchBatch, SourceError> {
        let request = HttpRequest::get(SEARCH_URL)
            .query("q", &req.query)
            .query("quotesCount", req.limit.to_string())
            .query("newsCount", "0");
        let body = self.get_json(Endpoint::Search, request).await?;
        parse_search(&body, req)
    }
}

impl DataSource for YahooAdapter {
    fn name(&self) -> &'static str {
        if self.use_real_api {
            "yahoo"
        } else {
            "yahoo-offline"
        }
    }

    fn bars<'a>(
        &'a self,
        req: BarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_bars(&req).await
            } else {
                self.ensure_circuit_closed()?;
                synthetic::bars(&req)
            }
        })
    }

    fn fundamentals<'a>(
        &'a self,
        req: FundamentalsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Fundamental, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_fundamentals(&req).await
            } else {
                self.ensure_circuit_closed()?;
                synthetic::fundamentals(&req.symbol)
            }
        })
    }

    fn search<'a>(
        &'a self,
        req: SearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SearchBatch, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_search(&req).await
            } else {
                self.ensure_circuit_closed()?;
                Ok(synthetic::search(&req))
            }
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move {
            match self.circuit_breaker.state() {
                CircuitState::Closed => HealthStatus::healthy(),
                CircuitState::HalfOpen => HealthStatus::new(HealthState::Degraded, true),
                CircuitState::Open => HealthStatus::new(HealthState::Unhealthy, false),
            }
        })
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl YahooApiError {
    fn into_source_error(self, endpoint: Endpoint) -> SourceError {
        let message = format!(
            "yahoo {endpoint} error {}: {}",
            self.code,
            self.description.as_deref().unwrap_or("no description")
        );
        if self.code.eq_ignore_ascii_case("not found") {
            SourceError::not_found(message)
        } else if self.code.to_ascii_lowercase().contains("too many requests") {
            SourceError::rate_limited(message)
        } else {
            SourceError::unavailable(message)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn parse_chart(body: &str, req: &BarsRequest) -> Result<BarSeries, SourceError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = response.chart.error {
        return Err(error.into_source_error(Endpoint::Bars));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::not_found(format!("no chart data for {}", req.symbol)))?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts_value) in result.timestamp.iter().enumerate() {
        let column = |values: &[Option<f64>]| values.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            column(&quote.open),
            column(&quote.high),
            column(&quote.low),
            column(&quote.close),
        ) else {
            continue;
        };

        let ts = UtcDateTime::from_unix_timestamp(ts_value)
            .map_err(|e| SourceError::internal(format!("invalid chart timestamp: {e}")))?;
        let volume = column(&quote.volume)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64);

        // Adjusted daily bars occasionally report open/close a tick outside high/low.
        let high = high.max(open).max(close);
        let low = low.min(open).min(close);

        match Bar::new(ts, open, high, low, close, volume) {
            Ok(bar) => bars.push(bar),
            Err(error) => tracing::debug!(symbol = %req.symbol, %error, "skipping invalid bar"),
        }
    }

    if bars.is_empty() {
        return Err(SourceError::not_found(format!(
            "no price history for {}",
            req.symbol
        )));
    }

    Ok(BarSeries::new(req.symbol.clone(), req.interval, bars))
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryEnvelope,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    #[serde(rename = "financialData", default)]
    financial_data: Option<FinancialData>,
    #[serde(default)]
    price: Option<PriceData>,
    #[serde(rename = "summaryDetail", default)]
    summary_detail: Option<SummaryDetail>,
}

#[derive(Debug, Deserialize)]
struct FinancialData {
    #[serde(rename = "returnOnEquity", default)]
    return_on_equity: Option<RawValue>,
    #[serde(rename = "debtToEquity", default)]
    debt_to_equity: Option<RawValue>,
    #[serde(rename = "financialCurrency", default)]
    financial_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    #[serde(rename = "longName", default)]
    long_name: Option<String>,
    #[serde(rename = "shortName", default)]
    short_name: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(rename = "marketCap", default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct SummaryDetail {
    #[serde(rename = "marketCap", default)]
    market_cap: Option<RawValue>,
    #[serde(default)]
    currency: Option<String>,
}

/// Numeric values arrive wrapped as `{"raw": 0.12, "fmt": "12.00%"}`, or as
/// `{}` when the provider has no figure.
#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: Option<&RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw).filter(|v| v.is_finite())
}

fn parse_quote_summary(body: &str, symbol: &Symbol) -> Result<Fundamental, SourceError> {
    let response: SummaryResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo fundamentals: {e}")))?;

    if let Some(error) = response.quote_summary.error {
        return Err(error.into_source_error(Endpoint::Fundamentals));
    }

    let result = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::not_found(format!("no fundamentals for {symbol}")))?;

    let financial = result.financial_data.as_ref();
    let price = result.price.as_ref();
    let detail = result.summary_detail.as_ref();

    let market_cap = raw(price.and_then(|p| p.market_cap.as_ref()))
        .or_else(|| raw(detail.and_then(|d| d.market_cap.as_ref())))
        .filter(|cap| *cap >= 0.0);
    let currency = price
        .and_then(|p| p.currency.as_deref())
        .or_else(|| detail.and_then(|d| d.currency.as_deref()))
        .or_else(|| financial.and_then(|f| f.financial_currency.as_deref()));

    Fundamental::new(symbol.clone())
        .with_names(
            price.and_then(|p| p.long_name.clone()),
            price.and_then(|p| p.short_name.clone()),
        )
        .with_currency(currency)
        .with_ratios(
            raw(financial.and_then(|f| f.return_on_equity.as_ref())),
            raw(financial.and_then(|f| f.debt_to_equity.as_ref())),
        )
        .with_market_cap(market_cap)
        .checked()
        .map_err(|e| SourceError::internal(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: String,
    #[serde(rename = "shortname", default)]
    short_name: Option<String>,
    #[serde(rename = "longname", default)]
    long_name: Option<String>,
    #[serde(rename = "exchDisp", default)]
    exchange_display: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(rename = "quoteType", default)]
    quote_type: String,
    #[serde(default)]
    currency: Option<String>,
}

fn parse_search(body: &str, req: &SearchRequest) -> Result<SearchBatch, SourceError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse search response: {e}")))?;

    let results = response
        .quotes
        .into_iter()
        .filter_map(|quote| {
            let symbol = Symbol::parse(&quote.symbol).ok()?;
            let name = quote
                .long_name
                .or(quote.short_name)
                .unwrap_or_else(|| quote.symbol.clone());
            Some(Instrument::new(
                symbol,
                name,
                quote.exchange_display.or(quote.exchange),
                quote.currency.as_deref(),
                AssetClass::from_quote_type(&quote.quote_type),
            ))
        })
        .take(req.limit)
        .collect();

    Ok(SearchBatch {
        query: req.query.clone(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::{HistoryRange, Interval};

    const CHART_BODY: &str = r#"{"chart":{"result":[{"meta":{"currency":"KRW","symbol":"005930.KS"},
        "timestamp":[1704153600,1704240000,1704326400],
        "indicators":{"quote":[{"open":[78200.0,null,76100.0],"high":[79800.0,78000.0,77000.0],
        "low":[78200.0,76600.0,76000.0],"close":[79600.0,77000.0,76600.0],
        "volume":[17142847,null,15324439]}]}}],"error":null}}"#;

    const SUMMARY_BODY: &str = r#"{"quoteSummary":{"result":[{
        "financialData":{"returnOnEquity":{"raw":0.0909,"fmt":"9.09%"},"debtToEquity":{},"financialCurrency":"KRW"},
        "price":{"longName":"Samsung Electronics Co., Ltd.","shortName":"SamsungElec","currency":"KRW","marketCap":{"raw":4.3e14}},
        "summaryDetail":{"currency":"KRW"}}],"error":null}}"#;

    const SEARCH_BODY: &str = r#"{"quotes":[
        {"symbol":"NVDA","shortname":"NVIDIA Corporation","longname":"NVIDIA Corporation","exchDisp":"NASDAQ","quoteType":"EQUITY"},
        {"symbol":"NVD.DE","shortname":"NVIDIA Corp","exchange":"GER","quoteType":"EQUITY"},
        {"symbol":"NVDL","shortname":"GraniteShares 2x Long NVDA","exchDisp":"NASDAQ","quoteType":"ETF"}]}"#;

    /// Serves canned responses by URL substring and records every request.
    struct ScriptedHttpClient {
        routes: Vec<(&'static str, Result<HttpResponse, HttpError>)>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(routes: Vec<(&'static str, Result<HttpResponse, HttpError>)>) -> Self {
            Self {
                routes,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn with_auth(mut routes: Vec<(&'static str, Result<HttpResponse, HttpError>)>) -> Self {
            routes.push(("fc.yahoo.com", Ok(HttpResponse::with_status(404, ""))));
            routes.push(("getcrumb", Ok(HttpResponse::ok_json("abc123crumb"))));
            Self::new(routes)
        }

        fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .iter()
                .map(|request| request.url.clone())
                .collect()
        }

        fn count(&self, needle: &str) -> usize {
            self.urls().iter().filter(|url| url.contains(needle)).count()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = self
                .routes
                .iter()
                .find(|(needle, _)| request.url.contains(needle))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| Err(HttpError::Rejected(String::from("no route"))));
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            Box::pin(async move { response })
        }
    }

    fn adapter(client: Arc<ScriptedHttpClient>) -> YahooAdapter {
        YahooAdapter::with_http_client(client).with_retry(RetryConfig::fixed(Duration::from_millis(1), 2))
    }

    fn samsung() -> Symbol {
        Symbol::parse("005930.KS").expect("valid symbol")
    }

    #[tokio::test]
    async fn parses_chart_and_skips_incomplete_rows() {
        let client = Arc::new(ScriptedHttpClient::with_auth(vec![(
            "/v8/finance/chart/",
            Ok(HttpResponse::ok_json(CHART_BODY)),
        )]));
        let yahoo = adapter(client.clone());

        let series = yahoo
            .bars(BarsRequest::new(samsung(), Interval::OneDay, HistoryRange::OneYear))
            .await
            .expect("chart should parse");

        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].close, 79_600.0);
        assert_eq!(series.bars[1].volume, Some(15_324_439));
        assert_eq!(series.bars[0].ts.format_date(), "2024-01-02");

        let chart_url = client
            .urls()
            .into_iter()
            .find(|url| url.contains("/chart/"))
            .expect("chart requested");
        assert!(chart_url.contains("005930.KS?range=1y&interval=1d&crumb=abc123crumb"));
    }

    #[tokio::test]
    async fn chart_error_payload_maps_to_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let client = Arc::new(ScriptedHttpClient::with_auth(vec![(
            "/chart/",
            Ok(HttpResponse::ok_json(body)),
        )]));

        let error = adapter(client)
            .bars(BarsRequest::with_default_range(samsung(), Interval::OneDay))
            .await
            .expect_err("delisted symbol must fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn http_404_maps_to_not_found() {
        let client = Arc::new(ScriptedHttpClient::with_auth(vec![(
            "/chart/",
            Ok(HttpResponse::with_status(404, "{}")),
        )]));

        let error = adapter(client)
            .bars(BarsRequest::with_default_range(samsung(), Interval::OneDay))
            .await
            .expect_err("404 must fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn parses_quote_summary_with_missing_metrics_as_none() {
        let client = Arc::new(ScriptedHttpClient::with_auth(vec![(
            "/quoteSummary/",
            Ok(HttpResponse::ok_json(SUMMARY_BODY)),
        )]));

        let fundamental = adapter(client.clone())
            .fundamentals(FundamentalsRequest::new(samsung()))
            .await
            .expect("summary should parse");

        assert_eq!(fundamental.display_name(), "Samsung Electronics Co., Ltd.");
        assert_eq!(fundamental.currency.as_deref(), Some("KRW"));
        assert_eq!(fundamental.return_on_equity, Some(0.0909));
        assert_eq!(fundamental.debt_to_equity, None);
        assert_eq!(fundamental.market_cap, Some(4.3e14));
        assert!(client
            .urls()
            .iter()
            .any(|url| url.contains("modules=financialData%2Cprice%2CsummaryDetail")));
    }

    #[tokio::test]
    async fn parses_search_results_up_to_limit() {
        let client = Arc::new(ScriptedHttpClient::with_auth(vec![(
            "/v1/finance/search",
            Ok(HttpResponse::ok_json(SEARCH_BODY)),
        )]));
        let request = SearchRequest::new("엔비디아", 2).expect("valid search");

        let batch = adapter(client.clone())
            .search(request)
            .await
            .expect("search should parse");

        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.results[0].symbol.as_str(), "NVDA");
        assert_eq!(batch.results[0].exchange.as_deref(), Some("NASDAQ"));
        assert_eq!(batch.results[1].exchange.as_deref(), Some("GER"));
        assert!(client.urls().iter().any(|url| url.contains("q=%EC%97%94")));
    }

    #[tokio::test]
    async fn rate_limit_refreshes_auth_once_then_reports_rate_limited() {
        let client = Arc::new(ScriptedHttpClient::with_auth(vec![(
            "/chart/",
            Ok(HttpResponse::with_status(429, "Too Many Requests")),
        )]));

        let yahoo = adapter(client.clone());
        let request = BarsRequest::with_default_range(samsung(), Interval::OneDay);
        let error = yahoo.bars(request.clone()).await.expect_err("429 must fail");

        assert_eq!(error.kind(), SourceErrorKind::RateLimited);
        assert_eq!(client.count("/chart/"), 2);
        assert_eq!(client.count("getcrumb"), 2);

        // The cooldown answers locally without another upstream call.
        let again = yahoo.bars(request).await.expect_err("still cooling down");
        assert_eq!(again.kind(), SourceErrorKind::RateLimited);
        assert!(again.message().contains("retry in"));
        assert_eq!(client.count("/chart/"), 2);
    }

    #[tokio::test]
    async fn retries_server_errors_then_gives_up() {
        let client = Arc::new(ScriptedHttpClient::with_auth(vec![(
            "/chart/",
            Ok(HttpResponse::with_status(503, "")),
        )]));

        let error = adapter(client.clone())
            .bars(BarsRequest::with_default_range(samsung(), Interval::OneDay))
            .await
            .expect_err("503 must fail");

        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert_eq!(client.count("/chart/"), 3);
    }

    #[tokio::test]
    async fn circuit_breaker_opens_after_repeated_transport_failures() {
        let client = Arc::new(ScriptedHttpClient::with_auth(vec![(
            "/chart/",
            Err(HttpError::Rejected(String::from("connection reset"))),
        )]));
        let yahoo = adapter(client.clone());
        let request = BarsRequest::with_default_range(samsung(), Interval::OneDay);

        for _ in 0..3 {
            let error = yahoo.bars(request.clone()).await.expect_err("call should fail");
            assert_eq!(error.kind(), SourceErrorKind::Internal);
        }

        let health = yahoo.health().await;
        assert_eq!(health.state, HealthState::Unhealthy);
        assert!(!health.rate_available);

        let error = yahoo.bars(request).await.expect_err("breaker should block request");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.message().contains("calls paused"));
        assert_eq!(client.count("/chart/"), 3);
    }

    #[tokio::test]
    async fn shared_circuit_breaker_answers_locally_while_rate_limited() {
        let client = Arc::new(ScriptedHttpClient::with_auth(Vec::new()));
        let breaker = Arc::new(CircuitBreaker::default());
        let yahoo = adapter(client.clone()).with_circuit_breaker(breaker.clone());

        breaker.record_rate_limited();
        let error = yahoo
            .bars(BarsRequest::with_default_range(samsung(), Interval::OneDay))
            .await
            .expect_err("breaker is open");

        assert_eq!(error.kind(), SourceErrorKind::RateLimited);
        assert!(error.message().contains("slow down"));
        assert_eq!(client.count("/chart/"), 0);
        assert_eq!(yahoo.health().await.state, HealthState::Unhealthy);
    }

    #[tokio::test]
    async fn offline_mode_serves_synthetic_data() {
        let yahoo = YahooAdapter::offline();
        assert!(yahoo.is_offline());
        assert_eq!(yahoo.name(), "yahoo-offline");

        let series = yahoo
            .bars(BarsRequest::with_default_range(samsung(), Interval::OneDay))
            .await
            .expect("synthetic bars");
        assert!(series.len() >= 60);
    }
}
