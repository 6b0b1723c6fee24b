use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tickerdash_core::scan::ScanPreset;
use tickerdash_core::{
    Analysis, Envelope, EnvelopeMeta, Interval, ScanReport, SearchBatch, SessionId,
    SessionState, ValidationError,
};

use crate::render::{self, BannerKind, Sidebar};
use crate::{AppState, WebError, SESSION_COOKIE};

/// Loads the caller's session, minting one (and its cookie) when needed.
async fn session(state: &AppState, jar: CookieJar) -> (CookieJar, SessionId, SessionState) {
    let presented = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<SessionId>().ok());
    let (id, session) = state.sessions.get_or_create(presented).await;
    let jar = if presented == Some(id) {
        jar
    } else {
        jar.add(
            Cookie::build((SESSION_COOKIE, id.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        )
    };
    (jar, id, session)
}

fn envelope<T>(
    state: &AppState,
    started: Instant,
    cache_hit: bool,
    data: T,
) -> Result<Envelope<T>, WebError> {
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let meta = EnvelopeMeta::new(
        uuid::Uuid::new_v4().to_string(),
        state.service.source_name(),
        latency_ms,
        cache_hit,
    )?;
    Ok(Envelope::success(meta, data))
}

fn parse_interval(raw: Option<&str>) -> Result<Option<Interval>, ValidationError> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse)
        .transpose()
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    q: Option<String>,
    interval: Option<String>,
    error: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<IndexParams>,
) -> Response {
    state.sessions.purge_idle(state.session_idle).await;
    state.service.cache().purge_expired().await;
    let (jar, id, mut current) = session(&state, jar).await;
    let mut banners = String::new();

    if let Some(query) = params.q.as_deref() {
        current = state.sessions.select(id, query).await;
    }
    match parse_interval(params.interval.as_deref()) {
        Ok(Some(interval)) => current = state.sessions.set_interval(id, interval).await,
        Ok(None) => {}
        Err(error) => banners.push_str(&render::banner(BannerKind::Warning, &error.to_string())),
    }
    if params.error.as_deref() == Some("cost_basis") {
        banners.push_str(&render::banner(
            BannerKind::Warning,
            "⚠️ 평단가는 0보다 큰 숫자로 입력해주세요.",
        ));
    }

    let main = match state
        .service
        .analyze(&current.selected, current.interval, current.cost_basis)
        .await
    {
        Ok(analysis) => format!("{banners}{}", render::dashboard(&analysis)),
        Err(error) => {
            tracing::warn!(query = %current.selected, code = error.code(), %error, "analysis failed");
            let kind = if error.is_rate_limited() {
                BannerKind::Warning
            } else {
                BannerKind::Error
            };
            format!("{banners}{}", render::banner(kind, &error.user_message()))
        }
    };

    let sidebar = Sidebar {
        session: &current,
        presets: state.service.presets(),
    };
    let html = render::page(&current.selected, &sidebar, &main);
    (jar, Html(html)).into_response()
}

pub async fn refresh(State(state): State<AppState>) -> Redirect {
    state.service.refresh().await;
    Redirect::to("/")
}

#[derive(Debug, Deserialize)]
pub struct CostBasisForm {
    #[serde(default)]
    cost_basis: String,
}

pub async fn cost_basis(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CostBasisForm>,
) -> Response {
    let (jar, id, _) = session(&state, jar).await;
    let raw = form.cost_basis.trim().replace(',', "");

    let parsed = if raw.is_empty() {
        Ok(None)
    } else {
        raw.parse::<f64>()
            .map(Some)
            .map_err(|_| ValidationError::InvalidCostBasis)
    };
    let outcome = match parsed {
        Ok(value) => state.sessions.set_cost_basis(id, value).await.map(|_| ()),
        Err(error) => Err(error),
    };

    let target = match outcome {
        Ok(()) => "/",
        Err(error) => {
            tracing::debug!(%error, raw = %form.cost_basis, "rejected cost basis");
            "/?error=cost_basis"
        }
    };
    (jar, Redirect::to(target)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanParams {
    cutoff: Option<u8>,
}

pub async fn scan_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(preset): Path<String>,
    Query(params): Query<ScanParams>,
) -> Response {
    let (jar, _, current) = session(&state, jar).await;
    let (title, main) = match state.service.scan(&preset, params.cutoff).await {
        Ok(report) => (report.label.clone(), render::scan_report(&report)),
        Err(error) => (
            String::from("scan"),
            render::banner(BannerKind::Error, &error.user_message()),
        ),
    };
    let sidebar = Sidebar {
        session: &current,
        presets: state.service.presets(),
    };
    (jar, Html(render::page(&title, &sidebar, &main))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct AnalysisParams {
    q: String,
    interval: Option<String>,
    cost_basis: Option<f64>,
}

pub async fn api_analysis(
    State(state): State<AppState>,
    Query(params): Query<AnalysisParams>,
) -> Result<Json<Envelope<Analysis>>, WebError> {
    let started = Instant::now();
    let interval = parse_interval(params.interval.as_deref())?.unwrap_or(state.default_interval);
    let analysis = state
        .service
        .analyze(&params.q, interval, params.cost_basis)
        .await?;

    let cache_hit = analysis.snapshot.cache_hit;
    let mut body = envelope(&state, started, cache_hit, analysis)?;
    for warning in body.data.warnings.clone() {
        body.meta.push_warning(warning);
    }
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    limit: Option<usize>,
}

pub async fn api_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<SearchBatch>>, WebError> {
    let started = Instant::now();
    let limit = params.limit.unwrap_or(state.service.search_limit());
    let (batch, cache_hit) = state.service.search(&params.q, limit).await?;
    Ok(Json(envelope(&state, started, cache_hit, batch)?))
}

pub async fn api_scan(
    State(state): State<AppState>,
    Path(preset): Path<String>,
    Query(params): Query<ScanParams>,
) -> Result<Json<Envelope<ScanReport>>, WebError> {
    let started = Instant::now();
    let report = state.service.scan(&preset, params.cutoff).await?;
    Ok(Json(envelope(&state, started, false, report)?))
}

pub async fn api_presets(State(state): State<AppState>) -> Json<&'static [ScanPreset]> {
    Json(state.service.presets())
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    sessions: usize,
    #[serde(flatten)]
    service: tickerdash_core::ServiceHealth,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let service = state.service.health().await;
    let sessions = state.sessions.len().await;
    let status = match service.source_status.state {
        tickerdash_core::HealthState::Healthy => "ok",
        _ => "degraded",
    };
    Json(Health {
        status,
        sessions,
        service,
    })
}
