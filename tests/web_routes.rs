//! The browser and JSON surfaces, driven through the router without a socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tickerdash_core::{DashboardConfig, Interval, SessionStore};
use tickerdash_tests::{service_with, uptrend, StubSource};
use tickerdash_web::{router, AppState, SESSION_COOKIE};
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("response")
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

async fn json(response: Response) -> serde_json::Value {
    serde_json::from_str(&text(response).await).expect("json body")
}

/// `name=value` part of the session cookie.
fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_owned)
        .expect("session cookie")
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

fn cost_basis_form(cookie: &str, value: &str) -> Request<Body> {
    Request::post("/cost-basis")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("cost_basis={value}")))
        .expect("request")
}

#[tokio::test]
async fn visitor_can_save_a_cost_basis_and_see_their_return() {
    let app = router(AppState::offline());

    // Given: a visitor who opened the dashboard on NVDA
    let first = send(&app, Request::get("/?q=NVDA").body(Body::empty()).expect("request")).await;
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = session_cookie(&first);
    assert!(cookie.starts_with(SESSION_COOKIE));

    // When: they save an average cost with a thousands separator
    let saved = send(&app, cost_basis_form(&cookie, "1%2C250")).await;
    assert_eq!(saved.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&saved), Some("/"));

    // Then: the next page view remembers the ticker and shows the return
    let page = send(
        &app,
        Request::get("/")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    let html = text(page).await;
    assert!(html.contains("NVDA"));
    assert!(html.contains("💼 내 수익률"));
    assert!(html.contains(r#"value="1250""#));
}

#[tokio::test]
async fn invalid_cost_basis_redirects_with_a_warning() {
    let app = router(AppState::offline());
    let first = send(&app, Request::get("/").body(Body::empty()).expect("request")).await;
    let cookie = session_cookie(&first);

    let rejected = send(&app, cost_basis_form(&cookie, "-5")).await;
    assert_eq!(rejected.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&rejected), Some("/?error=cost_basis"));

    let page = send(
        &app,
        Request::get("/?error=cost_basis")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert!(text(page).await.contains("평단가는 0보다 큰 숫자로"));
}

#[tokio::test]
async fn search_history_shows_in_the_sidebar() {
    let app = router(AppState::offline());
    let first = send(&app, Request::get("/?q=AAPL").body(Body::empty()).expect("request")).await;
    let cookie = session_cookie(&first);

    let page = send(
        &app,
        Request::get("/?q=TSLA")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    let html = text(page).await;

    assert!(html.contains("최근 검색"));
    let tsla = html.find("q=TSLA").expect("TSLA link");
    let aapl = html.find("q=AAPL").expect("AAPL link");
    assert!(tsla < aapl, "most recent query is listed first");
}

#[tokio::test]
async fn new_visitors_start_on_the_configured_interval() {
    let config = DashboardConfig {
        offline: true,
        default_interval: Interval::OneWeek,
        ..DashboardConfig::default()
    };
    let app = router(AppState::from_config(&config).expect("state"));

    let page = send(&app, Request::get("/").body(Body::empty()).expect("request")).await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = text(page).await;

    assert!(html.contains(r#"value="1wk" selected"#));
    assert!(!html.contains(r#"value="1d" selected"#));
}

#[tokio::test]
async fn rate_limited_upstream_shows_banner_and_429() {
    let source = Arc::new(StubSource::new(uptrend(80)).rate_limited());
    let state = AppState::new(service_with(source), SessionStore::new("AAPL", 5));
    let app = router(state);

    let page = send(&app, Request::get("/").body(Body::empty()).expect("request")).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(text(page).await.contains("API 호출 한도 초과"));

    let api = send(
        &app,
        Request::get("/api/analysis?q=AAPL").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(api.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json(api).await;
    assert_eq!(body["error"]["code"], "source.rate_limited");
    assert_eq!(body["error"]["retryable"], true);
}

#[tokio::test]
async fn bad_interval_on_the_api_is_a_bad_request() {
    let app = router(AppState::offline());
    let response = send(
        &app,
        Request::get("/api/analysis?q=AAPL&interval=2d")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scan_page_and_api_agree() {
    let app = router(AppState::offline());

    let page = send(
        &app,
        Request::get("/scan/bigtech?cutoff=0").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(text(page).await.contains("미국 빅테크"));

    let api = send(
        &app,
        Request::get("/api/scan/bigtech?cutoff=0").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(api.status(), StatusCode::OK);
    let body = json(api).await;
    assert_eq!(body["data"]["preset"], "bigtech");
    assert_eq!(body["data"]["evaluated"], 5);
}

#[tokio::test]
async fn presets_search_and_health_are_served_as_json() {
    let app = router(AppState::offline());

    let presets = json(send(&app, Request::get("/api/presets").body(Body::empty()).expect("request")).await).await;
    assert_eq!(presets.as_array().map(Vec::len), Some(5));

    let search = send(
        &app,
        Request::get("/api/search?q=apple&limit=3").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(search.status(), StatusCode::OK);
    let search = json(search).await;
    assert!(search["data"]["results"].is_array());

    let health = json(send(&app, Request::get("/health").body(Body::empty()).expect("request")).await).await;
    assert_eq!(health["status"], "ok");
    assert!(health["source"].as_str().is_some());
    assert_eq!(health["source_status"]["state"], "healthy");
    assert!(health["cache"].is_object());
}
