//! HTTP front end for tickerdash: an HTML dashboard with an inline SVG
//! candlestick chart, a small JSON API, and cookie-scoped sessions.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /` | Dashboard for `?q=` (and optional `interval=`) |
//! | `POST /refresh` | Clear the response cache |
//! | `POST /cost-basis` | Set or clear the session's average cost |
//! | `GET /scan/{preset}` | Sector scan results page |
//! | `GET /api/analysis` | Analysis as a JSON envelope |
//! | `GET /api/search` | Symbol search |
//! | `GET /api/scan/{preset}` | Sector scan as JSON |
//! | `GET /api/presets` | Scan presets |
//! | `GET /health` | Source health and cache counters |

pub mod chart;
mod error;
mod handlers;
pub mod render;
mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::WebError;
pub use state::{AppState, SESSION_COOKIE};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/refresh", post(handlers::refresh))
        .route("/cost-basis", post(handlers::cost_basis))
        .route("/scan/:preset", get(handlers::scan_page))
        .route("/api/analysis", get(handlers::api_analysis))
        .route("/api/search", get(handlers::api_search))
        .route("/api/scan/:preset", get(handlers::api_scan))
        .route("/api/presets", get(handlers::api_presets))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `bind` and serves until Ctrl-C.
///
/// # Errors
///
/// [`WebError::Bind`] when the address is invalid or already taken, and
/// [`WebError::Io`] when the server stops abnormally.
pub async fn serve(state: AppState, bind: &str) -> Result<(), WebError> {
    let addr: SocketAddr = bind.parse().map_err(|_| WebError::Bind {
        addr: bind.to_owned(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a socket address"),
    })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| WebError::Bind {
            addr: bind.to_owned(),
            source,
        })?;

    tracing::info!(%addr, source = state.service.source_name(), "dashboard listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "could not listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
