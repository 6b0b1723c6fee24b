use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use tickerdash_core::{
    DashboardConfig, DashboardService, Interval, SessionStore, ValidationError,
};

pub const SESSION_COOKIE: &str = "tickerdash_session";

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DashboardService>,
    pub sessions: SessionStore,
    pub default_interval: Interval,
    pub session_idle: Duration,
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> SessionStore {
        state.sessions.clone()
    }
}

impl AppState {
    pub fn new(service: DashboardService, sessions: SessionStore) -> Self {
        Self {
            service: Arc::new(service),
            sessions,
            default_interval: Interval::default(),
            session_idle: Duration::from_secs(6 * 60 * 60),
        }
    }

    /// # Errors
    ///
    /// [`ValidationError`] when a configured alias is not a valid ticker.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, ValidationError> {
        let service = DashboardService::from_config(config)?;
        let sessions = SessionStore::new(config.default_query.clone(), config.history_limit)
            .with_default_interval(config.default_interval);
        Ok(Self {
            default_interval: config.default_interval,
            session_idle: config.session_idle(),
            ..Self::new(service, sessions)
        })
    }

    /// Synthetic data, default settings.
    pub fn offline() -> Self {
        Self::new(
            DashboardService::offline(),
            SessionStore::new("삼성전자", tickerdash_core::session::DEFAULT_HISTORY_LIMIT),
        )
    }
}
