//! Per-browser session state: selected ticker, recent queries, cost basis.
//!
//! Sessions live in process memory only and are keyed by an opaque random id
//! carried in a cookie.

use std::collections::{HashMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::scoring::validate_cost_basis;
use crate::{Interval, ValidationError};

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.as_simple().fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub selected: String,
    pub interval: Interval,
    /// Most recent first, no duplicates.
    pub history: VecDeque<String>,
    pub cost_basis: Option<f64>,
    #[serde(skip)]
    last_seen: Instant,
}

impl SessionState {
    fn new(selected: &str, interval: Interval) -> Self {
        Self {
            selected: selected.to_owned(),
            interval,
            history: VecDeque::new(),
            cost_basis: None,
            last_seen: Instant::now(),
        }
    }

    fn push_history(&mut self, query: &str, limit: usize) {
        self.history.retain(|entry| entry != query);
        self.history.push_front(query.to_owned());
        self.history.truncate(limit);
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }
}

#[derive(Debug)]
struct StoreInner {
    sessions: HashMap<SessionId, SessionState>,
}

/// Shared, in-memory session table.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<StoreInner>>,
    default_query: Arc<str>,
    default_interval: Interval,
    history_limit: usize,
}

impl SessionStore {
    pub fn new(default_query: impl Into<String>, history_limit: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                sessions: HashMap::new(),
            })),
            default_query: Arc::from(default_query.into()),
            default_interval: Interval::default(),
            history_limit: history_limit.max(1),
        }
    }

    /// Interval that new sessions start on.
    pub fn with_default_interval(mut self, interval: Interval) -> Self {
        self.default_interval = interval;
        self
    }

    /// Returns the session for `id`, creating a fresh one when the id is
    /// missing or unknown.
    pub async fn get_or_create(&self, id: Option<SessionId>) -> (SessionId, SessionState) {
        let mut store = self.inner.write().await;
        if let Some(id) = id {
            if let Some(state) = store.sessions.get_mut(&id) {
                state.touch();
                return (id, state.clone());
            }
        }

        let id = SessionId::new();
        let state = SessionState::new(&self.default_query, self.default_interval);
        store.sessions.insert(id, state.clone());
        tracing::debug!(session = %id, "session created");
        (id, state)
    }

    pub async fn get(&self, id: SessionId) -> Option<SessionState> {
        self.inner.read().await.sessions.get(&id).cloned()
    }

    async fn update(&self, id: SessionId, apply: impl FnOnce(&mut SessionState)) -> SessionState {
        let mut store = self.inner.write().await;
        let state = store
            .sessions
            .entry(id)
            .or_insert_with(|| SessionState::new(&self.default_query, self.default_interval));
        apply(state);
        state.touch();
        state.clone()
    }

    /// Makes `query` the selected ticker and records it in the history.
    /// Blank queries leave the session unchanged.
    pub async fn select(&self, id: SessionId, query: &str) -> SessionState {
        let query = query.trim();
        let limit = self.history_limit;
        self.update(id, |state| {
            if !query.is_empty() {
                state.selected = query.to_owned();
                state.push_history(query, limit);
            }
        })
        .await
    }

    pub async fn set_interval(&self, id: SessionId, interval: Interval) -> SessionState {
        self.update(id, |state| state.interval = interval).await
    }

    /// Sets or clears the average cost basis.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidCostBasis`] for zero, negative or
    /// non-finite values; the stored value is left as it was.
    pub async fn set_cost_basis(
        &self,
        id: SessionId,
        cost_basis: Option<f64>,
    ) -> Result<SessionState, ValidationError> {
        let validated = cost_basis.map(validate_cost_basis).transpose()?;
        Ok(self.update(id, |state| state.cost_basis = validated).await)
    }

    /// Drops sessions idle for longer than `max_idle`, returning how many.
    pub async fn purge_idle(&self, max_idle: Duration) -> usize {
        let mut store = self.inner.write().await;
        let before = store.sessions.len();
        store.sessions.retain(|_, state| state.idle_for() <= max_idle);
        let purged = before - store.sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "idle sessions purged");
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn default_query(&self) -> &str {
        &self.default_query
    }
}
