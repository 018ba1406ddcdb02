pub mod admin;
pub mod client;
pub mod pages;

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{Router, http::StatusCode, routing::get};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use uuid::Uuid;

pub use admin::admin_routes;
pub use client::client_routes;
pub use pages::page_routes;

use crate::{
    api::CreditApi, cache::QueryCache, config::AppConfig, dashboard::AdminDashboard,
    wizard::ApplicationWizard,
};

pub(crate) type ApiError = (StatusCode, String);

struct Slot<T> {
    session: Arc<Mutex<T>>,
    last_seen: Instant,
}

/// Per-visitor state, addressed by the id handed out on creation.
pub struct SessionStore<T> {
    sessions: Mutex<HashMap<Uuid, Slot<T>>>,
}

impl<T> Default for SessionStore<T> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SessionStore<T> {
    pub async fn create(&self, value: T) -> (Uuid, Arc<Mutex<T>>) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(value));
        let slot = Slot {
            session: session.clone(),
            last_seen: Instant::now(),
        };
        self.sessions.lock().await.insert(id, slot);
        (id, session)
    }

    /// Looks a session up and marks it as recently used.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<T>>> {
        let mut sessions = self.sessions.lock().await;
        let slot = sessions.get_mut(&id)?;
        slot.last_seen = Instant::now();
        Some(slot.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }

    /// Drops sessions untouched for `idle`. A session some request still holds is kept.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, slot| {
            slot.last_seen.elapsed() < idle || Arc::strong_count(&slot.session) > 1
        });
        before - sessions.len()
    }

    pub(crate) async fn require(&self, id: Uuid) -> Result<Arc<Mutex<T>>, ApiError> {
        self.get(id).await.ok_or_else(|| unknown_session(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub api: Arc<dyn CreditApi>,
    pub cache: Arc<QueryCache>,
    pub client_sessions: SessionStore<ApplicationWizard>,
    pub admin_sessions: SessionStore<AdminDashboard>,
}

impl AppState {
    pub fn new(config: AppConfig, api: Arc<dyn CreditApi>) -> Self {
        let cache = QueryCache::new((&config.cache).into());
        Self {
            config: Arc::new(config),
            api,
            cache: Arc::new(cache),
            client_sessions: SessionStore::default(),
            admin_sessions: SessionStore::default(),
        }
    }

    /// One housekeeping pass: idle sessions and stale cache entries go.
    pub async fn sweep(&self) -> usize {
        let idle = self.config.sessions.idle_timeout();
        let clients = self.client_sessions.evict_idle(idle).await;
        let admins = self.admin_sessions.evict_idle(idle).await;
        let cached = self.cache.evict_stale().await;
        if clients + admins > 0 {
            info!(clients, admins, "expired idle sessions");
        }
        debug!(cached, "evicted stale query cache entries");
        clients + admins + cached
    }
}

/// Runs [`AppState::sweep`] on the configured interval until the runtime stops.
pub fn spawn_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.sessions.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.sweep().await;
        }
    })
}

#[derive(Debug, Serialize)]
pub struct SessionCreated<V> {
    pub session_id: Uuid,
    pub view: V,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(page_routes())
        .merge(client_routes())
        .merge(admin_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[inline]
async fn health() -> &'static str {
    "ok"
}

pub(crate) fn unknown_session(id: Uuid) -> ApiError {
    (StatusCode::NOT_FOUND, format!("unknown session {id}"))
}

pub(crate) fn bad_request(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, err.to_string())
}

pub(crate) fn conflict(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::CONFLICT, err.to_string())
}

pub(crate) fn bad_gateway(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_GATEWAY, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_isolated_by_id() {
        let store: SessionStore<u32> = SessionStore::default();
        let (a, _) = store.create(1).await;
        let (b, session) = store.create(2).await;
        *session.lock().await += 40;

        assert_ne!(a, b);
        assert_eq!(*store.get(a).await.unwrap().lock().await, 1);
        assert_eq!(*store.get(b).await.unwrap().lock().await, 42);
        assert_eq!(store.len().await, 2);
        let missing = store.require(Uuid::new_v4()).await.err().unwrap();
        assert_eq!(missing.0, StatusCode::NOT_FOUND);
        assert!(store.remove(a).await);
        assert!(!store.remove(a).await);
        assert!(store.get(a).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted() {
        let store: SessionStore<u32> = SessionStore::default();
        let (stale, _) = store.create(1).await;
        let (touched, _) = store.create(2).await;
        let (_, held) = store.create(3).await;

        tokio::time::advance(Duration::from_secs(50)).await;
        store.get(touched).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 1);
        assert!(store.get(stale).await.is_none());
        assert!(store.get(touched).await.is_some());
        assert_eq!(store.len().await, 2);

        drop(held);
        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 2);
        assert_eq!(store.len().await, 0);
    }
}
