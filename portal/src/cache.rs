//! Shared data-fetching cache wrapped around every page.

use std::{
    any::Any,
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::RwLock,
    time::{Instant, sleep},
};
use tracing::debug;

use crate::{config::CacheConfig, error::FetchResult};

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub refetch_on_focus: bool,
    pub retry: u32,
    pub stale_time: Duration,
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            refetch_on_focus: false,
            retry: 1,
            stale_time: Duration::from_secs(5 * 60),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl From<&CacheConfig> for QueryOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            refetch_on_focus: config.refetch_on_focus,
            retry: config.retry,
            stale_time: Duration::from_secs(config.stale_time_secs),
            ..Self::default()
        }
    }
}

/// Stable cache key: a scope plus the serialized query parameters.
pub fn query_key<P: Serialize + ?Sized>(scope: &str, params: &P) -> String {
    match serde_json::to_string(params) {
        Ok(encoded) => format!("{scope}:{encoded}"),
        Err(_) => scope.to_string(),
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
    invalidated: bool,
}

impl Entry {
    fn is_stale(&self, stale_time: Duration) -> bool {
        self.invalidated || self.fetched_at.elapsed() >= stale_time
    }
}

pub struct QueryCache {
    options: QueryOptions,
    entries: RwLock<HashMap<String, Entry>>,
}

impl QueryCache {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            options,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Serve a fresh cached value for `key`, or run `fetcher` with the configured retries.
    pub async fn fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> FetchResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        if let Some(hit) = self.fresh::<T>(key).await {
            debug!(key, "query cache hit");
            return Ok(hit);
        }
        self.evict_stale().await;

        let mut attempt = 0;
        let value = loop {
            match fetcher().await {
                Ok(value) => break value,
                Err(err) if attempt < self.options.retry => {
                    attempt += 1;
                    debug!(key, attempt, error = %err, "query failed; retrying");
                    if !self.options.retry_delay.is_zero() {
                        sleep(self.options.retry_delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        };

        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: Arc::new(value.clone()),
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
        Ok(value)
    }

    async fn fresh<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.is_stale(self.options.stale_time) {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Forget every entry that could no longer be served. Returns how many went.
    pub async fn evict_stale(&self) -> usize {
        let stale_time = self.options.stale_time;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(stale_time));
        before - entries.len()
    }

    pub async fn invalidate(&self, key: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Window focus regained. Only marks entries stale when refetch-on-focus is enabled.
    pub async fn on_focus(&self) {
        if !self.options.refetch_on_focus {
            return;
        }
        for entry in self.entries.write().await.values_mut() {
            entry.invalidated = true;
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}
