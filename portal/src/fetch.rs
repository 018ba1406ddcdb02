//! Single fetch wrapper: every backend call names what happens when it fails.

use std::future::Future;

use serde::Serialize;
use tracing::{error, warn};

use crate::error::{FetchError, FetchResult};

pub enum FallbackPolicy<T> {
    /// Hand the error to the caller, which shows it as an alert or banner.
    Surface,
    /// Substitute locally generated data and mark the result synthetic.
    Synthesize(Box<dyn FnOnce() -> T + Send>),
    /// Log a warning and carry on without a result.
    LogAndIgnore,
}

impl<T> FallbackPolicy<T> {
    pub fn synthesize<F>(generate: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        FallbackPolicy::Synthesize(Box::new(generate))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FallbackPolicy::Surface => "surface",
            FallbackPolicy::Synthesize(_) => "synthesize",
            FallbackPolicy::LogAndIgnore => "log_and_ignore",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "data", rename_all = "snake_case")]
pub enum Fetched<T> {
    Live(T),
    Synthetic(T),
    Skipped,
}

impl<T> Fetched<T> {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Fetched::Synthetic(_))
    }

    pub fn into_inner(self) -> Option<T> {
        match self {
            Fetched::Live(data) | Fetched::Synthetic(data) => Some(data),
            Fetched::Skipped => None,
        }
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Fetched::Live(data) | Fetched::Synthetic(data) => Some(data),
            Fetched::Skipped => None,
        }
    }
}

pub async fn fetch_with<T, F>(
    call_site: &'static str,
    call: F,
    policy: FallbackPolicy<T>,
) -> FetchResult<Fetched<T>>
where
    F: Future<Output = FetchResult<T>>,
{
    match call.await {
        Ok(data) => Ok(Fetched::Live(data)),
        Err(err) => apply_policy(call_site, err, policy),
    }
}

fn apply_policy<T>(
    call_site: &'static str,
    err: FetchError,
    policy: FallbackPolicy<T>,
) -> FetchResult<Fetched<T>> {
    match policy {
        FallbackPolicy::Surface => {
            error!(call_site, error = %err, "backend call failed");
            Err(err)
        }
        FallbackPolicy::Synthesize(generate) => {
            warn!(call_site, error = %err, "backend call failed; substituting synthetic data");
            Ok(Fetched::Synthetic(generate()))
        }
        FallbackPolicy::LogAndIgnore => {
            warn!(call_site, error = %err, "backend call failed; ignoring");
            Ok(Fetched::Skipped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refused() -> FetchError {
        FetchError::Transport("connection refused".into())
    }

    #[tokio::test]
    async fn live_results_pass_through_every_policy() {
        let fetched = fetch_with("test", async { Ok(7) }, FallbackPolicy::synthesize(|| 0))
            .await
            .unwrap();
        assert_eq!(fetched, Fetched::Live(7));
    }

    #[tokio::test]
    async fn surface_returns_the_error() {
        let result = fetch_with::<u8, _>("test", async { Err(refused()) }, FallbackPolicy::Surface).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn synthesize_marks_substituted_data() {
        let fetched = fetch_with("test", async { Err(refused()) }, FallbackPolicy::synthesize(|| 3))
            .await
            .unwrap();
        assert!(fetched.is_synthetic());
        assert_eq!(fetched.into_inner(), Some(3));
    }

    #[tokio::test]
    async fn log_and_ignore_skips() {
        let fetched = fetch_with::<u8, _>("test", async { Err(refused()) }, FallbackPolicy::LogAndIgnore)
            .await
            .unwrap();
        assert_eq!(fetched, Fetched::Skipped);
        assert_eq!(FallbackPolicy::<u8>::LogAndIgnore.name(), "log_and_ignore");
    }
}
