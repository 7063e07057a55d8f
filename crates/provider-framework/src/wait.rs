//! # Waiting Helpers
//!
//! Supervisory code waits on providers through these helpers instead of polling state.
//! Every helper takes a `CancellationToken` (or a timeout). Cancelling only abandons the
//! caller's wait and returns [`ProviderError::Cancelled`]; the provider is untouched.
//!
//! - [`WaitExt`] adds single-instance waits to anything with [`Signals`].
//! - [`wait_for_all_ready`] waits for many instances and returns on the first failure.
//! - [`wait_for_any_error`] returns the first failure among many instances.
//! - [`wait_for_dependencies`] waits for every provider reachable from a root.

use crate::dependency::{provider_closure, Dependency};
use crate::error::{FailureCause, ProviderError};
use crate::lifecycle::Signals;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[async_trait]
pub trait WaitExt: Signals + Sync {
    /// Waits until ready. Returns the failure cause if the instance fails first, or
    /// `Cancelled` if `cancel` fires first.
    async fn wait_for_ready(&self, cancel: &CancellationToken) -> Result<(), ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let ready = self.ready_signal();
        tokio::select! {
            result = ready => result,
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        }
    }

    /// Like [`wait_for_ready`](WaitExt::wait_for_ready) with a deadline instead of a token.
    async fn wait_for_ready_timeout(&self, timeout: Duration) -> Result<(), ProviderError> {
        match tokio::time::timeout(timeout, self.ready_signal()).await {
            Ok(result) => result,
            Err(_) => {
                debug!(?timeout, "Ready wait timed out");
                Err(ProviderError::Cancelled)
            }
        }
    }

    /// Waits until the instance fails. Always returns an error: either the failure or
    /// `Cancelled`.
    async fn wait_for_error(&self, cancel: &CancellationToken) -> ProviderError {
        let errored = self.error_signal();
        tokio::select! {
            cause = errored => ProviderError::Failed(cause),
            _ = cancel.cancelled() => ProviderError::Cancelled,
        }
    }
}

impl<T: Signals + Sync + ?Sized> WaitExt for T {}

async fn all_ready(
    signals: Vec<BoxFuture<'static, Result<(), ProviderError>>>,
    cancel: &CancellationToken,
) -> Result<(), ProviderError> {
    if cancel.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }
    // Each completed signal leaves the set, so the race only covers what is still pending.
    let mut pending: FuturesUnordered<_> = signals.into_iter().collect();
    loop {
        tokio::select! {
            next = pending.next() => match next {
                None => return Ok(()),
                Some(Ok(())) => debug!(remaining = pending.len(), "Provider ready"),
                Some(Err(e)) => return Err(e),
            },
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        }
    }
}

/// Waits until every instance is ready.
///
/// Returns the first failure as soon as any instance fails, without waiting for the rest.
pub async fn wait_for_all_ready<I>(items: I, cancel: &CancellationToken) -> Result<(), ProviderError>
where
    I: IntoIterator,
    I::Item: Signals,
{
    let signals = items.into_iter().map(|item| item.ready_signal()).collect();
    all_ready(signals, cancel).await
}

/// Waits until any instance fails and returns its failure, or `Cancelled`.
pub async fn wait_for_any_error<I>(items: I, cancel: &CancellationToken) -> ProviderError
where
    I: IntoIterator,
    I::Item: Signals,
{
    let mut errors: FuturesUnordered<BoxFuture<'static, FailureCause>> =
        items.into_iter().map(|item| item.error_signal()).collect();
    tokio::select! {
        Some(cause) = errors.next() => ProviderError::Failed(cause),
        _ = cancel.cancelled() => ProviderError::Cancelled,
    }
}

/// Waits until every provider reachable from `root` is ready, failing fast.
pub async fn wait_for_dependencies<R>(
    root: &R,
    cancel: &CancellationToken,
) -> Result<(), ProviderError>
where
    R: Dependency + ?Sized,
{
    let signals: Vec<_> = provider_closure(root)
        .iter()
        .filter_map(|node| node.as_lifecycle().map(|lifecycle| lifecycle.ready_signal()))
        .collect();
    debug!(count = signals.len(), "Waiting for dependencies");
    all_ready(signals, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Lifecycle, ProviderState};
    use std::time::Instant;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn ready_timeout_leaves_instance_loading() {
        let lifecycle = Lifecycle::with_defaults("slow");
        let err = lifecycle
            .wait_for_ready_timeout(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(lifecycle.state(), ProviderState::Loading);
    }

    #[tokio::test]
    async fn cancelled_token_abandons_wait() {
        let lifecycle = Lifecycle::with_defaults("slow");
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = timeout(WAIT, lifecycle.wait_for_ready(&cancel))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(lifecycle.state(), ProviderState::Loading);
    }

    #[tokio::test]
    async fn wait_for_ready_returns_original_cause() {
        let lifecycle = Lifecycle::with_defaults("broken");
        lifecycle.fail("bad credentials");
        let err = lifecycle
            .wait_for_ready(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "bad credentials");
    }

    #[tokio::test]
    async fn wait_for_error_distinguishes_cancellation() {
        let lifecycle = Lifecycle::with_defaults("healthy");
        lifecycle.mark_ready();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(lifecycle.wait_for_error(&cancel).await.is_cancelled());

        lifecycle.fail("disconnected");
        let err = lifecycle.wait_for_error(&CancellationToken::new()).await;
        assert_eq!(err.to_string(), "disconnected");
    }

    #[tokio::test]
    async fn all_ready_returns_first_failure_promptly() {
        let first = Lifecycle::with_defaults("first");
        let second = Lifecycle::with_defaults("second");
        let third = Lifecycle::with_defaults("third");
        let handle = second.handle();
        tokio::spawn(async move {
            handle.fail("second exploded");
        });

        let started = Instant::now();
        let err = timeout(
            WAIT,
            wait_for_all_ready([&first, &second, &third], &CancellationToken::new()),
        )
        .await
        .expect("wait should not hang on the pending instances")
        .unwrap_err();

        assert_eq!(err.to_string(), "second exploded");
        assert!(started.elapsed() < WAIT);
        assert_eq!(first.state(), ProviderState::Loading);
        assert_eq!(third.state(), ProviderState::Loading);
    }

    #[tokio::test]
    async fn all_ready_succeeds_when_everything_is_ready() {
        let lifecycles: Vec<_> = (0..3)
            .map(|i| Lifecycle::with_defaults(format!("p{i}")))
            .collect();
        let handles: Vec<_> = lifecycles.iter().map(Lifecycle::handle).collect();
        tokio::spawn(async move {
            for handle in handles {
                tokio::time::sleep(Duration::from_millis(5)).await;
                handle.mark_ready();
            }
        });

        timeout(WAIT, wait_for_all_ready(&lifecycles, &CancellationToken::new()))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn all_ready_on_empty_set_is_immediate() {
        let none: Vec<Lifecycle> = Vec::new();
        wait_for_all_ready(&none, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn any_error_returns_the_failing_instance() {
        let healthy = Lifecycle::with_defaults("healthy");
        let failing = Lifecycle::with_defaults("failing");
        failing.dispose();

        let err = timeout(
            WAIT,
            wait_for_any_error([&healthy, &failing], &CancellationToken::new()),
        )
        .await
        .unwrap();
        assert_eq!(err.to_string(), "Provider disposed");
    }

    #[tokio::test]
    async fn any_error_on_empty_set_waits_for_cancellation() {
        let none: Vec<Lifecycle> = Vec::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(wait_for_any_error(&none, &cancel).await.is_cancelled());
    }
}
