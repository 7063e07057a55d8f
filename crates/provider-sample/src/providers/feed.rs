use super::connection::ConnectionProvider;
use super::error::FeedError;
use crate::model::{FeedKey, Quote};
use provider_framework::{
    Dependency, DependencyRef, FailureCause, Lifecycle, LifecycleConfig, LifecycleHandle,
    Provider, ProviderError, ProviderStatus, UsageHandle,
};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Quote stream for one symbol over a shared connection.
///
/// The feed registers itself as a user of its connection on construction and releases
/// that usage once it fails, so the connection is disposed when its last feed goes away.
pub struct FeedProvider {
    lifecycle: Lifecycle,
    key: FeedKey,
    connection: Arc<ConnectionProvider>,
    connection_usage: Mutex<Option<UsageHandle>>,
    interval: Duration,
    quotes: Arc<watch::Sender<Option<Quote>>>,
}

impl FeedProvider {
    pub fn new(
        key: FeedKey,
        connection: Arc<ConnectionProvider>,
        interval: Duration,
        config: LifecycleConfig,
    ) -> Result<Self, FeedError> {
        Self::validate_key(&key)?;
        let usage = connection.acquire();
        let (quotes, _) = watch::channel(None);
        Ok(Self {
            lifecycle: Lifecycle::new(format!("feed:{key}"), config),
            key,
            connection,
            connection_usage: Mutex::new(Some(usage)),
            interval,
            quotes: Arc::new(quotes),
        })
    }

    /// Symbols are non-empty and ASCII alphanumeric.
    pub fn validate_key(key: &FeedKey) -> Result<(), FeedError> {
        if key.symbol.is_empty() || !key.symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FeedError::InvalidSymbol(key.symbol.clone()));
        }
        Ok(())
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    pub fn connection(&self) -> &Arc<ConnectionProvider> {
        &self.connection
    }

    /// The most recent quote, if any has been published.
    pub fn latest(&self) -> Option<Quote> {
        self.quotes.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Quote>> {
        self.quotes.subscribe()
    }
}

async fn stream_quotes(
    handle: LifecycleHandle,
    symbol: String,
    interval: Duration,
    connection_ready: impl Future<Output = Result<(), ProviderError>>,
    connection_lost: impl Future<Output = FailureCause>,
    quotes: Arc<watch::Sender<Option<Quote>>>,
) -> Result<(), FeedError> {
    connection_ready.await.map_err(FeedError::ConnectionLost)?;
    handle.mark_ready();

    let mut ticker = tokio::time::interval(interval);
    let mut connection_lost = std::pin::pin!(connection_lost);
    let mut sequence = 0;
    loop {
        tokio::select! {
            cause = &mut connection_lost => {
                return Err(FeedError::ConnectionLost(ProviderError::Failed(cause)));
            }
            _ = ticker.tick() => {
                sequence += 1;
                quotes.send_replace(Some(Quote::simulated(&symbol, sequence)));
            }
        }
    }
}

impl Dependency for FeedProvider {
    fn dependencies(&self) -> Vec<DependencyRef> {
        vec![self.connection.clone() as DependencyRef]
    }

    fn as_lifecycle(&self) -> Option<&Lifecycle> {
        Some(&self.lifecycle)
    }
}

impl Provider for FeedProvider {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn on_start(&self) {
        let connection = self.connection.lifecycle();
        self.lifecycle.spawn_guarded(stream_quotes(
            self.lifecycle.handle(),
            self.key.symbol.clone(),
            self.interval,
            connection.ready(),
            connection.errored(),
            self.quotes.clone(),
        ));

        let usage = self
            .connection_usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(usage) = usage {
            let errored = self.lifecycle.errored();
            let key = self.key.clone();
            tokio::spawn(async move {
                errored.await;
                debug!(%key, "Releasing connection");
                usage.release();
            });
        }
    }

    fn status(&self) -> ProviderStatus {
        let mut status = self.lifecycle.status();
        if let Some(quote) = self.latest() {
            status.message = format!("{} (last {} @ {})", status.message, quote.sequence, quote.price);
        }
        status.with_child(self.connection.status())
    }
}
