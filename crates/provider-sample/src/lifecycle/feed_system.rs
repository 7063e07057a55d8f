use super::config::SampleConfig;
use crate::model::{FeedKey, Quote};
use crate::providers::{ConnectionProvider, FeedProvider};
use provider_framework::{
    wait_for_any_error, wait_for_dependencies, BoxError, Provider, ProviderError, ProviderState, ProviderStatus,
    ProviderStore, Teardown, UsageHandle, WaitExt,
};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How many times [`FeedSystem::subscribe`] retries when it races a feed's teardown.
const SUBSCRIBE_ATTEMPTS: usize = 3;

/// A registered interest in one feed. Dropping (or closing) the subscription releases it.
pub struct FeedSubscription {
    feed: Arc<FeedProvider>,
    usage: UsageHandle,
}

impl FeedSubscription {
    pub fn feed(&self) -> &Arc<FeedProvider> {
        &self.feed
    }

    pub fn latest(&self) -> Option<Quote> {
        self.feed.latest()
    }

    pub fn close(self) {
        debug!(key = %self.feed.key(), "Closing subscription");
        self.usage.release();
    }
}

impl fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("key", self.feed.key())
            .field("state", &self.feed.state())
            .finish()
    }
}

/// Owns the connection and feed stores and hands out subscriptions.
pub struct FeedSystem {
    feeds: ProviderStore<FeedKey, FeedProvider>,
    connections: Arc<ProviderStore<String, ConnectionProvider>>,
    config: SampleConfig,
}

impl FeedSystem {
    pub fn new(config: SampleConfig) -> Self {
        let connections: Arc<ProviderStore<String, ConnectionProvider>> = {
            let config = config.clone();
            Arc::new(ProviderStore::new(move |endpoint: &String| {
                Ok(ConnectionProvider::new(
                    endpoint.clone(),
                    config.connect_delay(),
                    config.lifecycle.clone(),
                ))
            }))
        };

        let feeds = {
            let connections = connections.clone();
            let config = config.clone();
            ProviderStore::new(move |key: &FeedKey| -> Result<FeedProvider, BoxError> {
                FeedProvider::validate_key(key)?;
                let connection = connections.get_or_create(key.endpoint.clone())?;
                let feed = FeedProvider::new(
                    key.clone(),
                    connection,
                    config.quote_interval(),
                    config.lifecycle.clone(),
                )?;
                Ok(feed)
            })
        };

        Self {
            feeds,
            connections,
            config,
        }
    }

    pub fn config(&self) -> &SampleConfig {
        &self.config
    }

    /// Subscribes to `symbol` on `endpoint`, sharing the feed with existing subscribers.
    ///
    /// A feed whose last subscriber just left may already be tearing down when it is
    /// looked up. The usage is then dropped and the lookup retried, which builds a
    /// replacement feed.
    #[instrument(skip(self))]
    pub fn subscribe(&self, endpoint: &str, symbol: &str) -> Result<FeedSubscription, ProviderError> {
        let key = FeedKey::new(endpoint, symbol);
        let mut last_error = None;
        for attempt in 1..=SUBSCRIBE_ATTEMPTS {
            let feed = self.feeds.get_or_create(key.clone())?;
            let usage = feed.acquire();
            match feed.lifecycle().ensure_not_failed() {
                Ok(()) => {
                    info!(%key, users = feed.lifecycle().users().count(), "Subscribed");
                    return Ok(FeedSubscription { feed, usage });
                }
                Err(e) => {
                    debug!(%key, attempt, error = %e, "Feed failed while subscribing");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(ProviderError::Cancelled))
    }

    /// Waits until the subscription's feed and everything it depends on are ready.
    ///
    /// Gives up with [`ProviderError::Cancelled`] after [`SampleConfig::ready_timeout`]. The
    /// feed is left alone: other subscribers keep waiting on it. Use
    /// [`FeedSystem::expire_unready`] to fail a feed that is taking too long.
    pub async fn wait_ready(
        &self,
        subscription: &FeedSubscription,
        cancel: &CancellationToken,
    ) -> Result<(), ProviderError> {
        let feed = subscription.feed();
        let deadline = self.config.ready_timeout();
        let ready = async {
            wait_for_dependencies(feed.as_ref(), cancel).await?;
            feed.lifecycle().wait_for_ready(cancel).await
        };
        match tokio::time::timeout(deadline, ready).await {
            Ok(result) => result,
            Err(_) => {
                debug!(key = %feed.key(), ?deadline, "Gave up waiting for feed");
                Err(ProviderError::Cancelled)
            }
        }
    }

    /// Fails the subscription's feed with [`Teardown::ReadyTimeout`] unless it is already
    /// ready. This affects every subscriber of the feed. Returns whether the feed was failed.
    pub fn expire_unready(&self, subscription: &FeedSubscription) -> bool {
        let feed = subscription.feed();
        if feed.state() != ProviderState::Loading {
            return false;
        }
        let deadline = self.config.ready_timeout();
        let failed = feed
            .lifecycle()
            .fail_with_cause(Teardown::ReadyTimeout(deadline).into_cause());
        if failed {
            warn!(key = %feed.key(), ?deadline, "Feed not ready in time");
        }
        failed
    }

    /// Waits for the first failure among `subscriptions`.
    pub async fn first_failure(
        &self,
        subscriptions: &[FeedSubscription],
        cancel: &CancellationToken,
    ) -> ProviderError {
        wait_for_any_error(subscriptions.iter().map(|s| s.feed().lifecycle()), cancel).await
    }

    /// The live connection to `endpoint`, if one is registered.
    pub fn connection(&self, endpoint: &str) -> Result<Option<Arc<ConnectionProvider>>, ProviderError> {
        self.connections.find_first(|connection| connection.endpoint() == endpoint)
    }

    pub fn status(&self, subscriptions: &[FeedSubscription]) -> ProviderStatus {
        ProviderStatus::new(
            "feed-system",
            format!(
                "{} feeds, {} connections",
                self.feeds.len(),
                self.connections.len()
            ),
        )
        .with_children(subscriptions.iter().map(|s| s.feed().status()))
    }

    /// Disposes every feed, then every connection.
    pub fn shutdown(self) {
        info!("Shutting down feed system");
        self.feeds.dispose();
        self.connections.dispose();
    }
}
