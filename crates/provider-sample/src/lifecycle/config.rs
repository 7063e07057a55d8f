use provider_framework::LifecycleConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for a [`FeedSystem`](super::FeedSystem).
///
/// Every field has a default, so a partial (or empty) document deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Simulated connect latency.
    pub connect_delay_ms: u64,
    /// Time between published quotes.
    pub quote_interval_ms: u64,
    /// How long [`FeedSystem::wait_ready`](super::FeedSystem::wait_ready) waits before
    /// failing the feed.
    pub ready_timeout_ms: u64,
    pub lifecycle: LifecycleConfig,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            connect_delay_ms: 50,
            quote_interval_ms: 100,
            ready_timeout_ms: 2_000,
            lifecycle: LifecycleConfig::default(),
        }
    }
}

impl SampleConfig {
    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn quote_interval(&self) -> Duration {
        Duration::from_millis(self.quote_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}
