use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifies one feed: a symbol streamed over the connection to an endpoint.
///
/// Feeds are shared by key, so two subscriptions with equal keys observe the same
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedKey {
    pub endpoint: String,
    pub symbol: String,
}

impl FeedKey {
    pub fn new(endpoint: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            symbol: symbol.into(),
        }
    }
}

impl Display for FeedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.endpoint, self.symbol)
    }
}
