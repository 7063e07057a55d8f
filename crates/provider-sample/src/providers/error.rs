use provider_framework::ProviderError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("Endpoint '{endpoint}' is unreachable")]
    Unreachable { endpoint: String },

    #[error("Connection to '{endpoint}' was reset")]
    Reset { endpoint: String },
}

#[derive(Debug, Clone, Error)]
pub enum FeedError {
    #[error("Invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(#[source] ProviderError),
}
