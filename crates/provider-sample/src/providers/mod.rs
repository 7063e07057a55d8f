//! # Sample Providers
//!
//! Two providers that simulate a market-data client:
//!
//! - [`ConnectionProvider`] - a connection to an endpoint. Becomes ready after a
//!   simulated connect and stays ready until it is reset or disposed.
//! - [`FeedProvider`] - a quote stream for one symbol. Depends on the connection to its
//!   endpoint, holds a usage handle on it, and fails when the connection fails.
//!
//! Endpoints whose name starts with `unreachable` never connect, which makes failure
//! paths easy to exercise.
//!
//! ## Usage
//!
//! ```rust
//! use provider_framework::{LifecycleConfig, Provider, WaitExt};
//! use provider_sample::model::FeedKey;
//! use provider_sample::providers::{ConnectionProvider, FeedProvider};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Arc::new(ConnectionProvider::new(
//!         "feed.example:443",
//!         Duration::from_millis(5),
//!         LifecycleConfig::default(),
//!     ));
//!     connection.start()?;
//!
//!     let feed = FeedProvider::new(
//!         FeedKey::new("feed.example:443", "ACME"),
//!         connection,
//!         Duration::from_millis(5),
//!         LifecycleConfig::default(),
//!     )?;
//!     feed.start()?;
//!     feed.lifecycle().wait_for_ready_timeout(Duration::from_secs(1)).await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod error;
pub mod feed;

pub use connection::ConnectionProvider;
pub use error::{ConnectionError, FeedError};
pub use feed::FeedProvider;
