//! # System Lifecycle & Orchestration
//!
//! This module wires the sample providers into a running system and manages its lifecycle.
//!
//! ## The FeedSystem Pattern
//!
//! Individual providers only know their direct dependencies. The [`FeedSystem`] is the
//! "conductor" that owns the shared stores and turns a request for a symbol into a
//! subscription:
//!
//! 1. **Lookup** - the feed store returns the live feed for `(endpoint, symbol)` or builds one
//! 2. **Wiring** - building a feed looks up the shared connection for its endpoint
//! 3. **Usage** - the subscription holds a usage handle on the feed, the feed holds one on
//!    its connection
//! 4. **Teardown** - closing the last subscription disposes the feed, which releases the
//!    connection, which disposes the connection if no other feed uses it
//!
//! ```rust,ignore
//! let system = FeedSystem::new(SampleConfig::default());
//! let acme = system.subscribe("feed.example:443", "ACME")?;
//! system.wait_ready(&acme, &CancellationToken::new()).await?;
//! println!("{:?}", acme.latest());
//! acme.close();
//! system.shutdown();
//! ```
//!
//! ## Failure Handling
//!
//! Failures flow along the usage edges: a reset connection fails every feed streaming
//! over it, and the stores evict failed providers so the next subscription starts fresh.
//! Use [`FeedSystem::first_failure`] to supervise a set of subscriptions.
//!
//! ## Graceful Shutdown
//!
//! [`FeedSystem::shutdown`] disposes the feed store first and the connection store second,
//! so feeds observe their own disposal before their connections go away.

pub mod config;
pub mod feed_system;

pub use config::SampleConfig;
pub use feed_system::*;
