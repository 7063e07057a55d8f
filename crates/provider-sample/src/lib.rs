//! # Provider Sample App Library
//!
//! A simulated market-data client built on `provider_framework`. This library exposes the
//! modules of the application for integration testing.
//!
//! - **[model]**: Plain data ([`FeedKey`](model::FeedKey), [`Quote`](model::Quote)).
//! - **[providers]**: The [`ConnectionProvider`](providers::ConnectionProvider) and
//!   [`FeedProvider`](providers::FeedProvider) resources.
//! - **[lifecycle]**: The [`FeedSystem`](lifecycle::FeedSystem) orchestrator and its config.

pub mod lifecycle;
pub mod model;
pub mod providers;
