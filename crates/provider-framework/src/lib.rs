//! # Provider Framework
//!
//! This crate provides the building blocks for long-lived, asynchronously initialized
//! resources ("providers"): network connections, data subscriptions, caches. Each provider
//! moves through a small lifecycle, reports readiness and failure through awaitable
//! signals, counts its users, and can be shared through a keyed store.
//!
//! ## Why a Lifecycle Framework?
//!
//! Resources like a feed subscription take time to become usable, can fail at any point,
//! and should go away when nobody needs them any more. Coding that by hand in every
//! resource leads to subtle bugs: waiters that hang after a failure, double teardown,
//! two connections to the same endpoint. The framework centralizes those rules:
//!
//! - **One state machine**: `Loading -> Ready -> Error`, with `Error` terminal
//! - **Signals instead of polling**: callers await readiness or failure
//! - **Reference-counted usage**: the last user leaving disposes the provider
//! - **Single-flight sharing**: one provider per key, rebuilt after failure
//!
//! ## Architecture Overview
//!
//! The framework separates concerns into four layers:
//!
//! 1. **Lifecycle Layer** ([`Lifecycle`], [`UserCounter`]) - state, signals, usage counting
//! 2. **Provider Layer** ([`Provider`], [`Dependency`]) - the contract your resources implement
//! 3. **Sharing Layer** ([`ProviderStore`]) - keyed, deduplicated construction
//! 4. **Supervision Layer** ([`wait`]) - cancellable waits over one or many providers
//!
//! ## Core Abstractions
//!
//! ### 1. The Lifecycle
//!
//! Every provider embeds a [`Lifecycle`]. Transitions are atomic and the signals resolve
//! as part of the transition, so a waiter never observes a state its signal disagrees with.
//!
//! ```rust
//! use provider_framework::{Lifecycle, ProviderState};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let lifecycle = Lifecycle::with_defaults("quotes");
//! let ready = lifecycle.ready();
//! lifecycle.mark_ready();
//! ready.await.unwrap();
//!
//! lifecycle.fail("feed closed");
//! assert_eq!(lifecycle.state(), ProviderState::Error);
//! assert_eq!(lifecycle.errored().await.to_string(), "feed closed");
//! # }
//! ```
//!
//! ### 2. Usage Counting
//!
//! [`Lifecycle::acquire`] returns a [`UsageHandle`]. Dropping the last handle disposes the
//! provider (unless [`LifecycleConfig::dispose_when_unused`] is off). Handles cannot be
//! released twice: release consumes the handle.
//!
//! ### 3. Providers and Dependencies
//!
//! A provider implements [`Provider::on_start`] and lists its dependencies through
//! [`Dependency::dependencies`]. [`closure`] enumerates everything reachable, and
//! [`wait_for_dependencies`] waits until all of those providers are ready.
//!
//! ### 4. The Store
//!
//! [`ProviderStore::get_or_create`] returns the existing live provider for a key or builds
//! and starts a new one. Failed providers are evicted automatically.
//!
//! ## Concurrency Model
//!
//! - State transitions are serialized by a per-lifecycle mutex
//! - Signals are `tokio::sync::watch` channels, so waiting never blocks a transition
//! - Background work runs in [`Lifecycle::spawn_guarded`] tasks that fail the provider
//!   on error, panic or cancellation
//! - No operation blocks while waiting for a signal
//!
//! ## Testing
//!
//! The [`mock`] module provides a [`MockProvider`](mock::MockProvider) with scripted start
//! behaviour for testing stores and supervisors without real resources.

pub mod config;
pub mod counter;
pub mod dependency;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod provider;
pub mod status;
pub mod store;
pub mod tracing;
pub mod wait;

// Re-export core types for convenience
pub use config::LifecycleConfig;
pub use counter::{UsageHandle, UserCounter};
pub use dependency::{closure, provider_closure, Dependency, DependencyRef};
pub use error::{BoxError, FailureCause, ProviderError, Teardown};
pub use lifecycle::{ensure_none_failed, Lifecycle, LifecycleHandle, ProviderState, Signals};
pub use provider::Provider;
pub use status::ProviderStatus;
pub use store::ProviderStore;
pub use wait::{wait_for_all_ready, wait_for_any_error, wait_for_dependencies, WaitExt};
