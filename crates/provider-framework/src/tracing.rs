//! # Observability & Tracing
//!
//! The framework logs through the `tracing` crate. Applications call [`setup_tracing`] once
//! at startup; libraries and tests never install a subscriber themselves.
//!
//! ## What Gets Traced
//!
//! | Event | Level | Fields |
//! |-------|-------|--------|
//! | Provider started | `debug` | `provider` |
//! | Provider ready | `info` | `provider` |
//! | Provider failed | `warn` | `provider`, `error` |
//! | User acquired / released | `trace` | `count` |
//! | Store created a provider | `info` | `provider`, `size` |
//! | Store evicted a failed provider | `debug` | `key`, `error` |
//! | Store disposed | `info` | `count` |
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle transitions only
//! RUST_LOG=info cargo run -p provider-sample
//!
//! # Include store spans and eviction
//! RUST_LOG=provider_framework=debug cargo run -p provider-sample
//!
//! # Every acquire and release
//! RUST_LOG=provider_framework::counter=trace cargo run -p provider-sample
//! ```
//!
//! With `RUST_LOG=info` a provider that connects and later loses its connection looks like:
//!
//! ```text
//! INFO Created provider="connection:feed.example:443" size=1
//! INFO Ready provider="connection:feed.example:443"
//! WARN Failed provider="connection:feed.example:443" error=connection reset
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Panics if a global subscriber is already installed. Use [`try_setup_tracing`] where
/// that can happen.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`], but returns `false` instead of panicking when a subscriber
/// is already installed.
pub fn try_setup_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}
