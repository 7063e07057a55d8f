//! # Provider Sample
//!
//! Demonstrates the provider framework with a simulated market-data client.
//!
//! ## 🚀 Core Components
//!
//! - **providers**: [`ConnectionProvider`](provider_sample::providers::ConnectionProvider)
//!   and [`FeedProvider`](provider_sample::providers::FeedProvider).
//! - **lifecycle**: The [`FeedSystem`] that shares providers between subscribers.
//!
//! ## 📚 Quick Start
//!
//! The application:
//! 1.  Sets up the [`FeedSystem`].
//! 2.  Subscribes to a few feeds, two of them sharing one connection.
//! 3.  Waits for the feeds and their connections to become ready.
//! 4.  Simulates a connection reset and watches the failure propagate.
//! 5.  Closes the subscriptions and shuts down.

use provider_framework::tracing::setup_tracing;
use provider_sample::lifecycle::{FeedSystem, SampleConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting feed system");
    let system = FeedSystem::new(SampleConfig::default());
    let cancel = CancellationToken::new();

    let span = tracing::info_span!("subscribing");
    let subscriptions = async {
        let mut subscriptions = Vec::new();
        for (endpoint, symbol) in [
            ("feed.example:443", "ACME"),
            ("feed.example:443", "INIT"),
            ("backup.example:443", "ACME"),
        ] {
            let subscription = system
                .subscribe(endpoint, symbol)
                .map_err(|e| e.to_string())?;
            system
                .wait_ready(&subscription, &cancel)
                .await
                .map_err(|e| e.to_string())?;
            subscriptions.push(subscription);
        }
        Ok::<_, String>(subscriptions)
    }
    .instrument(span)
    .await?;

    info!(count = subscriptions.len(), "All feeds ready");
    tokio::time::sleep(system.config().quote_interval() * 3).await;
    for subscription in &subscriptions {
        info!(?subscription, quote = ?subscription.latest(), "Latest quote");
    }
    info!(status = ?system.status(&subscriptions), "System status");

    // Reset the shared connection: both feeds using it fail, the backup feed keeps going
    let span = tracing::info_span!("connection_reset");
    async {
        match system.connection("feed.example:443") {
            Ok(Some(connection)) => {
                connection.reset();
            }
            Ok(None) => info!("Connection already gone"),
            Err(e) => error!(error = %e, "Connection lookup failed"),
        }
        let failure = tokio::time::timeout(
            Duration::from_secs(1),
            system.first_failure(&subscriptions, &cancel),
        )
        .await;
        match failure {
            Ok(e) => info!(error = %e, "Observed feed failure"),
            Err(_) => error!("No feed failed after the reset"),
        }
    }
    .instrument(span)
    .await;

    for subscription in subscriptions {
        subscription.close();
    }

    // Shutdown system gracefully
    system.shutdown();

    info!("Application completed successfully");
    Ok(())
}
