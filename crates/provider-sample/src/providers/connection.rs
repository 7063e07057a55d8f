use super::error::ConnectionError;
use provider_framework::{Dependency, Lifecycle, LifecycleConfig, LifecycleHandle, Provider};
use std::time::Duration;
use tracing::{debug, info};

/// Simulated connection to one endpoint.
pub struct ConnectionProvider {
    lifecycle: Lifecycle,
    endpoint: String,
    connect_delay: Duration,
}

impl ConnectionProvider {
    pub fn new(endpoint: impl Into<String>, connect_delay: Duration, config: LifecycleConfig) -> Self {
        let endpoint = endpoint.into();
        Self {
            lifecycle: Lifecycle::new(format!("connection:{endpoint}"), config),
            endpoint,
            connect_delay,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Simulates the remote side dropping the connection.
    pub fn reset(&self) -> bool {
        self.lifecycle.fail(ConnectionError::Reset {
            endpoint: self.endpoint.clone(),
        })
    }
}

async fn connect(
    handle: LifecycleHandle,
    endpoint: String,
    delay: Duration,
) -> Result<(), ConnectionError> {
    debug!(%endpoint, "Connecting");
    tokio::time::sleep(delay).await;
    if endpoint.starts_with("unreachable") {
        return Err(ConnectionError::Unreachable { endpoint });
    }
    info!(%endpoint, "Connected");
    handle.mark_ready();

    // Hold the connection open. The guarded task is dropped when the lifecycle fails.
    std::future::pending().await
}

impl Dependency for ConnectionProvider {
    fn as_lifecycle(&self) -> Option<&Lifecycle> {
        Some(&self.lifecycle)
    }
}

impl Provider for ConnectionProvider {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn on_start(&self) {
        self.lifecycle.spawn_guarded(connect(
            self.lifecycle.handle(),
            self.endpoint.clone(),
            self.connect_delay,
        ));
    }
}
