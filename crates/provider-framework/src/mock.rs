//! # Mock Provider & Testing Guide
//!
//! [`MockProvider`] is a minimal [`Provider`] whose start behaviour is chosen up front. It
//! lets tests drive stores, waits and dependency walks without writing a provider type.
//!
//! ## When to use the mock vs a real provider
//!
//! | Feature | MockProvider | Real provider |
//! |---------|--------------|---------------|
//! | **Start** | Scripted (`Pending`, `Ready`, `Fail`) | Spawns real background work |
//! | **Determinism** | Fully deterministic | Subject to scheduler and I/O |
//! | **Dependencies** | Set by the test | Declared by the provider |
//! | **Use Case** | Testing code *around* providers | Testing the provider itself |
//!
//! ## Example
//!
//! ```rust
//! use provider_framework::mock::{MockProvider, StartBehavior};
//! use provider_framework::{Provider, ProviderState};
//!
//! let feed = MockProvider::new("feed", StartBehavior::Ready);
//! feed.start().unwrap();
//! assert_eq!(feed.state(), ProviderState::Ready);
//! assert_eq!(feed.start_count(), 1);
//!
//! let broken = MockProvider::new("broken", StartBehavior::Fail("no route".into()));
//! broken.start().unwrap();
//! assert_eq!(broken.state(), ProviderState::Error);
//! ```
//!
//! A `Pending` mock stays `Loading` after start; drive it by hand through
//! [`MockProvider::lifecycle`].

use crate::config::LifecycleConfig;
use crate::dependency::{Dependency, DependencyRef};
use crate::lifecycle::Lifecycle;
use crate::provider::Provider;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// What [`MockProvider::on_start`](Provider::on_start) does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartBehavior {
    /// Stay `Loading` until the test transitions the lifecycle.
    Pending,
    /// Become `Ready` immediately.
    Ready,
    /// Fail immediately with the given message.
    Fail(String),
}

pub struct MockProvider {
    lifecycle: Lifecycle,
    behavior: StartBehavior,
    dependencies: Mutex<Vec<DependencyRef>>,
    starts: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: impl Into<String>, behavior: StartBehavior) -> Self {
        Self::with_config(name, behavior, LifecycleConfig::default())
    }

    pub fn with_config(
        name: impl Into<String>,
        behavior: StartBehavior,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(name, config),
            behavior,
            dependencies: Mutex::new(Vec::new()),
            starts: AtomicUsize::new(0),
        }
    }

    /// Adds a dependency edge. Edges may be added after start, and may form cycles.
    pub fn depends_on(&self, dependency: DependencyRef) {
        self.dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dependency);
    }

    /// Removes every dependency edge.
    pub fn clear_dependencies(&self) {
        self.dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// How many times `on_start` ran. Never more than one.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("lifecycle", &self.lifecycle)
            .field("behavior", &self.behavior)
            .field("starts", &self.start_count())
            .finish_non_exhaustive()
    }
}

impl Dependency for MockProvider {
    fn dependencies(&self) -> Vec<DependencyRef> {
        self.dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn as_lifecycle(&self) -> Option<&Lifecycle> {
        Some(&self.lifecycle)
    }
}

impl Provider for MockProvider {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn on_start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            StartBehavior::Pending => {}
            StartBehavior::Ready => {
                self.lifecycle.mark_ready();
            }
            StartBehavior::Fail(message) => {
                self.lifecycle.fail(message.clone());
            }
        }
    }
}
