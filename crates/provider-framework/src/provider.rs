//! # Provider Trait
//!
//! The contract every lifecycle-managed resource implements. A provider embeds a
//! [`Lifecycle`], declares its dependencies through [`Dependency`], and supplies the
//! provider-specific start logic in [`Provider::on_start`].
//!
//! ```rust
//! use provider_framework::{Dependency, Lifecycle, Provider};
//!
//! struct Clock {
//!     lifecycle: Lifecycle,
//! }
//!
//! impl Dependency for Clock {
//!     fn as_lifecycle(&self) -> Option<&Lifecycle> {
//!         Some(&self.lifecycle)
//!     }
//! }
//!
//! impl Provider for Clock {
//!     fn lifecycle(&self) -> &Lifecycle {
//!         &self.lifecycle
//!     }
//!
//!     fn on_start(&self) {
//!         self.lifecycle.mark_ready();
//!     }
//! }
//!
//! let clock = Clock { lifecycle: Lifecycle::with_defaults("clock") };
//! clock.start().unwrap();
//! assert!(clock.start().is_err());
//! ```

use crate::counter::UsageHandle;
use crate::dependency::Dependency;
use crate::error::ProviderError;
use crate::lifecycle::{Lifecycle, ProviderState};
use crate::status::ProviderStatus;

pub trait Provider: Dependency + 'static {
    /// The embedded lifecycle.
    fn lifecycle(&self) -> &Lifecycle;

    /// Provider-specific start logic. Runs exactly once, after the lifecycle's start latch
    /// ([`Lifecycle::begin_start`]) succeeds.
    ///
    /// Must not block. Long-running work belongs in
    /// [`Lifecycle::spawn_guarded`], and failures are reported through the lifecycle
    /// rather than returned.
    fn on_start(&self);

    fn name(&self) -> &str {
        self.lifecycle().name()
    }

    fn state(&self) -> ProviderState {
        self.lifecycle().state()
    }

    /// Status tree for people. Providers with interesting internals override this.
    fn status(&self) -> ProviderStatus {
        self.lifecycle().status()
    }

    /// Registers a user of this provider.
    fn acquire(&self) -> UsageHandle {
        self.lifecycle().acquire()
    }

    /// Starts the provider. A second call returns [`ProviderError::AlreadyStarted`].
    ///
    /// Do not override this: put start logic in [`Provider::on_start`].
    /// [`ProviderStore`](crate::ProviderStore) bypasses this method and goes through
    /// [`Lifecycle::begin_start`] itself.
    fn start(&self) -> Result<(), ProviderError> {
        self.lifecycle().begin_start()?;
        self.on_start();
        Ok(())
    }
}
