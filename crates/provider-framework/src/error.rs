//! # Framework Errors
//!
//! This module defines the common error types used throughout the provider framework.
//! Failure causes are shared (`Arc`) so that one recorded cause can be handed to every
//! waiter without being cloned or wrapped.

use std::sync::Arc;
use std::time::Duration;

/// Boxed error returned by factories and background tasks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The recorded reason a provider entered the `Error` state.
pub type FailureCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the framework to callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The provider failed. Carries the original cause untouched.
    #[error(transparent)]
    Failed(FailureCause),

    /// A check found the named provider already in `Error`.
    #[error("Provider '{name}' is in error: {cause}")]
    InError {
        name: String,
        #[source]
        cause: FailureCause,
    },

    /// A wait was abandoned because its cancellation token fired or it timed out.
    /// The provider itself is unaffected.
    #[error("Wait cancelled")]
    Cancelled,

    /// `start` was called more than once on the same provider.
    #[error("Provider '{name}' can only be started once")]
    AlreadyStarted { name: String },

    /// The store was used after it was disposed.
    #[error("Provider store has been disposed")]
    StoreDisposed,

    /// The factory could not construct a provider.
    #[error("Provider construction failed: {0}")]
    Construction(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl ProviderError {
    /// Returns the failure cause if this error is a provider failure.
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            ProviderError::Failed(cause) | ProviderError::InError { cause, .. } => Some(cause),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }
}

/// Causes synthesized by the framework when a provider is torn down rather than
/// failing on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Teardown {
    #[error("No remaining users")]
    NoRemainingUsers,
    #[error("Provider disposed")]
    Disposed,
    #[error("Provider dropped")]
    Dropped,
    #[error("Provider store disposed")]
    StoreDisposed,
    #[error("Background task panicked")]
    TaskPanicked,
    #[error("Background task cancelled")]
    TaskCancelled,
    #[error("Provider did not become ready within {0:?}")]
    ReadyTimeout(Duration),
}

impl Teardown {
    /// Wraps this reason as a shareable failure cause.
    pub fn into_cause(self) -> FailureCause {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_is_transparent() {
        let err = ProviderError::Failed(Teardown::NoRemainingUsers.into_cause());
        assert_eq!(err.to_string(), "No remaining users");
        assert!(err.cause().is_some());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn in_error_names_provider_and_keeps_source() {
        use std::error::Error as _;

        let err = ProviderError::InError {
            name: "quotes".to_string(),
            cause: Teardown::Disposed.into_cause(),
        };
        assert_eq!(err.to_string(), "Provider 'quotes' is in error: Provider disposed");
        assert_eq!(err.source().unwrap().to_string(), "Provider disposed");
        assert_eq!(
            err.cause().unwrap().downcast_ref::<Teardown>(),
            Some(&Teardown::Disposed)
        );
    }

    #[test]
    fn cause_downcasts_to_teardown() {
        let cause = Teardown::Dropped.into_cause();
        assert_eq!(cause.downcast_ref::<Teardown>(), Some(&Teardown::Dropped));
    }
}
