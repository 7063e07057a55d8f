//! # Lifecycle Core
//!
//! A [`Lifecycle`] is the state machine embedded in every provider:
//!
//! ```text
//! Loading --mark_ready--> Ready
//! Loading --fail--------> Error
//! Ready   --fail--------> Error      (Error is terminal)
//! ```
//!
//! Each transition runs under one mutex and resolves the two completion signals as its
//! last step:
//!
//! - the **ready signal** resolves `Ok(())` when `Ready` is reached, or with the failure
//!   cause if `Error` is reached first. An already successful ready signal stays successful.
//! - the **error signal** resolves with the failure cause when `Error` is reached, and never
//!   otherwise.
//!
//! Waiters subscribe to `tokio::sync::watch` receivers and never touch the state mutex.
//! Code that must react to failure without a runtime registers a synchronous callback
//! with [`Lifecycle::on_failure`].
//!
//! Disposal is failure: [`Lifecycle::dispose`] and dropping the `Lifecycle` both force the
//! `Error` state, so the error signal resolves for every instance that is ever discarded.
//!
//! The lifecycle owns its [`UserCounter`]. When [`LifecycleConfig::dispose_when_unused`] is
//! set, the counter's zero listener fails the lifecycle with
//! [`Teardown::NoRemainingUsers`]. The listener holds the shared signal core only, which
//! does not own the counter, so no reference cycle exists.

use crate::config::LifecycleConfig;
use crate::counter::{UsageHandle, UserCounter};
use crate::error::{BoxError, FailureCause, ProviderError, Teardown};
use crate::status::ProviderStatus;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable lifecycle state of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderState {
    Loading,
    Ready,
    Error,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderState::Loading => "Loading",
            ProviderState::Ready => "Ready",
            ProviderState::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Tagged state. The cause exists only in `Error`.
enum Phase {
    Loading,
    Ready,
    Error(FailureCause),
}

type FailureListener = Box<dyn FnOnce(&FailureCause) + Send>;

struct Core {
    name: String,
    phase: Mutex<Phase>,
    on_failure: Mutex<Vec<FailureListener>>,
    ready_tx: watch::Sender<Option<Result<(), FailureCause>>>,
    error_tx: watch::Sender<Option<FailureCause>>,
}

impl Core {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn failure_listeners(&self) -> MutexGuard<'_, Vec<FailureListener>> {
        self.on_failure.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable reference to a lifecycle's state and signals.
///
/// Background tasks hold a `LifecycleHandle` to report readiness or failure without
/// keeping the provider itself alive.
#[derive(Clone)]
pub struct LifecycleHandle {
    core: Arc<Core>,
}

impl LifecycleHandle {
    fn new(name: String) -> Self {
        let (ready_tx, _) = watch::channel(None);
        let (error_tx, _) = watch::channel(None);
        Self {
            core: Arc::new(Core {
                name,
                phase: Mutex::new(Phase::Loading),
                on_failure: Mutex::new(Vec::new()),
                ready_tx,
                error_tx,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Current state, read without waiting on any signal.
    pub fn state(&self) -> ProviderState {
        match *self.core.phase() {
            Phase::Loading => ProviderState::Loading,
            Phase::Ready => ProviderState::Ready,
            Phase::Error(_) => ProviderState::Error,
        }
    }

    /// The recorded failure cause. `Some` iff the state is `Error`.
    pub fn failure(&self) -> Option<FailureCause> {
        match &*self.core.phase() {
            Phase::Error(cause) => Some(cause.clone()),
            _ => None,
        }
    }

    /// `Loading -> Ready`. Returns `false` (and does nothing) in any other state.
    pub fn mark_ready(&self) -> bool {
        {
            let mut phase = self.core.phase();
            if !matches!(*phase, Phase::Loading) {
                return false;
            }
            *phase = Phase::Ready;
            self.core.ready_tx.send_replace(Some(Ok(())));
        }
        info!(provider = %self.core.name, "Ready");
        true
    }

    /// Moves to `Error` with the given error as cause.
    ///
    /// Only the first call records a cause; later calls return `false`.
    pub fn fail(&self, error: impl Into<BoxError>) -> bool {
        let error: BoxError = error.into();
        self.fail_with_cause(Arc::from(error))
    }

    /// Like [`fail`](Self::fail) but with an already shared cause.
    pub fn fail_with_cause(&self, cause: FailureCause) -> bool {
        {
            let mut phase = self.core.phase();
            let previous = std::mem::replace(&mut *phase, Phase::Error(cause.clone()));
            match previous {
                Phase::Error(recorded) => {
                    *phase = Phase::Error(recorded);
                    return false;
                }
                Phase::Loading => {
                    self.core.error_tx.send_replace(Some(cause.clone()));
                    self.core.ready_tx.send_replace(Some(Err(cause.clone())));
                }
                Phase::Ready => {
                    self.core.error_tx.send_replace(Some(cause.clone()));
                }
            }
        }
        warn!(provider = %self.core.name, error = %cause, "Failed");
        let listeners = std::mem::take(&mut *self.core.failure_listeners());
        for listener in listeners {
            listener(&cause);
        }
        true
    }

    /// Registers a callback run once with the failure cause when the lifecycle enters
    /// `Error`. If it already has, the callback runs immediately on the calling thread.
    ///
    /// Callbacks run synchronously on the thread that fails the lifecycle, after the
    /// transition and outside the state lock, in registration order. They need no async
    /// runtime. They must not block, and must not take a lock the failing thread may hold.
    pub fn on_failure(&self, listener: impl FnOnce(&FailureCause) + Send + 'static) {
        let recorded = {
            let phase = self.core.phase();
            match &*phase {
                Phase::Error(cause) => cause.clone(),
                _ => {
                    self.core.failure_listeners().push(Box::new(listener));
                    return;
                }
            }
        };
        listener(&recorded);
    }

    /// Disposes the provider. Disposal is a failure with [`Teardown::Disposed`].
    pub fn dispose(&self) -> bool {
        self.fail_with_cause(Teardown::Disposed.into_cause())
    }

    /// Resolves once the provider is ready, or with its failure if it fails first.
    pub fn ready(&self) -> impl Future<Output = Result<(), ProviderError>> + Send + 'static {
        let mut rx = self.core.ready_tx.subscribe();
        async move {
            let outcome = match rx.wait_for(Option::is_some).await {
                Ok(value) => value.clone(),
                Err(_) => None,
            };
            match outcome {
                Some(Ok(())) => Ok(()),
                Some(Err(cause)) => Err(ProviderError::Failed(cause)),
                None => Err(ProviderError::Failed(Teardown::Dropped.into_cause())),
            }
        }
    }

    /// Resolves with the failure cause once the provider enters `Error`.
    pub fn errored(&self) -> impl Future<Output = FailureCause> + Send + 'static {
        let mut rx = self.core.error_tx.subscribe();
        async move {
            let cause = match rx.wait_for(Option::is_some).await {
                Ok(value) => value.clone(),
                Err(_) => None,
            };
            cause.unwrap_or_else(|| Teardown::Dropped.into_cause())
        }
    }

    /// Runs a provider's background work.
    ///
    /// The lifecycle fails with the task's error if it returns `Err`, with
    /// [`Teardown::TaskPanicked`] if it panics and with [`Teardown::TaskCancelled`] if it is
    /// aborted or its runtime shuts down. The task is dropped as soon as the lifecycle
    /// fails for any other reason.
    pub fn spawn_guarded<F, E>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let errored = self.errored();
        let mut guard = CancelGuard {
            handle: Some(self.clone()),
        };
        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = AssertUnwindSafe(task).catch_unwind() => Some(result),
                _ = errored => None,
            };
            let Some(handle) = guard.handle.take() else {
                return;
            };
            match outcome {
                Some(Ok(Ok(()))) => debug!(provider = %handle.name(), "Background task finished"),
                Some(Ok(Err(e))) => {
                    handle.fail(e);
                }
                Some(Err(_)) => {
                    handle.fail_with_cause(Teardown::TaskPanicked.into_cause());
                }
                None => debug!(provider = %handle.name(), "Background task stopped"),
            }
        })
    }

    /// Leaf status derived from the current state.
    pub fn status(&self) -> ProviderStatus {
        let message = match &*self.core.phase() {
            Phase::Loading => "Loading".to_string(),
            Phase::Ready => "Ready".to_string(),
            Phase::Error(cause) => format!("Error: {cause}"),
        };
        ProviderStatus::new(self.core.name.clone(), message)
    }
}

impl fmt::Debug for LifecycleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHandle")
            .field("name", &self.core.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Fails the lifecycle if a guarded task is dropped before completing.
struct CancelGuard {
    handle: Option<LifecycleHandle>,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.fail_with_cause(Teardown::TaskCancelled.into_cause());
        }
    }
}

/// The lifecycle embedded in a provider: state, signals, usage counter and start latch.
pub struct Lifecycle {
    handle: LifecycleHandle,
    users: UserCounter,
    started: AtomicBool,
    config: LifecycleConfig,
}

impl Lifecycle {
    pub fn new(name: impl Into<String>, config: LifecycleConfig) -> Self {
        let handle = LifecycleHandle::new(name.into());
        let users = UserCounter::new();
        if config.dispose_when_unused {
            let on_zero = handle.clone();
            users.on_zero(move || {
                on_zero.fail_with_cause(Teardown::NoRemainingUsers.into_cause());
            });
        }
        Self {
            handle,
            users,
            started: AtomicBool::new(false),
            config,
        }
    }

    /// A lifecycle with [`LifecycleConfig::default`].
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, LifecycleConfig::default())
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// A cloneable handle for background tasks.
    pub fn handle(&self) -> LifecycleHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ProviderState {
        self.handle.state()
    }

    pub fn failure(&self) -> Option<FailureCause> {
        self.handle.failure()
    }

    pub fn mark_ready(&self) -> bool {
        self.handle.mark_ready()
    }

    pub fn fail(&self, error: impl Into<BoxError>) -> bool {
        self.handle.fail(error)
    }

    pub fn fail_with_cause(&self, cause: FailureCause) -> bool {
        self.handle.fail_with_cause(cause)
    }

    pub fn dispose(&self) -> bool {
        self.handle.dispose()
    }

    pub fn ready(&self) -> impl Future<Output = Result<(), ProviderError>> + Send + 'static {
        self.handle.ready()
    }

    pub fn errored(&self) -> impl Future<Output = FailureCause> + Send + 'static {
        self.handle.errored()
    }

    pub fn on_failure(&self, listener: impl FnOnce(&FailureCause) + Send + 'static) {
        self.handle.on_failure(listener)
    }

    pub fn spawn_guarded<F, E>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        self.handle.spawn_guarded(task)
    }

    pub fn status(&self) -> ProviderStatus {
        self.handle.status()
    }

    /// The usage counter owned by this lifecycle.
    pub fn users(&self) -> &UserCounter {
        &self.users
    }

    /// Registers a user. See the teardown race note in [`crate::counter`].
    pub fn acquire(&self) -> UsageHandle {
        self.users.acquire()
    }

    /// Latches the one-time start. A second call is a programming error.
    pub fn begin_start(&self) -> Result<(), ProviderError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ProviderError::AlreadyStarted {
                name: self.name().to_string(),
            });
        }
        debug!(provider = %self.name(), "Starting");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Returns [`ProviderError::InError`], naming this provider, if the lifecycle is in
    /// `Error`.
    pub fn ensure_not_failed(&self) -> Result<(), ProviderError> {
        match self.failure() {
            Some(cause) => Err(ProviderError::InError {
                name: self.name().to_string(),
                cause,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.handle.fail_with_cause(Teardown::Dropped.into_cause());
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("users", &self.users.count())
            .finish()
    }
}

/// Checks many lifecycles, returning the first recorded failure.
pub fn ensure_none_failed<'a>(
    lifecycles: impl IntoIterator<Item = &'a Lifecycle>,
) -> Result<(), ProviderError> {
    lifecycles
        .into_iter()
        .try_for_each(Lifecycle::ensure_not_failed)
}

/// Anything exposing a ready signal and an error signal.
pub trait Signals {
    fn ready_signal(&self) -> BoxFuture<'static, Result<(), ProviderError>>;
    fn error_signal(&self) -> BoxFuture<'static, FailureCause>;
}

impl Signals for LifecycleHandle {
    fn ready_signal(&self) -> BoxFuture<'static, Result<(), ProviderError>> {
        self.ready().boxed()
    }

    fn error_signal(&self) -> BoxFuture<'static, FailureCause> {
        self.errored().boxed()
    }
}

impl Signals for Lifecycle {
    fn ready_signal(&self) -> BoxFuture<'static, Result<(), ProviderError>> {
        self.ready().boxed()
    }

    fn error_signal(&self) -> BoxFuture<'static, FailureCause> {
        self.errored().boxed()
    }
}

impl<S: Signals + ?Sized> Signals for &S {
    fn ready_signal(&self) -> BoxFuture<'static, Result<(), ProviderError>> {
        (**self).ready_signal()
    }

    fn error_signal(&self) -> BoxFuture<'static, FailureCause> {
        (**self).error_signal()
    }
}

impl<S: Signals + ?Sized> Signals for Arc<S> {
    fn ready_signal(&self) -> BoxFuture<'static, Result<(), ProviderError>> {
        (**self).ready_signal()
    }

    fn error_signal(&self) -> BoxFuture<'static, FailureCause> {
        (**self).error_signal()
    }
}
