//! # Usage Counting
//!
//! [`UserCounter`] tracks how many consumers currently hold a [`UsageHandle`] on a shared
//! resource. Listeners registered with [`UserCounter::on_change`] and
//! [`UserCounter::on_zero`] run in registration order while the counter's lock is held,
//! so the order in which they observe counts always matches the order of the mutations.
//!
//! Listeners must not acquire or release handles on the same counter.
//!
//! ## Releasing
//!
//! A handle releases itself when dropped. [`UsageHandle::release`] consumes the handle,
//! so a double release cannot be expressed.
//!
//! ## Teardown race
//!
//! Acquiring never fails, even while the owner is being torn down because the count just
//! reached zero. A consumer can therefore obtain a handle on a provider that is already
//! failing. The provider's error signal is the authority on whether it is usable.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

type ChangeListener = Box<dyn Fn(usize) + Send + Sync>;
type ZeroListener = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct CounterState {
    count: usize,
    on_change: Vec<ChangeListener>,
    on_zero: Vec<ZeroListener>,
}

fn lock(state: &Mutex<CounterState>) -> MutexGuard<'_, CounterState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reference counter handing out scoped usage handles.
#[derive(Default)]
pub struct UserCounter {
    state: Arc<Mutex<CounterState>>,
}

impl UserCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of live handles.
    pub fn count(&self) -> usize {
        lock(&self.state).count
    }

    /// Registers a listener invoked with the new count after every acquire and release.
    pub fn on_change(&self, listener: impl Fn(usize) + Send + Sync + 'static) {
        lock(&self.state).on_change.push(Box::new(listener));
    }

    /// Registers a listener invoked each time the count returns to zero.
    pub fn on_zero(&self, listener: impl Fn() + Send + Sync + 'static) {
        lock(&self.state).on_zero.push(Box::new(listener));
    }

    /// Registers one more user and returns the handle that represents it.
    pub fn acquire(&self) -> UsageHandle {
        let mut state = lock(&self.state);
        state.count += 1;
        trace!(count = state.count, "Usage acquired");
        for listener in &state.on_change {
            listener(state.count);
        }
        UsageHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl fmt::Debug for UserCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCounter")
            .field("count", &self.count())
            .finish()
    }
}

/// One active user of a counted resource. Dropping it releases the usage.
#[must_use = "dropping a usage handle releases it immediately"]
pub struct UsageHandle {
    state: Arc<Mutex<CounterState>>,
}

impl UsageHandle {
    /// Releases the usage. Equivalent to dropping the handle.
    pub fn release(self) {}
}

impl Drop for UsageHandle {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        // A live handle implies count >= 1.
        state.count = state.count.saturating_sub(1);
        trace!(count = state.count, "Usage released");
        for listener in &state.on_change {
            listener(state.count);
        }
        if state.count == 0 {
            for listener in &state.on_zero {
                listener();
            }
        }
    }
}

impl fmt::Debug for UsageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_zeros(counter: &UserCounter) -> Arc<AtomicUsize> {
        let zeros = Arc::new(AtomicUsize::new(0));
        let z = zeros.clone();
        counter.on_zero(move || {
            z.fetch_add(1, Ordering::SeqCst);
        });
        zeros
    }

    #[test]
    fn zero_fires_once_per_return_to_zero() {
        let counter = UserCounter::new();
        let zeros = counting_zeros(&counter);

        let handles: Vec<_> = (0..5).map(|_| counter.acquire()).collect();
        assert_eq!(counter.count(), 5);
        drop(handles);
        assert_eq!(counter.count(), 0);
        assert_eq!(zeros.load(Ordering::SeqCst), 1);

        // Re-acquiring after a zero-crossing produces a fresh one.
        let handle = counter.acquire();
        handle.release();
        assert_eq!(zeros.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn change_listener_sees_counts_in_mutation_order() {
        let counter = UserCounter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        counter.on_change(move |count| s.lock().unwrap().push(count));

        let a = counter.acquire();
        let b = counter.acquire();
        drop(a);
        drop(b);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let counter = UserCounter::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let o = order.clone();
            counter.on_zero(move || o.lock().unwrap().push(tag));
        }

        counter.acquire().release();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn concurrent_acquire_release_never_goes_negative() {
        let counter = Arc::new(UserCounter::new());
        let min_seen = Arc::new(AtomicUsize::new(usize::MAX));
        let m = min_seen.clone();
        counter.on_change(move |count| {
            m.fetch_min(count, Ordering::SeqCst);
        });
        let zeros = counting_zeros(&counter);

        // Hold one handle so the count cannot reach zero until the end.
        let anchor = counter.acquire();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let handle = counter.acquire();
                        drop(handle);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(counter.count(), 1);
        assert_eq!(zeros.load(Ordering::SeqCst), 0);
        assert!(min_seen.load(Ordering::SeqCst) >= 1);

        drop(anchor);
        assert_eq!(zeros.load(Ordering::SeqCst), 1);
        assert_eq!(min_seen.load(Ordering::SeqCst), 0);
    }
}
