//! # Keyed Provider Store
//!
//! [`ProviderStore`] caches providers by key so that every request for the "same" resource
//! converges on one instance.
//!
//! - **Single flight**: construction, start and registration all happen under the store
//!   lock, so concurrent requests for one key never build two providers.
//! - **Eviction on failure**: each registered provider gets a failure listener that removes
//!   its entry as part of the transition to `Error`. [`ProviderStore::get_or_create`] also
//!   skips instances already in `Error` and builds a replacement.
//! - **Disposal**: [`ProviderStore::dispose`] (or dropping the store) fails every
//!   registered provider and rejects further use with [`ProviderError::StoreDisposed`].
//!
//! Keys are compared by value (`Eq + Hash`). The store itself needs no async runtime.
//!
//! Providers are started with [`Lifecycle::begin_start`](crate::Lifecycle::begin_start)
//! and [`Provider::on_start`], so the start-once latch holds even if an implementation
//! overrides [`Provider::start`].

use crate::error::{BoxError, ProviderError, Teardown};
use crate::lifecycle::ProviderState;
use crate::provider::Provider;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info};

type Factory<K, P> = Box<dyn Fn(&K) -> Result<P, BoxError> + Send + Sync>;

struct StoreState<K, P> {
    providers: HashMap<K, Arc<P>>,
    disposed: bool,
}

fn lock<K, P>(state: &Mutex<StoreState<K, P>>) -> MutexGuard<'_, StoreState<K, P>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ProviderStore<K, P: Provider> {
    state: Arc<Mutex<StoreState<K, P>>>,
    factory: Factory<K, P>,
}

impl<K, P> ProviderStore<K, P>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    P: Provider,
{
    /// Creates a store that builds missing providers with `factory`.
    ///
    /// The factory must return a provider in the `Loading` state and must not block
    /// indefinitely, since it runs under the store lock.
    pub fn new(factory: impl Fn(&K) -> Result<P, BoxError> + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                providers: HashMap::new(),
                disposed: false,
            })),
            factory: Box::new(factory),
        }
    }

    /// Returns the live provider for `key`, creating and starting one if needed.
    ///
    /// Factory errors are returned as [`ProviderError::Construction`] and nothing is
    /// registered. Does not need an async runtime unless the provider's own start does.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn get_or_create(&self, key: K) -> Result<Arc<P>, ProviderError> {
        let mut state = lock(&self.state);
        if state.disposed {
            return Err(ProviderError::StoreDisposed);
        }

        if let Some(existing) = state.providers.get(&key) {
            if existing.state() != ProviderState::Error {
                return Ok(existing.clone());
            }
            debug!("Replacing failed provider");
        }

        let provider = (self.factory)(&key)
            .map(Arc::new)
            .map_err(|e| ProviderError::Construction(Arc::from(e)))?;
        provider.lifecycle().begin_start()?;
        provider.on_start();

        let replaced = state.providers.insert(key.clone(), provider.clone());
        info!(provider = %provider.name(), size = state.providers.len(), "Created");
        drop(state);
        drop(replaced);

        // Registered outside the lock: a provider that already failed runs the listener
        // immediately, and the listener takes the store lock.
        self.evict_on_failure(key, &provider);
        Ok(provider)
    }

    /// Removes `provider`'s entry once it fails, unless the key has been taken over by
    /// another instance in the meantime.
    fn evict_on_failure(&self, key: K, provider: &Arc<P>) {
        let instance = Arc::downgrade(provider);
        let state = Arc::downgrade(&self.state);
        provider.lifecycle().on_failure(move |cause| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let removed = {
                let mut state = lock(&state);
                let is_same = state
                    .providers
                    .get(&key)
                    .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), Weak::as_ptr(&instance)));
                if is_same {
                    state.providers.remove(&key)
                } else {
                    None
                }
            };
            if removed.is_some() {
                debug!(?key, error = %cause, "Evicted failed provider");
            }
        });
    }

    /// First registered provider matching `predicate`, scanning under the store lock.
    pub fn find_first(
        &self,
        predicate: impl Fn(&P) -> bool,
    ) -> Result<Option<Arc<P>>, ProviderError> {
        let state = lock(&self.state);
        if state.disposed {
            return Err(ProviderError::StoreDisposed);
        }
        Ok(state
            .providers
            .values()
            .find(|provider| predicate(provider))
            .cloned())
    }

    /// The registered provider for `key`, without creating one.
    pub fn get(&self, key: &K) -> Result<Option<Arc<P>>, ProviderError> {
        let state = lock(&self.state);
        if state.disposed {
            return Err(ProviderError::StoreDisposed);
        }
        Ok(state.providers.get(key).cloned())
    }
}

impl<K, P: Provider> ProviderStore<K, P> {
    /// Number of registered providers, including failed ones not yet evicted.
    pub fn len(&self) -> usize {
        lock(&self.state).providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.state).disposed
    }

    /// Fails every registered provider and clears the store. Idempotent.
    pub fn dispose(&self) {
        let providers: Vec<Arc<P>> = {
            let mut state = lock(&self.state);
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.providers.drain().map(|(_, provider)| provider).collect()
        };
        info!(count = providers.len(), "Disposing store");
        for provider in providers {
            provider
                .lifecycle()
                .fail_with_cause(Teardown::StoreDisposed.into_cause());
        }
    }
}

impl<K, P: Provider> Drop for ProviderStore<K, P> {
    fn drop(&mut self) {
        self.dispose();
    }
}
