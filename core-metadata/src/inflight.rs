//! In-flight fetch registry
//!
//! Concurrent callers asking for the same key share one future. The entry is
//! removed as soon as that future resolves, so a later miss starts a fresh
//! fetch. The registry holds only a weak handle: once every caller has
//! dropped its handle the underlying future is dropped too. Entries left
//! behind by abandoned futures are pruned on the next miss.

use futures::future::{BoxFuture, FutureExt, WeakShared};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

struct Entry<V> {
    generation: u64,
    future: WeakShared<BoxFuture<'static, V>>,
}

pub struct InflightRegistry<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    next_generation: AtomicU64,
}

impl<K, V> InflightRegistry<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Awaits the in-flight future for `key`, or starts one with `make`.
    pub async fn run<F>(&self, key: K, make: F) -> V
    where
        F: FnOnce() -> BoxFuture<'static, V>,
    {
        let (shared, generation) = {
            let mut entries = self.entries();
            let live = entries
                .get(&key)
                .and_then(|entry| Some((entry.future.upgrade()?, entry.generation)));

            match live {
                Some(live) => {
                    trace!(?key, "Joining in-flight fetch");
                    live
                }
                None => {
                    entries.retain(|_, entry| entry.future.upgrade().is_some());
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let shared = make().shared();
                    if let Some(future) = shared.downgrade() {
                        entries.insert(key.clone(), Entry { generation, future });
                    }
                    (shared, generation)
                }
            }
        };

        let value = shared.await;
        self.remove_if_current(&key, generation);
        value
    }

    fn remove_if_current(&self, key: &K, generation: u64) {
        let mut entries = self.entries();
        if entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(key);
        }
    }

    /// Number of keys with a live shared future.
    pub fn in_flight_count(&self) -> usize {
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.future.upgrade().is_some());
        entries.len()
    }
}

impl<K, V> Default for InflightRegistry<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
