//! Key-value map whose entries expire after a fixed TTL.
//!
//! Expiry is both lazy (reads ignore stale entries) and active: a background
//! sweeper removes stale entries and hands each one to an optional eviction
//! handler. Re-inserting a key refreshes its timestamp.
//!
//! The sweeper is a tokio task, so a map must be created from within a
//! runtime. [`TtlMap::shutdown`] stops it and waits for it to exit; dropping
//! the map only signals it.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry as Slot;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Called with every entry the sweeper evicts.
pub type EvictionHandler<K, V> = Arc<dyn Fn(K, V) + Send + Sync>;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(5);
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

struct Entry<V> {
    value: V,
    refreshed: Instant,
}

/// Concurrent map with per-entry TTL.
pub struct TtlMap<K, V> {
    name: String,
    ttl: Duration,
    entries: Arc<DashMap<K, Entry<V>>>,
    cancel: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A map whose expired entries are simply dropped.
    pub fn new(name: impl Into<String>, ttl: Duration) -> Self {
        Self::build(name.into(), ttl, None)
    }

    /// A map that passes every expired entry to `handler`.
    pub fn with_eviction_handler<F>(name: impl Into<String>, ttl: Duration, handler: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        Self::build(name.into(), ttl, Some(Arc::new(handler)))
    }

    fn build(name: String, ttl: Duration, handler: Option<EvictionHandler<K, V>>) -> Self {
        let entries = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();
        let sweep_every = (ttl / 4).clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);

        let sweeper = tokio::spawn(run_sweeper(
            name.clone(),
            ttl,
            sweep_every,
            Arc::clone(&entries),
            handler,
            cancel.clone(),
        ));

        Self {
            name,
            ttl,
            entries,
            cancel,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or overwrite `key`, restarting its TTL.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                refreshed: Instant::now(),
            },
        );
    }

    /// Insert `key` unless it already holds a live value. Returns whether the
    /// value went in.
    pub fn insert_if_vacant(&self, key: K, value: V) -> bool {
        let fresh = Entry {
            value,
            refreshed: Instant::now(),
        };
        match self.entries.entry(key) {
            Slot::Occupied(mut slot) => {
                if slot.get().refreshed.elapsed() < self.ttl {
                    return false;
                }
                slot.insert(fresh);
                true
            }
            Slot::Vacant(slot) => {
                slot.insert(fresh);
                true
            }
        }
    }

    /// Live value under `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|e| e.refreshed.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    /// Snapshot of all live entries.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.entries
            .iter()
            .filter(|e| e.refreshed.elapsed() < self.ttl)
            .map(|e| (e.key().clone(), e.value.clone()))
            .collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.refreshed.elapsed() < self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the sweeper and wait for it to exit. Entries stay readable.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
            debug!(map = %self.name, "TTL map stopped");
        }
    }
}

impl<K, V> Drop for TtlMap<K, V> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_sweeper<K, V>(
    name: String,
    ttl: Duration,
    sweep_every: Duration,
    entries: Arc<DashMap<K, Entry<V>>>,
    handler: Option<EvictionHandler<K, V>>,
    cancel: CancellationToken,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let mut ticker = interval(sweep_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => sweep(&name, ttl, &entries, handler.as_ref()),
        }
    }
}

fn sweep<K, V>(
    name: &str,
    ttl: Duration,
    entries: &DashMap<K, Entry<V>>,
    handler: Option<&EvictionHandler<K, V>>,
) where
    K: Eq + Hash + Clone,
{
    let stale: Vec<K> = entries
        .iter()
        .filter(|e| e.refreshed.elapsed() >= ttl)
        .map(|e| e.key().clone())
        .collect();

    for key in stale {
        // Re-check under the shard lock: the entry may have been refreshed
        // since the scan.
        let Some((key, entry)) = entries.remove_if(&key, |_, e| e.refreshed.elapsed() >= ttl) else {
            continue;
        };
        trace!(map = %name, "evicted entry");
        if let Some(handler) = handler {
            handler(key, entry.value);
        }
    }
}
