//! Shared query cache for collection screens.
//!
//! Pages and stats are cached under canonical string keys (see
//! `CollectionQuery::cache_key`). The cache is injected into every
//! controller as an `Arc`; it is never ambient global state. Invalidation
//! is by key prefix and every event is announced on a broadcast channel,
//! queued per subscriber so two invalidations of different prefixes are
//! both observed — eventually consistent broadcast, not a lock.

#![forbid(unsafe_code)]

use arc_swap::ArcSwapOption;
use metrics::counter;
use rollcall_core::{PageResult, Stats};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

/// One invalidation event: monotonically increasing epoch plus the key
/// prefix it applied to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    pub epoch: u64,
    pub prefix: String,
}

/// Events a subscriber can fall behind on before it starts lagging.
const INVALIDATION_QUEUE: usize = 64;

pub struct QueryCache {
    pages: Mutex<FxHashMap<String, Arc<PageResult>>>,
    /// Stats keyed by scope; swapped wholesale, read lock-free.
    stats: Mutex<FxHashMap<String, Arc<ArcSwapOption<Stats>>>>,
    epoch: AtomicU64,
    events_tx: broadcast::Sender<Invalidation>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(INVALIDATION_QUEUE);
        Self {
            pages: Mutex::new(FxHashMap::default()),
            stats: Mutex::new(FxHashMap::default()),
            epoch: AtomicU64::new(0),
            events_tx,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<PageResult>> {
        let hit = self.pages.lock().unwrap().get(key).cloned();
        match &hit {
            Some(_) => counter!("rollcall_cache_hits_total", 1),
            None => counter!("rollcall_cache_misses_total", 1),
        }
        hit
    }

    pub fn put(&self, key: String, value: PageResult) -> Arc<PageResult> {
        let value = Arc::new(value);
        self.pages.lock().unwrap().insert(key, Arc::clone(&value));
        value
    }

    pub fn get_stats(&self, scope: &str) -> Option<Arc<Stats>> {
        let slot = self.stats.lock().unwrap().get(scope).cloned();
        slot.and_then(|s| s.load_full())
    }

    pub fn put_stats(&self, scope: &str, stats: Stats) {
        let slot = {
            let mut map = self.stats.lock().unwrap();
            map.entry(scope.to_string())
                .or_insert_with(|| Arc::new(ArcSwapOption::empty()))
                .clone()
        };
        slot.store(Some(Arc::new(stats)));
    }

    /// Drop every page whose key starts with `prefix` and the scope's
    /// stats, then announce the invalidation. Returns how many page
    /// entries were removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let removed = {
            let mut pages = self.pages.lock().unwrap();
            let before = pages.len();
            pages.retain(|k, _| !k.starts_with(prefix));
            before - pages.len()
        };
        if let Some(slot) = self.stats.lock().unwrap().get(prefix) {
            slot.store(None);
        }
        counter!("rollcall_cache_invalidations_total", 1);
        debug!(prefix = %prefix, removed, "cache: invalidated");
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        // No receivers is fine; controllers subscribe lazily.
        let _ = self.events_tx.send(Invalidation { epoch, prefix: prefix.to_string() });
        removed
    }

    /// Subscribe to invalidation announcements. Every event since the
    /// subscription is delivered in order; a subscriber that falls more
    /// than the queue depth behind observes a lag error instead and should
    /// revalidate unconditionally.
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.events_tx.subscribe()
    }

    pub fn page_entries(&self) -> usize {
        self.pages.lock().unwrap().len()
    }
}
