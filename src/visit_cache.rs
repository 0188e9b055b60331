//! # Visit cache
//!
//! Keyed store of the most recent [`VisitCacheEntry`] per `visit_id`.
//!
//! ## Consistency
//!
//! Entries are immutable and stored behind an [`Arc`]: a registration builds the complete
//! entry first and then swaps the pointer under the shard's write lock, so a reader holds
//! either the previous entry or the new one, never a mix. Readers clone the `Arc` and
//! release the lock immediately; no computation happens while a lock is held.
//!
//! The map is split into shards (`visit_id mod shards`), each behind its own
//! [`parking_lot::RwLock`]. Unrelated visits only contend when they hash to the same shard
//! and only for the duration of a pointer swap.
//!
//! ## Ordering of competing registrations
//!
//! Each registration draws a generation from [`VisitCache::next_generation`] *before*
//! computing its tracks. [`VisitCache::put`] refuses an entry whose generation is older than
//! the one already stored, so the registration that started last wins even if an earlier
//! one finishes after it. Either way `put` hands back the entry it left in place, taken
//! under the same write lock, so a caller never has to look it up again.
//!
//! ## Eviction
//!
//! Visits are rarely queried long after they were observed; [`spawn_eviction_task`] drops
//! entries older than a configured age on a fixed interval.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::constants::{Degree, VisitId};
use crate::sattle_errors::SattleError;
use crate::visit::{SkippedObject, Track, Visit, VisitTracks};

/// The published result of one visit registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitCacheEntry {
    /// Boresight and exposure window the tracks were computed for.
    pub visit: Visit,
    /// Retained tracks, sorted by catalog number.
    pub tracks: Vec<Track>,
    /// Objects whose propagation failed for this visit.
    pub skipped: Vec<SkippedObject>,
    /// Search radius (degrees) applied.
    pub search_radius: Degree,
    /// Whether the element sets came from the historical catalog.
    pub historical: bool,
    /// Registration order; newer generations replace older ones.
    pub generation: u64,
    #[serde(skip)]
    pub published_at: Instant,
}

impl VisitCacheEntry {
    pub fn new(visit: Visit, computed: VisitTracks, historical: bool, generation: u64) -> Self {
        VisitCacheEntry {
            visit,
            tracks: computed.tracks,
            skipped: computed.skipped,
            search_radius: computed.search_radius,
            historical,
            generation,
            published_at: Instant::now(),
        }
    }

    pub fn visit_id(&self) -> VisitId {
        self.visit.visit_id
    }
}

/// What [`VisitCache::put`] left under the visit id.
#[derive(Debug, Clone, PartialEq)]
pub enum Publication {
    /// The given entry is now the visible one.
    Published(Arc<VisitCacheEntry>),
    /// A newer registration was already visible and stays so.
    Superseded(Arc<VisitCacheEntry>),
}

impl Publication {
    pub fn is_published(&self) -> bool {
        matches!(self, Publication::Published(_))
    }

    /// The visible entry at the time of the `put`.
    pub fn entry(&self) -> &Arc<VisitCacheEntry> {
        match self {
            Publication::Published(entry) | Publication::Superseded(entry) => entry,
        }
    }

    pub fn into_entry(self) -> Arc<VisitCacheEntry> {
        match self {
            Publication::Published(entry) | Publication::Superseded(entry) => entry,
        }
    }
}

type Shard = RwLock<HashMap<VisitId, Arc<VisitCacheEntry>>>;

pub const DEFAULT_SHARDS: usize = 16;

pub struct VisitCache {
    shards: Vec<Shard>,
    generation: AtomicU64,
}

impl Default for VisitCache {
    fn default() -> Self {
        VisitCache::new(DEFAULT_SHARDS)
    }
}

impl VisitCache {
    /// Create an empty cache with `shards` independent locks (at least one).
    pub fn new(shards: usize) -> Self {
        VisitCache {
            shards: (0..shards.max(1))
                .map(|_| RwLock::new(HashMap::new()))
                .collect(),
            generation: AtomicU64::new(0),
        }
    }

    /// Draw the generation of a new registration.
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn shard(&self, visit_id: VisitId) -> &Shard {
        let index = visit_id.rem_euclid(self.shards.len() as i64) as usize;
        &self.shards[index]
    }

    /// Publish `entry` under its `visit_id`, replacing any older entry.
    ///
    /// Return
    /// ----------
    /// * [`Publication::Published`] with the stored entry, or [`Publication::Superseded`]
    ///   with the newer entry a later registration already published. The returned `Arc`
    ///   stays valid even if the visit is evicted right after.
    pub fn put(&self, entry: VisitCacheEntry) -> Publication {
        let visit_id = entry.visit_id();
        let generation = entry.generation;
        let mut shard = self.shard(visit_id).write();

        if let Some(current) = shard.get(&visit_id) {
            if current.generation > generation {
                debug!(
                    visit_id,
                    generation,
                    current = current.generation,
                    "stale registration discarded"
                );
                return Publication::Superseded(Arc::clone(current));
            }
        }

        let entry = Arc::new(entry);
        shard.insert(visit_id, Arc::clone(&entry));
        debug!(visit_id, generation, "visit entry published");
        Publication::Published(entry)
    }

    /// Current entry of `visit_id`.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::VisitNotFound`] if the visit was never registered (or was evicted).
    pub fn get(&self, visit_id: VisitId) -> Result<Arc<VisitCacheEntry>, SattleError> {
        self.shard(visit_id)
            .read()
            .get(&visit_id)
            .cloned()
            .ok_or(SattleError::VisitNotFound(visit_id))
    }

    pub fn contains(&self, visit_id: VisitId) -> bool {
        self.shard(visit_id).read().contains_key(&visit_id)
    }

    pub fn remove(&self, visit_id: VisitId) -> Option<Arc<VisitCacheEntry>> {
        self.shard(visit_id).write().remove(&visit_id)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered visit ids, ascending.
    pub fn visit_ids(&self) -> Vec<VisitId> {
        let mut ids: Vec<VisitId> = self
            .shards
            .iter()
            .flat_map(|shard| shard.read().keys().copied().collect::<Vec<_>>())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of every entry, ordered by visit id.
    pub fn get_all(&self) -> Vec<Arc<VisitCacheEntry>> {
        let mut entries: Vec<Arc<VisitCacheEntry>> = self
            .shards
            .iter()
            .flat_map(|shard| shard.read().values().cloned().collect::<Vec<_>>())
            .collect();
        entries.sort_by_key(|entry| entry.visit_id());
        entries
    }

    /// Drop every entry published at or before `cutoff`. Returns the number evicted.
    pub fn evict_published_before(&self, cutoff: Instant) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let mut shard = shard.write();
                let before = shard.len();
                shard.retain(|_, entry| entry.published_at > cutoff);
                before - shard.len()
            })
            .sum()
    }

    /// Drop every entry older than `max_age`. Returns the number evicted.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        match Instant::now().checked_sub(max_age) {
            Some(cutoff) => self.evict_published_before(cutoff),
            None => 0,
        }
    }
}

/// Run [`VisitCache::evict_older_than`] every `interval` until the task is aborted.
pub fn spawn_eviction_task(
    cache: Arc<VisitCache>,
    interval: Duration,
    max_age: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = cache.evict_older_than(max_age);
            if evicted > 0 {
                info!(evicted, remaining = cache.len(), "visit cache swept");
            }
        }
    })
}

#[cfg(test)]
mod visit_cache_test {
    use super::*;
    use crate::visit::VisitTracks;

    fn entry(cache: &VisitCache, visit_id: VisitId, catalog_numbers: &[u64]) -> VisitCacheEntry {
        let visit = Visit::new(visit_id, 60000.0, 60000.0007, 10.0, 0.0).unwrap();
        let tracks = catalog_numbers
            .iter()
            .map(|&catalog_number| Track {
                catalog_number,
                start_ra: 10.0,
                start_dec: 0.0,
                end_ra: 10.1,
                end_dec: 0.0,
            })
            .collect();
        let computed = VisitTracks {
            tracks,
            skipped: vec![],
            search_radius: 10.0,
        };
        VisitCacheEntry::new(visit, computed, false, cache.next_generation())
    }

    #[test]
    fn test_get_missing_visit() {
        let cache = VisitCache::default();
        assert_eq!(cache.get(42).unwrap_err(), SattleError::VisitNotFound(42));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_replaces() {
        let cache = VisitCache::new(4);
        assert!(cache.put(entry(&cache, 1, &[100, 200])).is_published());
        let published = cache.put(entry(&cache, 1, &[300]));
        assert!(published.is_published());

        let current = cache.get(1).unwrap();
        assert!(Arc::ptr_eq(published.entry(), &current));
        let numbers: Vec<_> = current.tracks.iter().map(|t| t.catalog_number).collect();
        assert_eq!(numbers, vec![300]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let cache = VisitCache::default();
        let older = entry(&cache, 5, &[1]);
        let newer = entry(&cache, 5, &[2]);

        let newer_generation = newer.generation;

        // The newer registration finishes first
        assert!(cache.put(newer).is_published());
        let outcome = cache.put(older);
        assert!(!outcome.is_published());
        // The caller of the stale put is handed the entry that stays visible
        assert_eq!(outcome.entry().generation, newer_generation);
        assert_eq!(outcome.entry().tracks[0].catalog_number, 2);
        assert_eq!(cache.get(5).unwrap().tracks[0].catalog_number, 2);
    }

    #[test]
    fn test_published_entry_outlives_eviction() {
        let cache = VisitCache::default();
        let published = cache.put(entry(&cache, 3, &[10, 11])).into_entry();

        // A sweep runs between the put and the caller's use of the entry
        assert_eq!(cache.evict_older_than(Duration::ZERO), 1);
        assert_eq!(cache.get(3).unwrap_err(), SattleError::VisitNotFound(3));
        assert_eq!(published.visit_id(), 3);
        assert_eq!(published.tracks.len(), 2);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let cache = VisitCache::default();
        cache.put(entry(&cache, 9, &[1, 2, 3]));
        let snapshot = cache.get(9).unwrap();

        cache.put(entry(&cache, 9, &[4]));
        assert_eq!(snapshot.tracks.len(), 3);
        assert_eq!(cache.get(9).unwrap().tracks.len(), 1);
    }

    #[test]
    fn test_inspection() {
        let cache = VisitCache::new(3);
        for id in [7, -2, 3, 12] {
            cache.put(entry(&cache, id, &[]));
        }
        assert_eq!(cache.visit_ids(), vec![-2, 3, 7, 12]);
        let all: Vec<_> = cache.get_all().iter().map(|e| e.visit_id()).collect();
        assert_eq!(all, vec![-2, 3, 7, 12]);
        assert!(cache.contains(-2));
        assert!(cache.remove(-2).is_some());
        assert!(!cache.contains(-2));
    }

    #[test]
    fn test_eviction() {
        let cache = VisitCache::default();
        cache.put(entry(&cache, 1, &[]));
        std::thread::sleep(Duration::from_millis(20));
        let cutoff = Instant::now();
        std::thread::sleep(Duration::from_millis(20));
        cache.put(entry(&cache, 2, &[]));

        assert_eq!(cache.evict_published_before(cutoff), 1);
        assert_eq!(cache.visit_ids(), vec![2]);

        assert_eq!(cache.evict_older_than(Duration::from_secs(3600)), 0);
        assert_eq!(cache.evict_older_than(Duration::ZERO), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(VisitCache::new(8));
        std::thread::scope(|scope| {
            for writer in 0..4i64 {
                let cache = Arc::clone(&cache);
                scope.spawn(move || {
                    for round in 0..50u64 {
                        let visit_id = writer * 100 + (round % 5) as i64;
                        cache.put(entry(&cache, visit_id, &[round]));
                    }
                });
            }
            for _ in 0..4 {
                let cache = Arc::clone(&cache);
                scope.spawn(move || {
                    for visit_id in 0..400 {
                        if let Ok(entry) = cache.get(visit_id) {
                            // Never a partially built entry
                            assert_eq!(entry.tracks.len(), 1);
                            assert_eq!(entry.visit_id(), visit_id);
                        }
                    }
                });
            }
        });
        assert_eq!(cache.len(), 20);
    }

    #[tokio::test]
    async fn test_eviction_task() {
        let cache = Arc::new(VisitCache::default());
        cache.put(entry(&cache, 1, &[]));

        let handle = spawn_eviction_task(
            Arc::clone(&cache),
            Duration::from_millis(10),
            Duration::ZERO,
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(cache.is_empty());
    }
}
