//! In-memory rule cache with atomic snapshot swap.
//!
//! Readers clone an `Arc<RuleSnapshot>` out of the cache and keep matching
//! against it even while a refresh installs a replacement; mid-flight events
//! always see one consistent generation. The write path is a single pointer
//! swap under a short write lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;
use parking_lot::RwLock;
use sop_engine::{RoutingError, RuleSnapshot};

// ============================================================================
// Cache
// ============================================================================

/// Shared rule cache. Cheap concurrent reads, serialized snapshot installs,
/// and running lookup statistics.
pub struct RuleCache {
    snapshot: RwLock<Arc<RuleSnapshot>>,
    total_lookups: AtomicU64,
    cache_hits: AtomicU64,
    total_refreshes: AtomicU64,
    last_refresh: RwLock<Option<Instant>>,
    refresh_in_flight: AtomicBool,
}

impl RuleCache {
    /// Seed the cache with an initial snapshot.
    pub fn new(initial: RuleSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(initial)),
            total_lookups: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            total_refreshes: AtomicU64::new(0),
            last_refresh: RwLock::new(None),
            refresh_in_flight: AtomicBool::new(false),
        }
    }

    /// Current snapshot. The returned `Arc` stays valid across any number
    /// of subsequent installs.
    pub fn current_snapshot(&self) -> Arc<RuleSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Generation of the snapshot currently serving.
    pub fn generation(&self) -> u64 {
        self.snapshot.read().generation()
    }

    /// Atomically replace the serving snapshot.
    pub fn install(&self, snapshot: RuleSnapshot) {
        let generation = snapshot.generation();
        let rules = snapshot.len();
        *self.snapshot.write() = Arc::new(snapshot);
        self.total_refreshes.fetch_add(1, Ordering::Relaxed);
        *self.last_refresh.write() = Some(Instant::now());
        info!("installed rule snapshot generation {} ({} rules)", generation, rules);
    }

    /// Record one lookup; `hit` means at least one rule matched.
    pub fn record_lookup(&self, hit: bool) {
        self.total_lookups.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time statistics view.
    pub fn stats(&self) -> CacheStats {
        let snapshot = self.current_snapshot();
        let total_lookups = self.total_lookups.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let hit_rate = if total_lookups == 0 {
            0.0
        } else {
            cache_hits as f64 / total_lookups as f64
        };

        CacheStats {
            snapshot_size: snapshot.len(),
            generation: snapshot.generation(),
            total_lookups,
            cache_hits,
            hit_rate,
            total_refreshes: self.total_refreshes.load(Ordering::Relaxed),
            since_last_refresh: self.last_refresh.read().map(|at| at.elapsed()),
        }
    }

    /// Claim the single refresh slot. Fails with `RefreshInProgress` when
    /// another refresh holds it; the guard releases the slot on drop.
    pub(crate) fn try_begin_refresh(&self) -> Result<RefreshGuard<'_>, RoutingError> {
        if self
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RoutingError::RefreshInProgress);
        }
        Ok(RefreshGuard { cache: self })
    }
}

/// Holds the refresh slot for the duration of one refresh.
pub(crate) struct RefreshGuard<'a> {
    cache: &'a RuleCache,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.cache.refresh_in_flight.store(false, Ordering::Release);
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Snapshot of cache counters, taken under no lock coupling; values are
/// individually consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub snapshot_size: usize,
    pub generation: u64,
    pub total_lookups: u64,
    pub cache_hits: u64,
    /// `cache_hits / total_lookups`, 0.0 before any lookup.
    pub hit_rate: f64,
    pub total_refreshes: u64,
    pub since_last_refresh: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sop_engine::{Rule, RuleSnapshot};

    fn snapshot(generation: u64, ids: &[&str]) -> RuleSnapshot {
        let rules = ids
            .iter()
            .map(|id| Rule::builder(*id).sop("sop-default", "Default SOP").build())
            .collect();
        RuleSnapshot::new(rules, generation).unwrap()
    }

    #[test]
    fn install_swaps_snapshot_without_invalidating_readers() {
        let cache = RuleCache::new(snapshot(1, &["a"]));
        let held = cache.current_snapshot();
        assert_eq!(held.generation(), 1);

        cache.install(snapshot(2, &["a", "b"]));

        // Old reader still sees its generation; new readers see the swap.
        assert_eq!(held.generation(), 1);
        assert_eq!(cache.current_snapshot().generation(), 2);
        assert_eq!(cache.current_snapshot().len(), 2);
    }

    #[test]
    fn hit_rate_tracks_lookups() {
        let cache = RuleCache::new(snapshot(1, &["a"]));
        assert_eq!(cache.stats().hit_rate, 0.0);

        for i in 0..10 {
            cache.record_lookup(i < 6);
        }

        let stats = cache.stats();
        assert_eq!(stats.total_lookups, 10);
        assert_eq!(stats.cache_hits, 6);
        assert!((stats.hit_rate - 0.6).abs() < 1e-9);
    }

    #[test]
    fn stats_reflect_refreshes() {
        let cache = RuleCache::new(snapshot(1, &["a"]));
        let stats = cache.stats();
        assert_eq!(stats.total_refreshes, 0);
        assert!(stats.since_last_refresh.is_none());

        cache.install(snapshot(2, &["a"]));
        cache.install(snapshot(3, &["a"]));

        let stats = cache.stats();
        assert_eq!(stats.generation, 3);
        assert_eq!(stats.total_refreshes, 2);
        assert!(stats.since_last_refresh.is_some());
    }

    #[test]
    fn refresh_slot_is_exclusive() {
        let cache = RuleCache::new(snapshot(1, &["a"]));

        let guard = cache.try_begin_refresh().unwrap();
        assert_eq!(
            cache.try_begin_refresh().err(),
            Some(RoutingError::RefreshInProgress)
        );

        drop(guard);
        assert!(cache.try_begin_refresh().is_ok());
    }

    #[test]
    fn concurrent_readers_during_install() {
        let cache = Arc::new(RuleCache::new(snapshot(1, &["a"])));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    let snap = cache.current_snapshot();
                    assert!(!snap.is_empty());
                    assert!(snap.generation() >= 1);
                }
            }));
        }
        for gen in 2..20 {
            cache.install(snapshot(gen, &["a", "b"]));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.generation(), 19);
    }
}
