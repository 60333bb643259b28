//! The single-flight aggregation cache.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::key::CacheKey;

/// Default upper bound on the number of cached slots.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// What a caller gets when a load for its key is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Wait for the running load and share its outcome.
    #[default]
    Wait,
    /// Return the previous value immediately, marked stale. Callers with no
    /// previous value, and forced refreshes, still wait.
    ServeStale,
}

/// Cache tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Behaviour for callers arriving during a load.
    pub in_flight_policy: InFlightPolicy,
    /// Maximum number of slots; 0 disables the bound.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            in_flight_policy: InFlightPolicy::Wait,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// How a returned value relates to its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Served from the cache within its TTL.
    Cached,
    /// Produced by a load during this call.
    Loaded,
    /// Older than its TTL, served because a refresh failed or was running.
    Stale,
}

/// A value returned by [`AggregationCache::get`].
#[derive(Debug, Clone)]
pub struct Lookup<V, E> {
    /// The cached or loaded value.
    pub value: V,
    /// Relation of the value to its TTL.
    pub freshness: Freshness,
    /// Time since the value was loaded.
    pub age: Duration,
    /// The error of the refresh that failed, when a stale value is served
    /// because of it.
    pub refresh_error: Option<E>,
}

impl<V, E> Lookup<V, E> {
    /// Returns true if the value is past its TTL.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }

    /// Returns true if no load happened for this call.
    #[must_use]
    pub fn from_cache(&self) -> bool {
        self.freshness != Freshness::Loaded
    }
}

/// Counters describing cache behaviour since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Fresh values served without I/O.
    pub hits: u64,
    /// Calls that found no fresh value.
    pub misses: u64,
    /// Calls that joined a load started by another caller.
    pub coalesced: u64,
    /// Successful loads.
    pub loads: u64,
    /// Failed loads.
    pub load_failures: u64,
    /// Stale values handed out.
    pub stale_served: u64,
    /// Slots removed to honour `max_entries`.
    pub evictions: u64,
    /// Slots currently holding a value.
    pub entries: usize,
    /// Loads currently running.
    pub in_flight: usize,
}

impl CacheStats {
    /// Returns hits as a percentage of all lookups.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        (self.hits as f64 / total as f64) * 100.0
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    stale_served: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct Stored<V> {
    value: V,
    fetched_at: Instant,
    ttl: Duration,
}

impl<V> Stored<V> {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.age(now) < self.ttl
    }
}

type Outcome<V, E> = Result<Lookup<V, E>, E>;

struct Flight<V, E> {
    id: u64,
    rx: watch::Receiver<Option<Outcome<V, E>>>,
}

struct SlotState<V, E> {
    entry: Option<Stored<V>>,
    flight: Option<Flight<V, E>>,
    last_access: Instant,
}

/// One key's entry and in-flight marker, guarded by its own lock.
struct Slot<V, E> {
    state: Mutex<SlotState<V, E>>,
}

impl<V, E> Slot<V, E> {
    fn new(now: Instant) -> Self {
        Self {
            state: Mutex::new(SlotState {
                entry: None,
                flight: None,
                last_access: now,
            }),
        }
    }
}

enum Decision<V, E> {
    Ready(Lookup<V, E>),
    /// The slot was removed from the index before its state was locked.
    Retry,
    Follow(watch::Receiver<Option<Outcome<V, E>>>),
    Lead(watch::Sender<Option<Outcome<V, E>>>, u64),
}

/// Clears the in-flight marker if the loading caller is dropped mid-load.
struct FlightGuard<'a, V, E> {
    slot: &'a Slot<V, E>,
    id: u64,
    armed: bool,
}

impl<V, E> Drop for FlightGuard<'_, V, E> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.slot.state.lock();
        if state.flight.as_ref().is_some_and(|f| f.id == self.id) {
            state.flight = None;
        }
        warn!(flight = self.id, "load abandoned before completion");
    }
}

/// Time-boxed cache collapsing concurrent loads of the same key.
///
/// The slot index is locked only to look up a slot. Every
/// read and write of an entry happens under that slot's own lock, and no lock
/// is held across an await.
pub struct AggregationCache<V, E> {
    slots: Mutex<HashMap<CacheKey, Arc<Slot<V, E>>>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    counters: Counters,
    next_flight: AtomicU64,
}

impl<V, E> fmt::Debug for AggregationCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationCache")
            .field("slots", &self.slots.lock().len())
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<V, E> Default for AggregationCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + fmt::Display + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> AggregationCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + fmt::Display + Send + Sync + 'static,
{
    /// Creates a cache with default configuration and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            config,
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
            next_flight: AtomicU64::new(1),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the value for `key`, loading it if needed.
    ///
    /// A fresh value (younger than `ttl`) is returned without calling
    /// `loader` unless `force_refresh` is set. Otherwise exactly one caller
    /// per key runs `loader`; the others follow the configured
    /// [`InFlightPolicy`].
    ///
    /// # Errors
    ///
    /// Returns the loader's error when the load fails and no previous value
    /// exists. Every caller that shared the failed load receives it.
    pub async fn get<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        force_refresh: bool,
        loader: F,
    ) -> Result<Lookup<V, E>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let (slot, tx, id) = loop {
            let slot = self.slot(key);
            match self.decide(key, &slot, force_refresh) {
                Decision::Ready(lookup) => {
                    debug!(key = %key, freshness = ?lookup.freshness, "cache hit");
                    return Ok(lookup);
                }
                Decision::Retry => debug!(key = %key, "slot dropped before use, retrying"),
                Decision::Lead(tx, id) => break (slot, tx, id),
                Decision::Follow(rx) => {
                    Counters::bump(&self.counters.coalesced);
                    debug!(key = %key, "joining in-flight load");
                    if let Some(outcome) = follow(rx).await {
                        return outcome;
                    }
                    debug!(key = %key, "in-flight load abandoned, retrying");
                }
            }
        };

        // Declared after `tx` so it drops first and waiters never observe a
        // closed channel while the marker is still set.
        let mut guard = FlightGuard {
            slot: &slot,
            id,
            armed: true,
        };

        debug!(key = %key, force_refresh, "loading");
        let result = loader().await;
        let outcome = self.complete(key, &slot, id, ttl, result);
        guard.armed = false;

        tx.send_replace(Some(outcome.clone()));
        outcome
    }

    /// Drops the value for one key. Returns true if a slot existed.
    ///
    /// A load already running for the key still completes and stores its
    /// result.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.invalidate_where(|candidate| candidate == key) > 0
    }

    /// Drops every value cached for a cluster.
    pub fn invalidate_cluster(&self, cluster: &str) -> usize {
        let removed = self.invalidate_where(|key| key.cluster() == cluster);
        debug!(cluster, removed, "invalidated cluster cache");
        removed
    }

    /// Drops every value of one aggregate kind for a cluster.
    pub fn invalidate_kind(&self, cluster: &str, kind: &str) -> usize {
        self.invalidate_where(|key| key.cluster() == cluster && key.kind() == kind)
    }

    /// Drops every value.
    pub fn clear(&self) -> usize {
        self.invalidate_where(|_| true)
    }

    /// Returns the number of slots, including ones still loading.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns true if no slot exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (entries, in_flight) = {
            let slots = self.slots.lock();
            slots.values().fold((0, 0), |(entries, in_flight), slot| {
                let state = slot.state.lock();
                (
                    entries + usize::from(state.entry.is_some()),
                    in_flight + usize::from(state.flight.is_some()),
                )
            })
        };

        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheStats {
            hits: load(&self.counters.hits),
            misses: load(&self.counters.misses),
            coalesced: load(&self.counters.coalesced),
            loads: load(&self.counters.loads),
            load_failures: load(&self.counters.load_failures),
            stale_served: load(&self.counters.stale_served),
            evictions: load(&self.counters.evictions),
            entries,
            in_flight,
        }
    }

    fn slot(&self, key: &CacheKey) -> Arc<Slot<V, E>> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }

        if self.config.max_entries > 0 && slots.len() >= self.config.max_entries {
            self.evict_idle(&mut slots);
        }

        let slot = Arc::new(Slot::new(self.clock.now()));
        slots.insert(key.clone(), Arc::clone(&slot));
        slot
    }

    /// Removes the least recently used tenth of the slots with no load running.
    fn evict_idle(&self, slots: &mut HashMap<CacheKey, Arc<Slot<V, E>>>) {
        let mut idle: Vec<(Instant, CacheKey)> = slots
            .iter()
            .filter_map(|(key, slot)| {
                let state = slot.state.lock();
                state
                    .flight
                    .is_none()
                    .then(|| (state.last_access, key.clone()))
            })
            .collect();
        idle.sort_by_key(|(last_access, _)| *last_access);

        let count = (slots.len() / 10).max(1);
        let mut evicted = 0;
        for (_, key) in idle.into_iter().take(count) {
            slots.remove(&key);
            Counters::bump(&self.counters.evictions);
            evicted += 1;
        }
        debug!(evicted, remaining = slots.len(), "evicted least recently used slots");
    }

    fn invalidate_where(&self, matches: impl Fn(&CacheKey) -> bool) -> usize {
        let mut removed = 0;
        self.slots.lock().retain(|key, slot| {
            if !matches(key) {
                return true;
            }
            removed += 1;
            let mut state = slot.state.lock();
            state.entry = None;
            // keep the slot while loading so the single-flight marker survives
            state.flight.is_some()
        });
        removed
    }

    fn decide(
        &self,
        key: &CacheKey,
        slot: &Arc<Slot<V, E>>,
        force_refresh: bool,
    ) -> Decision<V, E> {
        let now = self.clock.now();
        let mut state = {
            // Same order as eviction and invalidation: index first, then slot.
            let slots = self.slots.lock();
            if !slots.get(key).is_some_and(|mapped| Arc::ptr_eq(mapped, slot)) {
                return Decision::Retry;
            }
            slot.state.lock()
        };
        state.last_access = now;

        if !force_refresh {
            if let Some(stored) = state.entry.as_ref().filter(|s| s.is_fresh(now)) {
                Counters::bump(&self.counters.hits);
                return Decision::Ready(Lookup {
                    value: stored.value.clone(),
                    freshness: Freshness::Cached,
                    age: stored.age(now),
                    refresh_error: None,
                });
            }
        }
        Counters::bump(&self.counters.misses);

        if let Some(flight) = &state.flight {
            if self.config.in_flight_policy == InFlightPolicy::ServeStale && !force_refresh {
                if let Some(stored) = &state.entry {
                    Counters::bump(&self.counters.stale_served);
                    return Decision::Ready(Lookup {
                        value: stored.value.clone(),
                        freshness: Freshness::Stale,
                        age: stored.age(now),
                        refresh_error: None,
                    });
                }
            }
            return Decision::Follow(flight.rx.clone());
        }

        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        state.flight = Some(Flight { id, rx });
        Decision::Lead(tx, id)
    }

    fn complete(
        &self,
        key: &CacheKey,
        slot: &Slot<V, E>,
        id: u64,
        ttl: Duration,
        result: Result<V, E>,
    ) -> Outcome<V, E> {
        let now = self.clock.now();
        let mut state = slot.state.lock();
        if state.flight.as_ref().is_some_and(|f| f.id == id) {
            state.flight = None;
        }

        match result {
            Ok(value) => {
                Counters::bump(&self.counters.loads);
                state.entry = Some(Stored {
                    value: value.clone(),
                    fetched_at: now,
                    ttl,
                });
                Ok(Lookup {
                    value,
                    freshness: Freshness::Loaded,
                    age: Duration::ZERO,
                    refresh_error: None,
                })
            }
            Err(error) => {
                Counters::bump(&self.counters.load_failures);
                match &state.entry {
                    Some(stored) => {
                        Counters::bump(&self.counters.stale_served);
                        warn!(
                            key = %key,
                            %error,
                            age_secs = stored.age(now).as_secs(),
                            "load failed, serving previous value"
                        );
                        Ok(Lookup {
                            value: stored.value.clone(),
                            freshness: Freshness::Stale,
                            age: stored.age(now),
                            refresh_error: Some(error),
                        })
                    }
                    None => {
                        warn!(key = %key, %error, "load failed with no previous value");
                        Err(error)
                    }
                }
            }
        }
    }
}

/// Waits for the leader's outcome. `None` means the leader was dropped.
async fn follow<V: Clone, E: Clone>(
    mut rx: watch::Receiver<Option<Outcome<V, E>>>,
) -> Option<Outcome<V, E>> {
    loop {
        let current = rx.borrow_and_update().clone();
        if current.is_some() {
            return current;
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}
