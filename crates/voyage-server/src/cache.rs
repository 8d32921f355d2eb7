//! Weather snapshot cache keyed on a spatial/temporal grid.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use voyage_core::spatial::normalize_lon;
use voyage_core::{WeatherError, WeatherSnapshot};

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

/// Drop entries older than `max_age`, then the oldest ones until at most
/// `max_entries` remain. Returns how many entries were removed.
pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration) -> usize
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let before = cache.len();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    for (key, fetched_at) in &entries {
        if now.duration_since(*fetched_at) >= max_age {
            cache.remove(key);
        }
    }

    if cache.len() > max_entries {
        entries.sort_by_key(|(_, fetched_at)| *fetched_at);
        for (key, _) in entries {
            if cache.len() <= max_entries {
                break;
            }
            cache.remove(&key);
        }
    }

    before.saturating_sub(cache.len())
}

/// Rounded coordinate + rounded timestamp + the grid that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub lat_cell: i64,
    pub lon_cell: i64,
    pub time_bucket: i64,
    /// Grid spacing in millidegrees and bucket width in minutes
    pub resolution: (u32, u32),
}

/// One week
pub const MAX_BUCKET_MINUTES: i64 = 7 * 24 * 60;
pub const MAX_GRID_DEG: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheGrid {
    pub grid_deg: f64,
    pub bucket_minutes: i64,
}

impl Default for CacheGrid {
    fn default() -> Self {
        Self {
            grid_deg: 0.25,
            bucket_minutes: 60,
        }
    }
}

impl CacheGrid {
    pub fn new(grid_deg: f64, bucket_minutes: i64) -> Self {
        let defaults = Self::default();
        Self {
            grid_deg: if grid_deg.is_finite() && grid_deg > 0.0 {
                grid_deg.min(MAX_GRID_DEG)
            } else {
                defaults.grid_deg
            },
            bucket_minutes: if bucket_minutes > 0 {
                bucket_minutes.min(MAX_BUCKET_MINUTES)
            } else {
                defaults.bucket_minutes
            },
        }
    }

    pub fn key(&self, lat: f64, lon: f64, time: DateTime<Utc>) -> CacheKey {
        let cells_per_turn = (360.0 / self.grid_deg).round() as i64;
        let lon_cell = ((normalize_lon(lon) + 180.0) / self.grid_deg).round() as i64;
        let bucket_secs = self.bucket_minutes * 60;
        let time_bucket = (time.timestamp() + bucket_secs / 2).div_euclid(bucket_secs);

        CacheKey {
            lat_cell: (lat / self.grid_deg).round() as i64,
            lon_cell: lon_cell.rem_euclid(cells_per_turn.max(1)),
            time_bucket,
            resolution: (
                (self.grid_deg * 1000.0).round() as u32,
                self.bucket_minutes as u32,
            ),
        }
    }
}

/// Cache counters, reported over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    /// Percentage of lookups served from cache
    pub hit_rate: f64,
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

/// Storage behind the weather aggregator. Errors are treated as misses.
pub trait WeatherCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<WeatherSnapshot>, WeatherError>;
    fn insert(&self, key: CacheKey, snapshot: WeatherSnapshot) -> Result<(), WeatherError>;
    /// Remove everything; returns the number of entries dropped.
    fn clear(&self) -> usize;
    fn stats(&self) -> CacheStats;
}

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: WeatherSnapshot,
    fetched_at: Instant,
}

impl CacheEntry for CachedSnapshot {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

/// In-memory TTL map. Expired entries are evicted lazily on lookup and in
/// bulk when the entry count exceeds its bound.
#[derive(Debug)]
pub struct TtlCache {
    entries: DashMap<CacheKey, CachedSnapshot>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl TtlCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WeatherCache for TtlCache {
    fn get(&self, key: &CacheKey) -> Result<Option<WeatherSnapshot>, WeatherError> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if now.duration_since(entry.fetched_at) < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.snapshot.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            let ttl = self.ttl;
            if self
                .entries
                .remove_if(key, |_, entry| now.duration_since(entry.fetched_at) >= ttl)
                .is_some()
            {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    fn insert(&self, key: CacheKey, snapshot: WeatherSnapshot) -> Result<(), WeatherError> {
        self.entries.insert(
            key,
            CachedSnapshot {
                snapshot,
                fetched_at: Instant::now(),
            },
        );
        self.inserts.fetch_add(1, Ordering::Relaxed);

        if self.entries.len() > self.max_entries {
            let removed = prune_cache(&self.entries, self.max_entries, self.ttl);
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, remaining = self.entries.len(), "Pruned weather cache");
        }
        Ok(())
    }

    fn clear(&self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            entries: self.entries.len(),
            hits,
            misses,
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate: if lookups > 0 {
                hits as f64 / lookups as f64 * 100.0
            } else {
                0.0
            },
            ttl_seconds: self.ttl.as_secs(),
            max_entries: self.max_entries,
        }
    }
}
