//! Bounded distance memo
//!
//! Points are keyed by their coordinates rounded to 1e-7 degrees (~1 cm), and
//! a pair key is stored in canonical order so `(a, b)` and `(b, a)` share an
//! entry. When full, the oldest inserted entry is evicted (FIFO).

use crate::GeoPoint;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Default number of memoized pairs
pub const DEFAULT_CAPACITY: usize = 1 << 16;

const COORD_SCALE: f64 = 1e7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct PointKey {
    lat: i64,
    lon: i64,
}

impl From<&GeoPoint> for PointKey {
    fn from(p: &GeoPoint) -> Self {
        Self {
            lat: (p.latitude * COORD_SCALE).round() as i64,
            lon: (p.longitude * COORD_SCALE).round() as i64,
        }
    }
}

type PairKey = (PointKey, PointKey);

fn pair_key(a: &GeoPoint, b: &GeoPoint) -> PairKey {
    let (ka, kb) = (PointKey::from(a), PointKey::from(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<PairKey, f64>,
    order: VecDeque<PairKey>,
    hits: u64,
    misses: u64,
}

/// Size-bounded memo of pairwise great-circle distances
#[derive(Debug)]
pub struct DistanceCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

/// Hit/miss counters of a [`DistanceCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

impl DistanceCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A capacity of zero disables memoization
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Distance in nautical miles, memoized by rounded coordinate pair
    pub fn distance_nm(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        if self.capacity == 0 {
            return a.distance_nm(b);
        }

        let key = pair_key(a, b);
        // entries are inserted whole, so a poisoned map is still consistent
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&d) = inner.entries.get(&key) {
            inner.hits += 1;
            return d;
        }

        inner.misses += 1;
        let d = a.distance_nm(b);
        if inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.entries.insert(key, d);
        inner.order.push_back(key);
        d
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.entries.len(),
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *inner = Inner::default();
    }
}

impl Default for DistanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DistanceCache {
    /// Clones start with an empty memo of the same capacity
    fn clone(&self) -> Self {
        Self::with_capacity(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memoizes_symmetric_pairs() {
        let cache = DistanceCache::with_capacity(8);
        let a = GeoPoint::new(54.0, 8.0);
        let b = GeoPoint::new(54.5, 8.5);

        let d1 = cache.distance_nm(&a, &b);
        let d2 = cache.distance_nm(&b, &a);

        assert_eq!(d1, d2);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let cache = DistanceCache::with_capacity(2);
        let origin = GeoPoint::new(54.0, 8.0);
        let p1 = GeoPoint::new(54.1, 8.0);
        let p2 = GeoPoint::new(54.2, 8.0);
        let p3 = GeoPoint::new(54.3, 8.0);

        cache.distance_nm(&origin, &p1);
        cache.distance_nm(&origin, &p2);
        cache.distance_nm(&origin, &p3);
        assert_eq!(cache.stats().len, 2);

        // p1 was evicted, so this is a miss again
        cache.distance_nm(&origin, &p1);
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn test_zero_capacity_disables_memo() {
        let cache = DistanceCache::with_capacity(0);
        let a = GeoPoint::new(54.0, 8.0);
        let b = GeoPoint::new(55.0, 8.0);
        assert!((cache.distance_nm(&a, &b) - 60.0).abs() < 0.1);
        assert_eq!(cache.stats().len, 0);
    }
}
