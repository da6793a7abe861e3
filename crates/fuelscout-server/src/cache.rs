//! Short-TTL request cache for harvested station lists.
//!
//! Keyed by the rounded query origin so GPS drift between requests still
//! hits the same entry. Only the raw station list is cached — ranking
//! depends on caller preferences and is always recomputed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use fuelscout_core::Station;
use tokio::sync::RwLock;

struct CacheEntry {
    stations: Vec<Station>,
    fetched_at: Instant,
}

/// Concurrent-safe, last-writer-wins per key.
pub struct RequestCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl RequestCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cache key for a query origin, coordinates rounded to 4 decimal
    /// places (~11 m).
    #[must_use]
    pub fn key(lat: f64, lng: f64) -> String {
        format!("stations:{lat:.4}:{lng:.4}")
    }

    /// Returns the cached list if it is still inside the freshness window.
    /// Stale entries are discarded on read.
    pub async fn get(&self, key: &str) -> Option<Vec<Station>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                    return Some(entry.stations.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.remove_if_stale(key).await
    }

    /// Drops the entry so the map doesn't accumulate dead keys — unless a
    /// concurrent `put` refreshed it between the read check and this write
    /// lock, in which case the fresh entry is served instead.
    async fn remove_if_stale(&self, key: &str) -> Option<Vec<Station>> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                Some(entry.stations.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, key: String, stations: Vec<Station>) {
        let entry = CacheEntry {
            stations,
            fetched_at: Instant::now(),
        };
        self.entries.write().await.insert(key, entry);
    }
}
