// src/storage/memory.rs

//! In-memory TTL cache backed by `DashMap`.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::models::CollectionEntry;

/// Cache key for a lookup: council id plus the lowercased raw query text.
pub fn cache_key(council_id: &str, text: &str) -> String {
    format!("{}|{}", council_id, text.to_lowercase())
}

#[derive(Debug, Clone)]
pub struct CachedResult {
    pub stored_at: DateTime<Utc>,
    pub payload: Vec<CollectionEntry>,
}

/// Thread-safe result cache with a fixed time-to-live.
///
/// There is no capacity bound. Two concurrent misses for the same key both
/// fetch, and the later `put` wins.
pub struct ResultCache {
    map: DashMap<String, CachedResult>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            map: DashMap::new(),
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<CollectionEntry>> {
        self.get_at(key, Utc::now())
    }

    /// Look up `key` as of `now`, evicting it if expired.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<CollectionEntry>> {
        if self
            .map
            .remove_if(key, |_, cached| self.is_expired(cached, now))
            .is_some()
        {
            log::debug!("Cache evict: {}", key);
            return None;
        }

        match self.map.get(key) {
            Some(cached) => {
                log::debug!("Cache hit: {}", key);
                Some(cached.payload.clone())
            }
            None => {
                log::debug!("Cache miss: {}", key);
                None
            }
        }
    }

    pub fn put(&self, key: impl Into<String>, payload: Vec<CollectionEntry>) {
        self.put_at(key, payload, Utc::now());
    }

    pub fn put_at(&self, key: impl Into<String>, payload: Vec<CollectionEntry>, now: DateTime<Utc>) {
        self.map.insert(
            key.into(),
            CachedResult {
                stored_at: now,
                payload,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.map.len();
        self.map.retain(|_, cached| !self.is_expired(cached, now));
        let removed = before.saturating_sub(self.map.len());
        if removed > 0 {
            log::info!("Purged {} expired cache entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }

    fn is_expired(&self, cached: &CachedResult, now: DateTime<Utc>) -> bool {
        now - cached.stored_at >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn payload() -> Vec<CollectionEntry> {
        vec![CollectionEntry::new(
            "Household Waste",
            NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
        )]
    }

    #[test]
    fn test_cache_key_lowercases_raw_text() {
        assert_eq!(cache_key("WiltshireCouncil", "10 SN8 1RA"), "WiltshireCouncil|10 sn8 1ra");
        assert_eq!(
            cache_key("WiltshireCouncil", " 10 SN8 1RA "),
            "WiltshireCouncil| 10 sn8 1ra "
        );
    }

    #[test]
    fn test_put_then_get() {
        let cache = ResultCache::new(86_400);
        cache.put("k", payload());
        assert_eq!(cache.get("k"), Some(payload()));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let cache = ResultCache::new(60);
        let stored = Utc::now();
        cache.put_at("k", payload(), stored);

        assert!(cache.get_at("k", stored + Duration::seconds(59)).is_some());
        assert_eq!(cache.get_at("k", stored + Duration::seconds(60)), None);
        assert!(cache.is_empty());
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = ResultCache::new(60);
        let now = Utc::now();
        cache.put_at("old", payload(), now - Duration::seconds(120));
        cache.put_at("fresh", payload(), now);

        assert_eq!(cache.purge_expired_at(now), 1);
        assert_eq!(cache.keys(), vec!["fresh".to_string()]);
    }

    #[test]
    fn test_later_put_wins() {
        let cache = ResultCache::new(60);
        cache.put("k", Vec::new());
        cache.put("k", payload());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some(payload()));
    }
}
