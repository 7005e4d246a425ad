//! Store capability consumed by the handlers.
//!
//! The store has a primary keyspace (`get`/`set`) and a cache keyspace with
//! per-record TTL (`cache_get`/`cache_set`). `MemoryStore` keeps both in
//! process; the cache keyspace is LRU-bounded.

use anyhow::{Context, Result};
use lru::LruCache;
use scoring_shared::StoreError;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Read a cache record; expired records read as absent
    fn cache_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a cache record. A zero `ttl` never expires.
    fn cache_set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub key: String,
    pub value: String,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheRecord {
    pub fn new(key: &str, value: &str, ttl: Duration) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        !self.ttl.is_zero() && now.saturating_duration_since(self.created_at) >= self.ttl
    }
}

/// In-process store
pub struct MemoryStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
    cache: Mutex<LruCache<String, CacheRecord>>,
}

impl MemoryStore {
    /// * `cache_capacity` - Maximum number of cache records kept
    pub fn new(cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            data: Mutex::new(HashMap::new()),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Load primary-keyspace records from a JSON object file.
    ///
    /// String values are stored as-is, anything else as its JSON text, so
    /// `{"i:1": ["books", "music"]}` stores the list under `i:1`.
    pub fn seed_from_file(&self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let records: serde_json::Map<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("Seed file {} is not a JSON object", path.display()))?;

        let count = records.len();
        for (key, value) in records {
            let bytes = match value {
                Value::String(s) => s.into_bytes(),
                other => other.to_string().into_bytes(),
            };
            self.set(&key, &bytes)?;
        }
        info!("Seeded {} records from {}", count, path.display());
        Ok(count)
    }

    /// Drop expired cache records
    pub fn prune_expired(&self) -> Result<usize, StoreError> {
        let mut cache = lock(&self.cache)?;
        let now = Instant::now();

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            cache.pop(key);
        }
        Ok(expired.len())
    }

    pub fn cache_len(&self) -> Result<usize, StoreError> {
        Ok(lock(&self.cache)?.len())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(lock(&self.data)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        lock(&self.data)?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn cache_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut cache = lock(&self.cache)?;
        match cache.get(key) {
            Some(record) if !record.is_expired(Instant::now()) => {
                return Ok(Some(record.value.clone()))
            }
            Some(_) => {}
            None => return Ok(None),
        }

        debug!("Cache record {} expired", key);
        cache.pop(key);
        Ok(None)
    }

    fn cache_set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        lock(&self.cache)?.put(key.to_string(), CacheRecord::new(key, value, ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_primary_keyspace_roundtrip() {
        let store = MemoryStore::default();
        assert_eq!(store.get("i:1").unwrap(), None);
        store.set("i:1", b"[\"books\"]").unwrap();
        assert_eq!(store.get("i:1").unwrap(), Some(b"[\"books\"]".to_vec()));
    }

    #[test]
    fn test_record_expiry_rule() {
        let record = CacheRecord::new("k", "1", Duration::from_secs(10));
        let start = record.created_at;
        assert!(!record.is_expired(start));
        assert!(!record.is_expired(start + Duration::from_secs(9)));
        assert!(record.is_expired(start + Duration::from_secs(10)));

        let forever = CacheRecord::new("k", "1", Duration::ZERO);
        assert!(!forever.is_expired(forever.created_at + Duration::from_secs(1_000_000)));
    }

    #[test]
    fn test_cache_expiration() {
        let store = MemoryStore::default();
        store.cache_set("uid:a", "3.0", Duration::from_millis(50)).unwrap();
        assert_eq!(store.cache_get("uid:a").unwrap().as_deref(), Some("3.0"));

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(store.cache_get("uid:a").unwrap(), None);
        assert_eq!(store.cache_len().unwrap(), 0);
    }

    #[test]
    fn test_prune_expired() {
        let store = MemoryStore::default();
        store.cache_set("short", "1", Duration::from_millis(10)).unwrap();
        store.cache_set("long", "1", Duration::from_secs(60)).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(store.prune_expired().unwrap(), 1);
        assert_eq!(store.cache_len().unwrap(), 1);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let store = MemoryStore::new(2);
        store.cache_set("k1", "1", Duration::ZERO).unwrap();
        store.cache_set("k2", "2", Duration::ZERO).unwrap();
        store.cache_set("k3", "3", Duration::ZERO).unwrap();

        assert_eq!(store.cache_get("k1").unwrap(), None);
        assert!(store.cache_get("k2").unwrap().is_some());
        assert!(store.cache_get("k3").unwrap().is_some());
    }

    #[test]
    fn test_seed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"i:1": ["books", "music"], "greeting": "hello"}}"#).unwrap();

        let store = MemoryStore::default();
        assert_eq!(store.seed_from_file(file.path()).unwrap(), 2);
        assert_eq!(
            store.get("i:1").unwrap(),
            Some(br#"["books","music"]"#.to_vec())
        );
        assert_eq!(store.get("greeting").unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_seed_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(MemoryStore::default().seed_from_file(file.path()).is_err());
    }
}
