//! Time-bounded memoisation of loaded data.
//!
//! The cache is an ordinary value owned by whoever loads data; there is no
//! process-wide instance. Entries older than the TTL are reloaded on the next
//! access and can be dropped explicitly at any time.

use moka::sync::Cache;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

const MAX_ENTRIES: u64 = 1_000;

#[derive(Clone)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Cache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(ttl: Duration) -> TtlCache<V> {
        TtlCache {
            ttl,
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_ENTRIES)
                .build(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: &str, value: V) {
        self.entries.insert(key.to_string(), value);
    }

    /// Returns the cached value for `key`, loading and storing it when it is
    /// missing or expired. A failed load leaves the cache untouched.
    pub fn get_or_try_insert_with<E, F>(&self, key: &str, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.entries.get(key) {
            debug!(key, "cache hit");
            return Ok(value);
        }
        debug!(key, "cache miss");
        let value = load()?;
        self.entries.insert(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.invalidate(key);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::thread::sleep;

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.insert("etfs", 1);
        assert_eq!(cache.get("etfs"), Some(1));
        assert_eq!(cache.get("missing"), None);

        sleep(Duration::from_millis(120));
        assert_eq!(cache.get("etfs"), None);
    }

    #[test]
    fn test_load_through() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok::<_, ()>(format!("load {}", loads.get()))
        };

        for _ in 0..3 {
            assert_eq!(cache.get_or_try_insert_with("k", load).unwrap(), "load 1");
        }
        assert_eq!(loads.get(), 1);

        cache.invalidate("k");
        assert_eq!(cache.get_or_try_insert_with("k", load).unwrap(), "load 2");
    }

    #[test]
    fn test_expired_entry_is_reloaded() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(50));
        assert_eq!(cache.get_or_try_insert_with("k", || Ok::<_, ()>(1)), Ok(1));
        assert_eq!(cache.get_or_try_insert_with("k", || Ok::<_, ()>(2)), Ok(1));

        sleep(Duration::from_millis(120));
        assert_eq!(cache.get_or_try_insert_with("k", || Ok::<_, ()>(3)), Ok(3));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::default();
        let result = cache.get_or_try_insert_with("k", || Err("boom"));
        assert_eq!(result, Err("boom"));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_clear() {
        let cache = TtlCache::default();
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.clear();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.ttl(), DEFAULT_TTL);
    }
}
