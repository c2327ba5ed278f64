use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::domain::clock::Clock;

struct CacheEntry<V> {
    expires_at: DateTime<Utc>,
    value: V,
}

/// In-memory cache with per-entry expiry. Time comes from the injected
/// clock, never from the wall directly, so expiry is testable.
pub struct TtlCache<V> {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value if present and not yet expired.
    /// Expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key, CacheEntry { expires_at, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;

    struct ManualClock {
        now: StdMutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: StdMutex::new(now),
            })
        }

        fn advance(&self, delta: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += delta;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn returns_value_before_expiry() {
        let clock = ManualClock::starting_at(base_time());
        let cache: TtlCache<String> = TtlCache::new(clock.clone(), Duration::seconds(60));

        cache.insert("k".to_string(), "v".to_string());
        clock.advance(Duration::seconds(59));

        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn drops_value_after_expiry() {
        let clock = ManualClock::starting_at(base_time());
        let cache: TtlCache<String> = TtlCache::new(clock.clone(), Duration::seconds(60));

        cache.insert("k".to_string(), "v".to_string());
        clock.advance(Duration::seconds(61));

        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn missing_key_is_none() {
        let clock = ManualClock::starting_at(base_time());
        let cache: TtlCache<i32> = TtlCache::new(clock, Duration::seconds(10));

        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn reinsert_refreshes_expiry() {
        let clock = ManualClock::starting_at(base_time());
        let cache: TtlCache<i32> = TtlCache::new(clock.clone(), Duration::seconds(60));

        cache.insert("k".to_string(), 1);
        clock.advance(Duration::seconds(50));
        cache.insert("k".to_string(), 2);
        clock.advance(Duration::seconds(50));

        assert_eq!(cache.get("k"), Some(2));
    }
}
