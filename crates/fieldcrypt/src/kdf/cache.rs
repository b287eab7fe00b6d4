//! [`KeyCache`]: bounded, TTL-limited cache of derived keys keyed by salt.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use super::{DerivedKey, KdfError, KeyDerivation};
use crate::config::Secret;
use crate::crypto::SALT_LEN;

/// One cached key and the moment it was derived.
struct CacheEntry {
    key: DerivedKey,
    inserted_at: Instant,
}

/// Largest size that is still at or under 90% of `capacity`.
fn cleanup_threshold(capacity: usize) -> usize {
    capacity - capacity.div_ceil(10)
}

impl CacheEntry {
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Process-wide cache of derived keys.
///
/// Owns the secret and the [`KeyDerivation`] implementation so that a cache
/// miss can derive on its own. The map sits behind a single mutex: lookup,
/// insertion, size check and eviction each happen under one lock acquisition.
/// The derivation itself runs unlocked, so two threads missing on the same
/// salt may both derive it; the second insert simply overwrites the first.
///
/// **Strict TTL.** A hit does not refresh `inserted_at`. An entry expires one
/// TTL after it was derived no matter how often it is read, which bounds how
/// long any key stays resident in memory.
pub struct KeyCache {
    secret: Secret,
    kdf: Box<dyn KeyDerivation>,
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl KeyCache {
    /// Create an empty cache.
    pub fn new(
        secret: Secret,
        kdf: Box<dyn KeyDerivation>,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            secret,
            kdf,
            capacity,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Maximum number of entries kept after any insertion.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries currently held, live or expired.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached key.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Return the key for `salt`, deriving and caching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`KdfError::MissingSecret`] if the secret is empty, or whatever
    /// the [`KeyDerivation`] reports.
    pub fn get_or_derive(&self, salt: &[u8; SALT_LEN]) -> Result<DerivedKey, KdfError> {
        self.get_or_derive_at(salt, Instant::now())
    }

    /// [`get_or_derive`](Self::get_or_derive) with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Same as [`get_or_derive`](Self::get_or_derive).
    pub fn get_or_derive_at(
        &self,
        salt: &[u8; SALT_LEN],
        now: Instant,
    ) -> Result<DerivedKey, KdfError> {
        // Checked on every call: the cache can be built before the secret is final.
        if self.secret.is_empty() {
            return Err(KdfError::MissingSecret);
        }

        let cache_key = STANDARD.encode(salt);
        if let Some(entry) = self.lock().get(&cache_key) {
            if entry.is_live(now, self.ttl) {
                return Ok(entry.key.clone());
            }
        }

        let key = self.kdf.derive(self.secret.expose(), salt)?;

        let mut entries = self.lock();
        entries.insert(
            cache_key,
            CacheEntry {
                key: key.clone(),
                inserted_at: now,
            },
        );
        // Clean up opportunistically once the cache is 90% full.
        if entries.len() > cleanup_threshold(self.capacity) {
            self.cleanup(&mut entries, now);
        }
        Ok(key)
    }

    /// Drop expired entries, then the oldest ones until at most `capacity` remain.
    fn cleanup(&self, entries: &mut HashMap<String, CacheEntry>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now, self.ttl));

        if entries.len() > self.capacity {
            let mut by_age: Vec<(Instant, String)> = entries
                .iter()
                .map(|(k, entry)| (entry.inserted_at, k.clone()))
                .collect();
            by_age.sort_unstable_by_key(|(inserted_at, _)| *inserted_at);

            let excess = entries.len() - self.capacity;
            for (_, k) in by_age.into_iter().take(excess) {
                entries.remove(&k);
            }
        }

        debug!(
            evicted = before - entries.len(),
            remaining = entries.len(),
            "key cache cleanup"
        );
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // The map holds no invariants a panicking holder could break halfway.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("secret", &self.secret)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{MockKeyDerivation, ScryptKdf};
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(300);

    /// A mock that must be called exactly `times` times and returns a key
    /// whose bytes echo the first salt byte.
    fn counting_kdf(times: usize) -> Box<MockKeyDerivation> {
        let mut kdf = MockKeyDerivation::new();
        kdf.expect_derive()
            .times(times)
            .returning(|_, salt| Ok(DerivedKey::from_bytes([salt[0]; 32])));
        Box::new(kdf)
    }

    fn salt(n: u8) -> [u8; SALT_LEN] {
        let mut s = [0u8; SALT_LEN];
        s[0] = n;
        s[SALT_LEN - 1] = n.wrapping_mul(31);
        s
    }

    fn salt_u16(n: u16) -> [u8; SALT_LEN] {
        let mut s = [0u8; SALT_LEN];
        s[..2].copy_from_slice(&n.to_be_bytes());
        s
    }

    #[test]
    fn hit_within_ttl_skips_derivation() {
        let cache = KeyCache::new(Secret::new("s"), counting_kdf(1), 100, TTL);
        let t0 = Instant::now();
        let a = cache.get_or_derive_at(&salt(1), t0).unwrap();
        let b = cache
            .get_or_derive_at(&salt(1), t0 + Duration::from_secs(299))
            .unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entry_is_rederived() {
        let cache = KeyCache::new(Secret::new("s"), counting_kdf(2), 100, TTL);
        let t0 = Instant::now();
        cache.get_or_derive_at(&salt(1), t0).unwrap();
        cache.get_or_derive_at(&salt(1), t0 + TTL).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn reads_do_not_refresh_ttl() {
        // Reads at 200s and 299s must not push expiry past t0 + 300s.
        let cache = KeyCache::new(Secret::new("s"), counting_kdf(2), 100, TTL);
        let t0 = Instant::now();
        cache.get_or_derive_at(&salt(9), t0).unwrap();
        cache
            .get_or_derive_at(&salt(9), t0 + Duration::from_secs(200))
            .unwrap();
        cache
            .get_or_derive_at(&salt(9), t0 + Duration::from_secs(299))
            .unwrap();
        cache
            .get_or_derive_at(&salt(9), t0 + Duration::from_secs(301))
            .unwrap();
    }

    #[test]
    fn distinct_salts_each_derive() {
        let cache = KeyCache::new(Secret::new("s"), counting_kdf(3), 100, TTL);
        let t0 = Instant::now();
        for n in 1..=3 {
            let key = cache.get_or_derive_at(&salt(n), t0).unwrap();
            assert_eq!(key.as_bytes()[0], n);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let capacity = 100;
        let cache = KeyCache::new(Secret::new("s"), counting_kdf(250), capacity, TTL);
        let t0 = Instant::now();
        for n in 0..250u16 {
            cache
                .get_or_derive_at(&salt_u16(n), t0 + Duration::from_millis(n as u64))
                .unwrap();
            assert!(cache.len() <= capacity, "len {} after {n}", cache.len());
        }
        assert_eq!(cache.len(), capacity);
    }

    #[test]
    fn over_capacity_evicts_oldest_first() {
        // Capacity 4: 90% threshold is 3.6, so cleanup runs from the 4th insert on.
        let cache = KeyCache::new(Secret::new("s"), counting_kdf(6), 4, TTL);
        let t0 = Instant::now();
        for n in 0..5u8 {
            cache
                .get_or_derive_at(&salt(n), t0 + Duration::from_secs(n as u64))
                .unwrap();
        }
        assert_eq!(cache.len(), 4);
        // salt(0) was the oldest and must have been evicted: this re-derives.
        cache
            .get_or_derive_at(&salt(0), t0 + Duration::from_secs(10))
            .unwrap();
        // salt(4) is still cached: no further derivation (mock allows 6 total).
        cache
            .get_or_derive_at(&salt(4), t0 + Duration::from_secs(11))
            .unwrap();
    }

    #[test]
    fn cleanup_drops_expired_entries() {
        let cache = KeyCache::new(Secret::new("s"), counting_kdf(10), 10, TTL);
        let t0 = Instant::now();
        for n in 0..8u8 {
            cache.get_or_derive_at(&salt(n), t0).unwrap();
        }
        assert_eq!(cache.len(), 8);
        // Past the TTL, the insert that crosses 90% sweeps the expired eight.
        let later = t0 + TTL + Duration::from_secs(1);
        cache.get_or_derive_at(&salt(100), later).unwrap();
        cache.get_or_derive_at(&salt(101), later).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn cleanup_threshold_is_ninety_percent() {
        for capacity in [1usize, 9, 10, 15, 16, 100, 101] {
            let threshold = cleanup_threshold(capacity);
            assert!(threshold * 10 <= capacity * 9, "capacity {capacity}");
            assert!((threshold + 1) * 10 > capacity * 9, "capacity {capacity}");
        }
    }

    #[test]
    fn huge_capacity_does_not_overflow() {
        assert!(cleanup_threshold(usize::MAX) < usize::MAX);

        let cache = KeyCache::new(Secret::new("s"), counting_kdf(2), usize::MAX / 2, TTL);
        cache.get_or_derive(&salt(1)).unwrap();
        cache.get_or_derive(&salt(2)).unwrap();
        assert_eq!(cache.len(), 2);

        let cache = KeyCache::new(Secret::new("s"), counting_kdf(1), usize::MAX, TTL);
        cache.get_or_derive(&salt(1)).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn empty_secret_is_rejected_before_derivation() {
        let cache = KeyCache::new(Secret::new(""), counting_kdf(0), 100, TTL);
        assert!(matches!(
            cache.get_or_derive(&salt(1)),
            Err(KdfError::MissingSecret)
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn derivation_errors_are_not_cached() {
        let mut kdf = MockKeyDerivation::new();
        kdf.expect_derive()
            .times(2)
            .returning(|_, _| Err(KdfError::Derivation));
        let cache = KeyCache::new(Secret::new("s"), Box::new(kdf), 100, TTL);
        assert!(cache.get_or_derive(&salt(1)).is_err());
        assert!(cache.get_or_derive(&salt(1)).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_cache() {
        let cache = KeyCache::new(Secret::new("s"), counting_kdf(2), 100, TTL);
        cache.get_or_derive(&salt(1)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        cache.get_or_derive(&salt(1)).unwrap();
    }

    #[test]
    fn concurrent_access_keeps_bound() {
        let cache = Arc::new(KeyCache::new(
            Secret::new("s"),
            Box::new(ScryptKdf::with_log_n(4)),
            16,
            TTL,
        ));
        std::thread::scope(|scope| {
            for t in 0..8u16 {
                let cache = Arc::clone(&cache);
                scope.spawn(move || {
                    for n in 0..20u16 {
                        let key = cache.get_or_derive(&salt_u16(t * 100 + n)).unwrap();
                        let again = cache.get_or_derive(&salt_u16(t * 100 + n)).unwrap();
                        assert_eq!(key.as_bytes(), again.as_bytes());
                    }
                });
            }
        });
        assert!(cache.len() <= 16);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let cache = KeyCache::new(Secret::new("hunter2"), counting_kdf(0), 100, TTL);
        let rendered = format!("{cache:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("capacity"));
    }
}
