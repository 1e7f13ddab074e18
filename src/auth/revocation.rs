/// Revocation tracking for issued tokens.
///
/// Entries are keyed by the token's `jti` and remember the token's own expiry;
/// once that passes the entry is useless and gets purged.
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Storage for revoked token identifiers.
///
/// `insert` must be atomic with respect to `contains`: a reader sees either the
/// set before or after the insert, never a partial write.
pub trait RevocationStore: Send + Sync {
    /// True if `jti` has been revoked and not yet purged.
    fn contains(&self, jti: &str) -> bool;

    /// Record `jti` as revoked until `expires_at` (unix seconds).
    /// Returns false if it was already revoked.
    fn insert(&self, jti: &str, expires_at: i64) -> bool;

    /// Drop entries whose token expired at or before `now`. Returns how many were removed.
    fn purge_expired(&self, now: i64) -> usize;
}

struct Entries {
    by_jti: HashMap<String, i64>,
    /// Earliest expiry still held; nothing can be purged before this instant.
    next_expiry: i64,
}

impl Default for Entries {
    fn default() -> Self {
        Entries {
            by_jti: HashMap::new(),
            next_expiry: i64::MAX,
        }
    }
}

impl Entries {
    fn purge(&mut self, now: i64) -> usize {
        if now < self.next_expiry {
            return 0;
        }

        let before = self.by_jti.len();
        self.by_jti.retain(|_, exp| *exp > now);
        self.next_expiry = self.by_jti.values().copied().min().unwrap_or(i64::MAX);
        before - self.by_jti.len()
    }
}

/// Process-local revocation set.
///
/// Inserts only sweep once the earliest tracked expiry has passed, so a logout
/// does not pay for a full scan while every entry is still live.
#[derive(Default)]
pub struct MemoryRevocationStore {
    entries: Mutex<Entries>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_jti.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().by_jti.is_empty()
    }
}

impl RevocationStore for MemoryRevocationStore {
    fn contains(&self, jti: &str) -> bool {
        self.entries.lock().by_jti.contains_key(jti)
    }

    fn insert(&self, jti: &str, expires_at: i64) -> bool {
        let now = Utc::now().timestamp();
        let mut entries = self.entries.lock();
        entries.purge(now);

        if entries.by_jti.contains_key(jti) {
            return false;
        }
        entries.by_jti.insert(jti.to_string(), expires_at);
        entries.next_expiry = entries.next_expiry.min(expires_at);
        true
    }

    fn purge_expired(&self, now: i64) -> usize {
        self.entries.lock().purge(now)
    }
}
