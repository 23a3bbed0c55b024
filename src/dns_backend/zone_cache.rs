// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! A small TTL cache, replacing a memoizing-decorator pattern with an
//! explicit `(value, expiresAt)` struct guarded by a mutex for concurrent
//! fill.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A TTL-bounded cache keyed by `K`, storing one value per key.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: std::hash::Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    /// Create a cache whose entries expire `ttl` after insertion.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, if present and not yet expired.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).filter(|e| e.expires_at > Instant::now()).map(|e| e.value.clone())
    }

    /// Insert or replace the cached value for `key`, resetting its TTL.
    pub fn put(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop every cached entry, forcing the next lookup to miss.
    pub fn invalidate_all(&self) {
        self.entries.lock().unwrap().clear();
    }
}
