// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time-expiring in-memory [`StateStore`].

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::StateStore;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u32,
    expires_at: Instant,
}

/// A key/value store whose entries expire a fixed time after their last write.
///
/// Expired entries read as absent and are purged lazily. An optional key
/// limit makes writes of new keys fail once the store is full; overwriting an
/// existing key always succeeds.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use telldus_bridge::cache::{MemoryStore, StateStore};
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new(Duration::from_secs(3600)).with_max_keys(1);
/// assert!(store.set("td1", 2));
/// assert!(!store.set("td2", 1));
/// assert_eq!(store.get("td1"), Some(2));
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    ttl: Duration,
    max_keys: Option<usize>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Default time-to-live of an entry.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates a store whose entries live `ttl` after their last write.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_keys: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Limits the number of live keys.
    #[must_use]
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    /// Returns true if the store holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

impl StateStore for MemoryStore {
    fn set(&self, key: &str, value: u32) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if let Some(max) = self.max_keys
            && !entries.contains_key(key)
        {
            entries.retain(|_, e| e.expires_at > now);
            if entries.len() >= max {
                return false;
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
        true
    }

    fn get(&self, key: &str) -> Option<u32> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn flush(&self) {
        self.entries.lock().clear();
    }
}
