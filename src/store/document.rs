//! Cache document shapes
//!
//! Every cache kind persists one document. List-backed kinds use
//! [`EntryList`]; single-record kinds use [`Singleton`], which behaves as a
//! list of at most one entry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Records that carry the timestamp used for expiry and eviction order
pub(crate) trait Timestamped {
    fn timestamp_ms(&self) -> i64;
}

/// Accessors the store needs to bound a document
pub(crate) trait CacheDocument: Default + Serialize + DeserializeOwned {
    /// Drop entries stamped strictly before `cutoff_ms`
    fn expire_before(&mut self, cutoff_ms: i64);

    /// Keep at most `max` entries, evicting the oldest
    fn keep_newest(&mut self, max: usize);

    fn len(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EntryList<T> {
    #[serde(default = "Vec::new")]
    pub(crate) entries: Vec<T>,
}

impl<T> Default for EntryList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> CacheDocument for EntryList<T>
where
    T: Timestamped + Serialize + DeserializeOwned,
{
    fn expire_before(&mut self, cutoff_ms: i64) {
        self.entries.retain(|e| e.timestamp_ms() >= cutoff_ms);
    }

    fn keep_newest(&mut self, max: usize) {
        let len = self.entries.len();
        if len <= max {
            return;
        }
        // Evict by timestamp, not position: in-place updates refresh stamps.
        let mut by_age: Vec<usize> = (0..len).collect();
        by_age.sort_by_key(|&i| self.entries[i].timestamp_ms());
        let evicted: HashSet<usize> = by_age[..len - max].iter().copied().collect();

        let mut index = 0;
        self.entries.retain(|_| {
            let keep = !evicted.contains(&index);
            index += 1;
            keep
        });
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Singleton<T> {
    #[serde(default = "Option::default")]
    pub(crate) value: Option<T>,
}

impl<T> Default for Singleton<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> CacheDocument for Singleton<T>
where
    T: Timestamped + Serialize + DeserializeOwned,
{
    fn expire_before(&mut self, cutoff_ms: i64) {
        if self
            .value
            .as_ref()
            .is_some_and(|v| v.timestamp_ms() < cutoff_ms)
        {
            self.value = None;
        }
    }

    fn keep_newest(&mut self, max: usize) {
        if max == 0 {
            self.value = None;
        }
    }

    fn len(&self) -> usize {
        usize::from(self.value.is_some())
    }
}
