//! Acknowledged-error deduplication
//!
//! The same unresolved failure text is surfaced once; later sightings are
//! suppressed until an action succeeds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::{CacheSummary, SessionCache};
use crate::store::{CacheDocument, EntryList, SessionScopedStore, StateContext, StoreLimits, Timestamped};
use crate::utils::{sha256_hex, snippet};

pub(crate) const ACK_FILE: &str = "ack.json";
const ACK_LIMITS: StoreLimits = StoreLimits::new(Duration::from_secs(15 * 60), 20);
pub(crate) const ACK_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AckEntry {
    pub(crate) hash: String,
    pub(crate) snippet: String,
    pub(crate) timestamp: i64,
}

impl Timestamped for AckEntry {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp
    }
}

pub(crate) struct AckCache {
    store: SessionScopedStore<EntryList<AckEntry>>,
}

impl AckCache {
    pub(crate) fn new(ctx: &StateContext) -> Self {
        Self {
            store: ctx.store(ACK_FILE, ACK_LIMITS),
        }
    }

    pub(crate) fn is_error_acknowledged(&self, text: &str) -> bool {
        let hash = sha256_hex(text);
        self.store.load().entries.iter().any(|e| e.hash == hash)
    }

    pub(crate) fn mark_error_acknowledged(&self, text: &str) {
        let hash = sha256_hex(text);
        let now = self.store.now_ms();
        self.store.update(|mut doc| {
            if !doc.entries.iter().any(|e| e.hash == hash) {
                doc.entries.push(AckEntry {
                    hash,
                    snippet: snippet(text, ACK_SNIPPET_CHARS),
                    timestamp: now,
                });
            }
            doc
        });
    }

    pub(crate) fn clear_ack_cache(&self) {
        let _ = self.store.clear();
    }

    pub(crate) fn check_user_message(&self, text: &str) -> bool {
        self.store.check_user_message(text)
    }
}

impl SessionCache for AckCache {
    fn name(&self) -> &'static str {
        "ack"
    }

    fn clear(&self) {
        self.clear_ack_cache();
    }

    fn summary(&self) -> CacheSummary {
        let doc = self.store.load();
        let detail = doc
            .entries
            .last()
            .map(|e| snippet(&e.snippet, 60))
            .unwrap_or_default();
        CacheSummary::new(self.name(), doc.len(), detail)
    }
}
