//! Repeated-denial detection
//!
//! Counts denials per normalized pattern. Three equivalent denials inside the
//! expiry window mean the assistant is looping on workarounds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::cache::{CacheSummary, SessionCache};
use crate::store::{CacheDocument, EntryList, SessionScopedStore, StateContext, StoreLimits, Timestamped};

pub(crate) const ESCALATION_FILE: &str = "escalation.json";
pub(crate) const ESCALATION_THRESHOLD: u32 = 3;
const ESCALATION_LIMITS: StoreLimits = StoreLimits::new(Duration::from_secs(30 * 60), 50);

/// Leading command words kept when normalizing a shell denial
const PATTERN_WORDS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DenialRecord {
    pub(crate) pattern: String,
    pub(crate) count: u32,
    pub(crate) timestamp: i64,
}

impl Timestamped for DenialRecord {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp
    }
}

pub(crate) struct EscalationTracker {
    store: SessionScopedStore<EntryList<DenialRecord>>,
}

impl EscalationTracker {
    pub(crate) fn new(ctx: &StateContext) -> Self {
        Self {
            store: ctx.store(ESCALATION_FILE, ESCALATION_LIMITS),
        }
    }

    /// Create or bump the record for `pattern`; returns the new count
    pub(crate) fn record_denial(&self, pattern: &str) -> u32 {
        let now = self.store.now_ms();
        let doc = self.store.update(|mut doc| {
            match doc.entries.iter_mut().find(|r| r.pattern == pattern) {
                Some(record) => {
                    record.count += 1;
                    record.timestamp = now;
                }
                None => doc.entries.push(DenialRecord {
                    pattern: pattern.to_string(),
                    count: 1,
                    timestamp: now,
                }),
            }
            doc
        });
        doc.entries
            .iter()
            .find(|r| r.pattern == pattern)
            .map_or(1, |r| r.count)
    }

    pub(crate) fn denial_count(&self, pattern: &str) -> u32 {
        self.store
            .load()
            .entries
            .iter()
            .find(|r| r.pattern == pattern)
            .map_or(0, |r| r.count)
    }

    pub(crate) fn is_workaround_escalation(&self, pattern: &str) -> bool {
        self.denial_count(pattern) >= ESCALATION_THRESHOLD
    }

    pub(crate) fn check_user_message(&self, text: &str) -> bool {
        self.store.check_user_message(text)
    }
}

impl SessionCache for EscalationTracker {
    fn name(&self) -> &'static str {
        "escalation"
    }

    fn clear(&self) {
        let _ = self.store.clear();
    }

    fn summary(&self) -> CacheSummary {
        let doc = self.store.load();
        let detail = doc
            .entries
            .iter()
            .max_by_key(|r| r.count)
            .map(|r| format!("top: {} ×{}", r.pattern, r.count))
            .unwrap_or_default();
        CacheSummary::new(self.name(), doc.len(), detail)
    }
}

/// Group equivalent attempts: tool name plus the leading command words,
/// lowercased with digit runs collapsed.
pub(crate) fn normalize_denial_pattern(tool_name: &str, tool_input: &Value) -> String {
    let subject = tool_input
        .get("command")
        .and_then(Value::as_str)
        .map(|cmd| {
            cmd.split_whitespace()
                .take(PATTERN_WORDS)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .or_else(|| {
            ["file_path", "notebook_path", "path", "url"]
                .iter()
                .find_map(|k| tool_input.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        })
        .unwrap_or_default();

    let mut normalized = String::with_capacity(tool_name.len() + subject.len() + 1);
    normalized.push_str(&tool_name.to_lowercase());
    normalized.push(':');
    let mut in_digits = false;
    for c in subject.to_lowercase().chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                normalized.push('#');
            }
            in_digits = true;
        } else {
            normalized.push(c);
            in_digits = false;
        }
    }
    normalized
}
