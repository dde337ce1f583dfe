//! Out-of-band validation hand-off
//!
//! A background validator writes its outcome here; the next hook invocation
//! picks up a failure, unless the user has spoken since it was recorded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::cache::{CacheSummary, SessionCache};
use crate::store::{CacheDocument, SessionScopedStore, Singleton, StateContext, StoreLimits, Timestamped};

pub(crate) const PENDING_FILE: &str = "pending-validation.json";
const PENDING_LIMITS: StoreLimits = StoreLimits::ttl_only(Duration::from_secs(30 * 60));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ValidationStatus {
    #[default]
    Pending,
    Passed,
    Failed,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Passed => "passed",
            ValidationStatus::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct PendingValidation {
    pub(crate) tool_name: String,
    #[serde(default)]
    pub(crate) file_path: String,
    pub(crate) timestamp: i64,
    pub(crate) status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) user_message_hash: Option<String>,
}

impl Timestamped for PendingValidation {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp
    }
}

pub(crate) struct PendingValidationQueue {
    store: SessionScopedStore<Singleton<PendingValidation>>,
}

impl PendingValidationQueue {
    pub(crate) fn new(ctx: &StateContext) -> Self {
        Self {
            store: ctx.store(PENDING_FILE, PENDING_LIMITS),
        }
    }

    /// Store `record`, stamped with the current time
    pub(crate) fn write_pending_validation(&self, mut record: PendingValidation) {
        record.timestamp = self.store.now_ms();
        self.store.update(|_| Singleton {
            value: Some(record),
        });
    }

    /// The recorded failure, if any. A supplied hash that differs from the
    /// one stored with the record marks it stale: it is cleared instead.
    pub(crate) fn check_pending_validation(
        &self,
        current_user_message_hash: Option<&str>,
    ) -> Option<PendingValidation> {
        let record = self.store.load().value?;

        if let Some(current) = current_user_message_hash
            && record.user_message_hash.as_deref() != Some(current)
        {
            tracing::debug!("discarding stale pending validation");
            let _ = self.store.clear();
            return None;
        }

        (record.status == ValidationStatus::Failed).then_some(record)
    }

    pub(crate) fn clear_pending_validation(&self) {
        let _ = self.store.clear();
    }
}

impl SessionCache for PendingValidationQueue {
    fn name(&self) -> &'static str {
        "pending-validation"
    }

    fn clear(&self) {
        self.clear_pending_validation();
    }

    fn summary(&self) -> CacheSummary {
        let doc = self.store.load();
        let detail = doc
            .value
            .as_ref()
            .map(|r| format!("{} {} ({})", r.tool_name, r.file_path, r.status))
            .unwrap_or_default();
        CacheSummary::new(self.name(), doc.len(), detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::test_context;

    fn failed(hash: &str) -> PendingValidation {
        PendingValidation {
            tool_name: "Edit".to_string(),
            file_path: "src/lib.rs".to_string(),
            status: ValidationStatus::Failed,
            failure_reason: Some("cargo check failed".to_string()),
            user_message_hash: Some(hash.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn failed_record_surfaces_for_matching_hash() {
        let (_dir, _clock, ctx) = test_context();
        let queue = PendingValidationQueue::new(&ctx);
        queue.write_pending_validation(failed("h1"));

        let record = queue.check_pending_validation(Some("h1")).unwrap();
        assert_eq!(record.failure_reason.as_deref(), Some("cargo check failed"));
        assert!(record.timestamp > 0);
    }

    #[test]
    fn different_hash_clears_record() {
        let (_dir, _clock, ctx) = test_context();
        let queue = PendingValidationQueue::new(&ctx);
        queue.write_pending_validation(failed("h1"));

        assert!(queue.check_pending_validation(Some("h2")).is_none());
        assert!(queue.check_pending_validation(Some("h1")).is_none());
    }

    #[test]
    fn passed_record_is_not_returned() {
        let (_dir, _clock, ctx) = test_context();
        let queue = PendingValidationQueue::new(&ctx);
        queue.write_pending_validation(PendingValidation {
            status: ValidationStatus::Passed,
            ..failed("h1")
        });
        assert!(queue.check_pending_validation(Some("h1")).is_none());
        assert!(queue.check_pending_validation(None).is_none());
    }

    #[test]
    fn no_hash_supplied_returns_failure() {
        let (_dir, _clock, ctx) = test_context();
        let queue = PendingValidationQueue::new(&ctx);
        queue.write_pending_validation(failed("h1"));
        assert!(queue.check_pending_validation(None).is_some());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(failed("h")).unwrap();
        assert_eq!(json["status"].as_str(), Some("failed"));
    }
}
