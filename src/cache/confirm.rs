//! Declined-verdict memory for gated actions
//!
//! Once a quality gate declines a gated action, re-running that action is
//! refused until the user speaks again, the action succeeds, or the user
//! explicitly asks for it in a message newer than the one that led to the
//! decline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::{CacheSummary, SessionCache};
use crate::store::{SessionScopedStore, Singleton, StateContext, StoreLimits, Timestamped};

pub(crate) const CONFIRM_FILE: &str = "confirm.json";
const CONFIRM_LIMITS: StoreLimits = StoreLimits::ttl_only(Duration::from_secs(60 * 60));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ConfirmState {
    pub(crate) declined: bool,
    #[serde(default)]
    pub(crate) reason: String,
    pub(crate) timestamp: i64,
    /// Hash of the user message in effect when the decline was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) user_message_hash: Option<String>,
}

impl Timestamped for ConfirmState {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp
    }
}

pub(crate) struct ConfirmGate {
    store: SessionScopedStore<Singleton<ConfirmState>>,
}

impl ConfirmGate {
    pub(crate) fn new(ctx: &StateContext) -> Self {
        Self {
            store: ctx.store(CONFIRM_FILE, CONFIRM_LIMITS),
        }
    }

    pub(crate) fn record_confirm_declined(&self, reason: &str, user_message_hash: Option<&str>) {
        let now = self.store.now_ms();
        self.store.update(|_| Singleton {
            value: Some(ConfirmState {
                declined: true,
                reason: reason.to_string(),
                timestamp: now,
                user_message_hash: user_message_hash.map(str::to_string),
            }),
        });
    }

    /// Current state; "not declined" when nothing is recorded
    pub(crate) fn check_confirm_declined(&self) -> ConfirmState {
        self.store
            .load()
            .value
            .filter(|s| s.declined)
            .unwrap_or_default()
    }

    pub(crate) fn clear_confirm_state(&self) {
        let _ = self.store.clear();
    }

    pub(crate) fn check_user_message(&self, text: &str) -> bool {
        self.store.check_user_message(text)
    }
}

impl SessionCache for ConfirmGate {
    fn name(&self) -> &'static str {
        "confirm"
    }

    fn clear(&self) {
        self.clear_confirm_state();
    }

    fn summary(&self) -> CacheSummary {
        let state = self.check_confirm_declined();
        let detail = if state.declined {
            format!("declined: {}", state.reason)
        } else {
            String::new()
        };
        CacheSummary::new(self.name(), usize::from(state.declined), detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::test_context;

    #[test]
    fn declined_then_cleared() {
        let (_dir, _clock, ctx) = test_context();
        let gate = ConfirmGate::new(&ctx);

        gate.record_confirm_declined("missing tests", None);
        let state = gate.check_confirm_declined();
        assert!(state.declined);
        assert_eq!(state.reason, "missing tests");

        gate.clear_confirm_state();
        let state = gate.check_confirm_declined();
        assert!(!state.declined);
        assert!(state.reason.is_empty());
    }

    #[test]
    fn decline_remembers_triggering_message() {
        let (_dir, _clock, ctx) = test_context();
        let gate = ConfirmGate::new(&ctx);
        gate.record_confirm_declined("tests failing", Some("h1"));
        assert_eq!(
            gate.check_confirm_declined().user_message_hash.as_deref(),
            Some("h1")
        );
    }

    #[test]
    fn absent_state_is_not_declined() {
        let (_dir, _clock, ctx) = test_context();
        assert!(!ConfirmGate::new(&ctx).check_confirm_declined().declined);
    }

    #[test]
    fn new_user_message_clears_declined() {
        let (_dir, _clock, ctx) = test_context();
        let gate = ConfirmGate::new(&ctx);
        gate.check_user_message("commit it");
        gate.record_confirm_declined("lint failures", None);
        gate.check_user_message("ok fix lint then commit");
        assert!(!gate.check_confirm_declined().declined);
    }

    #[test]
    fn declined_state_expires() {
        let (_dir, clock, ctx) = test_context();
        let gate = ConfirmGate::new(&ctx);
        gate.record_confirm_declined("stale", None);
        clock.advance(Duration::from_secs(61 * 60));
        assert!(!gate.check_confirm_declined().declined);
    }
}
