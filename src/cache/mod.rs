//! Specialized session caches built on the scoped store

mod ack;
mod confirm;
mod escalation;
mod pending;
mod strict;

pub(crate) use ack::AckCache;
pub(crate) use confirm::ConfirmGate;
pub(crate) use escalation::{EscalationTracker, normalize_denial_pattern};
pub(crate) use pending::{PendingValidation, PendingValidationQueue, ValidationStatus};
#[cfg(test)]
pub(crate) use strict::StrictReason;
pub(crate) use strict::{StrictDecision, StrictModeTracker};

use serde::Serialize;

use crate::store::StateContext;

/// One line of `state show`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CacheSummary {
    pub(crate) name: &'static str,
    pub(crate) entries: usize,
    pub(crate) detail: String,
}

impl CacheSummary {
    pub(crate) fn new(name: &'static str, entries: usize, detail: String) -> Self {
        Self {
            name,
            entries,
            detail,
        }
    }
}

pub(crate) trait SessionCache {
    fn name(&self) -> &'static str;

    fn clear(&self);

    fn summary(&self) -> CacheSummary;
}

/// Every per-session cache, scoped to one context
pub(crate) struct SessionCaches {
    pub(crate) escalation: EscalationTracker,
    pub(crate) confirm: ConfirmGate,
    pub(crate) ack: AckCache,
    pub(crate) pending: PendingValidationQueue,
    pub(crate) strict: StrictModeTracker,
}

impl SessionCaches {
    pub(crate) fn new(ctx: &StateContext) -> Self {
        Self {
            escalation: EscalationTracker::new(ctx),
            confirm: ConfirmGate::new(ctx),
            ack: AckCache::new(ctx),
            pending: PendingValidationQueue::new(ctx),
            strict: StrictModeTracker::new(ctx),
        }
    }

    /// A new user instruction may be a deliberate retry: forget denial,
    /// decline, and acknowledgment memory. Returns true when it was new.
    pub(crate) fn check_user_message(&self, text: &str) -> bool {
        let escalation = self.escalation.check_user_message(text);
        let confirm = self.confirm.check_user_message(text);
        let ack = self.ack.check_user_message(text);
        escalation || confirm || ack
    }

    pub(crate) fn all(&self) -> [&dyn SessionCache; 5] {
        [
            &self.escalation,
            &self.confirm,
            &self.ack,
            &self.pending,
            &self.strict,
        ]
    }

    pub(crate) fn clear_all(&self) {
        for cache in self.all() {
            cache.clear();
        }
    }
}
