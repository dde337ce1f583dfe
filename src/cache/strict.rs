//! Heightened-scrutiny mode derived from session history

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::cache::{CacheSummary, SessionCache};
use crate::consts::EDIT_TOOLS;
use crate::store::{CacheDocument, SessionScopedStore, StateContext, StoreLimits};

pub(crate) const STRICT_FILE: &str = "strict-mode.json";
/// Strict passes needed before the session leaves its startup window
pub(crate) const SESSION_START_CALLS: u32 = 3;
/// Edits changing more lines than this are always checked strictly
pub(crate) const LARGE_EDIT_LINES: usize = 20;

/// Flat per-session record. It has no entry list and never expires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StrictModeData {
    #[serde(default)]
    pub(crate) session_tool_count: u32,
    #[serde(default)]
    pub(crate) last_denied: bool,
    #[serde(default)]
    pub(crate) last_error: bool,
}

impl CacheDocument for StrictModeData {
    fn expire_before(&mut self, _cutoff_ms: i64) {}

    fn keep_newest(&mut self, _max: usize) {}

    fn len(&self) -> usize {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StrictReason {
    SessionStart,
    PostDenial,
    PostError,
    LargeEdit { lines: usize },
}

impl fmt::Display for StrictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrictReason::SessionStart => f.write_str("session-start"),
            StrictReason::PostDenial => f.write_str("post-denial"),
            StrictReason::PostError => f.write_str("post-error"),
            StrictReason::LargeEdit { lines } => write!(f, "large-edit ({lines} lines)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StrictDecision {
    pub(crate) strict: bool,
    pub(crate) reason: Option<StrictReason>,
}

impl StrictDecision {
    const RELAXED: StrictDecision = StrictDecision {
        strict: false,
        reason: None,
    };

    fn strict(reason: StrictReason) -> Self {
        Self {
            strict: true,
            reason: Some(reason),
        }
    }
}

pub(crate) struct StrictModeTracker {
    store: SessionScopedStore<StrictModeData>,
}

impl StrictModeTracker {
    pub(crate) fn new(ctx: &StateContext) -> Self {
        Self {
            store: ctx.store(STRICT_FILE, StoreLimits::UNBOUNDED),
        }
    }

    pub(crate) fn should_use_strict_mode(&self, tool_name: &str, tool_input: &Value) -> StrictDecision {
        let data = self.store.load();
        if data.session_tool_count < SESSION_START_CALLS {
            return StrictDecision::strict(StrictReason::SessionStart);
        }
        if data.last_denied {
            return StrictDecision::strict(StrictReason::PostDenial);
        }
        if data.last_error {
            return StrictDecision::strict(StrictReason::PostError);
        }
        match changed_line_count(tool_name, tool_input) {
            Some(lines) if lines > LARGE_EDIT_LINES => {
                StrictDecision::strict(StrictReason::LargeEdit { lines })
            }
            _ => StrictDecision::RELAXED,
        }
    }

    pub(crate) fn record_denial(&self) {
        self.store.update(|mut data| {
            data.last_denied = true;
            data
        });
    }

    pub(crate) fn record_error(&self) {
        self.store.update(|mut data| {
            data.last_error = true;
            data
        });
    }

    /// Consume the one-shot flags after a strict pass
    pub(crate) fn clear_one_shots(&self) {
        self.store.update(|mut data| {
            data.last_denied = false;
            data.last_error = false;
            data
        });
    }

    /// Count a passed strict validation toward leaving the startup window
    pub(crate) fn increment_tool_count(&self) {
        self.store.update(|mut data| {
            data.session_tool_count = data.session_tool_count.saturating_add(1);
            data
        });
    }

    pub(crate) fn data(&self) -> StrictModeData {
        self.store.load()
    }
}

impl SessionCache for StrictModeTracker {
    fn name(&self) -> &'static str {
        "strict-mode"
    }

    fn clear(&self) {
        let _ = self.store.clear();
    }

    fn summary(&self) -> CacheSummary {
        let data = self.data();
        let detail = format!(
            "tools={} denied={} error={}",
            data.session_tool_count, data.last_denied, data.last_error
        );
        CacheSummary::new(self.name(), 1, detail)
    }
}

/// Lines touched by an edit-class tool call; `None` for other tools
pub(crate) fn changed_line_count(tool_name: &str, tool_input: &Value) -> Option<usize> {
    if !EDIT_TOOLS.contains(&tool_name) {
        return None;
    }
    let text = |key: &str, v: &Value| v.get(key).and_then(Value::as_str).map_or(0, count_lines);
    let edit = |v: &Value| text("old_string", v).max(text("new_string", v));

    let lines = match tool_name {
        "Edit" => edit(tool_input),
        "MultiEdit" => tool_input
            .get("edits")
            .and_then(Value::as_array)
            .map_or(0, |edits| edits.iter().map(edit).sum()),
        "Write" => text("content", tool_input),
        "NotebookEdit" => text("new_source", tool_input),
        _ => 0,
    };
    Some(lines)
}

fn count_lines(s: &str) -> usize {
    if s.is_empty() { 0 } else { s.lines().count() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::test_context;
    use serde_json::json;

    fn bash() -> Value {
        json!({"command": "ls"})
    }

    #[test]
    fn fresh_session_is_strict_until_three_passes() {
        let (_dir, _clock, ctx) = test_context();
        let tracker = StrictModeTracker::new(&ctx);

        for _ in 0..3 {
            let decision = tracker.should_use_strict_mode("Bash", &bash());
            assert!(decision.strict);
            assert_eq!(decision.reason, Some(StrictReason::SessionStart));
            assert_eq!(decision.reason.unwrap().to_string(), "session-start");
            tracker.increment_tool_count();
        }

        assert_eq!(tracker.should_use_strict_mode("Bash", &bash()), StrictDecision::RELAXED);
    }

    #[test]
    fn failing_strict_check_does_not_count() {
        let (_dir, _clock, ctx) = test_context();
        let tracker = StrictModeTracker::new(&ctx);
        tracker.increment_tool_count();
        tracker.increment_tool_count();
        tracker.record_denial();
        assert_eq!(tracker.data().session_tool_count, 2);
        assert_eq!(
            tracker.should_use_strict_mode("Bash", &bash()).reason,
            Some(StrictReason::SessionStart)
        );
    }

    #[test]
    fn one_shots_fire_in_priority_order_and_clear() {
        let (_dir, _clock, ctx) = test_context();
        let tracker = StrictModeTracker::new(&ctx);
        for _ in 0..3 {
            tracker.increment_tool_count();
        }

        tracker.record_error();
        tracker.record_denial();
        assert_eq!(
            tracker.should_use_strict_mode("Bash", &bash()).reason,
            Some(StrictReason::PostDenial)
        );

        tracker.clear_one_shots();
        assert!(!tracker.should_use_strict_mode("Bash", &bash()).strict);

        tracker.record_error();
        assert_eq!(
            tracker.should_use_strict_mode("Bash", &bash()).reason,
            Some(StrictReason::PostError)
        );
    }

    #[test]
    fn large_edit_is_strict_with_line_count() {
        let (_dir, _clock, ctx) = test_context();
        let tracker = StrictModeTracker::new(&ctx);
        for _ in 0..3 {
            tracker.increment_tool_count();
        }

        let big = "line\n".repeat(25);
        let decision = tracker.should_use_strict_mode(
            "Edit",
            &json!({"file_path": "a.rs", "old_string": "x", "new_string": big}),
        );
        assert!(decision.strict);
        assert_eq!(decision.reason.unwrap().to_string(), "large-edit (25 lines)");

        let small = tracker.should_use_strict_mode(
            "Edit",
            &json!({"file_path": "a.rs", "old_string": "x", "new_string": "y"}),
        );
        assert!(!small.strict);
    }

    #[test]
    fn multi_edit_sums_edits() {
        let edits = json!({"edits": [
            {"old_string": "a\nb", "new_string": "c"},
            {"old_string": "d", "new_string": "e\nf\ng"}
        ]});
        assert_eq!(changed_line_count("MultiEdit", &edits), Some(5));
        assert_eq!(changed_line_count("Bash", &bash()), None);
        assert_eq!(changed_line_count("Write", &json!({"content": ""})), Some(0));
    }

    #[test]
    fn persisted_as_flat_record() {
        let (_dir, _clock, ctx) = test_context();
        let tracker = StrictModeTracker::new(&ctx);
        tracker.increment_tool_count();
        let raw = std::fs::read_to_string(ctx.state_dir().join(STRICT_FILE)).unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["session_tool_count"].as_u64(), Some(1));
        assert!(json.get("entries").is_none());
    }
}
