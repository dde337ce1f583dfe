//! Gatekeeper run before every tool call

use crate::cache::{StrictDecision, normalize_denial_pattern};
use crate::consts::AGENT_PRE_TOOL;
use crate::decision::{Decision, Verdict, consult};
use crate::hooks::policy::{pre_tool_request, user_reinvokes};
use crate::hooks::{HookEnv, HookInput, HookResponse, latest_user_message};
use crate::utils::sha256_hex;

const DEFAULT_DENY_REASON: &str = "Denied by the policy validator";
const DEFAULT_CONFIRM_REASON: &str = "The policy validator wants the user to confirm this action";

pub(super) fn run(env: &HookEnv<'_>, input: &HookInput) -> HookResponse {
    let tool_name = input.tool_name();
    let execution_type = if env.backend.is_available() {
        "backend"
    } else {
        "offline"
    };
    env.status
        .mark_agent_started(AGENT_PRE_TOOL, tool_name, Some(execution_type));

    let response = evaluate(env, input);

    env.status.update_status_line_state(
        AGENT_PRE_TOOL,
        tool_name,
        Some(response.decision().as_str()),
    );
    response
}

fn evaluate(env: &HookEnv<'_>, input: &HookInput) -> HookResponse {
    let tool_name = input.tool_name();
    let user_message = latest_user_message(input);
    let user_hash = user_message.as_deref().map(sha256_hex);
    if let Some(message) = user_message.as_deref()
        && env.caches.check_user_message(message)
    {
        tracing::debug!("new user message; denial memory reset");
    }

    if let Some(failed) = env
        .caches
        .pending
        .check_pending_validation(user_hash.as_deref())
    {
        let reason = failed.failure_reason.as_deref().unwrap_or("no reason given");
        return HookResponse::deny(format!(
            "Validation of {} {} failed: {reason}. Fix that before doing anything else.",
            failed.tool_name, failed.file_path
        ));
    }

    let gate = env.settings.gated_command(tool_name, &input.tool_input);
    if let Some(gate) = gate {
        let confirm = env.caches.confirm.check_confirm_declined();
        if confirm.declined {
            // The message that led to the decline cannot lift it.
            let newer_request = user_hash.is_some() && user_hash != confirm.user_message_hash;
            if newer_request
                && user_message
                    .as_deref()
                    .is_some_and(|message| user_reinvokes(message, gate))
            {
                tracing::debug!(gate, "user re-invoked gated action");
                env.caches.confirm.clear_confirm_state();
            } else {
                return HookResponse::deny(format!(
                    "`{gate}` was already declined ({}). Wait for the user to ask for it again.",
                    confirm.reason
                ));
            }
        }
    }

    let strict = env
        .caches
        .strict
        .should_use_strict_mode(tool_name, &input.tool_input);
    if let Some(reason) = strict.reason {
        tracing::debug!(%reason, "strict validation");
    }

    let request = pre_tool_request(
        env.settings,
        tool_name,
        &input.tool_input,
        user_message.as_deref(),
        strict,
        gate,
    );
    let context = format!("pre-tool validation of {tool_name}");
    let verdict = consult(env.backend, &request, &context, env.settings.max_retries);

    match verdict.decision {
        Decision::Deny => deny(env, input, gate, user_hash.as_deref(), verdict),
        Decision::Confirm => HookResponse::ask(
            verdict
                .reason
                .unwrap_or_else(|| DEFAULT_CONFIRM_REASON.to_string()),
        ),
        Decision::Approve => {
            approve(env, strict);
            HookResponse::Pass
        }
        Decision::Error | Decision::Unrecognized => {
            tracing::debug!(raw = %verdict.raw, "no usable verdict; allowing");
            HookResponse::Pass
        }
    }
}

/// Only a passed strict check counts toward leaving the session-start window
fn approve(env: &HookEnv<'_>, strict: StrictDecision) {
    if strict.strict {
        env.caches.strict.clear_one_shots();
        env.caches.strict.increment_tool_count();
    }
}

fn deny(
    env: &HookEnv<'_>,
    input: &HookInput,
    gate: Option<&str>,
    user_hash: Option<&str>,
    verdict: Verdict,
) -> HookResponse {
    let reason = verdict
        .reason
        .unwrap_or_else(|| DEFAULT_DENY_REASON.to_string());
    let pattern = normalize_denial_pattern(input.tool_name(), &input.tool_input);
    let count = env.caches.escalation.record_denial(&pattern);
    env.caches.strict.record_denial();
    if gate.is_some() {
        env.caches.confirm.record_confirm_declined(&reason, user_hash);
    }

    if env.caches.escalation.is_workaround_escalation(&pattern) {
        tracing::info!(%pattern, count, "repeated denials");
        return HookResponse::deny(format!(
            "{reason}\n\nAn equivalent action has now been denied {count} times. Stop \
             trying variations and ask the user how to proceed."
        ));
    }
    HookResponse::deny(reason)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::{PendingValidation, ValidationStatus};
    use crate::decision::{DisabledBackend, ScriptedBackend};
    use crate::hooks::PolicySettings;
    use crate::hooks::testing::{env, tool_input, transcript};
    use crate::statusline::EntryStatus;
    use crate::store::testing::test_context;

    #[test]
    fn offline_backend_fails_open_and_records_status() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let env = env(&ctx, &DisabledBackend, &settings);

        let response = run(&env, &tool_input("Bash", json!({ "command": "ls" })));
        assert_eq!(response, HookResponse::Pass);

        let entries = env.status.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, EntryStatus::Completed);
        assert_eq!(entries[0].decision.as_deref(), Some("APPROVE"));
        assert_eq!(entries[0].execution_type.as_deref(), Some("offline"));
        assert_eq!(env.caches.strict.data().session_tool_count, 0);
    }

    #[test]
    fn unavailable_backend_keeps_session_start_window() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let env = env(&ctx, &DisabledBackend, &settings);
        let input = tool_input("Bash", json!({ "command": "ls" }));

        for _ in 0..3 {
            assert_eq!(run(&env, &input), HookResponse::Pass);
        }

        assert_eq!(env.caches.strict.data().session_tool_count, 0);
        let strict = env.caches.strict.should_use_strict_mode("Bash", &input.tool_input);
        assert!(strict.strict);
        assert_eq!(strict.reason.map(|r| r.to_string()).as_deref(), Some("session-start"));
    }

    #[test]
    fn third_denial_mentions_escalation() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let backend = ScriptedBackend::new([
            "DENY: touches production",
            "DENY: touches production",
            "DENY: touches production",
        ]);
        let env = env(&ctx, &backend, &settings);
        let input = tool_input("Bash", json!({ "command": "kubectl delete pod api-1" }));

        let first = run(&env, &input);
        assert_eq!(first, HookResponse::deny("touches production"));
        run(&env, &input);
        let third = run(&env, &input);

        let HookResponse::Permission { reason, .. } = third else {
            panic!("expected a permission response");
        };
        assert!(reason.contains("denied 3 times"));
        assert!(env.caches.strict.data().last_denied);
    }

    #[test]
    fn strict_approval_clears_one_shot_flags() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let backend = ScriptedBackend::new(["APPROVE"]);
        let env = env(&ctx, &backend, &settings);
        env.caches.strict.record_error();

        let response = run(&env, &tool_input("Read", json!({ "file_path": "/src/lib.rs" })));
        assert_eq!(response, HookResponse::Pass);

        let data = env.caches.strict.data();
        assert!(!data.last_error);
        assert_eq!(data.session_tool_count, 1);
        let system = backend.requests.borrow()[0].system.clone().unwrap();
        assert!(system.contains("session-start"));
    }

    #[test]
    fn failed_validation_blocks_until_user_speaks() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let env = env(&ctx, &DisabledBackend, &settings);
        let path = transcript(&ctx, "refactor the parser");
        env.caches.pending.write_pending_validation(PendingValidation {
            tool_name: "Edit".to_string(),
            file_path: "src/parser.rs".to_string(),
            status: ValidationStatus::Failed,
            failure_reason: Some("tests fail".to_string()),
            user_message_hash: Some(sha256_hex("refactor the parser")),
            ..PendingValidation::default()
        });

        let mut input = tool_input("Edit", json!({ "file_path": "src/other.rs" }));
        input.transcript_path = Some(path.display().to_string());
        let HookResponse::Permission { reason, .. } = run(&env, &input) else {
            panic!("expected a denial");
        };
        assert!(reason.contains("tests fail"));

        transcript(&ctx, "never mind, move on");
        assert_eq!(run(&env, &input), HookResponse::Pass);
    }

    #[test]
    fn declined_gate_denies_without_consulting_backend() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let backend = ScriptedBackend::new(["DENY: tests are failing"]);
        let env = env(&ctx, &backend, &settings);
        let path = transcript(&ctx, "fix the flaky test");
        let mut input = tool_input("Bash", json!({ "command": "git commit -am fix" }));
        input.transcript_path = Some(path.display().to_string());

        assert_eq!(run(&env, &input), HookResponse::deny("tests are failing"));
        assert!(env.caches.confirm.check_confirm_declined().declined);

        let HookResponse::Permission { reason, .. } = run(&env, &input) else {
            panic!("expected a denial");
        };
        assert!(reason.contains("already declined"));
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn originating_message_cannot_lift_a_decline() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let backend = ScriptedBackend::new(["DENY: tests are failing", "APPROVE"]);
        let env = env(&ctx, &backend, &settings);
        let path = transcript(&ctx, "please git commit my changes");
        let mut input = tool_input("Bash", json!({ "command": "git commit -am wip" }));
        input.transcript_path = Some(path.display().to_string());

        assert_eq!(run(&env, &input), HookResponse::deny("tests are failing"));
        let HookResponse::Permission { reason, .. } = run(&env, &input) else {
            panic!("expected a denial");
        };
        assert!(reason.contains("already declined"));
        assert_eq!(backend.calls(), 1);
        assert!(env.caches.confirm.check_confirm_declined().declined);
    }

    #[test]
    fn newer_reinvocation_is_validated_again() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let backend = ScriptedBackend::new(["APPROVE"]);
        let env = env(&ctx, &backend, &settings);
        let path = transcript(&ctx, "/commit");
        env.caches.check_user_message("/commit");
        env.caches
            .confirm
            .record_confirm_declined("tests are failing", Some(&sha256_hex("fix the tests")));
        let mut input = tool_input("Bash", json!({ "command": "git commit -am fix" }));
        input.transcript_path = Some(path.display().to_string());

        assert_eq!(run(&env, &input), HookResponse::Pass);
        assert_eq!(backend.calls(), 1);
        assert!(!env.caches.confirm.check_confirm_declined().declined);
    }

    #[test]
    fn confirm_verdict_asks_the_user() {
        let (_dir, _clock, ctx) = test_context();
        let settings = PolicySettings::default();
        let backend = ScriptedBackend::new(["CONFIRM: force-push to main?"]);
        let env = env(&ctx, &backend, &settings);

        let response = run(&env, &tool_input("Bash", json!({ "command": "git push -f" })));
        assert_eq!(response, HookResponse::ask("force-push to main?"));
        assert_eq!(env.status.entries()[0].decision.as_deref(), Some("CONFIRM"));
    }
}
