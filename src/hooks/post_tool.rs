//! Follow-up run after a tool finishes

use crate::consts::AGENT_POST_TOOL;
use crate::hooks::policy::extract_failure;
use crate::hooks::{HookEnv, HookInput, HookResponse};

const POST_TOOL_EVENT: &str = "PostToolUse";

pub(super) fn run(env: &HookEnv<'_>, input: &HookInput) -> HookResponse {
    let tool_name = input.tool_name();
    env.status.mark_agent_started(AGENT_POST_TOOL, tool_name, None);

    let response = match extract_failure(&input.tool_response) {
        Some(failure) => on_failure(env, tool_name, &failure),
        None => {
            on_success(env, input);
            HookResponse::Pass
        }
    };

    env.status.update_status_line_state(
        AGENT_POST_TOOL,
        tool_name,
        Some(response.decision().as_str()),
    );
    response
}

fn on_failure(env: &HookEnv<'_>, tool_name: &str, failure: &str) -> HookResponse {
    if env.caches.ack.is_error_acknowledged(failure) {
        tracing::debug!(tool_name, "error already reported");
        return HookResponse::Pass;
    }
    env.caches.ack.mark_error_acknowledged(failure);
    env.caches.strict.record_error();

    HookResponse::Context {
        event: POST_TOOL_EVENT,
        context: format!(
            "{tool_name} failed: {failure}\n\nAddress this error before moving on. \
             Do not work around it or claim the task is complete."
        ),
    }
}

fn on_success(env: &HookEnv<'_>, input: &HookInput) {
    env.caches.ack.clear_ack_cache();
    if let Some(gate) = env
        .settings
        .gated_command(input.tool_name(), &input.tool_input)
    {
        tracing::debug!(gate, "gated action completed");
        env.caches.confirm.clear_confirm_state();
    }
}
