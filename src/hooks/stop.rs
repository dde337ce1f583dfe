//! Runs when the assistant tries to end its turn

use crate::consts::AGENT_STOP;
use crate::hooks::{HookEnv, HookInput, HookResponse, latest_user_message};
use crate::utils::sha256_hex;

const STOP_LABEL: &str = "Stop";

pub(super) fn run(env: &HookEnv<'_>, input: &HookInput) -> HookResponse {
    // The host sets this when a previous block already made the assistant
    // continue; blocking again would loop.
    if input.stop_hook_active {
        return HookResponse::Pass;
    }

    env.status.mark_agent_started(AGENT_STOP, STOP_LABEL, None);
    let response = evaluate(env, input);
    env.status
        .update_status_line_state(AGENT_STOP, STOP_LABEL, Some(response.decision().as_str()));
    response
}

fn evaluate(env: &HookEnv<'_>, input: &HookInput) -> HookResponse {
    let user_hash = latest_user_message(input).map(|m| sha256_hex(&m));

    if let Some(failed) = env
        .caches
        .pending
        .check_pending_validation(user_hash.as_deref())
    {
        let reason = failed.failure_reason.as_deref().unwrap_or("no reason given");
        return HookResponse::BlockStop {
            reason: format!(
                "Validation of {} {} failed: {reason}. Fix it, or tell the user it is \
                 still broken, before finishing.",
                failed.tool_name, failed.file_path
            ),
        };
    }

    let confirm = env.caches.confirm.check_confirm_declined();
    if confirm.declined {
        return HookResponse::BlockStop {
            reason: format!(
                "A gated action was declined ({}). Tell the user what is left to do \
                 instead of finishing silently.",
                confirm.reason
            ),
        };
    }

    HookResponse::Pass
}
