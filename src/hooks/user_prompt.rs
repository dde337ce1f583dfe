//! Runs when the user submits a prompt

use crate::hooks::{HookEnv, HookInput, HookResponse};

/// A fresh instruction resets denial memory and lifts any declined gate,
/// including when the user repeats the same request verbatim.
pub(super) fn run(env: &HookEnv<'_>, input: &HookInput) -> HookResponse {
    if let Some(prompt) = input.prompt.as_deref()
        && env.caches.check_user_message(prompt)
    {
        tracing::debug!("new user message; denial memory reset");
    }
    env.caches.confirm.clear_confirm_state();
    HookResponse::Pass
}
