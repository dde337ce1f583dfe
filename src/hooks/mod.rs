//! Validator entry points invoked by the host for each lifecycle event

mod input;
mod policy;
mod post_tool;
mod pre_tool;
mod response;
mod stop;
mod transcript;
mod user_prompt;
mod validate;

pub(crate) use input::HookInput;
pub(crate) use policy::PolicySettings;
pub(crate) use response::HookResponse;
pub(crate) use transcript::last_user_message;
pub(crate) use validate::record_validation;

use std::path::Path;

use crate::cache::SessionCaches;
use crate::consts::UNKNOWN;
use crate::decision::DecisionBackend;
use crate::statusline::StatusLineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookEvent {
    PreTool,
    PostTool,
    UserPrompt,
    Stop,
}

/// Everything one hook invocation reads and writes
pub(crate) struct HookEnv<'a> {
    pub(crate) caches: SessionCaches,
    pub(crate) status: StatusLineState<'a>,
    pub(crate) backend: &'a dyn DecisionBackend,
    pub(crate) settings: &'a PolicySettings,
}

impl HookEnv<'_> {
    pub(crate) fn handle(&self, event: HookEvent, input: &HookInput) -> HookResponse {
        let response = match event {
            HookEvent::PreTool => pre_tool::run(self, input),
            HookEvent::PostTool => post_tool::run(self, input),
            HookEvent::UserPrompt => user_prompt::run(self, input),
            HookEvent::Stop => stop::run(self, input),
        };
        tracing::debug!(
            ?event,
            host_event = input.hook_event_name.as_deref().unwrap_or(UNKNOWN),
            tool = input.tool_name(),
            decision = %response.decision(),
            "hook finished"
        );
        response
    }
}

/// The latest message the user typed in this run, per its transcript
fn latest_user_message(input: &HookInput) -> Option<String> {
    input
        .transcript_path
        .as_deref()
        .and_then(|path| last_user_message(Path::new(path)))
}
