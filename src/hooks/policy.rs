//! Validator policy: which actions are gated, what counts as a failure, and
//! the prompts sent to the decision backend.

use serde_json::Value;

use crate::cache::StrictDecision;
use crate::consts::DEFAULT_GATED_COMMANDS;
use crate::decision::{CompletionRequest, DEFAULT_MAX_RETRIES, VERDICT_REMINDER};
use crate::utils::snippet;

const DEFAULT_VERDICT_MAX_TOKENS: u32 = 200;
const USER_MESSAGE_CHARS: usize = 1_000;
const TOOL_INPUT_CHARS: usize = 4_000;
const FAILURE_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PolicySettings {
    pub(crate) gated_commands: Vec<String>,
    pub(crate) max_retries: usize,
    pub(crate) max_tokens: u32,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            gated_commands: DEFAULT_GATED_COMMANDS.iter().map(|s| s.to_string()).collect(),
            max_retries: DEFAULT_MAX_RETRIES,
            max_tokens: DEFAULT_VERDICT_MAX_TOKENS,
        }
    }
}

impl PolicySettings {
    /// The gated command a Bash call runs, if any
    pub(crate) fn gated_command(&self, tool_name: &str, tool_input: &Value) -> Option<&str> {
        if tool_name != "Bash" {
            return None;
        }
        let command = tool_input.get("command").and_then(Value::as_str)?;
        self.gated_commands
            .iter()
            .find(|gate| invokes(command, gate))
            .map(String::as_str)
    }
}

/// True when any segment of a shell pipeline starts with `gate`
fn invokes(command: &str, gate: &str) -> bool {
    let gate: Vec<&str> = gate.split_whitespace().collect();
    if gate.is_empty() {
        return false;
    }
    command
        .split(['\n', ';', '|', '&'])
        .any(|segment| {
            let words: Vec<&str> = segment.split_whitespace().collect();
            words.len() >= gate.len() && words[..gate.len()] == gate[..]
        })
}

/// Whether the user's message asks for the gated action again, either by
/// naming the command or through its slash-command form (`/commit`).
pub(crate) fn user_reinvokes(message: &str, gate: &str) -> bool {
    let message = message.to_lowercase();
    let gate = gate.to_lowercase();
    if message.contains(&gate) {
        return true;
    }
    gate.split_whitespace()
        .last()
        .is_some_and(|verb| {
            message
                .split_whitespace()
                .any(|word| word.strip_prefix('/') == Some(verb))
        })
}

/// Error text reported by a finished tool, if it failed
pub(crate) fn extract_failure(tool_response: &Value) -> Option<String> {
    match tool_response {
        Value::Object(map) => {
            let failed = map.get("is_error").and_then(Value::as_bool) == Some(true)
                || map.get("success").and_then(Value::as_bool) == Some(false)
                || map.get("interrupted").and_then(Value::as_bool) == Some(true)
                || map
                    .get("exit_code")
                    .or_else(|| map.get("exitCode"))
                    .and_then(Value::as_i64)
                    .is_some_and(|code| code != 0);
            let error = map
                .get("error")
                .and_then(Value::as_str)
                .filter(|e| !e.trim().is_empty());

            if !failed && error.is_none() {
                return None;
            }
            let text = error
                .or_else(|| map.get("stderr").and_then(Value::as_str).filter(|s| !s.trim().is_empty()))
                .or_else(|| map.get("content").and_then(Value::as_str))
                .unwrap_or("tool reported failure");
            Some(snippet(text, FAILURE_CHARS))
        }
        Value::String(text) if text.trim_start().starts_with("Error") => {
            Some(snippet(text, FAILURE_CHARS))
        }
        _ => None,
    }
}

/// Request asking the backend whether a pending tool call may proceed
pub(crate) fn pre_tool_request(
    settings: &PolicySettings,
    tool_name: &str,
    tool_input: &Value,
    user_message: Option<&str>,
    strict: StrictDecision,
    gate: Option<&str>,
) -> CompletionRequest {
    let mut system = String::from(
        "You review actions an autonomous coding assistant is about to take. \
         Approve actions that serve the user's request and are safe. Deny \
         destructive, out-of-scope, or policy-evading actions, including \
         attempts to work around an earlier denial. Ask for confirmation when \
         only the user can decide.",
    );
    if let Some(reason) = strict.reason {
        system.push_str(&format!(
            "\n\nApply heightened scrutiny for this call ({reason}): deny unless \
             the action is clearly correct."
        ));
    }
    if let Some(gate) = gate {
        system.push_str(&format!(
            "\n\nThis is a gated action (`{gate}`). Deny it if the work is not \
             ready: failing or missing tests, unfinished edits, or changes the \
             user did not ask for."
        ));
    }
    system.push_str("\n\n");
    system.push_str(VERDICT_REMINDER);

    let input = serde_json::to_string_pretty(tool_input).unwrap_or_default();
    let request = user_message
        .map(|m| snippet(m, USER_MESSAGE_CHARS))
        .unwrap_or_else(|| "(not available)".to_string());
    let prompt = format!(
        "User request:\n<request>\n{request}\n</request>\n\n\
         Tool: {tool_name}\nInput:\n<input>\n{}\n</input>",
        snippet(&input, TOOL_INPUT_CHARS)
    );

    CompletionRequest {
        system: Some(system),
        prompt,
        max_tokens: settings.max_tokens,
    }
}
