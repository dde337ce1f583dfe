//! Host-facing JSON written to stdout

use serde::Serialize;

use crate::decision::Decision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PermissionDecision {
    Deny,
    Ask,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HookResponse {
    /// Let the host proceed; nothing is printed
    Pass,
    Permission {
        decision: PermissionDecision,
        reason: String,
    },
    Context {
        event: &'static str,
        context: String,
    },
    BlockStop {
        reason: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HookSpecificOutput<'a> {
    hook_event_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission_decision: Option<PermissionDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission_decision_reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_context: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    hook_specific_output: HookSpecificOutput<'a>,
}

#[derive(Serialize)]
struct StopBlock<'a> {
    decision: &'static str,
    reason: &'a str,
}

impl HookResponse {
    pub(crate) fn deny(reason: impl Into<String>) -> Self {
        HookResponse::Permission {
            decision: PermissionDecision::Deny,
            reason: reason.into(),
        }
    }

    pub(crate) fn ask(reason: impl Into<String>) -> Self {
        HookResponse::Permission {
            decision: PermissionDecision::Ask,
            reason: reason.into(),
        }
    }

    /// Decision label recorded on the statusline
    pub(crate) fn decision(&self) -> Decision {
        match self {
            HookResponse::Pass => Decision::Approve,
            HookResponse::Permission {
                decision: PermissionDecision::Deny,
                ..
            }
            | HookResponse::BlockStop { .. } => Decision::Deny,
            HookResponse::Permission {
                decision: PermissionDecision::Ask,
                ..
            } => Decision::Confirm,
            HookResponse::Context { .. } => Decision::Error,
        }
    }

    pub(crate) fn to_json(&self) -> Option<String> {
        let rendered = match self {
            HookResponse::Pass => return None,
            HookResponse::Permission { decision, reason } => serde_json::to_string(&Envelope {
                hook_specific_output: HookSpecificOutput {
                    hook_event_name: "PreToolUse",
                    permission_decision: Some(*decision),
                    permission_decision_reason: Some(reason.as_str()),
                    additional_context: None,
                },
            }),
            HookResponse::Context { event, context } => serde_json::to_string(&Envelope {
                hook_specific_output: HookSpecificOutput {
                    hook_event_name: *event,
                    permission_decision: None,
                    permission_decision_reason: None,
                    additional_context: Some(context.as_str()),
                },
            }),
            HookResponse::BlockStop { reason } => serde_json::to_string(&StopBlock {
                decision: "block",
                reason: reason.as_str(),
            }),
        };
        match rendered {
            Ok(json) => Some(json),
            Err(err) => {
                tracing::warn!(error = %err, "failed to render hook response");
                None
            }
        }
    }
}
