//! Decision backend access and verdict parsing

mod backend;
mod retry;
mod vocabulary;

pub(crate) use backend::{AnthropicBackend, CompletionRequest, DecisionBackend, DisabledBackend};
#[cfg(test)]
pub(crate) use retry::testing::ScriptedBackend;
pub(crate) use retry::{DEFAULT_MAX_RETRIES, RetryOptions, retry_until_valid};
pub(crate) use vocabulary::{
    Decision, ParsedDecision, extract_decision, normalize_decision, parse_decision,
    starts_with_token,
};

/// Tokens a well-formed verdict opens with
pub(crate) const VERDICT_TOKENS: &[&str] = &["APPROVE", "DENY", "CONFIRM"];
const POSITIVE_TOKENS: &[&str] = &["APPROVE"];
pub(crate) const VERDICT_REMINDER: &str = "Respond with exactly one line: APPROVE, \
     DENY: <reason>, or CONFIRM: <question for the user>.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub(crate) decision: Decision,
    pub(crate) reason: Option<String>,
    pub(crate) raw: String,
}

impl Verdict {
    fn unrecognized(raw: String) -> Self {
        Self {
            decision: Decision::Unrecognized,
            reason: None,
            raw,
        }
    }
}

/// Ask the backend, coerce the reply into the verdict vocabulary, and parse
/// it. Transport failures and unparseable replies come back as
/// `Decision::Unrecognized`, which callers treat as fail-open.
pub(crate) fn consult(
    backend: &dyn DecisionBackend,
    request: &CompletionRequest,
    context: &str,
    max_retries: usize,
) -> Verdict {
    let initial = match backend.complete(request) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(context, error = %err, "decision backend failed; failing open");
            return Verdict::unrecognized(String::new());
        }
    };

    let validator = |text: &str| starts_with_token(text, VERDICT_TOKENS);
    let options = RetryOptions::new(&validator, VERDICT_REMINDER).with_max_retries(max_retries);
    let text = retry_until_valid(backend, initial, context, &options);

    match parse_decision(&text, POSITIVE_TOKENS) {
        ParsedDecision::Approved { .. } => Verdict {
            decision: Decision::Approve,
            reason: None,
            raw: text,
        },
        ParsedDecision::Other { decision, reason } => {
            let decision = match normalize_decision(&decision) {
                Decision::Unrecognized => extract_decision(&text),
                known => known,
            };
            Verdict {
                decision,
                reason,
                raw: text,
            }
        }
    }
}
