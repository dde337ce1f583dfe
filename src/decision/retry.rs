//! Bounded reformat loop for backend output
//!
//! Decision text sometimes arrives with preamble. A fixed number of cheap
//! corrective round-trips keeps worst-case latency predictable.

use crate::decision::backend::{CompletionRequest, DecisionBackend};

pub(crate) const DEFAULT_MAX_RETRIES: usize = 2;
pub(crate) const DEFAULT_RETRY_MAX_TOKENS: u32 = 100;

pub(crate) struct RetryOptions<'a> {
    pub(crate) max_retries: usize,
    pub(crate) format_validator: &'a dyn Fn(&str) -> bool,
    pub(crate) format_reminder: &'a str,
    pub(crate) max_tokens: u32,
}

impl<'a> RetryOptions<'a> {
    pub(crate) fn new(format_validator: &'a dyn Fn(&str) -> bool, format_reminder: &'a str) -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            format_validator,
            format_reminder,
            max_tokens: DEFAULT_RETRY_MAX_TOKENS,
        }
    }

    pub(crate) fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Return `initial` if valid; otherwise ask the backend to reformat, at most
/// `max_retries` times. The final text may still be invalid: callers treat
/// that as the fail-open branch.
pub(crate) fn retry_until_valid(
    backend: &dyn DecisionBackend,
    initial: String,
    context: &str,
    options: &RetryOptions<'_>,
) -> String {
    if (options.format_validator)(&initial) {
        return initial;
    }

    let mut current = initial;
    for attempt in 1..=options.max_retries {
        let request = CompletionRequest {
            system: None,
            prompt: corrective_prompt(&current, context, options.format_reminder),
            max_tokens: options.max_tokens,
        };
        match backend.complete(&request) {
            Ok(text) => {
                current = text;
                if (options.format_validator)(&current) {
                    tracing::debug!(attempt, context, "decision reformatted");
                    return current;
                }
            }
            Err(err) => {
                tracing::warn!(attempt, context, error = %err, "reformat request failed");
                break;
            }
        }
    }

    tracing::warn!(context, "decision still malformed after retries");
    current
}

fn corrective_prompt(previous: &str, context: &str, reminder: &str) -> String {
    format!(
        "Your previous response for {context} did not follow the required format.\n\n\
         Previous response:\n<response>\n{previous}\n</response>\n\n\
         {reminder}\n\
         Reply again with only the required format and nothing else."
    )
}
