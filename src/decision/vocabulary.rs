//! Decision vocabulary
//!
//! Backend output is free text. These helpers map it onto the closed set of
//! verdicts the hooks act on.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum Decision {
    Approve,
    Deny,
    Confirm,
    Error,
    Unrecognized,
}

impl Decision {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Decision::Approve => "APPROVE",
            Decision::Deny => "DENY",
            Decision::Confirm => "CONFIRM",
            Decision::Error => "ERROR",
            Decision::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map one raw word onto the closed vocabulary
pub(crate) fn normalize_decision(word: &str) -> Decision {
    let cleaned = word
        .trim()
        .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .to_ascii_uppercase();

    match cleaned.as_str() {
        "APPROVE" | "APPROVED" | "ALLOW" | "ALLOWED" | "PASS" | "PASSED" | "OK" | "YES"
        | "SAFE" | "COMPLETE" => Decision::Approve,
        "DENY" | "DENIED" | "BLOCK" | "BLOCKED" | "REJECT" | "REJECTED" | "FAIL" | "FAILED"
        | "NO" | "UNSAFE" | "INCOMPLETE" => Decision::Deny,
        "CONFIRM" | "ASK" | "ESCALATE" | "NEEDS_CONFIRMATION" | "NEEDS_REVIEW" => {
            Decision::Confirm
        }
        "ERROR" | "ERR" => Decision::Error,
        _ => Decision::Unrecognized,
    }
}

/// First recognized decision word leading any line of `text`
pub(crate) fn extract_decision(text: &str) -> Decision {
    text.lines()
        .filter_map(|line| {
            line.split(|c: char| c == ':' || c.is_whitespace())
                .find(|w| !w.is_empty())
        })
        .map(normalize_decision)
        .find(|d| *d != Decision::Unrecognized)
        .unwrap_or(Decision::Unrecognized)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParsedDecision {
    Approved { token: String },
    Other { decision: String, reason: Option<String> },
}

/// Positive token prefix means approval; otherwise "DECISION: reason"
pub(crate) fn parse_decision(text: &str, positive_tokens: &[&str]) -> ParsedDecision {
    let trimmed = text.trim();
    if let Some(token) = positive_tokens.iter().find(|t| trimmed.starts_with(**t)) {
        return ParsedDecision::Approved {
            token: (*token).to_string(),
        };
    }
    match trimmed.split_once(':') {
        Some((decision, reason)) => {
            let reason = reason.trim();
            ParsedDecision::Other {
                decision: decision.trim().to_string(),
                reason: (!reason.is_empty()).then(|| reason.to_string()),
            }
        }
        None => ParsedDecision::Other {
            decision: trimmed.to_string(),
            reason: None,
        },
    }
}

/// Format check: the trimmed text opens with one of `tokens`
pub(crate) fn starts_with_token(text: &str, tokens: &[&str]) -> bool {
    let trimmed = text.trim_start();
    tokens.iter().any(|t| trimmed.starts_with(t))
}
