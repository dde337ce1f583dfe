//! Claude Code transcript reader
//!
//! Finds the most recent message the user actually typed in a JSONL
//! session log. Tool results are logged as "user" entries too; those skip.

use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default, rename = "isMeta")]
    is_meta: bool,
    message: Option<TranscriptMessage>,
}

#[derive(Debug, Deserialize)]
struct TranscriptMessage {
    role: Option<String>,
    #[serde(default)]
    content: Value,
}

pub(crate) fn last_user_message(path: &Path) -> Option<String> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "transcript unavailable");
            return None;
        }
    };

    let mut last = None;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<TranscriptEntry>(&line) else {
            continue;
        };
        if let Some(text) = user_text(entry) {
            last = Some(text);
        }
    }
    last
}

fn user_text(entry: TranscriptEntry) -> Option<String> {
    if entry.kind.as_deref() != Some("user") || entry.is_meta {
        return None;
    }
    let message = entry.message?;
    if message.role.as_deref() != Some("user") {
        return None;
    }

    let text = match message.content {
        Value::String(text) => text,
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return None,
    };
    (!text.trim().is_empty()).then_some(text)
}
