use crate::statusline::state::{EntryStatus, StatusLineEntry};

/// Entries shown on the single status line
const MAX_VISIBLE: usize = 4;

/// Single line for the host's statusline, newest first.
/// Format: "pre-tool Bash ✓ 120ms | post-tool Edit …"
pub(crate) fn format_statusline(entries: &[StatusLineEntry], use_color: bool) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut parts: Vec<String> = entries
        .iter()
        .take(MAX_VISIBLE)
        .map(|entry| format_entry(entry, use_color))
        .collect();
    if entries.len() > MAX_VISIBLE {
        parts.push(format!("+{}", entries.len() - MAX_VISIBLE));
    }
    parts.join(" | ")
}

fn format_entry(entry: &StatusLineEntry, use_color: bool) -> String {
    let marker = match entry.status {
        EntryStatus::Running => "…".to_string(),
        EntryStatus::Completed => decision_marker(entry.decision.as_deref(), use_color),
    };
    let mut text = format!("{} {} {}", entry.agent, entry.tool_name, marker);
    if let Some(ms) = entry.latency_ms {
        text.push_str(&format!(" {}", format_latency(ms)));
    }
    text
}

fn decision_marker(decision: Option<&str>, use_color: bool) -> String {
    let (symbol, color) = match decision {
        Some("APPROVE") | None => ("✓", "32"),
        Some("DENY") => ("✗", "31"),
        Some("CONFIRM") => ("?", "33"),
        Some(_) => ("!", "33"),
    };
    if use_color {
        format!("\x1b[{color}m{symbol}\x1b[0m")
    } else {
        symbol.to_string()
    }
}

fn format_latency(ms: i64) -> String {
    if ms >= 1_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format!("{ms}ms")
    }
}

/// Statusline entries as JSON for programmatic consumption
pub(crate) fn format_statusline_json(entries: &[StatusLineEntry]) -> String {
    let output = serde_json::json!({
        "running": entries.iter().filter(|e| e.status == EntryStatus::Running).count(),
        "entries": entries,
        "line": format_statusline(entries, false),
    });

    serde_json::to_string(&output).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize statusline JSON");
        "{}".to_string()
    })
}
