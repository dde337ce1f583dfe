use comfy_table::{Cell, Color};

use crate::cache::CacheSummary;
use crate::output::format::{create_styled_table, header_cell, right_cell, styled_cell, truncate_key};

const KEY_DISPLAY_CHARS: usize = 48;

pub(crate) fn print_state_table(key: &str, summaries: &[CacheSummary], use_color: bool) {
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Cache", use_color),
        header_cell("Entries", use_color),
        header_cell("Detail", use_color),
    ]);

    let active = if use_color { Some(Color::Yellow) } else { None };
    for summary in summaries {
        let color = if summary.entries > 0 { active } else { None };
        table.add_row(vec![
            Cell::new(summary.name),
            right_cell(&summary.entries.to_string(), color, false),
            styled_cell(&summary.detail, None, false),
        ]);
    }

    let total: usize = summaries.iter().map(|s| s.entries).sum();
    table.add_row(vec![
        styled_cell("TOTAL", None, true),
        right_cell(&total.to_string(), None, true),
        Cell::new(""),
    ]);

    println!("\n  Session {}\n", truncate_key(key, KEY_DISPLAY_CHARS));
    println!("{table}");
}

pub(crate) fn output_state_json(key: &str, summaries: &[CacheSummary]) -> String {
    let output = serde_json::json!({
        "session": key,
        "caches": summaries,
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize state JSON");
        "{}".to_string()
    })
}
