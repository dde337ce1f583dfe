//! Validator activity shown on the host statusline

mod render;
mod state;

pub(crate) use render::{format_statusline, format_statusline_json};
#[cfg(test)]
pub(crate) use state::EntryStatus;
pub(crate) use state::{ExpiryScheduler, STATUSLINE_FILE_PREFIX, StatusLineState};
