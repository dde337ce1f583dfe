mod format;
mod state;

pub(crate) use state::{output_state_json, print_state_table};
