//! CLI subcommand definitions
//!
//! One subcommand per host hook, plus statusline and state inspection.

use clap::{Args, Subcommand, ValueEnum};

use crate::cache::ValidationStatus;

/// Main CLI commands
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// PreToolUse hook: approve, deny, or ask before a tool runs
    PreTool,
    /// PostToolUse hook: surface tool failures once
    PostTool,
    /// UserPromptSubmit hook: reset per-instruction memory
    UserPrompt,
    /// Stop hook: block the turn from ending on unresolved failures
    Stop,
    /// Record an out-of-band validation result for later hooks
    Validate(ValidateArgs),
    /// Output single line for the host statusline
    Statusline(SessionArgs),
    /// Remove one faded statusline entry after a delay
    #[command(hide = true)]
    StatuslineExpire(ExpireArgs),
    /// Inspect or reset session state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum StateCommands {
    /// Summarize every cache for a session
    Show(SessionArgs),
    /// Reset every cache for a session and remove statusline files
    Clear(SessionArgs),
}

/// Session selection for commands not driven by a hook payload
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct SessionArgs {
    /// Transcript path or session id (default: read host JSON from stdin)
    #[arg(long, value_name = "KEY")]
    pub(crate) session: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ValidationArg {
    Pending,
    Passed,
    Failed,
}

impl From<ValidationArg> for ValidationStatus {
    fn from(arg: ValidationArg) -> Self {
        match arg {
            ValidationArg::Pending => ValidationStatus::Pending,
            ValidationArg::Passed => ValidationStatus::Passed,
            ValidationArg::Failed => ValidationStatus::Failed,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ValidateArgs {
    /// Transcript of the run being validated
    #[arg(long, value_name = "PATH")]
    pub(crate) transcript: String,
    /// Validation outcome
    #[arg(long, value_enum)]
    pub(crate) status: ValidationArg,
    /// Tool whose result was validated
    #[arg(long, default_value = "Edit")]
    pub(crate) tool: String,
    /// File the validation covered
    #[arg(long, default_value = "")]
    pub(crate) file: String,
    /// Why validation failed
    #[arg(long)]
    pub(crate) reason: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ExpireArgs {
    #[arg(long)]
    pub(crate) key: String,
    #[arg(long)]
    pub(crate) agent: String,
    #[arg(long)]
    pub(crate) tool: String,
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) timestamp: i64,
    #[arg(long)]
    pub(crate) delay_ms: u64,
}
