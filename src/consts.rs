/// Fallback value when a tool name or session identifier is unavailable
pub(crate) const UNKNOWN: &str = "unknown";

/// Agent labels recorded in the statusline for each validator
pub(crate) const AGENT_PRE_TOOL: &str = "pre-tool";
pub(crate) const AGENT_POST_TOOL: &str = "post-tool";
pub(crate) const AGENT_STOP: &str = "stop";

/// Tools whose input describes a file edit
pub(crate) const EDIT_TOOLS: &[&str] = &["Edit", "MultiEdit", "Write", "NotebookEdit"];

/// Commands treated as gated actions unless the config overrides them
pub(crate) const DEFAULT_GATED_COMMANDS: &[&str] = &["git commit", "git push"];
