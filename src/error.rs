use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("No state directory available (set --state-dir or CCGUARD_STATE_DIR)")]
    NoStateDir,

    #[error("Hook input missing session identifier (transcript_path or session_id)")]
    MissingSession,

    #[error("{0}")]
    HookInput(#[from] HookInputError),
}

#[derive(Debug, Error)]
pub(crate) enum HookInputError {
    #[error("Failed to read hook input: {0}")]
    Read(std::io::Error),

    #[error("Invalid hook input JSON: {0}")]
    Parse(serde_json::Error),
}

/// Failure persisting a cache document. Callers treat it as advisory.
#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize cache document: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub(crate) enum BackendError {
    #[error("Decision backend is not configured")]
    Unavailable,

    #[error("Decision backend request failed: {0}")]
    Transport(#[from] ureq::Error),

    #[error("Invalid decision backend response: {0}")]
    Decode(serde_json::Error),

    #[error("Decision backend returned no text")]
    EmptyResponse,
}
