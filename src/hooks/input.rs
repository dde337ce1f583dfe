//! Host event payload read from stdin

use serde::Deserialize;
use serde_json::Value;
use std::io::Read;

use crate::consts::UNKNOWN;
use crate::error::HookInputError;
use crate::store::SessionKey;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HookInput {
    #[serde(default)]
    pub(crate) session_id: Option<String>,
    #[serde(default)]
    pub(crate) transcript_path: Option<String>,
    #[serde(default)]
    pub(crate) hook_event_name: Option<String>,
    #[serde(default)]
    pub(crate) tool_name: Option<String>,
    #[serde(default)]
    pub(crate) tool_input: Value,
    #[serde(default)]
    pub(crate) tool_response: Value,
    #[serde(default)]
    pub(crate) prompt: Option<String>,
    #[serde(default)]
    pub(crate) stop_hook_active: bool,
}

impl HookInput {
    pub(crate) fn read_from(mut reader: impl Read) -> Result<Self, HookInputError> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .map_err(HookInputError::Read)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&raw).map_err(HookInputError::Parse)
    }

    /// The run this event belongs to: transcript path, else session id
    pub(crate) fn session_key(&self) -> Option<SessionKey> {
        self.transcript_path
            .as_deref()
            .or(self.session_id.as_deref())
            .filter(|s| !s.is_empty())
            .map(SessionKey::new)
    }

    pub(crate) fn tool_name(&self) -> &str {
        self.tool_name.as_deref().unwrap_or(UNKNOWN)
    }
}
