use serde::Deserialize;
use std::time::Duration;

use crate::error::BackendError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CompletionRequest {
    pub(crate) system: Option<String>,
    pub(crate) prompt: String,
    pub(crate) max_tokens: u32,
}

/// The decision-making service: an instruction in, free text out
pub(crate) trait DecisionBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in when no API key is configured or `--offline` is set
#[derive(Debug, Default)]
pub(crate) struct DisabledBackend;

impl DecisionBackend for DisabledBackend {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
        Err(BackendError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Anthropic Messages API over a blocking HTTP agent
pub(crate) struct AnthropicBackend {
    agent: ureq::Agent,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    pub(crate) fn new(api_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            api_url,
            api_key,
            model,
        }
    }

    fn body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        if let Some(system) = &request.system {
            body["system"] = serde_json::Value::String(system.clone());
        }
        body
    }
}

impl DecisionBackend for AnthropicBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let response = self
            .agent
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send_json(self.body(request))?;

        let mut body = response.into_body();
        let parsed: MessagesResponse =
            serde_json::from_reader(body.as_reader()).map_err(BackendError::Decode)?;
        text_of(parsed)
    }
}

fn text_of(response: MessagesResponse) -> Result<String, BackendError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text)
        .collect();
    if text.trim().is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(text)
}
