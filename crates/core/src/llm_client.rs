//! Generative Orchestrator Clients
//!
//! The orchestrator is the language model that plans each batch of feed content.
//! Callers only ever see parsed JSON or nothing: transport errors, timeouts and
//! unparsable replies are logged here and collapse into `None`.

use anyhow::{Context, Result, bail};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A language model that answers with a JSON document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Whether the orchestrator has the credentials it needs.
    fn available(&self) -> bool;

    /// Sends the system instructions and the per-call context and returns the
    /// parsed JSON reply. Never fails: any problem yields `None`.
    async fn complete_json(&self, system: &str, context: &str) -> Option<Value>;
}

/// Model parameters shared by every orchestrator implementation.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// An [`Orchestrator`] backed by the Anthropic Messages API.
pub struct AnthropicOrchestrator {
    api_key: Option<String>,
    settings: OrchestratorSettings,
    http: reqwest::Client,
}

impl AnthropicOrchestrator {
    /// Creates a client; without an API key it reports itself unavailable.
    pub fn new(api_key: Option<String>, settings: OrchestratorSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build Anthropic HTTP client")?;
        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            settings,
            http,
        })
    }

    async fn complete_text(&self, api_key: &str, system: &str, context: &str) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Anthropic API key")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = AnthropicRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: context,
            }],
        };

        let resp = self
            .http
            .post(ANTHROPIC_MESSAGES_URL)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("failed to call Anthropic messages API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Anthropic returned {}: {}", status, text);
        }

        let parsed: AnthropicResponse = resp
            .json()
            .await
            .context("failed to parse Anthropic response")?;
        let answer = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(text),
                AnthropicResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if answer.is_empty() {
            bail!("Anthropic response missing text content");
        }
        Ok(answer)
    }
}

#[async_trait]
impl Orchestrator for AnthropicOrchestrator {
    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete_json(&self, system: &str, context: &str) -> Option<Value> {
        let api_key = self.api_key.as_deref()?;
        match self.complete_text(api_key, system, context).await {
            Ok(text) => parse_json_reply(&text),
            Err(e) => {
                error!(error = ?e, "Anthropic orchestrator call failed");
                None
            }
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// An [`Orchestrator`] for any OpenAI-compatible chat completions API.
pub struct OpenAICompatibleOrchestrator {
    client: Option<Client<OpenAIConfig>>,
    settings: OrchestratorSettings,
}

impl OpenAICompatibleOrchestrator {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Credentials; `None` leaves the client unavailable.
    /// * `api_base` - Base URL of the service (e.g. `https://api.openai.com/v1`).
    /// * `settings` - Model identifier, completion budget and request timeout.
    pub fn new(
        api_key: Option<String>,
        api_base: &str,
        settings: OrchestratorSettings,
    ) -> Result<Self> {
        let client = match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                let http = reqwest::Client::builder()
                    .timeout(settings.timeout)
                    .build()
                    .context("failed to build OpenAI HTTP client")?;
                let config = OpenAIConfig::new().with_api_key(key).with_api_base(api_base);
                Some(Client::with_config(config).with_http_client(http))
            }
            None => None,
        };
        Ok(Self { client, settings })
    }

    async fn complete_text(
        &self,
        client: &Client<OpenAIConfig>,
        system: &str,
        context: &str,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.model)
            .max_completion_tokens(self.settings.max_tokens)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(context)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = client.chat().create(request).await?;

        let answer = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;
        Ok(answer)
    }
}

#[async_trait]
impl Orchestrator for OpenAICompatibleOrchestrator {
    fn available(&self) -> bool {
        self.client.is_some()
    }

    async fn complete_json(&self, system: &str, context: &str) -> Option<Value> {
        let client = self.client.as_ref()?;
        match self.complete_text(client, system, context).await {
            Ok(text) => parse_json_reply(&text),
            Err(e) => {
                error!(error = ?e, "OpenAI-compatible orchestrator call failed");
                None
            }
        }
    }
}

/// Removes a Markdown code fence wrapped around a reply, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the opening fence line, including any language tag.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parses a model reply as JSON, tolerating fences and stray prose around a
/// single top-level object.
pub fn parse_json_reply(text: &str) -> Option<Value> {
    let cleaned = strip_code_fences(text);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => Some(value),
        Err(first_err) => {
            let start = cleaned.find('{');
            let end = cleaned.rfind('}');
            if let (Some(start), Some(end)) = (start, end) {
                if start < end {
                    if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                        debug!("Recovered JSON object from surrounding text");
                        return Some(value);
                    }
                }
            }
            error!(error = %first_err, "Failed to parse orchestrator JSON reply");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> OrchestratorSettings {
        OrchestratorSettings {
            model: "test-model".to_string(),
            max_tokens: 256,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_json_reply() {
        assert_eq!(parse_json_reply("```json\n{\"groups\": []}\n```"), Some(json!({"groups": []})));
        assert_eq!(
            parse_json_reply("Here is the plan:\n{\"groups\": [], \"next_nodes\": []}\nEnjoy!"),
            Some(json!({"groups": [], "next_nodes": []}))
        );
        assert_eq!(parse_json_reply("[1, 2, 3]"), Some(json!([1, 2, 3])));
        assert_eq!(parse_json_reply("not json at all"), None);
        assert_eq!(parse_json_reply(""), None);
    }

    #[tokio::test]
    async fn test_clients_without_keys_are_unavailable() {
        let anthropic = AnthropicOrchestrator::new(None, settings()).unwrap();
        assert!(!anthropic.available());
        assert_eq!(anthropic.complete_json("system", "context").await, None);

        let blank = AnthropicOrchestrator::new(Some("  ".to_string()), settings()).unwrap();
        assert!(!blank.available());

        let openai = OpenAICompatibleOrchestrator::new(None, "https://api.openai.com/v1", settings()).unwrap();
        assert!(!openai.available());
        assert_eq!(openai.complete_json("system", "context").await, None);
    }

    #[test]
    fn test_clients_with_keys_are_available() {
        let anthropic = AnthropicOrchestrator::new(Some("sk-ant-test".to_string()), settings()).unwrap();
        assert!(anthropic.available());

        let openai = OpenAICompatibleOrchestrator::new(
            Some("sk-test".to_string()),
            "https://api.openai.com/v1",
            settings(),
        )
        .unwrap();
        assert!(openai.available());
    }
}
