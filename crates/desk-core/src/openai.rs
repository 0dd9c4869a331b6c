//! OpenAI-compatible chat completions client

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::chat::{ChatMessage, ChatModel, Content, Role, ToolCall, ToolDefinition};
use crate::config::{require, OpenAiConfig};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<Content>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunctionCall,
}

/// Arguments travel as a JSON-encoded string
#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

/// Some compatible servers send `"tool_calls": null` on plain replies
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<WireToolCall>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<WireToolCall>>::deserialize(deserializer)?.unwrap_or_default())
}

fn function_type() -> String {
    "function".to_string()
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        let content = if msg.has_tool_calls() && msg.content.is_empty() {
            None
        } else {
            Some(msg.content.clone())
        };

        Self {
            role: msg.role,
            content,
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    call_type: function_type(),
                    function: WireFunctionCall {
                        name: call.function.name.clone(),
                        arguments: call.function.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<WireMessage> for ChatMessage {
    fn from(wire: WireMessage) -> Self {
        let tool_calls = wire
            .tool_calls
            .into_iter()
            .map(|call| {
                let id = if call.id.is_empty() {
                    uuid::Uuid::new_v4().to_string()
                } else {
                    call.id
                };
                ToolCall::new(id, call.function.name, parse_arguments(&call.function.arguments))
            })
            .collect();

        ChatMessage {
            role: wire.role,
            content: wire.content.unwrap_or_default(),
            tool_calls,
            tool_call_id: wire.tool_call_id,
            name: None,
        }
    }
}

/// Decode tool arguments; undecodable text is passed through as a JSON string
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Chat completions client bound to one model
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client from configuration
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
        })
    }

    /// Same endpoint and credentials, different model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat completion request and return the assistant reply
    #[instrument(skip(self, messages, tools), fields(model = %self.model, messages = messages.len()))]
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage> {
        let api_key = require(&self.api_key, "OPENAI_API_KEY")?;
        let url = format!("{}/chat/completions", self.base_url);

        let req = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools,
        };

        debug!(tools = tools.len(), "Sending chat completion request");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .context("Failed to connect to model endpoint")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, "Chat completion failed");
            anyhow::bail!("Chat completion failed with status {}: {}", status, body);
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| ChatMessage::from(c.message))
            .ok_or_else(|| anyhow::anyhow!("Chat completion returned no choices"))?;

        debug!(tool_calls = message.tool_calls.len(), "Received reply");
        Ok(message)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ChatMessage> {
        self.complete(messages, tools).await
    }
}
