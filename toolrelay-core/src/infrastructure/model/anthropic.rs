//! Anthropic Messages API client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::traits::ModelProvider;
use super::types::{ModelError, ModelRequest, ModelResponse, StopReason};
use crate::types::{ContentBlock, ToolDefinition, WireMessage};

const PROVIDER_ID: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "/v1/messages";

#[derive(Clone)]
pub struct AnthropicClient {
    endpoint: String,
    api_key: Option<String>,
    http: Client,
}

impl AnthropicClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            http: Client::new(),
        }
    }

    fn build_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        format!("{base}{MESSAGES_PATH}")
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::missing_api_key(PROVIDER_ID))
    }
}

#[async_trait]
impl ModelProvider for AnthropicClient {
    async fn send(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let api_key = self.require_api_key()?;
        let url = self.build_url();

        let payload = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: &request.messages,
            tools: &request.tools,
        };

        info!(
            provider = PROVIDER_ID,
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to model provider"
        );

        let response = self
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelError::network(PROVIDER_ID, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::api(PROVIDER_ID, status, body));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(PROVIDER_ID, e.to_string()))?;

        let stop_reason = body
            .stop_reason
            .as_deref()
            .map(StopReason::from_api)
            .ok_or_else(|| ModelError::invalid_response(PROVIDER_ID, "missing stop_reason"))?;
        let content = parse_blocks(body.content);

        debug!(?stop_reason, blocks = content.len(), "Received model response");
        Ok(ModelResponse::new(stop_reason, content))
    }
}

/// Keep the block kinds the loop understands; anything newer (thinking, citations) is dropped.
fn parse_blocks(raw: Vec<Value>) -> Vec<ContentBlock> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<ContentBlock>(value) {
            Ok(block) => Some(block),
            Err(err) => {
                debug!(error = %err, "skipping unsupported content block");
                None
            }
        })
        .collect()
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "<[ToolDefinition]>::is_empty")]
    tools: &'a [ToolDefinition],
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<String>,
}
