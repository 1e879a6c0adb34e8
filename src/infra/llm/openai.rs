use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{LlmError, MessageEnvelope, PassConfig, ProviderResponse};

use super::AiProvider;
use super::accounting::{CostFormula, OPENAI_COST, estimate_tokens};
use super::env::{provider_timeout_from_env, read_env_var, read_first_env_var};
use super::response_parsing::{build_versioned_url, join_text_parts, non_empty_owned, truncate_message};
use super::sanitize::sanitize_user_content;

const PROVIDER_ID: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const ENV_API_KEY: &str = "HABITLOOM_OPENAI_API_KEY";
const ENV_API_KEY_FALLBACK: &str = "OPENAI_API_KEY";
const ENV_BASE_URL: &str = "HABITLOOM_OPENAI_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "HABITLOOM_OPENAI_TIMEOUT_SECS";

/// Reasoning models reject `temperature` and use `max_completion_tokens`.
const REASONING_MODEL_PREFIXES: &[&str] = &["o1", "o3"];

pub struct OpenAiProvider {
    api_key: String,
    api_base_url: String,
    client: Client,
    cost: CostFormula,
}

impl OpenAiProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = read_first_env_var(ENV_API_KEY, &[ENV_API_KEY_FALLBACK])?.ok_or_else(|| {
            LlmError::validation(
                "OpenAI API key is missing (set HABITLOOM_OPENAI_API_KEY or OPENAI_API_KEY)",
            )
        })?;
        let api_base_url =
            read_env_var(ENV_BASE_URL)?.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = provider_timeout_from_env(ENV_TIMEOUT_SECS)?;

        Self::with_config(api_key, api_base_url, timeout)
    }

    pub fn with_config(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::validation("OpenAI API key must not be empty"));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(LlmError::validation("OpenAI API base URL must not be empty"));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            LlmError::internal(format!("failed to create OpenAI HTTP client: {err}"))
        })?;

        Ok(Self {
            api_key,
            api_base_url,
            client,
            cost: OPENAI_COST,
        })
    }

    fn endpoint_url(&self) -> String {
        build_versioned_url(&self.api_base_url, "v1", "chat/completions")
    }

    fn build_request_payload(
        &self,
        user_id: &str,
        messages: &MessageEnvelope,
        config: &PassConfig,
    ) -> OpenAiChatCompletionsRequest {
        let reasoning_model = is_reasoning_model(&config.model_id);
        let messages = messages
            .messages()
            .iter()
            .map(|message| OpenAiChatMessage {
                role: message.role.as_str().to_string(),
                content: message.content.clone(),
            })
            .collect();

        OpenAiChatCompletionsRequest {
            model: config.model_id.clone(),
            messages,
            temperature: (!reasoning_model).then_some(config.temperature),
            max_tokens: (!reasoning_model).then_some(config.max_output_tokens),
            max_completion_tokens: reasoning_model.then_some(config.max_output_tokens),
            response_format: config.force_strict_json.then(|| OpenAiResponseFormat {
                format_type: "json_object".to_string(),
            }),
            user: non_empty_owned(user_id),
        }
    }

    fn map_success_response(
        &self,
        config: &PassConfig,
        prompt_chars: usize,
        response_body: &str,
    ) -> Result<ProviderResponse, LlmError> {
        let response: OpenAiChatCompletionsResponse =
            serde_json::from_str(response_body).map_err(|err| {
                LlmError::invalid_response(format!("OpenAI response decode failed: {err}"))
            })?;

        let content = response
            .choices
            .iter()
            .find_map(OpenAiChoice::extract_text)
            .ok_or_else(|| {
                LlmError::invalid_response("OpenAI response did not include text content")
            })?;

        let response_chars = content.chars().count();
        let tokens_used = response
            .usage
            .as_ref()
            .and_then(OpenAiUsage::total)
            .unwrap_or_else(|| {
                estimate_tokens(prompt_chars).saturating_add(estimate_tokens(response_chars))
            });
        let model_id = response
            .model
            .as_deref()
            .and_then(non_empty_owned)
            .unwrap_or_else(|| config.model_id.clone());

        Ok(ProviderResponse {
            content,
            model_id,
            tokens_used,
            resource_cost: self.cost.cost_for_text(prompt_chars, response_chars),
        })
    }
}

impl AiProvider for OpenAiProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn execute(
        &self,
        user_id: &str,
        messages: &MessageEnvelope,
        config: &PassConfig,
    ) -> Result<ProviderResponse, LlmError> {
        config.validate()?;
        let sanitized = messages.map_user_content(sanitize_user_content);
        let payload = self.build_request_payload(user_id, &sanitized, config);

        let response = self
            .client
            .post(self.endpoint_url())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        let response_body = response.text().map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_http_error(status, &response_body));
        }

        self.map_success_response(config, sanitized.total_chars(), &response_body)
    }
}

fn is_reasoning_model(model_id: &str) -> bool {
    REASONING_MODEL_PREFIXES
        .iter()
        .any(|prefix| model_id.starts_with(prefix))
}

#[derive(Debug, Serialize)]
struct OpenAiChatCompletionsRequest {
    model: String,
    messages: Vec<OpenAiChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatCompletionsResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<OpenAiChoiceMessage>,
}

impl OpenAiChoice {
    fn extract_text(&self) -> Option<String> {
        let content = self.message.as_ref()?.content.as_ref()?;
        match content {
            Value::String(text) => non_empty_owned(text),
            Value::Array(parts) => join_text_parts(parts.iter().filter_map(content_part_text)),
            _ => None,
        }
    }
}

fn content_part_text(part: &Value) -> Option<&str> {
    match part {
        Value::String(text) => Some(text.as_str()),
        Value::Object(map) => map.get("text").and_then(Value::as_str),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl OpenAiUsage {
    fn total(&self) -> Option<u32> {
        self.total_tokens.or_else(|| {
            let (Some(prompt), Some(completion)) = (self.prompt_tokens, self.completion_tokens)
            else {
                return None;
            };
            prompt.checked_add(completion)
        })
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    #[serde(default)]
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let detail = serde_json::from_str::<OpenAiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);
    let error_type = detail.as_ref().and_then(|detail| detail.error_type.as_deref());
    let error_code = detail.as_ref().and_then(|detail| detail.code.as_deref());

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || matches!(error_type, Some("authentication_error"))
        || matches!(error_code, Some("invalid_api_key"))
    {
        return LlmError::Auth;
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || matches!(error_type, Some("rate_limit_error" | "insufficient_quota"))
        || matches!(error_code, Some("rate_limit_exceeded"))
    {
        return LlmError::RateLimited;
    }

    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        return LlmError::Timeout;
    }

    let message = detail
        .map(|detail| detail.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| truncate_message(body));

    LlmError::Transport {
        message: format!("OpenAI API returned HTTP {status}: {message}"),
    }
}

fn map_transport_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        return LlmError::Timeout;
    }

    LlmError::Transport {
        message: format!("OpenAI transport error: {error}"),
    }
}
