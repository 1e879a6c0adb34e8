use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::domain::{LlmError, MessageEnvelope, MessageRole, PassConfig, ProviderResponse};

use super::AiProvider;
use super::accounting::{CostFormula, GEMINI_COST, estimate_tokens};
use super::env::{provider_timeout_from_env, read_env_var, read_first_env_var};
use super::response_parsing::{build_versioned_url, join_text_parts, non_empty_owned, truncate_message};
use super::sanitize::sanitize_user_content;

const PROVIDER_ID: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";
const JSON_MIME_TYPE: &str = "application/json";

const ENV_API_KEY: &str = "HABITLOOM_GEMINI_API_KEY";
const ENV_API_KEY_FALLBACKS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];
const ENV_BASE_URL: &str = "HABITLOOM_GEMINI_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "HABITLOOM_GEMINI_TIMEOUT_SECS";

pub struct GeminiProvider {
    api_key: String,
    api_base_url: String,
    client: Client,
    cost: CostFormula,
}

impl GeminiProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = read_first_env_var(ENV_API_KEY, ENV_API_KEY_FALLBACKS)?.ok_or_else(|| {
            LlmError::validation(
                "Gemini API key is missing (set HABITLOOM_GEMINI_API_KEY or GEMINI_API_KEY)",
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
            return Err(LlmError::validation("Gemini API key must not be empty"));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(LlmError::validation("Gemini API base URL must not be empty"));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            LlmError::internal(format!("failed to create Gemini HTTP client: {err}"))
        })?;

        Ok(Self {
            api_key,
            api_base_url,
            client,
            cost: GEMINI_COST,
        })
    }

    fn endpoint_url(&self, model_id: &str) -> String {
        build_versioned_url(
            &self.api_base_url,
            API_VERSION,
            &format!("models/{model_id}:generateContent"),
        )
    }

    fn build_request_payload(
        &self,
        messages: &MessageEnvelope,
        config: &PassConfig,
    ) -> GeminiGenerateContentRequest {
        let system_instruction = messages.system_message().map(|message| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: message.content.clone(),
            }],
        });

        let contents = messages
            .conversation()
            .iter()
            .map(|message| GeminiContent {
                role: Some(gemini_role(message.role).to_string()),
                parts: vec![GeminiPart {
                    text: message.content.clone(),
                }],
            })
            .collect();

        GeminiGenerateContentRequest {
            system_instruction,
            contents,
            generation_config: GeminiGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                response_mime_type: config
                    .force_strict_json
                    .then(|| JSON_MIME_TYPE.to_string()),
            },
        }
    }

    fn map_success_response(
        &self,
        config: &PassConfig,
        prompt_chars: usize,
        response_body: &str,
    ) -> Result<ProviderResponse, LlmError> {
        let response: GeminiGenerateContentResponse =
            serde_json::from_str(response_body).map_err(|err| {
                LlmError::invalid_response(format!("Gemini response decode failed: {err}"))
            })?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(LlmError::invalid_response(format!(
                "Gemini blocked the prompt: {reason}"
            )));
        }

        let content = response
            .candidates
            .iter()
            .find_map(GeminiCandidate::extract_text)
            .ok_or_else(|| {
                LlmError::invalid_response("Gemini response did not include text content")
            })?;

        let response_chars = content.chars().count();
        let tokens_used = response
            .usage_metadata
            .as_ref()
            .and_then(GeminiUsageMetadata::total)
            .unwrap_or_else(|| {
                estimate_tokens(prompt_chars).saturating_add(estimate_tokens(response_chars))
            });
        let model_id = response
            .model_version
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

impl AiProvider for GeminiProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn execute(
        &self,
        _user_id: &str,
        messages: &MessageEnvelope,
        config: &PassConfig,
    ) -> Result<ProviderResponse, LlmError> {
        config.validate()?;
        let sanitized = messages.map_user_content(sanitize_user_content);
        let payload = self.build_request_payload(&sanitized, config);

        let response = self
            .client
            .post(self.endpoint_url(&config.model_id))
            .header("x-goog-api-key", &self.api_key)
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

fn gemini_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Assistant => "model",
        MessageRole::System | MessageRole::User => "user",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

impl GeminiCandidate {
    fn extract_text(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        join_text_parts(content.parts.iter().map(|part| part.text.as_str()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}

impl GeminiUsageMetadata {
    fn total(&self) -> Option<u32> {
        self.total_token_count.or_else(|| {
            let (Some(prompt), Some(candidates)) =
                (self.prompt_token_count, self.candidates_token_count)
            else {
                return None;
            };
            prompt.checked_add(candidates)
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    #[serde(default)]
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let detail = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);
    let error_status = detail.as_ref().and_then(|detail| detail.status.as_deref());

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || matches!(error_status, Some("UNAUTHENTICATED" | "PERMISSION_DENIED"))
    {
        return LlmError::Auth;
    }

    if status == StatusCode::TOO_MANY_REQUESTS || matches!(error_status, Some("RESOURCE_EXHAUSTED"))
    {
        return LlmError::RateLimited;
    }

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
        || matches!(error_status, Some("DEADLINE_EXCEEDED"))
    {
        return LlmError::Timeout;
    }

    let message = detail
        .map(|detail| detail.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| truncate_message(body));

    LlmError::Transport {
        message: format!("Gemini API returned HTTP {status}: {message}"),
    }
}

fn map_transport_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        return LlmError::Timeout;
    }

    LlmError::Transport {
        message: format!("Gemini transport error: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{GeminiProvider, map_http_error};
    use crate::domain::{LlmError, Message, MessageEnvelope, PassConfig};

    fn provider() -> GeminiProvider {
        GeminiProvider::with_config(
            "test-key",
            "https://generativelanguage.googleapis.com",
            Duration::from_secs(2),
        )
        .expect("provider should build")
    }

    fn normalize_config() -> PassConfig {
        PassConfig {
            model_id: "gemini-2.5-flash".to_string(),
            temperature: 0.0,
            max_output_tokens: 800,
            force_strict_json: true,
        }
    }

    #[test]
    fn build_request_payload_moves_system_message_to_instruction() {
        let envelope = MessageEnvelope::new(vec![
            Message::system("Convert to JSON."),
            Message::user("Title: Read Daily"),
            Message::assistant("Noted."),
        ])
        .expect("envelope should build");

        let payload = provider().build_request_payload(&envelope, &normalize_config());
        let json = serde_json::to_value(&payload).expect("payload should serialize");

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Convert to JSON.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 800);
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn build_request_payload_omits_mime_type_without_strict_json() {
        let mut config = normalize_config();
        config.force_strict_json = false;

        let payload = provider()
            .build_request_payload(&MessageEnvelope::system_and_user("s", "u"), &config);
        let json = serde_json::to_value(&payload).expect("payload should serialize");

        assert!(json["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn map_success_response_is_free_of_resource_cost() {
        let body = r#"{
          "candidates": [
            {"content": {"role": "model", "parts": [{"text": "{\"title\":"}, {"text": "\"Read Daily\"}"}]}, "finishReason": "STOP"}
          ],
          "usageMetadata": {"promptTokenCount": 200, "candidatesTokenCount": 40, "totalTokenCount": 240},
          "modelVersion": "gemini-2.5-flash"
        }"#;

        let response = provider()
            .map_success_response(&normalize_config(), 4000, body)
            .expect("response mapping should succeed");

        assert_eq!(response.content, "{\"title\":\"Read Daily\"}");
        assert_eq!(response.tokens_used, 240);
        assert_eq!(response.resource_cost, 0);
        assert_eq!(response.model_id, "gemini-2.5-flash");
    }

    #[test]
    fn map_success_response_rejects_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;

        let error = provider()
            .map_success_response(&normalize_config(), 10, body)
            .expect_err("blocked prompt should fail");

        assert!(matches!(
            error,
            LlmError::InvalidResponse { message } if message == "Gemini blocked the prompt: SAFETY"
        ));
    }

    #[test]
    fn map_http_error_maps_google_status_codes() {
        let exhausted = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        let auth = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid","status":"UNAUTHENTICATED"}}"#,
        );
        let invalid = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"bad field","status":"INVALID_ARGUMENT"}}"#,
        );

        assert!(matches!(exhausted, LlmError::RateLimited));
        assert!(matches!(auth, LlmError::Auth));
        assert!(matches!(
            invalid,
            LlmError::Transport { message } if message.ends_with("bad field")
        ));
    }

    #[test]
    fn endpoint_url_embeds_model_id() {
        assert_eq!(
            provider().endpoint_url("gemini-2.5-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }
}
