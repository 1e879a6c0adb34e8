use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{LlmError, PipelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    Pt,
    It,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::Pt,
        Language::It,
    ];

    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|language| language.code().eq_ignore_ascii_case(code))
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Pt => "pt",
            Self::It => "it",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Spanish",
            Self::Fr => "French",
            Self::De => "German",
            Self::Pt => "Portuguese",
            Self::It => "Italian",
        }
    }
}

/// Identifier of one of the three fixed pipeline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Creative,
    Structure,
    Normalize,
}

impl PassId {
    /// Execution order of the pipeline.
    pub const ORDER: [PassId; 3] = [PassId::Creative, PassId::Structure, PassId::Normalize];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creative => "habit_series_creative",
            Self::Structure => "habit_series_structure",
            Self::Normalize => "json_conversion",
        }
    }

    pub fn parse(identifier: &str) -> Option<Self> {
        Self::ORDER
            .into_iter()
            .find(|pass| pass.as_str() == identifier)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassConfig {
    pub model_id: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub force_strict_json: bool,
}

impl PassConfig {
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.model_id.trim().is_empty() {
            return Err(LlmError::validation("model_id must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(LlmError::validation(format!(
                "temperature must be in 0.0..=1.0 (got {})",
                self.temperature
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(LlmError::validation(
                "max_output_tokens must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered message sequence: at most one leading system message followed by
/// one or more user/assistant messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    messages: Vec<Message>,
}

impl MessageEnvelope {
    pub fn new(messages: Vec<Message>) -> Result<Self, LlmError> {
        let conversation_start = match messages.first() {
            Some(message) if message.role == MessageRole::System => 1,
            _ => 0,
        };

        let conversation = &messages[conversation_start..];
        if conversation.is_empty() {
            return Err(LlmError::validation(
                "message envelope requires at least one user or assistant message",
            ));
        }
        if conversation
            .iter()
            .any(|message| message.role == MessageRole::System)
        {
            return Err(LlmError::validation(
                "system message is only allowed as the first message",
            ));
        }

        Ok(Self { messages })
    }

    pub fn system_and_user(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.messages
            .first()
            .filter(|message| message.role == MessageRole::System)
    }

    /// Messages after the leading system message.
    pub fn conversation(&self) -> &[Message] {
        let start = usize::from(self.system_message().is_some());
        &self.messages[start..]
    }

    pub fn total_chars(&self) -> usize {
        self.messages
            .iter()
            .map(|message| message.content.chars().count())
            .sum()
    }

    pub fn map_user_content<F>(&self, mut map: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        let messages = self
            .messages
            .iter()
            .map(|message| match message.role {
                MessageRole::User => Message::user(map(&message.content)),
                _ => message.clone(),
            })
            .collect();
        Self { messages }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub content: String,
    pub model_id: String,
    pub tokens_used: u32,
    pub resource_cost: u32,
}

/// Wire-level body of a create request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequestDto {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub test_data: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub assistant_context: Option<String>,
}

/// Accepted create request; answers keep their submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    user_id: String,
    language: Language,
    raw_answers: Vec<(String, String)>,
    assistant_context: Option<String>,
}

impl PipelineRequest {
    pub fn from_dto(user_id: &str, dto: PipelineRequestDto) -> Result<Self, PipelineError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(PipelineError::invalid_payload("user id must not be empty"));
        }

        let language_code = dto
            .language
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| PipelineError::invalid_payload("language is required"))?;
        let language = Language::parse(language_code).ok_or_else(|| {
            PipelineError::invalid_payload(format!("language '{language_code}' is not supported"))
        })?;

        let answers = dto.test_data.unwrap_or_default();
        let mut raw_answers = Vec::with_capacity(answers.len());
        for (key, value) in answers {
            let key = key.trim();
            if key.is_empty() {
                return Err(PipelineError::invalid_payload(
                    "testData keys must not be empty",
                ));
            }
            raw_answers.push((key.to_string(), value.trim().to_string()));
        }
        if raw_answers.iter().all(|(_, value)| value.is_empty()) {
            return Err(PipelineError::invalid_payload(
                "testData must include at least one answer",
            ));
        }

        let assistant_context = dto
            .assistant_context
            .map(|context| context.trim().to_string())
            .filter(|context| !context.is_empty());

        Ok(Self {
            user_id: user_id.to_string(),
            language,
            raw_answers,
            assistant_context,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn raw_answers(&self) -> &[(String, String)] {
        &self.raw_answers
    }

    pub fn assistant_context(&self) -> Option<&str> {
        self.assistant_context.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn dto(language: Option<&str>, answers: &[(&str, &str)]) -> PipelineRequestDto {
        let test_data = answers
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<IndexMap<_, _>>();
        PipelineRequestDto {
            language: language.map(str::to_string),
            test_data: Some(test_data),
            assistant_context: None,
        }
    }

    #[test]
    fn from_dto_preserves_answer_order() {
        let request = PipelineRequest::from_dto(
            "user-1",
            dto(Some("en"), &[("zeta", "last"), ("alpha", "first"), ("mid", "x")]),
        )
        .expect("valid request should be accepted");

        let keys = request
            .raw_answers()
            .iter()
            .map(|(key, _)| key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(request.language(), Language::En);
    }

    #[test]
    fn from_dto_rejects_missing_language_and_answers() {
        let missing_language = PipelineRequest::from_dto("user-1", dto(None, &[("habit", "run")]))
            .expect_err("missing language should fail");
        assert!(matches!(
            missing_language,
            PipelineError::InvalidPayload { message } if message == "language is required"
        ));

        let unsupported = PipelineRequest::from_dto("user-1", dto(Some("xx"), &[("habit", "run")]))
            .expect_err("unknown language should fail");
        assert!(matches!(
            unsupported,
            PipelineError::InvalidPayload { message } if message == "language 'xx' is not supported"
        ));

        let no_answers = PipelineRequest::from_dto("user-1", dto(Some("en"), &[]))
            .expect_err("empty answers should fail");
        assert!(matches!(
            no_answers,
            PipelineError::InvalidPayload { message }
            if message == "testData must include at least one answer"
        ));
    }

    #[test]
    fn dto_deserializes_camel_case_wire_fields() {
        let dto: PipelineRequestDto = serde_json::from_str(
            r#"{"language":"es","testData":{"habit":"leer","time":"mañana"},"assistantContext":"  coach  "}"#,
        )
        .expect("wire JSON should decode");

        let request = PipelineRequest::from_dto("user-9", dto).expect("request should be valid");
        assert_eq!(request.language(), Language::Es);
        assert_eq!(request.raw_answers()[1].0, "time");
        assert_eq!(request.assistant_context(), Some("coach"));
    }

    #[test]
    fn envelope_enforces_leading_system_message() {
        let valid = MessageEnvelope::new(vec![
            Message::system("rules"),
            Message::user("hi"),
            Message::assistant("hello"),
        ])
        .expect("leading system message is allowed");
        assert_eq!(valid.conversation().len(), 2);

        let late_system = MessageEnvelope::new(vec![Message::user("hi"), Message::system("rules")])
            .expect_err("system message after user should fail");
        assert!(matches!(late_system, LlmError::Validation { .. }));

        let only_system = MessageEnvelope::new(vec![Message::system("rules")])
            .expect_err("system-only envelope should fail");
        assert!(matches!(only_system, LlmError::Validation { .. }));
    }

    #[test]
    fn map_user_content_leaves_trusted_roles_untouched() {
        let envelope = MessageEnvelope::new(vec![
            Message::system("SYSTEM"),
            Message::user("user"),
            Message::assistant("assistant"),
        ])
        .expect("envelope should build");

        let mapped = envelope.map_user_content(str::to_uppercase);
        assert_eq!(mapped.messages()[0].content, "SYSTEM");
        assert_eq!(mapped.messages()[1].content, "USER");
        assert_eq!(mapped.messages()[2].content, "assistant");
    }

    #[test]
    fn pass_config_validation_checks_ranges() {
        let config = PassConfig {
            model_id: "gpt-4o-mini".to_string(),
            temperature: 1.5,
            max_output_tokens: 10,
            force_strict_json: false,
        };
        assert!(matches!(config.validate(), Err(LlmError::Validation { .. })));
    }

    #[test]
    fn pass_identifiers_round_trip_through_parse() {
        assert_eq!(PassId::parse("json_conversion"), Some(PassId::Normalize));
        assert_eq!(PassId::parse("habit_series_final"), None);
    }
}
