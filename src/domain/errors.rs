use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ClientError,
    TransientFailure,
    InternalFailure,
}

/// Failure reported by a single provider adapter call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("provider authentication failed")]
    Auth,
    #[error("provider rate limit reached")]
    RateLimited,
    #[error("provider request timed out")]
    Timeout,
    #[error("provider returned an invalid response: {message}")]
    InvalidResponse { message: String },
    #[error("provider transport failed: {message}")]
    Transport { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl LlmError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// First structural rule a candidate artifact broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViolationReason {
    #[error("candidate must be a JSON object")]
    NotAnObject,
    #[error("{field} must be a non-empty string")]
    EmptyString { field: String },
    #[error("actions must be an array")]
    ActionsNotAnArray,
    #[error("actions must contain between {min} and {max} entries (got {count})")]
    ActionCount { count: usize, min: usize, max: usize },
    #[error("actions[{index}] must be a JSON object")]
    ActionNotAnObject { index: usize },
    #[error("actions[{index}].difficulty must be one of {allowed} (got '{value}')")]
    UnknownDifficulty {
        index: usize,
        value: String,
        allowed: String,
    },
}

impl ViolationReason {
    pub fn empty_string(field: impl Into<String>) -> Self {
        Self::EmptyString {
            field: field.into(),
        }
    }

    pub fn field(&self) -> String {
        match self {
            Self::NotAnObject => "$".to_string(),
            Self::EmptyString { field } => field.clone(),
            Self::ActionsNotAnArray | Self::ActionCount { .. } => "actions".to_string(),
            Self::ActionNotAnObject { index } => format!("actions[{index}]"),
            Self::UnknownDifficulty { index, .. } => format!("actions[{index}].difficulty"),
        }
    }
}

/// Failure raised by a persistence or user-state collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct PersistenceError {
    pub operation: String,
    pub message: String,
}

impl PersistenceError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPayload,
    MissingDependency,
    Ineligible,
    UnknownProvider,
    ProviderExecution,
    MalformedOutput,
    ContractViolation,
    Persistence,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPayload => "invalid_payload",
            Self::MissingDependency => "missing_dependency",
            Self::Ineligible => "ineligible",
            Self::UnknownProvider => "unknown_provider",
            Self::ProviderExecution => "provider_execution",
            Self::MalformedOutput => "malformed_output",
            Self::ContractViolation => "contract_violation",
            Self::Persistence => "persistence",
            Self::Internal => "internal",
        }
    }
}

/// Terminal failure of the habit series pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },
    #[error("missing dependency: {name}")]
    MissingDependency { name: &'static str },
    #[error("request not eligible: {reason}")]
    Ineligible { reason: String },
    #[error("no provider registered for model '{model_id}'")]
    UnknownProvider { model_id: String },
    #[error("provider call for model '{model_id}' failed: {source}")]
    ProviderExecution { model_id: String, source: LlmError },
    #[error("normalization output is not valid JSON: {message}")]
    MalformedOutput { message: String },
    #[error("contract violation at {}: {reason}", .reason.field())]
    ContractViolation { reason: ViolationReason },
    #[error(transparent)]
    Persistence { source: PersistenceError },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPayload { .. } => ErrorKind::InvalidPayload,
            Self::MissingDependency { .. } => ErrorKind::MissingDependency,
            Self::Ineligible { .. } => ErrorKind::Ineligible,
            Self::UnknownProvider { .. } => ErrorKind::UnknownProvider,
            Self::ProviderExecution { .. } => ErrorKind::ProviderExecution,
            Self::MalformedOutput { .. } => ErrorKind::MalformedOutput,
            Self::ContractViolation { .. } => ErrorKind::ContractViolation,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPayload { .. } | Self::Ineligible { .. } => ErrorCategory::ClientError,
            Self::ProviderExecution { .. } => ErrorCategory::TransientFailure,
            Self::MissingDependency { .. }
            | Self::UnknownProvider { .. }
            | Self::MalformedOutput { .. }
            | Self::ContractViolation { .. }
            | Self::Persistence { .. }
            | Self::Internal { .. } => ErrorCategory::InternalFailure,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidPayload { message } => {
                format!("Please review the request: {message}")
            }
            Self::MissingDependency { .. } | Self::UnknownProvider { .. } => {
                "The habit generator is not configured correctly. Please contact support."
                    .to_string()
            }
            Self::Ineligible { reason } => {
                format!("A new habit series cannot be created right now: {reason}")
            }
            Self::ProviderExecution { source, .. } => match source {
                LlmError::RateLimited => {
                    "The AI provider is rate limiting requests. Please retry in a moment."
                        .to_string()
                }
                LlmError::Timeout => "The AI provider did not respond in time. Please retry."
                    .to_string(),
                _ => "The AI provider could not complete the request. Please retry.".to_string(),
            },
            Self::MalformedOutput { .. } | Self::ContractViolation { .. } => {
                "The generated habit series was not usable. Please try again.".to_string()
            }
            Self::Persistence { .. } => {
                "The habit series could not be saved. Please try again.".to_string()
            }
            Self::Internal { message } => format!("An internal error occurred: {message}"),
        }
    }
}

impl From<PersistenceError> for PipelineError {
    fn from(source: PersistenceError) -> Self {
        Self::Persistence { source }
    }
}

impl From<ViolationReason> for PipelineError {
    fn from(reason: ViolationReason) -> Self {
        Self::ContractViolation { reason }
    }
}
