use crate::domain::{LlmError, MessageEnvelope, PassConfig, ProviderResponse};

/// One concrete AI vendor. Implementations must not retry internally.
pub trait AiProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    fn execute(
        &self,
        user_id: &str,
        messages: &MessageEnvelope,
        config: &PassConfig,
    ) -> Result<ProviderResponse, LlmError>;
}
