use std::sync::Arc;

use crate::domain::{LlmError, MessageEnvelope, PassConfig, PipelineError, ProviderResponse};

use super::AiProvider;

pub const OPENAI_FAMILY: &str = "openai";
pub const GEMINI_FAMILY: &str = "gemini";

const OPENAI_PREFIXES: &[&str] = &["gpt-", "o1", "o3"];
const GEMINI_PREFIXES: &[&str] = &["gemini-"];

#[derive(Clone)]
struct ProviderFamily {
    family_id: String,
    prefixes: Vec<String>,
    provider: Arc<dyn AiProvider>,
}

impl ProviderFamily {
    fn claims(&self, model_id: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| model_id.starts_with(prefix.as_str()))
    }
}

/// Maps model identifiers to vendor adapters by ordered, case-sensitive
/// prefix match. First matching family wins; there is no default family.
#[derive(Default, Clone)]
pub struct ProviderRouter {
    families: Vec<ProviderFamily>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default table: OpenAI (`gpt-`, `o1`, `o3`) then Gemini (`gemini-`).
    pub fn standard(
        openai: Arc<dyn AiProvider>,
        gemini: Arc<dyn AiProvider>,
    ) -> Result<Self, LlmError> {
        let mut router = Self::new();
        router.register_family(OPENAI_FAMILY, OPENAI_PREFIXES, openai)?;
        router.register_family(GEMINI_FAMILY, GEMINI_PREFIXES, gemini)?;
        Ok(router)
    }

    pub fn register_family(
        &mut self,
        family_id: &str,
        prefixes: &[&str],
        provider: Arc<dyn AiProvider>,
    ) -> Result<(), LlmError> {
        let family_id = family_id.trim();
        if family_id.is_empty() {
            return Err(LlmError::validation("provider family id must not be empty"));
        }
        if self
            .families
            .iter()
            .any(|family| family.family_id == family_id)
        {
            return Err(LlmError::validation(format!(
                "provider family '{family_id}' is already registered"
            )));
        }
        if prefixes.is_empty() || prefixes.iter().any(|prefix| prefix.is_empty()) {
            return Err(LlmError::validation(format!(
                "provider family '{family_id}' requires non-empty model prefixes"
            )));
        }

        self.families.push(ProviderFamily {
            family_id: family_id.to_string(),
            prefixes: prefixes.iter().map(|prefix| (*prefix).to_string()).collect(),
            provider,
        });
        Ok(())
    }

    pub fn resolve_adapter(&self, model_id: &str) -> Result<Arc<dyn AiProvider>, PipelineError> {
        if model_id.is_empty() {
            return Err(PipelineError::UnknownProvider {
                model_id: String::new(),
            });
        }

        self.families
            .iter()
            .find(|family| family.claims(model_id))
            .map(|family| Arc::clone(&family.provider))
            .ok_or_else(|| PipelineError::UnknownProvider {
                model_id: model_id.to_string(),
            })
    }

    pub fn execute(
        &self,
        user_id: &str,
        messages: &MessageEnvelope,
        config: &PassConfig,
    ) -> Result<ProviderResponse, PipelineError> {
        let provider = self.resolve_adapter(&config.model_id)?;
        provider
            .execute(user_id, messages, config)
            .map_err(|source| PipelineError::ProviderExecution {
                model_id: config.model_id.clone(),
                source,
            })
    }

    pub fn families(&self) -> Vec<&str> {
        self.families
            .iter()
            .map(|family| family.family_id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::ProviderRouter;
    use crate::domain::{
        LlmError, MessageEnvelope, PassConfig, PipelineError, ProviderResponse,
    };
    use crate::infra::llm::AiProvider;

    struct FakeProvider {
        provider_id: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn shared(provider_id: &'static str) -> (Arc<dyn AiProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider: Arc<dyn AiProvider> = Arc::new(Self {
                provider_id,
                calls: Arc::clone(&calls),
            });
            (provider, calls)
        }
    }

    impl AiProvider for FakeProvider {
        fn provider_id(&self) -> &str {
            self.provider_id
        }

        fn execute(
            &self,
            _user_id: &str,
            _messages: &MessageEnvelope,
            config: &PassConfig,
        ) -> Result<ProviderResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if config.model_id.ends_with("-broken") {
                return Err(LlmError::Timeout);
            }
            Ok(ProviderResponse {
                content: format!("{} answered", self.provider_id),
                model_id: config.model_id.clone(),
                tokens_used: 10,
                resource_cost: 1,
            })
        }
    }

    fn router() -> ProviderRouter {
        let (openai, _) = FakeProvider::shared("openai");
        let (gemini, _) = FakeProvider::shared("gemini");
        ProviderRouter::standard(openai, gemini).expect("standard table should build")
    }

    fn config(model_id: &str) -> PassConfig {
        PassConfig {
            model_id: model_id.to_string(),
            temperature: 0.5,
            max_output_tokens: 100,
            force_strict_json: false,
        }
    }

    #[test]
    fn resolves_openai_and_gemini_families_by_prefix() {
        let router = router();

        for model_id in ["gpt-4o-mini", "o1-preview"] {
            let provider = router.resolve_adapter(model_id).expect("openai model should route");
            assert_eq!(provider.provider_id(), "openai");
        }
        for model_id in ["gemini-2.5-flash", "gemini-2.5-pro"] {
            let provider = router.resolve_adapter(model_id).expect("gemini model should route");
            assert_eq!(provider.provider_id(), "gemini");
        }
    }

    #[test]
    fn unknown_and_empty_models_fail_fast() {
        let router = router();

        for model_id in ["mistral-large", "", "claude-3", "GPT-4o", " gpt-4o"] {
            let error = router
                .resolve_adapter(model_id)
                .err()
                .expect("unroutable model should fail");
            assert!(matches!(error, PipelineError::UnknownProvider { .. }));
        }
    }

    #[test]
    fn first_registered_family_wins_on_overlap() {
        let (first, _) = FakeProvider::shared("first");
        let (second, _) = FakeProvider::shared("second");
        let mut router = ProviderRouter::new();
        router
            .register_family("first", &["gpt-"], first)
            .expect("first family should register");
        router
            .register_family("second", &["gpt-4"], second)
            .expect("second family should register");

        let provider = router.resolve_adapter("gpt-4o").expect("model should route");
        assert_eq!(provider.provider_id(), "first");
        assert_eq!(router.families(), vec!["first", "second"]);
    }

    #[test]
    fn register_rejects_duplicate_family_and_empty_prefixes() {
        let (provider, _) = FakeProvider::shared("openai");
        let mut router = ProviderRouter::new();
        router
            .register_family("openai", &["gpt-"], Arc::clone(&provider))
            .expect("first registration should succeed");

        let duplicate = router
            .register_family("openai", &["o1"], Arc::clone(&provider))
            .expect_err("duplicate family should fail");
        assert!(matches!(
            duplicate,
            LlmError::Validation { message }
            if message == "provider family 'openai' is already registered"
        ));

        let empty_prefix = router
            .register_family("other", &[""], provider)
            .expect_err("empty prefix would claim every model");
        assert!(matches!(empty_prefix, LlmError::Validation { .. }));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn execute_delegates_and_wraps_adapter_failures() {
        let (openai, openai_calls) = FakeProvider::shared("openai");
        let (gemini, gemini_calls) = FakeProvider::shared("gemini");
        let router = ProviderRouter::standard(openai, gemini).expect("router should build");
        let messages = MessageEnvelope::system_and_user("rules", "hello");

        let response = router
            .execute("user-1", &messages, &config("gemini-2.5-flash"))
            .expect("gemini call should succeed");
        assert_eq!(response.content, "gemini answered");
        assert_eq!(gemini_calls.load(Ordering::SeqCst), 1);

        let error = router
            .execute("user-1", &messages, &config("gpt-4o-broken"))
            .expect_err("adapter failure should surface");
        assert!(matches!(
            error,
            PipelineError::ProviderExecution { model_id, source: LlmError::Timeout }
            if model_id == "gpt-4o-broken"
        ));
        assert_eq!(openai_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_model_never_reaches_an_adapter() {
        let (openai, openai_calls) = FakeProvider::shared("openai");
        let (gemini, gemini_calls) = FakeProvider::shared("gemini");
        let router = ProviderRouter::standard(openai, gemini).expect("router should build");

        let error = router
            .execute(
                "user-1",
                &MessageEnvelope::system_and_user("rules", "hello"),
                &config("claude-3"),
            )
            .expect_err("claude-3 has no family");

        assert!(matches!(
            error,
            PipelineError::UnknownProvider { model_id } if model_id == "claude-3"
        ));
        assert_eq!(openai_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gemini_calls.load(Ordering::SeqCst), 0);
    }
}
