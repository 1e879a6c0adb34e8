use std::sync::Arc;

use serde_json::Value;

use crate::domain::{
    HabitSeriesDraft, HabitSeriesDto, MessageEnvelope, PassConfigTable, PassId, PersistencePolicy,
    PipelineError, PipelineRequest, PipelineRequestDto,
};
use crate::infra::llm::{OutputValidator, PromptBuilder, ProviderRouter};

use super::observer::{PipelineEvent, PipelineObserver, TracingObserver};
use super::ports::{ArtifactRepository, DomainPolicy, Eligibility, UserStateRepository};

/// Passes whose content the normalized artifact carries: the structure pass
/// produced it, the normalization pass only reshaped it.
const ARTIFACT_LINEAGE: [PassId; 2] = [PassId::Structure, PassId::Normalize];

/// External collaborators of the pipeline. Missing entries are reported as
/// `MissingDependency` when a request arrives, not at construction time.
#[derive(Clone, Default)]
pub struct PipelineCollaborators {
    pub router: Option<ProviderRouter>,
    pub repository: Option<Arc<dyn ArtifactRepository>>,
    pub user_state: Option<Arc<dyn UserStateRepository>>,
    pub policy: Option<Arc<dyn DomainPolicy>>,
    pub observer: Option<Arc<dyn PipelineObserver>>,
}

impl PipelineCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_router(mut self, router: ProviderRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn ArtifactRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_user_state(mut self, user_state: Arc<dyn UserStateRepository>) -> Self {
        self.user_state = Some(user_state);
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn DomainPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

struct Wired<'a> {
    router: &'a ProviderRouter,
    repository: &'a dyn ArtifactRepository,
    user_state: &'a dyn UserStateRepository,
    policy: &'a dyn DomainPolicy,
}

/// Creative, structure and normalization passes followed by validation and a
/// single save. Holds no per-request state, so one instance serves
/// concurrent requests.
pub struct CreateHabitSeriesUseCase {
    collaborators: PipelineCollaborators,
    observer: Arc<dyn PipelineObserver>,
    passes: PassConfigTable,
    persistence: PersistencePolicy,
    validator: OutputValidator,
}

impl CreateHabitSeriesUseCase {
    pub fn new(collaborators: PipelineCollaborators) -> Self {
        let observer = collaborators
            .observer
            .clone()
            .unwrap_or_else(|| Arc::new(TracingObserver));

        Self {
            collaborators,
            observer,
            passes: PassConfigTable::default(),
            persistence: PersistencePolicy::default(),
            validator: OutputValidator::new(),
        }
    }

    pub fn with_pass_configs(mut self, passes: PassConfigTable) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_persistence_policy(mut self, persistence: PersistencePolicy) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn pass_configs(&self) -> &PassConfigTable {
        &self.passes
    }

    pub fn execute(
        &self,
        user_id: &str,
        dto: PipelineRequestDto,
    ) -> Result<HabitSeriesDto, PipelineError> {
        let result = self.run(user_id, dto);
        if let Err(error) = &result {
            self.observer
                .on_event(&PipelineEvent::PipelineFailed { user_id, error });
        }
        result
    }

    fn run(&self, user_id: &str, dto: PipelineRequestDto) -> Result<HabitSeriesDto, PipelineError> {
        let wired = self.wired()?;
        let request = PipelineRequest::from_dto(user_id, dto)?;
        let user_id = request.user_id();

        if let Eligibility::Deny { reason } = wired.policy.check_eligibility(user_id, &request) {
            return Err(PipelineError::Ineligible { reason });
        }

        let language = request.language();
        let creative = self.run_pass(
            &wired,
            user_id,
            PassId::Creative,
            PromptBuilder::creative(
                language,
                request.raw_answers(),
                request.assistant_context(),
            ),
        )?;
        let structured = self.run_pass(
            &wired,
            user_id,
            PassId::Structure,
            PromptBuilder::structure(language, &creative),
        )?;
        let normalized = self.run_pass(
            &wired,
            user_id,
            PassId::Normalize,
            PromptBuilder::normalize(language, &structured),
        )?;

        let candidate: Value = serde_json::from_str(&normalized).map_err(|err| {
            PipelineError::MalformedOutput {
                message: err.to_string(),
            }
        })?;
        let artifact = self.validator.validate(&candidate).map_err(|reason| {
            self.observer.on_event(&PipelineEvent::ValidationFailed {
                user_id,
                reason: &reason,
            });
            PipelineError::from(reason)
        })?;

        if !ARTIFACT_LINEAGE
            .into_iter()
            .any(|pass| self.persistence.is_persist_eligible(pass))
        {
            return Err(PipelineError::internal(format!(
                "persistence policy does not accept artifacts from the '{}' pass",
                self.persistence.final_pass().as_str()
            )));
        }

        let dto = wired
            .repository
            .create_from_validated(user_id, HabitSeriesDraft::from_validated(artifact))?;
        self.observer.on_event(&PipelineEvent::Persisted {
            user_id,
            artifact_id: &dto.id,
        });

        if let Err(error) = wired.user_state.record_new_artifact(user_id) {
            self.observer
                .on_event(&PipelineEvent::SideEffectFailed { user_id, error: &error });
        }

        Ok(dto)
    }

    fn run_pass(
        &self,
        wired: &Wired<'_>,
        user_id: &str,
        pass: PassId,
        messages: MessageEnvelope,
    ) -> Result<String, PipelineError> {
        let config = self.passes.get(pass);
        self.observer.on_event(&PipelineEvent::PassStarted {
            user_id,
            pass,
            model_id: &config.model_id,
        });

        let response = wired.router.execute(user_id, &messages, config)?;
        self.observer.on_event(&PipelineEvent::PassCompleted {
            user_id,
            pass,
            model_id: &response.model_id,
            tokens_used: response.tokens_used,
            resource_cost: response.resource_cost,
        });

        Ok(response.content)
    }

    fn wired(&self) -> Result<Wired<'_>, PipelineError> {
        let collaborators = &self.collaborators;
        Ok(Wired {
            router: collaborators
                .router
                .as_ref()
                .ok_or(PipelineError::MissingDependency { name: "provider router" })?,
            repository: collaborators
                .repository
                .as_deref()
                .ok_or(PipelineError::MissingDependency { name: "artifact repository" })?,
            user_state: collaborators
                .user_state
                .as_deref()
                .ok_or(PipelineError::MissingDependency { name: "user state repository" })?,
            policy: collaborators
                .policy
                .as_deref()
                .ok_or(PipelineError::MissingDependency { name: "domain policy" })?,
        })
    }
}
