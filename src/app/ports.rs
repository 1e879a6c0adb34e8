use crate::domain::{HabitSeriesDraft, HabitSeriesDto, PersistenceError, PipelineRequest};

/// Persists a validated draft. The call is atomic from the pipeline's side.
pub trait ArtifactRepository: Send + Sync {
    fn create_from_validated(
        &self,
        user_id: &str,
        draft: HabitSeriesDraft,
    ) -> Result<HabitSeriesDto, PersistenceError>;
}

/// Best-effort per-user bookkeeping that runs after a successful save.
pub trait UserStateRepository: Send + Sync {
    fn record_new_artifact(&self, user_id: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Allow,
    Deny { reason: String },
}

/// Consulted once per request, before any provider call.
pub trait DomainPolicy: Send + Sync {
    fn check_eligibility(&self, user_id: &str, request: &PipelineRequest) -> Eligibility;
}
