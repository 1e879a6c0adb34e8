use tracing::{debug, info, warn};

use crate::domain::{PassId, PersistenceError, PipelineError, ViolationReason};

/// Structured progress of one pipeline run.
#[derive(Debug, Clone, Copy)]
pub enum PipelineEvent<'a> {
    PassStarted {
        user_id: &'a str,
        pass: PassId,
        model_id: &'a str,
    },
    PassCompleted {
        user_id: &'a str,
        pass: PassId,
        model_id: &'a str,
        tokens_used: u32,
        resource_cost: u32,
    },
    ValidationFailed {
        user_id: &'a str,
        reason: &'a ViolationReason,
    },
    Persisted {
        user_id: &'a str,
        artifact_id: &'a str,
    },
    SideEffectFailed {
        user_id: &'a str,
        error: &'a PersistenceError,
    },
    PipelineFailed {
        user_id: &'a str,
        error: &'a PipelineError,
    },
}

impl PipelineEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PassStarted { .. } => "pass_started",
            Self::PassCompleted { .. } => "pass_completed",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::Persisted { .. } => "persisted",
            Self::SideEffectFailed { .. } => "side_effect_failed",
            Self::PipelineFailed { .. } => "pipeline_failed",
        }
    }
}

pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent<'_>);
}

/// Forwards pipeline events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        match *event {
            PipelineEvent::PassStarted {
                user_id,
                pass,
                model_id,
            } => debug!(user_id, pass = pass.as_str(), model_id, "pass started"),
            PipelineEvent::PassCompleted {
                user_id,
                pass,
                model_id,
                tokens_used,
                resource_cost,
            } => info!(
                user_id,
                pass = pass.as_str(),
                model_id,
                tokens_used,
                resource_cost,
                "pass completed"
            ),
            PipelineEvent::ValidationFailed { user_id, reason } => warn!(
                user_id,
                field = %reason.field(),
                reason = %reason,
                "normalized output failed validation"
            ),
            PipelineEvent::Persisted {
                user_id,
                artifact_id,
            } => info!(user_id, artifact_id, "habit series persisted"),
            PipelineEvent::SideEffectFailed { user_id, error } => {
                warn!(user_id, error = %error, "user state update failed after save")
            }
            PipelineEvent::PipelineFailed { user_id, error } => warn!(
                user_id,
                kind = error.kind().as_str(),
                error = %error,
                "habit series pipeline failed"
            ),
        }
    }
}
