mod errors;
mod habit_series;
mod pipeline_contract;
pub mod policies;

pub use errors::{ErrorCategory, ErrorKind, LlmError, PersistenceError, PipelineError, ViolationReason};
pub use habit_series::{
    Difficulty, HabitAction, HabitSeries, HabitSeriesDraft, HabitSeriesDto, HabitSeriesRecord,
    MAX_ACTIONS, MIN_ACTIONS, Rank, ValidatedArtifact,
};
pub use pipeline_contract::{
    Language, Message, MessageEnvelope, MessageRole, PassConfig, PassId, PipelineRequest,
    PipelineRequestDto, ProviderResponse,
};
pub use policies::{PassConfigTable, PersistencePolicy};
