mod create_habit_series_use_case;
mod handler;
mod in_memory;
mod observer;
mod ports;

pub use create_habit_series_use_case::{CreateHabitSeriesUseCase, PipelineCollaborators};
pub use handler::{CreateHabitSeriesHandler, CreateHabitSeriesResponse, ErrorResponse};
pub use in_memory::{AllowAllPolicy, InMemoryHabitSeriesRepository, InMemoryUserState};
pub use observer::{PipelineEvent, PipelineObserver, TracingObserver};
pub use ports::{ArtifactRepository, DomainPolicy, Eligibility, UserStateRepository};
