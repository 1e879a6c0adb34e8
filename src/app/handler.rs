use serde::{Deserialize, Serialize};

use crate::domain::{HabitSeriesDto, PipelineError, PipelineRequestDto};

use super::CreateHabitSeriesUseCase;

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateHabitSeriesResponse {
    pub status: String,
    pub artifact: HabitSeriesDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub kind: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_error(error: &PipelineError) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            kind: error.kind().as_str().to_string(),
            message: error.user_message(),
        }
    }
}

/// Upward boundary of the pipeline: one create request in, one terminal
/// response or error out.
pub struct CreateHabitSeriesHandler {
    use_case: CreateHabitSeriesUseCase,
}

impl CreateHabitSeriesHandler {
    pub fn new(use_case: CreateHabitSeriesUseCase) -> Self {
        Self { use_case }
    }

    pub fn handle_create_request(
        &self,
        user_id: &str,
        request: PipelineRequestDto,
    ) -> Result<CreateHabitSeriesResponse, PipelineError> {
        let artifact = self.use_case.execute(user_id, request)?;
        Ok(CreateHabitSeriesResponse {
            status: STATUS_SUCCESS.to_string(),
            artifact,
        })
    }
}
