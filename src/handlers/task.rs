use axum::{Json, body::Bytes, extract::State};
use std::sync::Arc;
use tracing::debug;
use crate::error::SubmitError;
use crate::metrics::{TASKS_REJECTED, TASKS_SUBMITTED};
use crate::models::{MessageResponse, SubmitRequest};
use crate::state::AppState;

// POST /api/v1/task - accept or reject synchronously, execution happens later
pub async fn submit_task_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MessageResponse>, SubmitError> {
    TASKS_SUBMITTED.inc();

    let request = SubmitRequest::from_body(&body);
    let result = match request.user_id.as_deref() {
        Some(user_id) => state.scheduler.submit(user_id, request.payload),
        None => Err(SubmitError::MissingUserId),
    };

    match result {
        Ok(submission) => {
            debug!(task_id = submission.task_id, depth = submission.depth, "task accepted");
            Ok(Json(MessageResponse::new("Task added to queue.")))
        }
        Err(e) => {
            TASKS_REJECTED.with_label_values(&[e.reason()]).inc();
            Err(e)
        }
    }
}
