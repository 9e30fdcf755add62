//! Error types for submission, task execution and the completion log

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

use crate::models::MessageResponse;

/// Synchronous rejection of a submission
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("User ID is required")]
    MissingUserId,

    #[error("Rate limit exceeded. Try again later.")]
    RateLimited { retry_after: Duration },
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmitError::MissingUserId => StatusCode::BAD_REQUEST,
            SubmitError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Label used for the rejection counter
    pub fn reason(&self) -> &'static str {
        match self {
            SubmitError::MissingUserId => "missing_user_id",
            SubmitError::RateLimited { .. } => "rate_limited",
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SubmitError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let body = Json(MessageResponse::new(self.to_string()));
        let mut response = (self.status(), body).into_response();
        if let Some(retry_after) = self.retry_after() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
        }
        response
    }
}

// Retry-After takes whole seconds, never zero for a rejection
fn retry_after_secs(delay: Duration) -> u64 {
    let secs = delay.as_secs() + u64::from(delay.subsec_nanos() > 0);
    secs.max(1)
}

/// Failure of a single task; never fatal to the user's drain loop
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task panicked")]
    Panicked,

    #[error("task timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure to append to the completion log
#[derive(Debug, Error)]
pub enum TaskLogError {
    #[error("task log I/O error: {0}")]
    Io(#[from] std::io::Error),
}
