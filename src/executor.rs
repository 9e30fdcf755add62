//! Task executor boundary

use async_trait::async_trait;
use tracing::info;

use crate::error::TaskError;
use crate::models::TaskDescriptor;

/// Performs the actual unit of work for a dequeued task
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &TaskDescriptor) -> Result<(), TaskError>;
}

/// Default executor: acknowledges the task in the service log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExecutor;

#[async_trait]
impl TaskExecutor for LogExecutor {
    async fn execute(&self, task: &TaskDescriptor) -> Result<(), TaskError> {
        info!(
            user_id = %task.user_id,
            task_id = task.id,
            payload = %task.payload,
            "executing task"
        );
        Ok(())
    }
}
