//! Completion log sink
//!
//! The scheduler reports each successfully executed task here. Failures are
//! returned to the caller, which logs and drops them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::TaskLogError;

#[async_trait]
pub trait TaskLog: Send + Sync {
    async fn record_completion(&self, user_id: &str, at: DateTime<Utc>)
    -> Result<(), TaskLogError>;
}

/// One completion line, e.g. `u1-task completed at-1700000000000`
pub fn completion_line(user_id: &str, at: DateTime<Utc>) -> String {
    format!("{}-task completed at-{}\n", user_id, at.timestamp_millis())
}

/// Append-only file log
#[derive(Debug, Clone)]
pub struct FileTaskLog {
    path: PathBuf,
}

impl FileTaskLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TaskLog for FileTaskLog {
    async fn record_completion(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TaskLogError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(completion_line(user_id, at).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// In-memory log, handy for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryTaskLog {
    entries: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl MemoryTaskLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, DateTime<Utc>)> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TaskLog for MemoryTaskLog {
    async fn record_completion(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TaskLogError> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((user_id.to_string(), at));
        Ok(())
    }
}
