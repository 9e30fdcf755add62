//! Per-user rate limited task queue served over HTTP
//!
//! Tasks are accepted on `POST /api/v1/task`, queued per user and executed
//! one at a time, at most one start per second and twenty per minute.

pub mod app;
pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod queue;
pub mod rate_limit;
pub mod scheduler;
pub mod state;
pub mod task_log;
