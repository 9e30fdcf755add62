mod health;
mod metrics;
mod task;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use task::submit_task_handler;
