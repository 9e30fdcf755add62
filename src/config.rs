use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;
use crate::scheduler::SchedulerConfig;

// CLI argument structure, every option can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "task-gateway")]
#[command(about = "Per-user rate limited task queue over HTTP")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Minimum spacing between two admitted tasks of one user, in ms
    #[arg(long, env = "MIN_INTERVAL_MS", default_value_t = 1000)]
    pub min_interval_ms: u64,

    // Max tasks admitted per user per window
    #[arg(
        long,
        env = "MAX_PER_WINDOW",
        default_value_t = 20,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_per_window: u32,

    // Rate limit window in seconds
    #[arg(
        long,
        env = "WINDOW_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub window_secs: u64,

    // Pause after each executed task before the next drain attempt, in ms
    #[arg(long, env = "TASK_SPACING_MS", default_value_t = 1000)]
    pub task_spacing_ms: u64,

    // Abort a task after this many seconds, 0 disables
    #[arg(long, env = "TASK_TIMEOUT_SECS", default_value_t = 0)]
    pub task_timeout_secs: u64,

    // Append-only completion log
    #[arg(long, env = "TASK_LOG", default_value = "task_log.txt")]
    pub task_log: PathBuf,

    // Default tracing filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            min_interval: Duration::from_millis(self.min_interval_ms),
            max_per_window: self.max_per_window,
            window: Duration::from_secs(self.window_secs),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            rate_limit: self.rate_limit_config(),
            task_spacing: Duration::from_millis(self.task_spacing_ms),
            task_timeout: (self.task_timeout_secs > 0)
                .then(|| Duration::from_secs(self.task_timeout_secs)),
        }
    }
}
