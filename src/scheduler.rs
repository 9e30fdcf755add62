//! Per-user drain loops
//!
//! `submit` admits a task into its user's queue. The first task of an idle
//! user also runs the first drain attempt inline, under the queue's entry
//! lock, and then hands the queue to a spawned loop that keeps draining it:
//! every attempt either pops and executes the head task or waits for the
//! delay the rate limiter asks for. After each executed task the loop pauses
//! for `task_spacing`. The loop exits when an attempt finds the queue empty,
//! which removes the queue entry.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{SubmitError, TaskError};
use crate::executor::TaskExecutor;
use crate::metrics::{ACTIVE_DRAIN_LOOPS, QUEUE_WAIT, TASKS_COMPLETED, TASKS_FAILED};
use crate::models::TaskDescriptor;
use crate::queue::{DrainStep, UserQueues};
use crate::rate_limit::{Admission, RateLimitConfig, RateLimiter};
use crate::task_log::TaskLog;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub rate_limit: RateLimitConfig,
    /// Pause after each executed task
    pub task_spacing: Duration,
    /// Executor calls run unbounded when `None`
    pub task_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            task_spacing: Duration::from_secs(1),
            task_timeout: None,
        }
    }
}

/// Accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub task_id: u64,
    /// Queue length right after the enqueue
    pub depth: usize,
}

pub struct Scheduler {
    config: SchedulerConfig,
    limiter: RateLimiter,
    queues: UserQueues,
    executor: Arc<dyn TaskExecutor>,
    task_log: Arc<dyn TaskLog>,
    next_task_id: AtomicU64,
    shutdown: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        executor: Arc<dyn TaskExecutor>,
        task_log: Arc<dyn TaskLog>,
    ) -> Self {
        debug!(?config, "Scheduler::new: called");
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            limiter: RateLimiter::new(config.rate_limit),
            queues: UserQueues::new(),
            executor,
            task_log,
            next_task_id: AtomicU64::new(1),
            shutdown,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn queues(&self) -> &UserQueues {
        &self.queues
    }

    /// Accept or reject a task for `user_id`.
    ///
    /// The rate check here does not consume a slot; the drain loop admits the
    /// task separately when it dispatches it. Check, enqueue and, for a new
    /// queue, the first admission all happen under the same per-user lock.
    pub fn submit(
        self: &Arc<Self>,
        user_id: &str,
        payload: Value,
    ) -> Result<Submission, SubmitError> {
        if user_id.is_empty() {
            return Err(SubmitError::MissingUserId);
        }

        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let task = TaskDescriptor::new(task_id, user_id, payload);

        let (enqueued, first) = self.queues.enqueue_if(
            task,
            || match self.limiter.check(user_id, Instant::now()) {
                Admission::Granted => Ok(()),
                Admission::RetryAfter(retry_after) => {
                    Err(SubmitError::RateLimited { retry_after })
                }
            },
            // IDLE -> immediate drain attempt
            || self.limiter.admit(user_id, Instant::now()),
        )?;
        debug!(%user_id, task_id, depth = enqueued.depth, "task enqueued");

        if let Some(first) = first {
            let scheduler = Arc::clone(self);
            let user_id = user_id.to_string();
            tokio::spawn(async move { scheduler.drain(user_id, first).await });
        }

        Ok(Submission {
            task_id,
            depth: enqueued.depth,
        })
    }

    /// Ask every drain loop to stop at its next wait
    pub fn shutdown(&self) {
        info!(active = self.queues.active_users(), "Scheduler shutting down");
        self.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn drain_step(&self, user_id: &str) -> DrainStep {
        self.queues
            .dequeue_front_if(user_id, || self.limiter.admit(user_id, Instant::now()))
    }

    async fn drain(self: Arc<Self>, user_id: String, first: DrainStep) {
        let mut shutdown = self.shutdown.subscribe();
        ACTIVE_DRAIN_LOOPS.inc();
        debug!(%user_id, "drain loop started");

        let mut step = first;
        loop {
            let pause = match step {
                DrainStep::Drained => {
                    debug!(%user_id, "queue drained");
                    break;
                }
                DrainStep::Wait(delay) => {
                    debug!(%user_id, ?delay, "rate limited, waiting");
                    delay
                }
                DrainStep::Ready(task) => {
                    self.run_task(task).await;
                    self.config.task_spacing
                }
            };

            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.changed() => {
                    debug!(%user_id, "drain loop stopped by shutdown");
                    break;
                }
            }

            step = self.drain_step(&user_id);
        }

        ACTIVE_DRAIN_LOOPS.dec();
    }

    async fn run_task(&self, task: TaskDescriptor) {
        QUEUE_WAIT.observe(task.submitted_at.elapsed().as_secs_f64());
        let user_id = task.user_id.clone();
        let task_id = task.id;
        debug!(%user_id, task_id, "dispatching task");

        match self.execute(task).await {
            Ok(()) => {
                TASKS_COMPLETED.inc();
                if let Err(e) = self.task_log.record_completion(&user_id, Utc::now()).await {
                    warn!(%user_id, task_id, error = %e, "failed to record task completion");
                }
            }
            Err(e) => {
                TASKS_FAILED.inc();
                error!(%user_id, task_id, error = %e, "task execution failed");
            }
        }
    }

    // Runs on its own tokio task so a panic stays inside this task
    async fn execute(&self, task: TaskDescriptor) -> Result<(), TaskError> {
        let executor = Arc::clone(&self.executor);
        let mut handle = tokio::spawn(async move { executor.execute(&task).await });

        let joined = match self.config.task_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    return Err(TaskError::Timeout(limit));
                }
            },
            None => handle.await,
        };

        joined.unwrap_or_else(|e| {
            if e.is_panic() {
                Err(TaskError::Panicked)
            } else {
                Err(TaskError::Failed(e.to_string()))
            }
        })
    }
}
