use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, register_counter, register_counter_vec, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref TASKS_SUBMITTED: Counter = register_counter!(
        "task_gateway_submissions_total",
        "Total task submissions received"
    )
    .unwrap();
    pub static ref TASKS_REJECTED: CounterVec = register_counter_vec!(
        "task_gateway_rejections_total",
        "Submissions rejected, by reason",
        &["reason"]
    )
    .unwrap();
    pub static ref TASKS_COMPLETED: Counter = register_counter!(
        "task_gateway_tasks_completed_total",
        "Tasks executed successfully"
    )
    .unwrap();
    pub static ref TASKS_FAILED: Counter = register_counter!(
        "task_gateway_tasks_failed_total",
        "Tasks whose execution failed"
    )
    .unwrap();
    pub static ref ACTIVE_DRAIN_LOOPS: Gauge = register_gauge!(
        "task_gateway_active_drain_loops",
        "Users with a running drain loop"
    )
    .unwrap();
    pub static ref QUEUE_WAIT: Histogram = register_histogram!(
        "task_gateway_queue_wait_seconds",
        "Time from submission to dispatch in seconds"
    )
    .unwrap();
}
