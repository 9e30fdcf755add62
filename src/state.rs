use std::sync::Arc;
use crate::scheduler::Scheduler;
// app's shared state

pub struct AppState {
    pub scheduler: Arc<Scheduler>, // owns rate limits and per-user queues
}
