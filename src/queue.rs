use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::VecDeque;
use std::time::Duration;

use crate::models::TaskDescriptor;
use crate::rate_limit::Admission;

/// Result of appending to a user's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    pub depth: usize,
    /// The queue did not exist before this call, so no drain loop owns it yet.
    pub created: bool,
}

/// One drain attempt against a user's queue
#[derive(Debug)]
pub enum DrainStep {
    /// Queue was empty and its entry is gone.
    Drained,
    /// Head task is not admitted yet.
    Wait(Duration),
    /// Head task popped and admitted.
    Ready(TaskDescriptor),
}

/// Pending tasks keyed by user id.
///
/// An entry lives from the enqueue that creates it until a drain attempt
/// finds it empty. Its presence means a drain loop is responsible for it.
#[derive(Default)]
pub struct UserQueues {
    queues: DashMap<String, VecDeque<TaskDescriptor>>,
}

impl UserQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append without any gate. A created queue is left for the caller to drain.
    pub fn enqueue(&self, task: TaskDescriptor) -> Enqueued {
        match self.queues.entry(task.user_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let queue = occupied.get_mut();
                queue.push_back(task);
                Enqueued {
                    depth: queue.len(),
                    created: false,
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(VecDeque::from([task]));
                Enqueued {
                    depth: 1,
                    created: true,
                }
            }
        }
    }

    /// Append `task` only if `gate` passes; the gate runs under the user's entry lock.
    ///
    /// When the queue is created, the first drain attempt runs under the same
    /// lock: `admit_first` decides whether the new head is popped right away.
    /// The returned step is then `Some` and the caller owns the drain loop.
    pub fn enqueue_if<E>(
        &self,
        task: TaskDescriptor,
        gate: impl FnOnce() -> Result<(), E>,
        admit_first: impl FnOnce() -> Admission,
    ) -> Result<(Enqueued, Option<DrainStep>), E> {
        match self.queues.entry(task.user_id.clone()) {
            Entry::Occupied(mut occupied) => {
                gate()?;
                let queue = occupied.get_mut();
                queue.push_back(task);
                let enqueued = Enqueued {
                    depth: queue.len(),
                    created: false,
                };
                Ok((enqueued, None))
            }
            Entry::Vacant(vacant) => {
                gate()?;
                let mut queue = VecDeque::from([task]);
                let first = match admit_first() {
                    Admission::RetryAfter(delay) => DrainStep::Wait(delay),
                    Admission::Granted => {
                        queue.pop_front().map_or(DrainStep::Drained, DrainStep::Ready)
                    }
                };
                // the entry stays even when emptied, the new loop removes it
                vacant.insert(queue);
                let enqueued = Enqueued {
                    depth: 1,
                    created: true,
                };
                Ok((enqueued, Some(first)))
            }
        }
    }

    /// Pop the head for `user_id` if `admit` grants it.
    ///
    /// `admit` is only consulted when there is a head task. An empty queue is
    /// removed from the map in the same critical section.
    pub fn dequeue_front_if(
        &self,
        user_id: &str,
        admit: impl FnOnce() -> Admission,
    ) -> DrainStep {
        let Entry::Occupied(mut occupied) = self.queues.entry(user_id.to_string()) else {
            return DrainStep::Drained;
        };

        if occupied.get().is_empty() {
            occupied.remove();
            return DrainStep::Drained;
        }

        match admit() {
            Admission::RetryAfter(delay) => DrainStep::Wait(delay),
            Admission::Granted => match occupied.get_mut().pop_front() {
                Some(task) => DrainStep::Ready(task),
                None => {
                    occupied.remove();
                    DrainStep::Drained
                }
            },
        }
    }

    /// Unconditional pop; `None` once the queue is drained and removed.
    pub fn dequeue_front(&self, user_id: &str) -> Option<TaskDescriptor> {
        match self.dequeue_front_if(user_id, || Admission::Granted) {
            DrainStep::Ready(task) => Some(task),
            _ => None,
        }
    }

    pub fn is_empty(&self, user_id: &str) -> bool {
        self.queues.get(user_id).is_none_or(|q| q.is_empty())
    }

    pub fn len(&self, user_id: &str) -> usize {
        self.queues.get(user_id).map_or(0, |q| q.len())
    }

    /// Users that currently own a queue entry.
    pub fn active_users(&self) -> usize {
        self.queues.len()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.queues.contains_key(user_id)
    }
}
