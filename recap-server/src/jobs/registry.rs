//! Active-video registry.
//!
//! Enforces at-most-one in-flight summarization per video and records the
//! fan-out set of subscribers accumulated while the job is pending.
//! While an entry exists, exactly one job for that video is queued or
//! being processed.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

/// Outcome of [`ActiveJobs::attach_or_start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// The video was not active; the caller must enqueue a job (and call
    /// [`ActiveJobs::remove`] if enqueueing fails).
    Started,
    /// A job is already queued or running; the user is on the subscriber
    /// list (idempotent).
    Attached,
}

pub struct ActiveJobs {
    inner: Mutex<HashMap<String, Vec<String>>>,
}

impl ActiveJobs {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Register interest in `video_id` for `user_id`.
    pub fn attach_or_start(&self, video_id: &str, user_id: &str) -> Attach {
        let mut map = self.inner.lock().expect("registry lock poisoned");

        match map.get_mut(video_id) {
            Some(subscribers) => {
                if !subscribers.iter().any(|id| id == user_id) {
                    subscribers.push(user_id.to_string());
                    debug!(video_id, user_id, "attached subscriber to active job");
                }
                Attach::Attached
            }
            None => {
                map.insert(video_id.to_string(), vec![user_id.to_string()]);
                debug!(video_id, user_id, "registered new active job");
                Attach::Started
            }
        }
    }

    /// Atomically read and remove the subscriber list for `video_id`.
    ///
    /// Atomicity matters: a non-atomic read-then-remove could drop a
    /// subscriber attaching in between.
    pub fn take_subscribers(&self, video_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .remove(video_id)
            .unwrap_or_default()
    }

    /// Unconditional delete, used only for queue-full rollback.
    pub fn remove(&self, video_id: &str) {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .remove(video_id);
    }

    /// Whether a job for `video_id` is queued or running.
    pub fn is_active(&self, video_id: &str) -> bool {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .contains_key(video_id)
    }
}

impl Default for ActiveJobs {
    fn default() -> Self {
        Self::new()
    }
}
