//! Bounded FIFO job queue.
//!
//! Producers enqueue without blocking; a full queue rejects the job so the
//! request handler can roll back the registry and answer 503. Workers
//! block on receive and exit when every sender is gone.

use tokio::sync::mpsc;

/// One summarization job.
#[derive(Debug, Clone)]
pub struct Job {
    pub video_id: String,
    /// The initial requester; later subscribers are tracked in the
    /// active-video registry, not here.
    pub user_id: String,
    /// User-supplied LLM key, if any.
    pub api_key: Option<String>,
    /// Original request URL, kept for context.
    pub url: String,
}

/// Producer handle for the job queue.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
}

impl JobQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Non-blocking enqueue. Returns the job back on a full (or closed)
    /// queue so the caller can roll back.
    pub fn try_enqueue(&self, job: Job) -> Result<(), Job> {
        self.tx.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(job) => job,
            mpsc::error::TrySendError::Closed(job) => job,
        })
    }
}
