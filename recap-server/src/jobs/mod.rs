//! The asynchronous summarization machinery: bounded job queue,
//! active-video registry, and the worker pool.

pub mod queue;
pub mod registry;
pub mod worker;

pub use queue::{Job, JobQueue};
pub use registry::{ActiveJobs, Attach};
