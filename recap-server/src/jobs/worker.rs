//! Fixed worker pool draining the job queue.
//!
//! Each worker loops: receive a job, run it inside a panic-contained
//! scope, then atomically take the subscriber list and fan the terminal
//! event out. Workers exit when the queue closes.

use std::sync::Arc;

use recap_common::events::SummaryEvent;
use recap_common::transcript::merge_transcript;
use recap_common::types::SummaryResponse;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::jobs::queue::Job;
use crate::jobs::registry::ActiveJobs;
use crate::pipeline::{JobError, Summarize};
use crate::sse::EventHub;
use crate::store::{SummaryCache, UserHistory};

/// Everything a worker needs, shared across the pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub cache: Arc<SummaryCache>,
    pub history: Arc<UserHistory>,
    pub registry: Arc<ActiveJobs>,
    pub hub: Arc<EventHub>,
    pub summarizer: Arc<dyn Summarize>,
    pub merge_interval_seconds: f64,
}

/// Spawn `count` workers sharing one queue receiver.
///
/// The receiver sits behind a mutex; whichever worker holds it blocks on
/// receive while the rest wait their turn, which hands jobs out in FIFO
/// order. The pool is not respawned on worker death; operators rely on
/// process supervision.
pub fn spawn_workers(
    count: usize,
    rx: mpsc::Receiver<Job>,
    ctx: WorkerContext,
) -> Vec<JoinHandle<()>> {
    let shared_rx = Arc::new(Mutex::new(rx));

    (1..=count)
        .map(|worker_id| {
            let shared_rx = Arc::clone(&shared_rx);
            let ctx = ctx.clone();
            tokio::spawn(async move {
                info!(worker_id, "summary worker starting");
                worker_loop(worker_id, shared_rx, ctx).await;
                info!(worker_id, "summary worker stopping");
            })
        })
        .collect()
}

async fn worker_loop(worker_id: usize, shared_rx: Arc<Mutex<mpsc::Receiver<Job>>>, ctx: WorkerContext) {
    loop {
        let job = {
            let mut rx = shared_rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            // Queue closed; drain is complete.
            break;
        };

        info!(worker_id, video_id = %job.video_id, user_id = %job.user_id, "picked up job");

        // Panic containment: the job runs in its own task so a panic is
        // caught at the join point instead of killing the worker.
        let job_ctx = ctx.clone();
        let job_clone = job.clone();
        let outcome = tokio::spawn(async move { process_job(&job_ctx, &job_clone).await }).await;

        let event = match outcome {
            Ok(Ok(response)) => SummaryEvent::Complete(response),
            Ok(Err(err)) => {
                warn!(worker_id, video_id = %job.video_id, %err, "job failed");
                SummaryEvent::Error {
                    video_id: job.video_id.clone(),
                    error: err.to_string(),
                }
            }
            Err(join_err) => {
                error!(worker_id, video_id = %job.video_id, %join_err, "job panicked");
                SummaryEvent::Error {
                    video_id: job.video_id.clone(),
                    error: "server error during summarization".to_string(),
                }
            }
        };

        let subscribers = ctx.registry.take_subscribers(&job.video_id);
        if subscribers.is_empty() {
            warn!(worker_id, video_id = %job.video_id, "no subscribers at fan-out");
        }
        for user_id in subscribers {
            ctx.hub.send(&user_id, event.clone());
        }
    }
}

/// Run one job to a [`SummaryResponse`].
///
/// Persistence failures after a generated summary degrade to warnings;
/// the subscribers still get their result.
async fn process_job(ctx: &WorkerContext, job: &Job) -> Result<SummaryResponse, JobError> {
    // Another path may have populated the cache while this job sat in the
    // queue.
    if let Some(cached) = ctx.cache.get(&job.video_id) {
        info!(video_id = %job.video_id, "cache populated while queued; reusing");

        if let Err(err) = ctx.history.add(&job.user_id, &job.video_id, &cached.title) {
            warn!(video_id = %job.video_id, user_id = %job.user_id, %err, "failed to record history");
        }

        let mut transcript = cached.transcript.clone();
        if transcript.is_empty() {
            match ctx.summarizer.fetch_transcript(&job.video_id).await {
                Ok(fresh) => {
                    transcript = fresh;
                    if let Err(err) = ctx.cache.set(
                        &job.video_id,
                        &cached.title,
                        &cached.summary,
                        cached.timestamps.clone(),
                        transcript.clone(),
                    ) {
                        warn!(video_id = %job.video_id, %err, "failed to backfill cached transcript");
                    }
                }
                Err(err) => {
                    warn!(video_id = %job.video_id, %err, "transcript backfill failed");
                }
            }
        }

        return Ok(SummaryResponse {
            video_id: job.video_id.clone(),
            title: cached.title,
            summary: cached.summary,
            timestamps: cached.timestamps,
            transcript: merge_transcript(&transcript, ctx.merge_interval_seconds),
            cached: true,
        });
    }

    let output = ctx.summarizer.summarize(job).await?;

    if let Err(err) = ctx.cache.set(
        &job.video_id,
        &output.title,
        &output.summary,
        Some(output.timestamps.clone()),
        output.transcript.clone(),
    ) {
        warn!(video_id = %job.video_id, %err, "failed to persist summary to cache");
    }
    if let Err(err) = ctx.history.add(&job.user_id, &job.video_id, &output.title) {
        warn!(video_id = %job.video_id, user_id = %job.user_id, %err, "failed to record history");
    }

    Ok(SummaryResponse {
        video_id: job.video_id.clone(),
        title: output.title,
        summary: output.summary,
        timestamps: Some(output.timestamps),
        transcript: merge_transcript(&output.transcript, ctx.merge_interval_seconds),
        cached: false,
    })
}
