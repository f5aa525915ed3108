//! Per-job summarization pipeline.
//!
//! metadata → transcript → chunks → per-chunk LLM calls → assembly →
//! timestamp extraction. Failure at any step is fatal to the job and is
//! surfaced to subscribers as a `summary_error` frame.

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use recap_common::time::parse_timestamp;
use recap_common::transcript::{chunk_transcript, format_chunk};
use recap_common::types::{Timestamp, TranscriptItem};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::jobs::Job;
use crate::services::chat::{ChatClient, ChatError};
use crate::services::key_policy::KeyPolicy;
use crate::services::ytdlp::{ExtractorError, YtDlp};

static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think span regex"));

static TIMESTAMP_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d{1,2}):(\d{2})(?::(\d{2}))?\]").expect("marker regex"));

/// Job-fatal pipeline failures.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("no LLM API key available")]
    NoApiKey,

    #[error(transparent)]
    Extractor(#[from] ExtractorError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("{0}")]
    Failed(String),
}

/// Everything a successful job produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub title: String,
    pub summary: String,
    pub timestamps: Vec<Timestamp>,
    /// Unmerged transcript, sorted ascending by start.
    pub transcript: Vec<TranscriptItem>,
}

/// The summarization seam the worker pool drives. Tests substitute their
/// own implementation.
#[async_trait]
pub trait Summarize: Send + Sync {
    /// Run the full pipeline for one job.
    async fn summarize(&self, job: &Job) -> Result<PipelineOutput, JobError>;

    /// Fetch just the transcript, used to backfill cache entries that
    /// predate transcript storage.
    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<TranscriptItem>, JobError>;
}

/// Production pipeline backed by yt-dlp and the chat API.
pub struct SummaryPipeline {
    ytdlp: YtDlp,
    chat: ChatClient,
    key_policy: Arc<KeyPolicy>,
    server_key: Option<String>,
    chunk_seconds: f64,
}

impl SummaryPipeline {
    pub fn new(
        ytdlp: YtDlp,
        chat: ChatClient,
        key_policy: Arc<KeyPolicy>,
        server_key: Option<String>,
        chunk_seconds: f64,
    ) -> Self {
        Self {
            ytdlp,
            chat,
            key_policy,
            server_key,
            chunk_seconds,
        }
    }

    /// The user's own key always wins; otherwise the server key applies
    /// when the policy admits this user.
    fn resolve_api_key(&self, job: &Job) -> Result<String, JobError> {
        if let Some(key) = &job.api_key {
            return Ok(key.clone());
        }
        if self.key_policy.can_use_server_key(&job.user_id) {
            if let Some(key) = &self.server_key {
                return Ok(key.clone());
            }
        }
        Err(JobError::NoApiKey)
    }
}

#[async_trait]
impl Summarize for SummaryPipeline {
    async fn summarize(&self, job: &Job) -> Result<PipelineOutput, JobError> {
        let api_key = self.resolve_api_key(job)?;

        let info = self.ytdlp.video_info(&job.video_id).await?;
        let items = self.ytdlp.transcript(&job.video_id).await?;
        let chunks = chunk_transcript(&items, self.chunk_seconds);

        info!(
            video_id = %job.video_id,
            title = %info.title,
            items = items.len(),
            chunks = chunks.len(),
            "transcript acquired"
        );

        let mut history = Vec::new();
        let mut parts = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let formatted = format_chunk(chunk);
            let text = self
                .chat
                .summarize_chunk(&api_key, &mut history, &formatted)
                .await?;
            debug!(video_id = %job.video_id, chunk = index + 1, "chunk summarized");
            parts.push(strip_think_spans(&text));
        }

        let summary = parts.join("\n\n");
        let timestamps = extract_timestamps(&summary);

        Ok(PipelineOutput {
            title: info.title,
            summary,
            timestamps,
            transcript: items,
        })
    }

    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<TranscriptItem>, JobError> {
        Ok(self.ytdlp.transcript(video_id).await?)
    }
}

/// Remove `<think>…</think>` spans some models emit before the answer.
pub fn strip_think_spans(text: &str) -> String {
    THINK_SPAN.replace_all(text, "").trim().to_string()
}

/// Parse `[MM:SS]` / `[HH:MM:SS]` markers out of a summary. The marker
/// text is the sentence that follows, up to and including the first period.
pub fn extract_timestamps(summary: &str) -> Vec<Timestamp> {
    let mut timestamps = Vec::new();

    for captures in TIMESTAMP_MARKER.captures_iter(summary) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(time) = parse_timestamp(whole.as_str()) else {
            continue;
        };

        let rest = &summary[whole.end()..];
        let text = match rest.find('.') {
            Some(period) => &rest[..=period],
            None => rest,
        };

        timestamps.push(Timestamp {
            time,
            text: text.trim().to_string(),
        });
    }

    timestamps
}
