//! Data model types shared between the server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single transcript line with its timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptItem {
    pub text: String,
    /// Offset from the start of the video, in seconds.
    pub start: f64,
    /// How long the line stays on screen, in seconds.
    pub duration: f64,
}

/// A topic marker extracted from a generated summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Position in the video, in whole seconds.
    pub time: u32,
    /// The sentence following the marker, up to the first period.
    pub text: String,
}

/// A completed summary as persisted in the cache.
///
/// One JSON file per entry, named `<videoId>.json` in the cache directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSummary {
    pub video_id: String,
    pub title: String,
    pub summary: String,
    pub timestamps: Option<Vec<Timestamp>>,
    /// Unmerged transcript, sorted ascending by `start`. Older cache files
    /// may lack this field entirely.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transcript: Vec<TranscriptItem>,
    pub created_at: DateTime<Utc>,
}

/// The response body for a summary request, also carried verbatim inside
/// `summary_complete` SSE frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub video_id: String,
    pub title: String,
    pub summary: String,
    pub timestamps: Option<Vec<Timestamp>>,
    /// Merged transcript for display (denser than the stored one).
    pub transcript: Vec<TranscriptItem>,
    pub cached: bool,
}

/// One entry of a user's viewing history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub video_id: String,
    pub video_title: String,
    pub viewed_at: DateTime<Utc>,
}

/// On-disk shape of a user's history file (`<usersDir>/<userId>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistoryFile {
    pub user_id: String,
    pub summaries: Vec<UserSummary>,
    pub updated_at: DateTime<Utc>,
}

/// A `(title, videoId)` pair for the global recent-summaries listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSummary {
    pub video_title: String,
    pub video_id: String,
}
