//! yt-dlp extractor client.
//!
//! The extractor is an opaque child process: metadata arrives as a JSON
//! document on stdout, subtitles as `.vtt` files written into a temporary
//! directory that is removed when the call returns.

use std::process::Stdio;
use std::sync::LazyLock;

use recap_common::transcript::sort_by_start;
use recap_common::types::TranscriptItem;
use regex::Regex;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, warn};

use crate::services::vtt;

const YTDLP_COMMAND: &str = "yt-dlp";

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id regex"));

static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&?/]+)",
        r"youtube\.com/embed/([^/?]+)",
        r"youtube\.com/v/([^/?]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("url regex"))
    .collect()
});

/// Extractor failures. Messages stay free of child-process output; stderr
/// is logged, not surfaced to clients.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid video ID format")]
    InvalidVideoId,

    #[error("failed to launch {YTDLP_COMMAND}: {0}")]
    Spawn(std::io::Error),

    #[error("{YTDLP_COMMAND} exited with an error")]
    Failed,

    #[error("could not parse {YTDLP_COMMAND} output")]
    BadOutput,

    #[error("no subtitles were downloaded")]
    NoSubtitles,

    #[error("no usable transcript entries were found")]
    EmptyTranscript,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Basic metadata for a video.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub upload_date: String,
    pub duration_seconds: u64,
}

/// Extract the 11-character video id from a YouTube URL.
///
/// Accepts `watch?v=`, `youtu.be/`, `/embed/`, and `/v/` forms. The captured
/// id is validated strictly only at the process boundary, so cache lookups
/// for synthetic ids keep working.
pub fn video_id_from_url(url: &str) -> Option<String> {
    for pattern in URL_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(url) {
            if let Some(id) = captures.get(1) {
                return Some(id.as_str().to_string());
            }
        }
    }
    None
}

/// True iff `id` is a well-formed 11-character video id.
pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

/// yt-dlp invocation wrapper.
pub struct YtDlp {
    /// Preferred subtitle language list, e.g. `ko` or `ko,en`.
    subtitle_langs: String,
}

impl YtDlp {
    pub fn new(subtitle_langs: impl Into<String>) -> Self {
        Self {
            subtitle_langs: subtitle_langs.into(),
        }
    }

    /// Fetch video metadata via `--dump-json`.
    pub async fn video_info(&self, video_id: &str) -> Result<VideoInfo, ExtractorError> {
        if !is_valid_video_id(video_id) {
            return Err(ExtractorError::InvalidVideoId);
        }

        let url = watch_url(video_id);
        debug!(video_id, "fetching video metadata");

        let output = Command::new(YTDLP_COMMAND)
            .args(["--dump-json", "--no-playlist", "--skip-download", &url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(ExtractorError::Spawn)?;

        if !output.status.success() {
            error!(
                video_id,
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "metadata extraction failed"
            );
            return Err(ExtractorError::Failed);
        }

        let doc: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|_| ExtractorError::BadOutput)?;

        Ok(VideoInfo {
            id: video_id.to_string(),
            title: str_field(&doc, "title"),
            channel: str_field(&doc, "channel"),
            upload_date: str_field(&doc, "upload_date"),
            duration_seconds: duration_field(&doc),
        })
    }

    /// Download subtitles into a temp directory and parse every `.vtt` file
    /// found there into one sorted transcript.
    ///
    /// Manual subtitles are preferred, with auto-generated as fallback.
    pub async fn transcript(&self, video_id: &str) -> Result<Vec<TranscriptItem>, ExtractorError> {
        if !is_valid_video_id(video_id) {
            return Err(ExtractorError::InvalidVideoId);
        }

        let temp_dir = TempDir::with_prefix("yt-subtitles-")?;
        let url = watch_url(video_id);
        debug!(video_id, dir = %temp_dir.path().display(), "downloading subtitles");

        let output = Command::new(YTDLP_COMMAND)
            .args(["--write-sub", "--write-auto-sub"])
            .args(["--sub-langs", &self.subtitle_langs])
            .args(["--sub-format", "vtt", "--skip-download"])
            .arg("--paths")
            .arg(temp_dir.path())
            .args(["-o", "%(id)s.%(ext)s", &url])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(ExtractorError::Spawn)?;

        if !output.status.success() {
            error!(
                video_id,
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "subtitle download failed"
            );
            return Err(ExtractorError::Failed);
        }

        let mut items = Vec::new();
        let mut saw_vtt = false;

        for entry in std::fs::read_dir(temp_dir.path())? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "vtt") {
                continue;
            }
            saw_vtt = true;

            match std::fs::read_to_string(&path) {
                Ok(content) => items.extend(vtt::parse(&content)),
                Err(err) => {
                    warn!(video_id, file = %path.display(), %err, "skipping unreadable subtitle file");
                }
            }
        }

        if !saw_vtt {
            return Err(ExtractorError::NoSubtitles);
        }
        if items.is_empty() {
            return Err(ExtractorError::EmptyTranscript);
        }

        sort_by_start(&mut items);
        Ok(items)
    }
}

fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

fn str_field(doc: &serde_json::Value, key: &str) -> String {
    doc.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Duration arrives as a number or a numeric string depending on extractor
/// version.
fn duration_field(doc: &serde_json::Value) -> u64 {
    match doc.get("duration") {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0) as u64,
        Some(serde_json::Value::String(s)) => s.parse::<f64>().map(|f| f as u64).unwrap_or(0),
        _ => 0,
    }
}
