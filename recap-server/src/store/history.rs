//! Per-user viewing history, one JSON file per user.
//!
//! Each mutation reads the user's file, rewrites it, and releases the
//! process-wide lock; last-writer-wins is acceptable here.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use recap_common::types::{UserHistoryFile, UserSummary};
use recap_common::{Error, Result};
use tracing::debug;

pub const DEFAULT_RECENT_LIMIT: usize = 15;

pub struct UserHistory {
    users_dir: PathBuf,
    max_entries: usize,
    lock: RwLock<()>,
}

impl UserHistory {
    /// Open the store, creating `users_dir` if missing.
    pub fn open(users_dir: impl Into<PathBuf>, max_entries: usize) -> Result<Self> {
        let users_dir = users_dir.into();
        std::fs::create_dir_all(&users_dir)?;
        Ok(Self {
            users_dir,
            max_entries,
            lock: RwLock::new(()),
        })
    }

    /// Record that `user_id` viewed `video_id`.
    ///
    /// Any prior entry for the same video is replaced, the new entry
    /// becomes the most recent, and the oldest entries are evicted above
    /// the size bound.
    pub fn add(&self, user_id: &str, video_id: &str, video_title: &str) -> Result<()> {
        if user_id.is_empty() || video_id.is_empty() {
            return Err(Error::InvalidInput(
                "user ID and video ID are required".to_string(),
            ));
        }

        let _guard = self.lock.write().expect("history lock poisoned");

        let path = self.user_path(user_id);
        let mut file = load_or_default(&path, user_id)?;

        file.summaries.retain(|entry| entry.video_id != video_id);
        file.summaries.push(UserSummary {
            video_id: video_id.to_string(),
            video_title: video_title.to_string(),
            viewed_at: Utc::now(),
        });

        // Oldest first so eviction drops from the front.
        file.summaries
            .sort_by(|a, b| a.viewed_at.cmp(&b.viewed_at));
        if file.summaries.len() > self.max_entries {
            let excess = file.summaries.len() - self.max_entries;
            file.summaries.drain(..excess);
        }
        file.updated_at = Utc::now();

        std::fs::write(&path, serde_json::to_vec_pretty(&file)?)?;
        debug!(user_id, video_id, entries = file.summaries.len(), "history updated");
        Ok(())
    }

    /// The user's most recent entries, newest first, truncated to `limit`.
    pub fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<UserSummary>> {
        if user_id.is_empty() {
            return Err(Error::InvalidInput("user ID is required".to_string()));
        }

        let _guard = self.lock.read().expect("history lock poisoned");

        let path = self.user_path(user_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut file = load(&path)?;
        file.summaries
            .sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
        file.summaries.truncate(limit);
        Ok(file.summaries)
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        self.users_dir.join(format!("{user_id}.json"))
    }
}

fn load(path: &Path) -> Result<UserHistoryFile> {
    let content = std::fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}

fn load_or_default(path: &Path, user_id: &str) -> Result<UserHistoryFile> {
    if path.exists() {
        load(path)
    } else {
        Ok(UserHistoryFile {
            user_id: user_id.to_string(),
            summaries: Vec::new(),
            updated_at: Utc::now(),
        })
    }
}
