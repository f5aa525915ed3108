//! Two-tier summary cache: in-memory map mirrored one-file-per-entry on
//! disk.
//!
//! Disk is best-effort durability. A failed write keeps the in-memory
//! entry but the error propagates to the caller; corrupt files on load
//! are skipped, never fatal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use chrono::Utc;
use recap_common::types::{CachedSummary, RecentSummary, Timestamp, TranscriptItem};
use recap_common::{Error, Result};
use tracing::{debug, info, warn};

pub struct SummaryCache {
    cache_dir: PathBuf,
    items: RwLock<HashMap<String, CachedSummary>>,
}

impl SummaryCache {
    /// Open the cache, creating `cache_dir` if missing and loading every
    /// parseable `.json` entry from it.
    pub fn open(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;

        let mut items = HashMap::new();
        for entry in std::fs::read_dir(&cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            match load_entry(&path) {
                Ok(item) => {
                    items.insert(item.video_id.clone(), item);
                }
                Err(err) => {
                    warn!(file = %path.display(), %err, "skipping unreadable cache file");
                }
            }
        }

        info!(entries = items.len(), dir = %cache_dir.display(), "summary cache loaded");

        Ok(Self {
            cache_dir,
            items: RwLock::new(items),
        })
    }

    /// O(1) in-memory lookup.
    pub fn get(&self, video_id: &str) -> Option<CachedSummary> {
        self.items
            .read()
            .expect("cache lock poisoned")
            .get(video_id)
            .cloned()
    }

    /// Insert or replace an entry in memory and write its file.
    ///
    /// The in-memory entry is kept even when the file write fails; the
    /// error still propagates so callers can log the degradation.
    pub fn set(
        &self,
        video_id: &str,
        title: &str,
        summary: &str,
        timestamps: Option<Vec<Timestamp>>,
        transcript: Vec<TranscriptItem>,
    ) -> Result<()> {
        let item = CachedSummary {
            video_id: video_id.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            timestamps,
            transcript,
            created_at: Utc::now(),
        };

        let mut items = self.items.write().expect("cache lock poisoned");
        items.insert(video_id.to_string(), item.clone());

        let path = self.entry_path(video_id);
        let json = serde_json::to_vec_pretty(&item)?;
        std::fs::write(&path, json)?;
        debug!(video_id, file = %path.display(), "cache entry persisted");
        Ok(())
    }

    /// Remove an entry from memory and disk. Absent entries are a no-op.
    pub fn delete(&self, video_id: &str) -> Result<()> {
        let mut items = self.items.write().expect("cache lock poisoned");
        if items.remove(video_id).is_none() {
            return Ok(());
        }

        match std::fs::remove_file(self.entry_path(video_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Drop every entry. File removal failures are logged and skipped.
    pub fn clear(&self) -> Result<()> {
        let mut items = self.items.write().expect("cache lock poisoned");
        items.clear();

        for entry in std::fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Err(err) = std::fs::remove_file(&path) {
                warn!(file = %path.display(), %err, "failed to remove cache file");
            }
        }
        Ok(())
    }

    /// Up to `n` `(title, videoId)` pairs, newest files first.
    pub fn recent_titles(&self, n: usize) -> Vec<RecentSummary> {
        let mut files: Vec<(PathBuf, SystemTime)> = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|p| {
                    let modified = std::fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                    Some((p, modified))
                })
                .collect(),
            Err(err) => {
                warn!(%err, "failed to list cache directory");
                return Vec::new();
            }
        };

        files.sort_by(|a, b| b.1.cmp(&a.1));
        files.truncate(n);

        files
            .iter()
            .filter_map(|(path, _)| load_entry(path).ok())
            .map(|item| RecentSummary {
                video_title: item.title,
                video_id: item.video_id,
            })
            .collect()
    }

    fn entry_path(&self, video_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{video_id}.json"))
    }
}

fn load_entry(path: &Path) -> Result<CachedSummary> {
    let content = std::fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_cache(dir: &TempDir) -> SummaryCache {
        let cache = SummaryCache::open(dir.path()).unwrap();
        cache
            .set("video0000001", "Title One", "Summary one.", None, vec![])
            .unwrap();
        cache
    }

    #[test]
    fn set_then_get() {
        let dir = TempDir::new().unwrap();
        let cache = seeded_cache(&dir);

        let entry = cache.get("video0000001").unwrap();
        assert_eq!(entry.title, "Title One");
        assert!(dir.path().join("video0000001.json").exists());
    }

    #[test]
    fn miss_returns_none() {
        let dir = TempDir::new().unwrap();
        let cache = seeded_cache(&dir);
        assert!(cache.get("absent000000").is_none());
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        seeded_cache(&dir);

        let reopened = SummaryCache::open(dir.path()).unwrap();
        assert_eq!(reopened.get("video0000001").unwrap().summary, "Summary one.");
    }

    #[test]
    fn corrupt_file_is_skipped_on_load() {
        let dir = TempDir::new().unwrap();
        seeded_cache(&dir);
        std::fs::write(dir.path().join("broken00000.json"), b"{ not json").unwrap();

        let reopened = SummaryCache::open(dir.path()).unwrap();
        assert!(reopened.get("video0000001").is_some());
        assert!(reopened.get("broken00000").is_none());
    }

    #[test]
    fn delete_removes_memory_and_file() {
        let dir = TempDir::new().unwrap();
        let cache = seeded_cache(&dir);

        cache.delete("video0000001").unwrap();
        assert!(cache.get("video0000001").is_none());
        assert!(!dir.path().join("video0000001.json").exists());

        // Deleting again is a no-op.
        cache.delete("video0000001").unwrap();
    }

    #[test]
    fn clear_empties_everything() {
        let dir = TempDir::new().unwrap();
        let cache = seeded_cache(&dir);
        cache
            .set("video0000002", "Title Two", "Summary two.", None, vec![])
            .unwrap();

        cache.clear().unwrap();
        assert!(cache.get("video0000001").is_none());
        assert!(cache.recent_titles(10).is_empty());
    }

    #[test]
    fn recent_titles_returns_newest_first() {
        let dir = TempDir::new().unwrap();
        let cache = SummaryCache::open(dir.path()).unwrap();

        cache.set("video00000a1", "Older", "s", None, vec![]).unwrap();
        // Ensure a distinct mtime for ordering.
        std::thread::sleep(std::time::Duration::from_millis(20));
        cache.set("video00000b2", "Newer", "s", None, vec![]).unwrap();

        let recent = cache.recent_titles(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].video_title, "Newer");

        let limited = cache.recent_titles(1);
        assert_eq!(limited.len(), 1);
    }
}
