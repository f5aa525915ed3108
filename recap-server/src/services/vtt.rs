//! WebVTT subtitle parsing.
//!
//! Turns raw `.vtt` content into [`TranscriptItem`]s: cue timing lines are
//! split on `-->`, inline timing/class tags and bracketed artifacts are
//! stripped, and cues that end up empty are dropped.

use std::sync::LazyLock;

use recap_common::types::TranscriptItem;
use regex::Regex;

static INLINE_TIMING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\d{2}:\d{2}:\d{2}\.\d{3}>").expect("inline timing regex"));
static CLASS_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?c[^>]*>").expect("class tag regex"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag regex"));
static ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]|\(.*?\)|\{.*?\}").expect("artifact regex"));
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space regex"));

/// Parse a WebVTT document into transcript items.
///
/// Returns an empty list for content without a `WEBVTT` header. Items come
/// out in document order; the caller sorts after unioning files.
pub fn parse(content: &str) -> Vec<TranscriptItem> {
    let mut lines = content.lines();
    match lines.next() {
        Some(header) if header.contains("WEBVTT") => {}
        _ => return Vec::new(),
    }

    let mut items = Vec::new();
    let mut text = String::new();
    let mut start = 0.0;
    let mut end = 0.0;
    let mut seen_cue = false;

    let flush = |text: &mut String, start: f64, end: f64, items: &mut Vec<TranscriptItem>| {
        if text.is_empty() {
            return;
        }
        let cleaned = clean_cue_text(text);
        if !cleaned.is_empty() {
            items.push(TranscriptItem {
                text: cleaned,
                start,
                duration: (end - start).max(0.0),
            });
        }
        text.clear();
    };

    for line in lines {
        if line.contains("-->") {
            seen_cue = true;
            flush(&mut text, start, end, &mut items);

            let mut cue_times = line.split("-->");
            let (Some(raw_start), Some(raw_end)) = (cue_times.next(), cue_times.next()) else {
                continue;
            };
            start = parse_cue_timestamp(raw_start.trim());
            // Trailing cue settings (align:, position:) follow the end time.
            let raw_end = raw_end.trim().split_whitespace().next().unwrap_or("");
            end = parse_cue_timestamp(raw_end);
            continue;
        }

        // Header metadata, cue settings, and blank separators carry no text.
        if !seen_cue || line.contains("align:") || line.contains("position:") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let cleaned = strip_inline_tags(line);
        if !cleaned.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&cleaned);
        }
    }

    flush(&mut text, start, end, &mut items);
    items
}

/// Remove inline `<MM:SS.mmm>` timing tags and `<c>` class tags.
fn strip_inline_tags(line: &str) -> String {
    let cleaned = INLINE_TIMING_TAG.replace_all(line, "");
    let cleaned = CLASS_TAG.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Remove HTML tags, bracketed artifacts, and collapse whitespace.
fn clean_cue_text(text: &str) -> String {
    let cleaned = HTML_TAG.replace_all(text, "");
    let cleaned = ARTIFACT.replace_all(&cleaned, "");
    let cleaned = MULTI_SPACE.replace_all(&cleaned, " ");
    cleaned.trim().to_string()
}

/// Parse a `HH:MM:SS.mmm` cue timestamp into seconds.
fn parse_cue_timestamp(timestamp: &str) -> f64 {
    let parts: Vec<&str> = timestamp.split(':').collect();
    if parts.len() != 3 {
        return 0.0;
    }

    let (Some((secs, millis)), Ok(hours), Ok(minutes)) = (
        parts[2].split_once('.'),
        parts[0].parse::<u64>(),
        parts[1].parse::<u64>(),
    ) else {
        return 0.0;
    };

    let (Ok(secs), Ok(millis)) = (secs.parse::<u64>(), millis.parse::<u64>()) else {
        return 0.0;
    };

    (hours * 3600 + minutes * 60 + secs) as f64 + millis as f64 / 1000.0
}
