//! Transcript shaping: sorting, chunking for summarization, and merging
//! for display.

use crate::time::format_timestamp;
use crate::types::TranscriptItem;

/// Sort items ascending by start time.
pub fn sort_by_start(items: &mut [TranscriptItem]) {
    items.sort_by(|a, b| a.start.total_cmp(&b.start));
}

/// Group items into contiguous windows of roughly `window_seconds`.
///
/// A new chunk begins when the next item starts at least `window_seconds`
/// past the first item of the current chunk. Items must already be sorted.
pub fn chunk_transcript(items: &[TranscriptItem], window_seconds: f64) -> Vec<Vec<TranscriptItem>> {
    let mut chunks = Vec::new();
    let mut current: Vec<TranscriptItem> = Vec::new();
    let mut chunk_start = 0.0;

    for item in items {
        if current.is_empty() {
            chunk_start = item.start;
        }

        if item.start - chunk_start < window_seconds {
            current.push(item.clone());
        } else {
            chunks.push(std::mem::take(&mut current));
            chunk_start = item.start;
            current.push(item.clone());
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Coalesce consecutive items whose starts are within `interval_seconds`
/// into one denser item spanning from the first start to the last end.
///
/// Used for client display only; the stored transcript stays unmerged.
pub fn merge_transcript(items: &[TranscriptItem], interval_seconds: f64) -> Vec<TranscriptItem> {
    let mut iter = items.iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut result = Vec::new();
    let mut current = first.clone();

    for item in iter {
        if item.start - current.start < interval_seconds {
            current.text.push_str(&item.text);
            current.duration = item.start + item.duration - current.start;
        } else {
            result.push(std::mem::replace(&mut current, item.clone()));
        }
    }

    result.push(current);
    result
}

/// Format a chunk as `[MM:SS] text` lines for the LLM user message.
pub fn format_chunk(items: &[TranscriptItem]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&format_timestamp(item.start.max(0.0) as u32));
        out.push(' ');
        out.push_str(&item.text);
        out.push('\n');
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, start: f64, duration: f64) -> TranscriptItem {
        TranscriptItem {
            text: text.to_string(),
            start,
            duration,
        }
    }

    #[test]
    fn chunking_splits_on_window_boundary() {
        let items = vec![
            item("a", 0.0, 2.0),
            item("b", 100.0, 2.0),
            item("c", 400.0, 2.0),
            item("d", 450.0, 2.0),
            item("e", 900.0, 2.0),
        ];

        let chunks = chunk_transcript(&items, 400.0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[1].len(), 2);
        assert_eq!(chunks[2][0].text, "e");
    }

    #[test]
    fn chunking_empty_input() {
        assert!(chunk_transcript(&[], 400.0).is_empty());
    }

    #[test]
    fn merge_coalesces_close_items() {
        let items = vec![
            item("one ", 0.0, 5.0),
            item("two ", 10.0, 5.0),
            item("three", 30.0, 5.0),
        ];

        let merged = merge_transcript(&items, 15.0);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "one two ");
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[0].duration, 15.0);
        assert_eq!(merged[1].text, "three");
    }

    #[test]
    fn merge_keeps_order_non_decreasing() {
        let items = vec![
            item("a", 0.0, 1.0),
            item("b", 20.0, 1.0),
            item("c", 40.0, 1.0),
        ];
        let merged = merge_transcript(&items, 15.0);
        for pair in merged.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn format_chunk_uses_bracketed_timestamps() {
        let chunk = vec![item("hello", 61.0, 3.0), item("world", 65.0, 3.0)];
        let formatted = format_chunk(&chunk);
        assert_eq!(formatted, "[01:01] hello\n[01:05] world");
    }
}
