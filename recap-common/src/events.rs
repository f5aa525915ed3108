//! SSE event types delivered over per-user summary streams.

use serde_json::json;

use crate::types::SummaryResponse;

/// Terminal (and handshake) events sent to SSE subscribers.
///
/// Each job produces exactly one terminal event: `Complete` on success,
/// `Error` on failure. `Connected` is emitted once when a stream opens.
#[derive(Debug, Clone)]
pub enum SummaryEvent {
    Connected,
    Complete(SummaryResponse),
    Error { video_id: String, error: String },
}

impl SummaryEvent {
    /// SSE `event:` field name.
    pub fn name(&self) -> &'static str {
        match self {
            SummaryEvent::Connected => "connected",
            SummaryEvent::Complete(_) => "summary_complete",
            SummaryEvent::Error { .. } => "summary_error",
        }
    }

    /// SSE `data:` payload as a JSON value.
    pub fn data(&self) -> serde_json::Value {
        match self {
            SummaryEvent::Connected => json!({ "message": "stream established" }),
            SummaryEvent::Complete(resp) => {
                serde_json::to_value(resp).unwrap_or_else(|_| json!({}))
            }
            SummaryEvent::Error { video_id, error } => {
                json!({ "videoId": video_id, "error": error })
            }
        }
    }

    /// Format as a complete SSE frame (`event:`/`data:`/blank line).
    pub fn to_sse_string(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.data())
    }
}
