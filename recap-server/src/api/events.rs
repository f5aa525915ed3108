//! Per-user SSE stream handler.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use recap_common::events::SummaryEvent;
use tracing::{debug, info};

use crate::api::summary::authenticate;
use crate::server::AppState;
use crate::sse::EventHub;

/// GET /api/summary/events
///
/// Registers a bounded channel for the caller (displacing any prior
/// stream), emits a `connected` handshake, then relays terminal events
/// until the channel closes or the client goes away. Deregistration is
/// identity-checked so a stale disconnect never tears down a replacement
/// stream.
pub async fn summary_events(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match authenticate(&state, &headers) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    info!(user_id = %user.id, "SSE client connected");
    let (registration_id, mut rx) = state.hub.register(&user.id);
    let guard = StreamGuard {
        hub: Arc::clone(&state.hub),
        user_id: user.id.clone(),
        registration_id,
    };

    let stream = async_stream::stream! {
        // Moved into the generator so it is dropped (and deregisters)
        // whether the stream ends or the client disconnects mid-await.
        let _guard = guard;

        yield Ok::<Event, Infallible>(to_sse_event(&SummaryEvent::Connected));

        while let Some(event) = rx.recv().await {
            yield Ok(to_sse_event(&event));
        }
        // Channel closed: displaced by a newer stream or hub shutdown.
    };

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
        .into_response()
}

fn to_sse_event(event: &SummaryEvent) -> Event {
    let data = serde_json::to_string(&event.data()).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.name()).data(data)
}

struct StreamGuard {
    hub: Arc<EventHub>,
    user_id: String,
    registration_id: u64,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        debug!(user_id = %self.user_id, "SSE stream closing");
        self.hub.deregister(&self.user_id, self.registration_id);
    }
}
