//! The event hub: one bounded outgoing channel per connected user.
//!
//! Workers are producers; the SSE handler for a user is the sole consumer.
//! At most one channel per user is registered at any instant: a new
//! registration displaces the previous one, which ends the old stream.
//! Sends never block: a full channel drops the frame with a warning.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use recap_common::events::SummaryEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;

struct Registration {
    id: u64,
    tx: mpsc::Sender<SummaryEvent>,
}

pub struct EventHub {
    channels: RwLock<HashMap<String, Registration>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a stream for `user_id`, displacing any prior one.
    ///
    /// Returns the registration id (used for identity-checked
    /// deregistration) and the receiving end of the channel. Dropping the
    /// displaced sender is what ends the superseded stream.
    pub fn register(&self, user_id: &str) -> (u64, mpsc::Receiver<SummaryEvent>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut channels = self.channels.write().expect("hub lock poisoned");
        if channels
            .insert(user_id.to_string(), Registration { id, tx })
            .is_some()
        {
            info!(user_id, "SSE stream replaced; prior channel closed");
        } else {
            info!(user_id, "SSE stream registered");
        }

        (id, rx)
    }

    /// Remove the registration for `user_id` only if it is still the one
    /// identified by `registration_id`; a stale disconnect must not tear
    /// down a replacement stream.
    pub fn deregister(&self, user_id: &str, registration_id: u64) {
        let mut channels = self.channels.write().expect("hub lock poisoned");
        match channels.get(user_id) {
            Some(registration) if registration.id == registration_id => {
                channels.remove(user_id);
                info!(user_id, "SSE stream deregistered");
            }
            _ => {
                debug!(user_id, "SSE stream already replaced; nothing to deregister");
            }
        }
    }

    /// Non-blocking send to `user_id`'s stream, if one is connected.
    pub fn send(&self, user_id: &str, event: SummaryEvent) {
        let tx = {
            let channels = self.channels.read().expect("hub lock poisoned");
            channels.get(user_id).map(|r| r.tx.clone())
        };

        let Some(tx) = tx else {
            debug!(user_id, event = event.name(), "no active SSE stream; event not sent");
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(user_id, event = event.name(), "SSE channel full; event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(user_id, event = event.name(), "SSE channel closed; event not sent");
            }
        }
    }

    /// Number of connected streams.
    pub fn connected(&self) -> usize {
        self.channels.read().expect("hub lock poisoned").len()
    }
}
