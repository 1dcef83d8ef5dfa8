//! Delivery of outbound frames to many sessions. Each recipient is written
//! from its own task so a slow socket only ever delays itself.

use crate::protocol::RoomEvent;
use crate::session::Session;
use axum::extract::ws::{Message, Utf8Bytes};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct Fanout {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    snapshot_seq: AtomicU64,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: Arc<Session>) {
        self.sessions
            .write()
            .insert(session.id().to_string(), session);
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.write().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Close one session's transport; its read loop does the cleanup.
    pub fn close(&self, id: &str) {
        if let Some(session) = self.get(id) {
            session.close();
        }
    }

    pub fn close_all(&self) {
        for session in self.sessions.read().values() {
            session.close();
        }
    }

    fn recipients(&self, room_id: Option<&str>) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .values()
            .filter(|s| !s.is_closed())
            .filter(|s| room_id.is_none() || s.room_id() == room_id)
            .cloned()
            .collect()
    }

    /// Push a snapshot frame to every open session. A session still busy
    /// with the previous frame skips this one, and a frame that loses the
    /// race to a newer one is dropped. Returns the recipient count.
    pub fn broadcast(&self, frame: Utf8Bytes) -> usize {
        let seq = self.snapshot_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let recipients = self.recipients(None);
        for session in &recipients {
            let session = session.clone();
            let frame = frame.clone();
            tokio::spawn(async move {
                match session.try_send_snapshot(seq, Message::Text(frame)).await {
                    Ok(true) => {}
                    Ok(false) => tracing::debug!("Session {} busy, frame skipped", session.id()),
                    Err(e) => tracing::warn!("Snapshot to {} failed: {}", session.id(), e),
                }
            });
        }
        recipients.len()
    }

    /// Send an event to the sessions attached to `room_id`. Unlike
    /// snapshots these are queued behind in-flight writes, never skipped.
    pub fn emit_to_room(
        &self,
        room_id: &str,
        event_type: &str,
        payload: serde_json::Value,
    ) -> usize {
        let event = RoomEvent {
            event_type: event_type.to_string(),
            room_id: room_id.to_string(),
            payload,
        };
        let frame: Utf8Bytes = match serde_json::to_string(&event) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!("Failed to encode room event: {}", e);
                return 0;
            }
        };

        let recipients = self.recipients(Some(room_id));
        for session in &recipients {
            let session = session.clone();
            let frame = frame.clone();
            tokio::spawn(async move {
                if let Err(e) = session.send(Message::Text(frame)).await {
                    tracing::warn!("Room event to {} failed: {}", session.id(), e);
                }
            });
        }
        tracing::debug!(
            "Emitted {} to {} sessions in room {}",
            event_type,
            recipients.len(),
            room_id
        );
        recipients.len()
    }
}
