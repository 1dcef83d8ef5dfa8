use crate::access::UserIdentity;
use crate::error::SessionError;
use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

/// Outbound half of a session's transport.
pub type Outbound = Pin<Box<dyn Sink<Message, Error = axum::Error> + Send>>;

/// One live connection. Writes go through `sink`'s lock so frames from the
/// fan-out, the keep-alive and the init message never interleave.
pub struct Session {
    id: String,
    room_id: Option<String>,
    user: UserIdentity,
    created_at: Instant,
    sink: Mutex<Outbound>,
    write_timeout: Duration,
    closed: watch::Sender<bool>,
    /// Sequence number of the newest snapshot written so far.
    last_snapshot: AtomicU64,
}

impl Session {
    pub fn new(
        id: String,
        room_id: Option<String>,
        user: UserIdentity,
        sink: Outbound,
        write_timeout: Duration,
    ) -> Self {
        Self {
            id,
            room_id,
            user,
            created_at: Instant::now(),
            sink: Mutex::new(sink),
            write_timeout,
            closed: watch::Sender::new(false),
            last_snapshot: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Write a frame, waiting for any in-flight write to finish first.
    pub async fn send(&self, msg: Message) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let mut sink = self.sink.lock().await;
        self.write(&mut *sink, msg).await
    }

    /// Write snapshot number `seq` unless another write is in flight or a
    /// newer snapshot already went out. Returns false if the frame was skipped.
    pub async fn try_send_snapshot(&self, seq: u64, msg: Message) -> Result<bool, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let Ok(mut sink) = self.sink.try_lock() else {
            return Ok(false);
        };
        // Only read and written under the sink lock
        if seq <= self.last_snapshot.load(Ordering::Relaxed) {
            return Ok(false);
        }
        self.write(&mut *sink, msg).await?;
        self.last_snapshot.store(seq, Ordering::Relaxed);
        Ok(true)
    }

    async fn write(&self, sink: &mut Outbound, msg: Message) -> Result<(), SessionError> {
        match tokio::time::timeout(self.write_timeout, sink.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.close();
                Err(SessionError::Transport(e))
            }
            Err(_) => {
                self.close();
                Err(SessionError::WriteTimeout)
            }
        }
    }

    /// Mark the session closed. Its read loop observes this and runs cleanup.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Send a close frame and flush, bounded by the write timeout.
    pub async fn shutdown_transport(&self) {
        self.close();
        let mut sink = self.sink.lock().await;
        let _ = tokio::time::timeout(self.write_timeout, async {
            sink.send(Message::Close(None)).await?;
            sink.close().await?;
            Ok::<(), axum::Error>(())
        })
        .await;
    }
}
