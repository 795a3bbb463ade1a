//! In-process room hub
//!
//! Fans JSON frames out to every joined client over a `tokio` broadcast
//! channel. Each member gets only frames for its room that it did not publish
//! itself.

use super::protocol::SyncEnvelope;
use super::SyncTransport;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Broadcast-backed [`SyncTransport`] for clients in one process
#[derive(Clone)]
pub struct LocalHub {
    frames: broadcast::Sender<String>,
    members: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl LocalHub {
    /// Create a hub buffering up to `capacity` frames per slow member
    pub fn new(capacity: usize) -> Self {
        let (frames, _) = broadcast::channel(capacity.max(1));
        Self {
            frames,
            members: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of joined clients across all rooms
    pub fn member_count(&self) -> usize {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new(256)
    }
}

fn member_key(room: &str, client_id: &str) -> String {
    format!("{room}/{client_id}")
}

impl SyncTransport for LocalHub {
    fn join(&self, room: &str, client_id: &str) -> Result<mpsc::UnboundedReceiver<SyncEnvelope>> {
        let mut frames = self.frames.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        let room_name = room.to_string();
        let me = client_id.to_string();

        let forward = tokio::spawn(async move {
            loop {
                match frames.recv().await {
                    Ok(frame) => match SyncEnvelope::from_json(&frame) {
                        Ok(envelope) if envelope.room == room_name && envelope.origin != me => {
                            if tx.send(envelope).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Dropping malformed sync frame"),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, room = %room_name, "Sync member lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let previous = self
            .members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(member_key(room, client_id), forward);
        if let Some(previous) = previous {
            previous.abort();
        }

        debug!(room, client_id, "Joined room");
        Ok(rx)
    }

    fn publish(&self, envelope: &SyncEnvelope) -> Result<()> {
        let frame = envelope.to_json()?;
        // No subscribers is not an error: the room is simply empty
        if self.frames.send(frame).is_err() {
            debug!(room = %envelope.room, "No peers to receive sync frame");
        }
        Ok(())
    }

    fn leave(&self, room: &str, client_id: &str) {
        let removed = self
            .members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&member_key(room, client_id));
        if let Some(task) = removed {
            task.abort();
            debug!(room, client_id, "Left room");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncEvent;

    fn envelope(room: &str, origin: &str, event: SyncEvent) -> SyncEnvelope {
        SyncEnvelope {
            room: room.into(),
            origin: origin.into(),
            event,
        }
    }

    #[tokio::test]
    async fn delivers_to_peers_in_room_only() {
        let hub = LocalHub::default();
        let mut a = hub.join("global", "a").unwrap();
        let mut b = hub.join("global", "b").unwrap();
        let mut other = hub.join("party", "c").unwrap();

        hub.publish(&envelope("global", "a", SyncEvent::Pause)).unwrap();

        let received = b.recv().await.unwrap();
        assert_eq!(received.event, SyncEvent::Pause);
        assert_eq!(received.origin, "a");

        // Sender and other rooms see nothing
        tokio::task::yield_now().await;
        assert!(a.try_recv().is_err());
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_stops_delivery() {
        let hub = LocalHub::default();
        let mut b = hub.join("global", "b").unwrap();
        assert_eq!(hub.member_count(), 1);

        hub.leave("global", "b");
        assert_eq!(hub.member_count(), 0);

        hub.publish(&envelope("global", "a", SyncEvent::Play)).unwrap();
        assert!(b.recv().await.is_none());
    }
}
