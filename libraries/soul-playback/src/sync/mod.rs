//! Sync channel
//!
//! Mirrors local transport actions to other clients in the same room and
//! receives theirs. While a remote event is being applied, the echo
//! suppression flag is set and local publishes are dropped, so peers never
//! bounce an event back and forth.

mod hub;
mod protocol;

pub use hub::LocalHub;
pub use protocol::{SyncEnvelope, SyncEvent};

use crate::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Room-scoped pub/sub transport
pub trait SyncTransport: Send + Sync {
    /// Join `room`; the receiver yields frames from other clients in it
    fn join(&self, room: &str, client_id: &str) -> Result<mpsc::UnboundedReceiver<SyncEnvelope>>;

    fn publish(&self, envelope: &SyncEnvelope) -> Result<()>;

    fn leave(&self, room: &str, client_id: &str);
}

/// One client's membership in a sync room
pub struct SyncChannel {
    transport: Arc<dyn SyncTransport>,
    room: String,
    client_id: String,
    joined: bool,
    applying_remote: bool,
}

impl SyncChannel {
    pub fn new(transport: Arc<dyn SyncTransport>, room: impl Into<String>) -> Self {
        Self {
            transport,
            room: room.into(),
            client_id: Uuid::new_v4().to_string(),
            joined: false,
            applying_remote: false,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Join the room
    pub fn connect(&mut self) -> Result<mpsc::UnboundedReceiver<SyncEnvelope>> {
        let rx = self.transport.join(&self.room, &self.client_id)?;
        self.joined = true;
        info!(room = %self.room, client_id = %self.client_id, "Joined sync room");
        Ok(rx)
    }

    /// Ask peers for their current transport
    pub fn request_state(&self) {
        self.send(SyncEvent::RequestState);
    }

    /// Publish a local action
    ///
    /// Returns `false` when the event was suppressed because a remote event
    /// is being applied.
    pub fn publish(&self, event: SyncEvent) -> bool {
        if self.applying_remote {
            debug!(event = event.name(), "Suppressed sync echo");
            return false;
        }
        self.send(event);
        true
    }

    /// Publish regardless of echo suppression (answers to `request_state`)
    pub fn publish_reply(&self, event: SyncEvent) {
        self.send(event);
    }

    /// Set the echo suppression flag
    pub fn begin_remote(&mut self) {
        self.applying_remote = true;
    }

    /// Clear the echo suppression flag
    pub fn end_remote(&mut self) {
        self.applying_remote = false;
    }

    pub fn is_applying_remote(&self) -> bool {
        self.applying_remote
    }

    pub fn leave(&mut self) {
        if self.joined {
            self.transport.leave(&self.room, &self.client_id);
            self.joined = false;
            info!(room = %self.room, "Left sync room");
        }
    }

    fn send(&self, event: SyncEvent) {
        if !self.joined {
            return;
        }
        let name = event.name();
        let envelope = SyncEnvelope {
            room: self.room.clone(),
            origin: self.client_id.clone(),
            event,
        };
        match self.transport.publish(&envelope) {
            Ok(()) => debug!(event = name, room = %self.room, "Published sync event"),
            Err(e) => warn!(event = name, error = %e, "Failed to publish sync event"),
        }
    }
}
