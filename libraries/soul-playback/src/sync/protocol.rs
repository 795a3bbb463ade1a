//! Sync wire protocol
//!
//! Frames are JSON envelopes:
//!
//! ```json
//! {"room": "global", "origin": "<client id>", "event": {"type": "seek", "time": 12.5}}
//! ```
//!
//! Events carry absolute state, so re-applying one is harmless and the last
//! write wins.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use soul_core::Track;

/// Transport event shared with peers in a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Play,
    Pause,
    /// Absolute position in seconds
    Seek { time: f64 },
    ChangeTrack { track: Track },
    /// Sent once after joining; peers answer with `State`
    RequestState,
    /// Current transport of the answering peer
    State {
        track: Track,
        time: f64,
        playing: bool,
    },
}

impl SyncEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek { .. } => "seek",
            Self::ChangeTrack { .. } => "change_track",
            Self::RequestState => "request_state",
            Self::State { .. } => "state",
        }
    }
}

/// One frame on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub room: String,
    /// Client id of the publisher
    pub origin: String,
    pub event: SyncEvent,
}

impl SyncEnvelope {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_frame_layout() {
        let envelope = SyncEnvelope {
            room: "global".into(),
            origin: "c1".into(),
            event: SyncEvent::Seek { time: 12.5 },
        };
        let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "room": "global",
                "origin": "c1",
                "event": {"type": "seek", "time": 12.5}
            })
        );
    }

    #[test]
    fn unit_events_are_tag_only() {
        assert_eq!(
            serde_json::to_value(SyncEvent::Pause).unwrap(),
            serde_json::json!({"type": "pause"})
        );
        assert_eq!(SyncEvent::RequestState.name(), "request_state");
    }

    #[test]
    fn change_track_carries_track() {
        let frame = r#"{"room":"r","origin":"o","event":{"type":"change_track","track":{
            "id":"t1","title":"Intro","artist":"A","album":null,"duration":10.0,
            "artwork":null,"source":{"kind":"direct","url":"memory://t1"},"genre":null}}}"#;

        let envelope = SyncEnvelope::from_json(frame).unwrap();
        match envelope.event {
            SyncEvent::ChangeTrack { track } => assert_eq!(track.id.as_str(), "t1"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(SyncEnvelope::from_json(r#"{"room":"r","origin":"o","event":{"type":"dance"}}"#)
            .is_err());
    }
}
