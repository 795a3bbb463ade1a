//! Host platform seams
//!
//! The engine never decodes audio itself. A [`SoundFactory`] supplied by the
//! host turns a resolved URL into a [`SoundInstance`], which reports its
//! lifecycle back as a small closed set of [`SoundEvent`]s over a channel.

use crate::error::Result;
use soul_core::TrackId;
use tokio::sync::mpsc;

/// Lifecycle events emitted by a sound instance
#[derive(Debug, Clone, PartialEq)]
pub enum SoundEvent {
    /// Source opened; duration in seconds is known
    Loaded { duration: f64 },
    /// Audio started running
    Started,
    /// Reached the end naturally
    Ended,
    /// Decode or network failure
    Errored(String),
}

/// Messages delivered to the engine task from asynchronous work
#[derive(Debug)]
pub enum EngineEvent {
    /// An indirect source finished resolving
    SourceResolved {
        generation: u64,
        result: std::result::Result<String, String>,
    },
    /// A sound instance reported progress
    Sound { generation: u64, event: SoundEvent },
}

/// Event sink handed to each sound instance
///
/// Tagged with the load generation, so events from a superseded instance are
/// recognised and dropped by the controller.
#[derive(Debug, Clone)]
pub struct SoundEventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl SoundEventSender {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event; silently ignored once the engine is gone
    pub fn send(&self, event: SoundEvent) {
        let _ = self.tx.send(EngineEvent::Sound {
            generation: self.generation,
            event,
        });
    }
}

/// Everything a factory needs to build one sound instance
#[derive(Debug, Clone)]
pub struct SoundRequest {
    pub track_id: TrackId,
    /// Resolved, directly playable URL
    pub url: String,
    /// Initial gain (0.0 = muted)
    pub volume: f32,
    pub events: SoundEventSender,
}

/// One live, platform-level playing resource
///
/// Exactly one exists at a time. The controller calls `stop` and `unload`
/// before dropping it.
pub trait SoundInstance: Send {
    /// Start or resume output
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Jump to an absolute position (seconds)
    fn seek(&mut self, seconds: f64);

    /// Linear gain, 0.0-1.0
    fn set_volume(&mut self, gain: f32);

    /// Current position (seconds)
    fn position(&self) -> f64;

    fn stop(&mut self);

    /// Release decode and network resources
    fn unload(&mut self);
}

/// Creates sound instances for resolved sources
pub trait SoundFactory: Send + Sync {
    /// Start opening `request.url`
    ///
    /// Loading is asynchronous: the instance reports `Loaded` or `Errored`
    /// through `request.events` later.
    fn create(&self, request: SoundRequest) -> Result<Box<dyn SoundInstance>>;
}

/// Platform audio output (the shared output context)
pub trait OutputContext: Send + Sync {
    /// Whether the platform has the output in a suspended power state
    fn is_suspended(&self) -> bool;

    /// Resume a suspended output
    fn resume(&self) -> Result<()>;

    /// Output sample rate (Hz)
    fn sample_rate(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = SoundEventSender::new(7, tx);
        sender.send(SoundEvent::Ended);

        match rx.try_recv().unwrap() {
            EngineEvent::Sound { generation, event } => {
                assert_eq!(generation, 7);
                assert_eq!(event, SoundEvent::Ended);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn sending_after_engine_drop_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        SoundEventSender::new(1, tx).send(SoundEvent::Started);
    }
}
