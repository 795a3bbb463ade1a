//! Soul Player - Playback Engine
//!
//! Client-side playback engine for Soul Player.
//!
//! This crate provides:
//! - Transport state machine (load, play, pause, seek, next, previous)
//! - Queue editing and session persistence
//! - Smart shuffle (history, artist, genre and liked weighting)
//! - Repeat modes (Off, All, One)
//! - Three-band equalizer and analysis tap
//! - Room-based transport sync between clients
//! - Liked tracks, recently played and other preferences
//!
//! # Architecture
//!
//! `soul-playback` is platform-agnostic:
//! - Audio output is provided via [`SoundFactory`], [`SoundInstance`] and
//!   [`OutputContext`]
//! - Persistence goes through [`soul_core::KeyValueStore`]
//! - The catalog goes through [`soul_core::CatalogClient`]
//! - Sync goes through [`SyncTransport`] ([`LocalHub`] for in-process rooms)
//!
//! All state is owned by one tokio task; [`EngineHandle`] is the only way in.
//!
//! # Example
//!
//! ```rust,ignore
//! use soul_playback::{Collaborators, Engine, PlaybackConfig};
//!
//! let engine = Engine::init(PlaybackConfig::load()?, Collaborators {
//!     catalog,
//!     store,
//!     sounds,
//!     output,
//!     sync: None,
//! })
//! .await?;
//!
//! let mut events = engine.subscribe();
//! engine.load_and_play(0, tracks).await?;
//! engine.set_volume(0.5).await?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

mod config;
mod controller;
mod engine;
mod error;
mod events;
pub mod graph;
mod history;
mod library;
pub mod preferences;
mod queue;
mod session;
mod shuffle;
mod sound;
pub mod sync;
pub mod types;
mod volume;

// Public exports
pub use config::{GraphConfig, PlaybackConfig, SessionSettings, ShuffleWeights, SyncSettings};
pub use controller::{Collaborators, LoadIntent, PlaybackController};
pub use engine::{Engine, EngineHandle, PlaybackCommand};
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use graph::{AnalysisTap, AudioGraphManager, FilterGains, GraphProcessor};
pub use history::{HistoryLog, PlayedEntry};
pub use library::LibraryCache;
pub use preferences::{Preferences, StoredPreferences};
pub use queue::{Queue, Removal};
pub use session::{SessionSnapshot, SessionStore};
pub use shuffle::SmartShuffle;
pub use sound::{
    EngineEvent, OutputContext, SoundEvent, SoundEventSender, SoundFactory, SoundInstance,
    SoundRequest,
};
pub use sync::{LocalHub, SyncChannel, SyncEnvelope, SyncEvent, SyncTransport};
pub use types::{PlaybackSnapshot, TransportStatus};
pub use volume::{FadeRamp, Volume};
