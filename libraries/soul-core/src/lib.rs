//! Soul Player Core
//!
//! Platform-agnostic domain types, collaborator traits, and error handling
//! shared by the playback engine and its host integrations.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Album`, `RepeatMode`, `EqualizerSettings`
//! - **Collaborator Traits**: `CatalogClient` (library API), `KeyValueStore` (durable preferences)
//! - **Error Handling**: Unified `SoulError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use soul_core::types::{SourceRef, Track, TrackId};
//!
//! let track = Track::new("t1", "Intro", "Artist A")
//!     .with_duration(181.5)
//!     .with_source(SourceRef::indirect("storage/t1.flac"));
//!
//! assert_eq!(track.id, TrackId::new("t1"));
//! assert!(track.source.needs_resolution());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SoulError};
pub use traits::{CatalogClient, KeyValueStore};

pub use types::{
    Album, AlbumId, EqualizerSettings, RepeatMode, SignedUrl, SourceRef, Track, TrackId,
};
