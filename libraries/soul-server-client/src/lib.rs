//! Soul Player Server Client
//!
//! HTTP catalog client for the Soul Player library API.
//!
//! # Endpoints
//!
//! - `GET /api/library/tracks`: every playable track
//! - `GET /api/library/albums`: album groupings (404 means none)
//! - `GET /api/library/tracks/{key}/stream`: short-lived signed URL
//!
//! [`SoulServerClient`] implements [`soul_core::CatalogClient`].

mod client;
mod error;
mod library;
mod types;

pub use client::SoulServerClient;
pub use error::{Result, ServerClientError};
pub use library::LibraryClient;
pub use types::{ServerAlbum, ServerConfig, ServerTrack, StreamUrlResponse};
