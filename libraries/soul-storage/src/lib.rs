//! Soul Player Storage
//!
//! Durable key-value storage for playback preferences and the session
//! snapshot.
//!
//! # Architecture
//!
//! - **`RedbStore`**: embedded database file, one committed transaction per write
//! - **`MemoryStore`**: volatile map for tests and throwaway sessions
//!
//! Both implement [`soul_core::KeyValueStore`], which is all the playback
//! engine depends on.
//!
//! # Example
//!
//! ```rust,no_run
//! use soul_core::KeyValueStore;
//! use soul_storage::RedbStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedbStore::open("soul-playback.redb")?;
//! store.set("ui.theme", "\"dark\"")?;
//! assert_eq!(store.get("ui.theme")?.as_deref(), Some("\"dark\""));
//! # Ok(())
//! # }
//! ```

mod database;
mod error;
mod memory;

pub use database::RedbStore;
pub use error::{Result, StorageError};
pub use memory::MemoryStore;
