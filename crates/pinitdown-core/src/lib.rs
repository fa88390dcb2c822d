//! PinItDown core: notes pinned to map coordinates, kept on the device.
//!
//! - `store`, `storage`: the note collection and its key-value persistence
//! - `map`, `markers`, `view`: the map viewport and the two projections of
//!   the collection (marker layer and viewport list)
//! - `board`: command routing that keeps all of the above consistent
//! - `offline`: the installable asset cache for the application shell

pub mod board;
pub mod config;
pub mod error;
pub mod map;
pub mod markers;
pub mod models;
pub mod offline;
pub mod storage;
pub mod store;
pub mod utils;
pub mod view;

pub use board::{Command, Outcome, Pinboard};
pub use config::Config;
pub use error::{CacheError, FetchError, StoreError, ValidationError};
pub use map::{GeoBounds, LatLng, MapView};
pub use models::{Note, NoteForm};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::NoteStore;
