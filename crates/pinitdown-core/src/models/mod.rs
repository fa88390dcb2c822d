//! Data models for pinned notes.
//!
//! - `Note`: the persisted record, stored as camelCase JSON
//! - `NoteForm`: the editable form state, coordinates kept as typed text
//! - `NoteDraft`: a validated form ready to be written into the collection

pub mod note;

pub use note::{Note, NoteDraft, NoteForm};
