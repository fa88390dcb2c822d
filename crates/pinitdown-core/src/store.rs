//! The note collection and its persistence.
//!
//! `NoteStore` owns the in-memory collection in insertion order and mirrors
//! it to a `KeyValueStore` under a single key. Every mutation rewrites the
//! whole serialized collection.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::map::GeoBounds;
use crate::models::{Note, NoteForm};
use crate::storage::KeyValueStore;

/// Key the note collection is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "PinItDown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(String),
    Updated(String),
    /// The form referenced an id that is no longer in the collection.
    Missing(String),
}

pub struct NoteStore<K: KeyValueStore> {
    storage: K,
    key: String,
    notes: Vec<Note>,
}

impl<K: KeyValueStore> NoteStore<K> {
    /// An empty store; call `load` to read persisted notes.
    pub fn new(storage: K, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            notes: Vec::new(),
        }
    }

    pub fn open(storage: K, key: impl Into<String>) -> Result<Self> {
        let mut store = Self::new(storage, key);
        store.load()?;
        Ok(store)
    }

    /// Replace the collection with the persisted one. A missing key means
    /// no notes yet; a malformed value is an error and leaves the
    /// in-memory collection untouched.
    pub fn load(&mut self) -> Result<usize> {
        match self.storage.get(&self.key)? {
            Some(raw) => {
                let notes: Vec<Note> = serde_json::from_str(&raw).map_err(StoreError::Corrupt)?;
                info!(count = notes.len(), key = %self.key, "Notes loaded from storage");
                self.notes = notes;
            }
            None => {
                info!(key = %self.key, "No stored notes, starting empty");
                self.notes.clear();
            }
        }
        Ok(self.notes.len())
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn storage(&self) -> &K {
        &self.storage
    }

    /// Create or update from the form. Invalid forms are rejected before
    /// anything is mutated or written.
    pub fn save(&mut self, form: &NoteForm) -> Result<SaveOutcome> {
        let draft = form.validate()?;

        let outcome = match form.editing_id() {
            Some(id) => match self.notes.iter_mut().find(|n| n.id == id) {
                Some(note) => {
                    note.apply(draft);
                    debug!(id, "Note updated");
                    SaveOutcome::Updated(id.to_string())
                }
                None => {
                    warn!(id, "Form references a note that no longer exists");
                    SaveOutcome::Missing(id.to_string())
                }
            },
            None => {
                let note = Note {
                    id: self.next_id(),
                    title: draft.title,
                    content: draft.content,
                    lat: draft.position.lat,
                    lng: draft.position.lng,
                    created_at: Utc::now(),
                };
                debug!(id = %note.id, title = %note.title, "Note created");
                let id = note.id.clone();
                self.notes.push(note);
                SaveOutcome::Created(id)
            }
        };

        self.persist()?;
        Ok(outcome)
    }

    /// Remove a note. Unknown ids are a no-op and nothing is written.
    pub fn delete(&mut self, id: &str) -> Result<Option<Note>> {
        let Some(index) = self.notes.iter().position(|n| n.id == id) else {
            debug!(id, "Delete of unknown note ignored");
            return Ok(None);
        };
        let removed = self.notes.remove(index);
        self.persist()?;
        debug!(id, title = %removed.title, "Note deleted");
        Ok(Some(removed))
    }

    /// Notes inside the bounds, in collection order.
    pub fn in_bounds(&self, bounds: &GeoBounds) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.has_position() && bounds.contains(n.position()))
            .collect()
    }

    fn persist(&mut self) -> Result<()> {
        let raw = serde_json::to_string(&self.notes).map_err(StoreError::Serialize)?;
        self.storage.set(&self.key, &raw)?;
        debug!(count = self.notes.len(), "Notes saved to storage");
        Ok(())
    }

    /// Epoch milliseconds, bumped past the largest existing id so two saves
    /// in the same millisecond still get distinct, increasing ids. A stored
    /// id at `u64::MAX` cannot be passed, so only uniqueness holds then.
    fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut next = self
            .notes
            .iter()
            .filter_map(|n| n.id.parse::<u64>().ok())
            .max()
            .and_then(|max| max.checked_add(1))
            .map_or(now, |after| now.max(after));
        while self.get(&next.to_string()).is_some() {
            next = next.wrapping_add(1);
        }
        next.to_string()
    }
}
