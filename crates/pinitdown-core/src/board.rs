//! Command routing for the note side.
//!
//! `Pinboard` owns the note store, the form, the map view and both view
//! projections. Every user or map event goes through `dispatch`, which
//! leaves the marker layer and the viewport list consistent with the
//! collection.

use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::map::{LatLng, MapView, FOCUS_ZOOM};
use crate::markers::MarkerRegistry;
use crate::models::NoteForm;
use crate::storage::KeyValueStore;
use crate::store::{NoteStore, SaveOutcome};
use crate::view::ViewportList;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Create or update from the current form.
    Save,
    /// Reset the form.
    Clear,
    /// Ask to delete a note; nothing changes until `ConfirmDelete`.
    RequestDelete(String),
    ConfirmDelete,
    CancelDelete,
    /// Load a note into the form and zoom to it.
    Edit(String),
    /// A note's marker was clicked: load it and centre on it.
    SelectMarker(String),
    /// Start a new note at the clicked location.
    MapClick(LatLng),
    /// The map was panned or zoomed.
    ViewportChanged,
    /// Result of the location lookup.
    LocationResolved(Option<LatLng>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Updated,
    /// A message the user has to acknowledge; nothing was changed.
    Prompt(String),
    /// Confirmation needed before the delete goes ahead.
    ConfirmDelete { id: String, title: Option<String> },
    Ignored,
}

pub struct Pinboard<K: KeyValueStore> {
    store: NoteStore<K>,
    form: NoteForm,
    map: MapView,
    markers: MarkerRegistry,
    list: ViewportList,
    pending_delete: Option<String>,
}

impl<K: KeyValueStore> Pinboard<K> {
    pub fn new(store: NoteStore<K>, map: MapView) -> Self {
        let mut board = Self {
            store,
            form: NoteForm::default(),
            map,
            markers: MarkerRegistry::new(),
            list: ViewportList::default(),
            pending_delete: None,
        };
        board.render_markers();
        board.render_list();
        board
    }

    pub fn store(&self) -> &NoteStore<K> {
        &self.store
    }

    pub fn form(&self) -> &NoteForm {
        &self.form
    }

    /// Text entry goes straight into the form.
    pub fn form_mut(&mut self) -> &mut NoteForm {
        &mut self.form
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    /// Move or resize the map; follow up with `Command::ViewportChanged`.
    pub fn map_mut(&mut self) -> &mut MapView {
        &mut self.map
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub fn list(&self) -> &ViewportList {
        &self.list
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        debug!(?command, "Dispatching");
        match command {
            Command::Save => self.save(),
            Command::Clear => {
                self.clear_form();
                Ok(Outcome::Updated)
            }
            Command::RequestDelete(id) => {
                let title = self.store.get(&id).map(|n| n.title.clone());
                self.pending_delete = Some(id.clone());
                Ok(Outcome::ConfirmDelete { id, title })
            }
            Command::ConfirmDelete => self.confirm_delete(),
            Command::CancelDelete => {
                self.pending_delete = None;
                Ok(Outcome::Ignored)
            }
            Command::Edit(id) => {
                let zoom = self.map.zoom().max(FOCUS_ZOOM);
                Ok(self.load_into_form(&id, zoom))
            }
            Command::SelectMarker(id) => {
                let zoom = self.map.zoom();
                Ok(self.load_into_form(&id, zoom))
            }
            Command::MapClick(at) => {
                self.clear_form();
                self.form.set_location(at);
                self.markers.place_transient(at);
                debug!(lat = at.lat, lng = at.lng, "Form reset for new note");
                Ok(Outcome::Updated)
            }
            Command::ViewportChanged => {
                self.render_list();
                Ok(Outcome::Updated)
            }
            Command::LocationResolved(Some(at)) => {
                let zoom = self.map.zoom();
                self.map.set_view(at, zoom);
                self.markers.set_location(at);
                self.render_list();
                info!(lat = at.lat, lng = at.lng, "Centred on current location");
                Ok(Outcome::Updated)
            }
            Command::LocationResolved(None) => {
                warn!("Could not get user location, keeping the default view");
                Ok(Outcome::Ignored)
            }
        }
    }

    fn save(&mut self) -> Result<Outcome> {
        match self.store.save(&self.form) {
            Ok(outcome) => {
                match &outcome {
                    SaveOutcome::Created(id) => info!(id = %id, "New note added"),
                    SaveOutcome::Updated(id) => info!(id = %id, "Note updated"),
                    SaveOutcome::Missing(id) => warn!(id = %id, "Edited note was already gone"),
                }
                self.refresh();
                self.clear_form();
                Ok(Outcome::Updated)
            }
            Err(StoreError::Invalid(reason)) => Ok(Outcome::Prompt(reason.to_string())),
            Err(e) => {
                // The collection may already be changed in memory
                self.refresh();
                Err(e)
            }
        }
    }

    fn confirm_delete(&mut self) -> Result<Outcome> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(Outcome::Ignored);
        };

        let removed = self.store.delete(&id);
        self.refresh();
        match removed? {
            Some(note) => {
                if self.form.editing_id() == Some(id.as_str()) {
                    self.clear_form();
                }
                info!(title = %note.title, "Note deleted");
                Ok(Outcome::Updated)
            }
            None => Ok(Outcome::Ignored),
        }
    }

    fn load_into_form(&mut self, id: &str, zoom: u8) -> Outcome {
        let Some(note) = self.store.get(id) else {
            warn!(id, "No such note");
            return Outcome::Ignored;
        };
        self.form = NoteForm::from_note(note);
        self.map.set_view(note.position(), zoom);
        self.markers.clear_transient();
        self.render_list();
        debug!(id, "Form populated with note");
        Outcome::Updated
    }

    fn clear_form(&mut self) {
        self.form = NoteForm::default();
        self.markers.clear_transient();
    }

    fn refresh(&mut self) {
        self.render_markers();
        self.render_list();
    }

    fn render_markers(&mut self) {
        self.markers.render_notes(self.store.notes());
    }

    fn render_list(&mut self) {
        self.list = ViewportList::build(self.store.notes(), &self.map.bounds());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::markers::MarkerKind;
    use crate::storage::MemoryKeyValueStore;
    use crate::store::DEFAULT_STORAGE_KEY;

    const TOMSK: LatLng = LatLng::new(56.4884, 84.948);

    fn board() -> Pinboard<MemoryKeyValueStore> {
        let store = NoteStore::open(MemoryKeyValueStore::new(), DEFAULT_STORAGE_KEY).unwrap();
        Pinboard::new(store, MapView::new(TOMSK, 13))
    }

    fn add_note(board: &mut Pinboard<MemoryKeyValueStore>, title: &str, at: LatLng) -> String {
        board.dispatch(Command::MapClick(at)).unwrap();
        board.form_mut().title = title.to_string();
        board.form_mut().content = format!("{} content", title);
        assert_eq!(board.dispatch(Command::Save).unwrap(), Outcome::Updated);
        board.store().notes().last().unwrap().id.clone()
    }

    fn assert_list_within_bounds(board: &Pinboard<MemoryKeyValueStore>) {
        let list = board.list();
        assert!(list.in_view() <= list.total);
        assert_eq!(list.total, board.store().len());
        let bounds = board.map().bounds();
        for entry in &list.entries {
            let note = board.store().get(&entry.id).unwrap();
            assert!(bounds.contains(note.position()));
        }
    }

    #[test]
    fn test_map_click_prepares_form_and_single_transient() {
        let mut board = board();
        board.form_mut().title = "leftover".to_string();
        board.dispatch(Command::MapClick(LatLng::new(56.5, 84.9))).unwrap();
        board.dispatch(Command::MapClick(LatLng::new(56.49, 84.95))).unwrap();

        assert_eq!(board.form().title, "");
        assert_eq!(board.form().lat, "56.49000");
        assert_eq!(board.form().lng, "84.95000");
        let transients = board
            .markers()
            .iter()
            .filter(|m| m.kind == MarkerKind::Transient)
            .count();
        assert_eq!(transients, 1);
    }

    #[test]
    fn test_save_validation_prompts_without_mutation() {
        let mut board = board();
        board.dispatch(Command::MapClick(TOMSK)).unwrap();
        let outcome = board.dispatch(Command::Save).unwrap();
        assert_eq!(
            outcome,
            Outcome::Prompt(ValidationError::MissingText.to_string())
        );
        assert!(board.store().is_empty());
        assert_eq!(board.store().storage().writes(), 0);
        // Form is kept so the user can fix it
        assert_eq!(board.form().lat, "56.48840");
        assert!(board.markers().transient().is_some());
    }

    #[test]
    fn test_save_renders_and_resets() {
        let mut board = board();
        let id = add_note(&mut board, "Cafe", TOMSK);

        assert_eq!(board.form(), &NoteForm::default());
        assert!(board.markers().transient().is_none());
        assert!(board.markers().note_marker(&id).is_some());
        assert_eq!(board.list().count_label(), "1 of 1 notes");
    }

    #[test]
    fn test_edit_updates_in_place() {
        let mut board = board();
        let id = add_note(&mut board, "Old", TOMSK);

        board.dispatch(Command::Edit(id.clone())).unwrap();
        assert_eq!(board.form().editing_id(), Some(id.as_str()));
        assert_eq!(board.map().zoom(), FOCUS_ZOOM);

        board.form_mut().title = "New".to_string();
        board.dispatch(Command::Save).unwrap();
        assert_eq!(board.store().len(), 1);
        assert_eq!(board.store().get(&id).unwrap().title, "New");
        assert_eq!(board.markers().note_marker(&id).unwrap().label, "New");
    }

    #[test]
    fn test_select_marker_keeps_zoom() {
        let mut board = board();
        let id = add_note(&mut board, "Here", LatLng::new(56.49, 84.95));
        board.dispatch(Command::SelectMarker(id)).unwrap();
        assert_eq!(board.map().zoom(), 13);
        assert_eq!(board.map().center(), LatLng::new(56.49, 84.95));
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut board = board();
        let id = add_note(&mut board, "Gone", TOMSK);

        let outcome = board.dispatch(Command::RequestDelete(id.clone())).unwrap();
        assert_eq!(
            outcome,
            Outcome::ConfirmDelete {
                id: id.clone(),
                title: Some("Gone".to_string())
            }
        );
        assert_eq!(board.store().len(), 1);

        board.dispatch(Command::CancelDelete).unwrap();
        assert_eq!(board.dispatch(Command::ConfirmDelete).unwrap(), Outcome::Ignored);
        assert_eq!(board.store().len(), 1);

        board.dispatch(Command::RequestDelete(id.clone())).unwrap();
        board.dispatch(Command::ConfirmDelete).unwrap();
        assert!(board.store().is_empty());
        assert!(board.markers().note_markers().is_empty());
        assert_eq!(board.list().count_label(), "0 of 0 notes");
    }

    #[test]
    fn test_delete_of_loaded_note_resets_form() {
        let mut board = board();
        let keep = add_note(&mut board, "Keep", TOMSK);
        let drop = add_note(&mut board, "Drop", LatLng::new(56.489, 84.949));

        board.dispatch(Command::Edit(drop.clone())).unwrap();
        board.dispatch(Command::RequestDelete(keep)).unwrap();
        board.dispatch(Command::ConfirmDelete).unwrap();
        assert_eq!(board.form().editing_id(), Some(drop.as_str()));

        board.dispatch(Command::RequestDelete(drop)).unwrap();
        board.dispatch(Command::ConfirmDelete).unwrap();
        assert_eq!(board.form(), &NoteForm::default());
    }

    #[test]
    fn test_delete_unknown_id_writes_nothing() {
        let mut board = board();
        add_note(&mut board, "Stay", TOMSK);
        let writes = board.store().storage().writes();

        board.dispatch(Command::RequestDelete("nope".to_string())).unwrap();
        assert_eq!(board.dispatch(Command::ConfirmDelete).unwrap(), Outcome::Ignored);
        assert_eq!(board.store().storage().writes(), writes);
    }

    #[test]
    fn test_viewport_change_rebuilds_list_only() {
        let mut board = board();
        add_note(&mut board, "Near", TOMSK);
        add_note(&mut board, "Far", LatLng::new(55.75, 37.61));
        assert_eq!(board.list().count_label(), "1 of 2 notes");

        board.map_mut().set_view(LatLng::new(55.75, 37.61), 13);
        board.dispatch(Command::ViewportChanged).unwrap();
        assert_eq!(board.list().count_label(), "1 of 2 notes");
        assert_eq!(board.list().entries[0].title, "Far");
        assert_eq!(board.markers().note_markers().len(), 2);

        assert_list_within_bounds(&board);
    }

    #[test]
    fn test_list_stays_within_bounds_after_save_and_delete() {
        let mut board = board();
        let near = add_note(&mut board, "Near", TOMSK);
        assert_list_within_bounds(&board);
        let far = add_note(&mut board, "Far", LatLng::new(55.75, 37.61));
        assert_list_within_bounds(&board);
        add_note(&mut board, "Also near", LatLng::new(56.489, 84.949));
        assert_list_within_bounds(&board);
        assert_eq!(board.list().count_label(), "2 of 3 notes");

        board.dispatch(Command::RequestDelete(near)).unwrap();
        board.dispatch(Command::ConfirmDelete).unwrap();
        assert_list_within_bounds(&board);
        assert_eq!(board.list().count_label(), "1 of 2 notes");

        board.dispatch(Command::RequestDelete(far)).unwrap();
        board.dispatch(Command::ConfirmDelete).unwrap();
        assert_list_within_bounds(&board);
        assert_eq!(board.list().count_label(), "1 of 1 notes");
    }

    #[test]
    fn test_location_marker_survives_refresh() {
        let mut board = board();
        let home = LatLng::new(56.47, 84.97);
        board.dispatch(Command::LocationResolved(Some(home))).unwrap();
        assert_eq!(board.map().center(), home);

        add_note(&mut board, "After", home);
        assert_eq!(board.markers().location().unwrap().position, home);

        assert_eq!(board.dispatch(Command::LocationResolved(None)).unwrap(), Outcome::Ignored);
        assert_eq!(board.map().center(), home);
    }
}
