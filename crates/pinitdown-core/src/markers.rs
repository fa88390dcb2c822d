//! Marker registry for the map layer.
//!
//! Three kinds of marker share the map: one per saved note, at most one
//! transient marker for a location picked but not yet saved, and the user's
//! own location. Rebuilding the note layer never touches the other two.

use crate::map::LatLng;
use crate::models::Note;
use crate::view::popup_html;

pub const TRANSIENT_LABEL: &str = "New note location";
pub const LOCATION_LABEL: &str = "Your current location";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    Note { id: String },
    Transient,
    Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: LatLng,
    pub label: String,
    /// Escaped HTML bound to the marker's popup.
    pub popup: String,
}

impl Marker {
    fn for_note(note: &Note) -> Self {
        Self {
            kind: MarkerKind::Note {
                id: note.id.clone(),
            },
            position: note.position(),
            label: note.title.clone(),
            popup: popup_html(note),
        }
    }

    fn fixed(kind: MarkerKind, position: LatLng, label: &str) -> Self {
        Self {
            kind,
            position,
            label: label.to_string(),
            popup: label.to_string(),
        }
    }

    pub fn note_id(&self) -> Option<&str> {
        match &self.kind {
            MarkerKind::Note { id } => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MarkerRegistry {
    notes: Vec<Marker>,
    transient: Option<Marker>,
    location: Option<Marker>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every note marker and add one per placeable note.
    pub fn render_notes(&mut self, notes: &[Note]) {
        self.notes = notes
            .iter()
            .filter(|n| n.has_position())
            .map(Marker::for_note)
            .collect();
    }

    /// Place the transient marker, replacing any previous one.
    pub fn place_transient(&mut self, at: LatLng) {
        self.transient = Some(Marker::fixed(MarkerKind::Transient, at, TRANSIENT_LABEL));
    }

    /// Returns true if a transient marker was removed.
    pub fn clear_transient(&mut self) -> bool {
        self.transient.take().is_some()
    }

    pub fn set_location(&mut self, at: LatLng) {
        self.location = Some(Marker::fixed(MarkerKind::Location, at, LOCATION_LABEL));
    }

    pub fn note_markers(&self) -> &[Marker] {
        &self.notes
    }

    pub fn note_marker(&self, id: &str) -> Option<&Marker> {
        self.notes.iter().find(|m| m.note_id() == Some(id))
    }

    pub fn transient(&self) -> Option<&Marker> {
        self.transient.as_ref()
    }

    pub fn location(&self) -> Option<&Marker> {
        self.location.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.notes
            .iter()
            .chain(self.transient.iter())
            .chain(self.location.iter())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The note marker closest to `at`, if one lies within `tolerance`
    /// degrees on both axes.
    pub fn note_near(&self, at: LatLng, tolerance: f64) -> Option<&Marker> {
        self.notes
            .iter()
            .filter(|m| {
                (m.position.lat - at.lat).abs() <= tolerance
                    && (m.position.lng - at.lng).abs() <= tolerance
            })
            .min_by(|a, b| {
                let da = (a.position.lat - at.lat).powi(2) + (a.position.lng - at.lng).powi(2);
                let db = (b.position.lat - at.lat).powi(2) + (b.position.lng - at.lng).powi(2);
                da.total_cmp(&db)
            })
    }
}
