//! View projections of the note collection.
//!
//! The marker layer shows every note; the viewport list shows only the notes
//! inside the current map bounds. Anything user-supplied that ends up in
//! markup goes through `escape_html` first.

use std::fmt::Write;

use crate::map::GeoBounds;
use crate::models::Note;
use crate::utils::{escape_html, format_coord, preview};

pub const EMPTY_MESSAGE: &str = "No notes in the current map view.";
pub const EMPTY_HINT: &str = "Zoom out or pan around to find more notes, or add a new one!";

/// Decimal places shown for coordinates in the list.
const LIST_COORD_PRECISION: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub lat: String,
    pub lng: String,
}

impl ListEntry {
    fn from_note(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            preview: preview(&note.content),
            lat: format_coord(note.lat, LIST_COORD_PRECISION),
            lng: format_coord(note.lng, LIST_COORD_PRECISION),
        }
    }
}

/// The notes currently in view, plus the size of the whole collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportList {
    pub total: usize,
    pub entries: Vec<ListEntry>,
}

impl ViewportList {
    pub fn build(notes: &[Note], bounds: &GeoBounds) -> Self {
        let entries = notes
            .iter()
            .filter(|n| n.has_position() && bounds.contains(n.position()))
            .map(ListEntry::from_note)
            .collect();
        Self {
            total: notes.len(),
            entries,
        }
    }

    pub fn in_view(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_label(&self) -> String {
        format!("{} of {} notes", self.in_view(), self.total)
    }
}

/// Popup markup bound to a note's marker.
pub fn popup_html(note: &Note) -> String {
    format!(
        "<div class=\"popup-content\"><h4>{}</h4><p>{}</p><small>Click marker to edit</small></div>",
        escape_html(&note.title),
        escape_html(&preview(&note.content)),
    )
}

/// Markup for the viewport list, empty state included.
pub fn list_html(list: &ViewportList) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<p id=\"notes-count\">{}</p>\n<ul id=\"notes-list\">\n",
        escape_html(&list.count_label())
    );

    if list.is_empty() {
        let _ = writeln!(
            out,
            "<li class=\"no-notes-message\"><div>{}</div><small>{}</small></li>",
            EMPTY_MESSAGE, EMPTY_HINT
        );
    }

    for entry in &list.entries {
        let _ = writeln!(
            out,
            "<li class=\"note-item\" data-note-id=\"{id}\"><span class=\"note-title\">{title}</span>\
             <p class=\"note-content-preview\">{preview}</p>\
             <span class=\"note-coords\">Lat: {lat}, Lng: {lng}</span></li>",
            id = escape_html(&entry.id),
            title = escape_html(&entry.title),
            preview = escape_html(&entry.preview),
            lat = entry.lat,
            lng = entry.lng,
        );
    }

    out.push_str("</ul>\n");
    out
}

/// A standalone page with the list and every note's popup, for export.
pub fn export_page(list: &ViewportList, notes: &[Note]) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>PinItDown notes</title></head>\n<body>\n",
    );
    out.push_str(&list_html(list));
    out.push_str("<section id=\"all-notes\">\n");
    for note in notes {
        out.push_str(&popup_html(note));
        out.push('\n');
    }
    out.push_str("</section>\n</body>\n</html>\n");
    out
}
