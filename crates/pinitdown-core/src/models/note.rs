use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::map::LatLng;
use crate::utils::{format_coord, preview};

/// Decimal places written into the form's coordinate fields.
const FORM_COORD_PRECISION: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub lat: f64,
    pub lng: f64,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Content cut to the preview length, with an ellipsis when cut.
    pub fn preview(&self) -> String {
        preview(&self.content)
    }

    /// Whether the record can be placed on the map at all.
    pub fn has_position(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    pub(crate) fn apply(&mut self, draft: NoteDraft) {
        self.title = draft.title;
        self.content = draft.content;
        self.lat = draft.position.lat;
        self.lng = draft.position.lng;
    }
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub position: LatLng,
}

/// The note form: hidden id, title, content and the two coordinate fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteForm {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub lat: String,
    pub lng: String,
}

impl NoteForm {
    pub fn from_note(note: &Note) -> Self {
        Self {
            id: Some(note.id.clone()),
            title: note.title.clone(),
            content: note.content.clone(),
            lat: format_coord(note.lat, FORM_COORD_PRECISION),
            lng: format_coord(note.lng, FORM_COORD_PRECISION),
        }
    }

    /// A blank form holding only the given location, as after a map click.
    pub fn at(position: LatLng) -> Self {
        let mut form = Self::default();
        form.set_location(position);
        form
    }

    pub fn set_location(&mut self, position: LatLng) {
        self.lat = format_coord(position.lat, FORM_COORD_PRECISION);
        self.lng = format_coord(position.lng, FORM_COORD_PRECISION);
    }

    /// True when the form holds an existing note.
    pub fn is_editing(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn validate(&self) -> Result<NoteDraft, ValidationError> {
        let title = self.title.trim();
        let content = self.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(ValidationError::MissingText);
        }

        let lat = self.lat.trim();
        let lng = self.lng.trim();
        if lat.is_empty() || lng.is_empty() {
            return Err(ValidationError::MissingLocation);
        }

        let position = match (lat.parse::<f64>(), lng.parse::<f64>()) {
            (Ok(lat), Ok(lng)) if lat.is_finite() && lng.is_finite() => LatLng::new(lat, lng),
            _ => return Err(ValidationError::InvalidLocation),
        };

        Ok(NoteDraft {
            title: title.to_string(),
            content: content.to_string(),
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> NoteForm {
        NoteForm {
            id: None,
            title: "  Lunch spot ".to_string(),
            content: "Great noodles\n".to_string(),
            lat: "56.48".to_string(),
            lng: "84.95".to_string(),
        }
    }

    #[test]
    fn test_validate_trims_text() {
        let draft = filled_form().validate().unwrap();
        assert_eq!(draft.title, "Lunch spot");
        assert_eq!(draft.content, "Great noodles");
        assert_eq!(draft.position, LatLng::new(56.48, 84.95));
    }

    #[test]
    fn test_validate_missing_text() {
        let mut form = filled_form();
        form.title = "   ".to_string();
        assert_eq!(form.validate(), Err(ValidationError::MissingText));

        let mut form = filled_form();
        form.content.clear();
        assert_eq!(form.validate(), Err(ValidationError::MissingText));
    }

    #[test]
    fn test_validate_missing_location() {
        let mut form = filled_form();
        form.lng.clear();
        assert_eq!(form.validate(), Err(ValidationError::MissingLocation));
    }

    #[test]
    fn test_validate_rejects_non_numeric_and_infinite() {
        let mut form = filled_form();
        form.lat = "north".to_string();
        assert_eq!(form.validate(), Err(ValidationError::InvalidLocation));

        let mut form = filled_form();
        form.lng = "inf".to_string();
        assert_eq!(form.validate(), Err(ValidationError::InvalidLocation));

        let mut form = filled_form();
        form.lat = "NaN".to_string();
        assert_eq!(form.validate(), Err(ValidationError::InvalidLocation));
    }

    #[test]
    fn test_form_from_note_formats_coords() {
        let note = Note {
            id: "1700000000000".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            lat: 56.488412345,
            lng: 84.948,
            created_at: Utc::now(),
        };
        let form = NoteForm::from_note(&note);
        assert_eq!(form.lat, "56.48841");
        assert_eq!(form.lng, "84.94800");
        assert!(form.is_editing());
        assert_eq!(form.editing_id(), Some("1700000000000"));
    }

    #[test]
    fn test_empty_id_is_not_editing() {
        let mut form = NoteForm::at(LatLng::new(1.0, 2.0));
        form.id = Some(String::new());
        assert!(!form.is_editing());
        assert_eq!(form.lat, "1.00000");
    }

    #[test]
    fn test_note_serializes_camel_case() {
        let note = Note {
            id: "1".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            lat: 1.5,
            lng: -2.25,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
        assert_eq!(json["lat"], 1.5);
    }

    #[test]
    fn test_note_reads_browser_record() {
        let raw = r#"{"id":"1718000000000","title":"Cafe","content":"Good","lat":56.5,"lng":84.9,"createdAt":"2024-06-10T06:13:20.000Z"}"#;
        let note: Note = serde_json::from_str(raw).unwrap();
        assert_eq!(note.id, "1718000000000");
        assert!(note.has_position());
    }
}
