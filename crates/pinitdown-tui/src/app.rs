//! Application state for the PinItDown terminal front end.
//!
//! `App` owns the `Pinboard` and translates key presses into board
//! commands. Location lookup and asset caching run on background tasks that
//! report back through an mpsc channel.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use pinitdown_core::map::LatLng;
use pinitdown_core::offline::{CacheStatus, DiskCacheStorage, HttpFetcher, OfflineWorker};
use pinitdown_core::{
    CacheError, Command, Config, FileKeyValueStore, MapView, NoteStore, Outcome, Pinboard,
    StoreError,
};

// ============================================================================
// Constants
// ============================================================================

/// Directory under the cache dir holding cache generations.
pub const CACHES_DIR: &str = "caches";

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Terminal columns covered by one 256px map tile.
const TILE_COLUMNS: f64 = 32.0;

/// Terminal rows covered by one 256px map tile.
const TILE_ROWS: f64 = 16.0;

/// Fraction of the visible span moved by one pan step.
pub const PAN_STEP: f64 = 0.25;

/// Maximum length of the title field.
const MAX_TITLE_LENGTH: usize = 120;

/// Maximum length of the content field.
const MAX_CONTENT_LENGTH: usize = 2000;

/// Maximum length of a coordinate field.
const MAX_COORD_LENGTH: usize = 24;

/// Marker hit radius for a map click, as a fraction of the visible span.
const MARKER_HIT_FRACTION: f64 = 0.02;

// ============================================================================
// UI State Types
// ============================================================================

/// Panel receiving keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Map,
    Form,
    List,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::Map => Focus::Form,
            Focus::Form => Focus::List,
            Focus::List => Focus::Map,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Focus::Map => Focus::List,
            Focus::Form => Focus::Map,
            Focus::List => Focus::Form,
        }
    }
}

/// Editable form fields, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Content,
    Latitude,
    Longitude,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Title,
        FormField::Content,
        FormField::Latitude,
        FormField::Longitude,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Content => "Content",
            FormField::Latitude => "Latitude",
            FormField::Longitude => "Longitude",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FormField::Title => FormField::Content,
            FormField::Content => FormField::Latitude,
            FormField::Latitude => FormField::Longitude,
            FormField::Longitude => FormField::Title,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FormField::Title => FormField::Longitude,
            FormField::Content => FormField::Title,
            FormField::Latitude => FormField::Content,
            FormField::Longitude => FormField::Latitude,
        }
    }

    fn max_length(&self) -> usize {
        match self {
            FormField::Title => MAX_TITLE_LENGTH,
            FormField::Content => MAX_CONTENT_LENGTH,
            FormField::Latitude | FormField::Longitude => MAX_COORD_LENGTH,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    Normal,
    EditingField,
    ConfirmingDelete { title: Option<String> },
    ShowingPrompt(String),
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from background tasks.
enum BackgroundResult {
    /// Outcome of the location lookup
    Location(Option<LatLng>),
    /// Asset cache install finished; carries the status afterwards
    CacheInstalled(CacheStatus),
    /// Asset cache install stopped with missing entries
    CacheIncomplete { missing: usize, status: CacheStatus },
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    pub board: Pinboard<FileKeyValueStore>,

    // UI state
    pub state: AppState,
    pub focus: Focus,
    pub form_field: FormField,
    pub list_selection: usize,
    /// Inner area of the map panel, for mouse hit-testing
    pub map_area: Rect,

    pub status_message: Option<String>,
    pub cache_status: Option<CacheStatus>,
    pub caching_in_progress: bool,

    bg_rx: mpsc::Receiver<BackgroundResult>,
    bg_tx: mpsc::Sender<BackgroundResult>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let store = open_store(&config)?;
        let map = MapView::new(config.default_center, config.default_zoom);
        let board = Pinboard::new(store, map);

        let (bg_tx, bg_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let mut app = Self {
            config,
            board,
            state: AppState::Normal,
            focus: Focus::Map,
            form_field: FormField::Title,
            list_selection: 0,
            map_area: Rect::default(),
            status_message: None,
            cache_status: None,
            caching_in_progress: false,
            bg_rx,
            bg_tx,
        };
        app.refresh_cache_status();
        Ok(app)
    }

    // ------------------------------------------------------------------------
    // Board commands
    // ------------------------------------------------------------------------

    /// Run a board command and reflect its outcome in the UI state.
    pub fn dispatch(&mut self, command: Command) {
        match self.board.dispatch(command) {
            Ok(Outcome::Prompt(message)) => {
                self.state = AppState::ShowingPrompt(message);
            }
            Ok(Outcome::ConfirmDelete { title, .. }) => {
                self.state = AppState::ConfirmingDelete { title };
            }
            Ok(Outcome::Updated) | Ok(Outcome::Ignored) => {}
            Err(e) => {
                error!(error = %e, "Command failed");
                self.status_message = Some(format!("Error: {}", e));
            }
        }
        self.clamp_list_selection();
    }

    pub fn save_note(&mut self) {
        let before = self.board.store().len();
        let editing = self.board.form().is_editing();
        self.status_message = None;
        self.dispatch(Command::Save);
        if self.state == AppState::Normal && self.status_message.is_none() {
            let message = if editing {
                "Note updated"
            } else if self.board.store().len() > before {
                "Note added"
            } else {
                "Saved"
            };
            self.status_message = Some(message.to_string());
        }
    }

    /// Start a new note under the viewport point `(x, y)`, given as fractions.
    /// Clicking on a note's marker opens that note instead.
    pub fn click_map(&mut self, x: f64, y: f64) {
        let at = self.board.map().position_at(x, y);
        let bounds = self.board.map().bounds();
        let tolerance = (bounds.east() - bounds.west()) * MARKER_HIT_FRACTION;
        let hit = self
            .board
            .markers()
            .note_near(at, tolerance)
            .and_then(|m| m.note_id())
            .map(str::to_string);

        match hit {
            Some(id) => self.dispatch(Command::SelectMarker(id)),
            None => {
                self.dispatch(Command::MapClick(at));
                self.focus = Focus::Form;
                self.form_field = FormField::Title;
            }
        }
    }

    /// Click at a terminal cell; ignored outside the map panel.
    pub fn click_cell(&mut self, column: u16, row: u16) {
        let area = self.map_area;
        if area.width == 0
            || area.height == 0
            || column < area.x
            || row < area.y
            || column >= area.x + area.width
            || row >= area.y + area.height
        {
            return;
        }
        let x = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
        let y = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
        self.focus = Focus::Map;
        self.click_map(x, y);
    }

    pub fn pan(&mut self, east: f64, north: f64) {
        self.board.map_mut().pan(east, north);
        self.dispatch(Command::ViewportChanged);
    }

    pub fn zoom_in(&mut self) {
        self.board.map_mut().zoom_in();
        self.dispatch(Command::ViewportChanged);
    }

    pub fn zoom_out(&mut self) {
        self.board.map_mut().zoom_out();
        self.dispatch(Command::ViewportChanged);
    }

    /// Track the map panel size so the viewport covers what is drawn.
    pub fn resize_map(&mut self, area: Rect) {
        if area == self.map_area {
            return;
        }
        self.map_area = area;
        self.board.map_mut().set_size(
            f64::from(area.width) / TILE_COLUMNS,
            f64::from(area.height) / TILE_ROWS,
        );
        self.dispatch(Command::ViewportChanged);
    }

    /// Id of the note selected in the list.
    pub fn selected_note_id(&self) -> Option<String> {
        self.board
            .list()
            .entries
            .get(self.list_selection)
            .map(|e| e.id.clone())
    }

    pub fn edit_selected(&mut self) {
        if let Some(id) = self.selected_note_id() {
            self.dispatch(Command::Edit(id));
            self.focus = Focus::Form;
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_note_id() {
            self.dispatch(Command::RequestDelete(id));
        }
    }

    /// Delete the note loaded in the form.
    pub fn delete_editing(&mut self) {
        if let Some(id) = self.board.form().editing_id().map(str::to_string) {
            self.dispatch(Command::RequestDelete(id));
        }
    }

    pub fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        let before = self.board.store().len();
        self.dispatch(Command::ConfirmDelete);
        if self.board.store().len() < before {
            self.status_message = Some("Note deleted".to_string());
        }
    }

    pub fn cancel_delete(&mut self) {
        self.state = AppState::Normal;
        self.dispatch(Command::CancelDelete);
    }

    pub fn list_up(&mut self) {
        self.list_selection = self.list_selection.saturating_sub(1);
    }

    pub fn list_down(&mut self) {
        let len = self.board.list().entries.len();
        if self.list_selection + 1 < len {
            self.list_selection += 1;
        }
    }

    fn clamp_list_selection(&mut self) {
        let len = self.board.list().entries.len();
        if self.list_selection >= len {
            self.list_selection = len.saturating_sub(1);
        }
    }

    // ------------------------------------------------------------------------
    // Form editing
    // ------------------------------------------------------------------------

    pub fn field_value(&self, field: FormField) -> &str {
        let form = self.board.form();
        match field {
            FormField::Title => &form.title,
            FormField::Content => &form.content,
            FormField::Latitude => &form.lat,
            FormField::Longitude => &form.lng,
        }
    }

    fn field_mut(&mut self, field: FormField) -> &mut String {
        let form = self.board.form_mut();
        match field {
            FormField::Title => &mut form.title,
            FormField::Content => &mut form.content,
            FormField::Latitude => &mut form.lat,
            FormField::Longitude => &mut form.lng,
        }
    }

    pub fn push_char(&mut self, c: char) {
        let field = self.form_field;
        let value = self.field_mut(field);
        if can_add_char(field, value.chars().count(), c) {
            value.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        let field = self.form_field;
        self.field_mut(field).pop();
    }

    // ------------------------------------------------------------------------
    // Background tasks
    // ------------------------------------------------------------------------

    /// Look up the user's location without blocking the UI.
    pub fn locate_user(&self) {
        let config = self.config.clone();
        let tx = self.bg_tx.clone();
        tokio::spawn(async move {
            let at = config.resolve_location();
            Self::send_result(&tx, BackgroundResult::Location(at)).await;
        });
    }

    /// Fetch the asset manifest into the cache and take over.
    pub fn install_cache_background(&mut self) {
        if self.caching_in_progress {
            return;
        }
        let mut worker = match open_worker(&self.config) {
            Ok(w) => w,
            Err(e) => {
                self.status_message = Some(format!("Error: {}", e));
                return;
            }
        };

        self.caching_in_progress = true;
        self.status_message = Some("Caching app assets...".to_string());
        let tx = self.bg_tx.clone();

        tokio::spawn(async move {
            let installed = worker.install().await;
            let status = match worker.status() {
                Ok(s) => s,
                Err(e) => {
                    Self::send_result(&tx, BackgroundResult::Error(e.to_string())).await;
                    return;
                }
            };
            let result = match installed {
                Ok(()) => BackgroundResult::CacheInstalled(status),
                Err(CacheError::InstallIncomplete { missing, .. }) => {
                    BackgroundResult::CacheIncomplete {
                        missing: missing.len(),
                        status,
                    }
                }
                Err(e) => BackgroundResult::Error(e.to_string()),
            };
            Self::send_result(&tx, result).await;
        });
    }

    fn refresh_cache_status(&mut self) {
        match open_worker(&self.config).and_then(|w| Ok(w.status()?)) {
            Ok(status) => self.cache_status = Some(status),
            Err(e) => warn!(error = %e, "Could not read asset cache status"),
        }
    }

    async fn send_result(tx: &mpsc::Sender<BackgroundResult>, result: BackgroundResult) {
        if let Err(e) = tx.send(result).await {
            warn!(error = %e, "Background result dropped");
        }
    }

    /// Apply finished background results.
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.bg_rx.try_recv() {
            self.process_background_result(result);
        }
    }

    fn process_background_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::Location(at) => {
                self.dispatch(Command::LocationResolved(at));
                if at.is_none() {
                    self.status_message = Some("Location unavailable".to_string());
                }
            }
            BackgroundResult::CacheInstalled(status) => {
                self.caching_in_progress = false;
                info!(summary = %status.summary(), "Asset cache ready");
                self.status_message = Some("Available offline".to_string());
                self.cache_status = Some(status);
            }
            BackgroundResult::CacheIncomplete { missing, status } => {
                self.caching_in_progress = false;
                self.status_message =
                    Some(format!("Error: {} assets could not be cached", missing));
                self.cache_status = Some(status);
            }
            BackgroundResult::Error(msg) => {
                self.caching_in_progress = false;
                error!(error = %msg, "Background task error");
                self.status_message = Some(format!("Error: {}", msg));
            }
        }
    }
}

/// Asset cache worker over the on-disk cache, in the state left by the last
/// run.
pub fn open_worker(config: &Config) -> Result<OfflineWorker<DiskCacheStorage, HttpFetcher>> {
    let cache_root = config
        .cache_dir()
        .unwrap_or_else(|_| PathBuf::from("./cache"))
        .join(CACHES_DIR);
    debug!(?cache_root, "Opening asset cache");

    let storage = DiskCacheStorage::new(cache_root)?;
    let fetcher = HttpFetcher::new()?.offline(config.offline_mode);
    let mut worker = OfflineWorker::from_config(storage, fetcher, config)?;
    worker.restore()?;
    Ok(worker)
}

/// Open the note collection. Unreadable stored data is left in place and the
/// app starts empty; it is only overwritten by the next save.
pub fn open_store(config: &Config) -> Result<NoteStore<FileKeyValueStore>> {
    let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));
    debug!(?data_dir, "Opening note storage");

    let storage = FileKeyValueStore::new(data_dir.clone())
        .with_context(|| format!("Failed to open data directory: {}", data_dir.display()))?;
    match NoteStore::open(storage, config.storage_key.as_str()) {
        Ok(store) => {
            info!(notes = store.len(), "Notes loaded");
            Ok(store)
        }
        Err(e @ StoreError::Corrupt(_)) => {
            warn!(error = %e, "Stored notes are unreadable, starting empty");
            let storage = FileKeyValueStore::new(data_dir)?;
            Ok(NoteStore::new(storage, config.storage_key.as_str()))
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Input validation helpers
// ============================================================================

/// Check if a character should be accepted into a form field
pub fn can_add_char(field: FormField, current_len: usize, c: char) -> bool {
    if current_len >= field.max_length() || c.is_control() {
        return false;
    }
    match field {
        FormField::Latitude | FormField::Longitude => {
            c.is_ascii_digit() || matches!(c, '-' | '.' | '+')
        }
        FormField::Title | FormField::Content => true,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_cycle() {
        assert_eq!(Focus::Map.next(), Focus::Form);
        assert_eq!(Focus::List.next(), Focus::Map);
        assert_eq!(Focus::Map.prev(), Focus::List);
        assert_eq!(Focus::Form.prev().next(), Focus::Form);
    }

    #[test]
    fn test_form_field_cycle() {
        let mut field = FormField::Title;
        for _ in 0..FormField::ALL.len() {
            field = field.next();
        }
        assert_eq!(field, FormField::Title);
        assert_eq!(FormField::Title.prev(), FormField::Longitude);
    }

    #[test]
    fn test_can_add_char_text_fields() {
        assert!(can_add_char(FormField::Title, 0, 'a'));
        assert!(can_add_char(FormField::Content, 10, ' '));
        assert!(!can_add_char(FormField::Title, 0, '\n'));
        assert!(!can_add_char(FormField::Title, MAX_TITLE_LENGTH, 'a'));
    }

    #[test]
    fn test_can_add_char_coordinates() {
        assert!(can_add_char(FormField::Latitude, 0, '-'));
        assert!(can_add_char(FormField::Longitude, 3, '7'));
        assert!(can_add_char(FormField::Latitude, 2, '.'));
        assert!(!can_add_char(FormField::Latitude, 0, 'x'));
        assert!(!can_add_char(FormField::Longitude, MAX_COORD_LENGTH, '1'));
    }
}
