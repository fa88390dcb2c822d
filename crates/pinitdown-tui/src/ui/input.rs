//! Keyboard and mouse input handling for the TUI.
//!
//! Translates terminal events into `App` actions, which in turn dispatch
//! board commands.

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};

use pinitdown_core::Command;

use crate::app::{App, AppState, Focus, PAN_STEP};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return false;
        }
        AppState::ShowingPrompt(_) => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.state = AppState::Normal;
            }
            return false;
        }
        AppState::ConfirmingDelete { .. } => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
                _ => {}
            }
            return false;
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return true;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return false;
        }
        AppState::EditingField => {
            handle_field_input(app, key);
            return false;
        }
        AppState::Quitting => return true,
        AppState::Normal => {}
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            if app.caching_in_progress {
                app.status_message =
                    Some("Cannot quit while caching in progress. Please wait...".to_string());
                return false;
            }
            app.state = AppState::ConfirmingQuit;
            return false;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return false;
        }
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return false;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return false;
        }
        KeyCode::Char('u') => {
            app.install_cache_background();
            return false;
        }
        _ => {}
    }

    match app.focus {
        Focus::Map => handle_map_input(app, key),
        Focus::Form => handle_form_input(app, key),
        Focus::List => handle_list_input(app, key),
    }
    false
}

fn handle_map_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') => app.pan(-PAN_STEP, 0.0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(PAN_STEP, 0.0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0.0, PAN_STEP),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0.0, -PAN_STEP),
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') => app.zoom_out(),
        // Crosshair sits at the centre
        KeyCode::Enter => app.click_map(0.5, 0.5),
        KeyCode::Char('c') | KeyCode::Esc => app.dispatch(Command::Clear),
        _ => {}
    }
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up => app.form_field = app.form_field.prev(),
        KeyCode::Down => app.form_field = app.form_field.next(),
        KeyCode::Enter => app.state = AppState::EditingField,
        KeyCode::Char('s') => app.save_note(),
        KeyCode::Char('c') | KeyCode::Esc => app.dispatch(Command::Clear),
        KeyCode::Char('d') => app.delete_editing(),
        _ => {}
    }
}

fn handle_list_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.list_up(),
        KeyCode::Down | KeyCode::Char('j') => app.list_down(),
        KeyCode::Enter | KeyCode::Char('e') => app.edit_selected(),
        KeyCode::Char('d') => app.delete_selected(),
        _ => {}
    }
}

fn handle_field_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            app.state = AppState::Normal;
        }
        KeyCode::Tab => {
            app.form_field = app.form_field.next();
        }
        KeyCode::BackTab => {
            app.form_field = app.form_field.prev();
        }
        KeyCode::Backspace => {
            app.pop_char();
        }
        KeyCode::Char(c) => {
            app.push_char(c);
        }
        _ => {}
    }
}

/// Handle mouse input: left click on the map starts a note there, the wheel
/// zooms.
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.state != AppState::Normal {
        return;
    }
    let area = app.map_area;
    let over_map = mouse.column >= area.x
        && mouse.row >= area.y
        && mouse.column < area.x + area.width
        && mouse.row < area.y + area.height;

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.click_cell(mouse.column, mouse.row),
        MouseEventKind::ScrollUp if over_map => app.zoom_in(),
        MouseEventKind::ScrollDown if over_map => app.zoom_out(),
        _ => {}
    }
}
