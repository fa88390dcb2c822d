use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Map, MapResolution},
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap,
    },
    Frame,
};

use pinitdown_core::markers::MarkerKind;
use pinitdown_core::offline::WorkerState;
use pinitdown_core::utils::truncate_string;
use pinitdown_core::view::{EMPTY_HINT, EMPTY_MESSAGE};

use crate::app::{App, AppState, Focus, FormField};

use super::styles;

/// Screen regions of the main layout.
pub struct Panes {
    pub title: Rect,
    pub map: Rect,
    pub form: Rect,
    pub list: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> Panes {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Min(10),   // Map and side panels
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(4)])
        .split(columns[1]);

    Panes {
        title: rows[0],
        map: columns[0],
        form: side[0],
        list: side[1],
        status: rows[2],
    }
}

/// Drawable part of the map panel inside its border.
pub fn map_inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(layout(area).map)
}

pub fn render(frame: &mut Frame, app: &App) {
    let panes = layout(frame.area());

    render_title_bar(frame, app, panes.title);
    render_map(frame, app, panes.map);
    render_form(frame, app, panes.form);
    render_list(frame, app, panes.list);
    render_status_bar(frame, app, panes.status);

    // Overlays
    match &app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingDelete { title } => render_delete_overlay(frame, title.as_deref()),
        AppState::ShowingPrompt(message) => render_prompt_overlay(frame, message),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::EditingField | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  PinItDown";
    let help_hint = "[?] Help";
    let center = app.board.map().center();
    let position = format!("{}  z{}", center, app.board.map().zoom());

    let used = title.len() + position.len() + help_hint.len() + 4;
    let gap = (area.width as usize).saturating_sub(used) / 2;

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(gap)),
        Span::styled(position, styles::muted_style()),
        Span::raw(" ".repeat(gap)),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

// ============================================================================
// Map
// ============================================================================

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Map;
    let map = app.board.map();
    let bounds = map.bounds();
    let center = map.center();
    let selected = app.selected_note_id();

    let block = Block::default()
        .title(" Map - [Enter] new note here, [+/-] zoom ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds([bounds.west(), bounds.east()])
        .y_bounds([bounds.south(), bounds.north()])
        .paint(|ctx| {
            ctx.draw(&Map {
                color: styles::LAND,
                resolution: MapResolution::High,
            });
            ctx.layer();

            for marker in app.board.markers().iter() {
                let (symbol, style) = match &marker.kind {
                    MarkerKind::Note { id } => {
                        let is_selected = selected.as_deref() == Some(id.as_str());
                        ("●", styles::note_marker_style(is_selected))
                    }
                    MarkerKind::Transient => ("◆", styles::transient_marker_style()),
                    MarkerKind::Location => ("◉", styles::location_marker_style()),
                };
                ctx.print(
                    marker.position.lng,
                    marker.position.lat,
                    Span::styled(symbol, style),
                );
            }

            ctx.print(center.lng, center.lat, Span::styled("+", styles::crosshair_style()));
        });

    frame.render_widget(canvas, area);
}

// ============================================================================
// Form
// ============================================================================

fn render_form(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Form;
    let editing = app.state == AppState::EditingField;
    let form = app.board.form();

    let mut lines = Vec::new();
    for field in FormField::ALL {
        let current = focused && app.form_field == field;
        let value_style = if current {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        let cursor = if current && editing { "▌" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<10}", field.label()), styles::muted_style()),
            Span::styled(format!("{}{}", app.field_value(field), cursor), value_style),
        ]));
    }

    lines.push(Line::from(""));
    let mode = if form.is_editing() {
        Span::styled(" Editing note", styles::highlight_style())
    } else {
        Span::styled(" New note", styles::success_style())
    };
    lines.push(Line::from(vec![
        mode,
        Span::styled("  [s]ave [c]lear [d]elete", styles::muted_style()),
    ]));

    let block = Block::default()
        .title(" Note ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// List
// ============================================================================

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::List;
    let list = app.board.list();

    let block = Block::default()
        .title(format!(" {} - [e]dit [d]elete ", list.count_label()))
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    if list.is_empty() {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(format!(" {}", EMPTY_MESSAGE), styles::list_item_style())),
            Line::from(Span::styled(format!(" {}", EMPTY_HINT), styles::muted_style())),
        ];
        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
        return;
    }

    let width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = list
        .entries
        .iter()
        .map(|entry| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    truncate_string(&entry.title, width),
                    styles::title_style(),
                )),
                Line::from(Span::styled(
                    truncate_string(&entry.preview, width),
                    styles::list_item_style(),
                )),
                Line::from(Span::styled(
                    format!("Lat: {}, Lng: {}", entry.lat, entry.lng),
                    styles::muted_style(),
                )),
            ])
        })
        .collect();

    let widget = List::new(items)
        .block(block)
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    state.select(Some(app.list_selection));

    frame.render_stateful_widget(widget, area, &mut state);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[u]pdate cache | [q]uit";

    let (left_text, left_style) = match app.status_message {
        Some(ref msg) if msg.starts_with("Error:") => (format!(" {} ", msg), styles::error_style()),
        Some(ref msg) => (format!(" {} ", msg), styles::list_item_style()),
        None => (format!(" {} notes ", app.board.store().len()), styles::muted_style()),
    };

    let cache_text = match &app.cache_status {
        Some(status) if status.state == WorkerState::Active && status.missing.is_empty() => {
            format!("Offline ready, updated {}", status.age_display())
        }
        Some(status) => format!("Cache {}", status.state),
        None => "Cache unavailable".to_string(),
    };
    let right_text = format!(" {} | {} ", cache_text, shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Overlays
// ============================================================================

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 25, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled(
            format!("  PinItDown {}", version),
            styles::title_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("Tab", "Switch panel (map, note, list)"),
        help_line("↑/↓/←/→", "Pan map / move selection"),
        help_line("+/-", "Zoom in / out"),
        help_line("Click", "New note at the clicked spot"),
        Line::from(""),
        Line::from(Span::styled(" Map", styles::highlight_style())),
        help_line("Enter", "New note at the crosshair"),
        help_line("", "(opens the note if one is there)"),
        Line::from(""),
        Line::from(Span::styled(" Note and list", styles::highlight_style())),
        help_line("Enter", "Edit field / load selected note"),
        help_line("s", "Save note"),
        help_line("c", "Clear form"),
        help_line("d", "Delete note"),
        Line::from(""),
        help_line("u", "Cache app assets for offline use"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    render_dialog(frame, area, help_text);
}

fn render_delete_overlay(frame: &mut Frame, title: Option<&str>) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let subject = match title {
        Some(t) => format!("\"{}\"", t),
        None => "this note".to_string(),
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("   Delete {}?", subject),
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to delete, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    render_dialog(frame, area, lines);
}

fn render_prompt_overlay(frame: &mut Frame, message: &str) {
    let area = centered_rect_fixed(52, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", message), styles::error_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("[Enter]", styles::help_key_style()),
            Span::styled(" to continue", styles::muted_style()),
        ]),
    ];

    render_dialog(frame, area, lines);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    render_dialog(frame, area, lines);
}

fn render_dialog(frame: &mut Frame, area: Rect, lines: Vec<Line>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
