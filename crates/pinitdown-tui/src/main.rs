//! PinItDown - pin short notes to a map, from the terminal.
//!
//! Without arguments this starts the interactive map. The `--flag`
//! commands maintain the offline asset cache and export the notes as HTML.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pinitdown_core::offline::{AssetRequest, CacheStorage, FetchOutcome, Method};
use pinitdown_core::view::export_page;
use pinitdown_core::{CacheError, Config, MapView, Pinboard};

use app::{open_store, open_worker, App, AppState};
use ui::input::{handle_input, handle_mouse};
use ui::render::{map_inner, render};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file written while the TUI owns the terminal
const LOG_FILE: &str = "pinitdown.log";

const USAGE: &str = "\
Usage: pinitdown [COMMAND]

Without a command, opens the interactive map.

Commands:
  --install-cache        Fetch the app shell and map assets into the offline cache
  --activate-cache       Delete every cache generation but the current one
  --cache-status         Show the offline cache state and list its entries as JSON
  --fetch <url> [method] Fetch a URL the way the offline cache answers it
  --export-html <path>   Write the notes list and popups as an HTML page
  --help                 Show this help";

fn env_filter() -> EnvFilter {
    // RUST_LOG overrides, e.g. RUST_LOG=pinitdown_core=debug
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr, for the command-line commands.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Log to a file in the cache dir, since the TUI owns the terminal. The guard
/// must live until exit so buffered lines are flushed.
fn init_file_tracing(config: &Config) -> Option<WorkerGuard> {
    let dir = config.cache_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Some(guard)
}

fn load_config() -> Config {
    match Config::load_or_init() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1) {
        init_tracing();
        let config = load_config();
        return match (command.as_str(), args.get(2)) {
            ("--install-cache", _) => install_cache(&config).await,
            ("--activate-cache", _) => activate_cache(&config),
            ("--cache-status", _) => cache_status(&config),
            ("--fetch", Some(url)) => fetch(&config, url, args.get(3).map(String::as_str)).await,
            ("--export-html", Some(path)) => export_html(&config, Path::new(path)),
            ("--help" | "-h", _) => {
                println!("{}", USAGE);
                Ok(())
            }
            _ => {
                eprintln!("{}", USAGE);
                anyhow::bail!("Unknown command: {}", args[1..].join(" "))
            }
        };
    }

    let config = load_config();
    let _log_guard = init_file_tracing(&config);
    info!("PinItDown starting");

    // Create app before touching the terminal so startup errors print normally
    let mut app = App::new(config)?;
    app.locate_user();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("PinItDown shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI, keeping the map viewport in step with the panel size
        terminal.draw(|f| {
            app.resize_map(map_inner(f.area()));
            render(f, app);
        })?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    // Ctrl+C to quit
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(());
                    }

                    if handle_input(app, key) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => handle_mouse(app, mouse),
                _ => {}
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Fetch the whole manifest into the current cache generation.
async fn install_cache(config: &Config) -> Result<()> {
    let mut worker = open_worker(config)?;
    eprintln!(
        "Caching {} assets into {}...",
        worker.manifest().len(),
        worker.cache_name()
    );

    match worker.install().await {
        Ok(()) => {
            eprintln!("Done! {}", worker.status()?.summary());
            Ok(())
        }
        Err(CacheError::InstallIncomplete { missing, total }) => {
            for url in &missing {
                eprintln!("  Not cached: {}", url);
            }
            anyhow::bail!(
                "{} of {} assets could not be cached, run again when online",
                missing.len(),
                total
            )
        }
        Err(e) => Err(e.into()),
    }
}

fn activate_cache(config: &Config) -> Result<()> {
    let mut worker = open_worker(config)?;
    let deleted = worker.activate()?;
    if deleted.is_empty() {
        eprintln!("No old caches to clear");
    }
    for name in &deleted {
        eprintln!("Cleared old cache: {}", name);
    }
    eprintln!("{}", worker.status()?.summary());
    Ok(())
}

fn cache_status(config: &Config) -> Result<()> {
    let worker = open_worker(config)?;
    let status = worker.status()?;

    eprintln!("{}", status.summary());
    eprintln!("Generations: {}", status.generations.join(", "));
    for url in &status.missing {
        eprintln!("  Not cached: {}", url);
    }

    let entries = worker.storage().entries(worker.cache_name())?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

/// Answer a request the way the cache worker would and write the body to
/// stdout. Requests the worker does not intercept go straight to the network.
async fn fetch(config: &Config, url: &str, method: Option<&str>) -> Result<()> {
    let mut worker = open_worker(config)?;
    let url = worker.manifest().resolve(url)?;
    let request = AssetRequest::get(url.as_str()).with_method(Method::parse(method.unwrap_or("GET")));

    match worker.respond(&request).await {
        FetchOutcome::Failed(e) => Err(e.into()),
        outcome => {
            if let Some(response) = outcome.response() {
                eprintln!(
                    "{} {} ({} bytes, from {}, worker {})",
                    response.status,
                    url,
                    response.body.len(),
                    outcome.source(),
                    worker.state()
                );
                io::stdout().write_all(&response.body)?;
            }
            Ok(())
        }
    }
}

fn export_html(config: &Config, path: &Path) -> Result<()> {
    let store = open_store(config)?;
    let board = Pinboard::new(
        store,
        MapView::new(config.default_center, config.default_zoom),
    );

    let page = export_page(board.list(), board.store().notes());
    std::fs::write(path, page)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    eprintln!(
        "Exported {} notes ({}) to {}",
        board.store().len(),
        board.list().count_label(),
        path.display()
    );
    Ok(())
}
