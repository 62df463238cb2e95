//! `Taskboard`: personal task board with work, study and life columns.
//!
//! Connects to a task store server and shows one column per category.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! cargo run --bin taskboard-server &
//! cargo run --bin taskboard -- --url ws://127.0.0.1:9400/ws
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::app::App;
use taskboard::board::{BoardEvent, DEFAULT_EVENT_CAPACITY, TaskBoard};
use taskboard::config::{CliArgs, ClientConfig};
use taskboard::store::TaskStore;
use taskboard::store::remote::RemoteStore;
use taskboard::ui;
use taskboard_proto::task::Category;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let config = ClientConfig::load(&cli).map_err(|e| {
        eprintln!("Error: {e}");
        io::Error::other(e)
    })?;

    tracing::info!(url = %config.store_url, "taskboard starting");

    // No offline mode: without a store there is nothing to show.
    let store = RemoteStore::connect(&config.store_url, config.connect_timeout)
        .await
        .map_err(|e| {
            eprintln!("Error: {e}");
            io::Error::other(e)
        })?;
    let board = TaskBoard::new(Arc::new(store), config.max_title_len);

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app.
    let result = run_app(&mut terminal, &board, &config);

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("taskboard exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the terminal).
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
///
/// Runs on the runtime's main thread; every store operation is dispatched
/// onto a background task so the loop never blocks on the network.
fn run_app<S: TaskStore + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    board: &TaskBoard<S>,
    config: &ClientConfig,
) -> io::Result<()> {
    let mut app = App::new(config.max_title_len, config.timestamp_format.clone());
    app.focus = config.focus;
    let (evt_tx, mut evt_rx) = mpsc::channel(DEFAULT_EVENT_CAPACITY);

    board.dispatch(app.refresh_all(), &evt_tx);

    loop {
        // Step 1: Copy the latest snapshots and draw.
        for category in Category::ALL {
            app.sync(category, board.snapshot(category));
        }
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: Drain finished operations (non-blocking).
        drain_board_events(&mut app, &mut evt_rx);

        // Step 3: Poll for terminal input events.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(command) = app.handle_key_event(key) {
                tracing::debug!(?command, "dispatching board command");
                board.dispatch(command, &evt_tx);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Drain all pending `BoardEvent`s and apply them to the app.
fn drain_board_events(app: &mut App, rx: &mut mpsc::Receiver<BoardEvent>) {
    while let Ok(event) = rx.try_recv() {
        if let Err(message) = &event.outcome {
            tracing::warn!(category = %event.category, action = ?event.action, error = %message, "operation failed");
        }
        app.apply_event(&event);
    }
}
