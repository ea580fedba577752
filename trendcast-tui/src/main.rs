//! TrendCast TUI: six-panel terminal page for stock forecasts.
//!
//! Panels:
//! 1. Select: ticker list and horizon slider
//! 2. Data: raw price table and forecast tail
//! 3. Chart: open/close prices with range zoom
//! 4. Forecast: prediction and interval over history and horizon
//! 5. Components: trend and seasonal terms
//! 6. Help: keyboard shortcuts

mod app;
mod input;
mod persistence;
mod theme;
mod ui;
mod worker;

use std::fs::File;
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use trendcast_runner::{Pipeline, PipelineConfig};

use crate::app::{AppState, ErrorCategory};
use crate::worker::WorkerCommand;

fn main() -> Result<()> {
    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    // Paths
    let app_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trendcast");
    let state_path = app_dir.join("state.json");
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| app_dir.join("config.toml"));

    init_logging(&app_dir)?;

    let (config, config_error) = load_config(&config_path);
    let tickers = config.ticker_symbols()?;
    let pipeline = Pipeline::new(config.clone())?;
    tracing::info!(
        provider = pipeline.provider_name(),
        tickers = tickers.len(),
        "starting tui"
    );

    // Load persisted state
    let persisted = persistence::load(&state_path);

    // Worker channels
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle = worker::spawn_worker(pipeline, cmd_rx, resp_tx)?;

    // Build app state
    let mut app = AppState::new(config, tickers, cmd_tx.clone(), resp_rx);
    persistence::apply(&mut app, persisted);
    if let Some(msg) = config_error {
        app.push_error(
            ErrorCategory::Config,
            msg,
            config_path.display().to_string(),
        );
    }

    // The page loads the selected ticker straight away.
    app.request_run();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the main event loop
    let result = run_app(&mut terminal, &mut app);

    // Save state before exit
    let persisted = persistence::extract(&app);
    if let Err(e) = persistence::save(&state_path, &persisted) {
        tracing::warn!(error = %e, "failed to save ui state");
    }

    // Shutdown worker
    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Drain worker responses (non-blocking)
        while let Ok(resp) = app.worker_rx.try_recv() {
            app.handle_response(resp);
        }

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}

/// A missing file means defaults; a broken one means defaults plus an error to show.
fn load_config(path: &Path) -> (PipelineConfig, Option<String>) {
    if !path.exists() {
        return (PipelineConfig::default(), None);
    }
    match PipelineConfig::from_file(path) {
        Ok(config) => (config, None),
        Err(e) => (
            PipelineConfig::default(),
            Some(format!("config ignored, using defaults: {e}")),
        ),
    }
}

/// The terminal belongs to the UI, so logs only go to a file and only when
/// `RUST_LOG` asks for them.
fn init_logging(dir: &Path) -> Result<()> {
    let Ok(filter) = EnvFilter::try_from_default_env() else {
        return Ok(());
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("trendcast-tui.log");
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
