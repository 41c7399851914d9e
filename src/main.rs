//! Stonkcast - stock symbol lookup and growth prediction in the terminal.

mod api;
mod app;
mod cli;
mod config;
mod controller;
mod error;
mod highlight;
mod logging;
mod models;
mod ui;

use anyhow::{Context, Result};
use api::{HttpPredictionService, PredictionService};
use app::App;
use cli::Args;
use config::Config;
use error::ValidationError;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use models::{PredictOutcome, PredictionRequest, PredictionStatus};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();

    let log_path = args.log_file.clone().unwrap_or_else(logging::default_log_path);
    if let Err(e) = logging::init(&log_path, args.verbose) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    // Load configuration
    let mut config = match args.config {
        // --init-config may create the file
        Some(ref path) if args.init_config && !path.exists() => Config::default(),
        Some(ref path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                eprintln!();
                eprintln!("Sample config:");
                eprintln!("{}", config::sample_config());
                std::process::exit(1);
            }
        },
        None => Config::load_or_default(),
    };
    config.merge_args(&args);

    if args.init_config {
        let path = args
            .config
            .clone()
            .or_else(Config::default_config_path)
            .context("No configuration directory available; pass --config")?;
        config.save(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let service = HttpPredictionService::new(&config.service.base_url, config.service.timeout)?;
    info!(base_url = service.base_url(), "stonkcast starting");

    // Run in batch mode or interactive mode
    if args.is_batch() {
        return run_batch(&service, &args, &config).await;
    }

    let mut app = App::new(Arc::new(service), &config);
    run_interactive(&mut app).await
}

/// Run one suggest or predict request without the TUI.
async fn run_batch(service: &HttpPredictionService, args: &Args, config: &Config) -> Result<()> {
    match (&args.suggest, &args.predict, args.days) {
        (Some(query), _, _) => run_suggest(service, query, config.input.min_query_chars).await,
        (None, Some(symbol), Some(days)) => run_predict(service, symbol, days).await,
        _ => anyhow::bail!("--predict requires --days"),
    }
}

/// Print suggestions for one query (batch mode).
async fn run_suggest(service: &HttpPredictionService, query: &str, min_chars: usize) -> Result<()> {
    let query = query.trim();
    if query.chars().count() < min_chars {
        anyhow::bail!("Query must be at least {} characters", min_chars);
    }

    let stocks = service
        .suggestions(query, CancellationToken::new())
        .await
        .context("Failed to fetch stock suggestions")?;

    for stock in stocks {
        println!("{}\t{}", stock.symbol, stock.name);
    }

    Ok(())
}

/// Request one prediction and print the status line (batch mode).
async fn run_predict(service: &HttpPredictionService, symbol: &str, days: u32) -> Result<()> {
    if days == 0 {
        return Err(ValidationError::InvalidHorizon.into());
    }
    let request = PredictionRequest {
        symbol: symbol.trim().to_string(),
        horizon_days: days,
    };

    let status = match service.predict(&request).await {
        Ok(PredictOutcome::Growth(growth)) => PredictionStatus::Growth(growth),
        Ok(PredictOutcome::Rejected(message)) => PredictionStatus::Rejected(message),
        Err(e) => {
            warn!(error = %e, symbol = %request.symbol, "failed to fetch prediction");
            eprintln!("Error: {}", e);
            PredictionStatus::Failed
        }
    };

    println!("{}", status);
    if status.is_failure() {
        std::process::exit(1);
    }

    Ok(())
}

/// Run in interactive mode with TUI.
async fn run_interactive<S: PredictionService>(app: &mut App<S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut terminal = match setup_terminal() {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = restore_terminal(&mut io::stdout());
            return Err(e);
        }
    };

    // Main loop
    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    restore_terminal(terminal.backend_mut())?;
    terminal.show_cursor()?;

    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Leave raw mode, the alternate screen and mouse capture.
fn restore_terminal<W: io::Write>(out: &mut W) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(out, LeaveAlternateScreen, DisableMouseCapture)
}

/// Main application loop.
async fn run_app<S: PredictionService>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    let mut layout = None;

    loop {
        // Apply finished timers and requests before drawing
        app.drain_events();

        terminal.draw(|f| layout = Some(ui::render(f, app)))?;

        // Handle events with timeout
        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => {
                    if let Some(ref layout) = layout {
                        app.handle_mouse(mouse, layout);
                    }
                }
                _ => {}
            }
        }

        if app.should_quit() {
            break;
        }
    }

    info!("stonkcast exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_terminal_leaves_alternate_screen() {
        let mut out = Vec::new();
        restore_terminal(&mut out).unwrap();

        let written = String::from_utf8_lossy(&out);
        assert!(written.contains("\x1b[?1049l"));
    }

    #[tokio::test]
    async fn test_zero_days_rejected_without_request() {
        let service = HttpPredictionService::new("http://127.0.0.1:9", 1).unwrap();
        let err = run_predict(&service, "AAPL", 0).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::InvalidHorizon)
        );
    }
}
