//! wxdash - current weather and forecast in the terminal
//!
//! Resolves a starting place, then either prints the dashboard once or runs
//! the interactive TUI, feeding load and search results back over channels.

use std::fs::OpenOptions;
use std::io;
use std::panic;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{Local, Timelike};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use wxdash::app::{App, AppCommand};
use wxdash::cache::ExpiringCache;
use wxdash::cli::{Cli, StartTarget, StartupConfig};
use wxdash::config::{build_provider, ConfigError, Settings};
use wxdash::data::{IpLocator, Place};
use wxdash::pipeline::{LoadEvent, LoadPipeline, StartupSource};
use wxdash::render::{greeting, render_dashboard, RenderContext};
use wxdash::search::{SearchMessage, SuggestionSearch};
use wxdash::ui;

const LOG_FILE: &str = "wxdash.log";

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Logs to stderr for one-shot runs, or to a file next to the cache in TUI mode
fn init_logging(once: bool, cache_dir: &Path) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wxdash=info"));

    if once {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        std::fs::create_dir_all(cache_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(cache_dir.join(LOG_FILE))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Coordinates for the first load, plus the place they came from if known
async fn resolve_start(
    pipeline: &LoadPipeline,
    locator: &IpLocator,
    target: &StartTarget,
) -> Result<(f64, f64, Option<Place>), Box<dyn std::error::Error>> {
    match target {
        StartTarget::Search(query) => {
            let place = pipeline
                .provider()
                .geocode(query, 1)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| format!("No place found for '{}'", query))?;
            Ok((place.lat, place.lon, Some(place)))
        }
        StartTarget::Coords { lat, lon } => Ok((*lat, *lon, None)),
        StartTarget::Here => match locator.locate().await {
            Ok(place) => Ok((place.lat, place.lon, Some(place))),
            Err(e) => {
                tracing::warn!("IP location failed: {}", e);
                eprintln!("Couldn't get your location; using the last or default place.");
                let place = pipeline.last_place().unwrap_or_else(Place::default_place);
                Ok((place.lat, place.lon, Some(place)))
            }
        },
        StartTarget::Remembered => {
            let (place, source) = pipeline.startup_place(locator).await;
            match source {
                StartupSource::LastViewed => tracing::info!("Resuming at {}", place.display_name()),
                StartupSource::IpLocated => tracing::info!("Located at {}", place.display_name()),
                StartupSource::Default => tracing::info!("Using default place"),
            }
            Ok((place.lat, place.lon, Some(place)))
        }
    }
}

/// Loads once and prints the freshest render
async fn run_once(
    pipeline: &LoadPipeline,
    settings: &Settings,
    config: &StartupConfig,
    start: (f64, f64, Option<Place>),
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::channel(4);
    let (lat, lon, place) = start;
    pipeline
        .load_by_coords(lat, lon, place, settings.units, &tx)
        .await;
    drop(tx);

    let mut latest = None;
    while let Some(event) = rx.recv().await {
        match event {
            LoadEvent::Rendered { weather, place, .. } => latest = Some((weather, place)),
            LoadEvent::Failed { notice } => return Err(notice.into()),
        }
    }

    let (weather, place) = latest.ok_or("No weather received")?;
    let ctx = RenderContext::new(settings.units, config.locale);
    println!("{}", greeting(Local::now().hour(), &settings.user_name));
    println!();
    println!("{}", render_dashboard(&weather, &place, &ctx));
    Ok(())
}

/// Channels and workers the event loop dispatches commands to
struct Runtime {
    pipeline: LoadPipeline,
    locator: IpLocator,
    search: SuggestionSearch,
    load_tx: mpsc::Sender<LoadEvent>,
    locate_tx: mpsc::Sender<Result<Place, String>>,
}

impl Runtime {
    fn run_commands(&mut self, app: &mut App) {
        for command in app.take_commands() {
            match command {
                AppCommand::Load { lat, lon, place } => {
                    let pipeline = self.pipeline.clone();
                    let tx = self.load_tx.clone();
                    let units = app.settings.units;
                    tokio::spawn(async move {
                        pipeline.load_by_coords(lat, lon, place, units, &tx).await;
                    });
                }
                AppCommand::Search(query) => {
                    self.search.dispatch(&query);
                }
                AppCommand::CancelSearch => {
                    self.search.cancel();
                }
                AppCommand::Locate => {
                    let locator = self.locator.clone();
                    let tx = self.locate_tx.clone();
                    tokio::spawn(async move {
                        let result = locator.locate().await.map_err(|e| e.to_string());
                        let _ = tx.send(result).await;
                    });
                }
                AppCommand::SaveSettings => {
                    if let Err(e) = app.settings.save(self.pipeline.cache()) {
                        tracing::warn!("{}", e);
                        app.set_notice(e.to_string());
                    }
                }
            }
        }
    }
}

async fn run_tui(
    pipeline: LoadPipeline,
    settings: Settings,
    config: &StartupConfig,
    start: (f64, f64, Option<Place>),
) -> Result<(), Box<dyn std::error::Error>> {
    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (load_tx, mut load_rx) = mpsc::channel(32);
    let (search_tx, mut search_rx) = mpsc::channel::<SearchMessage>(32);
    let (locate_tx, mut locate_rx) = mpsc::channel(4);

    let mut runtime = Runtime {
        search: SuggestionSearch::new(pipeline.provider(), search_tx),
        pipeline,
        locator: IpLocator::new(),
        load_tx,
        locate_tx,
    };

    let mut app = App::new(settings, config.locale);
    let (lat, lon, place) = start;
    app.request_load(lat, lon, place);

    // Main event loop
    loop {
        runtime.run_commands(&mut app);

        terminal.draw(|f| ui::render_app(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        while let Ok(event) = load_rx.try_recv() {
            app.apply_load_event(event);
        }
        while let Ok(message) = search_rx.try_recv() {
            if runtime.search.is_current(message.generation()) {
                app.apply_search_message(message);
            }
        }
        while let Ok(result) = locate_rx.try_recv() {
            match result {
                Ok(place) => app.request_load(place.lat, place.lon, Some(place)),
                Err(e) => {
                    tracing::warn!("IP location failed: {}", e);
                    app.set_notice("Couldn't get your location. Please search manually.");
                }
            }
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = StartupConfig::from_cli(&cli)?;

    let cache = match &config.cache_dir {
        Some(dir) => ExpiringCache::with_dir(dir.clone()),
        None => ExpiringCache::new().ok_or(ConfigError::NoCacheDir)?,
    };
    init_logging(config.once, cache.dir())?;

    let mut settings = Settings::load(&cache);
    if let Some(units) = config.units {
        settings.units = units;
        settings.save(&cache)?;
    }

    let provider = build_provider(config.provider, config.api_key.as_deref(), cache.clone())?;
    let pipeline = LoadPipeline::new(provider, cache);
    let locator = IpLocator::new();

    let start = resolve_start(&pipeline, &locator, &config.target).await?;

    if config.once {
        run_once(&pipeline, &settings, &config, start).await
    } else {
        run_tui(pipeline, settings, &config, start).await
    }
}
