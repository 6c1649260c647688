mod app;
mod binder;
mod cache;
mod client;
mod config;
mod constants;
mod display;
mod error;
mod gallery;
mod graphics;
mod input;
mod model;
mod scheduler;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use cache::{ImageCache, MemoryPressure, Purge, SearchCache};
use client::{FetchClient, ReqwestTransport};
use config::Config;
use constants::constants;
use display::{CliDisplayMode, DisplayMode};
use gallery::{FileGallery, Gallery};
use graphics::{kitty_delete_all, kitty_render_image};
use scheduler::{UiHandle, UiScheduler};
use theme::theme_index;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Display mode: 'auto', 'kitty', 'direct', or 'ascii' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Iconfinder API token (overrides the environment and prefs.toml)
  #[arg(short, long)]
  token: Option<String>,

  /// Directory saved icons are written to
  #[arg(short, long)]
  save_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print shell completions to stdout
  Completions { shell: Shell },
}

// --- Logging ---

/// Log to a daily file; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
  let dir = config::data_dir();
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;
  let appender = tracing_appender::rolling::daily(&dir, &constants().log_file_prefix);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env(&constants().log_env_var).unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .context("Failed to install tracing subscriber")?;
  Ok(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(Command::Completions { shell }) = args.command {
    clap_complete::generate(shell, &mut Args::command(), "icon-search", &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = init_logging()?;

  let config = Config::load();
  let Some(token) = config.resolve_token(args.token.as_deref()) else {
    anyhow::bail!(
      "No Iconfinder API token. Pass --token, set {}, or add api_token to prefs.toml.",
      constants().token_env_var
    );
  };
  let save_dir = args.save_dir.clone().or_else(|| config.save_dir.clone()).unwrap_or_else(FileGallery::default_dir);
  let display_mode = display::resolve_display_mode(args.display_mode);
  info!(display = display_mode.label(), save_dir = %save_dir.display(), "starting");

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, display_mode, &config, token, save_dir).await;
  ratatui::restore();
  result
}

/// Clear caches on SIGUSR1, the closest thing a terminal app gets to a memory warning.
#[cfg(unix)]
fn spawn_memory_signal(ui: UiHandle<App>) -> Result<()> {
  use tokio::signal::unix::{SignalKind, signal};

  let mut stream = signal(SignalKind::user_defined1()).context("Failed to listen for SIGUSR1")?;
  tokio::spawn(async move {
    while stream.recv().await.is_some() {
      info!("memory pressure: SIGUSR1");
      if !ui.post(|app: &mut App| app.memory_pressure()) {
        break;
      }
    }
  });
  Ok(())
}

#[cfg(not(unix))]
fn spawn_memory_signal(_ui: UiHandle<App>) -> Result<()> {
  Ok(())
}

async fn run(
  terminal: &mut DefaultTerminal,
  display_mode: DisplayMode,
  config: &Config,
  token: String,
  save_dir: PathBuf,
) -> Result<()> {
  let searches = SearchCache::new("search");
  let images = ImageCache::new("image");
  let pressure = MemoryPressure::new();
  pressure.register(Arc::new(searches.clone()) as Arc<dyn Purge>);
  pressure.register(Arc::new(images.clone()) as Arc<dyn Purge>);

  let fetch = Arc::new(FetchClient::new(
    Arc::new(ReqwestTransport::new()),
    searches,
    images,
    constants().search_endpoint.clone(),
    token,
  ));
  let gallery: Arc<dyn Gallery> = Arc::new(FileGallery::new(save_dir));

  let mut scheduler: UiScheduler<App> = UiScheduler::new();
  spawn_memory_signal(scheduler.handle())?;
  let mut app = App::new(
    fetch,
    scheduler.handle(),
    gallery,
    pressure,
    display_mode,
    theme_index(config.theme_name.as_deref()),
  );

  loop {
    scheduler.run_pending(&mut app);
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if display_mode == DisplayMode::Kitty {
      sync_kitty_preview(&mut app)?;
    }

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        Event::Resize(..) => {
          app.gfx.last_sent = None;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  if display_mode == DisplayMode::Kitty
    && let Err(e) = kitty_delete_all()
  {
    warn!(err = %e, "kitty: cleanup failed");
  }
  info!("exiting");
  Ok(())
}

/// Re-send the preview image only when the icon or its area changed.
fn sync_kitty_preview(app: &mut App) -> Result<()> {
  let ready = match (app.gfx.preview_area, app.thumbnails.get(&app::PREVIEW_SLOT)) {
    (Some(area), Some(app::Thumb::Ready(asset))) => Some((area, asset)),
    _ => None,
  };
  match ready {
    Some((area, asset)) => {
      let key = (asset.url.clone(), area);
      if app.gfx.last_sent.as_ref() != Some(&key) {
        kitty_delete_all()?;
        kitty_render_image(&asset.image, area)?;
        app.gfx.last_sent = Some(key);
      }
    }
    None => {
      if app.gfx.last_sent.is_some() {
        kitty_delete_all()?;
        app.gfx.last_sent = None;
      }
    }
  }
  Ok(())
}
