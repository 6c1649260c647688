use anyhow::{Context, Result};
use ratatui::{layout::Rect, widgets::ListState};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::binder::{ImageLoadBinder, SlotId, SlotState};
use crate::cache::MemoryPressure;
use crate::client::{FetchClient, ImageAsset};
use crate::config::Config;
use crate::display::DisplayMode;
use crate::error::FetchError;
use crate::gallery::Gallery;
use crate::model::{IconRecord, SearchResult};
use crate::scheduler::UiHandle;
use crate::theme::THEMES;

/// Slot of the preview pane; list rows use `0..visible_rows`.
pub const PREVIEW_SLOT: SlotId = SlotId::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
}

/// What a slot currently shows. A bound slot with no entry is still loading.
#[derive(Debug, Clone)]
pub enum Thumb {
  Ready(ImageAsset),
  Failed,
}

/// Kitty graphics state for the preview pane.
#[derive(Default)]
pub struct GraphicsCache {
  pub preview_area: Option<Rect>,
  pub last_sent: Option<(String, Rect)>,
}

#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) search_rx: Option<oneshot::Receiver<(String, Result<SearchResult, FetchError>)>>,
  pub(crate) saving: Option<u64>,
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  /// The presenter's own copy of the current result set; the cached one is never mutated.
  pub results: Option<SearchResult>,
  pub list_state: ListState,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  pub info_message: Option<String>,
  pub should_quit: bool,
  pub input_scroll: usize,
  pub gfx: GraphicsCache,
  pub thumbnails: HashMap<SlotId, Thumb>,
  /// Icon currently bound to each slot.
  slot_icons: HashMap<SlotId, u64>,
  fetch: Arc<FetchClient>,
  binder: ImageLoadBinder<App>,
  ui: UiHandle<App>,
  gallery: Arc<dyn Gallery>,
  pressure: MemoryPressure,
  pub(crate) tasks: AsyncTasks,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(
    fetch: Arc<FetchClient>,
    ui: UiHandle<App>,
    gallery: Arc<dyn Gallery>,
    pressure: MemoryPressure,
    display_mode: DisplayMode,
    theme_index: usize,
  ) -> Self {
    let binder = ImageLoadBinder::new(Arc::clone(&fetch), ui.clone());
    Self {
      input: String::new(),
      cursor_position: 0,
      mode: AppMode::Input,
      theme_index: theme_index.min(THEMES.len() - 1),
      display_mode,
      results: None,
      list_state: ListState::default(),
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      input_scroll: 0,
      gfx: GraphicsCache::default(),
      thumbnails: HashMap::new(),
      slot_icons: HashMap::new(),
      fetch,
      binder,
      ui,
      gallery,
      pressure,
      tasks: AsyncTasks::default(),
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    &THEMES[self.theme_index]
  }

  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after 5 seconds.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(5)
    {
      self.clear_error();
    }
  }

  pub fn has_results(&self) -> bool {
    self.results.as_ref().is_some_and(|r| !r.is_empty())
  }

  pub fn selected_icon(&self) -> Option<&IconRecord> {
    let idx = self.list_state.selected()?;
    self.results.as_ref()?.icons.get(idx)
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    let mut config = Config::load();
    config.theme_name = Some(self.theme().name.to_string());
    config.save();
  }

  /// Drop every cached search and image, as on a host memory warning.
  pub fn memory_pressure(&mut self) {
    let dropped = self.pressure.notify();
    self.info_message = Some(format!("Freed {} cached entries.", dropped));
  }

  // --- Search ---

  /// Run a search for `query`, used verbatim. A cached result is shown immediately.
  pub fn search_requested(&mut self, query: &str) {
    if query.is_empty() {
      self.set_error("Enter a search term.".to_string());
      return;
    }
    self.clear_error();
    self.info_message = None;
    self.tasks.search_rx = None;

    if let Some(result) = self.fetch.cached_search(query) {
      debug!(query = %query, "search: served from cache");
      self.status_message = None;
      self.present_results(query, result);
      return;
    }

    info!(query = %query, "search triggered");
    self.status_message = Some(format!("Searching '{}'…", query));
    let fetch = Arc::clone(&self.fetch);
    let query = query.to_string();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = fetch.search(&query).await;
      let _ = tx.send((query, result));
    });
    self.tasks.search_rx = Some(rx);
  }

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.search_rx.take() {
      match rx.try_recv() {
        Ok((query, result)) => {
          self.status_message = None;
          match result {
            Ok(result) => self.present_results(&query, result),
            Err(e) => self.set_error(format!("Search failed: {}", e)),
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.search_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Search task failed.".to_string());
        }
      }
    }
  }

  fn present_results(&mut self, query: &str, result: SearchResult) {
    // Rows are about to show different icons; nothing in flight may land on them.
    self.binder.cancel_all();
    self.thumbnails.clear();
    self.slot_icons.clear();
    self.gfx.last_sent = None;

    if result.is_empty() {
      self.results = None;
      self.list_state = ListState::default();
      self.mode = AppMode::Input;
      self.set_error("No icons found. Try another query.".to_string());
      return;
    }

    self.info_message = Some(format!("{} icons for '{}' ({} total)", result.icons.len(), query, result.total_count));
    self.results = Some(result);
    self.list_state = ListState::default().with_selected(Some(0));
    self.mode = AppMode::Results;
  }

  // --- Image slots ---

  /// Start loading `url` into `slot`, replacing whatever the slot was loading.
  pub fn image_requested(&mut self, slot: SlotId, url: &str) {
    self.thumbnails.remove(&slot);
    let binder = self.binder.clone();
    binder.load(self, slot, url, move |app: &mut App, result: Result<ImageAsset, FetchError>| {
      let thumb = match result {
        Ok(asset) => Thumb::Ready(asset),
        Err(_) => Thumb::Failed,
      };
      app.thumbnails.insert(slot, thumb);
    });
  }

  pub fn slot_loading(&self, slot: SlotId) -> bool {
    matches!(self.binder.slot_state(slot), SlotState::Pending(_))
  }

  /// The slot left the screen or is about to be reused.
  pub fn image_slot_released(&mut self, slot: SlotId) {
    self.binder.cancel(slot);
    self.thumbnails.remove(&slot);
    self.slot_icons.remove(&slot);
  }

  fn bind_icon(&mut self, slot: SlotId, icon_id: u64, url: Option<String>) {
    if self.slot_icons.get(&slot) == Some(&icon_id) {
      return;
    }
    self.image_slot_released(slot);
    self.slot_icons.insert(slot, icon_id);
    match url {
      Some(url) => self.image_requested(slot, &url),
      None => {
        self.thumbnails.insert(slot, Thumb::Failed);
      }
    }
  }

  /// Bind list rows `0..count` to icons `offset..offset + count`, releasing the rest.
  pub fn sync_visible_slots(&mut self, offset: usize, count: usize) {
    let wanted: Vec<(u64, Option<String>)> = match &self.results {
      Some(result) => {
        result.icons.iter().skip(offset).take(count).map(|i| (i.icon_id, i.thumbnail_url().map(str::to_string))).collect()
      }
      None => Vec::new(),
    };

    let stale: Vec<SlotId> =
      self.slot_icons.keys().copied().filter(|&slot| slot != PREVIEW_SLOT && slot >= wanted.len()).collect();
    for slot in stale {
      self.image_slot_released(slot);
    }
    for (slot, (icon_id, url)) in wanted.into_iter().enumerate() {
      self.bind_icon(slot, icon_id, url);
    }
  }

  /// Keep the preview slot bound to the selected icon.
  pub fn sync_preview(&mut self) {
    match self.selected_icon().map(|i| (i.icon_id, i.thumbnail_url().map(str::to_string))) {
      Some((icon_id, url)) => self.bind_icon(PREVIEW_SLOT, icon_id, url),
      None => self.image_slot_released(PREVIEW_SLOT),
    }
  }

  // --- Save to gallery ---

  pub fn trigger_save(&mut self) {
    let Some(icon) = self.selected_icon() else { return };
    let icon_id = icon.icon_id;
    if icon.saved_locally {
      self.info_message = Some("Already saved.".to_string());
      return;
    }
    let Some(url) = icon.preview_url().map(str::to_string) else {
      self.set_error("This icon has no image to save.".to_string());
      return;
    };
    if self.tasks.saving.is_some() {
      self.info_message = Some("A save is already in progress.".to_string());
      return;
    }

    info!(icon_id, url = %url, "save triggered");
    self.clear_error();
    self.status_message = Some("Saving…".to_string());
    self.tasks.saving = Some(icon_id);

    let fetch = Arc::clone(&self.fetch);
    let gallery = Arc::clone(&self.gallery);
    let ui = self.ui.clone();
    tokio::spawn(async move {
      let result = save_icon(fetch, gallery, url, icon_id).await;
      ui.post(move |app: &mut App| app.finish_save(icon_id, result));
    });
  }

  fn finish_save(&mut self, icon_id: u64, result: Result<PathBuf>) {
    self.tasks.saving = None;
    self.status_message = None;
    match result {
      Ok(path) => {
        if let Some(icon) = self.results.as_mut().and_then(|r| r.find_mut(icon_id)) {
          icon.saved_locally = true;
        }
        self.info_message = Some(format!("Saved to {}", path.display()));
      }
      Err(e) => {
        let msg = format!("{:#}", e);
        warn!(icon_id, err = %msg, "save failed");
        self.set_error(format!("Could not save image: {}", msg));
      }
    }
  }
}

async fn save_icon(fetch: Arc<FetchClient>, gallery: Arc<dyn Gallery>, url: String, icon_id: u64) -> Result<PathBuf> {
  let asset = fetch.download_image(&url).await.context("Failed to download image")?;
  tokio::task::spawn_blocking(move || gallery.save(&asset, icon_id)).await.context("Save task panicked")?
}
