//! Binds in-flight thumbnail fetches to reusable list slots.
//!
//! Each slot owns at most one fetch token. Starting a new load for a slot
//! cancels the old token; a completion is delivered only if, when it reaches
//! the UI context, its token is still the one bound to the slot. Cancellation
//! is cooperative: the underlying request may run to completion, its result
//! is simply dropped at delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::client::{FetchClient, ImageAsset};
use crate::error::FetchError;
use crate::scheduler::UiHandle;

/// Stable identifier of a UI slot (a visible list row).
pub type SlotId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
  Idle,
  Pending(u64),
}

#[derive(Clone)]
struct FetchToken {
  id: u64,
  cancelled: Arc<AtomicBool>,
}

impl FetchToken {
  fn cancel(&self) {
    self.cancelled.store(true, Ordering::Release);
  }

  fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Acquire)
  }
}

#[derive(Default)]
struct Bindings {
  next_id: u64,
  slots: HashMap<SlotId, FetchToken>,
}

impl Bindings {
  fn unbind(&mut self, slot: SlotId) -> Option<FetchToken> {
    let token = self.slots.remove(&slot)?;
    token.cancel();
    Some(token)
  }

  fn bind(&mut self, slot: SlotId) -> FetchToken {
    self.unbind(slot);
    self.next_id += 1;
    let token = FetchToken { id: self.next_id, cancelled: Arc::new(AtomicBool::new(false)) };
    self.slots.insert(slot, token.clone());
    token
  }

  /// Unbind `slot` only if `token` is still its live binding.
  fn settle(&mut self, slot: SlotId, token: &FetchToken) -> bool {
    match self.slots.get(&slot) {
      Some(current) if current.id == token.id && !token.is_cancelled() => {
        self.slots.remove(&slot);
        true
      }
      _ => false,
    }
  }
}

pub struct ImageLoadBinder<S> {
  client: Arc<FetchClient>,
  ui: UiHandle<S>,
  bindings: Arc<Mutex<Bindings>>,
}

impl<S> Clone for ImageLoadBinder<S> {
  fn clone(&self) -> Self {
    Self { client: Arc::clone(&self.client), ui: self.ui.clone(), bindings: Arc::clone(&self.bindings) }
  }
}

impl<S: 'static> ImageLoadBinder<S> {
  pub fn new(client: Arc<FetchClient>, ui: UiHandle<S>) -> Self {
    Self { client, ui, bindings: Arc::new(Mutex::new(Bindings::default())) }
  }

  /// Load `url` into `slot`. Must be called from the UI context.
  ///
  /// A cache hit calls `on_ready` before returning. Otherwise the fetch runs on
  /// a worker and `on_ready` is invoked later through the UI scheduler, unless
  /// the slot has been cancelled or rebound by then.
  pub fn load<F>(&self, state: &mut S, slot: SlotId, url: &str, on_ready: F)
  where
    F: FnOnce(&mut S, Result<ImageAsset, FetchError>) + Send + 'static,
  {
    if let Some(asset) = self.client.cached_image(url) {
      // A stale in-flight fetch must not overwrite the cached image later.
      self.cancel(slot);
      on_ready(state, Ok(asset));
      return;
    }

    let token = self.lock().bind(slot);
    debug!(slot, token = token.id, url = %url, "binder: fetch started");

    let client = Arc::clone(&self.client);
    let ui = self.ui.clone();
    let bindings = Arc::clone(&self.bindings);
    let url = url.to_string();
    tokio::spawn(async move {
      let result = if token.is_cancelled() { Err(FetchError::Cancelled) } else { client.download_image(&url).await };
      ui.post(move |state: &mut S| {
        let current = bindings.lock().unwrap_or_else(PoisonError::into_inner).settle(slot, &token);
        if !current {
          debug!(slot, token = token.id, url = %url, "binder: dropped stale result");
          return;
        }
        match result {
          Err(e) if e.is_cancelled() => {}
          Err(e) => {
            warn!(slot, url = %url, err = %e, "binder: fetch failed");
            on_ready(state, Err(e));
          }
          Ok(asset) => on_ready(state, Ok(asset)),
        }
      });
    });
  }

  /// Cancel and unbind the slot's fetch, if any. Caches are left alone.
  pub fn cancel(&self, slot: SlotId) {
    if let Some(token) = self.lock().unbind(slot) {
      debug!(slot, token = token.id, "binder: cancelled");
    }
  }

  pub fn cancel_all(&self) {
    let mut bindings = self.lock();
    let slots: Vec<SlotId> = bindings.slots.keys().copied().collect();
    for slot in slots {
      bindings.unbind(slot);
    }
  }

  pub fn slot_state(&self, slot: SlotId) -> SlotState {
    match self.lock().slots.get(&slot) {
      Some(token) => SlotState::Pending(token.id),
      None => SlotState::Idle,
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Bindings> {
    self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
