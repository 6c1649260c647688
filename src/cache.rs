//! In-memory key/value caches and the memory-pressure fan-out that clears them.
//!
//! Entries have no TTL. They live until a memory-pressure signal clears the
//! store or the process exits. A `put` on an existing key replaces the value.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

use crate::client::ImageAsset;
use crate::model::SearchResult;

/// Search results keyed by the verbatim query string.
pub type SearchCache = CacheStore<String, SearchResult>;

/// Decoded images keyed by the exact URL string.
pub type ImageCache = CacheStore<String, ImageAsset>;

/// Shared, thread-safe key/value store. Cloning shares the same storage.
///
/// Reads and writes go through an `RwLock`, so a `get` racing a `put` on the
/// same key sees either the old or the new value, never a torn one.
pub struct CacheStore<K, V> {
  name: &'static str,
  entries: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for CacheStore<K, V> {
  fn clone(&self) -> Self {
    Self { name: self.name, entries: Arc::clone(&self.entries) }
  }
}

impl<K, V> CacheStore<K, V>
where
  K: Eq + Hash,
  V: Clone,
{
  pub fn new(name: &'static str) -> Self {
    Self { name, entries: Arc::new(RwLock::new(HashMap::new())) }
  }

  pub fn get<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Eq + Hash + ?Sized,
  {
    self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
  }

  pub fn put(&self, key: K, value: V) {
    self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key, value);
  }

  #[cfg(test)]
  pub fn contains<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Eq + Hash + ?Sized,
  {
    self.entries.read().unwrap_or_else(PoisonError::into_inner).contains_key(key)
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Drop every entry. Returns how many were removed.
  pub fn clear_all(&self) -> usize {
    let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
    let dropped = entries.len();
    entries.clear();
    debug!(cache = self.name, dropped, "cache: cleared");
    dropped
  }
}

/// Anything that can give memory back when the host asks.
pub trait Purge: Send + Sync {
  fn label(&self) -> &'static str;
  fn purge(&self) -> usize;
}

impl<K, V> Purge for CacheStore<K, V>
where
  K: Eq + Hash + Send + Sync,
  V: Clone + Send + Sync,
{
  fn label(&self) -> &'static str {
    self.name
  }

  fn purge(&self) -> usize {
    self.clear_all()
  }
}

/// Fan-out point for the host's memory-pressure signal.
#[derive(Clone, Default)]
pub struct MemoryPressure {
  targets: Arc<Mutex<Vec<Arc<dyn Purge>>>>,
}

impl MemoryPressure {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&self, target: Arc<dyn Purge>) {
    self.targets.lock().unwrap_or_else(PoisonError::into_inner).push(target);
  }

  /// Clear every registered cache. Returns the total number of entries dropped.
  pub fn notify(&self) -> usize {
    let targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner).clone();
    let mut total = 0;
    for target in &targets {
      let dropped = target.purge();
      debug!(cache = target.label(), dropped, "memory pressure: purged");
      total += dropped;
    }
    info!(caches = targets.len(), dropped = total, "memory pressure: caches cleared");
    total
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn get_on_empty_store_is_absent() {
    let store: CacheStore<String, u32> = CacheStore::new("test");
    assert_eq!(store.get("cat"), None);
    assert!(store.is_empty());
  }

  #[test]
  fn last_write_wins() {
    let store = CacheStore::new("test");
    store.put("cat".to_string(), 1);
    store.put("cat".to_string(), 2);
    assert_eq!(store.get("cat"), Some(2));
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn keys_are_exact() {
    let store = CacheStore::new("test");
    store.put("cat".to_string(), 1);
    assert_eq!(store.get("cat "), None);
    assert_eq!(store.get("Cat"), None);
  }

  #[test]
  fn clones_share_storage() {
    let a = CacheStore::new("test");
    let b = a.clone();
    a.put("k".to_string(), 7);
    assert_eq!(b.get("k"), Some(7));
  }

  #[test]
  fn independent_instances_do_not_share_keys() {
    let searches: CacheStore<String, u32> = CacheStore::new("search");
    let images: CacheStore<String, u32> = CacheStore::new("image");
    searches.put("k".to_string(), 1);
    assert!(!images.contains("k"));
  }

  #[test]
  fn clear_all_reports_dropped_entries() {
    let store = CacheStore::new("test");
    store.put(1, "a");
    store.put(2, "b");
    assert_eq!(store.clear_all(), 2);
    assert_eq!(store.get(&1), None);
    assert_eq!(store.clear_all(), 0);
  }

  #[test]
  fn memory_pressure_clears_every_registered_cache() {
    let searches: CacheStore<String, u32> = CacheStore::new("search");
    let images: CacheStore<String, u32> = CacheStore::new("image");
    searches.put("cat".to_string(), 1);
    images.put("http://x/img.png".to_string(), 2);
    images.put("http://x/img2.png".to_string(), 3);

    let pressure = MemoryPressure::new();
    pressure.register(Arc::new(searches.clone()));
    pressure.register(Arc::new(images.clone()));

    assert_eq!(pressure.notify(), 3);
    assert_eq!(searches.get("cat"), None);
    assert_eq!(images.get("http://x/img.png"), None);
  }

  #[test]
  fn concurrent_puts_and_gets_never_tear() {
    let store: CacheStore<u32, (u64, u64)> = CacheStore::new("test");
    let writers: Vec<_> = (0..4u64)
      .map(|w| {
        let store = store.clone();
        std::thread::spawn(move || {
          for i in 0..500u64 {
            store.put(1, (w * 1000 + i, w * 1000 + i));
          }
        })
      })
      .collect();
    let reader = {
      let store = store.clone();
      std::thread::spawn(move || {
        for _ in 0..2000 {
          if let Some((a, b)) = store.get(&1) {
            assert_eq!(a, b);
          }
        }
      })
    };
    for w in writers {
      w.join().unwrap();
    }
    reader.join().unwrap();
    assert!(store.get(&1).is_some());
  }
}
