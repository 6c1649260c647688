//! Local-storage collaborator for the save-image workflow.

use anyhow::{Context, Result};
use directories::UserDirs;
use image::ImageFormat;
use std::path::PathBuf;
use tracing::info;

use crate::client::ImageAsset;

/// Somewhere a decoded image can be kept on the device.
pub trait Gallery: Send + Sync {
  fn save(&self, asset: &ImageAsset, icon_id: u64) -> Result<PathBuf>;
}

/// Writes PNG files into a directory, creating it on first save.
pub struct FileGallery {
  dir: PathBuf,
}

impl FileGallery {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// The user's picture directory, falling back to the current directory.
  pub fn default_dir() -> PathBuf {
    UserDirs::new()
      .and_then(|dirs| dirs.picture_dir().map(|p| p.join("icon-search")))
      .unwrap_or_else(|| PathBuf::from("icon-search"))
  }
}

impl Gallery for FileGallery {
  fn save(&self, asset: &ImageAsset, icon_id: u64) -> Result<PathBuf> {
    std::fs::create_dir_all(&self.dir).with_context(|| format!("Failed to create {}", self.dir.display()))?;
    let path = self.dir.join(format!("icon-{}.png", icon_id));
    asset
      .image
      .save_with_format(&path, ImageFormat::Png)
      .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(icon_id, path = %path.display(), "gallery: saved");
    Ok(path)
  }
}
