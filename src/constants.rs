//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` and parsed once on first access.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Constants {
  // Search API
  pub search_endpoint: String,
  pub result_count: u32,
  pub premium: bool,
  pub vector: bool,
  pub format: String,
  pub search_timeout_secs: u64,

  // Row rendering
  pub tag_limit: usize,
  pub row_thumb_width: u16,
  pub row_thumb_height: u16,
  pub preview_width_percent: u16,

  // Environment
  pub log_file_prefix: String,
  pub token_env_var: String,
  pub log_env_var: String,
}

impl Constants {
  pub fn search_timeout(&self) -> Duration {
    Duration::from_secs(self.search_timeout_secs)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; a malformed file fails the first test run.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.result_count, 1000);
    assert!(!c.premium);
    assert!(!c.vector);
    assert_eq!(c.format, "png");
    assert_eq!(c.search_timeout(), Duration::from_secs(1000));
    assert_eq!(c.tag_limit, 10);
  }
}
