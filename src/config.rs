use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::constants;

/// User preferences persisted in `prefs.toml` under the platform config dir.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub api_token: Option<String>,
  pub save_dir: Option<PathBuf>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "icon-search") {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Ok(config) = toml::from_str(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "icon-search") {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }

  /// Token precedence: explicit flag, then environment, then prefs file.
  pub fn resolve_token(&self, cli: Option<&str>) -> Option<String> {
    let env = std::env::var(&constants().token_env_var).ok();
    pick_token(cli, env.as_deref(), self.api_token.as_deref())
  }
}

fn pick_token(cli: Option<&str>, env: Option<&str>, prefs: Option<&str>) -> Option<String> {
  [cli, env, prefs].into_iter().flatten().map(str::trim).find(|t| !t.is_empty()).map(str::to_string)
}

/// Directory for log files.
pub fn data_dir() -> PathBuf {
  ProjectDirs::from("", "", "icon-search").map(|d| d.data_dir().to_path_buf()).unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flag_beats_env_and_prefs() {
    assert_eq!(pick_token(Some("cli"), Some("env"), Some("file")), Some("cli".to_string()));
  }

  #[test]
  fn env_beats_prefs() {
    assert_eq!(pick_token(None, Some("env"), Some("file")), Some("env".to_string()));
  }

  #[test]
  fn blank_values_are_skipped() {
    assert_eq!(pick_token(Some("  "), None, Some("file")), Some("file".to_string()));
    assert_eq!(pick_token(None, None, None), None);
  }

  #[test]
  fn prefs_round_trip_through_toml() {
    let config = Config {
      theme_name: Some("Dusk".to_string()),
      api_token: Some("abc".to_string()),
      save_dir: Some(PathBuf::from("/tmp/icons")),
    };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
  }

  #[test]
  fn missing_keys_default_to_none() {
    let config: Config = toml::from_str("theme_name = \"Paper\"").unwrap();
    assert_eq!(config.theme_name.as_deref(), Some("Paper"));
    assert_eq!(config.api_token, None);
    assert_eq!(config.save_dir, None);
  }
}
