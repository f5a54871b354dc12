//! Runtime configuration.
//!
//! A [`Config`] is stored as `config.toml` in the configuration directory
//! (`~/.yomu` by default). Every field has a default, so a partial file is
//! valid:
//!
//! ```toml
//! api_base_url       = "https://catalog.example.org"
//! database_path      = "/home/me/.local/share/yomu/yomu.db"
//! download_path      = "/home/me/Documents/yomu/downloads"
//! sources_path       = "/home/me/.yomu/sources"
//! page_concurrency   = 1
//! search_debounce_ms = 400
//! ```
//!
//! Leaving out `download_path` disables offline downloads. The
//! `YOMU_API_BASE_URL` environment variable, when set, replaces
//! `api_base_url` of a loaded configuration.

use std::time::Duration;

use super::*;
use crate::store::SqliteStore;

/// Catalog API used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Environment variable overriding [`Config::api_base_url`].
pub const API_BASE_URL_ENV: &str = "YOMU_API_BASE_URL";

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Settings of a [`Yomu`](crate::Yomu) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Base URL of the catalog API
  pub api_base_url:       String,
  /// SQLite database holding bookmarks, read state and the download manifest
  pub database_path:      PathBuf,
  /// Directory for downloaded pages; `None` disables downloads
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub download_path:      Option<PathBuf>,
  /// Directory searched for `<source>.toml` adapter overrides
  pub sources_path:       PathBuf,
  /// Pages fetched in parallel per chapter, clamped to `1..=8`
  pub page_concurrency:   usize,
  /// Settle delay before a debounced search hits the network
  pub search_debounce_ms: u64,
}

impl Default for Config {
  fn default() -> Self {
    let config_dir = Self::default_path().unwrap_or_else(|_| PathBuf::from(".yomu"));
    Self {
      api_base_url:       DEFAULT_API_BASE_URL.to_string(),
      database_path:      SqliteStore::default_path(),
      download_path:      Self::default_download_path(),
      sources_path:       config_dir.join("sources"),
      page_concurrency:   1,
      search_debounce_ms: 400,
    }
  }
}

impl Config {
  /// Returns the default configuration directory, `~/.yomu`.
  ///
  /// # Errors
  ///
  /// Returns [`YomuError::Config`] when no home directory can be determined.
  pub fn default_path() -> Result<PathBuf> {
    dirs::home_dir()
      .map(|home| home.join(".yomu"))
      .ok_or_else(|| YomuError::Config("Could not determine home directory".into()))
  }

  /// Returns the default download directory.
  ///
  /// The path is constructed as follows:
  /// - On Unix: `~/Documents/yomu/downloads`
  /// - On macOS: `~/Documents/yomu/downloads`
  /// - On Windows: `%USERPROFILE%\Documents\yomu\downloads`
  ///
  /// `None` when the platform has no document directory.
  pub fn default_download_path() -> Option<PathBuf> {
    dirs::document_dir().map(|docs| docs.join("yomu").join("downloads"))
  }

  /// Reads `config.toml` from `dir` and applies environment overrides.
  ///
  /// # Errors
  ///
  /// - [`YomuError::Config`] when the file does not exist
  /// - [`YomuError::TomlDe`] when it cannot be parsed
  pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
    let path = dir.as_ref().join(CONFIG_FILE);
    if !path.is_file() {
      return Err(YomuError::Config(format!(
        "No configuration at {}. Run `yomu init` first.",
        path.display()
      )));
    }
    debug!("Loading configuration from {}", path.display());
    let config: Config = toml::from_str(&std::fs::read_to_string(&path)?)?;
    Ok(config.with_env_overrides())
  }

  /// Writes this configuration to `config.toml` in `dir`, creating `dir`.
  pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(CONFIG_FILE), toml::to_string_pretty(self)?)?;
    debug!("Saved configuration to {}", dir.join(CONFIG_FILE).display());
    Ok(())
  }

  /// Applies `YOMU_API_BASE_URL` when it is set and not blank.
  pub fn with_env_overrides(mut self) -> Self {
    if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
      if !url.trim().is_empty() {
        trace!("Using {API_BASE_URL_ENV}={url}");
        self.api_base_url = url.trim().to_string();
      }
    }
    self
  }

  /// Sets the catalog API base URL.
  pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
    self.api_base_url = url.into();
    self
  }

  /// Sets the database file.
  pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.database_path = path.into();
    self
  }

  /// Sets the download directory; `None` disables downloads.
  pub fn with_download_path(mut self, path: Option<PathBuf>) -> Self {
    self.download_path = path;
    self
  }

  /// Sets the directory of adapter overrides.
  pub fn with_sources_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.sources_path = path.into();
    self
  }

  /// Sets how many pages of a chapter are fetched at once.
  pub fn with_page_concurrency(mut self, concurrency: usize) -> Self {
    self.page_concurrency = concurrency;
    self
  }

  /// Sets the search settle delay.
  pub fn with_search_debounce_ms(mut self, millis: u64) -> Self {
    self.search_debounce_ms = millis;
    self
  }

  /// The search settle delay.
  pub fn search_debounce(&self) -> Duration { Duration::from_millis(self.search_debounce_ms) }
}
