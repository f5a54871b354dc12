//! Content source adapters and source selection.
//!
//! A content source is one upstream manga catalog reached through the
//! catalog API. Every source is exposed through the same [`ContentSource`]
//! trait, so callers never deal with source-specific URL shapes or quirks.
//!
//! # Architecture
//!
//! - [`ContentSource`]: uniform async interface (search, info, pages)
//! - [`SourceConfig`]: TOML description of one source's endpoints, headers
//!   and page rewrites
//! - [`HttpSource`]: the [`ContentSource`] implementation driven by a
//!   [`SourceConfig`]
//! - [`SourceKind`]: the closed set of supported sources
//! - [`SourceRegistry`]: lazily builds and caches one adapter per source
//! - [`SourceSelector`]: resolves the active adapter from the persisted
//!   preference
//!
//! # Configuration
//!
//! Each source ships as a TOML file embedded in the crate. A file with the
//! same name in the user's sources directory replaces the embedded one:
//!
//! ```toml
//! name = "mangahere"
//! path = "manga/mangahere"
//!
//! [endpoints.search]
//! segments = ["{value}"]
//!
//! [endpoints.info]
//! segments = ["info"]
//! query    = "id"
//!
//! [endpoints.read]
//! segments = ["read"]
//! query    = "chapterId"
//!
//! [[page_rewrites]]
//! pattern     = "zjcdn\\.mangahere\\.org"
//! replacement = "zjcdn.mangahere.cc"
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use yomu::source::{ContentSource, HttpSource, SourceKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpSource::new(SourceKind::MangaDex.default_config()?, "http://localhost:3000")?;
//! let results = source.search_manga("one piece").await?;
//! for manga in &results.results {
//!   println!("{} ({})", manga.title, manga.id);
//! }
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, fmt};

use super::*;

mod config;
mod http;
mod registry;

pub use config::*;
pub use http::HttpSource;
pub use registry::*;

/// Uniform interface over one upstream manga catalog.
///
/// Implementations perform no retries; a failed call surfaces as
/// [`YomuError::Network`], [`YomuError::Upstream`] or
/// [`YomuError::InvalidPayload`] and the caller decides what to do.
#[async_trait]
pub trait ContentSource: Send + Sync {
  /// Name of the source, as used for source selection.
  fn name(&self) -> &str;

  /// Searches the catalog. The query is forwarded as-is, even when empty.
  async fn search_manga(&self, query: &str) -> Result<SearchResults>;

  /// Fetches one manga with its chapter list (possibly empty).
  async fn manga_info(&self, id: &str) -> Result<Manga>;

  /// Fetches the pages of one chapter, with source rewrites applied.
  async fn chapter_pages(&self, chapter_id: &str) -> Result<Vec<ChapterPage>>;
}

/// The closed set of supported sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
  /// MangaDex
  MangaDex,
  /// MangaHere
  MangaHere,
}

impl SourceKind {
  /// Every supported source, default first.
  pub const ALL: [SourceKind; 2] = [SourceKind::MangaDex, SourceKind::MangaHere];

  /// Name used in preferences and configuration files.
  pub fn as_str(&self) -> &'static str {
    match self {
      SourceKind::MangaDex => "mangadex",
      SourceKind::MangaHere => "mangahere",
    }
  }

  /// The embedded TOML definition of this source.
  pub fn default_config_str(&self) -> &'static str {
    match self {
      SourceKind::MangaDex => include_str!("../../../../config/sources/mangadex.toml"),
      SourceKind::MangaHere => include_str!("../../../../config/sources/mangahere.toml"),
    }
  }

  /// Parses the embedded definition of this source.
  pub fn default_config(&self) -> Result<SourceConfig> {
    SourceConfig::from_toml_str(self.default_config_str())
  }
}

impl Default for SourceKind {
  fn default() -> Self { SourceKind::MangaDex }
}

impl fmt::Display for SourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SourceKind {
  type Err = YomuError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "mangadex" => Ok(SourceKind::MangaDex),
      "mangahere" => Ok(SourceKind::MangaHere),
      other => Err(YomuError::InvalidSource(other.to_owned())),
    }
  }
}
