//! Manga reading core: catalog access, library, read state and offline downloads.
//!
//! `yomu` is the engine behind a manga reader. It provides:
//!
//! - Search, manga details and chapter pages from multiple catalog sources
//! - A personal library of bookmarked manga
//! - Per-manga read state
//! - Offline chapter downloads with progress tracking
//! - Persistent storage of all of the above
//!
//! # Features
//!
//! - **Multi-source support**: read from:
//!   - MangaDex
//!   - MangaHere (with its CDN quirks handled transparently)
//! - **Typed payloads**: catalog responses are validated at the boundary
//! - **Offline first**: downloaded chapters and their manga details work without a network
//! - **Observable downloads**: subscribe to progress instead of polling
//! - **Typed failures**: every operation reports what went wrong, not just that it did
//!
//! # Getting Started
//!
//! ```no_run
//! use yomu::{Config, Yomu};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let yomu = Yomu::from_config(Config::default()).await?;
//!
//!   // Search the active source
//!   let results = yomu.search_manga("one piece").await?;
//!   let manga = yomu.manga_info(&results.results[0].id).await?;
//!   println!("{} has {} chapters", manga.title, manga.chapters.len());
//!
//!   // Keep it in the library and read the first chapter offline
//!   yomu.add_bookmark(&manga).await?;
//!   let chapter_id = &manga.chapters[0].id;
//!   yomu.download_chapter(&manga, chapter_id).await?;
//!   for page in yomu.chapter_pages(chapter_id).await? {
//!     println!("page {} at {}", page.page, page.img);
//!   }
//!
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`manga`]: Catalog data model
//! - [`source`]: Content source adapters and source selection
//! - [`store`]: Persistent key-value storage
//! - [`library`]: Bookmarks and read state
//! - [`download`]: Offline chapter downloads
//! - [`configuration`]: Runtime configuration
//! - [`error`]: Error types
//! - [`prelude`]: Common traits and types for ergonomic imports

#![warn(missing_docs)]

use std::{
  path::{Path, PathBuf},
  str::FromStr,
  sync::Arc,
};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod configuration;
pub mod download;
pub mod error;
pub mod format;
pub mod library;
pub mod manga;
pub mod source;
pub mod store;

mod debounce;

pub use configuration::Config;

use crate::{
  debounce::Debouncer,
  download::{
    DownloadManager, DownloadProgress, DownloadStatus, DownloadedChapter, HttpPageFetcher,
    PageFetcher, ProgressEvent,
  },
  error::*,
  library::{BookmarkItem, Library},
  manga::*,
  source::{ContentSource, SourceKind, SourceRegistry, SourceSelector},
  store::{KeyValueStore, SqliteStore},
};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use yomu::prelude::*;
///
/// async fn example(yomu: &yomu::Yomu) -> Result<(), YomuError> {
///   let source = yomu.active_source().await?;
///   println!("Reading from {source}");
///   Ok(())
/// }
/// ```
pub mod prelude {
  pub use crate::{
    download::PageFetcher,
    error::{ErrorKind, YomuError},
    source::{ContentSource, SourceKind},
    store::{KeyValueStore, KeyValueStoreExt},
  };
}

/// Pages a reader must reach before a chapter counts as read.
const READ_THRESHOLD_PAGE: u32 = 3;

/// The reading application core.
///
/// Bundles source selection, the library and the download manager behind
/// the operations a reader UI needs. Cheap to share behind an [`Arc`]; every
/// operation takes `&self`.
pub struct Yomu {
  /// Settings this instance was built with
  config:    Config,
  /// Active content source resolution
  sources:   SourceSelector,
  /// Offline chapters
  downloads: DownloadManager,
  /// Bookmarks and read state
  library:   Library,
  /// Settles bursts of search requests
  debouncer: Debouncer,
}

/// Builder for [`Yomu`].
///
/// Anything not provided falls back to what the [`Config`] describes: a
/// SQLite store at `database_path`, HTTP page downloads, and adapters built
/// from the source definitions.
#[derive(Default)]
pub struct YomuBuilder {
  config:   Option<Config>,
  store:    Option<Arc<dyn KeyValueStore>>,
  fetcher:  Option<Arc<dyn PageFetcher>>,
  adapters: Vec<(SourceKind, Arc<dyn ContentSource>)>,
}

impl YomuBuilder {
  /// Uses `config` instead of [`Config::default`].
  pub fn with_config(mut self, config: Config) -> Self {
    self.config = Some(config);
    self
  }

  /// Persists state in `store` instead of the configured database.
  pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
    self.store = Some(store);
    self
  }

  /// Fetches page images through `fetcher`.
  pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
    self.fetcher = Some(fetcher);
    self
  }

  /// Serves `kind` from `adapter` instead of the HTTP catalog.
  pub fn with_adapter(mut self, kind: SourceKind, adapter: Arc<dyn ContentSource>) -> Self {
    self.adapters.push((kind, adapter));
    self
  }

  /// Builds the instance, opening the database when no store was given.
  pub async fn build(self) -> Result<Yomu> {
    let config = self.config.unwrap_or_default();

    let store: Arc<dyn KeyValueStore> = match self.store {
      Some(store) => store,
      None => Arc::new(SqliteStore::open(&config.database_path).await?),
    };
    let fetcher = self.fetcher.unwrap_or_else(|| Arc::new(HttpPageFetcher::default()));

    let registry = self.adapters.into_iter().fold(
      SourceRegistry::new(config.api_base_url.as_str()).with_sources_dir(&config.sources_path),
      |registry, (kind, adapter)| registry.with_adapter(kind, adapter),
    );

    if config.download_path.is_none() {
      info!("No download directory configured; offline downloads are disabled");
    }

    Ok(Yomu {
      sources: SourceSelector::new(registry, Arc::clone(&store)),
      downloads: DownloadManager::new(Arc::clone(&store), fetcher, config.download_path.clone())
        .with_page_concurrency(config.page_concurrency),
      library: Library::new(store),
      debouncer: Debouncer::new(config.search_debounce()),
      config,
    })
  }
}

impl Yomu {
  /// Starts building an instance.
  pub fn builder() -> YomuBuilder { YomuBuilder::default() }

  /// Builds an instance entirely from `config`.
  pub async fn from_config(config: Config) -> Result<Self> {
    Self::builder().with_config(config).build().await
  }

  /// The settings in use.
  pub fn config(&self) -> &Config { &self.config }

  /// Direct access to the download manager.
  pub fn downloads(&self) -> &DownloadManager { &self.downloads }

  /// Direct access to the library.
  pub fn library(&self) -> &Library { &self.library }

  // Sources

  /// The selected content source.
  pub async fn active_source(&self) -> Result<SourceKind> { self.sources.active_source().await }

  /// Selects the content source used from now on.
  ///
  /// # Errors
  ///
  /// Returns [`YomuError::InvalidSource`] for unknown names and keeps the
  /// current selection.
  pub async fn set_active_source(&self, name: &str) -> Result<SourceKind> {
    self.sources.set_active_source(name).await
  }

  /// Names of every available source.
  pub fn sources(&self) -> Vec<&'static str> { self.sources.registry().names() }

  /// Searches the active source.
  ///
  /// Results are never filtered by bookmark state; use
  /// [`is_bookmarked`](Self::is_bookmarked) to mark them.
  pub async fn search_manga(&self, query: &str) -> Result<SearchResults> {
    let source = self.sources.active_adapter().await?;
    debug!(source = source.name(), "Searching for {query:?}");
    source.search_manga(query).await
  }

  /// Searches after the configured settle delay.
  ///
  /// Returns `Ok(None)` without touching the network when a newer debounced
  /// search started while this one was settling.
  pub async fn search_debounced(&self, query: &str) -> Result<Option<SearchResults>> {
    if !self.debouncer.settle().await {
      trace!("Search for {query:?} superseded");
      return Ok(None);
    }
    self.search_manga(query).await.map(Some)
  }

  /// Fetches one manga with its chapters.
  ///
  /// When the catalog cannot be reached, the snapshot stored with a
  /// downloaded chapter of this manga is returned instead.
  pub async fn manga_info(&self, id: &str) -> Result<Manga> {
    let source = self.sources.active_adapter().await?;
    match source.manga_info(id).await {
      Ok(manga) => Ok(manga),
      Err(e) if e.kind() == ErrorKind::Network => match self.downloads.manga_info(id).await? {
        Some(manga) => {
          warn!(manga_id = id, "Catalog unreachable, using offline copy: {e}");
          Ok(manga)
        },
        None => Err(e),
      },
      Err(e) => Err(e),
    }
  }

  /// Pages of a chapter: local files when downloaded, the catalog otherwise.
  pub async fn chapter_pages(&self, chapter_id: &str) -> Result<Vec<ChapterPage>> {
    if let Some(downloaded) = self.downloads.downloaded_chapter(chapter_id).await? {
      debug!(chapter_id, "Reading downloaded chapter");
      return Ok(
        downloaded
          .pages
          .iter()
          .zip(1..)
          .map(|(path, page)| ChapterPage {
            img: path.display().to_string(),
            page,
            header_for_image: None,
          })
          .collect(),
      );
    }
    self.sources.active_adapter().await?.chapter_pages(chapter_id).await
  }

  // Library

  /// Bookmarks `manga`; `Ok(false)` when it already is.
  pub async fn add_bookmark(&self, manga: &Manga) -> Result<bool> {
    self.library.add_bookmark(manga).await
  }

  /// Removes a bookmark; `Ok(false)` when there was none, which still counts
  /// as success.
  pub async fn remove_bookmark(&self, manga_id: &str) -> Result<bool> {
    self.library.remove_bookmark(manga_id).await
  }

  /// Whether `manga_id` is bookmarked.
  pub async fn is_bookmarked(&self, manga_id: &str) -> Result<bool> {
    self.library.is_bookmarked(manga_id).await
  }

  /// Every bookmark, oldest first.
  pub async fn bookmarks(&self) -> Result<Vec<BookmarkItem>> { self.library.bookmarks().await }

  /// Marks a chapter as read; `Ok(false)` when it already was.
  pub async fn add_read_chapter(&self, manga_id: &str, chapter_id: &str) -> Result<bool> {
    self.library.add_read_chapter(manga_id, chapter_id).await
  }

  /// Marks a chapter as unread; `Ok(false)` when it was not read.
  pub async fn remove_read_chapter(&self, manga_id: &str, chapter_id: &str) -> Result<bool> {
    self.library.remove_read_chapter(manga_id, chapter_id).await
  }

  /// Whether a chapter is marked as read.
  pub async fn is_read(&self, manga_id: &str, chapter_id: &str) -> Result<bool> {
    self.library.is_read(manga_id, chapter_id).await
  }

  /// Read chapters of one manga.
  pub async fn read_chapters(&self, manga_id: &str) -> Result<Vec<String>> {
    self.library.read_chapters(manga_id).await
  }

  /// Records that the reader showed `page` (1-based) of a chapter with
  /// `total_pages` pages, marking the chapter read once it counts as read.
  ///
  /// A chapter counts as read when its third page is shown, or as soon as
  /// any page is shown for chapters of one or two pages. Returns whether
  /// this call marked it.
  pub async fn record_page_view(
    &self,
    manga_id: &str,
    chapter_id: &str,
    page: u32,
    total_pages: u32,
  ) -> Result<bool> {
    let short_chapter = (1..READ_THRESHOLD_PAGE).contains(&total_pages);
    if total_pages == 0 || !(short_chapter || page >= READ_THRESHOLD_PAGE) {
      return Ok(false);
    }
    self.library.add_read_chapter(manga_id, chapter_id).await
  }

  // Downloads

  /// Whether chapters can be downloaded on this device.
  pub fn supports_downloads(&self) -> bool { self.downloads.supports_downloads() }

  /// Downloads one chapter of `manga` from the active source.
  ///
  /// Page lists always come from the source active at call time. A manga
  /// fetched before [`set_active_source`](Self::set_active_source) switched
  /// catalogs must be fetched again from the new source before downloading.
  ///
  /// # Errors
  ///
  /// - [`YomuError::NotFound`] when `chapter_id` is not a chapter of `manga`
  /// - everything [`DownloadManager::download_chapter`] reports
  pub async fn download_chapter(
    &self,
    manga: &Manga,
    chapter_id: &str,
  ) -> Result<DownloadedChapter> {
    self.downloads.download_dir()?;
    let chapter = manga
      .chapter(chapter_id)
      .ok_or_else(|| YomuError::NotFound(format!("chapter {chapter_id} of manga {}", manga.id)))?;

    if let Some(existing) = self.downloads.downloaded_chapter(chapter_id).await? {
      return Ok(existing);
    }

    let pages = self.sources.active_adapter().await?.chapter_pages(chapter_id).await?;
    self.downloads.download_chapter(manga, chapter, &pages).await
  }

  /// Deletes a downloaded chapter and its files.
  pub async fn delete_download(&self, chapter_id: &str) -> Result<DownloadedChapter> {
    self.downloads.delete_chapter(chapter_id).await
  }

  /// Whether a chapter is available offline.
  pub async fn is_chapter_downloaded(&self, chapter_id: &str) -> Result<bool> {
    self.downloads.is_chapter_downloaded(chapter_id).await
  }

  /// Latest progress record of a chapter download.
  pub fn download_progress(&self, chapter_id: &str) -> DownloadProgress {
    self.downloads.download_progress(chapter_id)
  }

  /// Effective download status of a chapter.
  pub async fn chapter_status(&self, chapter_id: &str) -> Result<DownloadStatus> {
    self.downloads.chapter_status(chapter_id).await
  }

  /// Receives download progress changes.
  pub fn subscribe_downloads(&self) -> tokio::sync::broadcast::Receiver<ProgressEvent> {
    self.downloads.subscribe()
  }

  /// Every downloaded chapter, oldest first.
  pub async fn downloaded_chapters(&self) -> Result<Vec<DownloadedChapter>> {
    self.downloads.downloaded_chapters().await
  }

  /// Downloaded chapters whose title contains `term`, ignoring case.
  pub async fn search_downloads(&self, term: &str) -> Result<Vec<DownloadedChapter>> {
    self.downloads.search_downloads(term).await
  }
}
