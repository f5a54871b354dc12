//! Offline chapter downloads.
//!
//! The [`DownloadManager`] fetches every page of a chapter into the download
//! directory, tracks per-chapter progress, and keeps the persisted
//! [`Manifest`] of downloaded chapters in sync with the files on disk.
//!
//! # Lifecycle
//!
//! Each chapter moves through the [`DownloadStatus`] state machine:
//! `NotDownloaded -> Pending -> Downloading -> Completed | Error`. A failed
//! chapter can be downloaded again; a completed one only leaves `Completed`
//! when it is deleted.
//!
//! - Pages are fetched in order, one request at a time unless a page
//!   concurrency above one is configured.
//! - The first failing page aborts the chapter: page files already written
//!   are removed, the status becomes `Error` and progress drops to 0.
//! - A second download request for a chapter already in flight waits for the
//!   first one and shares its outcome.
//! - Every progress change is published to subscribers of
//!   [`DownloadManager::subscribe`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use yomu::{
//!   download::{DownloadManager, HttpPageFetcher},
//!   store::SqliteStore,
//! };
//!
//! # async fn example(manga: yomu::manga::Manga, pages: Vec<yomu::manga::ChapterPage>)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::open(SqliteStore::default_path()).await?);
//! let manager = DownloadManager::new(
//!   store,
//!   Arc::new(HttpPageFetcher::default()),
//!   Some("/tmp/yomu/downloads".into()),
//! );
//!
//! let chapter = &manga.chapters[0];
//! let downloaded = manager.download_chapter(&manga, chapter, &pages).await?;
//! println!("{} pages stored", downloaded.pages.len());
//! # Ok(())
//! # }
//! ```

use std::{
  collections::HashMap,
  fmt,
  sync::{Mutex, PoisonError},
};

use chrono::Utc;
use futures::{stream, StreamExt};
use tokio::sync::{broadcast, watch};

use super::*;
use crate::{format::page_filename, store::KeyValueStore};

mod fetcher;
mod manifest;
mod progress;

pub use fetcher::*;
pub use manifest::*;
pub use progress::*;

/// Upper bound for parallel page fetches within one chapter.
pub const MAX_PAGE_CONCURRENCY: usize = 8;

/// Outcome shared with callers that joined an in-flight download.
type Outcome = std::result::Result<DownloadedChapter, String>;

/// In-flight downloads by chapter id.
type InFlight = Mutex<HashMap<String, watch::Receiver<Option<Outcome>>>>;

/// Downloads chapters for offline reading and manages the local copies.
pub struct DownloadManager {
  /// Where page files are written; `None` when the device has no writable storage
  dir:              Option<PathBuf>,
  /// Page image transport
  fetcher:          Arc<dyn PageFetcher>,
  /// Persisted downloaded-chapter records
  manifest:         Manifest,
  /// Per-chapter progress
  progress:         ProgressTracker,
  /// Chapters currently downloading
  in_flight:        InFlight,
  /// Pages fetched in parallel per chapter
  page_concurrency: usize,
}

impl DownloadManager {
  /// Creates a manager writing pages into `dir`.
  ///
  /// Passing `None` disables every mutating operation; see
  /// [`supports_downloads`](Self::supports_downloads).
  pub fn new(
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn PageFetcher>,
    dir: Option<PathBuf>,
  ) -> Self {
    Self {
      dir,
      fetcher,
      manifest: Manifest::new(store),
      progress: ProgressTracker::new(),
      in_flight: Mutex::new(HashMap::new()),
      page_concurrency: 1,
    }
  }

  /// Fetches up to `concurrency` pages of a chapter at once, clamped to
  /// `1..=MAX_PAGE_CONCURRENCY`.
  pub fn with_page_concurrency(mut self, concurrency: usize) -> Self {
    self.page_concurrency = concurrency.clamp(1, MAX_PAGE_CONCURRENCY);
    self
  }

  /// Whether this device can store chapters locally.
  pub fn supports_downloads(&self) -> bool { self.dir.is_some() }

  /// The download directory.
  ///
  /// # Errors
  ///
  /// Returns [`YomuError::DownloadsUnsupported`] when downloads are disabled.
  pub fn download_dir(&self) -> Result<&Path> {
    self.dir.as_deref().ok_or(YomuError::DownloadsUnsupported)
  }

  /// Downloads every page of `chapter` and records it in the manifest.
  ///
  /// A chapter that is already downloaded is returned as-is without
  /// fetching anything. If the same chapter is already downloading, this
  /// call waits for that download and shares its result.
  ///
  /// # Errors
  ///
  /// - [`YomuError::DownloadsUnsupported`] when downloads are disabled
  /// - [`YomuError::InvalidPayload`] when `pages` is empty
  /// - the fetcher's error for the first page that could not be retrieved
  /// - [`YomuError::File`] or a storage error when the chapter could not be saved
  /// - [`YomuError::DownloadFailed`] when a joined download failed
  pub async fn download_chapter(
    &self,
    manga: &Manga,
    chapter: &Chapter,
    pages: &[ChapterPage],
  ) -> Result<DownloadedChapter> {
    let dir = self.download_dir()?;
    let chapter_id = chapter.id.as_str();

    let registered = {
      let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
      match in_flight.get(chapter_id) {
        Some(receiver) => Err(receiver.clone()),
        None => {
          let (sender, receiver) = watch::channel(None);
          in_flight.insert(chapter_id.to_owned(), receiver);
          Ok(sender)
        },
      }
    };
    let sender = match registered {
      Ok(sender) => sender,
      Err(receiver) => return join_in_flight(chapter_id, receiver).await,
    };

    let _guard = InFlightGuard { in_flight: &self.in_flight, chapter_id };
    let result = self.execute(dir, manga, chapter, pages).await;
    sender.send_replace(Some(result.as_ref().cloned().map_err(ToString::to_string)));
    result
  }

  /// Runs one download attempt and settles the chapter's final state.
  async fn execute(
    &self,
    dir: &Path,
    manga: &Manga,
    chapter: &Chapter,
    pages: &[ChapterPage],
  ) -> Result<DownloadedChapter> {
    let chapter_id = chapter.id.as_str();
    if let Some(existing) = self.manifest.get(chapter_id).await? {
      debug!(chapter_id, "Chapter already downloaded");
      self.progress.restore_completed(chapter_id);
      return Ok(existing);
    }

    self.progress.transition(chapter_id, DownloadProgress::pending());
    info!(chapter_id, manga_id = %manga.id, pages = pages.len(), "Downloading chapter");

    match self.store_chapter(dir, manga, chapter, pages).await {
      Ok(record) => {
        self.progress.transition(chapter_id, DownloadProgress::completed());
        info!(chapter_id, "Chapter downloaded");
        Ok(record)
      },
      Err(e) => {
        error!(chapter_id, "Chapter download failed: {e}");
        self.remove_page_files(dir, chapter_id, pages.len()).await;
        self.progress.transition(chapter_id, DownloadProgress::failed());
        Err(e)
      },
    }
  }

  /// Fetches and writes every page, then appends the manifest record.
  async fn store_chapter(
    &self,
    dir: &Path,
    manga: &Manga,
    chapter: &Chapter,
    pages: &[ChapterPage],
  ) -> Result<DownloadedChapter> {
    if pages.is_empty() {
      return Err(YomuError::InvalidPayload(format!("chapter {} has no pages", chapter.id)));
    }
    tokio::fs::create_dir_all(dir).await?;

    let mut ordered: Vec<&ChapterPage> = pages.iter().collect();
    ordered.sort_by_key(|page| page.page);
    let total = ordered.len();
    self.progress.transition(&chapter.id, DownloadProgress::downloading(0, total));

    let mut fetched = stream::iter(ordered)
      .map(move |page| async move { (page.page, self.fetcher.fetch(page).await) })
      .buffered(self.page_concurrency);

    let mut files = Vec::with_capacity(total);
    while let Some((page, bytes)) = fetched.next().await {
      let bytes = bytes?;
      let path = dir.join(page_filename(&chapter.id, files.len() as u32 + 1));
      tokio::fs::write(&path, bytes).await?;
      trace!(chapter_id = %chapter.id, page, "Stored page at {}", path.display());

      files.push(path);
      self.progress.transition(&chapter.id, DownloadProgress::downloading(files.len(), total));
    }

    let record = DownloadedChapter {
      manga_id:        manga.id.clone(),
      chapter_id:      chapter.id.clone(),
      title:           chapter.title.clone(),
      chapter_number:  chapter.chapter_number.clone(),
      pages:           files,
      date_downloaded: Utc::now().timestamp_millis(),
      manga_info:      Some(manga.clone()),
    };
    self.manifest.append(record).await
  }

  /// Deletes the files a failed attempt may have left behind.
  async fn remove_page_files(&self, dir: &Path, chapter_id: &str, pages: usize) {
    for page in 1..=pages as u32 {
      let path = dir.join(page_filename(chapter_id, page));
      remove_file(chapter_id, &path).await;
    }
  }

  /// Deletes a downloaded chapter: its manifest record, then its page files.
  ///
  /// Page files that cannot be deleted are logged and skipped; the record is
  /// removed regardless.
  ///
  /// # Errors
  ///
  /// - [`YomuError::DownloadsUnsupported`] when downloads are disabled
  /// - [`YomuError::NotFound`] when the chapter is not downloaded
  pub async fn delete_chapter(&self, chapter_id: &str) -> Result<DownloadedChapter> {
    self.download_dir()?;
    let removed = self
      .manifest
      .remove(chapter_id)
      .await?
      .ok_or_else(|| YomuError::NotFound(format!("downloaded chapter {chapter_id}")))?;

    for path in &removed.pages {
      remove_file(chapter_id, path).await;
    }
    self.progress.clear(chapter_id);
    info!(chapter_id, pages = removed.pages.len(), "Deleted downloaded chapter");
    Ok(removed)
  }

  /// Latest progress of `chapter_id`.
  ///
  /// Chapters never seen by this manager report `{0, Pending}`; that does not
  /// mean they are queued. Use [`chapter_status`](Self::chapter_status) for
  /// an answer that accounts for the manifest.
  pub fn download_progress(&self, chapter_id: &str) -> DownloadProgress {
    self.progress.get(chapter_id)
  }

  /// Effective status of `chapter_id`: `Completed` when it is in the
  /// manifest, else the tracked status, else `NotDownloaded`.
  pub async fn chapter_status(&self, chapter_id: &str) -> Result<DownloadStatus> {
    if self.is_chapter_downloaded(chapter_id).await? {
      return Ok(DownloadStatus::Completed);
    }
    Ok(match self.progress.record(chapter_id) {
      Some(record) if record.status != DownloadStatus::Completed => record.status,
      _ => DownloadStatus::NotDownloaded,
    })
  }

  /// Receives every progress change from now on.
  pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> { self.progress.subscribe() }

  /// Whether `chapter_id` is in the manifest.
  pub async fn is_chapter_downloaded(&self, chapter_id: &str) -> Result<bool> {
    Ok(self.manifest.get(chapter_id).await?.is_some())
  }

  /// Whether any chapter of `manga_id` is downloaded.
  pub async fn has_manga_downloads(&self, manga_id: &str) -> Result<bool> {
    Ok(self.manifest.entries().await?.iter().any(|d| d.manga_id == manga_id))
  }

  /// The offline snapshot of `manga_id`, if one of its chapters is downloaded.
  pub async fn manga_info(&self, manga_id: &str) -> Result<Option<Manga>> {
    Ok(
      self
        .manifest
        .entries()
        .await?
        .into_iter()
        .filter(|d| d.manga_id == manga_id)
        .find_map(|d| d.manga_info),
    )
  }

  /// Every downloaded chapter, oldest first.
  pub async fn downloaded_chapters(&self) -> Result<Vec<DownloadedChapter>> {
    self.manifest.entries().await
  }

  /// The record of one downloaded chapter.
  pub async fn downloaded_chapter(&self, chapter_id: &str) -> Result<Option<DownloadedChapter>> {
    self.manifest.get(chapter_id).await
  }

  /// Downloaded chapters of one manga.
  pub async fn downloads_for_manga(&self, manga_id: &str) -> Result<Vec<DownloadedChapter>> {
    let mut entries = self.manifest.entries().await?;
    entries.retain(|d| d.manga_id == manga_id);
    Ok(entries)
  }

  /// Downloaded chapters whose title contains `term`, ignoring case.
  pub async fn search_downloads(&self, term: &str) -> Result<Vec<DownloadedChapter>> {
    let term = term.to_lowercase();
    let mut entries = self.manifest.entries().await?;
    entries.retain(|d| d.title.to_lowercase().contains(&term));
    Ok(entries)
  }
}

/// Waits for a download started by another caller.
async fn join_in_flight(
  chapter_id: &str,
  mut receiver: watch::Receiver<Option<Outcome>>,
) -> Result<DownloadedChapter> {
  debug!(chapter_id, "Joining download already in progress");
  let outcome = match receiver.wait_for(Option::is_some).await {
    Ok(outcome) => outcome.clone(),
    Err(_) => None,
  };
  match outcome {
    Some(Ok(chapter)) => Ok(chapter),
    Some(Err(reason)) =>
      Err(YomuError::DownloadFailed { chapter_id: chapter_id.to_owned(), reason }),
    None => Err(YomuError::DownloadFailed {
      chapter_id: chapter_id.to_owned(),
      reason:     "download was abandoned".to_string(),
    }),
  }
}

/// Best-effort file removal; a missing file is already the desired state.
async fn remove_file(chapter_id: &str, path: &Path) {
  match tokio::fs::remove_file(path).await {
    Ok(()) => trace!(chapter_id, "Removed {}", path.display()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
    Err(e) => warn!(chapter_id, "Failed to delete page {}: {e}", path.display()),
  }
}

/// Unregisters an in-flight download when its leader finishes or is dropped.
struct InFlightGuard<'a> {
  in_flight:  &'a InFlight,
  chapter_id: &'a str,
}

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).remove(self.chapter_id);
  }
}

impl fmt::Debug for DownloadManager {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DownloadManager")
      .field("dir", &self.dir)
      .field("page_concurrency", &self.page_concurrency)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
  };

  use super::*;
  use crate::store::MemoryStore;

  /// Serves `page-{n}` for every page, failing on one page if asked to.
  #[derive(Default)]
  struct FakeFetcher {
    fail_on: Option<u32>,
    delay:   Option<Duration>,
    calls:   AtomicUsize,
  }

  #[async_trait]
  impl PageFetcher for FakeFetcher {
    async fn fetch(&self, page: &ChapterPage) -> Result<Vec<u8>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }
      if self.fail_on == Some(page.page) {
        return Err(YomuError::Upstream { status: 503, message: "busy".into() });
      }
      Ok(format!("page-{}", page.page).into_bytes())
    }
  }

  fn manga() -> Manga {
    serde_json::from_value(serde_json::json!({
      "id": "one-piece",
      "title": "One Piece",
      "chapters": [
        { "id": "op/c1", "title": "Romance Dawn", "chapterNumber": "1" },
        { "id": "op/c2", "title": "The Man in the Straw Hat", "chapterNumber": "2" }
      ]
    }))
    .unwrap()
  }

  fn pages(count: u32) -> Vec<ChapterPage> {
    (1..=count)
      .map(|page| ChapterPage {
        img: format!("https://cdn.example/{page}.jpg"),
        page,
        header_for_image: None,
      })
      .collect()
  }

  fn manager(dir: &Path, fetcher: Arc<FakeFetcher>) -> DownloadManager {
    DownloadManager::new(Arc::new(MemoryStore::new()), fetcher, Some(dir.to_path_buf()))
  }

  fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
  }

  #[traced_test]
  #[tokio::test]
  async fn test_download_completes() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let manager = manager(dir.path(), fetcher.clone());
    let mut events = manager.subscribe();
    let manga = manga();

    let record = manager.download_chapter(&manga, &manga.chapters[0], &pages(4)).await.unwrap();

    assert_eq!(record.pages.len(), 4);
    assert_eq!(std::fs::read(&record.pages[2]).unwrap(), b"page-3");
    assert!(record.pages[0].ends_with("op%2Fc1_1.jpg"));
    assert_eq!(manager.download_progress("op/c1"), DownloadProgress::completed());
    assert!(manager.is_chapter_downloaded("op/c1").await.unwrap());
    assert_eq!(manager.downloaded_chapters().await.unwrap().len(), 1);
    assert_eq!(files_in(dir.path()), 4);

    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
      statuses.push((event.progress.status, event.progress.progress));
    }
    assert_eq!(statuses.first(), Some(&(DownloadStatus::Pending, 0.0)));
    assert!(statuses.contains(&(DownloadStatus::Downloading, 50.0)));
    assert_eq!(statuses.last(), Some(&(DownloadStatus::Completed, 100.0)));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_failed_page_aborts_and_cleans_up() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher { fail_on: Some(3), ..Default::default() });
    let manager = manager(dir.path(), fetcher.clone());
    let manga = manga();

    let err = manager.download_chapter(&manga, &manga.chapters[0], &pages(5)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    assert_eq!(manager.download_progress("op/c1"), DownloadProgress::failed());
    assert_eq!(manager.chapter_status("op/c1").await.unwrap(), DownloadStatus::Error);
    assert!(!manager.is_chapter_downloaded("op/c1").await.unwrap());
    assert_eq!(files_in(dir.path()), 0);
    assert!(logs_contain("Chapter download failed"));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_failed_chapter_can_be_retried() {
    /// Fails the very first request, then serves pages.
    #[derive(Default)]
    struct FlakyFetcher {
      calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for FlakyFetcher {
      async fn fetch(&self, page: &ChapterPage) -> Result<Vec<u8>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
          return Err(YomuError::Upstream { status: 502, message: "bad gateway".into() });
        }
        Ok(vec![page.page as u8])
      }
    }

    let dir = tempdir().unwrap();
    let manager = DownloadManager::new(
      Arc::new(MemoryStore::new()),
      Arc::new(FlakyFetcher::default()),
      Some(dir.path().to_path_buf()),
    );
    let manga = manga();

    assert!(manager.download_chapter(&manga, &manga.chapters[1], &pages(2)).await.is_err());
    assert_eq!(manager.chapter_status("op/c2").await.unwrap(), DownloadStatus::Error);

    tokio_test::assert_ok!(manager.download_chapter(&manga, &manga.chapters[1], &pages(2)).await);
    assert_eq!(manager.chapter_status("op/c2").await.unwrap(), DownloadStatus::Completed);
    assert!(!logs_contain("Rejected download state change"));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_already_downloaded_short_circuits() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let manager = manager(dir.path(), fetcher.clone());
    let manga = manga();

    let first = manager.download_chapter(&manga, &manga.chapters[0], &pages(3)).await.unwrap();
    let second = manager.download_chapter(&manga, &manga.chapters[0], &pages(3)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    assert_eq!(manager.downloaded_chapters().await.unwrap().len(), 1);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_concurrent_duplicate_joins_first_download() {
    let dir = tempdir().unwrap();
    let fetcher =
      Arc::new(FakeFetcher { delay: Some(Duration::from_millis(10)), ..Default::default() });
    let manager = manager(dir.path(), fetcher.clone());
    let manga = manga();
    let chapter = &manga.chapters[0];
    let pages = pages(3);

    let (first, second) = tokio::join!(
      manager.download_chapter(&manga, chapter, &pages),
      manager.download_chapter(&manga, chapter, &pages)
    );

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    assert_eq!(manager.downloaded_chapters().await.unwrap().len(), 1);
    assert!(logs_contain("Joining download already in progress"));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_joined_failure_is_reported() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher {
      fail_on: Some(2),
      delay: Some(Duration::from_millis(5)),
      ..Default::default()
    });
    let manager = manager(dir.path(), fetcher);
    let manga = manga();
    let pages = pages(2);

    let (first, second) = tokio::join!(
      manager.download_chapter(&manga, &manga.chapters[0], &pages),
      manager.download_chapter(&manga, &manga.chapters[0], &pages)
    );

    assert!(matches!(first, Err(YomuError::Upstream { status: 503, .. })));
    assert!(matches!(
      second,
      Err(YomuError::DownloadFailed { ref chapter_id, .. }) if chapter_id == "op/c1"
    ));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_delete_removes_files_and_record() {
    let dir = tempdir().unwrap();
    let manager = manager(dir.path(), Arc::new(FakeFetcher::default()));
    let manga = manga();
    manager.download_chapter(&manga, &manga.chapters[0], &pages(3)).await.unwrap();
    manager.download_chapter(&manga, &manga.chapters[1], &pages(2)).await.unwrap();

    let removed = manager.delete_chapter("op/c1").await.unwrap();
    assert_eq!(removed.pages.len(), 3);
    assert!(removed.pages.iter().all(|path| !path.exists()));
    assert!(!manager.is_chapter_downloaded("op/c1").await.unwrap());
    assert_eq!(manager.chapter_status("op/c1").await.unwrap(), DownloadStatus::NotDownloaded);
    assert_eq!(files_in(dir.path()), 2);

    // The snapshot stays reachable through the remaining chapter.
    assert_eq!(manager.manga_info("one-piece").await.unwrap().unwrap().title, "One Piece");

    let err = manager.delete_chapter("op/c1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  fn chapter(id: &str) -> Chapter {
    Chapter { id: id.into(), title: format!("Chapter {id}"), chapter_number: "1".into() }
  }

  #[tokio::test]
  async fn test_lookalike_chapter_ids_keep_separate_files() {
    let dir = tempdir().unwrap();
    let manager = manager(dir.path(), Arc::new(FakeFetcher::default()));
    let manga = manga();
    let slash = manager.download_chapter(&manga, &chapter("vol1/c1"), &pages(2)).await.unwrap();
    let colon = manager.download_chapter(&manga, &chapter("vol1:c1"), &pages(2)).await.unwrap();

    assert!(slash.pages.iter().all(|path| !colon.pages.contains(path)));
    assert_eq!(files_in(dir.path()), 4);

    manager.delete_chapter("vol1:c1").await.unwrap();
    assert!(manager.is_chapter_downloaded("vol1/c1").await.unwrap());
    assert!(slash.pages.iter().all(|path| path.exists()));
    assert_eq!(std::fs::read(&slash.pages[1]).unwrap(), b"page-2");
  }

  #[traced_test]
  #[tokio::test]
  async fn test_failed_lookalike_leaves_other_chapter_intact() {
    let dir = tempdir().unwrap();
    let manga = manga();
    let done = manager(dir.path(), Arc::new(FakeFetcher::default()))
      .download_chapter(&manga, &chapter("第1話"), &pages(3))
      .await
      .unwrap();

    let fetcher = Arc::new(FakeFetcher { fail_on: Some(3), ..Default::default() });
    let failing = manager(dir.path(), fetcher);
    failing.download_chapter(&manga, &chapter("第2話"), &pages(3)).await.unwrap_err();

    assert!(done.pages.iter().all(|path| path.exists()));
    assert_eq!(files_in(dir.path()), 3);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_delete_tolerates_missing_files() {
    let dir = tempdir().unwrap();
    let manager = manager(dir.path(), Arc::new(FakeFetcher::default()));
    let manga = manga();
    let record = manager.download_chapter(&manga, &manga.chapters[0], &pages(2)).await.unwrap();
    std::fs::remove_file(&record.pages[0]).unwrap();

    tokio_test::assert_ok!(manager.delete_chapter("op/c1").await);
    assert!(!manager.has_manga_downloads("one-piece").await.unwrap());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_empty_chapter_is_rejected() {
    let dir = tempdir().unwrap();
    let manager = manager(dir.path(), Arc::new(FakeFetcher::default()));
    let manga = manga();

    let err = manager.download_chapter(&manga, &manga.chapters[0], &[]).await.unwrap_err();
    assert!(matches!(err, YomuError::InvalidPayload(_)));
    assert_eq!(manager.download_progress("op/c1").status, DownloadStatus::Error);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_unsupported_device() {
    let manager = DownloadManager::new(
      Arc::new(MemoryStore::new()),
      Arc::new(FakeFetcher::default()),
      None,
    );
    let manga = manga();

    assert!(!manager.supports_downloads());
    let err = manager.download_chapter(&manga, &manga.chapters[0], &pages(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(matches!(manager.delete_chapter("op/c1").await, Err(YomuError::DownloadsUnsupported)));
    assert!(manager.downloaded_chapters().await.unwrap().is_empty());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_parallel_pages_keep_order() {
    let dir = tempdir().unwrap();
    let fetcher =
      Arc::new(FakeFetcher { delay: Some(Duration::from_millis(2)), ..Default::default() });
    let manager = manager(dir.path(), fetcher).with_page_concurrency(3);
    let manga = manga();
    let mut shuffled = pages(6);
    shuffled.reverse();

    let record = manager.download_chapter(&manga, &manga.chapters[0], &shuffled).await.unwrap();
    for (index, path) in record.pages.iter().enumerate() {
      assert_eq!(std::fs::read(path).unwrap(), format!("page-{}", index + 1).into_bytes());
    }
  }

  #[traced_test]
  #[tokio::test]
  async fn test_manifest_queries() {
    let dir = tempdir().unwrap();
    let manager = manager(dir.path(), Arc::new(FakeFetcher::default()));
    let manga = manga();
    manager.download_chapter(&manga, &manga.chapters[0], &pages(1)).await.unwrap();
    manager.download_chapter(&manga, &manga.chapters[1], &pages(1)).await.unwrap();

    let found = manager.search_downloads("STRAW").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].chapter_id, "op/c2");

    assert_eq!(manager.downloads_for_manga("one-piece").await.unwrap().len(), 2);
    assert!(manager.downloads_for_manga("naruto").await.unwrap().is_empty());
    assert!(manager.manga_info("naruto").await.unwrap().is_none());
    assert_eq!(manager.downloaded_chapter("op/c2").await.unwrap().unwrap().chapter_number, "2");
    assert_eq!(manager.chapter_status("op/c9").await.unwrap(), DownloadStatus::NotDownloaded);
  }

  #[test]
  fn test_page_concurrency_is_clamped() {
    let fetcher = Arc::new(FakeFetcher::default());
    let store = Arc::new(MemoryStore::new());
    let manager =
      DownloadManager::new(store.clone(), fetcher.clone(), None).with_page_concurrency(0);
    assert_eq!(manager.page_concurrency, 1);
    let manager = DownloadManager::new(store, fetcher, None).with_page_concurrency(64);
    assert_eq!(manager.page_concurrency, MAX_PAGE_CONCURRENCY);
  }
}
