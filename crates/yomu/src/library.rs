//! Bookmarks and per-manga read state.
//!
//! The [`Library`] is the user's personal collection: bookmarked manga and,
//! for every manga, the set of chapters already read. Both live in the
//! [`KeyValueStore`](crate::store::KeyValueStore):
//!
//! - `bookmarks` holds the [`BookmarkItem`] list in insertion order
//! - `read_chapters:{mangaId}` holds the read chapter ids of one manga
//!
//! Keying read state by manga means identical chapter ids from different
//! manga or sources never collide.
//!
//! All operations are idempotent. Adding something that is already present
//! returns `Ok(false)`; failures to reach the store are errors.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use yomu::{library::Library, store::MemoryStore};
//!
//! # async fn example(manga: yomu::manga::Manga) -> yomu::error::Result<()> {
//! let library = Library::new(Arc::new(MemoryStore::new()));
//!
//! library.add_bookmark(&manga).await?;
//! assert!(library.is_bookmarked(&manga.id).await?);
//!
//! library.add_read_chapter(&manga.id, &manga.chapters[0].id).await?;
//! assert!(library.is_read(&manga.id, &manga.chapters[0].id).await?);
//! # Ok(())
//! # }
//! ```

use chrono::Utc;
use tokio::sync::Mutex;

use super::*;
use crate::store::{
  read_chapters_key, KeyValueStore, KeyValueStoreExt, BOOKMARKS_KEY, READ_CHAPTERS_PREFIX,
};

/// A bookmarked manga as stored in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkItem {
  /// Manga id
  pub id:          String,
  /// Display title
  pub title:       String,
  /// Cover image URL
  pub image:       String,
  /// Description resolved to a single language
  pub description: String,
  /// When the bookmark was added, epoch millis
  pub date_added:  i64,
}

impl BookmarkItem {
  /// Builds a bookmark for `manga`, stamped with the current time.
  ///
  /// The description is resolved to English when available, else the first
  /// language that has text, else an empty string.
  pub fn from_manga(manga: &Manga) -> Self {
    Self {
      id:          manga.id.clone(),
      title:       manga.title.clone(),
      image:       manga.image.clone(),
      description: manga.description.resolve().to_owned(),
      date_added:  Utc::now().timestamp_millis(),
    }
  }
}

/// Bookmarks and read state over a [`KeyValueStore`].
pub struct Library {
  store: Arc<dyn KeyValueStore>,
  /// Serialises read-modify-write cycles
  lock:  Mutex<()>,
}

impl Library {
  /// Creates a library persisted in `store`.
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self { Self { store, lock: Mutex::new(()) } }

  /// Every bookmark, oldest first.
  pub async fn bookmarks(&self) -> Result<Vec<BookmarkItem>> {
    Ok(self.store.get_json(BOOKMARKS_KEY).await?.unwrap_or_default())
  }

  /// Bookmarks `manga`.
  ///
  /// Returns `Ok(false)` without changing anything when it is already
  /// bookmarked.
  pub async fn add_bookmark(&self, manga: &Manga) -> Result<bool> {
    let _guard = self.lock.lock().await;
    let mut bookmarks = self.bookmarks().await?;
    if bookmarks.iter().any(|b| b.id == manga.id) {
      debug!(manga_id = %manga.id, "Already bookmarked");
      return Ok(false);
    }

    bookmarks.push(BookmarkItem::from_manga(manga));
    self.store.set_json(BOOKMARKS_KEY, &bookmarks).await.inspect_err(|e| {
      error!(manga_id = %manga.id, "Failed to save bookmark: {e}");
    })?;
    info!(manga_id = %manga.id, "Bookmarked {}", manga.title);
    Ok(true)
  }

  /// Removes the bookmark of `manga_id`.
  ///
  /// Always succeeds unless storage fails: once this returns `Ok`, the manga
  /// is not bookmarked. The flag only reports whether a bookmark existed;
  /// `Ok(false)` for an absent id is not a failure and writes nothing.
  pub async fn remove_bookmark(&self, manga_id: &str) -> Result<bool> {
    let _guard = self.lock.lock().await;
    let mut bookmarks = self.bookmarks().await?;
    let before = bookmarks.len();
    bookmarks.retain(|b| b.id != manga_id);
    if bookmarks.len() == before {
      return Ok(false);
    }

    self.store.set_json(BOOKMARKS_KEY, &bookmarks).await.inspect_err(|e| {
      error!(manga_id, "Failed to remove bookmark: {e}");
    })?;
    info!(manga_id, "Removed bookmark");
    Ok(true)
  }

  /// Whether `manga_id` is bookmarked.
  pub async fn is_bookmarked(&self, manga_id: &str) -> Result<bool> {
    Ok(self.bookmarks().await?.iter().any(|b| b.id == manga_id))
  }

  /// Chapters of `manga_id` marked as read, in the order they were read.
  pub async fn read_chapters(&self, manga_id: &str) -> Result<Vec<String>> {
    Ok(self.store.get_json(&read_chapters_key(manga_id)).await?.unwrap_or_default())
  }

  /// Manga with at least one chapter marked as read.
  pub async fn manga_with_read_chapters(&self) -> Result<Vec<String>> {
    let keys = self.store.keys(READ_CHAPTERS_PREFIX).await?;
    Ok(
      keys
        .iter()
        .filter_map(|key| key.strip_prefix(READ_CHAPTERS_PREFIX))
        .map(str::to_owned)
        .collect(),
    )
  }

  /// Marks `chapter_id` of `manga_id` as read.
  ///
  /// Returns `Ok(false)` when it already was.
  pub async fn add_read_chapter(&self, manga_id: &str, chapter_id: &str) -> Result<bool> {
    let _guard = self.lock.lock().await;
    let mut read = self.read_chapters(manga_id).await?;
    if read.iter().any(|id| id == chapter_id) {
      return Ok(false);
    }

    read.push(chapter_id.to_owned());
    self.store.set_json(&read_chapters_key(manga_id), &read).await.inspect_err(|e| {
      error!(manga_id, chapter_id, "Failed to save read state: {e}");
    })?;
    debug!(manga_id, chapter_id, "Marked chapter as read");
    Ok(true)
  }

  /// Clears the read mark of `chapter_id` of `manga_id`.
  ///
  /// Idempotent; the returned flag tells whether a mark was removed.
  pub async fn remove_read_chapter(&self, manga_id: &str, chapter_id: &str) -> Result<bool> {
    let _guard = self.lock.lock().await;
    let mut read = self.read_chapters(manga_id).await?;
    let before = read.len();
    read.retain(|id| id != chapter_id);
    if read.len() == before {
      return Ok(false);
    }

    let key = read_chapters_key(manga_id);
    let saved = if read.is_empty() {
      self.store.remove(&key).await
    } else {
      self.store.set_json(&key, &read).await
    };
    saved.inspect_err(|e| error!(manga_id, chapter_id, "Failed to save read state: {e}"))?;
    debug!(manga_id, chapter_id, "Marked chapter as unread");
    Ok(true)
  }

  /// Whether `chapter_id` of `manga_id` is marked as read.
  pub async fn is_read(&self, manga_id: &str, chapter_id: &str) -> Result<bool> {
    Ok(self.read_chapters(manga_id).await?.iter().any(|id| id == chapter_id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  fn manga(id: &str) -> Manga {
    serde_json::from_value(serde_json::json!({
      "id": id,
      "title": format!("Title {id}"),
      "image": format!("https://covers.example/{id}.jpg"),
      "description": { "ja": "説明", "en": "", "fr": "Résumé" },
    }))
    .unwrap()
  }

  /// A store that reads fine but fails every write.
  struct BrokenStore;

  #[async_trait]
  impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> { Ok(None) }

    async fn set(&self, _key: &str, _value: String) -> Result<()> {
      Err(YomuError::Sqlite(rusqlite::Error::InvalidQuery))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
      Err(YomuError::Sqlite(rusqlite::Error::InvalidQuery))
    }

    async fn keys(&self, _prefix: &str) -> Result<Vec<String>> { Ok(Vec::new()) }
  }

  #[traced_test]
  #[tokio::test]
  async fn test_bookmark_lifecycle() {
    let library = Library::new(Arc::new(MemoryStore::new()));
    let manga = manga("m1");

    assert!(library.add_bookmark(&manga).await.unwrap());
    assert!(library.is_bookmarked("m1").await.unwrap());

    let bookmarks = library.bookmarks().await.unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].description, "説明");
    assert!(bookmarks[0].date_added > 0);

    assert!(library.remove_bookmark("m1").await.unwrap());
    assert!(!library.is_bookmarked("m1").await.unwrap());
    assert!(!library.remove_bookmark("m1").await.unwrap());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_removing_absent_bookmark_succeeds_without_writing() {
    let library = Library::new(Arc::new(BrokenStore));
    assert!(!library.remove_bookmark("never-added").await.unwrap());

    let store = Arc::new(MemoryStore::new());
    let library = Library::new(store.clone());
    assert!(!library.remove_bookmark("m1").await.unwrap());
    assert!(store.is_empty());
    assert!(!library.is_bookmarked("m1").await.unwrap());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_duplicate_bookmark_is_noop() {
    let library = Library::new(Arc::new(MemoryStore::new()));
    assert!(library.add_bookmark(&manga("m1")).await.unwrap());
    assert!(library.add_bookmark(&manga("m2")).await.unwrap());
    assert!(!library.add_bookmark(&manga("m1")).await.unwrap());

    let ids: Vec<_> = library.bookmarks().await.unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(ids, ["m1", "m2"]);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_read_state_is_scoped_by_manga() {
    let library = Library::new(Arc::new(MemoryStore::new()));

    assert!(library.add_read_chapter("manga-a", "1").await.unwrap());
    assert!(!library.add_read_chapter("manga-a", "1").await.unwrap());
    assert!(library.is_read("manga-a", "1").await.unwrap());
    assert!(!library.is_read("manga-b", "1").await.unwrap());

    assert!(library.add_read_chapter("manga-b", "1").await.unwrap());
    assert!(library.remove_read_chapter("manga-a", "1").await.unwrap());
    assert!(!library.is_read("manga-a", "1").await.unwrap());
    assert!(library.is_read("manga-b", "1").await.unwrap());
    assert!(!library.remove_read_chapter("manga-a", "1").await.unwrap());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_empty_read_set_is_removed() {
    let store = Arc::new(MemoryStore::new());
    let library = Library::new(store.clone());
    library.add_read_chapter("m1", "c1").await.unwrap();
    library.add_read_chapter("m1", "c2").await.unwrap();
    library.add_read_chapter("m2", "c1").await.unwrap();
    assert_eq!(library.read_chapters("m1").await.unwrap(), ["c1", "c2"]);
    assert_eq!(library.manga_with_read_chapters().await.unwrap(), ["m1", "m2"]);

    library.remove_read_chapter("m1", "c1").await.unwrap();
    library.remove_read_chapter("m1", "c2").await.unwrap();
    assert_eq!(store.get("read_chapters:m1").await.unwrap(), None);
    assert_eq!(library.manga_with_read_chapters().await.unwrap(), ["m2"]);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_concurrent_marks_are_not_lost() {
    let library = Library::new(Arc::new(MemoryStore::new()));
    let marks = (0..16).map(|n| {
      let library = &library;
      async move { library.add_read_chapter("m1", &format!("c{n}")).await }
    });
    for added in futures::future::join_all(marks).await {
      assert!(added.unwrap());
    }
    assert_eq!(library.read_chapters("m1").await.unwrap().len(), 16);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_store_failures_are_reported() {
    let library = Library::new(Arc::new(BrokenStore));

    let err = library.add_bookmark(&manga("m1")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(logs_contain("Failed to save bookmark"));

    let err = library.add_read_chapter("m1", "c1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
  }
}
