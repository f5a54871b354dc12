use tokio::sync::Mutex;

use super::*;
use crate::store::{KeyValueStore, KeyValueStoreExt, DOWNLOADS_KEY};

/// A chapter whose pages are stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedChapter {
  /// Manga the chapter belongs to
  pub manga_id:        String,
  /// Chapter identifier, unique within the manifest
  pub chapter_id:      String,
  /// Chapter title
  pub title:           String,
  /// Chapter number as listed by the source
  pub chapter_number:  String,
  /// Local page files, page `n` at index `n - 1`
  pub pages:           Vec<PathBuf>,
  /// When the download finished, epoch millis
  pub date_downloaded: i64,
  /// Offline copy of the manga, kept on one chapter per manga
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub manga_info:      Option<Manga>,
}

/// The persisted list of [`DownloadedChapter`] records.
///
/// Every mutation is a read-modify-write of the whole list under one async
/// lock, so concurrent downloads never lose each other's entries.
pub struct Manifest {
  store: Arc<dyn KeyValueStore>,
  lock:  Mutex<()>,
}

impl Manifest {
  /// Creates a manifest persisted in `store`.
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self { Self { store, lock: Mutex::new(()) } }

  /// Every record, in download order.
  pub async fn entries(&self) -> Result<Vec<DownloadedChapter>> {
    Ok(self.store.get_json(DOWNLOADS_KEY).await?.unwrap_or_default())
  }

  /// The record of `chapter_id`.
  pub async fn get(&self, chapter_id: &str) -> Result<Option<DownloadedChapter>> {
    Ok(self.entries().await?.into_iter().find(|d| d.chapter_id == chapter_id))
  }

  /// Adds a record unless its chapter is already present.
  ///
  /// The manga snapshot is only kept when no other chapter of the same manga
  /// carries one. Returns the record as stored.
  pub async fn append(&self, mut record: DownloadedChapter) -> Result<DownloadedChapter> {
    let _guard = self.lock.lock().await;
    let mut entries = self.entries().await?;

    if let Some(existing) = entries.iter().find(|d| d.chapter_id == record.chapter_id) {
      debug!(chapter_id = %record.chapter_id, "Chapter already in manifest");
      return Ok(existing.clone());
    }

    if entries.iter().any(|d| d.manga_id == record.manga_id && d.manga_info.is_some()) {
      record.manga_info = None;
    }
    entries.push(record.clone());
    self.store.set_json(DOWNLOADS_KEY, &entries).await?;
    Ok(record)
  }

  /// Removes the record of `chapter_id` and returns it.
  ///
  /// If it carried the manga snapshot, the snapshot moves to the next
  /// remaining chapter of that manga.
  pub async fn remove(&self, chapter_id: &str) -> Result<Option<DownloadedChapter>> {
    let _guard = self.lock.lock().await;
    let mut entries = self.entries().await?;

    let Some(index) = entries.iter().position(|d| d.chapter_id == chapter_id) else {
      return Ok(None);
    };
    let removed = entries.remove(index);

    if let Some(info) = &removed.manga_info {
      if let Some(heir) = entries.iter_mut().find(|d| d.manga_id == removed.manga_id) {
        trace!(manga_id = %removed.manga_id, heir = %heir.chapter_id, "Moving manga snapshot");
        heir.manga_info = Some(info.clone());
      }
    }

    self.store.set_json(DOWNLOADS_KEY, &entries).await?;
    Ok(Some(removed))
  }
}
