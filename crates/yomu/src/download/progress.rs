use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
};

use tokio::sync::broadcast;

use super::*;

/// Number of events a slow subscriber may lag behind before missing some.
const EVENT_CAPACITY: usize = 64;

/// Lifecycle of one chapter download.
///
/// ```text
/// NotDownloaded -> Pending -> Downloading -> Completed
///                     ^            |
///                     |            v
///                     +--------- Error
/// ```
///
/// `Completed` only returns to `NotDownloaded` through deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
  /// No local copy and no attempt recorded
  NotDownloaded,
  /// Accepted, no page fetched yet
  Pending,
  /// Pages are being fetched
  Downloading,
  /// Every page is on disk and the chapter is in the manifest
  Completed,
  /// The last attempt failed
  Error,
}

impl DownloadStatus {
  /// Whether the state machine allows moving from `self` to `next`.
  pub fn can_transition_to(self, next: DownloadStatus) -> bool {
    use DownloadStatus::*;
    matches!(
      (self, next),
      (NotDownloaded | Error, Pending)
        | (Pending, Downloading | Error)
        | (Downloading, Downloading | Completed | Error)
        | (Completed, NotDownloaded)
    )
  }
}

impl fmt::Display for DownloadStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      DownloadStatus::NotDownloaded => "not downloaded",
      DownloadStatus::Pending => "pending",
      DownloadStatus::Downloading => "downloading",
      DownloadStatus::Completed => "completed",
      DownloadStatus::Error => "error",
    };
    f.write_str(name)
  }
}

/// Snapshot of one chapter's download progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
  /// Percentage of pages on disk, `0.0..=100.0`
  pub progress: f64,
  /// Current state
  pub status:   DownloadStatus,
}

impl DownloadProgress {
  /// A freshly accepted download.
  pub fn pending() -> Self { Self { progress: 0.0, status: DownloadStatus::Pending } }

  /// `completed` of `total` pages fetched.
  pub fn downloading(completed: usize, total: usize) -> Self {
    let progress = if total == 0 { 0.0 } else { completed as f64 / total as f64 * 100.0 };
    Self { progress, status: DownloadStatus::Downloading }
  }

  /// A finished download.
  pub fn completed() -> Self { Self { progress: 100.0, status: DownloadStatus::Completed } }

  /// A failed download; progress is reset.
  pub fn failed() -> Self { Self { progress: 0.0, status: DownloadStatus::Error } }

  /// A chapter without a local copy.
  pub fn not_downloaded() -> Self {
    Self { progress: 0.0, status: DownloadStatus::NotDownloaded }
  }
}

/// The record returned when nothing was ever tracked for a chapter.
///
/// This does not mean the chapter is queued.
impl Default for DownloadProgress {
  fn default() -> Self { Self::pending() }
}

/// A progress change published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
  /// Chapter whose progress changed
  pub chapter_id: String,
  /// New progress record
  pub progress:   DownloadProgress,
}

/// Per-chapter progress records owned by one [`DownloadManager`].
///
/// Every accepted change is broadcast as a [`ProgressEvent`].
pub struct ProgressTracker {
  /// Latest record per chapter
  records: Mutex<HashMap<String, DownloadProgress>>,
  /// Change notifications
  events:  broadcast::Sender<ProgressEvent>,
}

impl ProgressTracker {
  /// Creates an empty tracker.
  pub fn new() -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self { records: Mutex::new(HashMap::new()), events }
  }

  /// Latest record for `chapter_id`, if one exists.
  pub fn record(&self, chapter_id: &str) -> Option<DownloadProgress> {
    self.records.lock().unwrap_or_else(PoisonError::into_inner).get(chapter_id).copied()
  }

  /// Latest record for `chapter_id`, or the default record.
  pub fn get(&self, chapter_id: &str) -> DownloadProgress {
    self.record(chapter_id).unwrap_or_default()
  }

  /// Applies `next` if the state machine allows it; returns whether it did.
  pub fn transition(&self, chapter_id: &str, next: DownloadProgress) -> bool {
    {
      let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
      let current = records.get(chapter_id).map_or(DownloadStatus::NotDownloaded, |r| r.status);
      if !current.can_transition_to(next.status) {
        warn!(chapter_id, from = %current, to = %next.status, "Rejected download state change");
        return false;
      }
      records.insert(chapter_id.to_owned(), next);
    }
    self.publish(chapter_id, next);
    true
  }

  /// Marks a chapter found in the manifest as completed, whatever was tracked.
  pub fn restore_completed(&self, chapter_id: &str) {
    let previous = self
      .records
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(chapter_id.to_owned(), DownloadProgress::completed());
    if previous != Some(DownloadProgress::completed()) {
      self.publish(chapter_id, DownloadProgress::completed());
    }
  }

  /// Drops the record of a deleted chapter.
  pub fn clear(&self, chapter_id: &str) {
    let removed =
      self.records.lock().unwrap_or_else(PoisonError::into_inner).remove(chapter_id).is_some();
    if removed {
      self.publish(chapter_id, DownloadProgress::not_downloaded());
    }
  }

  /// Receives every change from now on.
  pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> { self.events.subscribe() }

  fn publish(&self, chapter_id: &str, progress: DownloadProgress) {
    // No subscribers is not an error.
    let _ = self.events.send(ProgressEvent { chapter_id: chapter_id.to_owned(), progress });
  }
}

impl Default for ProgressTracker {
  fn default() -> Self { Self::new() }
}
