//! Error types for the yomu library.
//!
//! A single error enum covers every failure mode of the reading core:
//! - Reaching the remote catalog (transport and upstream failures)
//! - Validating catalog payloads at the adapter boundary
//! - Reading and writing the persistent key-value store
//! - Writing and deleting downloaded page files
//! - Operating on records that do not exist
//!
//! Library and download operations return these errors instead of bare
//! success flags, so callers can tell a full disk from a missing record.
//! [`YomuError::kind`] collapses the variants into the coarse
//! [`ErrorKind`] taxonomy for callers that only need to pick a message.
//!
//! # Examples
//!
//! ```no_run
//! use yomu::{error::ErrorKind, Config, Yomu};
//!
//! # async fn example() -> Result<(), yomu::error::YomuError> {
//! let yomu = Yomu::from_config(Config::default()).await?;
//! match yomu.manga_info("a1c7c817-4e59-43b7-9365-09675a149a6f").await {
//!   Ok(manga) => println!("{}", manga.title),
//!   Err(e) if e.kind() == ErrorKind::Network => println!("Offline, try again later"),
//!   Err(e) => println!("Something else went wrong: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

/// Error type alias used for the [`yomu`](crate) crate.
pub type Result<T> = core::result::Result<T, YomuError>;

/// Errors that can occur while searching, reading, bookmarking or downloading.
#[derive(Error, Debug)]
pub enum YomuError {
  /// The catalog API could not be reached.
  ///
  /// Covers DNS failures, refused connections, TLS errors and transport
  /// timeouts reported by `reqwest`.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The catalog API answered, but with an error status or an unusable body.
  #[error("Upstream error ({status}): {message}")]
  Upstream {
    /// HTTP status code returned by the catalog.
    status:  u16,
    /// Body excerpt or description of the problem.
    message: String,
  },

  /// A catalog payload could not be decoded or failed boundary validation.
  #[error("Invalid payload: {0}")]
  InvalidPayload(String),

  /// A SQLite operation failed.
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// An async SQLite operation failed.
  #[error(transparent)]
  AsyncSqlite(#[from] tokio_rusqlite::Error),

  /// A stored JSON document could not be encoded or decoded.
  #[error(transparent)]
  Serialization(#[from] serde_json::Error),

  /// A local file could not be written, read or deleted.
  #[error(transparent)]
  File(#[from] std::io::Error),

  /// No record exists for the given identifier.
  #[error("Not found: {0}")]
  NotFound(String),

  /// The registry has no adapter under the given name.
  #[error("No content source registered under \"{0}\"")]
  UnknownSource(String),

  /// The given name is not a valid source selection.
  #[error("Invalid source \"{0}\", see `yomu::source::SourceKind`")]
  InvalidSource(String),

  /// Offline downloads were requested but no download directory is available.
  #[error("Offline downloads are not available on this device")]
  DownloadsUnsupported,

  /// A download this call joined (same chapter already in flight) failed.
  #[error("Download of chapter {chapter_id} failed: {reason}")]
  DownloadFailed {
    /// Chapter whose download failed.
    chapter_id: String,
    /// Rendered cause of the original failure.
    reason:     String,
  },

  /// A TOML document could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// A TOML document could not be written.
  #[error(transparent)]
  TomlSer(#[from] toml::ser::Error),

  /// Configuration is missing or inconsistent.
  #[error("{0}")]
  Config(String),
}

/// Coarse classification of a [`YomuError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Transport-level failure reaching the catalog API.
  Network,
  /// The catalog answered with an error, an empty or a malformed payload.
  Upstream,
  /// The persistent store could not be read or written.
  Storage,
  /// A local file could not be written or deleted.
  File,
  /// The targeted record does not exist.
  NotFound,
  /// Source selection failed.
  Source,
  /// The operation is not available on this device.
  Unsupported,
  /// Configuration problem.
  Config,
}

impl YomuError {
  /// Returns the taxonomy bucket of this error.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Network(_) => ErrorKind::Network,
      Self::Upstream { .. } | Self::InvalidPayload(_) | Self::DownloadFailed { .. } =>
        ErrorKind::Upstream,
      Self::Sqlite(_) | Self::AsyncSqlite(_) | Self::Serialization(_) => ErrorKind::Storage,
      Self::File(_) => ErrorKind::File,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::UnknownSource(_) | Self::InvalidSource(_) => ErrorKind::Source,
      Self::DownloadsUnsupported => ErrorKind::Unsupported,
      Self::TomlDe(_) | Self::TomlSer(_) | Self::Config(_) => ErrorKind::Config,
    }
  }
}
