//! Persistent key-value storage.
//!
//! Every piece of persisted state (bookmarks, read state, the download
//! manifest and the active source preference) lives under a namespaced key in
//! a [`KeyValueStore`]. Values are JSON documents or plain strings; the
//! [`KeyValueStoreExt`] helpers handle the JSON encoding.
//!
//! Two backends are provided:
//! - [`SqliteStore`]: a SQLite file accessed through `tokio-rusqlite`
//! - [`MemoryStore`]: an in-process map for tests and ephemeral sessions
//!
//! # Examples
//!
//! ```no_run
//! use yomu::store::{KeyValueStore, KeyValueStoreExt, SqliteStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open(SqliteStore::default_path()).await?;
//! store.set_json("bookmarks", &Vec::<String>::new()).await?;
//! let raw = store.get("bookmarks").await?;
//! assert_eq!(raw.as_deref(), Some("[]"));
//! # Ok(())
//! # }
//! ```

use serde::de::DeserializeOwned;

use super::*;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key holding the bookmark collection.
pub const BOOKMARKS_KEY: &str = "bookmarks";
/// Key holding the download manifest.
pub const DOWNLOADS_KEY: &str = "downloads";
/// Key holding the active source name.
pub const ACTIVE_SOURCE_KEY: &str = "active_source";
/// Prefix of the per-manga read-state keys.
pub const READ_CHAPTERS_PREFIX: &str = "read_chapters:";

/// Builds the read-state key of one manga.
pub fn read_chapters_key(manga_id: &str) -> String { format!("{READ_CHAPTERS_PREFIX}{manga_id}") }

/// Scoped string storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Returns the value stored under `key`.
  async fn get(&self, key: &str) -> Result<Option<String>>;

  /// Stores `value` under `key`, replacing any previous value.
  async fn set(&self, key: &str, value: String) -> Result<()>;

  /// Deletes `key`. Deleting an absent key is not an error.
  async fn remove(&self, key: &str) -> Result<()>;

  /// Lists keys starting with `prefix`, in ascending order.
  async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// JSON helpers available on every [`KeyValueStore`].
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
  /// Reads and decodes the JSON document under `key`.
  async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
  where T: DeserializeOwned + Send {
    match self.get(key).await? {
      Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
      None => Ok(None),
    }
  }

  /// Encodes `value` as JSON and stores it under `key`.
  async fn set_json<T>(&self, key: &str, value: &T) -> Result<()>
  where T: Serialize + Sync + ?Sized {
    let raw = serde_json::to_string(value)?;
    self.set(key, raw).await
  }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}
