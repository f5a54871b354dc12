use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;

use super::*;

/// [`KeyValueStore`] backed by a SQLite database.
///
/// The schema is created when the store is opened. If the database file does
/// not exist it is created, together with its parent directories.
pub struct SqliteStore {
  /// Async SQLite connection handle
  conn: Connection,
}

impl SqliteStore {
  /// Opens an existing store or creates a new one at `path`.
  ///
  /// # Errors
  ///
  /// Fails when the parent directory cannot be created or the schema
  /// cannot be applied.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    debug!("Opening key-value store at {}", path.display());
    Self::init(Connection::open(path).await?).await
  }

  /// Opens a store that lives only as long as this handle.
  pub async fn open_in_memory() -> Result<Self> {
    Self::init(Connection::open_in_memory().await?).await
  }

  async fn init(conn: Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(include_str!(concat!(
          env!("CARGO_MANIFEST_DIR"),
          "/migrations/init.sql"
        )))?;
        Ok(())
      })
      .await?;
    Ok(Self { conn })
  }

  /// Returns the default path for the database file.
  ///
  /// The path is constructed as follows:
  /// - On Unix: `~/.local/share/yomu/yomu.db`
  /// - On macOS: `~/Library/Application Support/yomu/yomu.db`
  /// - On Windows: `%APPDATA%\yomu\yomu.db`
  /// - Fallback: `./yomu/yomu.db`
  pub fn default_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("yomu").join("yomu.db")
  }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        let value = stmt.query_row(params![key], |row| row.get::<_, String>(0)).optional()?;
        Ok(value)
      })
      .await
      .map_err(YomuError::from)
  }

  async fn set(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_owned();
    trace!(key = %key, bytes = value.len(), "Writing key");
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "INSERT INTO kv (key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        )?;
        stmt.execute(params![key, value])?;
        Ok(())
      })
      .await
      .map_err(YomuError::from)
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
      })
      .await
      .map_err(YomuError::from)
  }

  async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
    let prefix = prefix.to_owned();
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let keys = stmt
          .query_map(params![prefix], |row| row.get::<_, String>(0))?
          .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
      })
      .await
      .map_err(YomuError::from)
  }
}
