use std::{
  collections::BTreeMap,
  sync::{Mutex, PoisonError},
};

use super::*;

/// In-process [`KeyValueStore`]; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
  /// Creates an empty store.
  pub fn new() -> Self { Self::default() }

  /// Number of stored keys.
  pub fn len(&self) -> usize { self.entries.lock().unwrap_or_else(PoisonError::into_inner).len() }

  /// Whether no key is stored.
  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<()> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
    Ok(())
  }

  async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
    Ok(
      self
        .entries
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .filter(|key| key.starts_with(prefix))
        .cloned()
        .collect(),
    )
  }
}
