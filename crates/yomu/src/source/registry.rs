use std::sync::OnceLock;

use super::*;
use crate::store::{KeyValueStore, ACTIVE_SOURCE_KEY};

/// Lazily built, cached adapters for every [`SourceKind`].
///
/// Adapters are created on first use from the user's override file in the
/// sources directory when one exists, otherwise from the embedded
/// definition. Once created, the same handle is returned for the life of the
/// registry.
pub struct SourceRegistry {
  /// Catalog API base URL handed to every adapter
  base_url:    String,
  /// Directory searched for `<name>.toml` overrides
  sources_dir: Option<PathBuf>,
  /// One cell per supported source
  adapters:    HashMap<SourceKind, OnceLock<Arc<dyn ContentSource>>>,
}

impl SourceRegistry {
  /// Creates a registry for the catalog at `base_url`.
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url:    base_url.into(),
      sources_dir: None,
      adapters:    SourceKind::ALL.into_iter().map(|kind| (kind, OnceLock::new())).collect(),
    }
  }

  /// Looks for source definition overrides in `dir`.
  pub fn with_sources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.sources_dir = Some(dir.into());
    self
  }

  /// Installs a ready-made adapter for `kind` instead of building one.
  pub fn with_adapter(self, kind: SourceKind, adapter: Arc<dyn ContentSource>) -> Self {
    if let Some(cell) = self.adapters.get(&kind) {
      if cell.set(adapter).is_err() {
        warn!(source = %kind, "Adapter already initialized; keeping the existing one");
      }
    }
    self
  }

  /// Names of every registered source.
  pub fn names(&self) -> Vec<&'static str> { SourceKind::ALL.iter().map(|k| k.as_str()).collect() }

  /// Resolves an adapter by name.
  ///
  /// # Errors
  ///
  /// Returns [`YomuError::UnknownSource`] when no adapter is registered
  /// under `name`.
  pub fn get(&self, name: &str) -> Result<Arc<dyn ContentSource>> {
    let kind =
      SourceKind::from_str(name).map_err(|_| YomuError::UnknownSource(name.to_owned()))?;
    self.adapter(kind)
  }

  /// Returns the adapter of `kind`, building it on first use.
  pub fn adapter(&self, kind: SourceKind) -> Result<Arc<dyn ContentSource>> {
    let cell =
      self.adapters.get(&kind).ok_or_else(|| YomuError::UnknownSource(kind.to_string()))?;
    if let Some(adapter) = cell.get() {
      return Ok(Arc::clone(adapter));
    }

    let built: Arc<dyn ContentSource> =
      Arc::new(HttpSource::new(self.config(kind)?, self.base_url.as_str())?);
    debug!(source = %kind, "Initialized content source");
    Ok(Arc::clone(cell.get_or_init(|| built)))
  }

  /// Loads the definition of `kind`, preferring a user override.
  fn config(&self, kind: SourceKind) -> Result<SourceConfig> {
    if let Some(dir) = &self.sources_dir {
      let path = dir.join(format!("{}.toml", kind.as_str()));
      if path.is_file() {
        debug!("Loading {kind} definition from {}", path.display());
        let config = SourceConfig::from_file(&path)?;
        if config.name != kind.as_str() {
          return Err(YomuError::Config(format!(
            "{} defines source \"{}\", expected \"{kind}\"",
            path.display(),
            config.name
          )));
        }
        return Ok(config);
      }
    }
    kind.default_config()
  }
}

/// Resolves the active content source from the persisted preference.
pub struct SourceSelector {
  /// Adapters by source
  registry: SourceRegistry,
  /// Where the preference is persisted
  store:    Arc<dyn KeyValueStore>,
}

impl SourceSelector {
  /// Creates a selector persisting its preference in `store`.
  pub fn new(registry: SourceRegistry, store: Arc<dyn KeyValueStore>) -> Self {
    Self { registry, store }
  }

  /// The underlying registry.
  pub fn registry(&self) -> &SourceRegistry { &self.registry }

  /// The selected source.
  ///
  /// An unset or unrecognized preference resolves to the default source; a
  /// corrupted value never blocks the application.
  pub async fn active_source(&self) -> Result<SourceKind> {
    match self.store.get(ACTIVE_SOURCE_KEY).await? {
      None => Ok(SourceKind::default()),
      Some(name) => Ok(SourceKind::from_str(&name).unwrap_or_else(|_| {
        warn!("Ignoring unrecognized source preference {name:?}, using the default");
        SourceKind::default()
      })),
    }
  }

  /// The adapter of the selected source.
  pub async fn active_adapter(&self) -> Result<Arc<dyn ContentSource>> {
    let kind = self.active_source().await?;
    self.registry.adapter(kind)
  }

  /// Persists a new selection.
  ///
  /// # Errors
  ///
  /// Returns [`YomuError::InvalidSource`] for names outside the registry; the
  /// previous selection is left untouched.
  pub async fn set_active_source(&self, name: &str) -> Result<SourceKind> {
    let kind = SourceKind::from_str(name)?;
    self.store.set(ACTIVE_SOURCE_KEY, kind.as_str().to_owned()).await?;
    info!(source = %kind, "Active source changed");
    Ok(kind)
  }
}
