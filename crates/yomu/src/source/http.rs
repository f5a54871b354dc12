use reqwest::Client;
use serde::de::DeserializeOwned;

use super::*;

/// Largest body excerpt carried by an [`YomuError::Upstream`] error.
const ERROR_EXCERPT_LEN: usize = 200;

/// [`ContentSource`] backed by the catalog HTTP API.
///
/// Requests are built from the source's [`SourceConfig`]; responses are
/// decoded into the typed model and validated before they are returned.
#[derive(Debug, Clone)]
pub struct HttpSource {
  /// Endpoint, header and rewrite definitions
  config:   SourceConfig,
  /// Catalog API base URL
  base_url: String,
  /// Shared HTTP client
  client:   Client,
}

impl HttpSource {
  /// Creates an adapter for `config` against the catalog at `base_url`.
  ///
  /// # Errors
  ///
  /// Returns [`YomuError::Config`] when `base_url` cannot be used to build
  /// request URLs.
  pub fn new(config: SourceConfig, base_url: impl Into<String>) -> Result<Self> {
    let base_url = base_url.into();
    config.endpoint_url(&base_url, &config.endpoints.search, "")?;
    Ok(Self { config, base_url, client: Client::new() })
  }

  /// Replaces the HTTP client, e.g. to share a connection pool.
  pub fn with_client(mut self, client: Client) -> Self {
    self.client = client;
    self
  }

  /// The source definition in use.
  pub fn config(&self) -> &SourceConfig { &self.config }

  /// Sends a GET request and returns the body of a successful response.
  async fn fetch(&self, endpoint: &Endpoint, value: &str) -> Result<Vec<u8>> {
    let url = self.config.endpoint_url(&self.base_url, endpoint, value)?;
    debug!("Fetching from {} via: {}", self.config.name, url);

    let mut request = self.client.get(url);
    for (key, value) in &self.config.headers {
      request = request.header(key, value);
    }

    let response = request.send().await?;
    let status = response.status();
    let data = response.bytes().await?;
    trace!("{} response ({status}): {}", self.config.name, String::from_utf8_lossy(&data));

    if !status.is_success() {
      let body = String::from_utf8_lossy(&data);
      let message = body.chars().take(ERROR_EXCERPT_LEN).collect::<String>();
      warn!(source = %self.config.name, status = status.as_u16(), "Catalog request failed");
      return Err(YomuError::Upstream { status: status.as_u16(), message });
    }
    Ok(data.to_vec())
  }

  /// Decodes and validates a search response.
  pub fn process_search(&self, data: &[u8]) -> Result<SearchResults> {
    decode::<SearchResults>(data)?.normalize()
  }

  /// Decodes and validates a manga detail response.
  pub fn process_info(&self, data: &[u8]) -> Result<Manga> {
    let manga = decode::<Manga>(data)?;
    manga.validate()?;
    Ok(manga)
  }

  /// Decodes, validates and rewrites a chapter page listing.
  ///
  /// An empty listing is an upstream failure: a chapter without pages
  /// cannot be read.
  pub fn process_pages(&self, data: &[u8]) -> Result<Vec<ChapterPage>> {
    let pages = decode::<Vec<ChapterPage>>(data)?;
    if pages.is_empty() {
      return Err(YomuError::Upstream {
        status:  200,
        message: "No pages found for this chapter".to_string(),
      });
    }
    pages
      .into_iter()
      .map(|page| {
        page.validate()?;
        Ok(self.config.rewrite_page(page))
      })
      .collect()
  }
}

#[async_trait]
impl ContentSource for HttpSource {
  fn name(&self) -> &str { &self.config.name }

  async fn search_manga(&self, query: &str) -> Result<SearchResults> {
    let data = self.fetch(&self.config.endpoints.search, query).await?;
    self.process_search(&data)
  }

  async fn manga_info(&self, id: &str) -> Result<Manga> {
    let data = self.fetch(&self.config.endpoints.info, id).await?;
    self.process_info(&data)
  }

  async fn chapter_pages(&self, chapter_id: &str) -> Result<Vec<ChapterPage>> {
    let data = self.fetch(&self.config.endpoints.read, chapter_id).await?;
    self.process_pages(&data)
  }
}

/// Decodes a JSON body, reporting failures as invalid payloads.
fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
  serde_json::from_slice(data)
    .map_err(|e| YomuError::InvalidPayload(format!("Failed to parse JSON: {e}")))
}
