use reqwest::{header::REFERER, Client};

use super::*;

/// Retrieves the image bytes of one chapter page.
///
/// The download manager only talks to this trait, so the transport can be
/// swapped out (a shared client, a cache, or a fake in tests).
#[async_trait]
pub trait PageFetcher: Send + Sync {
  /// Fetches the image behind `page`.
  async fn fetch(&self, page: &ChapterPage) -> Result<Vec<u8>>;
}

/// [`PageFetcher`] that downloads images over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpPageFetcher {
  /// HTTP client used for every page
  client: Client,
}

impl HttpPageFetcher {
  /// Creates a fetcher sharing `client`'s connection pool.
  pub fn new(client: Client) -> Self { Self { client } }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
  async fn fetch(&self, page: &ChapterPage) -> Result<Vec<u8>> {
    let mut request = self.client.get(&page.img);
    if let Some(headers) = &page.header_for_image {
      request = request.header(REFERER, &headers.referer);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      trace!("Page {} response: {response:?}", page.page);
      return Err(YomuError::Upstream {
        status:  status.as_u16(),
        message: format!("Failed to download page {}: {status}", page.page),
      });
    }

    Ok(response.bytes().await?.to_vec())
  }
}
