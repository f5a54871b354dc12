use super::*;

/// Configuration for one content source.
///
/// Describes where the source lives below the catalog API base URL, how each
/// operation maps onto a request, and which rewrites its page URLs need.
///
/// # Examples
///
/// ```
/// use yomu::source::SourceConfig;
///
/// let config = SourceConfig::from_toml_str(
///   r#"
///     name = "mangadex"
///     path = "manga/mangadex"
///
///     [endpoints.search]
///     segments = ["{value}"]
///
///     [endpoints.info]
///     segments = ["info", "{value}"]
///
///     [endpoints.read]
///     segments = ["read", "{value}"]
///   "#,
/// )
/// .unwrap();
///
/// let url = config.endpoint_url("http://localhost:3000", &config.endpoints.info, "abc").unwrap();
/// assert_eq!(url.as_str(), "http://localhost:3000/manga/mangadex/info/abc");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
  /// Name of this source, matching a [`SourceKind`]
  pub name:          String,
  /// Path of the source below the API base URL
  pub path:          String,
  /// Request shape of each operation
  pub endpoints:     Endpoints,
  /// Extra HTTP headers sent with every catalog request
  #[serde(default)]
  pub headers:       HashMap<String, String>,
  /// Rewrites applied, in order, to every page's image URL and Referer
  #[serde(default)]
  pub page_rewrites: Vec<Rewrite>,
}

/// Request shapes of the three catalog operations.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
  /// Search by free text
  pub search: Endpoint,
  /// Manga details by id
  pub info:   Endpoint,
  /// Chapter pages by chapter id
  pub read:   Endpoint,
}

/// How an operation's argument is placed into the request URL.
///
/// `segments` are appended to the source path; the literal segment
/// `{value}` is replaced by the argument. When `query` is set, the argument
/// is also sent as that query parameter. Either way it is percent-encoded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Endpoint {
  /// Path segments below the source path
  #[serde(default)]
  pub segments: Vec<String>,
  /// Query parameter carrying the argument
  #[serde(default)]
  pub query:    Option<String>,
}

/// A regex substitution applied to page URLs.
#[derive(Debug, Clone, Deserialize)]
pub struct Rewrite {
  /// Pattern to search for
  #[serde(deserialize_with = "deserialize_regex")]
  pub pattern:     Regex,
  /// Replacement text, may use capture groups
  pub replacement: String,
}

/// Placeholder segment replaced by an operation's argument.
const VALUE_PLACEHOLDER: &str = "{value}";

impl SourceConfig {
  /// Parses a source definition from TOML.
  pub fn from_toml_str(toml_str: &str) -> Result<Self> { Ok(toml::from_str(toml_str)?) }

  /// Reads a source definition from a TOML file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Self::from_toml_str(&content)
  }

  /// Builds the request URL of `endpoint` for `value`.
  ///
  /// # Errors
  ///
  /// Returns [`YomuError::Config`] when `base_url` is not an absolute
  /// http(s) URL.
  pub fn endpoint_url(&self, base_url: &str, endpoint: &Endpoint, value: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)
      .map_err(|e| YomuError::Config(format!("Invalid API base URL {base_url:?}: {e}")))?;

    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|_| YomuError::Config(format!("API base URL {base_url:?} cannot have paths")))?;
      segments.pop_if_empty();
      segments.extend(self.path.split('/').filter(|part| !part.is_empty()));
      for segment in &endpoint.segments {
        if segment == VALUE_PLACEHOLDER {
          segments.push(value);
        } else {
          segments.push(segment);
        }
      }
    }

    if let Some(param) = &endpoint.query {
      url.query_pairs_mut().append_pair(param, value);
    }

    Ok(url)
  }

  /// Applies every page rewrite to `input`.
  pub fn rewrite(&self, input: &str) -> String {
    self.page_rewrites.iter().fold(input.to_owned(), |acc, rewrite| {
      rewrite.pattern.replace_all(&acc, rewrite.replacement.as_str()).into_owned()
    })
  }

  /// Applies the page rewrites to a page's image URL and Referer header.
  pub fn rewrite_page(&self, mut page: ChapterPage) -> ChapterPage {
    if self.page_rewrites.is_empty() {
      return page;
    }
    page.img = self.rewrite(&page.img);
    if let Some(headers) = page.header_for_image.as_mut() {
      headers.referer = self.rewrite(&headers.referer);
    }
    page
  }
}

/// Custom deserializer for converting string patterns into [`Regex`] objects.
fn deserialize_regex<'de, D>(deserializer: D) -> std::result::Result<Regex, D::Error>
where D: serde::Deserializer<'de> {
  let s: String = String::deserialize(deserializer)?;
  Regex::new(&s).map_err(serde::de::Error::custom)
}
