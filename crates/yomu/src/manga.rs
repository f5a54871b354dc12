//! Catalog data model shared by every content source.
//!
//! These types are the typed boundary between the loosely shaped JSON served
//! by the catalog API and the rest of the crate. Deserialization is lenient
//! about representation (`null` lists, numeric chapter numbers, plain-string
//! descriptions) and [`Manga::validate`] / [`ChapterPage::validate`] are
//! strict about content: records without identifiers or image URLs are
//! rejected before they reach the library or the download manager.
//!
//! The serialized form uses the catalog's camelCase field names, which is
//! also the shape persisted in the download manifest.
//!
//! # Examples
//!
//! ```
//! use yomu::manga::Manga;
//!
//! let manga: Manga = serde_json::from_str(
//!   r#"{
//!     "id": "one-piece",
//!     "title": "One Piece",
//!     "description": { "fr": "Pirates", "en": "Pirates!" },
//!     "chapters": null
//!   }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(manga.description.resolve(), "Pirates!");
//! assert!(manga.chapters.is_empty());
//! ```

use std::fmt;

use serde::{
  de::{self, MapAccess, Visitor},
  ser::SerializeMap,
  Deserializer, Serializer,
};

use super::*;

/// A manga as returned by a content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manga {
  /// Source-scoped unique identifier
  pub id:           String,
  /// Display title
  #[serde(default, deserialize_with = "nullable")]
  pub title:        String,
  /// Cover image URL
  #[serde(default, deserialize_with = "nullable")]
  pub image:        String,
  /// Publication status as reported by the source (e.g. "ongoing")
  #[serde(default, deserialize_with = "nullable")]
  pub status:       String,
  /// Genre tags
  #[serde(default, deserialize_with = "nullable")]
  pub genres:       Vec<String>,
  /// Theme tags
  #[serde(default, deserialize_with = "nullable")]
  pub themes:       Vec<String>,
  /// Release date or year, kept verbatim
  #[serde(default, deserialize_with = "string_or_number")]
  pub release_date: Option<String>,
  /// Localized descriptions
  #[serde(default)]
  pub description:  Description,
  /// Chapters in source order, never absent
  #[serde(default, deserialize_with = "nullable")]
  pub chapters:     Vec<Chapter>,
}

/// A chapter listed in a manga's detail payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
  /// Identifier, unique within a source
  pub id:             String,
  /// Display title
  #[serde(default, deserialize_with = "nullable")]
  pub title:          String,
  /// Chapter number as text; not guaranteed to be numeric
  #[serde(default, deserialize_with = "string_or_number_or_empty")]
  pub chapter_number: String,
}

/// A single page image of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPage {
  /// Image URL, or a local file path for downloaded chapters
  pub img:              String,
  /// Sequence number within the chapter
  pub page:             u32,
  /// Headers the image host requires
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub header_for_image: Option<ImageHeaders>,
}

/// Request headers some image hosts insist on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHeaders {
  /// Value for the `Referer` header
  #[serde(rename = "Referer")]
  pub referer: String,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
  /// Page number reported by the catalog
  #[serde(default)]
  pub current_page:  Option<u32>,
  /// Whether the catalog has more results
  #[serde(default)]
  pub has_next_page: bool,
  /// Matching manga, unique by id
  #[serde(default, deserialize_with = "nullable")]
  pub results:       Vec<Manga>,
}

/// Descriptions keyed by language code, in the order the source sent them.
///
/// Sources either send a language map or a single string; a single string is
/// kept under `"en"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description(Vec<(String, String)>);

impl Description {
  /// Builds a description from `(language, text)` pairs.
  pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
    Self(entries.into_iter().collect())
  }

  /// Text for one language, if present.
  pub fn get(&self, language: &str) -> Option<&str> {
    self.0.iter().find(|(lang, _)| lang == language).map(|(_, text)| text.as_str())
  }

  /// Resolves to a single string: English, else the first non-empty language, else `""`.
  pub fn resolve(&self) -> &str {
    self
      .get("en")
      .filter(|text| !text.is_empty())
      .or_else(|| self.0.iter().map(|(_, text)| text.as_str()).find(|text| !text.is_empty()))
      .unwrap_or("")
  }

  /// Whether no language is present.
  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Manga {
  /// Checks the fields the rest of the crate relies on.
  ///
  /// # Errors
  ///
  /// Returns [`YomuError::InvalidPayload`] when the manga or one of its
  /// chapters has an empty identifier.
  pub fn validate(&self) -> Result<()> {
    if self.id.trim().is_empty() {
      return Err(YomuError::InvalidPayload(format!("manga \"{}\" has no id", self.title)));
    }
    if let Some(chapter) = self.chapters.iter().find(|c| c.id.trim().is_empty()) {
      return Err(YomuError::InvalidPayload(format!(
        "chapter \"{}\" of manga {} has no id",
        chapter.title, self.id
      )));
    }
    Ok(())
  }

  /// Looks up a chapter by id.
  pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
    self.chapters.iter().find(|c| c.id == chapter_id)
  }
}

impl ChapterPage {
  /// Rejects pages without an image location.
  pub fn validate(&self) -> Result<()> {
    if self.img.trim().is_empty() {
      return Err(YomuError::InvalidPayload(format!("page {} has no image URL", self.page)));
    }
    Ok(())
  }
}

impl SearchResults {
  /// Validates every result and drops repeated ids, keeping the first occurrence.
  pub fn normalize(mut self) -> Result<Self> {
    let mut seen = std::collections::HashSet::new();
    for manga in &self.results {
      manga.validate()?;
    }
    self.results.retain(|manga| seen.insert(manga.id.clone()));
    Ok(self)
  }
}

impl Serialize for Description {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for (lang, text) in &self.0 {
      map.serialize_entry(lang, text)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for Description {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    struct DescriptionVisitor;

    impl<'de> Visitor<'de> for DescriptionVisitor {
      type Value = Description;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or a map of language codes to text")
      }

      fn visit_str<E: de::Error>(self, text: &str) -> std::result::Result<Description, E> {
        if text.is_empty() {
          Ok(Description::default())
        } else {
          Ok(Description(vec![("en".to_string(), text.to_string())]))
        }
      }

      fn visit_unit<E: de::Error>(self) -> std::result::Result<Description, E> {
        Ok(Description::default())
      }

      fn visit_none<E: de::Error>(self) -> std::result::Result<Description, E> {
        Ok(Description::default())
      }

      fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
      ) -> std::result::Result<Description, A::Error> {
        let mut entries = Vec::new();
        while let Some((lang, text)) = access.next_entry::<String, Option<String>>()? {
          if let Some(text) = text {
            entries.push((lang, text));
          }
        }
        Ok(Description(entries))
      }
    }

    deserializer.deserialize_any(DescriptionVisitor)
  }
}

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>, {
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `"2019"`, `2019` or `null`.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where D: Deserializer<'de> {
  match Option::<serde_json::Value>::deserialize(deserializer)? {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(serde_json::Value::String(s)) => Ok(Some(s)),
    Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
    Some(other) => Err(de::Error::custom(format!("expected string or number, got {other}"))),
  }
}

fn string_or_number_or_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where D: Deserializer<'de> {
  string_or_number(deserializer).map(Option::unwrap_or_default)
}
