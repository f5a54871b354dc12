//! File naming helpers for downloaded pages.
//!
//! Chapter identifiers come straight from the catalog and may contain
//! characters that are not valid in file names on every platform (MangaHere
//! ids look like `one_piece/c1000`). The helpers here turn them into flat,
//! portable names so every page lands directly in the download directory.
//!
//! Distinct chapter ids always map to distinct names, so one chapter's files
//! are never shared with another's.
//!
//! # Examples
//!
//! ```
//! use yomu::format::page_filename;
//!
//! assert_eq!(page_filename("one_piece/c1000", 3), "one_piece%2Fc1000_3.jpg");
//! assert_eq!(page_filename("a1c7-44f0", 12), "a1c7-44f0_12.jpg");
//! ```

/// Percent-encodes every character that is not portable in a file name.
///
/// ASCII letters, digits, `-`, `_`, `.` and `~` are kept; everything else,
/// including `%` itself, path separators, drive colons and non-ASCII text,
/// becomes `%XX` escapes of its UTF-8 bytes. A leading `.` is escaped as
/// well, so the result is never `.`, `..` or a hidden file.
///
/// The mapping is one-to-one: decoding the result gives back `input`.
pub fn sanitize(input: &str) -> String {
  let encoded = urlencoding::encode(input);
  if let Some(rest) = encoded.strip_prefix('.') {
    return format!("%2E{rest}");
  }
  encoded.into_owned()
}

/// File name of one downloaded page: `{chapterId}_{page}.jpg`.
///
/// The page number follows the last `_`, which never occurs in it, so names
/// stay unique across both chapters and pages.
pub fn page_filename(chapter_id: &str, page: u32) -> String {
  format!("{}_{page}.jpg", sanitize(chapter_id))
}
