//! Terminal input and output.

use console::Term;
use dialoguer::Confirm;
use serde::Serialize;
use yomu::{
  download::DownloadedChapter,
  library::BookmarkItem,
  manga::{ChapterPage, Manga, SearchResults},
};

use super::*;

pub static INFO_PREFIX: &str = "ℹ ";
pub static WORKING_PREFIX: &str = "» ";
pub static SUCCESS_PREFIX: &str = "✓ ";
pub static ERROR_PREFIX: &str = "✗ ";
pub static PROMPT_PREFIX: &str = "❯ ";
pub static ITEM_PREFIX: &str = "├─";
pub static LAST_ITEM_PREFIX: &str = "└─";
pub static ARROW: &str = "→";

/// Something a command wants to show.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  Manga(&'a Manga),
  SearchResults(&'a SearchResults),
  Pages(&'a [ChapterPage]),
  Bookmarks(&'a [BookmarkItem]),
  Downloads(&'a [DownloadedChapter]),
  ReadChapters { manga_id: &'a str, chapters: &'a [String] },
  Sources { active: SourceKind, available: &'a [&'static str] },
  Success(&'a str),
  Working(&'a str),
  Info(&'a str),
}

pub trait UserInteraction {
  fn confirm(&self, message: &str) -> Result<bool>;
  fn reply(&self, content: ResponseContent) -> Result<()>;
}

/// Interaction through stdin and stdout.
///
/// With `json` set, data is printed as JSON on stdout and status messages
/// move to stderr.
pub struct Terminal {
  accept_defaults: bool,
  json:            bool,
}

impl Terminal {
  pub fn new(accept_defaults: bool, json: bool) -> Self { Self { accept_defaults, json } }

  fn print_json(&self, value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
  }

  fn status(&self, prefix: String, message: &str) -> Result<()> {
    let line = format!("{prefix}{message}");
    if self.json {
      Term::stderr().write_line(&line)?;
    } else {
      Term::stdout().write_line(&line)?;
    }
    Ok(())
  }
}

/// Tree prefix for item `index` of a list of `len`.
fn branch(index: usize, len: usize) -> &'static str {
  if index + 1 == len {
    LAST_ITEM_PREFIX
  } else {
    ITEM_PREFIX
  }
}

impl UserInteraction for Terminal {
  fn confirm(&self, message: &str) -> Result<bool> {
    if self.accept_defaults {
      return Ok(true);
    }
    Ok(Confirm::new().with_prompt(format!("{PROMPT_PREFIX}{message}")).interact()?)
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    match content {
      ResponseContent::Success(message) =>
        self.status(style(SUCCESS_PREFIX).green().to_string(), message),
      ResponseContent::Working(message) =>
        self.status(style(WORKING_PREFIX).cyan().to_string(), message),
      ResponseContent::Info(message) =>
        self.status(style(INFO_PREFIX).blue().to_string(), message),
      ResponseContent::Manga(manga) if self.json => self.print_json(manga),
      ResponseContent::Manga(manga) => {
        println!("{}", style(&manga.title).bold());
        println!("   {} {}", style("id").dim(), manga.id);
        if !manga.status.is_empty() {
          println!("   {} {}", style("status").dim(), manga.status);
        }
        if let Some(released) = &manga.release_date {
          println!("   {} {}", style("released").dim(), released);
        }
        if !manga.genres.is_empty() {
          println!("   {} {}", style("genres").dim(), manga.genres.join(", "));
        }
        let description = manga.description.resolve();
        if !description.is_empty() {
          println!("\n{description}\n");
        }
        println!("{} chapters", style(manga.chapters.len()).cyan());
        for (index, chapter) in manga.chapters.iter().enumerate() {
          println!(
            "{} {:>6}  {}  {}",
            branch(index, manga.chapters.len()),
            chapter.chapter_number,
            style(&chapter.id).yellow(),
            chapter.title
          );
        }
        Ok(())
      },
      ResponseContent::SearchResults(results) if self.json => self.print_json(results),
      ResponseContent::SearchResults(results) => {
        if results.results.is_empty() {
          return self.status(style(INFO_PREFIX).blue().to_string(), "No manga found");
        }
        println!("Found {} manga", style(results.results.len()).cyan());
        for (index, manga) in results.results.iter().enumerate() {
          println!(
            "{} {}  {}",
            branch(index, results.results.len()),
            style(&manga.id).yellow(),
            manga.title
          );
        }
        if results.has_next_page {
          println!("{}", style("More results are available").dim());
        }
        Ok(())
      },
      ResponseContent::Pages(pages) if self.json => self.print_json(&pages),
      ResponseContent::Pages(pages) => {
        for (index, page) in pages.iter().enumerate() {
          println!("{} {:>3} {ARROW} {}", branch(index, pages.len()), page.page, page.img);
        }
        Ok(())
      },
      ResponseContent::Bookmarks(bookmarks) if self.json => self.print_json(&bookmarks),
      ResponseContent::Bookmarks(bookmarks) => {
        if bookmarks.is_empty() {
          return self.status(style(INFO_PREFIX).blue().to_string(), "No bookmarks yet");
        }
        for (index, bookmark) in bookmarks.iter().enumerate() {
          println!(
            "{} {}  {}",
            branch(index, bookmarks.len()),
            style(&bookmark.id).yellow(),
            bookmark.title
          );
        }
        Ok(())
      },
      ResponseContent::Downloads(downloads) if self.json => self.print_json(&downloads),
      ResponseContent::Downloads(downloads) => {
        if downloads.is_empty() {
          return self.status(style(INFO_PREFIX).blue().to_string(), "No downloaded chapters");
        }
        for (index, chapter) in downloads.iter().enumerate() {
          println!(
            "{} {}  {} ({} pages, manga {})",
            branch(index, downloads.len()),
            style(&chapter.chapter_id).yellow(),
            chapter.title,
            chapter.pages.len(),
            chapter.manga_id
          );
        }
        Ok(())
      },
      ResponseContent::ReadChapters { chapters, .. } if self.json => self.print_json(&chapters),
      ResponseContent::ReadChapters { manga_id, chapters } => {
        if chapters.is_empty() {
          let message = format!("No chapters of {manga_id} are marked as read");
          return self.status(style(INFO_PREFIX).blue().to_string(), &message);
        }
        println!("{} read chapters of {manga_id}", style(chapters.len()).cyan());
        for (index, chapter) in chapters.iter().enumerate() {
          println!("{} {chapter}", branch(index, chapters.len()));
        }
        Ok(())
      },
      ResponseContent::Sources { active, available } if self.json =>
        self.print_json(&serde_json::json!({ "active": active.as_str(), "available": available })),
      ResponseContent::Sources { active, available } => {
        for (index, name) in available.iter().enumerate() {
          let marker = if *name == active.as_str() { style(ARROW).green() } else { style(" ") };
          println!("{} {marker} {name}", branch(index, available.len()));
        }
        Ok(())
      },
    }
  }
}
