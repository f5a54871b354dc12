use super::*;

pub mod bookmark;
pub mod download;
pub mod info;
pub mod init;
pub mod read;
pub mod search;
pub mod source;

pub use bookmark::{bookmark, BookmarkCommands};
pub use download::{delete, download, downloads, DeleteOptions, DownloadOptions, DownloadsOptions};
pub use info::{info, pages, InfoOptions, PagesOptions};
pub use init::{init, InitOptions};
pub use read::{read, ReadCommands};
pub use search::{search, SearchOptions};
pub use source::{source, SourceCommands};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Create a configuration and an empty library
  Init(InitOptions),

  /// Search the active source
  Search(SearchOptions),

  /// Show a manga with its chapters
  Info(InfoOptions),

  /// List the page images of a chapter
  Pages(PagesOptions),

  /// Manage bookmarked manga
  Bookmark {
    /// Bookmark operation
    #[command(subcommand)]
    cmd: BookmarkCommands,
  },

  /// Manage read chapters
  Read {
    /// Read state operation
    #[command(subcommand)]
    cmd: ReadCommands,
  },

  /// Download chapters for offline reading
  Download(DownloadOptions),

  /// List downloaded chapters
  Downloads(DownloadsOptions),

  /// Delete a downloaded chapter after confirmation
  Delete(DeleteOptions),

  /// Show or change the content source
  Source {
    /// Source operation
    #[command(subcommand)]
    cmd: SourceCommands,
  },
}
