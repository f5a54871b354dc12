//! Bookmark management.

use super::*;

#[derive(Subcommand, Clone)]
pub enum BookmarkCommands {
  /// Bookmark a manga of the active source
  Add {
    /// Manga identifier
    manga_id: String,
  },
  /// Remove a bookmark
  Remove {
    /// Manga identifier
    manga_id: String,
  },
  /// List bookmarks, oldest first
  List,
}

/// Function for the [`Commands::Bookmark`] in the CLI.
pub async fn bookmark<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  cmd: BookmarkCommands,
) -> Result<()> {
  match cmd {
    BookmarkCommands::Add { manga_id } => {
      let manga = yomu.manga_info(&manga_id).await?;
      if yomu.add_bookmark(&manga).await? {
        interaction.reply(ResponseContent::Success(&format!("Bookmarked {}", manga.title)))
      } else {
        interaction.reply(ResponseContent::Info(&format!("{} is already bookmarked", manga.title)))
      }
    },
    BookmarkCommands::Remove { manga_id } => {
      if yomu.remove_bookmark(&manga_id).await? {
        interaction.reply(ResponseContent::Success(&format!("Removed bookmark {manga_id}")))
      } else {
        interaction.reply(ResponseContent::Info(&format!("{manga_id} is not bookmarked")))
      }
    },
    BookmarkCommands::List => {
      let bookmarks = yomu.bookmarks().await?;
      interaction.reply(ResponseContent::Bookmarks(&bookmarks))
    },
  }
}
