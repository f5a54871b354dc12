//! Read state management.

use super::*;

#[derive(Subcommand, Clone)]
pub enum ReadCommands {
  /// Mark a chapter as read
  Mark {
    /// Manga identifier
    manga_id:   String,
    /// Chapter identifier
    chapter_id: String,
  },
  /// Mark a chapter as unread
  Unmark {
    /// Manga identifier
    manga_id:   String,
    /// Chapter identifier
    chapter_id: String,
  },
  /// List the read chapters of a manga
  Status {
    /// Manga identifier
    manga_id: String,
  },
}

/// Function for the [`Commands::Read`] in the CLI.
pub async fn read<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  cmd: ReadCommands,
) -> Result<()> {
  match cmd {
    ReadCommands::Mark { manga_id, chapter_id } => {
      if yomu.add_read_chapter(&manga_id, &chapter_id).await? {
        interaction.reply(ResponseContent::Success(&format!("Marked {chapter_id} as read")))
      } else {
        interaction.reply(ResponseContent::Info(&format!("{chapter_id} was already read")))
      }
    },
    ReadCommands::Unmark { manga_id, chapter_id } => {
      if yomu.remove_read_chapter(&manga_id, &chapter_id).await? {
        interaction.reply(ResponseContent::Success(&format!("Marked {chapter_id} as unread")))
      } else {
        interaction.reply(ResponseContent::Info(&format!("{chapter_id} was not read")))
      }
    },
    ReadCommands::Status { manga_id } => {
      let chapters = yomu.read_chapters(&manga_id).await?;
      interaction.reply(ResponseContent::ReadChapters { manga_id: &manga_id, chapters: &chapters })
    },
  }
}
