//! Manga details and chapter pages.

use super::*;

#[derive(Args, Clone)]
pub struct InfoOptions {
  /// Manga identifier from a search result
  pub manga_id: String,
}

#[derive(Args, Clone)]
pub struct PagesOptions {
  /// Chapter identifier from `yomu info`
  pub chapter_id: String,
}

/// Function for the [`Commands::Info`] in the CLI.
pub async fn info<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  info_options: InfoOptions,
) -> Result<()> {
  let manga = yomu.manga_info(&info_options.manga_id).await?;
  interaction.reply(ResponseContent::Manga(&manga))?;

  if yomu.is_bookmarked(&manga.id).await? {
    interaction.reply(ResponseContent::Info("This manga is in your bookmarks"))?;
  }
  Ok(())
}

/// Function for the [`Commands::Pages`] in the CLI.
pub async fn pages<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  pages_options: PagesOptions,
) -> Result<()> {
  let PagesOptions { chapter_id } = pages_options;
  if yomu.is_chapter_downloaded(&chapter_id).await? {
    interaction.reply(ResponseContent::Info("Reading from downloaded files"))?;
  }
  let pages = yomu.chapter_pages(&chapter_id).await?;
  interaction.reply(ResponseContent::Pages(&pages))
}
