//! Offline downloads.

use yomu::download::DownloadStatus;

use super::*;

#[derive(Args, Clone)]
pub struct DownloadOptions {
  /// Manga the chapters belong to
  pub manga_id: String,

  /// Chapters to download
  #[arg(required_unless_present = "all")]
  pub chapters: Vec<String>,

  /// Download every chapter of the manga
  #[arg(long, conflicts_with = "chapters")]
  pub all: bool,
}

#[derive(Args, Clone)]
pub struct DownloadsOptions {
  /// Only show chapters whose title contains this text
  #[arg(long, short)]
  pub filter: Option<String>,
}

#[derive(Args, Clone)]
pub struct DeleteOptions {
  /// Downloaded chapter to delete
  pub chapter_id: String,
}

/// Function for the [`Commands::Download`] in the CLI.
pub async fn download<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  download_options: DownloadOptions,
) -> Result<()> {
  let DownloadOptions { manga_id, chapters, all } = download_options;
  if !yomu.supports_downloads() {
    return Err(YomuError::DownloadsUnsupported.into());
  }

  let manga = yomu.manga_info(&manga_id).await?;
  let chapters = if all { manga.chapters.iter().map(|c| c.id.clone()).collect() } else { chapters };

  let mut events = yomu.subscribe_downloads();
  let reporter = tokio::spawn(async move {
    while let Ok(event) = events.recv().await {
      if event.progress.status == DownloadStatus::Downloading {
        trace!(chapter_id = %event.chapter_id, "{:.0}%", event.progress.progress);
      }
    }
  });

  let mut failed = 0;
  for chapter_id in &chapters {
    interaction.reply(ResponseContent::Working(&format!("Downloading {chapter_id}")))?;
    match yomu.download_chapter(&manga, chapter_id).await {
      Ok(downloaded) => interaction.reply(ResponseContent::Success(&format!(
        "Downloaded {} ({} pages)",
        downloaded.title,
        downloaded.pages.len()
      )))?,
      Err(e) => {
        failed += 1;
        interaction.reply(ResponseContent::Info(&format!("Failed to download {chapter_id}: {e}")))?;
      },
    }
  }
  reporter.abort();

  if failed > 0 {
    return Err(YomudError::Command(format!("{failed} of {} chapters failed", chapters.len())));
  }
  Ok(())
}

/// Function for the [`Commands::Downloads`] in the CLI.
pub async fn downloads<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  downloads_options: DownloadsOptions,
) -> Result<()> {
  let chapters = match downloads_options.filter {
    Some(term) => yomu.search_downloads(&term).await?,
    None => yomu.downloaded_chapters().await?,
  };
  interaction.reply(ResponseContent::Downloads(&chapters))
}

/// Function for the [`Commands::Delete`] in the CLI.
pub async fn delete<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  delete_options: DeleteOptions,
) -> Result<()> {
  let DeleteOptions { chapter_id } = delete_options;
  if !interaction.confirm(&format!("Delete the downloaded files of {chapter_id}?"))? {
    interaction.reply(ResponseContent::Info("Nothing deleted"))?;
    return Ok(());
  }
  let deleted = yomu.delete_download(&chapter_id).await?;
  interaction.reply(ResponseContent::Success(&format!(
    "Deleted {} ({} pages)",
    deleted.title,
    deleted.pages.len()
  )))
}
