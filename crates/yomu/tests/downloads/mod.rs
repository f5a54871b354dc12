use yomu::{
  download::{DownloadStatus, HttpPageFetcher},
  manga::ImageHeaders,
};

use super::*;

#[tokio::test]
#[traced_test]
async fn test_download_serves_pages_offline() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;

  let downloaded = yomu.download_chapter(&manga, "md1-c2").await?;
  assert_eq!(downloaded.title, "The Pirate Hunter");
  assert_eq!(downloaded.pages.len(), 3);
  assert_eq!(yomu.chapter_status("md1-c2").await?, DownloadStatus::Completed);

  let pages = yomu.chapter_pages("md1-c2").await?;
  assert_eq!(pages.iter().map(|p| p.page).collect::<Vec<_>>(), vec![1, 2, 3]);
  for page in &pages {
    assert!(!page.img.starts_with("https://"));
    let body = std::fs::read_to_string(&page.img)?;
    assert_eq!(body, format!("page {}", page.page));
  }

  // Chapters that were not downloaded still come from the catalog.
  let remote = yomu.chapter_pages("md1-c1").await?;
  assert!(remote[0].img.starts_with("https://img.example.org/"));
  Ok(())
}

#[tokio::test]
async fn test_download_lists_pages_from_active_source() -> TestResult<()> {
  let (yomu, mangadex, mangahere, _dir) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;

  yomu.set_active_source("mangahere").await?;
  yomu.download_chapter(&manga, "md1-c1").await?;
  assert_eq!(mangadex.page_lists.load(Ordering::SeqCst), 0);
  assert_eq!(mangahere.page_lists.load(Ordering::SeqCst), 1);

  yomu.set_active_source("mangadex").await?;
  yomu.download_chapter(&manga, "md1-c2").await?;
  assert_eq!(mangadex.page_lists.load(Ordering::SeqCst), 1);
  Ok(())
}

#[tokio::test]
async fn test_repeated_download_reuses_record() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;

  let first = yomu.download_chapter(&manga, "md1-c1").await?;
  let second = yomu.download_chapter(&manga, "md1-c1").await?;
  assert_eq!(first, second);
  assert_eq!(yomu.downloaded_chapters().await?.len(), 1);
  Ok(())
}

#[tokio::test]
async fn test_progress_events_reach_subscribers() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;
  let mut events = yomu.subscribe_downloads();

  yomu.download_chapter(&manga, "md1-c3").await?;

  let mut statuses = Vec::new();
  while let Ok(event) = events.try_recv() {
    assert_eq!(event.chapter_id, "md1-c3");
    statuses.push(event.progress.status);
  }
  assert_eq!(statuses.first(), Some(&DownloadStatus::Pending));
  assert_eq!(statuses.last(), Some(&DownloadStatus::Completed));
  assert_eq!(yomu.download_progress("md1-c3").progress, 100.0);
  Ok(())
}

#[tokio::test]
async fn test_delete_removes_files_and_record() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;
  let downloaded = yomu.download_chapter(&manga, "md1-c1").await?;

  let deleted = yomu.delete_download("md1-c1").await?;
  assert_eq!(deleted.chapter_id, "md1-c1");
  assert!(downloaded.pages.iter().all(|path| !path.exists()));
  assert!(!yomu.is_chapter_downloaded("md1-c1").await?);
  assert_eq!(yomu.chapter_status("md1-c1").await?, DownloadStatus::NotDownloaded);

  let err = yomu.delete_download("md1-c1").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  Ok(())
}

#[tokio::test]
async fn test_search_downloads_matches_titles() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;
  for chapter in ["md1-c1", "md1-c2", "md1-c3"] {
    yomu.download_chapter(&manga, chapter).await?;
  }

  let hits = yomu.search_downloads("ZORO").await?;
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].chapter_id, "md1-c3");
  assert_eq!(yomu.search_downloads("").await?.len(), 3);
  assert!(yomu.search_downloads("luffy").await?.is_empty());
  Ok(())
}

#[tokio::test]
async fn test_unknown_chapter_is_not_found() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;

  let err = yomu.download_chapter(&manga, "mh1-c1").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert!(yomu.downloaded_chapters().await?.is_empty());
  Ok(())
}

#[tokio::test]
async fn test_downloads_disabled_without_directory() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(false).await;
  let manga = yomu.manga_info("md1").await?;

  assert!(!yomu.supports_downloads());
  let err = yomu.download_chapter(&manga, "md1-c1").await.unwrap_err();
  assert!(matches!(err, YomuError::DownloadsUnsupported));
  assert_eq!(err.kind(), ErrorKind::Unsupported);
  assert_eq!(yomu.chapter_status("md1-c1").await?, DownloadStatus::NotDownloaded);
  Ok(())
}

fn remote_page(base_url: &str) -> ChapterPage {
  ChapterPage {
    img:              format!("{base_url}/store/manga/1/001.jpg"),
    page:             1,
    header_for_image: Some(ImageHeaders { referer: "https://www.mangahere.cc/".into() }),
  }
}

#[tokio::test]
async fn test_page_fetch_sends_referer() -> TestResult<()> {
  let (base_url, request) = serve_once("200 OK", b"\xff\xd8jpeg".to_vec()).await;

  let bytes = HttpPageFetcher::default().fetch(&remote_page(&base_url)).await?;
  assert_eq!(bytes, b"\xff\xd8jpeg");

  let request = request.await?.to_lowercase();
  assert!(request.contains("referer: https://www.mangahere.cc/"));
  Ok(())
}

#[tokio::test]
async fn test_page_error_status_becomes_upstream_error() -> TestResult<()> {
  let (base_url, _request) = serve_once("404 Not Found", Vec::new()).await;

  let err = HttpPageFetcher::default().fetch(&remote_page(&base_url)).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Upstream);
  assert!(matches!(err, YomuError::Upstream { status: 404, .. }));
  assert!(err.to_string().contains("page 1"));
  Ok(())
}
