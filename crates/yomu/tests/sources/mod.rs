use std::time::Duration;

use yomu::{source::HttpSource, store::SqliteStore};

use super::*;

#[tokio::test]
async fn test_mangadex_is_selected_by_default() {
  let (yomu, mangadex, mangahere, _dir) = create_test_yomu(true).await;
  assert_eq!(yomu.active_source().await.unwrap(), SourceKind::MangaDex);

  let results = yomu.search_manga("one").await.unwrap();
  assert_eq!(results.results.len(), 1);
  assert_eq!(results.results[0].id, "md1");
  assert_eq!(mangadex.searches.load(Ordering::SeqCst), 1);
  assert_eq!(mangahere.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_switching_source_routes_requests() {
  let (yomu, mangadex, mangahere, _dir) = create_test_yomu(true).await;

  assert_eq!(yomu.set_active_source("mangahere").await.unwrap(), SourceKind::MangaHere);
  let results = yomu.search_manga("berserk").await.unwrap();

  assert_eq!(results.results[0].id, "mh1");
  assert_eq!(yomu.manga_info("mh1").await.unwrap().title, "Berserk");
  assert_eq!(mangadex.searches.load(Ordering::SeqCst), 0);
  assert_eq!(mangahere.searches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[traced_test]
async fn test_unknown_source_keeps_selection() {
  let (yomu, ..) = create_test_yomu(true).await;
  yomu.set_active_source("mangahere").await.unwrap();

  let err = yomu.set_active_source("mangakakalot").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Source);
  assert_eq!(yomu.active_source().await.unwrap(), SourceKind::MangaHere);
}

#[tokio::test]
async fn test_lists_every_source() {
  let (yomu, ..) = create_test_yomu(true).await;
  assert_eq!(yomu.sources(), vec!["mangadex", "mangahere"]);
}

#[tokio::test]
async fn test_selection_persists_across_instances() -> TestResult<()> {
  let dir = tempdir()?;
  let config = test_config(&dir, false);

  let first = Yomu::from_config(config.clone()).await?;
  first.set_active_source("mangahere").await?;

  let store = SqliteStore::open(&config.database_path).await?;
  let second = Yomu::builder().with_config(config).with_store(Arc::new(store)).build().await?;
  assert_eq!(second.active_source().await?, SourceKind::MangaHere);
  Ok(())
}

#[tokio::test]
async fn test_debounced_search_runs_latest_query_only() {
  let (yomu, mangadex, ..) = create_test_yomu(true).await;

  let early = yomu.search_debounced("o");
  let late = async {
    tokio::time::sleep(Duration::from_millis(10)).await;
    yomu.search_debounced("one piece").await
  };
  let (early, late) = tokio::join!(early, late);

  assert!(early.unwrap().is_none());
  let late = late.unwrap().expect("latest search should run");
  assert_eq!(late.results[0].title, "One Piece");
  assert_eq!(mangadex.searches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[traced_test]
async fn test_search_errors_are_reported() {
  let (yomu, ..) = create_test_yomu(true).await;
  let err = yomu.manga_info("missing").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[traced_test]
async fn test_offline_manga_info_uses_downloaded_snapshot() -> TestResult<()> {
  let dir = tempdir()?;
  // Nothing listens on port 1, so every catalog request fails to connect.
  let config = test_config(&dir, true).with_api_base_url("http://127.0.0.1:1");
  let yomu = Yomu::builder()
    .with_config(config)
    .with_store(Arc::new(MemoryStore::new()))
    .with_fetcher(Arc::new(FakeFetcher::default()))
    .build()
    .await?;

  let missing = yomu.manga_info("md1").await.unwrap_err();
  assert_eq!(missing.kind(), ErrorKind::Network);

  let manga = sample_manga("md1", "One Piece");
  let pages = FakeSource::new("mangadex", manga.clone()).chapter_pages("md1-c1").await?;
  yomu.downloads().download_chapter(&manga, &manga.chapters[0], &pages).await?;

  let offline = yomu.manga_info("md1").await?;
  assert_eq!(offline, manga);
  Ok(())
}

#[tokio::test]
async fn test_error_status_becomes_upstream_error() -> TestResult<()> {
  let (base_url, request) = serve_once("503 Service Unavailable", vec![b'x'; 500]).await;
  let source = HttpSource::new(SourceKind::MangaDex.default_config()?, base_url)?;

  let err = source.search_manga("one piece").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Upstream);
  match err {
    YomuError::Upstream { status, message } => {
      assert_eq!(status, 503);
      assert_eq!(message.chars().count(), 200);
    },
    other => panic!("expected an upstream error, got {other:?}"),
  }
  assert!(request.await?.starts_with("GET /manga/mangadex/one%20piece "));
  Ok(())
}

#[tokio::test]
async fn test_missing_manga_is_upstream_not_found_status() -> TestResult<()> {
  let (base_url, _request) = serve_once("404 Not Found", b"no such manga".to_vec()).await;
  let source = HttpSource::new(SourceKind::MangaHere.default_config()?, base_url)?;

  let err = source.manga_info("one_piece").await.unwrap_err();
  assert!(matches!(
    err,
    YomuError::Upstream { status: 404, ref message } if message == "no such manga"
  ));
  Ok(())
}
