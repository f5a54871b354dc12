use super::*;

#[tokio::test]
async fn test_bookmark_lifecycle() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;

  assert!(yomu.add_bookmark(&manga).await?);
  assert!(!yomu.add_bookmark(&manga).await?);
  assert!(yomu.is_bookmarked("md1").await?);

  let bookmarks = yomu.bookmarks().await?;
  assert_eq!(bookmarks.len(), 1);
  assert_eq!(bookmarks[0].title, "One Piece");
  assert_eq!(bookmarks[0].description, "About One Piece");

  assert!(yomu.remove_bookmark("md1").await?);
  assert!(!yomu.remove_bookmark("md1").await?);
  assert!(yomu.bookmarks().await?.is_empty());
  Ok(())
}

#[tokio::test]
async fn test_search_results_are_not_filtered_by_bookmarks() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;
  let manga = yomu.manga_info("md1").await?;
  yomu.add_bookmark(&manga).await?;

  let results = yomu.search_manga("piece").await?;
  assert_eq!(results.results.len(), 1);
  assert!(yomu.is_bookmarked(&results.results[0].id).await?);
  Ok(())
}

#[tokio::test]
async fn test_read_state_round_trip() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;

  assert!(yomu.add_read_chapter("md1", "md1-c1").await?);
  assert!(yomu.add_read_chapter("md1", "md1-c2").await?);
  assert!(!yomu.add_read_chapter("md1", "md1-c1").await?);
  assert_eq!(yomu.read_chapters("md1").await?, vec!["md1-c1", "md1-c2"]);

  assert!(yomu.remove_read_chapter("md1", "md1-c1").await?);
  assert!(!yomu.is_read("md1", "md1-c1").await?);
  assert!(yomu.is_read("md1", "md1-c2").await?);
  assert!(yomu.read_chapters("mh1").await?.is_empty());
  Ok(())
}

#[tokio::test]
async fn test_chapter_marked_read_on_third_page() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;

  assert!(!yomu.record_page_view("md1", "md1-c1", 1, 20).await?);
  assert!(!yomu.record_page_view("md1", "md1-c1", 2, 20).await?);
  assert!(!yomu.is_read("md1", "md1-c1").await?);

  assert!(yomu.record_page_view("md1", "md1-c1", 3, 20).await?);
  assert!(!yomu.record_page_view("md1", "md1-c1", 4, 20).await?);
  assert!(yomu.is_read("md1", "md1-c1").await?);
  Ok(())
}

#[tokio::test]
async fn test_short_chapters_marked_read_on_first_view() -> TestResult<()> {
  let (yomu, ..) = create_test_yomu(true).await;

  assert!(yomu.record_page_view("md1", "one-pager", 1, 1).await?);
  assert!(yomu.record_page_view("md1", "two-pager", 1, 2).await?);
  assert!(!yomu.record_page_view("md1", "empty", 1, 0).await?);
  assert_eq!(yomu.read_chapters("md1").await?, vec!["one-pager", "two-pager"]);
  Ok(())
}

#[tokio::test]
async fn test_library_persists_in_database() -> TestResult<()> {
  let dir = tempdir()?;
  let manga = sample_manga("md1", "One Piece");

  let first = Yomu::from_config(test_config(&dir, false)).await?;
  first.add_bookmark(&manga).await?;
  first.add_read_chapter("md1", "md1-c2").await?;

  let second = Yomu::from_config(test_config(&dir, false)).await?;
  assert!(second.is_bookmarked("md1").await?);
  assert!(second.is_read("md1", "md1-c2").await?);
  Ok(())
}
