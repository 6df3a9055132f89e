use newsdigest::ingestion::{build_http_client, fetch_all, FeedSource, Source, DEFAULT_USER_AGENT};
use newsdigest::scraping::PageSource;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Dubai Chronicle</title>
  <id>urn:dubai-chronicle</id>
  <updated>2026-10-14T09:00:00Z</updated>
  <entry>
    <title>Off-plan sales hit record in Dubai</title>
    <id>urn:1</id>
    <link href="/property/off-plan-record"/>
    <updated>2026-10-14T09:00:00Z</updated>
    <summary type="html">&lt;p&gt;Developers launched 40 projects.&lt;/p&gt;</summary>
  </entry>
  <entry>
    <title>Metro extension opens</title>
    <id>urn:2</id>
    <link href="https://elsewhere.example.com/metro"/>
    <updated>2026-10-13T09:00:00Z</updated>
  </entry>
</feed>"#;

const LISTING: &str = r#"<html><body>
  <div class="project"><a href="/new-projects/dubai/oasis">The Oasis by Emaar</a></div>
  <div class="project"><a href="/new-projects/dubai/oasis">The Oasis by Emaar</a></div>
  <footer><a href="/about">About us</a></footer>
</body></html>"#;

fn client() -> reqwest::Client {
    build_http_client(5, DEFAULT_USER_AGENT).unwrap()
}

#[tokio::test]
async fn test_feed_source_with_mock() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/feed.xml")
        .match_header("user-agent", DEFAULT_USER_AGENT)
        .with_status(200)
        .with_header("content-type", "application/atom+xml")
        .with_body(ATOM)
        .create_async()
        .await;

    let source = FeedSource::new(
        format!("{}/feed.xml", server.url()),
        Some("Dubai Chronicle".to_string()),
        client(),
    );

    let items = source.fetch().await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Off-plan sales hit record in Dubai");
    assert_eq!(items[0].url, format!("{}/property/off-plan-record", server.url()));
    assert_eq!(items[0].summary, "Developers launched 40 projects.");
    assert!(items[0].published_at.is_some());
    assert_eq!(items[1].url, "https://elsewhere.example.com/metro");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_page_source_with_mock() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/new-projects/uae/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(LISTING)
        .create_async()
        .await;

    let source = PageSource::new(
        format!("{}/new-projects/uae/", server.url()),
        None,
        "div.project a",
        client(),
    );

    let items = source.fetch().await.unwrap();

    // duplicates are left to the dedupe stage
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "The Oasis by Emaar");
    assert_eq!(items[0].url, format!("{}/new-projects/dubai/oasis", server.url()));
    assert_eq!(source.label(), format!("{}/new-projects/uae/", server.url()));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_is_a_source_failure() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", "/gone.xml")
        .with_status(404)
        .create_async()
        .await;

    let source = FeedSource::new(format!("{}/gone.xml", server.url()), None, client());
    let err = source.fetch().await.unwrap_err();

    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_malformed_feed_is_a_source_failure() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", "/broken.xml")
        .with_status(200)
        .with_body("this is not a feed")
        .create_async()
        .await;

    let source = FeedSource::new(format!("{}/broken.xml", server.url()), None, client());
    assert!(source.fetch().await.is_err());
}

#[tokio::test]
async fn test_fetch_all_skips_failing_sources() {
    let mut server = mockito::Server::new_async().await;

    let _ok = server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body(ATOM)
        .create_async()
        .await;
    let _down = server
        .mock("GET", "/down.xml")
        .with_status(500)
        .create_async()
        .await;

    let sources: Vec<Box<dyn Source>> = vec![
        Box::new(FeedSource::new(format!("{}/down.xml", server.url()), None, client())),
        Box::new(FeedSource::new(format!("{}/feed.xml", server.url()), None, client())),
    ];

    let outcome = fetch_all(&sources).await;

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.items.len(), 2);
}
