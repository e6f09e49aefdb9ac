//! Integration tests for the full fetch-then-extract pipeline.
//!
//! Each test stands up its own wiremock server playing the feed origin, so
//! the pipeline is exercised end to end: HTTP GET, document tree build,
//! entry extraction, drop diagnostics.

use chrono::{TimeZone, Utc};
use glance::feed::{
    fetch_entries, DropReason, ExtractError, FeedError, FetchError, Vocabulary,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FALLBACK: &str = "https://daringfireball.net";

async fn serve_feed(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feeds/main"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/atom+xml"),
        )
        .mount(&server)
        .await;
    server
}

async fn run(server: &MockServer) -> Result<glance::feed::Extraction, FeedError> {
    let client = reqwest::Client::new();
    fetch_entries(
        &client,
        &format!("{}/feeds/main", server.uri()),
        &Vocabulary::default(),
        FALLBACK,
    )
    .await
}

#[tokio::test]
async fn test_well_formed_feed_returns_all_entries_in_order() {
    let feed = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Daring Fireball</title>
    <entry>
        <title>First</title>
        <published>2023-05-01T10:00:00Z</published>
        <link rel="alternate" href="https://df.test/1"/>
    </entry>
    <entry>
        <title>Second</title>
        <published>2023-05-02T10:00:00Z</published>
        <link rel="alternate" href="https://df.test/2"/>
    </entry>
</feed>"#;

    let server = serve_feed(feed).await;
    let extraction = run(&server).await.unwrap();

    let titles: Vec<&str> = extraction.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second"]);
    assert!(extraction.dropped.is_empty());
}

// The canonical mixed-document scenario: one clean entry with an alternate
// link, one entry with no title, one entry where a related link outranks an
// alternate one.
#[tokio::test]
async fn test_mixed_feed_filters_and_prioritizes() {
    let feed = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <entry>
        <title>A</title>
        <published>2023-05-01T00:00:00Z</published>
        <link rel="alternate" href="https://x"/>
    </entry>
    <entry>
        <published>2023-05-01T12:00:00Z</published>
    </entry>
    <entry>
        <title>C</title>
        <published>2023-05-02T00:00:00Z</published>
        <link rel="related" href="https://y"/>
        <link rel="alternate" href="https://z"/>
    </entry>
</feed>"#;

    let server = serve_feed(feed).await;
    let extraction = run(&server).await.unwrap();

    assert_eq!(extraction.entries.len(), 2);

    assert_eq!(extraction.entries[0].title, "A");
    assert_eq!(
        extraction.entries[0].date,
        Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(extraction.entries[0].link, "https://x");

    assert_eq!(extraction.entries[1].title, "C");
    assert_eq!(
        extraction.entries[1].date,
        Utc.with_ymd_and_hms(2023, 5, 2, 0, 0, 0).unwrap()
    );
    assert_eq!(extraction.entries[1].link, "https://y");

    assert_eq!(extraction.dropped.len(), 1);
    assert_eq!(extraction.dropped[0].position, 1);
    assert_eq!(extraction.dropped[0].reason, DropReason::MissingTitle);
}

#[tokio::test]
async fn test_entry_without_links_gets_fallback() {
    let feed = r#"<feed>
    <entry>
        <title>Linkless</title>
        <published>2023-05-01T00:00:00Z</published>
        <link rel="self" href="https://df.test/self"/>
    </entry>
</feed>"#;

    let server = serve_feed(feed).await;
    let extraction = run(&server).await.unwrap();

    assert_eq!(extraction.entries[0].link, FALLBACK);
}

#[tokio::test]
async fn test_bad_timestamp_drops_only_that_entry() {
    let feed = r#"<feed>
    <entry><title>Bad</title><published>not-a-date</published></entry>
    <entry><title>Good</title><published>2023-05-02T00:00:00+02:00</published></entry>
</feed>"#;

    let server = serve_feed(feed).await;
    let extraction = run(&server).await.unwrap();

    assert_eq!(extraction.entries.len(), 1);
    assert_eq!(extraction.entries[0].title, "Good");
    // Offset-aware input normalized to UTC
    assert_eq!(
        extraction.entries[0].date,
        Utc.with_ymd_and_hms(2023, 5, 1, 22, 0, 0).unwrap()
    );
    assert_eq!(extraction.dropped[0].reason, DropReason::InvalidTimestamp);
}

#[tokio::test]
async fn test_missing_root_is_a_failure_not_empty_success() {
    let server = serve_feed(r#"<rss version="2.0"><channel></channel></rss>"#).await;
    let err = run(&server).await.unwrap_err();
    assert!(matches!(err, FeedError::Extract(ExtractError::MissingRoot(_))));
}

#[tokio::test]
async fn test_http_failure_is_distinguishable_from_empty_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let err = fetch_entries(
        &client,
        &format!("{}/feeds/main", server.uri()),
        &Vocabulary::default(),
        FALLBACK,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FeedError::Fetch(FetchError::HttpStatus(500))));
}

#[tokio::test]
async fn test_custom_vocabulary_reads_renamed_fixture() {
    let feed = r#"<channel>
    <item>
        <headline>Renamed</headline>
        <stamp>2023-05-01T00:00:00Z</stamp>
        <anchor kind="related" target="https://r.test"/>
    </item>
</channel>"#;

    let vocab = Vocabulary {
        root: "channel".to_string(),
        entry: "item".to_string(),
        title: "headline".to_string(),
        published: "stamp".to_string(),
        link: "anchor".to_string(),
        relation_attr: "kind".to_string(),
        destination_attr: "target".to_string(),
    };

    let server = serve_feed(feed).await;
    let client = reqwest::Client::new();
    let extraction = fetch_entries(
        &client,
        &format!("{}/feeds/main", server.uri()),
        &vocab,
        FALLBACK,
    )
    .await
    .unwrap();

    assert_eq!(extraction.entries[0].title, "Renamed");
    assert_eq!(extraction.entries[0].link, "https://r.test");
}
