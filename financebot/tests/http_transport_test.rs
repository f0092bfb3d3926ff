use common::{FetchSettings, PushSettings, BROWSER_USER_AGENT};
use financebot::ingestion::{HttpFeedTransport, RetryPolicy, RetryingFetcher};
use financebot::push::{Dispatcher, HttpPushTransport};
use financebot::scraping::{ArticleExtractor, ArticleSource, ReadabilityExtractor};
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Markets</title>
    <link>https://example.com</link>
    <description>test</description>
    <item><title>One</title><link>https://example.com/1</link></item>
    <item><title>Two</title><link>https://example.com/2</link></item>
  </channel>
</rss>"#;

const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Quiet</title><link>https://example.com</link><description>none</description></channel></rss>"#;

fn fetch_settings() -> FetchSettings {
    FetchSettings {
        retries: 3,
        retry_delay_seconds: 0,
        timeout_seconds: 5,
        user_agent: BROWSER_USER_AGENT.to_string(),
    }
}

fn fetcher() -> RetryingFetcher {
    let transport = HttpFeedTransport::new(&fetch_settings()).expect("transport");
    RetryingFetcher::new(Arc::new(transport), RetryPolicy::immediate(3))
}

#[tokio::test]
async fn feed_is_fetched_with_browser_user_agent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rss.xml")
        .match_header("user-agent", Matcher::Regex("Chrome/".to_string()))
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(FEED)
        .expect(1)
        .create_async()
        .await;

    let entries = fetcher().fetch(&format!("{}/rss.xml", server.url())).await.expect("entries");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].resolve_link(), Some("https://example.com/2"));
    mock.assert_async().await;
}

#[tokio::test]
async fn empty_feed_is_retried_then_given_up() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/quiet.xml")
        .with_status(200)
        .with_body(EMPTY_FEED)
        .expect(3)
        .create_async()
        .await;

    let result = fetcher().fetch(&format!("{}/quiet.xml", server.url())).await;

    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("after 3 attempts"));
    mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/down.xml")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    assert!(fetcher().fetch(&format!("{}/down.xml", server.url())).await.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn retry_delay_is_applied_between_attempts_only() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/down.xml")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    let transport = HttpFeedTransport::new(&fetch_settings()).expect("transport");
    let fetcher = RetryingFetcher::new(Arc::new(transport), RetryPolicy::new(2, Duration::from_millis(200)));

    let started = std::time::Instant::now();
    assert!(fetcher.fetch(&format!("{}/down.xml", server.url())).await.is_err());
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(400) + Duration::from_secs(1));
}

const ARTICLE: &str = r#"<html><head><title>Oil</title></head><body>
<div class="menu"><a href="/">Home</a> <a href="/subscribe">Subscribe now</a></div>
<article>
  <p>Oil prices rose for a third straight session on Tuesday, as traders weighed supply cuts, a weaker dollar and signs of firmer demand in Asia.</p>
  <p>Brent crude futures settled higher, while analysts cautioned that inventories, which rose last week, could cap further gains, at least in the near term.</p>
</article>
<div id="footer">All rights reserved</div>
</body></html>"#;

#[tokio::test]
async fn article_text_is_extracted_from_the_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/news/oil.html")
        .match_header("user-agent", Matcher::Regex("Mozilla/".to_string()))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(ARTICLE)
        .create_async()
        .await;

    let source = ReadabilityExtractor::new(&fetch_settings()).expect("extractor");
    let text = source
        .extract_text(&format!("{}/news/oil.html", server.url()))
        .await
        .expect("text");

    assert!(text.contains("Oil prices rose for a third straight session"), "got: {}", text);
    assert!(!text.contains("All rights reserved"), "got: {}", text);
    mock.assert_async().await;
}

#[tokio::test]
async fn article_page_errors_are_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/paywalled.html")
        .with_status(403)
        .with_body("<html><body>Forbidden</body></html>")
        .create_async()
        .await;

    let url = format!("{}/paywalled.html", server.url());
    let source = Arc::new(ReadabilityExtractor::new(&fetch_settings()).expect("extractor"));

    let err = source.extract_text(&url).await.unwrap_err();
    assert!(err.to_string().contains("403"), "got: {:#}", err);

    // The digest-facing extractor swallows it
    assert_eq!(ArticleExtractor::new(source, 1500).extract(&url).await, "");
}

#[tokio::test]
async fn delivery_continues_after_a_failing_key() {
    let mut server = mockito::Server::new_async().await;

    let failing = server
        .mock("POST", "/K1.send")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("title".into(), "📌 2024-03-02 财经早报".into()),
            Matcher::UrlEncoded("desp".into(), "body".into()),
        ]))
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;
    let succeeding = server
        .mock("POST", "/K2.send")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .with_status(200)
        .with_body(r#"{"code":0,"message":""}"#)
        .expect(1)
        .create_async()
        .await;

    let settings = PushSettings {
        keys: vec!["K1".to_string(), "K2".to_string()],
        url_template: format!("{}/{{key}}.send", server.url()),
    };
    let transport = HttpPushTransport::new(Dispatcher::TIMEOUT).expect("transport");
    let dispatcher = Dispatcher::new(settings, Arc::new(transport));

    let summary = dispatcher.deliver("📌 2024-03-02 财经早报", "body").await;

    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.failed, 1);
    failing.assert_async().await;
    succeeding.assert_async().await;
}

#[tokio::test]
async fn unreachable_push_endpoint_is_not_fatal() {
    let settings = PushSettings {
        keys: vec!["K1".to_string()],
        // Port 9 (discard) on localhost is not expected to accept HTTP
        url_template: "http://127.0.0.1:9/{key}.send".to_string(),
    };
    let transport = HttpPushTransport::new(Duration::from_secs(2)).expect("transport");
    let summary = Dispatcher::new(settings, Arc::new(transport)).deliver("t", "c").await;

    assert_eq!(summary.delivered, 0);
    assert_eq!(summary.failed, 1);
}
