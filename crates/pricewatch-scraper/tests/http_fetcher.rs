//! Integration tests for `HttpFetcher`.
//!
//! Each test stands up a local `wiremock` server, so no real network traffic
//! is made.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch_scraper::{HttpFetcher, PageFetcher, ScraperError};

fn test_fetcher() -> HttpFetcher {
    HttpFetcher::new(5, "pricewatch-test/0.1", 0, 0).expect("failed to build test HttpFetcher")
}

#[tokio::test]
async fn returns_html_for_ordinary_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .and(header("accept-language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Фанера</h1>"))
        .mount(&server)
        .await;

    let url = format!("{}/p/1", server.uri());
    let page = test_fetcher().fetch(&url).await.expect("fetch should succeed");
    assert_eq!(page.url, url);
    assert_eq!(page.html, "<h1>Фанера</h1>");
}

#[tokio::test]
async fn challenge_page_is_reported_as_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><title>Just a moment...</title><script src='/cdn-cgi/challenge-platform/x'></script></html>",
        ))
        .mount(&server)
        .await;

    let err = test_fetcher()
        .fetch(&format!("{}/p/1", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::Blocked { .. }), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn forbidden_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = test_fetcher()
        .fetch(&format!("{}/p/1", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::Blocked { ref reason, .. } if reason == "HTTP 403"));
}

#[tokio::test]
async fn too_many_requests_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = test_fetcher()
        .fetch(&format!("{}/p/1", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScraperError::RateLimited {
            retry_after_secs: 7,
            ..
        }
    ));
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(5, "pricewatch-test/0.1", 3, 0).unwrap();
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::NotFound { .. }));
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(5, "pricewatch-test/0.1", 3, 0).unwrap();
    let page = fetcher.fetch(&format!("{}/p", server.uri())).await.unwrap();
    assert_eq!(page.html, "<p>ok</p>");
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_request() {
    let err = test_fetcher().fetch("ftp://example.com/file").await.unwrap_err();
    assert!(matches!(err, ScraperError::InvalidUrl { .. }));

    let err = test_fetcher().fetch("not a url").await.unwrap_err();
    assert!(matches!(err, ScraperError::InvalidUrl { .. }));
}
