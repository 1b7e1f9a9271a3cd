//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use sitewalk::config::Config;
use sitewalk::{CrawlResult, Crawler, WalkError};
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration: no request delay, no retries
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.max_concurrency = 2;
    config.crawler.request_delay_ms = 0;
    config.crawler.timeout_ms = 2000;
    config.crawler.max_retries = 0;
    config.crawler.retry_base_delay_ms = 10;
    config.crawler.max_pages = 50;
    config.crawler.max_depth = 3;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.crawler_version = "1.0".to_string();
    config.user_agent.contact_url = None;
    config
}

/// An HTML page with a title, an h1 and one anchor per link
fn html_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a> "#, link, link))
        .collect();
    let body = format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1><p>{}</p></body></html>",
        title, title, anchors
    );
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page_path: &str, title: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_page(title, links))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn crawl(config: Config, seed: &str) -> CrawlResult {
    Crawler::new(config)
        .expect("Failed to create crawler")
        .run(seed)
        .await
        .expect("Crawl failed")
}

fn page_paths(result: &CrawlResult) -> Vec<String> {
    let mut paths: Vec<String> = result
        .pages
        .iter()
        .map(|page| {
            url::Url::parse(&page.url)
                .expect("Recorded URL should parse")
                .path()
                .to_string()
        })
        .collect();
    paths.sort();
    paths
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(&server, "/", "Home", &["/a", "/b"]).await;
    mount_page(&server, "/a", "Page A", &["/c", "/"]).await;
    mount_page(&server, "/b", "Page B", &["/a"]).await;
    mount_page(&server, "/c", "Page C", &[]).await;

    let result = crawl(create_test_config(), &format!("{}/", server.uri())).await;

    assert_eq!(page_paths(&result), vec!["/", "/a", "/b", "/c"]);
    assert!(result.errors.is_empty());
    assert_eq!(result.stats.processed, 4);
    assert_eq!(result.stats.failed, 0);
    assert_eq!(result.stats.crawled, 4);
    assert_eq!(result.stats.active_requests, 0);

    let home = result
        .pages
        .iter()
        .find(|page| page.title == "Home")
        .expect("Home page should be recorded");
    assert_eq!(home.depth, 0);
    assert!(home.referrer.is_none());
    assert_eq!(home.link_count, 2);
    assert_eq!(home.headings.get("h1"), Some(&vec!["Home".to_string()]));

    let c = result
        .pages
        .iter()
        .find(|page| page.title == "Page C")
        .expect("Page C should be recorded");
    assert_eq!(c.depth, 2);
    assert_eq!(c.referrer.as_deref(), Some(format!("{}/a", server.uri()).as_str()));
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /admin\nAllow: /public").await;
    mount_page(&server, "/", "Home", &["/admin/x", "/public/x", "/other"]).await;
    mount_page(&server, "/public/x", "Public", &[]).await;
    mount_page(&server, "/other", "Other", &[]).await;

    Mock::given(method("GET"))
        .and(path("/admin/x"))
        .respond_with(html_page("Admin", &[]))
        .expect(0) // Should never be called
        .mount(&server)
        .await;

    let result = crawl(create_test_config(), &server.uri()).await;

    assert_eq!(page_paths(&result), vec!["/", "/other", "/public/x"]);
    assert_eq!(result.stats.skipped, 1);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_robots_txt_ignored_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", "Home", &["/a"]).await;
    mount_page(&server, "/a", "A", &[]).await;

    let mut config = create_test_config();
    config.crawler.respect_robots = false;
    let result = crawl(config, &server.uri()).await;

    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.stats.skipped, 0);
}

#[tokio::test]
async fn test_robots_txt_specific_agent_block() {
    let server = MockServer::start().await;
    mount_robots(
        &server,
        "User-agent: OtherBot\nDisallow: /\n\nUser-agent: TestBot\nDisallow: /private",
    )
    .await;
    mount_page(&server, "/", "Home", &["/private/page", "/open"]).await;
    mount_page(&server, "/open", "Open", &[]).await;

    let result = crawl(create_test_config(), &server.uri()).await;

    assert_eq!(page_paths(&result), vec!["/", "/open"]);
    assert_eq!(result.stats.skipped, 1);
}

#[tokio::test]
async fn test_missing_robots_txt_allows_all() {
    let server = MockServer::start().await;
    // No robots.txt mock: the server answers 404
    mount_page(&server, "/", "Home", &["/a"]).await;
    mount_page(&server, "/a", "A", &[]).await;

    let result = crawl(create_test_config(), &server.uri()).await;

    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.stats.skipped, 0);
}

#[tokio::test]
async fn test_user_agent_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestBot/1.0 (+https://example.com/bot)"))
        .respond_with(html_page("Home", &[]))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.user_agent.contact_url = Some("https://example.com/bot".to_string());
    let result = crawl(config, &server.uri()).await;

    assert_eq!(result.pages.len(), 1);
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/level1"]).await;
    mount_page(&server, "/level1", "Level 1", &["/level2"]).await;

    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(html_page("Level 2", &[]))
        .expect(0) // Beyond max_depth = 1
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.max_depth = 1;
    let result = crawl(config, &server.uri()).await;

    assert_eq!(page_paths(&result), vec!["/", "/level1"]);
    assert!(result.pages.iter().all(|page| page.depth <= 1));
}

#[tokio::test]
async fn test_depth_zero_crawls_only_seed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a"]).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("A", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.max_depth = 0;
    let result = crawl(config, &server.uri()).await;

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.stats.queued, 0);
}

#[tokio::test]
async fn test_page_cap() {
    let server = MockServer::start().await;
    let links: Vec<String> = (0..10).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&server, "/", "Home", &link_refs).await;
    for link in &links {
        mount_page(&server, link, link, &[]).await;
    }

    let mut config = create_test_config();
    config.crawler.max_concurrency = 4;
    config.crawler.max_pages = 3;
    let result = crawl(config, &server.uri()).await;

    assert_eq!(result.pages.len(), 3);
    assert_eq!(result.stats.processed, 3);
}

#[tokio::test]
async fn test_cross_domain_links_not_followed() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri())
        .expect("Failed to parse base URL")
        .port()
        .expect("Mock server URI has a port");
    // Same server, different host name: still another site
    let other_host = format!("http://localhost:{}/elsewhere", port);

    mount_page(
        &server,
        "/",
        "Home",
        &[
            "https://www.iana.org/domains/example",
            other_host.as_str(),
            "/local",
        ],
    )
    .await;
    mount_page(&server, "/local", "Local", &[]).await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(html_page("Elsewhere", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let result = crawl(create_test_config(), &server.uri()).await;

    assert_eq!(page_paths(&result), vec!["/", "/local"]);
    let host = url::Url::parse(&server.uri())
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string();
    for page in &result.pages {
        let url = url::Url::parse(&page.url).expect("Recorded URL should parse");
        assert_eq!(url.host_str(), Some(host.as_str()));
    }
}

#[tokio::test]
async fn test_content_type_handling() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/doc.pdf"]).await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .expect(1) // Terminal: never retried
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.max_retries = 2;
    let result = crawl(config, &server.uri()).await;

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].url.ends_with("/doc.pdf"));
    assert!(result.errors[0]
        .message
        .contains("Unsupported content type: application/pdf"));
    assert_eq!(result.stats.failed, 1);
}

#[tokio::test]
async fn test_http_error_not_retried() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/missing"]).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.max_retries = 3;
    let result = crawl(config, &server.uri()).await;

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "HTTP 404");
}

#[tokio::test]
async fn test_retry_ceiling_on_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html_page("Slow", &[]).set_delay(Duration::from_millis(1500)))
        .expect(3) // One attempt plus two retries
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.timeout_ms = 200;
    config.crawler.max_retries = 2;
    config.crawler.respect_robots = false;
    let result = crawl(config, &format!("{}/slow", server.uri())).await;

    assert!(result.pages.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("timed out"));
    assert!(result.errors[0].message.contains("after 3 attempts"));
    assert_eq!(result.stats.failed, 1);
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &[]).set_delay(Duration::from_millis(1500)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &[]))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.timeout_ms = 200;
    config.crawler.max_retries = 1;
    config.crawler.respect_robots = false;
    let result = crawl(config, &server.uri()).await;

    assert_eq!(result.pages.len(), 1);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_rate_limit_spacing() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a", "/b", "/c"]).await;
    for page in ["/a", "/b", "/c"] {
        mount_page(&server, page, page, &[]).await;
    }

    let mut config = create_test_config();
    config.crawler.max_concurrency = 4;
    config.crawler.request_delay_ms = 150;
    config.crawler.respect_robots = false;

    let started = Instant::now();
    let result = crawl(config, &server.uri()).await;

    // Four request starts need at least three gaps
    assert_eq!(result.pages.len(), 4);
    assert!(started.elapsed() >= Duration::from_millis(450));
    assert_eq!(
        server
            .received_requests()
            .await
            .expect("Request recording is enabled")
            .len(),
        4
    );
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a", "/a#section", "/b", "/a?utm_source=x"]).await;
    mount_page(&server, "/b", "B", &["/a", "/"]).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("A", &["/b"]))
        .expect(1)
        .mount(&server)
        .await;

    let result = crawl(create_test_config(), &server.uri()).await;

    assert_eq!(page_paths(&result), vec!["/", "/a", "/b"]);
}

#[tokio::test]
async fn test_page_cap_and_domain_scenario() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "Example Domain",
        &[
            "/one",
            "/two",
            "/three",
            "/four",
            "/five",
            "https://www.iana.org/domains/example",
        ],
    )
    .await;
    for page in ["/one", "/two", "/three", "/four", "/five"] {
        mount_page(&server, page, page, &[]).await;
    }

    let mut config = create_test_config();
    config.crawler.max_pages = 4;
    config.crawler.max_depth = 1;
    let result = crawl(config, &server.uri()).await;

    assert_eq!(result.pages.len(), 4);
    let seed = result
        .pages
        .iter()
        .filter(|page| page.depth == 0)
        .count();
    assert_eq!(seed, 1);
    assert!(result.pages.iter().all(|page| !page.url.contains("iana.org")));
}

#[tokio::test]
async fn test_stop_returns_partial_result() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/slow1", "/slow2", "/slow3"]).await;
    for page in ["/slow1", "/slow2", "/slow3"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html_page(page, &[]).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
    }

    let mut config = create_test_config();
    config.crawler.timeout_ms = 10_000;
    config.crawler.respect_robots = false;

    let crawler = Crawler::new(config).expect("Failed to create crawler");
    let mut handle = crawler.start(&server.uri()).expect("Failed to start crawl");
    let mut progress = handle.take_progress().expect("Progress stream available");

    let first = progress.recv().await.expect("At least one progress snapshot");
    assert_eq!(first.processed, 1);

    handle.stop();
    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(3), handle.join())
        .await
        .expect("Stop should end the crawl promptly")
        .expect("A stopped crawl is not an error");

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(result.pages.len(), 1);
    assert!(result.errors.is_empty());
    assert_eq!(result.stats.failed, 0);
}

#[tokio::test]
async fn test_invalid_seed_rejected() {
    let crawler = Crawler::new(create_test_config()).expect("Failed to create crawler");

    for seed in ["not a url", "mailto:someone@example.com", "example.com/page"] {
        match crawler.run(seed).await {
            Err(WalkError::InvalidInput(_)) => {}
            Err(e) => panic!("seed {:?} failed with the wrong error: {}", seed, e),
            Ok(_) => panic!("seed {:?} should be rejected", seed),
        }
    }
}

#[tokio::test]
async fn test_progress_snapshots_are_monotonic() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a", "/b", "/missing"]).await;
    mount_page(&server, "/a", "A", &["/b"]).await;
    mount_page(&server, "/b", "B", &[]).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.max_concurrency = 3;
    let crawler = Crawler::new(config).expect("Failed to create crawler");
    let mut handle = crawler.start(&server.uri()).expect("Failed to start crawl");
    let mut progress = handle.take_progress().expect("Progress stream available");
    assert!(handle.take_progress().is_none());

    let result = handle.join().await.expect("Crawl failed");

    let mut snapshots = Vec::new();
    while let Some(snapshot) = progress.recv().await {
        snapshots.push(snapshot);
    }

    assert!(!snapshots.is_empty());
    for pair in snapshots.windows(2) {
        assert!(pair[1].processed >= pair[0].processed);
        assert!(pair[1].failed >= pair[0].failed);
        assert!(pair[1].completed() >= pair[0].completed());
    }

    let last = snapshots.last().expect("Snapshots are not empty");
    assert_eq!(last.processed, result.pages.len());
    assert_eq!(last.failed, result.errors.len());
    assert_eq!(result.pages.len(), 3);
    assert_eq!(result.errors.len(), 1);
}
