//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full discovery and retrieval cycle end-to-end.

use site_gleaner::config::{parse_config, Config};
use site_gleaner::crawler::{record_id, Coordinator};
use site_gleaner::output::{DiscoveryStrategy, SkipReason};
use site_gleaner::robots::RobotsStatus;
use site_gleaner::storage::{JsonFileStore, MemoryStore, PageRecord, PageStore};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration for the mock server with optional extra crawler keys
fn create_test_config(root: &str, crawler_extra: &str) -> Config {
    parse_config(&format!(
        r#"
[site]
root-origin = "{}"
source = "test-site"

[crawler]
rate-limit-interval = 0
request-timeout = 2000
max-retries = 0
retry-backoff = 10
{}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"
"#,
        root, crawler_extra
    ))
    .expect("Failed to build test config")
}

async fn mount_page(server: &MockServer, p: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

async fn mount_xml(server: &MockServer, p: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/xml"))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

fn urlset(base: &str, paths: &[&str]) -> String {
    let entries: String = paths
        .iter()
        .map(|p| format!("<url><loc>{}{}</loc></url>", base, p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

/// Paths of every request the server received, in arrival order
async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

/// Serves HTML and remembers when each request arrived
#[derive(Clone, Default)]
struct ArrivalLog {
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl ArrivalLog {
    fn gaps(&self) -> Vec<Duration> {
        let arrivals = self.arrivals.lock().unwrap();
        arrivals.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl Respond for ArrivalLog {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200)
            .set_body_raw(format!("<p>Page {}</p>", request.url.path()), "text/html")
    }
}

/// Serves HTML and cancels the run on the first request
struct CancelOnRequest {
    cancel: CancellationToken,
}

impl Respond for CancelOnRequest {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.cancel.cancel();
        ResponseTemplate::new(200)
            .set_body_raw(format!("<p>Page {}</p>", request.url.path()), "text/html")
    }
}

fn saved_urls(store: &MemoryStore) -> Vec<String> {
    let mut urls: Vec<String> = store.records().into_iter().map(|r| r.url).collect();
    urls.sort();
    urls
}

#[tokio::test]
async fn test_sitemap_urls_are_retrieved_without_crawling() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(&server, "/sitemap.xml", &urlset(&base, &["/a", "/b"])).await;
    mount_page(&server, "/a", "<title>A</title><p>Alpha</p><a href='/c'>C</a>").await;
    mount_page(&server, "/b", "<title>B</title><p>Beta</p>").await;
    mount_page(&server, "/c", "<p>Never listed</p>").await;
    mount_page(&server, "/", "<p>Home</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .expect("Crawl should start");

    assert_eq!(report.strategy, DiscoveryStrategy::Sitemap);
    assert_eq!(report.robots, RobotsStatus::Missing);
    assert_eq!(report.discovered, 2);
    assert_eq!(report.saved, 2);
    assert_eq!(
        saved_urls(&store),
        vec![format!("{}/a", base), format!("{}/b", base)]
    );

    // Breadth-first discovery never ran: neither the root nor linked pages were fetched
    let paths = requested_paths(&server).await;
    assert!(!paths.contains(&"/".to_string()));
    assert!(!paths.contains(&"/c".to_string()));
}

#[tokio::test]
async fn test_unreadable_sitemap_falls_back_to_same_origin_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/sitemap.xml", "<html><body>Oops, not a sitemap").await;
    mount_page(
        &server,
        "/",
        r#"<title>Home</title><p>Welcome</p>
           <a href="/page1">Page 1</a>
           <a href="https://other.test/x">Elsewhere</a>
           <a href="mailto:info@example.com">Mail</a>"#,
    )
    .await;
    mount_page(&server, "/page1", "<title>Page 1</title><p>One</p><a href='/'>Home</a>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.strategy, DiscoveryStrategy::Frontier);
    assert_eq!(report.discovered, 2);
    assert_eq!(
        saved_urls(&store),
        vec![format!("{}/", base), format!("{}/page1", base)]
    );
}

#[tokio::test]
async fn test_empty_sitemap_falls_back_to_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(&server, "/sitemap.xml", &urlset(&base, &[])).await;
    mount_page(&server, "/", "<p>Home</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.strategy, DiscoveryStrategy::Frontier);
    assert_eq!(report.saved, 1);
}

#[tokio::test]
async fn test_disallowed_page_is_never_fetched_nor_its_links_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /secret").await;
    mount_page(
        &server,
        "/",
        r#"<p>Home</p><a href="/secret">Secret</a><a href="/public">Public</a>"#,
    )
    .await;
    mount_page(&server, "/secret", r#"<p>Hidden</p><a href="/hidden">Deeper</a>"#).await;
    mount_page(&server, "/hidden", "<p>Deeper</p>").await;
    mount_page(&server, "/public", "<p>Public</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.robots, RobotsStatus::Loaded);
    assert_eq!(
        saved_urls(&store),
        vec![format!("{}/", base), format!("{}/public", base)]
    );

    let paths = requested_paths(&server).await;
    assert!(!paths.contains(&"/secret".to_string()));
    assert!(!paths.contains(&"/hidden".to_string()));
}

#[tokio::test]
async fn test_disallowed_sitemap_entry_is_dropped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: TestBot\nDisallow: /private").await;
    mount_xml(&server, "/sitemap.xml", &urlset(&base, &["/open", "/private/doc"])).await;
    mount_page(&server, "/open", "<p>Open</p>").await;
    mount_page(&server, "/private/doc", "<p>Private</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.discovered, 1);
    assert_eq!(saved_urls(&store), vec![format!("{}/open", base)]);
    assert!(!requested_paths(&server)
        .await
        .contains(&"/private/doc".to_string()));
}

#[tokio::test]
async fn test_timeout_is_skipped_and_other_pages_processed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(&server, "/sitemap.xml", &urlset(&base, &["/a", "/slow", "/c"])).await;
    mount_page(&server, "/a", "<p>A</p>").await;
    mount_page(&server, "/c", "<p>C</p>").await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>Too late</p>", "text/html")
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let mut config = create_test_config(&base, "");
    config.crawler.request_timeout = 300;
    let report = Coordinator::new(config, store.clone()).run().await.unwrap();

    assert_eq!(report.discovered, 3);
    assert_eq!(report.saved, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.skipped_for(SkipReason::Unreachable), 1);
    assert_eq!(report.failures(), 1);
    assert_eq!(
        saved_urls(&store),
        vec![format!("{}/a", base), format!("{}/c", base)]
    );
}

#[tokio::test]
async fn test_empty_page_yields_no_record_and_no_failure() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(&server, "/sitemap.xml", &urlset(&base, &["/a", "/blank"])).await;
    mount_page(&server, "/a", "<p>Text</p>").await;
    mount_page(
        &server,
        "/blank",
        "<html><head><script>render()</script></head><body> </body></html>",
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.saved, 1);
    assert_eq!(report.empty, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failures(), 0);
    assert_eq!(saved_urls(&store), vec![format!("{}/a", base)]);
}

#[tokio::test]
async fn test_non_html_and_http_errors_are_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        &urlset(&base, &["/doc.pdf", "/gone", "/ok"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF", "application/pdf"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    mount_page(&server, "/ok", "<p>Fine</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.saved, 1);
    assert_eq!(report.skipped_for(SkipReason::NonHtml), 1);
    assert_eq!(report.skipped_for(SkipReason::HttpStatus), 1);
    assert_eq!(report.failures(), 1);
}

#[tokio::test]
async fn test_sitemap_index_from_robots_with_out_of_origin_entries() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(
        &server,
        &format!("User-agent: *\nAllow: /\nSitemap: {}/maps/index.xml", base),
    )
    .await;
    mount_xml(
        &server,
        "/maps/index.xml",
        &format!(
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                 <sitemap><loc>{base}/maps/pages.xml</loc></sitemap>
                 <sitemap><loc>{base}/maps/pages.xml</loc></sitemap>
                 <sitemap><loc>https://other.test/sitemap.xml</loc></sitemap>
               </sitemapindex>"#,
            base = base
        ),
    )
    .await;
    mount_xml(
        &server,
        "/maps/pages.xml",
        &format!(
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                 <url><loc>{base}/one#top</loc></url>
                 <url><loc>{base}/two</loc></url>
                 <url><loc>https://other.test/three</loc></url>
               </urlset>"#,
            base = base
        ),
    )
    .await;
    mount_page(&server, "/one", "<p>One</p>").await;
    mount_page(&server, "/two", "<p>Two</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.strategy, DiscoveryStrategy::Sitemap);
    assert_eq!(report.discovered, 2);
    assert_eq!(
        saved_urls(&store),
        vec![format!("{}/one", base), format!("{}/two", base)]
    );

    // The duplicated child sitemap is read once
    let pages_xml_fetches = requested_paths(&server)
        .await
        .iter()
        .filter(|p| p.as_str() == "/maps/pages.xml")
        .count();
    assert_eq!(pages_xml_fetches, 1);
}

#[tokio::test]
async fn test_crawl_fetches_each_page_once_during_discovery() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Pages link to each other in a cycle; each is fetched once while
    // discovering and once more while retrieving.
    for (p, links) in [("/", ["/x", "/y"]), ("/x", ["/y", "/"]), ("/y", ["/x", "/"])] {
        let body = format!(
            r#"<p>Page {}</p><a href="{}">1</a><a href="{}#frag">2</a>"#,
            p, links[0], links[1]
        );
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .expect(2)
            .mount(&server)
            .await;
    }

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.discovered, 3);
    assert_eq!(report.saved, 3);
    server.verify().await;
}

#[tokio::test]
async fn test_crawl_respects_max_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<p>Home</p><a href="/1">1</a><a href="/2">2</a><a href="/3">3</a>"#,
    )
    .await;
    for p in ["/1", "/2", "/3"] {
        mount_page(&server, p, "<p>Leaf</p>").await;
    }

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, "max-pages = 2"), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.strategy, DiscoveryStrategy::Frontier);
    assert_eq!(report.discovered, 2);
    assert_eq!(
        saved_urls(&store),
        vec![format!("{}/", base), format!("{}/1", base)]
    );
}

#[tokio::test]
async fn test_concurrent_workers_process_every_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    let paths = ["/p1", "/p2", "/p3", "/p4", "/p5", "/p6"];
    mount_xml(&server, "/sitemap.xml", &urlset(&base, &paths)).await;
    for p in paths {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!("<p>Page {}</p>", p), "text/html")
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, "workers = 3"), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.saved, 6);
    assert_eq!(store.records().len(), 6);
    server.verify().await;
}

#[tokio::test]
async fn test_workers_share_one_rate_limiter() {
    let server = MockServer::start().await;
    let base = server.uri();
    let log = ArrivalLog::default();

    mount_xml(&server, "/sitemap.xml", &urlset(&base, &["/p1", "/p2", "/p3", "/p4"])).await;
    Mock::given(method("GET"))
        .and(path_regex("^/p[0-9]$"))
        .respond_with(log.clone())
        .mount(&server)
        .await;

    let mut config = create_test_config(&base, "workers = 3");
    config.crawler.rate_limit_interval = 150;
    let report = Coordinator::new(config, Arc::new(MemoryStore::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.saved, 4);

    let gaps = log.gaps();
    assert_eq!(gaps.len(), 3);
    for gap in gaps {
        // Small allowance for delivery jitter between release and arrival
        assert!(gap >= Duration::from_millis(130), "requests only {:?} apart", gap);
    }
}

#[tokio::test]
async fn test_cancel_during_retrieval_starts_no_new_requests() {
    let server = MockServer::start().await;
    let base = server.uri();
    let cancel = CancellationToken::new();

    mount_xml(&server, "/sitemap.xml", &urlset(&base, &["/p1", "/p2", "/p3", "/p4"])).await;
    Mock::given(method("GET"))
        .and(path_regex("^/p[0-9]$"))
        .respond_with(CancelOnRequest {
            cancel: cancel.clone(),
        })
        .mount(&server)
        .await;

    let mut config = create_test_config(&base, "workers = 4");
    config.crawler.rate_limit_interval = 400;
    let report = Coordinator::new(config, Arc::new(MemoryStore::new()))
        .with_cancellation(cancel)
        .run()
        .await
        .unwrap();

    let pages: Vec<String> = requested_paths(&server)
        .await
        .into_iter()
        .filter(|p| p.starts_with("/p"))
        .collect();
    assert_eq!(pages.len(), 1, "requests after cancellation: {:?}", pages);

    assert!(report.cancelled);
    assert_eq!(report.saved, 1);
    assert_eq!(report.interrupted, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failures(), 0);
}

#[tokio::test]
async fn test_robots_redirected_to_other_host_is_honoured() {
    let server = MockServer::start().await;
    let policy_host = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/robots.txt", policy_host.uri()).as_str()),
        )
        .mount(&server)
        .await;
    mount_robots(&policy_host, "User-agent: *\nDisallow: /secret\n").await;
    mount_page(
        &server,
        "/",
        "<p>Home</p><a href='/secret'>Secret</a><a href='/open'>Open</a>",
    )
    .await;
    mount_page(&server, "/secret", "<p>Hidden</p>").await;
    mount_page(&server, "/open", "<p>Open</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.robots, RobotsStatus::Loaded);
    assert_eq!(
        saved_urls(&store),
        vec![format!("{}/", base), format!("{}/open", base)]
    );
    assert!(!requested_paths(&server)
        .await
        .contains(&"/secret".to_string()));
}

#[tokio::test]
async fn test_json_output_files_keyed_by_url_hash() {
    let server = MockServer::start().await;
    let base = server.uri();
    let out = TempDir::new().unwrap();

    mount_xml(&server, "/sitemap.xml", &urlset(&base, &["/about"])).await;
    mount_page(
        &server,
        "/about",
        "<html><head><title>About</title></head><body><p>We exist.</p></body></html>",
    )
    .await;

    let store = Arc::new(JsonFileStore::new(out.path()).unwrap());
    Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    let url = url::Url::parse(&format!("{}/about", base)).unwrap();
    let id = record_id(&url);
    let content = std::fs::read_to_string(out.path().join(format!("{}.json", id))).unwrap();
    let record: PageRecord = serde_json::from_str(&content).unwrap();

    assert_eq!(record.id, id);
    assert_eq!(record.url, url.as_str());
    assert_eq!(record.title, "About");
    assert_eq!(record.text, "About We exist.");
    assert_eq!(record.source, "test-site");
    assert!(record.retrieved_at.ends_with('Z'));

    // A second run overwrites the same file
    Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn test_forbidden_robots_blocks_everything() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    mount_xml(&server, "/sitemap.xml", &urlset(&base, &["/a"])).await;
    mount_page(&server, "/", "<p>Home</p>").await;
    mount_page(&server, "/a", "<p>A</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.robots, RobotsStatus::Forbidden);
    assert_eq!(report.saved, 0);

    let paths = requested_paths(&server).await;
    assert!(!paths.contains(&"/".to_string()));
    assert!(!paths.contains(&"/a".to_string()));
}

#[tokio::test]
async fn test_unavailable_robots_is_flagged_and_crawl_proceeds() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/", "<p>Home</p>").await;

    let store = Arc::new(MemoryStore::new());
    let report = Coordinator::new(create_test_config(&base, ""), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.robots, RobotsStatus::Unavailable);
    assert!(report.robots.is_degraded());
    assert_eq!(report.saved, 1);
}
