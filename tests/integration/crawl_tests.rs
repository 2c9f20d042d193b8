//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl loop end-to-end against them.

use std::sync::Arc;

use campus_harvest::config::{Config, CrawlerConfig, FetchConfig, ScopeConfig};
use campus_harvest::crawler::{Coordinator, FetchMode, FetchOutcome, Fetcher};
use campus_harvest::output::{CrawlRecord, CrawlStatistics, MemorySink, RecordSink};
use campus_harvest::resource::Classifier;
use campus_harvest::state::PageState;
use campus_harvest::storage::{FsSnapshotStore, SnapshotStore, SqliteStorage};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut crawler = CrawlerConfig::new(format!("{}/", base_url));
    crawler.max_pages = 20;
    crawler.max_depth = 2;
    crawler.delay = 0.0;

    Config {
        crawler,
        fetch: FetchConfig {
            max_retries: 3,
            timeout_secs: 5,
            connect_timeout_secs: 2,
            backoff_base_ms: 1,
            ..FetchConfig::default()
        },
        scope: ScopeConfig {
            allowed_suffixes: vec!["127.0.0.1".to_string()],
            exclude: vec![],
        },
        extract: Default::default(),
        attachments: Default::default(),
        user_agent: Default::default(),
        output: Default::default(),
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Runs a crawl into an in-memory sink and a temporary snapshot directory
async fn crawl(config: Config) -> (CrawlStatistics, Vec<CrawlRecord>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let snapshots: Arc<dyn SnapshotStore> = Arc::new(FsSnapshotStore::new(dir.path()));
    let sink = Arc::new(MemorySink::new());
    let sink_dyn: Arc<dyn RecordSink> = sink.clone();

    let mut coordinator =
        Coordinator::new(config, snapshots, sink_dyn).expect("Failed to create coordinator");
    let stats = coordinator.run().await.expect("Crawl failed");

    (stats, sink.records(), dir)
}

fn record<'a>(records: &'a [CrawlRecord], path: &str) -> Option<&'a CrawlRecord> {
    records
        .iter()
        .find(|r| url::Url::parse(&r.url).map(|u| u.path() == path).unwrap_or(false))
}

#[tokio::test]
async fn test_two_page_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>首页</title></head><body>
            <a href="{}/about">关于我们</a>
            <a href="https://other.org/">外部链接</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/about",
        r#"<html><head><title>About</title></head><body><p>学校简介</p></body></html>"#.to_string(),
    )
    .await;

    let mut config = create_test_config(&base);
    config.crawler.max_pages = 2;
    config.crawler.max_depth = 1;

    let (stats, records, _dir) = crawl(config).await;

    assert_eq!(records.len(), 2);
    assert!(record(&records, "/").is_some());
    let about = record(&records, "/about").expect("Missing /about record");
    assert_eq!(about.title, "About");
    assert_eq!(about.content, "学校简介");
    assert_eq!(about.depth, 1);
    assert!(!about.is_document);
    assert!(records.iter().all(|r| !r.url.contains("other.org")));
    assert_eq!(stats.count(PageState::RecordedWebpage), 2);
}

#[tokio::test]
async fn test_document_short_circuit() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>通知公告</title></head><body>
            <a href="{}/files/report.pdf">2024年度报告</a>
            </body></html>"#,
            base
        ),
    )
    .await;

    Mock::given(method("HEAD"))
        .and(path("/files/report.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    // The document body is never requested
    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (stats, records, _dir) = crawl(create_test_config(&base)).await;

    let doc = record(&records, "/files/report.pdf").expect("Missing document record");
    assert!(doc.is_document);
    assert!(doc.is_attachment);
    assert_eq!(doc.file_type, "PDF文档");
    assert_eq!(doc.mime_type, "application/pdf");
    assert_eq!(doc.title, "2024年度报告");
    assert_eq!(doc.filename.as_deref(), Some("2024年度报告.pdf"));
    assert_eq!(doc.content, format!("[PDF文档] {}", doc.url));
    assert_eq!(doc.snapshot_id, None);
    assert_eq!(doc.depth, 0);
    assert_eq!(stats.documents, 1);
}

#[tokio::test]
async fn test_document_from_response_headers() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body><ul><li><a href="{}/download.jsp?id=7">点击下载</a></li></ul></body></html>"#,
            base
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/download.jsp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/msword")
                .insert_header(
                    "content-disposition",
                    "attachment; filename*=UTF-8''%E8%AF%BE%E9%A2%98%E7%94%B3%E6%8A%A5%E8%A1%A8.doc",
                )
                .set_body_bytes(vec![0xD0, 0xCF, 0x11, 0xE0]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_stats, records, _dir) = crawl(create_test_config(&base)).await;

    let doc = record(&records, "/download.jsp").expect("Missing document record");
    assert!(doc.is_document);
    assert_eq!(doc.title, "课题申报表");
    assert_eq!(doc.filename.as_deref(), Some("课题申报表.doc"));
    assert_eq!(doc.file_type, "Word文档");
}

#[tokio::test]
async fn test_robots_disallow() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/"),
        )
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body>
            <a href="{0}/private/page">内部页面</a>
            <a href="{0}/sibling">相邻页面</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/sibling",
        "<html><body>sibling</body></html>".to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html("<html><body>secret</body></html>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let (stats, records, _dir) = crawl(create_test_config(&base)).await;

    assert!(record(&records, "/sibling").is_some());
    assert!(record(&records, "/private/page").is_none());
    assert_eq!(stats.count(PageState::SkippedRobots), 1);
    assert_eq!(stats.count(PageState::RecordedWebpage), 2);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", "<html><body>home</body></html>".to_string()).await;

    let mut config = create_test_config(&base);
    config.crawler.respect_robots = false;

    let (_stats, records, _dir) = crawl(config).await;
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_retry_then_failed() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let (stats, records, _dir) = crawl(create_test_config(&base)).await;

    assert!(records.is_empty());
    assert_eq!(stats.count(PageState::Failed), 1);
    assert_eq!(stats.fetch_attempts, 3);
}

#[tokio::test]
async fn test_https_downgrade_then_fallback() {
    let server = MockServer::start().await;
    let address = server.address();

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html("<html><body>ok</body></html>".to_string()))
        .mount(&server)
        .await;

    let fetch = FetchConfig {
        max_retries: 3,
        timeout_secs: 5,
        connect_timeout_secs: 2,
        backoff_base_ms: 1,
        ..FetchConfig::default()
    };
    let fetcher = Fetcher::new(&fetch, &Default::default(), Classifier::default())
        .expect("Failed to build fetcher");

    // The plain-HTTP mock answers the downgraded URL on the first try
    let ok = url::Url::parse(&format!("https://{}/ok", address)).unwrap();
    match fetcher.fetch(&ok, FetchMode::Get).await {
        FetchOutcome::Success(response) => {
            assert_eq!(response.attempts, 1);
            assert_eq!(response.final_url, ok);
        }
        FetchOutcome::Failure(failure) => panic!("Expected success, got {}", failure.last_error),
    }

    // Three downgraded attempts, then one against the original https URL
    let flaky = url::Url::parse(&format!("https://{}/flaky", address)).unwrap();
    let outcome = fetcher.fetch(&flaky, FetchMode::Get).await;
    assert!(matches!(outcome, FetchOutcome::Failure(_)));
    assert_eq!(outcome.attempts(), fetch.max_retries + 1);
}

#[tokio::test]
async fn test_unreachable_seed_yields_no_records() {
    let mut config = create_test_config("http://127.0.0.1:1");
    config.fetch.max_retries = 1;

    let (stats, records, _dir) = crawl(config).await;

    assert!(records.is_empty());
    assert_eq!(stats.count(PageState::Failed), 1);
    assert_eq!(stats.visited(), 1);
}

#[tokio::test]
async fn test_max_pages_bound() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (1..=6)
        .map(|i| format!(r#"<a href="{}/p{}">第{}页</a>"#, base, i, i))
        .collect();
    mount_page(&server, "/", format!("<html><body>{}</body></html>", links)).await;
    for i in 1..=6 {
        mount_page(
            &server,
            &format!("/p{}", i),
            format!("<html><body>page {}</body></html>", i),
        )
        .await;
    }

    let mut config = create_test_config(&base);
    config.crawler.max_pages = 3;

    let (stats, records, _dir) = crawl(config).await;

    assert_eq!(records.len(), 3);
    assert_eq!(stats.visited(), 3);
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{}/level1">一级</a></body></html>"#, base),
    )
    .await;
    mount_page(
        &server,
        "/level1",
        format!(r#"<html><body><a href="{}/level2">二级</a></body></html>"#, base),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(html("<html><body>too deep</body></html>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&base);
    config.crawler.max_depth = 1;

    let (stats, records, _dir) = crawl(config).await;

    assert_eq!(records.len(), 2);
    assert_eq!(stats.depth_discards, 1);
    assert_eq!(stats.count(PageState::DepthExceeded), 0);
    assert_eq!(stats.visited(), 2);
}

#[tokio::test]
async fn test_depth_exceeded_marked_when_configured() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{}/level1">一级</a></body></html>"#, base),
    )
    .await;

    let mut config = create_test_config(&base);
    config.crawler.max_depth = 0;
    config.crawler.mark_depth_exceeded = true;

    let (stats, records, _dir) = crawl(config).await;

    assert_eq!(records.len(), 1);
    assert_eq!(stats.count(PageState::DepthExceeded), 1);
    assert_eq!(stats.visited(), 2);
}

#[tokio::test]
async fn test_attachment_page_shallow_scan() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body><a href="{}/info/1001/2345.htm">关于申报课题的通知</a></body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/info/1001/2345.htm",
        format!(
            r#"<html><head><title>关于申报课题的通知</title></head><body>
            <p>附件：<a href="{0}/_upload/files/guide.pdf">申报指南.pdf</a></p>
            <a href="{0}/other">其他新闻</a>
            </body></html>"#,
            base
        ),
    )
    .await;

    Mock::given(method("HEAD"))
        .and(path("/_upload/files/guide.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/other"))
        .respond_with(html("<html><body>other</body></html>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let (stats, records, _dir) = crawl(create_test_config(&base)).await;

    let page = record(&records, "/info/1001/2345.htm").expect("Missing attachment page");
    assert!(!page.is_document);
    let doc = record(&records, "/_upload/files/guide.pdf").expect("Missing attachment");
    assert_eq!(doc.title, "申报指南");
    assert_eq!(doc.depth, 1);
    assert!(record(&records, "/other").is_none());
    assert_eq!(stats.attachment_pages_scanned, 1);
}

#[tokio::test]
async fn test_snapshot_saved_and_loadable() {
    let server = MockServer::start().await;
    let base = server.uri();
    let body = "<html><head><title>快照</title></head><body>raw page</body></html>";
    mount_page(&server, "/", body.to_string()).await;

    let (stats, records, dir) = crawl(create_test_config(&base)).await;

    let home = record(&records, "/").expect("Missing seed record");
    let id = home.snapshot_id.clone().expect("Snapshot was not saved");
    let store = FsSnapshotStore::new(dir.path());
    let raw = store.load(&id).expect("Load failed").expect("Snapshot missing");
    assert_eq!(raw, body.as_bytes());
    assert_eq!(stats.snapshots_saved, 1);
}

#[tokio::test]
async fn test_sqlite_backend_holds_records_and_snapshots() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{}/news">新闻</a></body></html>"#, base),
    )
    .await;
    mount_page(&server, "/news", "<html><body>news</body></html>".to_string()).await;

    let storage = Arc::new(SqliteStorage::new_in_memory().expect("Failed to open DB"));
    let snapshots: Arc<dyn SnapshotStore> = storage.clone();
    let sink: Arc<dyn RecordSink> = storage.clone();

    let mut coordinator = Coordinator::new(create_test_config(&base), snapshots, sink)
        .expect("Failed to create coordinator");
    coordinator.run().await.expect("Crawl failed");

    assert_eq!(storage.count_records().expect("Failed to count"), 2);
    assert_eq!(storage.count_snapshots().expect("Failed to count"), 2);

    let news_url = format!("{}/news", base);
    let news = storage
        .get_record(&news_url)
        .expect("Query failed")
        .expect("Missing record");
    let id = news.snapshot_id.expect("Missing snapshot id");
    assert!(storage.load(&id).expect("Load failed").is_some());
}

#[tokio::test]
async fn test_attachment_link_to_webpage_is_a_leaf() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{}/dl1">下载中心1</a></body></html>"#, base),
    )
    .await;
    mount_page(
        &server,
        "/dl1",
        format!(
            r#"<html><head><title>下载中心</title></head><body>
            <a href="{0}/dl2">下载中心2</a>
            <a href="{0}/news">新闻</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    for page in ["/dl2", "/news"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html("<html><body>never</body></html>".to_string()))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&base);
    config.crawler.max_depth = 0;

    let (stats, records, _dir) = crawl(config).await;

    assert_eq!(records.len(), 2);
    let page = record(&records, "/dl1").expect("Missing /dl1 record");
    assert!(!page.is_document);
    assert_eq!(page.depth, 0);
    assert!(record(&records, "/dl2").is_none());
    assert_eq!(stats.visited(), 2);
}

#[tokio::test]
async fn test_https_seed_links_stay_https() {
    let server = MockServer::start().await;
    let base = format!("https://{}", server.address());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/">首页</a><a href="/about">关于我们</a></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<html><body>学校简介</body></html>".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let (_stats, records, _dir) = crawl(create_test_config(&base)).await;

    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls.len(), 2, "records: {:?}", urls);
    assert!(urls.contains(&format!("{}/", base).as_str()));
    assert!(urls.contains(&format!("{}/about", base).as_str()));
}

#[tokio::test]
async fn test_snapshot_write_failure_still_emits_record() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        "<html><head><title>首页</title></head><body>内容</body></html>".to_string(),
    )
    .await;

    // A regular file where the snapshot directory should be
    let dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = dir.path().join("snapshots");
    std::fs::write(&blocker, b"not a directory").expect("Failed to write file");

    let snapshots: Arc<dyn SnapshotStore> = Arc::new(FsSnapshotStore::new(&blocker));
    let sink = Arc::new(MemorySink::new());
    let sink_dyn: Arc<dyn RecordSink> = sink.clone();

    let mut coordinator = Coordinator::new(create_test_config(&base), snapshots, sink_dyn)
        .expect("Failed to create coordinator");
    let stats = coordinator.run().await.expect("Crawl failed");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "首页");
    assert!(records[0].snapshot_id.is_none());
    assert_eq!(stats.snapshot_failures, 1);
    assert_eq!(stats.snapshots_saved, 0);
}
