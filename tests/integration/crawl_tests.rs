//! Integration tests for the crawler
//!
//! These tests use wiremock to serve results pages and run the full crawl
//! cycle end-to-end: HTTP transport, extraction, SQLite persistence and
//! debug captures.

use lot_trawler::config::{BlockPolicy, Config};
use lot_trawler::crawler::crawl;
use lot_trawler::storage::{RunStatus, SqliteStorage, Storage};
use lot_trawler::StrategyKind;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTINGS_PATH: &str = "/used-cars-for-sale/listings/";

struct TestEnv {
    server: MockServer,
    dir: TempDir,
}

impl TestEnv {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("listings.db")
    }

    fn debug_dir(&self) -> PathBuf {
        self.dir.path().join("debug")
    }

    /// Configuration pointing every URL at the mock server
    fn config(&self, results_wanted: u32, max_pages: u32) -> Config {
        let mut config = Config::default();
        config.search.start_url = Some(format!("{}{}", self.server.uri(), LISTINGS_PATH));
        config.limits.results_wanted = results_wanted;
        config.limits.max_pages = max_pages;
        config.limits.max_concurrency = 2;
        config.transport.timeout_secs = 5;
        config.transport.max_retries = 1;
        config.transport.retry_delay_ms = 1;
        config.extraction.site_origin = self.server.uri();
        config.extraction.structured.listing_url_base =
            format!("{}/used-cars-for-sale/listing/", self.server.uri());
        config.output.database_path = self.db_path().to_string_lossy().into_owned();
        config.output.debug_dir = self.debug_dir().to_string_lossy().into_owned();
        config
    }

    fn storage(&self) -> SqliteStorage {
        SqliteStorage::new(&self.db_path()).expect("Failed to open database")
    }

    /// Serves `body` for the first results page
    async fn mount_first_page(&self, body: String) {
        Mock::given(method("GET"))
            .and(path(LISTINGS_PATH))
            .respond_with(html(body))
            .mount(&self.server)
            .await;
    }

    /// Serves `body` for `?page=<n>`; must be mounted before the first page
    async fn mount_page(&self, n: u32, body: String) {
        Mock::given(method("GET"))
            .and(path(LISTINGS_PATH))
            .and(query_param("page", n.to_string()))
            .respond_with(html(body))
            .mount(&self.server)
            .await;
    }

    async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn listing(vin: &str) -> Value {
    json!({
        "__typename": "ConsumerSummaryListing",
        "id": format!("id-{}", vin),
        "vehicle": {
            "vin": vin,
            "year": 2020,
            "make": { "name": "Chevrolet", "slug": "chevrolet" },
            "model": { "name": "Malibu", "slug": "malibu" },
            "mileage": 30000
        },
        "pricing": { "listPrice": 17500 },
        "location": { "city": "Austin", "state": "TX" }
    })
}

fn state_page(vins: &[String]) -> String {
    let listings: Vec<Value> = vins.iter().map(|vin| listing(vin)).collect();
    format!(
        r#"<html><head><title>Used Chevrolet Malibu for Sale</title></head><body>
        <script id="__NEXT_DATA__" type="application/json">{}</script>
        </body></html>"#,
        json!({ "props": { "pageProps": { "listings": listings } } })
    )
}

fn card_page(count: usize) -> String {
    let cards: String = (0..count)
        .map(|i| {
            format!(
                r#"<div data-test="cardContent">
                    <span data-test="vehicleCardYear">2019</span>
                    <span data-test="vehicleCardMake">Chevrolet</span>
                    <span data-test="vehicleCardModel">Malibu</span>
                    <div data-test="vehicleCardPrice">$15,{:03}</div>
                    <a data-test="vehicleCardLink" href="/used-cars-for-sale/listing/card-{}/">View</a>
                </div>"#,
                i, i
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", cards)
}

fn vins(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{:03}", prefix, i)).collect()
}

fn captured(dir: &Path, key: &str) -> bool {
    dir.join(format!("{}.html", key)).exists()
}

#[tokio::test]
async fn test_budget_met_on_first_page() {
    let env = TestEnv::start().await;
    env.mount_page(2, state_page(&vins("B", 8))).await;
    env.mount_first_page(state_page(&vins("A", 8))).await;

    let report = crawl(env.config(5, 10), "hash-1").await.expect("Crawl failed");

    assert_eq!(report.saved_count, 5);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.truncated, 3);
    assert_eq!(env.request_count().await, 1, "Page 2 should never be requested");

    let storage = env.storage();
    let run = storage.get_latest_run().unwrap().expect("Run should be recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.saved_count, 5);
    assert_eq!(run.pages_visited, 1);
    assert_eq!(run.config_hash, "hash-1");
    assert!(run.finished_at.is_some());
    assert_eq!(storage.count_listings(Some(run.id)).unwrap(), 5);
}

#[tokio::test]
async fn test_page_cap_with_duplicates() {
    let env = TestEnv::start().await;

    let first = vins("A", 5);
    let mut second = vec![first[3].clone(), first[4].clone()];
    second.extend(vins("B", 3));

    env.mount_page(2, state_page(&second)).await;
    env.mount_page(3, state_page(&vins("C", 5))).await;
    env.mount_first_page(state_page(&first)).await;

    let report = crawl(env.config(50, 2), "hash-2").await.expect("Crawl failed");

    assert_eq!(report.saved_count, 8);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.duplicates_skipped, 2);
    assert_eq!(env.request_count().await, 2, "Page 3 is beyond the page cap");

    let storage = env.storage();
    assert_eq!(storage.count_listings(None).unwrap(), 8);
    assert_eq!(storage.count_distinct_vins().unwrap(), 8);
}

#[tokio::test]
async fn test_explicit_next_link_is_followed() {
    let env = TestEnv::start().await;

    let first = format!(
        r#"{}<a data-test="pagination-next" href="{}?page=7">Next</a>"#,
        state_page(&vins("A", 2)),
        LISTINGS_PATH
    );
    env.mount_page(7, state_page(&vins("G", 2))).await;
    env.mount_first_page(first).await;

    let report = crawl(env.config(4, 5), "hash").await.expect("Crawl failed");

    assert_eq!(report.saved_count, 4);
    assert_eq!(report.pages_visited, 2);
}

#[tokio::test]
async fn test_blocked_page_is_captured_and_skipped() {
    let env = TestEnv::start().await;
    let blocked = format!(
        "<html><body><h1>Please complete the CAPTCHA</h1>{}</body></html>",
        state_page(&vins("A", 3))
    );
    env.mount_first_page(blocked).await;

    let mut config = env.config(10, 1);
    config.extraction.block_policy = BlockPolicy::Skip;
    let report = crawl(config, "hash").await.expect("Crawl failed");

    assert_eq!(report.saved_count, 0);
    assert_eq!(report.pages_blocked, 1);
    assert!(captured(&env.debug_dir(), "blocked_page_pg1"));
    assert!(!captured(&env.debug_dir(), "debug_page_pg1"));
}

#[tokio::test]
async fn test_blocked_page_still_extracted_by_default() {
    let env = TestEnv::start().await;
    let blocked = format!(
        "<html><body><p>Verify you are human</p>{}</body></html>",
        state_page(&vins("A", 3))
    );
    env.mount_first_page(blocked).await;

    let report = crawl(env.config(3, 1), "hash").await.expect("Crawl failed");

    assert_eq!(report.pages_blocked, 1);
    assert_eq!(report.saved_count, 3);
    assert!(captured(&env.debug_dir(), "blocked_page_pg1"));
}

#[tokio::test]
async fn test_markup_fallback_end_to_end() {
    let env = TestEnv::start().await;
    env.mount_first_page(card_page(4)).await;

    let report = crawl(env.config(4, 3), "hash").await.expect("Crawl failed");

    assert_eq!(report.saved_count, 4);
    assert_eq!(report.by_strategy.get("markup"), Some(&4));

    let storage = env.storage();
    let run = storage.get_latest_run().unwrap().unwrap();
    let listings = storage.get_listings(run.id).unwrap();
    assert_eq!(listings.len(), 4);
    assert!(listings.iter().all(|l| l.strategy_used == StrategyKind::Markup));
    assert_eq!(
        listings[0].url.as_deref(),
        Some(format!("{}/used-cars-for-sale/listing/card-0/", env.server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_empty_page_captured_and_pagination_continues() {
    let env = TestEnv::start().await;
    env.mount_page(2, state_page(&vins("B", 2))).await;
    env.mount_first_page("<html><body><p>No results</p></body></html>".to_string())
        .await;

    let report = crawl(env.config(2, 3), "hash").await.expect("Crawl failed");

    assert_eq!(report.pages_empty, 1);
    assert_eq!(report.saved_count, 2);
    assert!(captured(&env.debug_dir(), "debug_page_pg1"));
}

#[tokio::test]
async fn test_fetch_failure_marks_run_failed() {
    let env = TestEnv::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&env.server)
        .await;

    let report = crawl(env.config(5, 3), "hash").await.expect("Crawl failed");

    assert_eq!(report.saved_count, 0);
    assert_eq!(report.pages_failed, 1);
    // One attempt plus one retry
    assert_eq!(env.request_count().await, 2);

    let run = env.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_jsonl_export_alongside_database() {
    let env = TestEnv::start().await;
    env.mount_first_page(state_page(&vins("A", 3))).await;

    let jsonl = env.dir.path().join("out").join("listings.jsonl");
    let mut config = env.config(3, 1);
    config.output.jsonl_path = Some(jsonl.to_string_lossy().into_owned());

    let report = crawl(config, "hash").await.expect("Crawl failed");
    assert_eq!(report.saved_count, 3);

    let content = std::fs::read_to_string(&jsonl).expect("JSONL file should exist");
    let lines: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["vin"], "A000");
    assert_eq!(lines[0]["make"], "Chevrolet");
}

#[tokio::test]
async fn test_runs_are_recorded_separately() {
    let env = TestEnv::start().await;
    env.mount_first_page(state_page(&vins("A", 2))).await;

    crawl(env.config(2, 1), "first").await.expect("First crawl failed");
    crawl(env.config(2, 1), "second").await.expect("Second crawl failed");

    let storage = env.storage();
    assert_eq!(storage.count_runs().unwrap(), 2);
    // Same listings may be saved again by a later run
    assert_eq!(storage.count_listings(None).unwrap(), 4);
    assert_eq!(storage.count_distinct_vins().unwrap(), 2);
    assert_eq!(storage.get_latest_run().unwrap().unwrap().config_hash, "second");
}
