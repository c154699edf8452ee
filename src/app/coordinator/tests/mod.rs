//! Coordinator tests against a mock iono.fm
//!
//! Pipeline-level behaviour (idempotent re-runs, resumes, unresolved items,
//! interruption) is exercised here with wiremock standing in for the landing
//! pages and the audio host.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::app::client::ClientConfig;
use crate::app::hash::ContentDigests;
use crate::app::models::{Enclosure, Item, SeriesFeed};
use crate::app::progress::NoopReporter;
use crate::app::retry::RetryPolicy;

use super::*;

const AUDIO: &[u8] = b"0123456789abcdefghij";

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        initial_delay: Duration::from_millis(10),
        backoff_multiplier: 1.0,
        max_delay: Duration::from_millis(10),
    }
}

fn coordinator(root: &TempDir, shutdown: ShutdownSignal) -> Coordinator {
    let client = PodcastClient::with_config(&ClientConfig {
        rate_limit_rps: 1000,
        ..Default::default()
    })
    .unwrap();
    let config = CoordinatorConfig::default()
        .with_output_root(root.path())
        .with_series_dir("Test Show")
        .with_retry(fast_retry());
    Coordinator::new(config, Arc::new(client), shutdown, Arc::new(NoopReporter))
}

fn item(server: &MockServer, id: &str, enclosure_length: Option<u64>) -> Item {
    Item {
        id: id.to_string(),
        landing_url: format!("{}/e/{}", server.uri(), id),
        title: format!("Feed title {}", id),
        feed_episode_number: None,
        published: None,
        media: enclosure_length
            .map(|length| Enclosure {
                url: format!("{}/audio/{}.m4a", server.uri(), id),
                length: Some(length),
                mime_type: Some("audio/mp4".to_string()),
            })
            .into_iter()
            .collect(),
    }
}

fn feed(items: Vec<Item>) -> SeriesFeed {
    SeriesFeed {
        title: "Test Show".to_string(),
        source_url: "https://iono.fm/rss/chan/1".to_string(),
        items,
    }
}

fn landing_page(server: &MockServer, id: &str, number: u32) -> String {
    format!(
        r#"<html><head>
<meta property="og:title" content="Episode {number}: Title {id}">
<meta name="description" content="Description {id}">
<meta name="author" content="Host">
<meta property="og:audio" content="{uri}/audio/{id}.m4a">
</head><body></body></html>"#,
        number = number,
        id = id,
        uri = server.uri()
    )
}

async fn mount_page(server: &MockServer, id: &str, number: u32, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/e/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page(server, id, number)))
        .expect(expected_hits)
        .mount(server)
        .await;
}

async fn mount_head_with_etag(server: &MockServer, id: &str) {
    let etag = format!("\"{}\"", ContentDigests::of_bytes(AUDIO).md5.to_hex());
    Mock::given(method("HEAD"))
        .and(path(format!("/audio/{}.m4a", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", etag.as_str())
                .insert_header("Content-Type", "audio/mp4"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_then_idempotent_rerun() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "1", 1, 1).await;
    mount_head_with_etag(&server, "1").await;
    Mock::given(method("GET"))
        .and(path("/audio/1.m4a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed(vec![item(&server, "1", None)]);

    let coordinator = coordinator(&root, ShutdownSignal::new());
    let plan = coordinator.plan(&feed).await.unwrap();
    assert_eq!(plan.dir_name, "test_show");
    assert_eq!(plan.episodes.len(), 1);
    assert_eq!(plan.episodes[0].episode_number, Some(1));

    let result = coordinator.download(&plan).await;
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.stats.downloaded, 1);
    assert_eq!(result.completed, ["1"]);

    let file = plan.series_dir.join("description_1_1.m4a");
    assert_eq!(tokio::fs::read(&file).await.unwrap(), AUDIO);
    assert!(plan.series_dir.join("cache.json").exists());

    // Second run: cache hit for metadata, hash match for the file
    let plan = coordinator.plan(&feed).await.unwrap();
    assert_eq!(plan.cached, 1);
    let result = coordinator.download(&plan).await;
    assert_eq!(result.stats.skipped, 1);
    assert_eq!(result.stats.downloaded, 0);
    assert_eq!(result.headline(), "Successfully downloaded 1/1 episodes");
}

#[tokio::test]
async fn test_resume_uses_range_from_local_size() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "2", 2, 1).await;
    Mock::given(method("HEAD"))
        .and(path("/audio/2.m4a"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/2.m4a"))
        .and(header("Range", "bytes=8-"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(&AUDIO[8..]))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed(vec![item(&server, "2", Some(AUDIO.len() as u64))]);
    let coordinator = coordinator(&root, ShutdownSignal::new());
    let plan = coordinator.plan(&feed).await.unwrap();

    let partial = plan.series_dir.join("description_2_2.m4a");
    tokio::fs::write(&partial, &AUDIO[..8]).await.unwrap();

    let result = coordinator.download(&plan).await;
    assert_eq!(result.stats.downloaded, 1);
    assert_eq!(tokio::fs::read(&partial).await.unwrap(), AUDIO);
}

#[tokio::test]
async fn test_recheck_answered_by_416() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "3", 3, 1).await;
    mount_head_with_etag(&server, "3").await;
    Mock::given(method("GET"))
        .and(path("/audio/3.m4a"))
        .and(header("Range", format!("bytes={}-", AUDIO.len()).as_str()))
        .respond_with(ResponseTemplate::new(416))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed(vec![item(&server, "3", None)]);
    let client = PodcastClient::with_config(&ClientConfig {
        rate_limit_rps: 1000,
        ..Default::default()
    })
    .unwrap();
    let config = CoordinatorConfig::default()
        .with_output_root(root.path())
        .with_series_dir("Test Show")
        .with_recheck(true)
        .with_retry(fast_retry());
    let coordinator = Coordinator::new(
        config,
        Arc::new(client),
        ShutdownSignal::new(),
        Arc::new(NoopReporter),
    );

    let plan = coordinator.plan(&feed).await.unwrap();
    let file = plan.series_dir.join("description_3_3.m4a");
    tokio::fs::write(&file, AUDIO).await.unwrap();

    let result = coordinator.download(&plan).await;
    assert_eq!(result.stats.already_complete, 1);
    assert_eq!(tokio::fs::read(&file).await.unwrap(), AUDIO);
}

#[tokio::test]
async fn test_opaque_etag_keeps_complete_file() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "8", 8, 1).await;
    Mock::given(method("HEAD"))
        .and(path("/audio/8.m4a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"65f1a2b3-14\"")
                .insert_header("Content-Length", AUDIO.len().to_string().as_str())
                .insert_header("Content-Type", "audio/mp4"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/8.m4a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO))
        .expect(0)
        .mount(&server)
        .await;

    let feed = feed(vec![item(&server, "8", Some(AUDIO.len() as u64))]);
    let coordinator = coordinator(&root, ShutdownSignal::new());
    let plan = coordinator.plan(&feed).await.unwrap();
    let file = plan.series_dir.join("description_8_8.m4a");
    tokio::fs::write(&file, AUDIO).await.unwrap();

    let result = coordinator.download(&plan).await;
    assert_eq!(result.stats.skipped, 1);
    assert_eq!(result.stats.downloaded, 0);
    assert_eq!(tokio::fs::read(&file).await.unwrap(), AUDIO);
}

#[tokio::test]
async fn test_same_size_digest_mismatch_asks_for_remaining_range() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "9", 9, 1).await;
    Mock::given(method("HEAD"))
        .and(path("/audio/9.m4a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"00000000000000000000000000000000\"")
                .insert_header("Content-Type", "audio/mp4"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/9.m4a"))
        .and(header("Range", format!("bytes={}-", AUDIO.len()).as_str()))
        .respond_with(ResponseTemplate::new(416))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed(vec![item(&server, "9", Some(AUDIO.len() as u64))]);
    let coordinator = coordinator(&root, ShutdownSignal::new());
    let plan = coordinator.plan(&feed).await.unwrap();
    let file = plan.series_dir.join("description_9_9.m4a");
    tokio::fs::write(&file, AUDIO).await.unwrap();

    let result = coordinator.download(&plan).await;
    assert_eq!(result.stats.already_complete, 1);
    assert_eq!(tokio::fs::read(&file).await.unwrap(), AUDIO);
}

#[tokio::test]
async fn test_overlong_file_is_fetched_again() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "10", 10, 1).await;
    Mock::given(method("HEAD"))
        .and(path("/audio/10.m4a"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/10.m4a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed(vec![item(&server, "10", Some(AUDIO.len() as u64))]);
    let coordinator = coordinator(&root, ShutdownSignal::new());
    let plan = coordinator.plan(&feed).await.unwrap();
    let file = plan.series_dir.join("description_10_10.m4a");
    tokio::fs::write(&file, [AUDIO, b"trailing"].concat()).await.unwrap();

    let result = coordinator.download(&plan).await;
    assert_eq!(result.stats.downloaded, 1);
    assert_eq!(tokio::fs::read(&file).await.unwrap(), AUDIO);
}

#[tokio::test]
async fn test_stalled_transfer_is_retried() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(&server, "11", 11, 1).await;
    Mock::given(method("GET"))
        .and(path("/audio/11.m4a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(AUDIO)
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/11.m4a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO))
        .expect(1)
        .mount(&server)
        .await;

    let client = PodcastClient::with_config(&ClientConfig {
        rate_limit_rps: 1000,
        request_timeout: Duration::from_millis(500),
        ..Default::default()
    })
    .unwrap();
    let config = CoordinatorConfig::default()
        .with_output_root(root.path())
        .with_series_dir("Test Show")
        .with_retry(fast_retry());
    let coordinator = Coordinator::new(
        config,
        Arc::new(client),
        ShutdownSignal::new(),
        Arc::new(NoopReporter),
    );

    let plan = coordinator.plan(&feed(vec![item(&server, "11", None)])).await.unwrap();
    let result = coordinator.download(&plan).await;

    assert_eq!(result.stats.downloaded, 1);
    let file = plan.series_dir.join("description_11_11.m4a");
    assert_eq!(tokio::fs::read(&file).await.unwrap(), AUDIO);
}

#[tokio::test]
async fn test_unresolved_and_failed_items_are_counted() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    // No audio anywhere on this page and no feed enclosure
    Mock::given(method("GET"))
        .and(path("/e/4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><title>Nothing</title></html>"))
        .mount(&server)
        .await;
    mount_page(&server, "5", 5, 1).await;
    Mock::given(method("HEAD"))
        .and(path("/audio/5.m4a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/5.m4a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let feed = feed(vec![item(&server, "4", None), item(&server, "5", None)]);
    let coordinator = coordinator(&root, ShutdownSignal::new());
    let plan = coordinator.plan(&feed).await.unwrap();
    assert_eq!(plan.unresolved, 1);
    assert_eq!(plan.episodes.len(), 1);

    let result = coordinator.download(&plan).await;
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.stats.failed, 1);
    assert_eq!(result.stats.unresolved, 1);
    assert!(!result.is_clean());
}

#[tokio::test]
async fn test_unreachable_page_falls_back_to_feed() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/e/6"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let feed = feed(vec![item(&server, "6", Some(20))]);
    let coordinator = coordinator(&root, ShutdownSignal::new());
    let plan = coordinator.plan(&feed).await.unwrap();

    assert_eq!(plan.feed_fallbacks, 1);
    assert_eq!(plan.episodes.len(), 1);
    assert_eq!(plan.episodes[0].description, "Feed title 6");
    assert!(plan.episodes[0].audio_url.ends_with("/audio/6.m4a"));

    // Degraded results are not written to the cache
    let cache = EpisodeCache::load(&plan.series_dir).await;
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_shutdown_before_download_interrupts() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_page(&server, "7", 7, 1).await;

    let shutdown = ShutdownSignal::new();
    let coordinator = coordinator(&root, shutdown.clone());
    let plan = coordinator
        .plan(&feed(vec![item(&server, "7", None)]))
        .await
        .unwrap();

    shutdown.trigger();
    let result = coordinator.download(&plan).await;
    assert_eq!(result.outcome, RunOutcome::Interrupted);
    assert_eq!(result.stats.processed(), 0);
    assert!(result.completed.is_empty());
    assert_eq!(result.series_dir, plan.series_dir);
}
