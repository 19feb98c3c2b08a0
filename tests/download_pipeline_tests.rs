// Offline integration tests for the download pipeline: batch semantics,
// retry exhaustion, sidecar files and the shared cache, exercised through
// the public library surface without any reachable network endpoint.

use aniku_scraper::cache::{keys, ttl, TtlCache};
use aniku_scraper::config::{DownloaderConfig, HttpConfig};
use aniku_scraper::downloader::{DownloadItem, Downloader};
use aniku_scraper::http_client::FetchClient;
use aniku_scraper::models::{DownloadLink, EpisodePage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn downloader(base: &Path) -> Downloader {
    let mut http = HttpConfig::default();
    http.timeout_secs = 5;
    let client = FetchClient::new("Downloader", &http).expect("client creation failed");
    let cfg = DownloaderConfig {
        concurrency: 5,
        max_attempts: 3,
        retry_delay_ms: 10,
    };
    Downloader::new(client, base, &cfg)
}

fn unreachable_items(names: &[&str]) -> Vec<DownloadItem> {
    names
        .iter()
        .map(|n| DownloadItem {
            // Port 1 on loopback refuses connections immediately
            url: format!("http://127.0.0.1:1/{}", n),
            file_name: n.to_string(),
        })
        .collect()
}

#[tokio::test]
async fn test_batch_reports_exact_file_set_on_partial_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("episode-1");
    std::fs::create_dir_all(&dest).unwrap();

    let items = unreachable_items(&["01.jpg", "02.jpg", "03.jpg", "04.jpg", "05.jpg"]);
    for name in ["01.jpg", "02.jpg", "03.jpg"] {
        std::fs::write(dest.join(name), b"previous run").unwrap();
    }

    let outcome = downloader(tmp.path()).download_all(&dest, &items).await;
    assert_eq!(outcome.completed, 3);
    assert_eq!(outcome.failed.len(), 2);
    assert!(!outcome.is_success());

    let on_disk: Vec<String> = std::fs::read_dir(&dest)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(on_disk.len(), 3);
    for name in ["01.jpg", "02.jpg", "03.jpg"] {
        assert!(on_disk.contains(&name.to_string()));
    }
}

#[tokio::test]
async fn test_completed_batch_rerun_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("episode-2");
    std::fs::create_dir_all(&dest).unwrap();

    let items = unreachable_items(&["a.jpg", "b.jpg"]);
    for item in &items {
        std::fs::write(dest.join(&item.file_name), b"done").unwrap();
    }

    let dl = downloader(tmp.path());
    let first = dl.download_all(&dest, &items).await;
    let second = dl.download_all(&dest, &items).await;
    for outcome in [first, second] {
        assert!(outcome.is_success());
        assert_eq!(outcome.completed, items.len());
    }
    // File contents are untouched by the reruns
    assert_eq!(std::fs::read(dest.join("a.jpg")).unwrap(), b"done");
}

#[tokio::test]
async fn test_relative_destination_resolves_under_base_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let dl = downloader(tmp.path());

    let items = unreachable_items(&["x.jpg"]);
    let outcome = dl.download_all(Path::new("Manga/Title/Ch1"), &items).await;
    // The transfer fails, but the nested directory was bootstrapped
    assert_eq!(outcome.failed.len(), 1);
    assert!(tmp.path().join("Manga/Title/Ch1").is_dir());
}

#[tokio::test]
async fn test_episode_sidecar_written_alongside_media() {
    let tmp = tempfile::tempdir().unwrap();
    let dl = downloader(tmp.path());

    let mut page = EpisodePage::default();
    page.download_links.push(DownloadLink {
        server: "Mirror A".to_string(),
        url: "https://dl.example/ep3-480".to_string(),
        quality: Some("480p".to_string()),
    });
    page.download_links.push(DownloadLink {
        server: "Mirror B".to_string(),
        url: "https://dl.example/ep3".to_string(),
        quality: None,
    });

    let path = dl
        .save_episode_info("Frieren", "Episode 3", &page, Some("https://player/ep3"))
        .unwrap();
    assert!(path.starts_with(tmp.path().join("Anime")));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("Title: Frieren"));
    assert!(content.contains("Episode: Episode 3"));
    assert!(content.contains("https://player/ep3"));
    assert!(content.contains("[480p] Mirror A: https://dl.example/ep3-480"));
    assert!(content.contains("[Unknown] Mirror B: https://dl.example/ep3"));
}

#[tokio::test]
async fn test_shared_cache_survives_download_workload() {
    // The cache and the downloader share a runtime in the real application;
    // sweeping must not interfere with an active batch.
    let cache: Arc<TtlCache<Vec<String>>> = Arc::new(TtlCache::new());
    Arc::clone(&cache).start_sweeper(Duration::from_millis(10));
    cache.set(
        &keys::chapter("komiku", "/ch/9"),
        vec!["p1.jpg".to_string()],
        ttl::CHAPTER,
    );

    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("ch9");
    std::fs::create_dir_all(&dest).unwrap();
    let items = unreachable_items(&["p1.jpg"]);
    std::fs::write(dest.join("p1.jpg"), b"cached page").unwrap();

    let outcome = downloader(tmp.path()).download_all(&dest, &items).await;
    assert!(outcome.is_success());
    assert_eq!(
        cache.get(&keys::chapter("komiku", "/ch/9")),
        Some(vec!["p1.jpg".to_string()])
    );
    cache.shutdown();
}
