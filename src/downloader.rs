//! Bounded-concurrency batch downloads with per-item retry and
//! partial-failure aggregation.

use crate::config::DownloaderConfig;
use crate::error::ScrapeError;
use crate::http_client::FetchClient;
use crate::models::EpisodePage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

/// One file to fetch and persist.
#[derive(Debug, Clone)]
pub struct DownloadItem {
    pub url: String,
    pub file_name: String,
}

/// An item that exhausted its attempts.
#[derive(Debug, Clone)]
pub struct FailedItem {
    pub url: String,
    pub file_name: String,
    pub error: String,
}

/// Aggregate result of a batch. `completed` counts successfully-written
/// (or already-present) files regardless of how the batch ended.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub completed: usize,
    pub failed: Vec<FailedItem>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered argument templates for handing a URL to an external download
/// manager; `{url}` is substituted. Tried in sequence until one process
/// starts (CLI conventions differ between manager versions).
const INVOCATION_TEMPLATES: &[&[&str]] = &[&["--url", "{url}"], &["{url}"]];

pub struct Downloader {
    client: Arc<FetchClient>,
    base_dir: PathBuf,
    concurrency: usize,
    max_attempts: usize,
    retry_delay: Duration,
}

impl Downloader {
    pub fn new(client: FetchClient, base_dir: impl Into<PathBuf>, cfg: &DownloaderConfig) -> Self {
        Self {
            client: Arc::new(client),
            base_dir: base_dir.into(),
            concurrency: cfg.concurrency.max(1),
            max_attempts: cfg.max_attempts.max(1),
            retry_delay: Duration::from_millis(cfg.retry_delay_ms),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Download every item into `dest_dir` (relative paths resolve under the
    /// downloader's base directory).
    ///
    /// One task per item, capped by a counting semaphore. An item whose
    /// destination file already exists is complete without a network call.
    /// A permanently failing item is recorded and never blocks or cancels
    /// its siblings; the orchestrator waits on every task before reporting.
    pub async fn download_all(&self, dest_dir: &Path, items: &[DownloadItem]) -> BatchOutcome {
        let dest = if dest_dir.is_absolute() {
            dest_dir.to_path_buf()
        } else {
            self.base_dir.join(dest_dir)
        };
        if let Err(e) = std::fs::create_dir_all(&dest) {
            log::error!("cannot create {}: {}", dest.display(), e);
            return BatchOutcome {
                completed: 0,
                failed: items
                    .iter()
                    .map(|item| FailedItem {
                        url: item.url.clone(),
                        file_name: item.file_name.clone(),
                        error: e.to_string(),
                    })
                    .collect(),
            };
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(items.len());

        for item in items.iter().cloned() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let path = dest.join(&item.file_name);
            let max_attempts = self.max_attempts;
            let retry_delay = self.retry_delay;

            let identity = (item.url.clone(), item.file_name.clone());
            let handle = tokio::spawn(async move {
                // Closing the semaphore is not part of this workflow
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                match transfer(&client, &item.url, &path, max_attempts, retry_delay).await {
                    Ok(()) => Ok(()),
                    Err(e) => Err(FailedItem {
                        url: item.url,
                        file_name: item.file_name,
                        error: e.to_string(),
                    }),
                }
            });
            handles.push((identity, handle));
        }

        // Every submitted item lands in exactly one bucket, a panicked
        // task included
        let mut outcome = BatchOutcome::default();
        for ((url, file_name), handle) in handles {
            match handle.await {
                Ok(Ok(())) => outcome.completed += 1,
                Ok(Err(failed)) => {
                    log::warn!("download failed for {}: {}", failed.url, failed.error);
                    outcome.failed.push(failed);
                }
                Err(join_err) => {
                    log::error!("download task for {} panicked: {}", url, join_err);
                    outcome.failed.push(FailedItem {
                        url,
                        file_name,
                        error: format!("download task aborted: {}", join_err),
                    });
                }
            }
        }

        log::info!(
            "batch finished: {} completed, {} failed",
            outcome.completed,
            outcome.failed.len()
        );
        outcome
    }

    /// Write the plain-text companion file next to an episode's media:
    /// title, episode label, timestamp, resolved stream URL (or an explicit
    /// not-found note) and the enumerated download links.
    pub fn save_episode_info(
        &self,
        series_title: &str,
        episode_title: &str,
        page: &EpisodePage,
        stream_url: Option<&str>,
    ) -> Result<PathBuf, std::io::Error> {
        let dir = self
            .base_dir
            .join("Anime")
            .join(sanitize_filename(series_title))
            .join(sanitize_filename(episode_title));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("info.txt");

        let mut out = String::new();
        out.push_str(&format!("Title: {}\n", series_title));
        out.push_str(&format!("Episode: {}\n", episode_title));
        out.push_str(&format!("Date: {}\n", chrono::Utc::now().to_rfc2822()));
        out.push_str("\n--- STREAM URL ---\n");
        match stream_url {
            Some(url) => {
                out.push_str(&format!("{}\n", url));
                out.push_str("(Use this URL in IDM, XDM, or VLC to play/download)\n");
            }
            None => out.push_str("No direct stream URL found.\n"),
        }
        out.push_str("\n--- DOWNLOAD LINKS ---\n");
        if page.download_links.is_empty() {
            out.push_str("No direct download links parsed found on page.\n");
        } else {
            for link in &page.download_links {
                out.push_str(&format!(
                    "[{}] {}: {}\n",
                    link.quality.as_deref().unwrap_or("Unknown"),
                    link.server,
                    link.url
                ));
            }
        }

        std::fs::write(&path, out)?;
        log::info!("episode info saved to {}", path.display());
        Ok(path)
    }

    /// Hand a URL to an external download manager, trying each invocation
    /// template in order until one process starts.
    pub async fn launch_external(&self, program: &Path, url: &str) -> Result<(), std::io::Error> {
        if !program.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("external downloader not found at: {}", program.display()),
            ));
        }

        let mut last_err = None;
        for template in INVOCATION_TEMPLATES {
            let args: Vec<String> = template.iter().map(|a| a.replace("{url}", url)).collect();
            match tokio::process::Command::new(program).args(&args).spawn() {
                Ok(_child) => {
                    log::info!("launched {} {}", program.display(), args.join(" "));
                    return Ok(());
                }
                Err(e) => {
                    log::warn!(
                        "failed to start {} with args {:?}: {}",
                        program.display(),
                        args,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| std::io::Error::other("no invocation template")))
    }
}

/// Fetch one URL to one path, retrying up to `max_attempts` with a fixed
/// delay. An already-present destination file is success without I/O.
async fn transfer(
    client: &FetchClient,
    url: &str,
    path: &Path,
    max_attempts: usize,
    retry_delay: Duration,
) -> Result<(), ScrapeError> {
    if path.exists() {
        log::debug!("skipping existing file {}", path.display());
        return Ok(());
    }

    let mut last_err = None;
    for attempt in 1..=max_attempts {
        match try_transfer(client, url, path).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                log::debug!("attempt {}/{} failed for {}: {}", attempt, max_attempts, url, e);
                last_err = Some(e);
                if attempt < max_attempts {
                    sleep(retry_delay).await;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt ran"))
}

async fn try_transfer(client: &FetchClient, url: &str, path: &Path) -> Result<(), ScrapeError> {
    let response = client.get(url).await?;
    let bytes = response.bytes().await.map_err(ScrapeError::from_reqwest)?;
    tokio::fs::write(path, &bytes).await?;
    Ok(())
}

/// Encode a title into a safe file/directory name.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            '/' | '\\' | ':' => Some('-'),
            '*' | '?' | '"' | '<' | '>' | '|' => None,
            other => Some(other),
        })
        .collect::<String>()
        .trim()
        .to_string()
}
