use std::{
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use futures::StreamExt;
use reqwest::Client;
use tokio::{
    io::AsyncWriteExt,
    sync::{mpsc, Semaphore},
};
use url::Url;

use crate::{
    error::{KagamiError, KagamiResult},
    registry::DownloadItem,
};

const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Why a single item ended up failed. Wrong-domain items are rejected before
/// any network attempt is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    WrongDomain,
    /// All attempts failed; carries the last error's description.
    Exhausted(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongDomain => write!(f, "wrong domain"),
            Self::Exhausted(error) => write!(f, "{error}"),
        }
    }
}

/// Outcome of one item, reported exactly once per item.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub url: Url,
    pub error: Option<FailureReason>,
}

#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub failed: Vec<DownloadResult>,
}

/// Fetches a resolved item list with bounded concurrency. Each item is
/// assigned to exactly one task; tasks share nothing but the result channel,
/// and a retrying task's backoff sleep never blocks the others.
pub struct ParallelDownloader {
    client: Arc<Client>,
    output_dir: PathBuf,
    concurrency: NonZeroU32,
    permits: Arc<Semaphore>,
    retries: u32,
    allowed_domain: Option<String>,
}

impl ParallelDownloader {
    pub fn new(
        client: Client,
        output_dir: PathBuf,
        concurrency: NonZeroU32,
        retries: u32,
        allowed_domain: Option<String>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(concurrency.get() as usize));

        Self {
            client: Arc::new(client),
            output_dir,
            concurrency,
            permits,
            retries,
            allowed_domain,
        }
    }

    /// Drains the whole item list, never aborting on individual failures, and
    /// reports the aggregate outcome. There is no cancellation path.
    pub async fn download(&self, items: Vec<DownloadItem>) -> KagamiResult<DownloadSummary> {
        log::info!(
            "Start downloading {} file(s) with {} worker(s).",
            items.len(),
            self.concurrency.get()
        );
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let total = items.len();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        for item in items {
            let permit = self.permits.clone().acquire_owned().await.unwrap();
            let client = self.client.clone();
            let dest = self.output_dir.join(&item.relative_path);
            let allowed_domain = self.allowed_domain.clone();
            let retries = self.retries;
            let sender = sender.clone();
            tokio::spawn(async move {
                let result = fetch_item(&client, &item, &dest, retries, allowed_domain.as_deref()).await;
                // The receiver outlives every worker, so this cannot fail.
                let _ = sender.send(result);
                drop(permit);
            });
        }
        drop(sender);

        let mut summary = DownloadSummary::default();
        let mut finished = 0usize;
        while let Some(result) = receiver.recv().await {
            finished += 1;
            match &result.error {
                None => {
                    summary.succeeded += 1;
                    log::info!("Downloaded {} ({finished} / {total})", result.url);
                }
                Some(reason) => {
                    log::error!("Failed {} -> {reason}", result.url);
                    summary.failed.push(result);
                }
            }
        }

        if !summary.failed.is_empty() {
            log::error!("Failed to download {} file(s):", summary.failed.len());
            for result in &summary.failed {
                log::error!("  - {}", result.url);
            }
        }

        Ok(summary)
    }
}

async fn fetch_item(
    client: &Client,
    item: &DownloadItem,
    dest: &Path,
    retries: u32,
    allowed_domain: Option<&str>,
) -> DownloadResult {
    if let Some(domain) = allowed_domain {
        if item.url.host_str() != Some(domain) {
            return DownloadResult {
                url: item.url.clone(),
                error: Some(FailureReason::WrongDomain),
            };
        }
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match fetch_once(client, &item.url, dest).await {
            Ok(()) => {
                return DownloadResult {
                    url: item.url.clone(),
                    error: None,
                }
            }
            Err(error) => {
                if attempt > retries {
                    return DownloadResult {
                        url: item.url.clone(),
                        error: Some(FailureReason::Exhausted(error.to_string())),
                    };
                }
                log::warn!("Retry {attempt}/{retries}: {} ({error})", item.url);
                tokio::time::sleep(backoff(attempt)).await;
            }
        }
    }
}

/// One attempt. The body streams into a sibling `.part` file which is renamed
/// over the destination only once it arrived completely, so an interrupted
/// attempt leaves at most an orphaned temp file and never a truncated final
/// file. The orphan is overwritten by the next attempt.
async fn fetch_once(client: &Client, url: &Url, dest: &Path) -> KagamiResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(KagamiError::HttpError(status));
    }

    let temp_path = part_path(dest);
    let mut file = tokio::fs::File::create(&temp_path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&temp_path, dest).await?;
    Ok(())
}

fn part_path(dest: &Path) -> PathBuf {
    let mut path = dest.as_os_str().to_owned();
    path.push(".part");
    PathBuf::from(path)
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt)).min(MAX_BACKOFF)
}
