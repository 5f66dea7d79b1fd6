use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::dataset::{CacheEntry, DownloadCache};
use crate::graph::model::PhotoRecord;
use crate::pipeline::extract::ExtractJob;
use crate::pipeline::{Stage, StageGauges};
use crate::stats::RunStats;

#[derive(Clone, Debug)]
pub struct DownloadJob {
    pub user: String,
    pub photo: PhotoRecord,
}

/// Transport for fetching a photo's bytes to disk. Injected so tests run
/// without a network.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    async fn fetch(&self, source: &str, dest: &Path) -> Result<()>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to create download HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PhotoFetcher for HttpFetcher {
    async fn fetch(&self, source: &str, dest: &Path) -> Result<()> {
        let resp = self.client.get(source).send().await
            .with_context(|| format!("request to {} failed", source))?;
        if !resp.status().is_success() {
            anyhow::bail!("download of {} failed: HTTP {}", source, resp.status());
        }
        let mut stream = resp.bytes_stream();
        let mut file = tokio::fs::File::create(dest).await
            .with_context(|| format!("creating {}", dest.display()))?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("stream from {} broke", source))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// Starts the download stage: at most `n` transfers in flight. Tagless
/// photos are rejected up front; everything else lands in the
/// content-addressable cache and is handed to the extraction stage whether
/// it was freshly fetched or already on disk.
#[allow(clippy::too_many_arguments)]
pub fn start_workers(
    n: usize,
    mut rx: Receiver<DownloadJob>,
    extract_tx: Sender<ExtractJob>,
    fetcher: Arc<dyn PhotoFetcher>,
    cache: DownloadCache,
    gauges: Arc<StageGauges>,
    stats: Arc<RunStats>,
) {
    let permits = Arc::new(Semaphore::new(n));
    let in_flight: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else { break };
            let extract_tx = extract_tx.clone();
            let fetcher = fetcher.clone();
            let cache = cache.clone();
            let in_flight = in_flight.clone();
            let gauges = gauges.clone();
            let stats = stats.clone();
            tokio::spawn(async move {
                download_one(job, extract_tx, &*fetcher, &cache, &in_flight, &gauges, &stats).await;
                gauges.done(Stage::Download);
                drop(permit);
            });
        }
    });
}

async fn download_one(
    job: DownloadJob,
    extract_tx: Sender<ExtractJob>,
    fetcher: &dyn PhotoFetcher,
    cache: &DownloadCache,
    in_flight: &Mutex<HashSet<String>>,
    gauges: &StageGauges,
    stats: &RunStats,
) {
    // untagged photos carry no training value and never touch the cache
    let tags = match &job.photo.tags {
        Some(list) if !list.data.is_empty() => list.data.clone(),
        _ => {
            debug!("skipping untagged photo {}", job.photo.source);
            stats.inc_photos_untagged();
            return;
        }
    };

    // sidecar first, unconditionally, so re-tagging propagates on re-runs
    let entry = match cache.store_tags(&job.user, &job.photo.source, &tags) {
        Ok(entry) => entry,
        Err(e) => {
            warn!("storing tags for {} failed: {e:#}", job.photo.source);
            stats.inc_download_failures();
            return;
        }
    };

    if entry.image.exists() {
        debug!("skipping cached {}", job.photo.source);
        stats.inc_downloads_cached();
    } else {
        // at most one streaming transfer per cache key: a concurrent
        // duplicate would interleave chunks into the same .part file and
        // persist a corrupted image that never gets overwritten
        let key = DownloadCache::key(&job.photo.source);
        if !in_flight.lock().insert(key.clone()) {
            debug!("transfer of {} already in flight", job.photo.source);
            return;
        }
        // a sibling may have finished between the exists check and the claim
        let fetched = if entry.image.exists() {
            stats.inc_downloads_cached();
            true
        } else {
            fetch_into_cache(&job.photo.source, fetcher, &entry, stats).await
        };
        in_flight.lock().remove(&key);
        if !fetched {
            return;
        }
    }

    gauges.add(Stage::Extract);
    let fanned = ExtractJob { user: job.user, image: entry.image, tags: entry.tags };
    if extract_tx.send(fanned).await.is_err() {
        gauges.done(Stage::Extract);
        warn!("extract queue closed; dropping {}", job.photo.source);
    }
}

/// Streams the photo to a temp path and renames it into place, so a present
/// image file always means a completed transfer. Returns whether the entry's
/// image is now on disk.
async fn fetch_into_cache(
    source: &str,
    fetcher: &dyn PhotoFetcher,
    entry: &CacheEntry,
    stats: &RunStats,
) -> bool {
    let part = part_path(&entry.image);
    match fetcher.fetch(source, &part).await {
        Ok(()) => {
            if let Err(e) = tokio::fs::rename(&part, &entry.image).await {
                warn!("finalizing {} failed: {e}", entry.image.display());
                let _ = tokio::fs::remove_file(&part).await;
                stats.inc_download_failures();
                return false;
            }
            info!("downloaded {}", source);
            stats.inc_downloads_fetched();
            true
        }
        Err(e) => {
            warn!("download of {} failed: {e:#}", source);
            let _ = tokio::fs::remove_file(&part).await;
            stats.inc_download_failures();
            false
        }
    }
}

fn part_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
