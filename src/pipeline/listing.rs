use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::graph::{GraphClient, PhotoPager};
use crate::pipeline::download::DownloadJob;
use crate::pipeline::{Stage, StageGauges};
use crate::stats::RunStats;

/// One friend (or the target user themself) whose tagged photos should be
/// listed and fanned out for download.
#[derive(Clone, Debug)]
pub struct ListingJob {
    /// The account whose dataset is being built; scopes all on-disk state.
    pub user: String,
    /// The account whose photo collection is queried.
    pub owner: String,
}

/// Starts the photo-listing stage: a FIFO dispatcher plus at most `n`
/// concurrent listings. Each job pulls every page of the owner's photos,
/// then fans the full list out to the download stage without waiting on it.
pub fn start_workers(
    n: usize,
    mut rx: Receiver<ListingJob>,
    download_tx: Sender<DownloadJob>,
    graph: Arc<dyn GraphClient>,
    gauges: Arc<StageGauges>,
    stats: Arc<RunStats>,
) {
    let permits = Arc::new(Semaphore::new(n));
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else { break };
            let download_tx = download_tx.clone();
            let graph = graph.clone();
            let gauges = gauges.clone();
            let stats = stats.clone();
            tokio::spawn(async move {
                list_one(job, download_tx, &graph, &gauges, &stats).await;
                gauges.done(Stage::Listing);
                drop(permit);
            });
        }
    });
}

async fn list_one(
    job: ListingJob,
    download_tx: Sender<DownloadJob>,
    graph: &Arc<dyn GraphClient>,
    gauges: &StageGauges,
    stats: &RunStats,
) {
    info!("listing photos for {}", job.owner);
    let mut pager = PhotoPager::new(graph.as_ref(), &job.owner);
    let mut photos = Vec::new();
    loop {
        match pager.next_page().await {
            Ok(Some(batch)) => photos.extend(batch),
            Ok(None) => break,
            Err(e) => {
                // whole-friend failure; siblings keep going, no retry
                warn!("photo listing for {} failed: {e:#}", job.owner);
                stats.inc_listing_failures();
                return;
            }
        }
    }
    info!("got {} photos for {}", photos.len(), job.owner);
    stats.inc_friends_listed();
    stats.add_photos_listed(photos.len() as u64);

    for photo in photos {
        gauges.add(Stage::Download);
        let fanned = DownloadJob { user: job.user.clone(), photo };
        if download_tx.send(fanned).await.is_err() {
            gauges.done(Stage::Download);
            warn!("download queue closed; dropping remaining photos for {}", job.owner);
            return;
        }
    }
}
