pub mod download;
pub mod extract;
pub mod listing;

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc::Sender;
use tokio::sync::Notify;

pub const LISTING_QUEUE_CAP: usize = 1_024;
pub const DOWNLOAD_QUEUE_CAP: usize = 16_384;
pub const EXTRACT_QUEUE_CAP: usize = 16_384;

#[derive(Clone)]
pub struct Queues {
    pub listing_tx: Sender<listing::ListingJob>,
    pub download_tx: Sender<download::DownloadJob>,
    pub extract_tx: Sender<extract::ExtractJob>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Listing,
    Download,
    Extract,
}

pub struct StageDepths {
    pub listing: usize,
    pub download: usize,
    pub extract: usize,
}

/// Outstanding-work counters, one per stage, counting queued plus in-flight
/// items. Submitters call [`StageGauges::add`] before sending; a worker that
/// fans out calls `add` on the downstream stage before calling
/// [`StageGauges::done`] on its own, so an all-zero read can only be observed
/// at true quiescence. [`StageGauges::join`] is the completion barrier.
#[derive(Default)]
pub struct StageGauges {
    listing: AtomicUsize,
    download: AtomicUsize,
    extract: AtomicUsize,
    drained: Notify,
}

impl StageGauges {
    fn counter(&self, stage: Stage) -> &AtomicUsize {
        match stage {
            Stage::Listing => &self.listing,
            Stage::Download => &self.download,
            Stage::Extract => &self.extract,
        }
    }

    pub fn add(&self, stage: Stage) {
        self.counter(stage).fetch_add(1, Ordering::SeqCst);
    }

    pub fn done(&self, stage: Stage) {
        self.counter(stage).fetch_sub(1, Ordering::SeqCst);
        if self.outstanding() == 0 {
            self.drained.notify_waiters();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.listing.load(Ordering::SeqCst)
            + self.download.load(Ordering::SeqCst)
            + self.extract.load(Ordering::SeqCst)
    }

    pub fn depths(&self) -> StageDepths {
        StageDepths {
            listing: self.listing.load(Ordering::SeqCst),
            download: self.download.load(Ordering::SeqCst),
            extract: self.extract.load(Ordering::SeqCst),
        }
    }

    /// Resolves once every stage is simultaneously empty and idle.
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}
