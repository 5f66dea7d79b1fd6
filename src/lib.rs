pub mod dataset;
pub mod engine;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod pipeline;
pub mod predictor;
pub mod stats;
pub mod trainer;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::dataset::{DatasetRepo, DownloadCache};
use crate::graph::{FriendPager, GraphClient};
use crate::pipeline::download::PhotoFetcher;
use crate::pipeline::listing::ListingJob;
use crate::pipeline::{Stage, StageGauges};

pub use crate::engine::{DetectedFace, FaceEngine, Recognition, RecognizerKind};
pub use crate::error::{Error, Result};
pub use crate::graph::{HttpGraphClient, PhotoRecord, SocialTag};
pub use crate::pipeline::download::HttpFetcher;
pub use crate::predictor::PredictionResult;
pub use crate::stats::{RunReport, RunStats};
pub use crate::utils::config::Config;

/// The harvesting-and-training pipeline for one data root.
///
/// Construction wires up the three stage worker pools (photo listing,
/// download, face extraction), so it must happen inside a tokio runtime.
/// Every external collaborator is injected; there is no global state.
/// Concurrent [`Pipeline::prepare`] runs for the same user are not
/// supported and must be serialized by the caller.
pub struct Pipeline {
    pub config: Config,
    pub queues: pipeline::Queues,
    pub gauges: Arc<StageGauges>,
    pub stats: Arc<RunStats>,
    pub repo: DatasetRepo,
    graph: Arc<dyn GraphClient>,
    engine: Arc<dyn FaceEngine>,
    friends_override: Option<Vec<String>>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        graph: Arc<dyn GraphClient>,
        fetcher: Arc<dyn PhotoFetcher>,
        engine: Arc<dyn FaceEngine>,
    ) -> Self {
        let cache = DownloadCache::new(&config.data_root);
        let repo = DatasetRepo::new(&config.data_root);
        let gauges = Arc::new(StageGauges::default());
        let stats = Arc::new(RunStats::new());

        let (listing_tx, listing_rx) = mpsc::channel(pipeline::LISTING_QUEUE_CAP);
        let (download_tx, download_rx) = mpsc::channel(pipeline::DOWNLOAD_QUEUE_CAP);
        let (extract_tx, extract_rx) = mpsc::channel(pipeline::EXTRACT_QUEUE_CAP);

        pipeline::listing::start_workers(
            config.friend_workers,
            listing_rx,
            download_tx.clone(),
            graph.clone(),
            gauges.clone(),
            stats.clone(),
        );
        pipeline::download::start_workers(
            config.download_workers,
            download_rx,
            extract_tx.clone(),
            fetcher,
            cache,
            gauges.clone(),
            stats.clone(),
        );
        pipeline::extract::start_workers(
            config.extract_workers,
            extract_rx,
            engine.clone(),
            repo.clone(),
            config.tag_tolerance_px,
            config.min_face_px,
            config.crop_size,
            gauges.clone(),
            stats.clone(),
        );

        let queues = pipeline::Queues { listing_tx, download_tx, extract_tx };
        Self {
            config,
            queues,
            gauges,
            stats,
            repo,
            graph,
            engine,
            friends_override: None,
        }
    }

    /// Harvest from this explicit friend set instead of enumerating the
    /// graph's friend list.
    pub fn with_friends(mut self, friends: Vec<String>) -> Self {
        self.friends_override = Some(friends);
        self
    }

    /// Harvests tagged photos for `user` and all their friends, waits for
    /// the pipeline to drain, then trains and persists one model per
    /// recognizer kind. Re-running after a crash or partial failure is safe:
    /// cached downloads and already-extracted faces are skipped.
    pub async fn prepare(&self, user: &str) -> Result<RunReport> {
        info!("preparing face dataset for {user}");
        self.submit_listing(user, user).await;

        let friends = match &self.friends_override {
            Some(friends) => friends.clone(),
            None => FriendPager::new(self.graph.as_ref(), user)
                .collect_all()
                .await
                .map_err(|e| Error::Graph(format!("{e:#}")))?
                .into_iter()
                .map(|f| f.id)
                .collect(),
        };
        for friend in &friends {
            if friend != user {
                self.submit_listing(user, friend).await;
            }
        }

        self.gauges.join().await;
        info!("pipeline drained for {user}; starting training");
        trainer::train(&self.repo, self.engine.clone(), user, self.config.min_examples_per_identity).await?;
        Ok(self.stats.snapshot())
    }

    /// Runs detection and per-model recognition over a query image using the
    /// artifacts of a previous [`Pipeline::prepare`] run. Fails only when no
    /// trained artifacts exist for `user`.
    pub async fn predict(&self, user: &str, image_path: &Path) -> Result<Vec<PredictionResult>> {
        predictor::predict(
            &self.repo,
            self.engine.clone(),
            user,
            image_path,
            self.config.min_face_px,
            self.config.crop_size,
        )
        .await
    }

    async fn submit_listing(&self, user: &str, owner: &str) {
        self.gauges.add(Stage::Listing);
        let job = ListingJob { user: user.to_string(), owner: owner.to_string() };
        if self.queues.listing_tx.send(job).await.is_err() {
            self.gauges.done(Stage::Listing);
            tracing::warn!("listing queue closed; cannot submit {owner}");
        }
    }
}
