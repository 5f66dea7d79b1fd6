use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use image::imageops::FilterType;
use tokio::sync::mpsc::Receiver;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::dataset::DatasetRepo;
use crate::engine::FaceEngine;
use crate::graph::model::SocialTag;
use crate::matcher;
use crate::pipeline::{Stage, StageGauges};
use crate::stats::RunStats;

/// A cached `(image, tags)` pair ready for detection. Both paths come out of
/// the download cache, possibly from an earlier, partially-completed run.
#[derive(Clone, Debug)]
pub struct ExtractJob {
    pub user: String,
    pub image: PathBuf,
    pub tags: PathBuf,
}

/// Starts the face-extraction stage: at most `n` concurrent extractions.
/// This stage is the pipeline sink; it writes labeled crops into the dataset
/// and fans out nothing.
#[allow(clippy::too_many_arguments)]
pub fn start_workers(
    n: usize,
    mut rx: Receiver<ExtractJob>,
    engine: Arc<dyn FaceEngine>,
    repo: DatasetRepo,
    tag_tolerance_px: f32,
    min_face_px: u32,
    crop_size: u32,
    gauges: Arc<StageGauges>,
    stats: Arc<RunStats>,
) {
    let permits = Arc::new(Semaphore::new(n));
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else { break };
            let engine = engine.clone();
            let repo = repo.clone();
            let gauges = gauges.clone();
            let stats = stats.clone();
            tokio::spawn(async move {
                extract_one(job, engine, repo, tag_tolerance_px, min_face_px, crop_size, &stats).await;
                gauges.done(Stage::Extract);
                drop(permit);
            });
        }
    });
}

async fn extract_one(
    job: ExtractJob,
    engine: Arc<dyn FaceEngine>,
    repo: DatasetRepo,
    tag_tolerance_px: f32,
    min_face_px: u32,
    crop_size: u32,
    stats: &RunStats,
) {
    // a missing or empty input is leftover from an interrupted run, not an error
    for path in [&job.image, &job.tags] {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => {
                debug!("skipping {}: missing or empty input", path.display());
                return;
            }
        }
    }

    let raw = match tokio::fs::read(&job.tags).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("skipping {}: {e}", job.tags.display());
            return;
        }
    };
    let tags: Vec<SocialTag> = match serde_json::from_slice(&raw) {
        Ok(tags) => tags,
        Err(e) => {
            warn!("malformed tag metadata in {}: {e}", job.tags.display());
            stats.inc_extract_failures();
            return;
        }
    };

    debug!("detecting faces in {}", job.image.display());
    let image_path = job.image.clone();
    let result = tokio::task::spawn_blocking(move || {
        detect_and_store(&job, &*engine, &repo, &tags, tag_tolerance_px, min_face_px, crop_size)
    })
    .await;
    match result {
        Ok(Ok(stored)) => stats.add_faces_extracted(stored),
        Ok(Err(e)) => {
            warn!("face extraction for {} failed: {e:#}", image_path.display());
            stats.inc_extract_failures();
        }
        Err(e) => {
            warn!("face extraction task for {} failed: {e}", image_path.display());
            stats.inc_extract_failures();
        }
    }
}

fn detect_and_store(
    job: &ExtractJob,
    engine: &dyn FaceEngine,
    repo: &DatasetRepo,
    tags: &[SocialTag],
    tag_tolerance_px: f32,
    min_face_px: u32,
    crop_size: u32,
) -> Result<u64> {
    let img = match image::open(&job.image) {
        Ok(img) => img,
        Err(e) => {
            debug!("undecodable image {}: {e}", job.image.display());
            return Ok(0);
        }
    };
    let (img_w, img_h) = (img.width(), img.height());

    let faces = match engine.detect(&img) {
        Ok(faces) => faces,
        Err(e) => {
            debug!("detection failed for {}: {e:#}", job.image.display());
            return Ok(0);
        }
    };

    let mut stored = 0u64;
    for (index, face) in faces.iter().enumerate() {
        // a face nobody tagged is worthless as a training example
        let Some(tag) = matcher::find_tag(tags, face, img_w, img_h, tag_tolerance_px) else {
            continue;
        };
        if face.width <= min_face_px {
            continue;
        }
        let Some(identity) = tag.id.as_deref() else { continue };

        let region = matcher::crop_region(face, img_w, img_h);
        let crop = img
            .crop_imm(region.x, region.y, region.side, region.side)
            .resize_exact(crop_size, crop_size, FilterType::CatmullRom);
        if repo.store_face(&job.user, identity, &crop, &job.image, index, tag)?.is_some() {
            stored += 1;
        }
    }
    Ok(stored)
}
