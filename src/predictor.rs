use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use image::imageops::FilterType;
use tracing::debug;

use crate::dataset::DatasetRepo;
use crate::engine::{DetectedFace, FaceEngine, RecognizerKind};
use crate::error::{Error, Result};
use crate::matcher;

/// One recognized face in a query image.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub identity: String,
    /// Display name recorded when the identity was harvested, if any.
    pub name: Option<String>,
    /// Engine-reported confidence for this model's match.
    pub confidence: f64,
    pub face: DetectedFace,
}

/// Detects faces in `image_path` and runs every trained model over each one.
///
/// Missing artifacts are fatal; everything after that degrades to an empty
/// result list: unreadable image, no detections, every detection undersized,
/// or every model reporting its no-match sentinel.
pub async fn predict(
    repo: &DatasetRepo,
    engine: Arc<dyn FaceEngine>,
    user: &str,
    image_path: &Path,
    min_face_px: u32,
    crop_size: u32,
) -> Result<Vec<PredictionResult>> {
    let repo = repo.clone();
    let user = user.to_string();
    let image_path = image_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        predict_blocking(&repo, &*engine, &user, &image_path, min_face_px, crop_size)
    })
    .await
    .map_err(|e| anyhow!("predict task failed: {e}"))?
}

fn predict_blocking(
    repo: &DatasetRepo,
    engine: &dyn FaceEngine,
    user: &str,
    image_path: &Path,
    min_face_px: u32,
    crop_size: u32,
) -> Result<Vec<PredictionResult>> {
    let mut models = Vec::with_capacity(RecognizerKind::ALL.len());
    for kind in RecognizerKind::ALL {
        let path = repo.artifact_path(user, kind);
        let bytes = std::fs::read(&path)
            .map_err(|_| Error::ModelsMissing { user: user.to_string(), path: path.clone() })?;
        models.push((kind, bytes));
    }

    let img = match image::open(image_path) {
        Ok(img) => img,
        Err(e) => {
            debug!("unreadable query image {}: {e}", image_path.display());
            return Ok(Vec::new());
        }
    };
    let (img_w, img_h) = (img.width(), img.height());

    let faces = match engine.detect(&img) {
        Ok(faces) => faces,
        Err(e) => {
            debug!("detection failed for {}: {e:#}", image_path.display());
            return Ok(Vec::new());
        }
    };

    let mut out = Vec::new();
    for face in faces {
        if face.width <= min_face_px {
            continue;
        }
        let region = matcher::crop_region(&face, img_w, img_h);
        let crop = img
            .crop_imm(region.x, region.y, region.side, region.side)
            .resize_exact(crop_size, crop_size, FilterType::CatmullRom);
        for (kind, artifact) in &models {
            match engine.predict(*kind, artifact, &crop) {
                Ok(Some(recognition)) => {
                    let name = repo.identity_name(user, &recognition.identity);
                    out.push(PredictionResult {
                        identity: recognition.identity,
                        name,
                        confidence: recognition.confidence,
                        face,
                    });
                }
                Ok(None) => {}
                Err(e) => debug!("{} predict failed: {e:#}", kind.as_str()),
            }
        }
    }
    out.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    Ok(out)
}
