use std::sync::Arc;

use anyhow::anyhow;
use tracing::{info, warn};

use crate::dataset::DatasetRepo;
use crate::engine::{FaceEngine, RecognizerKind};
use crate::error::Result;

/// Trains one model per recognizer kind from every identity that has
/// accumulated at least `min_examples` crops, and persists the artifacts.
/// Each run regenerates the artifacts from the full dataset; nothing is
/// updated incrementally.
pub async fn train(
    repo: &DatasetRepo,
    engine: Arc<dyn FaceEngine>,
    user: &str,
    min_examples: usize,
) -> Result<()> {
    let samples = repo.training_set(user, min_examples)?;
    if samples.is_empty() {
        warn!("no identity has {min_examples} or more faces for {user}; skipping training");
        return Ok(());
    }
    info!("training {user} on {} samples", samples.len());

    for kind in RecognizerKind::ALL {
        let engine = engine.clone();
        let samples = samples.clone();
        let artifact = tokio::task::spawn_blocking(move || engine.train(kind, &samples))
            .await
            .map_err(|e| anyhow!("training task for {} failed: {e}", kind.as_str()))??;
        let path = repo.save_artifact(user, kind, &artifact)?;
        info!("trained {} model for {user}: {}", kind.as_str(), path.display());
    }
    Ok(())
}
