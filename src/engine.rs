use std::path::PathBuf;

use anyhow::Result;
use image::DynamicImage;

/// Pixel-space bounding box for one detected face. Origins can go negative
/// when a detector pads beyond the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedFace {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The appearance-based model families trained and queried side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecognizerKind {
    Eigenfaces,
    Fisherfaces,
    Lbph,
}

impl RecognizerKind {
    pub const ALL: [RecognizerKind; 3] = [
        RecognizerKind::Eigenfaces,
        RecognizerKind::Fisherfaces,
        RecognizerKind::Lbph,
    ];

    /// Artifact file suffix for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognizerKind::Eigenfaces => "eigenfaces",
            RecognizerKind::Fisherfaces => "fisherfaces",
            RecognizerKind::Lbph => "lbphf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recognition {
    pub identity: String,
    pub confidence: f64,
}

/// Face detection and recognition, treated as an opaque collaborator.
///
/// Implementations are CPU-bound and synchronous; callers run them on
/// blocking threads. `predict` returning `None` is the engine's reserved
/// no-match sentinel, not an error.
pub trait FaceEngine: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectedFace>>;

    /// Trains one model of the given kind from `(identity, crop path)` pairs
    /// and returns the artifact bytes to persist.
    fn train(&self, kind: RecognizerKind, samples: &[(String, PathBuf)]) -> Result<Vec<u8>>;

    fn predict(&self, kind: RecognizerKind, artifact: &[u8], face: &DynamicImage) -> Result<Option<Recognition>>;
}
