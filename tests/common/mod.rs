#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use faceharvest::dataset::DatasetRepo;
use faceharvest::graph::model::{Friend, Page, Paging, PhotoRecord, SocialTag, TagList};
use faceharvest::graph::GraphClient;
use faceharvest::pipeline::download::PhotoFetcher;
use faceharvest::{Config, DetectedFace, FaceEngine, Pipeline, Recognition, RecognizerKind};

/// Minimal valid JPEG (100x100, gray) for download fixtures.
pub fn jpeg_bytes() -> Vec<u8> {
    use base64::{engine::general_purpose, Engine as _};
    general_purpose::STANDARD.decode("/9j/4AAQSkZJRgABAQAAAQABAAD/2wBDAP//////////////////////////////////////////////////////////////////////////////////////2wBDAf//////////////////////////////////////////////////////////////////////////////////////wAARCABkAGQDAREAAhEBAxEB/8QAFQABAQAAAAAAAAAAAAAAAAAAAAb/xAAUEAEAAAAAAAAAAAAAAAAAAAAA/8QAFQEBAQAAAAAAAAAAAAAAAAAAAgP/xAAUEQEAAAAAAAAAAAAAAAAAAAAA/9oADAMBAAIRAxEAPwB3AAAAAP/Z").unwrap()
}

pub fn tagged(source: &str, identity: &str, name: &str) -> PhotoRecord {
    PhotoRecord {
        source: source.to_string(),
        tags: Some(TagList {
            data: vec![SocialTag {
                id: Some(identity.to_string()),
                name: Some(name.to_string()),
                x: 10.0,
                y: 10.0,
            }],
        }),
    }
}

pub fn untagged(source: &str) -> PhotoRecord {
    PhotoRecord { source: source.to_string(), tags: None }
}

/// Graph double serving photo pages from memory. Owners in `failing` error
/// out on their first photos page; `friends_outage` makes the friend list
/// itself unreachable.
#[derive(Default)]
pub struct MockGraph {
    pub photos: HashMap<String, Vec<Vec<PhotoRecord>>>,
    pub friends: Vec<String>,
    pub failing: HashSet<String>,
    pub friends_outage: bool,
}

impl MockGraph {
    pub fn with_photos(mut self, owner: &str, pages: Vec<Vec<PhotoRecord>>) -> Self {
        self.photos.insert(owner.to_string(), pages);
        self
    }

    pub fn with_friends(mut self, friends: &[&str]) -> Self {
        self.friends = friends.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_failing(mut self, owner: &str) -> Self {
        self.failing.insert(owner.to_string());
        self
    }

    pub fn with_friends_outage(mut self) -> Self {
        self.friends_outage = true;
        self
    }
}

#[async_trait]
impl GraphClient for MockGraph {
    async fn photos_page(&self, owner: &str, cursor: Option<&str>) -> anyhow::Result<Page<PhotoRecord>> {
        if self.failing.contains(owner) {
            anyhow::bail!("simulated graph outage for {owner}");
        }
        let pages = match self.photos.get(owner) {
            Some(pages) => pages,
            None => return Ok(Page { data: Vec::new(), paging: None }),
        };
        let idx: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let next = if idx + 1 < pages.len() { Some((idx + 1).to_string()) } else { None };
        Ok(Page {
            data: pages[idx].clone(),
            paging: next.map(|n| Paging { next: Some(n) }),
        })
    }

    async fn friends_page(&self, _user: &str, _cursor: Option<&str>) -> anyhow::Result<Page<Friend>> {
        if self.friends_outage {
            anyhow::bail!("simulated friend list outage");
        }
        let data = self.friends.iter().map(|id| Friend { id: id.clone() }).collect();
        Ok(Page { data, paging: None })
    }
}

/// Fetcher double writing fixture JPEG bytes instead of hitting a network.
pub struct MockFetcher {
    pub fetches: AtomicU64,
    pub delay_ms: u64,
}

impl MockFetcher {
    pub fn new(delay_ms: u64) -> Self {
        Self { fetches: AtomicU64::new(0), delay_ms }
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoFetcher for MockFetcher {
    async fn fetch(&self, _source: &str, dest: &Path) -> anyhow::Result<()> {
        if self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(dest, jpeg_bytes()).await?;
        Ok(())
    }
}

/// Engine double: fixed detections, recorded training calls, per-kind canned
/// predictions (`None` = the engine's no-match sentinel).
#[derive(Default)]
pub struct MockEngine {
    pub faces: Vec<DetectedFace>,
    pub detect_calls: AtomicU64,
    pub trained_kinds: Mutex<Vec<RecognizerKind>>,
    pub last_training_set: Mutex<Vec<(String, PathBuf)>>,
    pub predictions: Mutex<HashMap<RecognizerKind, Recognition>>,
}

impl MockEngine {
    pub fn with_faces(mut self, faces: Vec<DetectedFace>) -> Self {
        self.faces = faces;
        self
    }

    pub fn with_prediction(self, kind: RecognizerKind, identity: &str, confidence: f64) -> Self {
        self.predictions.lock().insert(
            kind,
            Recognition { identity: identity.to_string(), confidence },
        );
        self
    }

    pub fn detect_count(&self) -> u64 {
        self.detect_calls.load(Ordering::SeqCst)
    }
}

impl FaceEngine for MockEngine {
    fn detect(&self, _image: &image::DynamicImage) -> anyhow::Result<Vec<DetectedFace>> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.faces.clone())
    }

    fn train(&self, kind: RecognizerKind, samples: &[(String, PathBuf)]) -> anyhow::Result<Vec<u8>> {
        self.trained_kinds.lock().push(kind);
        *self.last_training_set.lock() = samples.to_vec();
        Ok(format!("artifact-{}", kind.as_str()).into_bytes())
    }

    fn predict(
        &self,
        kind: RecognizerKind,
        _artifact: &[u8],
        _face: &image::DynamicImage,
    ) -> anyhow::Result<Option<Recognition>> {
        Ok(self.predictions.lock().get(&kind).cloned())
    }
}

/// A detection pair straddling the size threshold: on a tagged photo only
/// the 101-wide box survives the filter, so each photo yields one crop.
pub fn boundary_faces() -> Vec<DetectedFace> {
    vec![
        DetectedFace { x: 0, y: 0, width: 99, height: 99 },
        DetectedFace { x: 0, y: 0, width: 101, height: 101 },
    ]
}

pub fn test_config(data_root: &Path) -> Config {
    Config {
        data_root: data_root.to_path_buf(),
        download_workers: 8,
        extract_workers: 8,
        crop_size: 32,
        ..Config::default()
    }
}

pub fn build_pipeline(
    data_root: &Path,
    graph: MockGraph,
    fetcher: Arc<MockFetcher>,
    engine: Arc<MockEngine>,
) -> Pipeline {
    Pipeline::new(test_config(data_root), Arc::new(graph), fetcher, engine)
}

pub fn count_files_under(dir: &Path, ext: &str) -> usize {
    let mut count = 0;
    let Ok(entries) = std::fs::read_dir(dir) else { return 0 };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            count += count_files_under(&path, ext);
        } else if path.extension().map_or(false, |e| e == ext) {
            count += 1;
        }
    }
    count
}

pub fn repo(data_root: &Path) -> DatasetRepo {
    DatasetRepo::new(data_root)
}
