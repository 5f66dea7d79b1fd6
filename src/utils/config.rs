use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    /// Root under which per-user downloads/, faces/ and training/ live.
    pub data_root: PathBuf,
    pub graph_url: String,
    pub access_token: Option<String>,
    pub friend_workers: usize,
    pub download_workers: usize,
    pub extract_workers: usize,
    /// Pixels added on every side of a detection box before testing tag anchors.
    pub tag_tolerance_px: f32,
    /// Detections at or below this width are too unreliable to label.
    pub min_face_px: u32,
    /// Side of the square, size-normalized face crop.
    pub crop_size: u32,
    /// Identities with fewer stored crops than this are excluded from training.
    pub min_examples_per_identity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./data"),
            graph_url: "https://graph.facebook.com".to_string(),
            access_token: None,
            friend_workers: 3,
            download_workers: 25,
            extract_workers: 25,
            tag_tolerance_px: 5.0,
            min_face_px: 100,
            crop_size: 100,
            min_examples_per_identity: 2,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let data_root = env::var("FACEHARVEST_DATA").map(PathBuf::from).unwrap_or(defaults.data_root);
        let graph_url = env::var("FACEHARVEST_GRAPH_URL").unwrap_or(defaults.graph_url);
        let access_token = env::var("FACEHARVEST_ACCESS_TOKEN").ok();
        let friend_workers = env::var("FACEHARVEST_FRIEND_WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.friend_workers);
        let download_workers = env::var("FACEHARVEST_DOWNLOAD_WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.download_workers);
        let extract_workers = env::var("FACEHARVEST_EXTRACT_WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.extract_workers);
        let tag_tolerance_px = env::var("FACEHARVEST_TAG_TOLERANCE").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.tag_tolerance_px);
        let min_face_px = env::var("FACEHARVEST_MIN_FACE_PX").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.min_face_px);
        let crop_size = env::var("FACEHARVEST_CROP_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.crop_size);
        let min_examples_per_identity = env::var("FACEHARVEST_MIN_EXAMPLES").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.min_examples_per_identity);
        Self {
            data_root,
            graph_url,
            access_token,
            friend_workers,
            download_workers,
            extract_workers,
            tag_tolerance_px,
            min_face_px,
            crop_size,
            min_examples_per_identity,
        }
    }
}
