use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use sha2::{Digest, Sha256};

use crate::engine::RecognizerKind;
use crate::graph::model::SocialTag;

/// Content-addressable download cache: `{root}/{user}/downloads/{sha256(source)}.jpeg`
/// plus a `.tags` sidecar. Image presence on disk is the completion ledger;
/// a present image is never overwritten.
#[derive(Clone, Debug)]
pub struct DownloadCache {
    root: PathBuf,
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub image: PathBuf,
    pub tags: PathBuf,
}

impl DownloadCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn key(source: &str) -> String {
        hex::encode(Sha256::digest(source.as_bytes()))
    }

    pub fn entry(&self, user: &str, source: &str) -> CacheEntry {
        let dir = self.root.join(user).join("downloads");
        let key = Self::key(source);
        CacheEntry {
            image: dir.join(format!("{key}.jpeg")),
            tags: dir.join(format!("{key}.tags")),
        }
    }

    /// Writes the tag sidecar and returns the entry paths. The sidecar is
    /// rewritten on every pass, cache hit or not: re-tagging on the graph
    /// takes effect on re-runs even though the image itself is immutable.
    pub fn store_tags(&self, user: &str, source: &str, tags: &[SocialTag]) -> Result<CacheEntry> {
        let entry = self.entry(user, source);
        if let Some(dir) = entry.tags.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        std::fs::write(&entry.tags, serde_json::to_vec(tags)?)
            .with_context(|| format!("writing {}", entry.tags.display()))?;
        Ok(entry)
    }
}

/// On-disk dataset of labeled face crops and trained artifacts:
/// `{root}/{user}/faces/{identity}/{basename}_{index}.jpeg` with a
/// per-identity `tag.json`, and `{root}/{user}/training/{user}.{kind}.training`.
#[derive(Clone, Debug)]
pub struct DatasetRepo {
    root: PathBuf,
}

impl DatasetRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn faces_dir(&self, user: &str) -> PathBuf {
        self.root.join(user).join("faces")
    }

    pub fn identity_dir(&self, user: &str, identity: &str) -> PathBuf {
        self.faces_dir(user).join(identity)
    }

    pub fn training_dir(&self, user: &str) -> PathBuf {
        self.root.join(user).join("training")
    }

    pub fn artifact_path(&self, user: &str, kind: RecognizerKind) -> PathBuf {
        self.training_dir(user).join(format!("{}.{}.training", user, kind.as_str()))
    }

    /// Persists one normalized crop plus the matched tag's metadata. Returns
    /// `None` without touching the crop when a previous run already produced
    /// it; the dataset accumulates monotonically.
    pub fn store_face(
        &self,
        user: &str,
        identity: &str,
        crop: &DynamicImage,
        source_image: &Path,
        index: usize,
        tag: &SocialTag,
    ) -> Result<Option<PathBuf>> {
        let dir = self.identity_dir(user, identity);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let stem = source_image.file_stem().and_then(|s| s.to_str()).unwrap_or("face");
        let path = dir.join(format!("{stem}_{index}.jpeg"));
        if path.exists() {
            return Ok(None);
        }
        crop.to_rgb8()
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .with_context(|| format!("writing {}", path.display()))?;
        std::fs::write(dir.join("tag.json"), serde_json::to_vec(tag)?)?;
        Ok(Some(path))
    }

    /// Display name recorded for an identity, from its `tag.json`.
    pub fn identity_name(&self, user: &str, identity: &str) -> Option<String> {
        let raw = std::fs::read(self.identity_dir(user, identity).join("tag.json")).ok()?;
        let tag: SocialTag = serde_json::from_slice(&raw).ok()?;
        tag.name
    }

    /// Flat `(identity, crop path)` training set across every identity with
    /// at least `min_examples` stored crops. Deterministic order.
    pub fn training_set(&self, user: &str, min_examples: usize) -> Result<Vec<(String, PathBuf)>> {
        let faces = self.faces_dir(user);
        let mut out = Vec::new();
        let entries = match std::fs::read_dir(&faces) {
            Ok(entries) => entries,
            // nothing harvested yet
            Err(_) => return Ok(out),
        };
        let mut identity_dirs: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        identity_dirs.sort();
        for dir in identity_dirs {
            let identity = match dir.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let mut crops: Vec<PathBuf> = std::fs::read_dir(&dir)
                .with_context(|| format!("reading {}", dir.display()))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map_or(false, |ext| ext == "jpeg"))
                .collect();
            crops.sort();
            if crops.len() >= min_examples {
                out.extend(crops.into_iter().map(|p| (identity.clone(), p)));
            }
        }
        Ok(out)
    }

    pub fn save_artifact(&self, user: &str, kind: RecognizerKind, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.training_dir(user);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = self.artifact_path(user, kind);
        std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_is_stable_and_distinct() {
        let a = DownloadCache::key("http://cdn/a.jpeg");
        assert_eq!(a, DownloadCache::key("http://cdn/a.jpeg"));
        assert_ne!(a, DownloadCache::key("http://cdn/b.jpeg"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_store_tags_rewrites_sidecar() {
        let tmp = TempDir::new().unwrap();
        let cache = DownloadCache::new(tmp.path());
        let first = vec![SocialTag { id: Some("1".into()), name: Some("Ana".into()), x: 1.0, y: 2.0 }];
        let entry = cache.store_tags("u", "http://cdn/a.jpeg", &first).unwrap();
        let second = vec![SocialTag { id: Some("2".into()), name: Some("Bo".into()), x: 3.0, y: 4.0 }];
        cache.store_tags("u", "http://cdn/a.jpeg", &second).unwrap();
        let read: Vec<SocialTag> = serde_json::from_slice(&std::fs::read(&entry.tags).unwrap()).unwrap();
        assert_eq!(read, second);
    }

    #[test]
    fn test_training_set_excludes_singletons() {
        let tmp = TempDir::new().unwrap();
        let repo = DatasetRepo::new(tmp.path());
        let crop = image::DynamicImage::new_rgb8(4, 4);
        let tag = SocialTag { id: Some("10".into()), name: None, x: 0.0, y: 0.0 };
        repo.store_face("u", "10", &crop, Path::new("aaa.jpeg"), 0, &tag).unwrap();
        repo.store_face("u", "10", &crop, Path::new("bbb.jpeg"), 0, &tag).unwrap();
        repo.store_face("u", "11", &crop, Path::new("ccc.jpeg"), 0, &tag).unwrap();

        let set = repo.training_set("u", 2).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|(identity, _)| identity == "10"));

        // the threshold is policy, not a constant
        let set = repo.training_set("u", 1).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_store_face_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let repo = DatasetRepo::new(tmp.path());
        let crop = image::DynamicImage::new_rgb8(4, 4);
        let tag = SocialTag { id: Some("10".into()), name: None, x: 0.0, y: 0.0 };
        let first = repo.store_face("u", "10", &crop, Path::new("aaa.jpeg"), 1, &tag).unwrap();
        assert!(first.is_some());
        let second = repo.store_face("u", "10", &crop, Path::new("aaa.jpeg"), 1, &tag).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_training_set_empty_when_unharvested() {
        let tmp = TempDir::new().unwrap();
        let repo = DatasetRepo::new(tmp.path());
        assert!(repo.training_set("nobody", 2).unwrap().is_empty());
    }

    #[test]
    fn test_identity_name_round_trip() {
        let tmp = TempDir::new().unwrap();
        let repo = DatasetRepo::new(tmp.path());
        let crop = image::DynamicImage::new_rgb8(4, 4);
        let tag = SocialTag { id: Some("10".into()), name: Some("Ana".into()), x: 0.0, y: 0.0 };
        repo.store_face("u", "10", &crop, Path::new("aaa.jpeg"), 0, &tag).unwrap();
        assert_eq!(repo.identity_name("u", "10").as_deref(), Some("Ana"));
        assert!(repo.identity_name("u", "404").is_none());
    }

    #[test]
    fn test_artifact_round_trip() {
        let tmp = TempDir::new().unwrap();
        let repo = DatasetRepo::new(tmp.path());
        let path = repo.save_artifact("u", RecognizerKind::Lbph, b"model-bytes").unwrap();
        assert!(path.to_string_lossy().ends_with("u/training/u.lbphf.training"));
        assert_eq!(std::fs::read(&path).unwrap(), b"model-bytes");
    }
}
