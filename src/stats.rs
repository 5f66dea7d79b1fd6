use std::sync::atomic::{AtomicU64, Ordering};

/// Per-run counters shared across the stage workers. Failures here are
/// item-local by design: a counter ticks, a warning is logged, and siblings
/// keep flowing.
#[derive(Default)]
pub struct RunStats {
    friends_listed: AtomicU64,
    listing_failures: AtomicU64,
    photos_listed: AtomicU64,
    photos_untagged: AtomicU64,
    downloads_fetched: AtomicU64,
    downloads_cached: AtomicU64,
    download_failures: AtomicU64,
    faces_extracted: AtomicU64,
    extract_failures: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_friends_listed(&self) { self.friends_listed.fetch_add(1, Ordering::Relaxed); }
    pub fn inc_listing_failures(&self) { self.listing_failures.fetch_add(1, Ordering::Relaxed); }
    pub fn add_photos_listed(&self, n: u64) { self.photos_listed.fetch_add(n, Ordering::Relaxed); }
    pub fn inc_photos_untagged(&self) { self.photos_untagged.fetch_add(1, Ordering::Relaxed); }
    pub fn inc_downloads_fetched(&self) { self.downloads_fetched.fetch_add(1, Ordering::Relaxed); }
    pub fn inc_downloads_cached(&self) { self.downloads_cached.fetch_add(1, Ordering::Relaxed); }
    pub fn inc_download_failures(&self) { self.download_failures.fetch_add(1, Ordering::Relaxed); }
    pub fn add_faces_extracted(&self, n: u64) { self.faces_extracted.fetch_add(n, Ordering::Relaxed); }
    pub fn inc_extract_failures(&self) { self.extract_failures.fetch_add(1, Ordering::Relaxed); }

    pub fn snapshot(&self) -> RunReport {
        RunReport {
            friends_listed: self.friends_listed.load(Ordering::Relaxed),
            listing_failures: self.listing_failures.load(Ordering::Relaxed),
            photos_listed: self.photos_listed.load(Ordering::Relaxed),
            photos_untagged: self.photos_untagged.load(Ordering::Relaxed),
            downloads_fetched: self.downloads_fetched.load(Ordering::Relaxed),
            downloads_cached: self.downloads_cached.load(Ordering::Relaxed),
            download_failures: self.download_failures.load(Ordering::Relaxed),
            faces_extracted: self.faces_extracted.load(Ordering::Relaxed),
            extract_failures: self.extract_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RunStats`], returned when a prepare run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub friends_listed: u64,
    pub listing_failures: u64,
    pub photos_listed: u64,
    pub photos_untagged: u64,
    pub downloads_fetched: u64,
    pub downloads_cached: u64,
    pub download_failures: u64,
    pub faces_extracted: u64,
    pub extract_failures: u64,
}
