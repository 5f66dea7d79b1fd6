pub mod http;
pub mod model;

pub use http::HttpGraphClient;
pub use model::{Friend, Page, PhotoRecord, SocialTag, TagList};

use anyhow::Result;
use async_trait::async_trait;

/// Read access to the social graph. `cursor` is the opaque continuation
/// locator from the previous page's `paging.next`; `None` requests the
/// first page.
#[async_trait]
pub trait GraphClient: Send + Sync {
    async fn photos_page(&self, owner: &str, cursor: Option<&str>) -> Result<Page<PhotoRecord>>;
    async fn friends_page(&self, user: &str, cursor: Option<&str>) -> Result<Page<Friend>>;
}

/// Lazy pull-based iterator over an owner's tagged-photo pages.
///
/// Pagination stays here; fan-out stays in the listing stage. A page error
/// surfaces to the caller and leaves the pager restartable from the failed
/// cursor.
pub struct PhotoPager<'a> {
    client: &'a dyn GraphClient,
    owner: &'a str,
    cursor: Option<String>,
    done: bool,
}

impl<'a> PhotoPager<'a> {
    pub fn new(client: &'a dyn GraphClient, owner: &'a str) -> Self {
        Self { client, owner, cursor: None, done: false }
    }

    /// Next page of photos, or `None` once the graph stops handing out
    /// continuation locators.
    pub async fn next_page(&mut self) -> Result<Option<Vec<PhotoRecord>>> {
        if self.done {
            return Ok(None);
        }
        let page = self.client.photos_page(self.owner, self.cursor.as_deref()).await?;
        match page.paging.and_then(|p| p.next) {
            Some(next) => self.cursor = Some(next),
            None => self.done = true,
        }
        Ok(Some(page.data))
    }
}

/// Same pull-based shape as [`PhotoPager`], over a user's friend list.
pub struct FriendPager<'a> {
    client: &'a dyn GraphClient,
    user: &'a str,
    cursor: Option<String>,
    done: bool,
}

impl<'a> FriendPager<'a> {
    pub fn new(client: &'a dyn GraphClient, user: &'a str) -> Self {
        Self { client, user, cursor: None, done: false }
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<Friend>>> {
        if self.done {
            return Ok(None);
        }
        let page = self.client.friends_page(self.user, self.cursor.as_deref()).await?;
        match page.paging.and_then(|p| p.next) {
            Some(next) => self.cursor = Some(next),
            None => self.done = true,
        }
        Ok(Some(page.data))
    }

    /// Drains every page into one list.
    pub async fn collect_all(mut self) -> Result<Vec<Friend>> {
        let mut out = Vec::new();
        while let Some(batch) = self.next_page().await? {
            out.extend(batch);
        }
        Ok(out)
    }
}
