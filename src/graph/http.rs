use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::graph::model::{Friend, Page, PhotoRecord};
use crate::graph::GraphClient;
use crate::utils::config::Config;

/// Graph API client over HTTP. Page continuation uses the full `paging.next`
/// URL the graph hands back, so only the first request of a collection is
/// built from `base_url`.
pub struct HttpGraphClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpGraphClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to create graph HTTP client")?;
        Ok(Self { client, base_url: base_url.into(), access_token })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.graph_url.clone(), cfg.access_token.clone())
    }

    async fn get_page<T: DeserializeOwned>(&self, first_url: String, cursor: Option<&str>) -> Result<Page<T>> {
        let url = cursor.map(str::to_string).unwrap_or(first_url);
        let mut req = self.client.get(&url);
        if let Some(token) = &self.access_token {
            req = req.query(&[("access_token", token.as_str())]);
        }
        let resp = req.send().await.with_context(|| format!("graph request to {} failed", url))?;
        if !resp.status().is_success() {
            anyhow::bail!("graph request to {} failed: HTTP {}", url, resp.status());
        }
        resp.json::<Page<T>>().await.with_context(|| format!("malformed graph response from {}", url))
    }
}

#[async_trait]
impl GraphClient for HttpGraphClient {
    async fn photos_page(&self, owner: &str, cursor: Option<&str>) -> Result<Page<PhotoRecord>> {
        let first = format!("{}/{}/photos?fields=source,tags", self.base_url, owner);
        self.get_page(first, cursor).await
    }

    async fn friends_page(&self, user: &str, cursor: Option<&str>) -> Result<Page<Friend>> {
        let first = format!("{}/{}/friends", self.base_url, user);
        self.get_page(first, cursor).await
    }
}
