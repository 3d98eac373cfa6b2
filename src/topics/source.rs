// src/topics/source.rs
//! Data endpoint adapters. The store only sees [`TopicSource`].

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::topics::error::FetchError;
use crate::topics::types::TopicsResponse;

/// A single read of the topics document. Implementations make exactly one
/// attempt per call; retries are the caller's business.
#[async_trait]
pub trait TopicSource: Send + Sync {
    /// `force_refresh` asks the transport to bypass any cache of its own.
    async fn fetch(&self, force_refresh: bool) -> Result<TopicsResponse, FetchError>;
    fn name(&self) -> &'static str;
}

/// Reads `latest.json` over HTTP.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    /// Client with the configured timeouts and a crate user agent.
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .user_agent(concat!("topic-dashboard/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .with_context(|| format!("building HTTP client for {url}"))?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl TopicSource for HttpSource {
    async fn fetch(&self, force_refresh: bool) -> Result<TopicsResponse, FetchError> {
        let mut req = self.client.get(&self.url);
        if force_refresh {
            // Defeat intermediate caches: headers for well-behaved proxies,
            // a throwaway query param for the rest.
            let bust = chrono::Utc::now().timestamp_millis().to_string();
            req = req
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .header(reqwest::header::PRAGMA, "no-cache")
                .query(&[("_t", bust.as_str())]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::transport(&self.url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::transport(&self.url, e))?;
        TopicsResponse::from_json_slice(&body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Reads the topics document from the local filesystem.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TopicSource for FileSource {
    async fn fetch(&self, _force_refresh: bool) -> Result<TopicsResponse, FetchError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| FetchError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        TopicsResponse::from_json_slice(&bytes)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
