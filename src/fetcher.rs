//! HTTP access to image URLs

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::trace;
use url::Url;

use crate::config::HttpConfig;
use crate::errors::{FetchError, FetchResult};

/// Port for checking and downloading images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Succeeds when the url answers with a success status
    async fn check(&self, url: &str) -> FetchResult<()>;

    /// Download the image body
    async fn fetch(&self, url: &str) -> FetchResult<Bytes>;
}

/// Parse `url` as an absolute http(s) URL
pub fn parse_image_url(url: &str) -> FetchResult<Url> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let supported = matches!(parsed.scheme(), "http" | "https") && parsed.has_host();
    if !supported {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme '{}' or missing host", parsed.scheme()),
        });
    }
    Ok(parsed)
}

/// reqwest-backed fetcher with a bounded request timeout
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http_client: Client,
}

impl HttpImageFetcher {
    pub fn new(config: &HttpConfig) -> FetchResult<Self> {
        Self::with_timeout(config.request_timeout, &config.user_agent)
    }

    pub fn with_timeout(timeout: Duration, user_agent: &str) -> FetchResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http_client })
    }

    async fn get(&self, url: &str) -> FetchResult<reqwest::Response> {
        let parsed = parse_image_url(url)?;
        trace!("GET {}", url);

        let response = self
            .http_client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn check(&self, url: &str) -> FetchResult<()> {
        self.get(url).await.map(|_| ())
    }

    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        self.get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}
