// ABOUTME: HTTP access to the registry tag listing, one page per call.
// ABOUTME: The TagPageFetcher trait lets tests substitute a scripted registry.

use super::error::RegistryError;
use super::types::TagPage;
use async_trait::async_trait;
use std::time::Duration;

/// Fetches a single page of a tag listing.
#[async_trait]
pub trait TagPageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<TagPage, RegistryError>;
}

/// Tag page fetcher backed by reqwest.
pub struct HttpTagFetcher {
    client: reqwest::Client,
}

impl HttpTagFetcher {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("labs-launcher/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TagPageFetcher for HttpTagFetcher {
    async fn fetch_page(&self, url: &str) -> Result<TagPage, RegistryError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RegistryError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<TagPage>()
            .await
            .map_err(|e| RegistryError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}
