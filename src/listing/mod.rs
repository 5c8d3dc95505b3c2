//! Client for the remote hierarchical listing service.
//!
//! One GET returns one [`ListingDocument`]: the files directly under a path
//! (`objects`) and the names of its subdirectories (`prefixes`). The client
//! does not retry; callers decide what a failed fetch means.

use std::time::{Duration, Instant};

use geoscout_common::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Default per-request timeout for listing fetches.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One directory level as reported by the listing service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingDocument {
    /// Files directly under this path. `None` when the key was absent.
    #[serde(default)]
    pub objects: Option<Vec<ListingObject>>,
    /// Immediate subdirectory names, in service order.
    #[serde(default)]
    pub prefixes: Option<Vec<String>>,
}

/// A file entry in a listing document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListingObject {
    pub name: String,
    pub url: String,
    pub size: u64,
}

/// HTTP client for listing documents.
#[derive(Debug, Clone)]
pub struct ListingClient {
    client: Client,
}

impl Default for ListingClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ListingClient {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self { client }
    }

    /// Fetch and decode the listing document at `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::Network`] on connection failure, timeout, or a non-2xx status.
    /// - [`Error::Decode`] if the body is not a listing document.
    pub async fn fetch(&self, url: &str) -> Result<ListingDocument> {
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(url, format!("HTTP status {status}")));
        }

        let body = response.bytes().await.map_err(|e| Error::network(url, e))?;
        let document: ListingDocument =
            serde_json::from_slice(&body).map_err(|e| Error::decode(url, e))?;

        debug!(
            url = url,
            objects = document.objects.as_ref().map_or(0, Vec::len),
            prefixes = document.prefixes.as_ref().map_or(0, Vec::len),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched listing"
        );

        Ok(document)
    }
}
