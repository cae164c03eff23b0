//! Dataset retrieval over HTTP or from the local filesystem.
//!
//! A dataset URL is either `http(s)://...` or a plain file path; both arrive
//! from configuration and are treated uniformly by callers. Failures are
//! typed so the command layer can distinguish a timeout from a refused
//! connection from a 404. "No data found" is never modelled here.

use std::{path::Path, time::Duration};

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::timeout;

/// Abort limit applied to every remote fetch unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} fetching {url}")]
    Http { url: String, status: u16 },
    #[error("network failure fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("timed out after {timeout:?} fetching {url}")]
    Timeout { url: String, timeout: Duration },
    #[error("failed reading {url}: {message}")]
    Read { url: String, message: String },
    #[error("failed parsing JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Stateless retriever. Caching and request coalescing live in
/// [`crate::store::DataStore`]; dropping the returned future cancels the
/// underlying request.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Fetcher {
            client: Client::new(),
            timeout,
        }
    }

    fn is_remote(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    /// Raw bytes for a URL or file path.
    pub async fn bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if Self::is_remote(url) {
            self.remote_bytes(url).await
        } else {
            tokio::fs::read(Path::new(url))
                .await
                .map_err(|err| FetchError::Read {
                    url: url.to_string(),
                    message: err.to_string(),
                })
        }
    }

    async fn remote_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request = async {
            let response =
                self.client
                    .get(url)
                    .send()
                    .await
                    .map_err(|source| FetchError::Network {
                        url: url.to_string(),
                        source,
                    })?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Http {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            let body = response
                .bytes()
                .await
                .map_err(|source| FetchError::Network {
                    url: url.to_string(),
                    source,
                })?;
            Ok(body.to_vec())
        };
        match timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    /// Body decoded to text (BOM-aware).
    pub async fn text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.bytes(url).await?;
        Ok(crate::tabular::decode_text(&bytes))
    }

    /// Body parsed as JSON into `T`.
    pub async fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let bytes = self.bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }
}
