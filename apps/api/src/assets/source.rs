//! Image download with bounded retries.
//!
//! `ImageSource` is the seam the pipeline fetches through; `HttpImageSource` is
//! the production implementation over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, warn};

use crate::assets::AssetConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}")]
    Status { status: u16 },

    #[error("image body of at least {size} bytes exceeds the {limit}-byte download limit")]
    TooLarge { size: u64, limit: usize },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Downloads the raw bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[derive(Clone)]
pub struct HttpImageSource {
    client: Client,
    max_attempts: u32,
    backoff: Duration,
    max_bytes: usize,
}

impl HttpImageSource {
    pub fn new(config: &AssetConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_attempts: config.max_attempts,
            backoff: config.retry_backoff,
            max_bytes: config.max_download_bytes,
        })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    /// Retries transport errors, 429 and 5xx with a fixed backoff. Other
    /// non-success statuses and oversized bodies fail immediately.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let mut last_error: Option<FetchError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                warn!(
                    "Image fetch attempt {} for {} failed, retrying after {}ms",
                    attempt,
                    url,
                    self.backoff.as_millis()
                );
                tokio::time::sleep(self.backoff).await;
            }

            let response = match self.client.get(url).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(FetchError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(FetchError::Status {
                    status: status.as_u16(),
                });
                continue;
            }
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                });
            }

            if let Some(declared) = response.content_length() {
                if declared > self.max_bytes as u64 {
                    return Err(FetchError::TooLarge {
                        size: declared,
                        limit: self.max_bytes,
                    });
                }
            }

            let body = match read_capped(response, self.max_bytes).await {
                Ok(b) => b,
                Err(FetchError::Http(e)) => {
                    last_error = Some(FetchError::Http(e));
                    continue;
                }
                Err(e) => return Err(e),
            };

            debug!("Fetched {} bytes from {}", body.len(), url);
            return Ok(body);
        }

        Err(FetchError::Exhausted {
            attempts: self.max_attempts,
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        })
    }
}

/// Reads the body chunk by chunk, stopping as soon as it passes `max_bytes`.
/// Never buffers more than one chunk past the limit, whatever `Content-Length` says.
async fn read_capped(mut response: Response, max_bytes: usize) -> Result<Bytes, FetchError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await? {
        let size = body.len() + chunk.len();
        if size > max_bytes {
            return Err(FetchError::TooLarge {
                size: size as u64,
                limit: max_bytes,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
