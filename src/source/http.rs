//! Remote content source (CMS or content API), behind the `http-source`
//! feature.

use async_trait::async_trait;
use reqwest::header::{HeaderName, ETAG, LAST_MODIFIED};
use tracing::debug;

use super::ContentSource;
use crate::error::ContentSourceError;
use crate::types::Fingerprint;

/// Fingerprints a remote endpoint with a single GET.
///
/// Prefers the `ETag` header, then `Last-Modified`, and only digests the
/// response body when neither is present.
#[derive(Clone, Debug)]
pub struct HttpSource {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    /// Creates a source polling `url` with a default client.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Creates a source polling `url` with a caller-configured client.
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        let url = url.into();
        Self {
            name: format!("http:{url}"),
            url,
            client,
        }
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fingerprint(&self) -> Result<Fingerprint, ContentSourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ContentSourceError::http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentSourceError::http(format!(
                "{} returned {}",
                self.url, status
            )));
        }

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        if let Some(etag) = header(ETAG) {
            return Ok(Fingerprint::new(format!("etag:{etag}")));
        }
        if let Some(modified) = header(LAST_MODIFIED) {
            return Ok(Fingerprint::new(format!("last-modified:{modified}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ContentSourceError::http(e.to_string()))?;
        debug!(url = %self.url, bytes = body.len(), "Digesting content response body");
        Ok(Fingerprint::digest(&body))
    }
}
