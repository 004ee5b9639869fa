//! CDN cache invalidation after a publish pass.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DeployError;

/// Default Cloudflare API base URL.
pub const DEFAULT_CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare accepts at most this many URLs per purge request.
pub const PURGE_BATCH_SIZE: usize = 30;

/// Purges cached copies of uploaded objects.
#[async_trait]
pub trait CdnInvalidator: Send + Sync {
    /// Invalidate the given object keys. Returns the number of URLs purged.
    async fn invalidate(&self, keys: &[String]) -> Result<usize, DeployError>;
}

/// Public URLs to purge for `keys` under each of `base_urls`.
///
/// Keys ending in `index.html` also purge their directory URL, since the
/// site links to `/section/<id>/` rather than the file.
pub fn purge_urls(base_urls: &[String], keys: &[String]) -> Vec<String> {
    let mut urls = Vec::new();
    for base in base_urls {
        let base = base.trim_end_matches('/');
        for key in keys {
            let key = key.trim_start_matches('/');
            urls.push(format!("{}/{}", base, key));

            if let Some(dir) = key.strip_suffix("index.html") {
                urls.push(format!("{}/{}", base, dir));
            }
        }
    }
    urls
}

/// Cloudflare credentials and target zone.
#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub api_key: String,
    pub email: String,
    /// Zone name, e.g. `example.com`
    pub zone: String,
    pub base_urls: Vec<String>,
    pub api_base_url: String,
    pub timeout: Duration,
}

impl CloudflareConfig {
    pub fn new(
        api_key: impl Into<String>,
        email: impl Into<String>,
        zone: impl Into<String>,
        base_urls: Vec<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            email: email.into(),
            zone: zone.into(),
            base_urls,
            api_base_url: DEFAULT_CLOUDFLARE_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Serialize)]
struct PurgeRequest<'a> {
    files: &'a [String],
}

fn envelope_error<T>(envelope: &ApiEnvelope<T>) -> String {
    if envelope.errors.is_empty() {
        return "request was not successful".to_string();
    }
    envelope
        .errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cloudflare purge-by-URL client.
#[derive(Clone)]
pub struct CloudflareInvalidator {
    http: reqwest::Client,
    config: CloudflareConfig,
}

impl CloudflareInvalidator {
    pub fn new(config: CloudflareConfig) -> Result<Self, DeployError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("distilled-site/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeployError::Invalidation(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Auth-Email", &self.config.email)
            .header("X-Auth-Key", &self.config.api_key)
    }

    async fn zone_id(&self) -> Result<String, DeployError> {
        let response = self
            .authed(self.http.get(self.api_url("/zones")))
            .query(&[("name", self.config.zone.as_str())])
            .send()
            .await
            .map_err(|e| DeployError::Invalidation(e.to_string()))?;

        let envelope: ApiEnvelope<Vec<Zone>> = response
            .json()
            .await
            .map_err(|e| DeployError::Invalidation(e.to_string()))?;

        if !envelope.success {
            return Err(DeployError::Invalidation(envelope_error(&envelope)));
        }

        envelope
            .result
            .and_then(|zones| zones.into_iter().next())
            .map(|zone| zone.id)
            .ok_or_else(|| {
                DeployError::Invalidation(format!("zone not found: {}", self.config.zone))
            })
    }

    async fn purge_batch(&self, zone_id: &str, files: &[String]) -> Result<(), DeployError> {
        let response = self
            .authed(
                self.http
                    .post(self.api_url(&format!("/zones/{}/purge_cache", zone_id))),
            )
            .json(&PurgeRequest { files })
            .send()
            .await
            .map_err(|e| DeployError::Invalidation(e.to_string()))?;

        let envelope: ApiEnvelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| DeployError::Invalidation(e.to_string()))?;

        if !envelope.success {
            return Err(DeployError::Invalidation(envelope_error(&envelope)));
        }
        Ok(())
    }
}

#[async_trait]
impl CdnInvalidator for CloudflareInvalidator {
    async fn invalidate(&self, keys: &[String]) -> Result<usize, DeployError> {
        let urls = purge_urls(&self.config.base_urls, keys);
        if urls.is_empty() {
            return Ok(0);
        }

        let zone_id = self.zone_id().await?;
        debug!(zone = %self.config.zone, zone_id = %zone_id, "Resolved Cloudflare zone");

        for batch in urls.chunks(PURGE_BATCH_SIZE) {
            self.purge_batch(&zone_id, batch).await?;
            debug!(count = batch.len(), "Purged batch");
        }

        info!(zone = %self.config.zone, urls = urls.len(), "CDN cache purged");
        Ok(urls.len())
    }
}
