//! Page extraction client
//!
//! The extraction service itself is external. This module validates target
//! URLs and calls the service's `POST {base}/extract` endpoint, returning its
//! `{ structure, styles, assets }` snapshot as-is.

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::error::ApiError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Extraction service error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        ExtractionError::Upstream(e.to_string())
    }
}

impl From<ExtractionError> for ApiError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::InvalidUrl(_) => ApiError::BadRequest(e.to_string()),
            ExtractionError::Upstream(_) => ApiError::Upstream(e.to_string()),
        }
    }
}

/// Snapshot of a target page as returned by the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub structure: serde_json::Value,
    #[serde(default)]
    pub styles: serde_json::Value,
    #[serde(default)]
    pub assets: serde_json::Value,
}

/// Accept only absolute `http`/`https` URLs with a host.
pub fn validate_url(raw: &str) -> Result<Url, ExtractionError> {
    let url = Url::parse(raw.trim()).map_err(|e| ExtractionError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ExtractionError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            raw,
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ExtractionError::InvalidUrl(format!("{}: missing host", raw)));
    }
    Ok(url)
}

/// DOM extraction collaborator.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    fn validate_url(&self, raw: &str) -> Result<Url, ExtractionError> {
        validate_url(raw)
    }

    async fn extract(&self, url: &Url) -> Result<PageSnapshot, ExtractionError>;
}

/// Client for a remote extraction service.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpExtractor {
    pub fn new(service_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = Url::parse(service_url)
            .map_err(|e| anyhow::anyhow!("invalid extraction service url {:?}: {}", service_url, e))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("extract")?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PageExtractor for HttpExtractor {
    async fn extract(&self, url: &Url) -> Result<PageSnapshot, ExtractionError> {
        debug!("Requesting extraction of {}", url);
        let snapshot = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "url": url.as_str() }))
            .send()
            .await?
            .error_for_status()?
            .json::<PageSnapshot>()
            .await?;
        Ok(snapshot)
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
}

pub async fn extract_handler(
    State(extractor): State<Option<Arc<dyn PageExtractor>>>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<PageSnapshot>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let extractor = extractor
        .ok_or_else(|| ApiError::Unavailable("no extraction service configured".to_string()))?;

    let url = extractor.validate_url(&req.url)?;
    info!("Extracting {}", url);
    let snapshot = extractor.extract(&url).await?;
    Ok(Json(snapshot))
}

/// Build the extraction routes
pub fn extraction_routes(extractor: Option<Arc<dyn PageExtractor>>) -> Router {
    Router::new()
        .route("/api/extract", post(extract_handler))
        .with_state(extractor)
}
