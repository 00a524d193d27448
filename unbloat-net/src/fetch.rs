// unbloat-net/src/fetch.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use unbloat_common::config::Config;
use unbloat_common::error::{Result, UnbloatError};

use crate::http::{build_http_client, get_body};

/// Raw classification document together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCatalog {
    pub raw: Vec<u8>,
    pub revision: String,
}

/// Read-only access to the remote catalog. Implementations do not retry.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Reads the document and the revision; returns nothing unless both
    /// succeed.
    async fn fetch(&self) -> Result<FetchedCatalog>;

    /// Cheap revision-only read.
    async fn fetch_revision(&self) -> Result<String>;
}

pub struct HttpCatalogFetcher {
    client: Client,
    catalog_url: String,
    revision_url: String,
}

impl HttpCatalogFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            catalog_url: config.catalog_url.clone(),
            revision_url: config.revision_url.clone(),
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogFetcher {
    async fn fetch(&self) -> Result<FetchedCatalog> {
        let (raw, revision) = tokio::join!(
            get_body(&self.client, &self.catalog_url),
            self.fetch_revision()
        );
        let raw = raw?;
        let revision = revision?;
        debug!(
            "Fetched catalog document ({} bytes) at revision {}",
            raw.len(),
            revision
        );
        Ok(FetchedCatalog { raw, revision })
    }

    async fn fetch_revision(&self) -> Result<String> {
        let body = get_body(&self.client, &self.revision_url).await?;
        extract_revision(&self.revision_url, &body)
    }
}

/// Pulls the `sha` of the first commit object out of a commits listing.
pub fn extract_revision(url: &str, body: &[u8]) -> Result<String> {
    let malformed = |reason: &str| UnbloatError::MalformedRevisionResponse {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let value: Value =
        serde_json::from_slice(body).map_err(|e| malformed(&format!("not valid JSON: {e}")))?;
    let commits = value
        .as_array()
        .ok_or_else(|| malformed("expected a JSON array of commits"))?;
    let first = commits
        .first()
        .ok_or_else(|| malformed("commit list is empty"))?;
    match first.get("sha").and_then(Value::as_str).map(str::trim) {
        Some(sha) if !sha.is_empty() => Ok(sha.to_string()),
        _ => Err(malformed("first commit has no 'sha' string")),
    }
}
