//! Remote release documents
//!
//! This module provides:
//! - The `ManifestSource` seam every network read goes through
//! - An HTTP implementation with a configurable per-request timeout
//! - URL layout for the download server and the JSON API
//! - Typed decoding of the overview, platform, index and BOM documents
//! - A scoped document store for fetched files
//! - The release fetcher that runs every sub-fetch concurrently

mod client;
mod documents;
mod fetcher;
mod store;
mod urls;

pub use client::HttpClient;
pub use documents::{BomDocument, BranchInfo, IndexDocument, OverviewDocument, ProfilesDocument};
pub use fetcher::{DocumentKind, FetchFailure, FetchOutcome, ReleaseFetcher};
pub use store::DocumentStore;
pub use urls::UpstreamUrls;

use crate::error::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Anything that can turn a URL into bytes
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch the document at `url`; one attempt, no retries
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fixed URL to document map, used by tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: HashMap<String, Vec<u8>>,
}

impl StaticSource {
    /// Creates an empty source; every fetch is NotFound
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document
    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl ManifestSource for StaticSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}
