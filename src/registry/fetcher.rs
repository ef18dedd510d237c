//! Release fetcher
//!
//! Issues every sub-fetch for a platform at once and merges whatever arrived
//! into a `TargetRelease`. Only the platform description is required; every
//! other document that fails is recorded as a `FetchFailure` and the checks
//! depending on it report that they could not verify.

use super::documents::{
    decode, BomDocument, IndexDocument, OverviewDocument, ProfilesDocument,
};
use super::{DocumentStore, ManifestSource, UpstreamUrls};
use crate::domain::{PackageIndex, Platform, TargetRelease};
use crate::error::{AppError, FetchError};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The documents that make up a target release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    Platform,
    Overview,
    ArchIndex,
    PlatformIndex,
    Bom,
    BuildFailures,
}

impl DocumentKind {
    /// Stable identifier used in machine-readable output
    pub fn id(&self) -> &'static str {
        match self {
            DocumentKind::Platform => "platform",
            DocumentKind::Overview => "overview",
            DocumentKind::ArchIndex => "arch-index",
            DocumentKind::PlatformIndex => "platform-index",
            DocumentKind::Bom => "bom",
            DocumentKind::BuildFailures => "build-failures",
        }
    }

    /// What cannot be verified without this document
    pub fn affects(&self) -> &'static str {
        match self {
            DocumentKind::Platform => "default packages",
            DocumentKind::Overview => "package renames",
            DocumentKind::ArchIndex | DocumentKind::PlatformIndex => "package availability",
            DocumentKind::Bom => "kernel version",
            DocumentKind::BuildFailures => "build failures",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::Platform => "platform description",
            DocumentKind::Overview => "release overview",
            DocumentKind::ArchIndex => "architecture package index",
            DocumentKind::PlatformIndex => "platform package index",
            DocumentKind::Bom => "bill of materials",
            DocumentKind::BuildFailures => "build-failure listing",
        };
        write!(f, "{}", name)
    }
}

/// A non-fatal sub-fetch failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub document: DocumentKind,
    pub error: FetchError,
}

impl FetchFailure {
    pub fn new(document: DocumentKind, error: FetchError) -> Self {
        Self { document, error }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not verify {}: {} unavailable ({})",
            self.document.affects(),
            self.document,
            self.error
        )
    }
}

/// Result of fetching a target release
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Everything that could be fetched
    pub release: TargetRelease,
    /// Documents that could not be fetched, in `DocumentKind` order
    pub failures: Vec<FetchFailure>,
    /// Release names listed by the overview
    pub valid_releases: Vec<String>,
}

impl FetchOutcome {
    /// Returns true if the given document failed
    pub fn failed(&self, document: DocumentKind) -> bool {
        self.failures.iter().any(|f| f.document == document)
    }
}

/// Fetches the documents of one target release
pub struct ReleaseFetcher<'a> {
    source: &'a dyn ManifestSource,
    urls: &'a UpstreamUrls,
    store: &'a DocumentStore,
    timeout: Option<Duration>,
    build_failures: bool,
}

impl<'a> ReleaseFetcher<'a> {
    pub fn new(
        source: &'a dyn ManifestSource,
        urls: &'a UpstreamUrls,
        store: &'a DocumentStore,
    ) -> Self {
        Self {
            source,
            urls,
            store,
            timeout: None,
            build_failures: false,
        }
    }

    /// Attach a timeout to every individual fetch
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Also fetch the build-failure listing
    pub fn with_build_failures(mut self, enabled: bool) -> Self {
        self.build_failures = enabled;
        self
    }

    /// Fetch everything known about the platform's target release
    ///
    /// Fails only when the platform description is unavailable; the error then
    /// carries the release names the overview lists, if it could be fetched.
    pub async fn fetch(&self, platform: &Platform) -> Result<FetchOutcome, AppError> {
        let profiles_url = self.urls.profiles(platform);
        let arch_url = self.urls.arch_index(platform);
        let platform_url = self.urls.platform_index(platform);
        let bom_url = self.urls.bom(platform);
        let failures_url = self.urls.build_failures(platform);

        info!(release = %platform.channel, target = %platform.target, "fetching release documents");

        let (profiles, overview, arch_index, platform_index, bom, listing) = tokio::join!(
            self.get_json::<ProfilesDocument>(&profiles_url),
            self.get_json::<OverviewDocument>(&self.urls.overview),
            self.get_json::<IndexDocument>(&arch_url),
            self.get_json::<IndexDocument>(&platform_url),
            self.get_json::<BomDocument>(&bom_url),
            async {
                if self.build_failures {
                    Some(self.get(&failures_url).await)
                } else {
                    None
                }
            },
        );

        let valid_releases = overview
            .as_ref()
            .map(OverviewDocument::valid_releases)
            .unwrap_or_default();

        let profiles = match profiles {
            Ok(doc) => doc,
            Err(source) => {
                error!(url = source.url(), error = %source, "platform description unavailable");
                return Err(AppError::PlatformUnavailable {
                    source,
                    valid_releases,
                });
            }
        };

        let mut failures = Vec::new();
        let mut release = TargetRelease::for_platform(platform);
        release.version_code = profiles.version_code.clone();
        release.default_packages = profiles.default_set(&platform.profile);
        release.images = profiles.images(&platform.profile);

        if profiles.device_packages(&platform.profile).is_none() {
            failures.push(FetchFailure::new(
                DocumentKind::Platform,
                FetchError::invalid(
                    &profiles_url,
                    format!("profile '{}' is not described", platform.profile),
                ),
            ));
        }
        if let Some(arch) = profiles.arch_packages.as_deref() {
            if arch != platform.arch {
                warn!(
                    device = %platform.arch,
                    target = arch,
                    "package architecture differs from the target's"
                );
            }
        }

        match overview {
            Ok(doc) => {
                let branch = platform.channel.branch();
                release.package_changes = doc.package_changes(&branch);
                if release.package_changes.is_none() {
                    failures.push(FetchFailure::new(
                        DocumentKind::Overview,
                        FetchError::invalid(
                            &self.urls.overview,
                            format!("branch '{}' is not listed", branch),
                        ),
                    ));
                }
            }
            Err(e) => failures.push(FetchFailure::new(DocumentKind::Overview, e)),
        }

        match arch_index {
            Ok(doc) => release.arch_index = Some(PackageIndex::from(doc)),
            Err(e) => failures.push(FetchFailure::new(DocumentKind::ArchIndex, e)),
        }
        match platform_index {
            Ok(doc) => release.platform_index = Some(PackageIndex::from(doc)),
            Err(e) => failures.push(FetchFailure::new(DocumentKind::PlatformIndex, e)),
        }

        match bom {
            Ok(doc) => release.kernel_version = doc.kernel_version().map(str::to_string),
            Err(e) => {
                release.kernel_version = profiles.kernel_version().map(str::to_string);
                if release.kernel_version.is_none() {
                    failures.push(FetchFailure::new(DocumentKind::Bom, e));
                } else {
                    debug!(
                        error = %e,
                        "no bill of materials, using kernel from platform description"
                    );
                }
            }
        }

        match listing {
            Some(Ok(bytes)) => {
                release.build_failure_listing = Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some(Err(FetchError::NotFound { url })) => {
                debug!(url, "no build-failure listing published");
            }
            Some(Err(e)) => failures.push(FetchFailure::new(DocumentKind::BuildFailures, e)),
            None => {}
        }

        for failure in &failures {
            warn!(url = failure.error.url(), "{}", failure);
        }

        Ok(FetchOutcome {
            release,
            failures,
            valid_releases,
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(bytes) = self.store.cached(url) {
            return Ok(bytes);
        }
        let request = self.source.fetch(url);
        let bytes = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| FetchError::Timeout {
                    url: url.to_string(),
                })??,
            None => request.await?,
        };
        self.store.store(url, &bytes);
        Ok(bytes)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let bytes = self.get(url).await?;
        decode(url, &bytes)
    }
}
