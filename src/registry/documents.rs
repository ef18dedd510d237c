//! Typed upstream JSON documents
//!
//! Every field the analysis relies on is named here. Absent fields decode to
//! empty values; what that absence means is decided by the fetcher.

use crate::domain::{PackageChange, PackageIndex, SNAPSHOT};
use crate::error::FetchError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Decode a fetched JSON document, blaming `url` on failure
pub fn decode<T: DeserializeOwned>(url: &str, bytes: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(bytes).map_err(|e| FetchError::invalid(url, e.to_string()))
}

/// The release overview: branches, their versions and rename tables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverviewDocument {
    /// Newest stable versions
    #[serde(default)]
    pub latest: Vec<String>,
    /// Branch name (`23.05`, `SNAPSHOT`) to branch details
    #[serde(default)]
    pub branches: BTreeMap<String, BranchInfo>,
}

/// One release branch in the overview
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchInfo {
    /// Every release name published on this branch
    #[serde(default)]
    pub versions: Vec<String>,
    /// Packages renamed or dropped on this branch
    #[serde(default)]
    pub package_changes: Vec<ChangeEntry>,
    /// Target to package architecture
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
}

/// A rename entry as published; `target` may be null for dropped packages
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeEntry {
    pub source: String,
    #[serde(default)]
    pub target: Option<String>,
}

impl From<&ChangeEntry> for PackageChange {
    fn from(entry: &ChangeEntry) -> Self {
        PackageChange::new(entry.source.clone(), entry.target.clone().unwrap_or_default())
    }
}

impl OverviewDocument {
    /// Every release name the operator could ask for, newest first
    pub fn valid_releases(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.latest.iter().cloned().collect();
        for (branch, info) in &self.branches {
            names.extend(info.versions.iter().cloned());
            if branch == SNAPSHOT {
                names.insert(SNAPSHOT.to_string());
            }
        }
        names.into_iter().rev().collect()
    }

    /// Rename table of a branch; `None` when the branch is not listed
    pub fn package_changes(&self, branch: &str) -> Option<Vec<PackageChange>> {
        self.branches
            .get(branch)
            .map(|info| info.package_changes.iter().map(PackageChange::from).collect())
    }
}

/// The target's `profiles.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilesDocument {
    /// Package architecture of the target
    #[serde(default)]
    pub arch_packages: Option<String>,
    /// Packages every image of the target gets
    #[serde(default)]
    pub default_packages: Vec<String>,
    /// Legacy schema: device packages at the top level
    #[serde(default)]
    pub device_packages: Option<Vec<String>>,
    /// Current schema: per-profile details
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    /// Kernel the images were built with
    #[serde(default)]
    pub linux_kernel: Option<LinuxKernel>,
    /// Build revision
    #[serde(default)]
    pub version_code: Option<String>,
    /// Release name the document belongs to
    #[serde(default)]
    pub version_number: Option<String>,
}

/// One device profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileEntry {
    #[serde(default)]
    pub device_packages: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

/// One image built for a profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageEntry {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinuxKernel {
    #[serde(default)]
    pub version: Option<String>,
}

impl ProfilesDocument {
    /// Device package list for `profile`
    ///
    /// Profile-keyed documents are preferred; documents without a `profiles`
    /// table fall back to the legacy top-level list. `None` means the profile
    /// is not described by this document.
    pub fn device_packages(&self, profile: &str) -> Option<&[String]> {
        if self.profiles.is_empty() {
            self.device_packages.as_deref()
        } else {
            self.profiles
                .get(profile)
                .map(|entry| entry.device_packages.as_slice())
        }
    }

    /// Default package set: target defaults plus device packages, minus `-name` removals
    pub fn default_set(&self, profile: &str) -> BTreeSet<String> {
        let device = self.device_packages(profile).unwrap_or(&[]);
        let all = || self.default_packages.iter().chain(device.iter());

        let mut set: BTreeSet<String> = all()
            .filter(|name| !name.starts_with('-') && !name.is_empty())
            .cloned()
            .collect();
        for removed in all().filter_map(|name| name.strip_prefix('-')) {
            set.remove(removed);
        }
        set
    }

    /// Image file names built for `profile`
    pub fn images(&self, profile: &str) -> Vec<String> {
        self.profiles
            .get(profile)
            .map(|entry| {
                entry
                    .images
                    .iter()
                    .filter(|image| !image.name.is_empty())
                    .map(|image| image.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Kernel version, if the document states one
    pub fn kernel_version(&self) -> Option<&str> {
        self.linux_kernel.as_ref()?.version.as_deref()
    }
}

/// A package index from the JSON API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexDocument {
    /// Package name to version
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
    /// Provided name to its providers
    #[serde(default)]
    pub provides: BTreeMap<String, Vec<String>>,
}

impl From<IndexDocument> for PackageIndex {
    fn from(doc: IndexDocument) -> Self {
        PackageIndex {
            packages: doc.packages,
            provides: doc.provides,
        }
    }
}

/// CycloneDX bill of materials; only components are of interest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BomDocument {
    #[serde(default)]
    pub components: Vec<BomComponent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BomComponent {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl BomDocument {
    /// Version of the `kernel` component
    pub fn kernel_version(&self) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.name == "kernel")
            .and_then(|c| c.version.as_deref())
    }
}
