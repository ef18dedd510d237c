//! Target release reference data

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Release name selecting the rolling build stream
pub const SNAPSHOT: &str = "SNAPSHOT";

/// Which upstream build stream a release name selects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleaseChannel {
    /// Rolling, unversioned builds under `snapshots/`
    Snapshot,
    /// A versioned directory under `releases/<version>`
    Release { version: String },
}

impl ReleaseChannel {
    /// Interprets a release name; `SNAPSHOT` (any case) selects the rolling channel
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case(SNAPSHOT) {
            ReleaseChannel::Snapshot
        } else {
            ReleaseChannel::Release {
                version: name.to_string(),
            }
        }
    }

    /// Download path below the upstream root
    pub fn path(&self) -> String {
        match self {
            ReleaseChannel::Snapshot => "snapshots".to_string(),
            ReleaseChannel::Release { version } => format!("releases/{}", version),
        }
    }

    /// Release name as the operator writes it
    pub fn name(&self) -> &str {
        match self {
            ReleaseChannel::Snapshot => SNAPSHOT,
            ReleaseChannel::Release { version } => version,
        }
    }

    /// Branch key used for the rename table: `<major>.<minor>` or `SNAPSHOT`
    pub fn branch(&self) -> String {
        match self {
            ReleaseChannel::Snapshot => SNAPSHOT.to_string(),
            ReleaseChannel::Release { version } => {
                let mut parts = version.split(|c: char| c == '.' || c == '-');
                match (parts.next(), parts.next()) {
                    (Some(major), Some(minor)) if !major.is_empty() && !minor.is_empty() => {
                        format!("{}.{}", major, minor)
                    }
                    _ => version.clone(),
                }
            }
        }
    }

    /// Returns true for the rolling channel
    pub fn is_snapshot(&self) -> bool {
        matches!(self, ReleaseChannel::Snapshot)
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The device identity a target release is fetched for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Release channel to compare against
    pub channel: ReleaseChannel,
    /// Target/subtarget, e.g. `ath79/generic`
    pub target: String,
    /// Package architecture, e.g. `mips_24kc`
    pub arch: String,
    /// Device profile, e.g. `tplink_archer-c7-v2`
    pub profile: String,
}

impl Platform {
    /// Target with `/` replaced by `-`, as used in image file names
    pub fn target_dashed(&self) -> String {
        self.target.replace('/', "-")
    }
}

/// One upstream-declared rename
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageChange {
    /// Name in the older release
    pub source: String,
    /// Name in the newer release; empty when the package was dropped
    #[serde(default)]
    pub target: String,
}

impl PackageChange {
    /// Creates a rename pair
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Package names available in one upstream index, plus declared aliases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIndex {
    /// Package name to version
    pub packages: BTreeMap<String, String>,
    /// Provided name to the packages that provide it
    #[serde(default)]
    pub provides: BTreeMap<String, Vec<String>>,
}

impl PackageIndex {
    /// Returns true if the index lists this exact name
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Version listed for the name, if any
    pub fn version(&self, name: &str) -> Option<&str> {
        self.packages.get(name).map(String::as_str)
    }

    /// Packages that declare they provide `name`
    pub fn providers(&self, name: &str) -> &[String] {
        self.provides.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Everything known about the release being upgraded to
///
/// Optional parts are `None` when their document could not be fetched; checks that
/// need them report "could not verify" instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRelease {
    /// Release channel the data was fetched for
    pub channel: ReleaseChannel,
    /// Target/subtarget, e.g. `ath79/generic`
    pub target: String,
    /// Package architecture, e.g. `mips_24kc`
    pub arch: String,
    /// Device profile name
    pub profile: String,
    /// Upstream build revision, e.g. `r23809-234f1a2efa`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_code: Option<String>,
    /// Kernel version of the target image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
    /// Packages the image installs by default for this profile
    pub default_packages: BTreeSet<String>,
    /// Image files built for the profile
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Architecture-wide package index
    pub arch_index: Option<PackageIndex>,
    /// Target-specific (kmods and friends) package index
    pub platform_index: Option<PackageIndex>,
    /// Rename table for the target branch
    pub package_changes: Option<Vec<PackageChange>>,
    /// Raw build-failure listing, scraped later
    #[serde(skip)]
    pub build_failure_listing: Option<String>,
}

impl TargetRelease {
    /// Creates an empty release description for the given platform
    pub fn new(
        channel: ReleaseChannel,
        target: impl Into<String>,
        arch: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            target: target.into(),
            arch: arch.into(),
            profile: profile.into(),
            version_code: None,
            kernel_version: None,
            default_packages: BTreeSet::new(),
            images: Vec::new(),
            arch_index: None,
            platform_index: None,
            package_changes: None,
            build_failure_listing: None,
        }
    }

    /// Creates an empty release description for a platform
    pub fn for_platform(platform: &Platform) -> Self {
        Self::new(
            platform.channel.clone(),
            platform.target.clone(),
            platform.arch.clone(),
            platform.profile.clone(),
        )
    }

    /// Returns true if at least one package index is available
    pub fn has_index(&self) -> bool {
        self.arch_index.is_some() || self.platform_index.is_some()
    }

    /// Returns true if either index lists the name
    pub fn index_contains(&self, name: &str) -> bool {
        self.indices().any(|index| index.contains(name))
    }

    /// Version of the name in whichever index lists it first
    pub fn index_version(&self, name: &str) -> Option<&str> {
        self.indices().find_map(|index| index.version(name))
    }

    /// Providers of `name` declared by either index
    pub fn index_providers(&self, name: &str) -> Vec<&str> {
        self.indices()
            .flat_map(|index| index.providers(name))
            .map(String::as_str)
            .collect()
    }

    fn indices(&self) -> impl Iterator<Item = &PackageIndex> {
        self.arch_index.iter().chain(self.platform_index.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parse_snapshot() {
        assert_eq!(ReleaseChannel::parse("SNAPSHOT"), ReleaseChannel::Snapshot);
        assert_eq!(ReleaseChannel::parse("snapshot"), ReleaseChannel::Snapshot);
        assert_eq!(ReleaseChannel::Snapshot.path(), "snapshots");
        assert_eq!(ReleaseChannel::Snapshot.branch(), "SNAPSHOT");
    }

    #[test]
    fn test_channel_parse_release() {
        let channel = ReleaseChannel::parse("23.05.5");
        assert_eq!(channel.path(), "releases/23.05.5");
        assert_eq!(channel.branch(), "23.05");
        assert_eq!(channel.name(), "23.05.5");
        assert!(!channel.is_snapshot());
    }

    #[test]
    fn test_channel_branch_of_release_candidate_and_branch_snapshot() {
        assert_eq!(ReleaseChannel::parse("24.10.0-rc4").branch(), "24.10");
        assert_eq!(ReleaseChannel::parse("23.05-SNAPSHOT").branch(), "23.05");
        assert_eq!(
            ReleaseChannel::parse("23.05-SNAPSHOT").path(),
            "releases/23.05-SNAPSHOT"
        );
    }

    #[test]
    fn test_channel_branch_of_odd_name() {
        assert_eq!(ReleaseChannel::parse("trunk").branch(), "trunk");
    }

    #[test]
    fn test_platform_target_dashed() {
        let platform = Platform {
            channel: ReleaseChannel::Snapshot,
            target: "ath79/generic".to_string(),
            arch: "mips_24kc".to_string(),
            profile: "tplink_archer-c7-v2".to_string(),
        };
        assert_eq!(platform.target_dashed(), "ath79-generic");
        let release = TargetRelease::for_platform(&platform);
        assert_eq!(release.profile, "tplink_archer-c7-v2");
        assert!(release.default_packages.is_empty());
    }

    #[test]
    fn test_index_lookup_across_both_indices() {
        let mut release =
            TargetRelease::new(ReleaseChannel::Snapshot, "x86/64", "x86_64", "generic");
        assert!(!release.has_index());

        let mut arch = PackageIndex::default();
        arch.packages.insert("luci".to_string(), "25.1".to_string());
        arch.provides
            .insert("dnsmasq".to_string(), vec!["dnsmasq-full".to_string()]);
        let mut platform = PackageIndex::default();
        platform
            .packages
            .insert("kmod-e1000".to_string(), "6.6.30-r1".to_string());
        release.arch_index = Some(arch);
        release.platform_index = Some(platform);

        assert!(release.has_index());
        assert!(release.index_contains("luci"));
        assert!(release.index_contains("kmod-e1000"));
        assert!(!release.index_contains("nope"));
        assert_eq!(release.index_version("kmod-e1000"), Some("6.6.30-r1"));
        assert_eq!(release.index_providers("dnsmasq"), vec!["dnsmasq-full"]);
        assert!(release.index_providers("luci").is_empty());
    }
}
