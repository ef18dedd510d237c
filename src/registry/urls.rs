//! Where each upstream document lives

use crate::domain::{Platform, ReleaseChannel};

/// Upstream roots plus the per-document URL layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamUrls {
    /// Download server root, e.g. `https://downloads.openwrt.org`
    pub downloads: String,
    /// JSON API root, e.g. `https://sysupgrade.openwrt.org/json/v1`
    pub api: String,
    /// Overview document URL
    pub overview: String,
}

impl UpstreamUrls {
    /// Creates the layout; trailing slashes on the roots are ignored
    pub fn new(
        downloads: impl Into<String>,
        api: impl Into<String>,
        overview: impl Into<String>,
    ) -> Self {
        Self {
            downloads: downloads.into().trim_end_matches('/').to_string(),
            api: api.into().trim_end_matches('/').to_string(),
            overview: overview.into(),
        }
    }

    /// Platform description: `profiles.json` of the target
    pub fn profiles(&self, platform: &Platform) -> String {
        format!(
            "{}/{}/targets/{}/profiles.json",
            self.downloads,
            platform.channel.path(),
            platform.target
        )
    }

    /// Architecture-wide package index
    pub fn arch_index(&self, platform: &Platform) -> String {
        format!(
            "{}/{}/packages/{}-index.json",
            self.api,
            platform.channel.path(),
            platform.arch
        )
    }

    /// Target-specific package index
    pub fn platform_index(&self, platform: &Platform) -> String {
        format!(
            "{}/{}/targets/{}/index.json",
            self.api,
            platform.channel.path(),
            platform.target
        )
    }

    /// CycloneDX bill of materials of the target images
    pub fn bom(&self, platform: &Platform) -> String {
        let prefix = match &platform.channel {
            ReleaseChannel::Snapshot => "openwrt".to_string(),
            ReleaseChannel::Release { version } => format!("openwrt-{}", version),
        };
        format!(
            "{}/{}/targets/{}/{}-{}.bom.cdx.json",
            self.downloads,
            platform.channel.path(),
            platform.target,
            prefix,
            platform.target_dashed()
        )
    }

    /// Directory listing of packages that failed to build
    pub fn build_failures(&self, platform: &Platform) -> String {
        let faillogs = match &platform.channel {
            ReleaseChannel::Snapshot => "snapshots/faillogs".to_string(),
            channel => format!("releases/faillogs-{}", channel.branch()),
        };
        format!("{}/{}/{}/packages/", self.downloads, faillogs, platform.arch)
    }
}
