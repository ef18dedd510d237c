//! Device identity from `/etc/openwrt_release` and the board name

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// What the running system says about itself; every field may be unknown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Installed release, e.g. `23.05.3` or `SNAPSHOT`
    pub release: Option<String>,
    /// Target/subtarget, e.g. `ath79/generic`
    pub target: Option<String>,
    /// Package architecture, e.g. `mips_24kc`
    pub arch: Option<String>,
    /// Board name, e.g. `tplink,archer-c7-v2`
    pub board: Option<String>,
}

impl DeviceInfo {
    /// Profile name derived from the board name
    pub fn profile(&self) -> Option<String> {
        self.board.as_deref().map(profile_name)
    }
}

/// Profile names replace the board name's vendor separator
pub fn profile_name(board: &str) -> String {
    board.trim().replace(',', "_")
}

/// Parse shell-style `KEY='value'` assignments
pub fn parse_release_file(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .filter(|(key, _)| !key.is_empty() && !key.starts_with('#'))
        .map(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Read device identity; unreadable files simply leave fields unknown
pub fn read_device_info(release_file: &Path, board_file: &Path) -> DeviceInfo {
    let release = match std::fs::read_to_string(release_file) {
        Ok(content) => parse_release_file(&content),
        Err(e) => {
            debug!(path = %release_file.display(), error = %e, "release file not readable");
            BTreeMap::new()
        }
    };

    let non_empty = |key: &str| release.get(key).filter(|v| !v.is_empty()).cloned();

    DeviceInfo {
        release: non_empty("DISTRIB_RELEASE"),
        target: non_empty("DISTRIB_TARGET"),
        arch: non_empty("DISTRIB_ARCH"),
        board: std::fs::read_to_string(board_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    }
}
