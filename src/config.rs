//! Run configuration
//!
//! Built-in defaults, overridden by an optional TOML file, overridden by the
//! command line. The merged `Config` is handed to every stage explicitly.

use crate::cli::{CliArgs, FormatArg};
use crate::domain::{Platform, ReleaseChannel};
use crate::error::ConfigError;
use crate::local::{DatabaseLocation, DeviceInfo};
use crate::parser::DatabaseFormat;
use crate::registry::UpstreamUrls;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pkgdelta.toml";

/// Local file locations
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub apk_db: PathBuf,
    pub opkg_status: PathBuf,
    pub world: PathBuf,
    pub release_file: PathBuf,
    pub board_name: PathBuf,
    pub output: PathBuf,
    pub cache_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            apk_db: PathBuf::from("/lib/apk/db/installed"),
            opkg_status: PathBuf::from("/usr/lib/opkg/status"),
            world: PathBuf::from("/etc/apk/world"),
            release_file: PathBuf::from("/etc/openwrt_release"),
            board_name: PathBuf::from("/tmp/sysinfo/board_name"),
            output: PathBuf::from("/etc/backup/installed_packages.txt"),
            cache_dir: None,
        }
    }
}

/// Upstream servers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    pub downloads: String,
    pub api: String,
    pub overview: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            downloads: "https://downloads.openwrt.org".to_string(),
            api: "https://sysupgrade.openwrt.org/json/v1".to_string(),
            overview: "https://sysupgrade.openwrt.org/json/v1/overview.json".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Device identity overrides; unset fields are detected on the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub release: Option<String>,
    pub target: Option<String>,
    pub arch: Option<String>,
    pub profile: Option<String>,
    /// `apk`, `opkg` or `auto`
    pub format: Option<String>,
}

/// What goes into the report
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub include_deps: bool,
    pub include_defaults: bool,
    pub include_missing: bool,
    pub check_failures: bool,
    pub compact: bool,
    pub abi_normalization: bool,
    pub color: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_deps: false,
            include_defaults: false,
            include_missing: false,
            check_failures: false,
            compact: false,
            abi_normalization: true,
            color: true,
        }
    }
}

/// Merged configuration for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub upstream: UpstreamConfig,
    pub device: DeviceConfig,
    pub report: ReportConfig,
    /// Keep downloaded documents after the run
    #[serde(skip)]
    pub keep: bool,
    /// Write the ledger to stdout instead of a file
    #[serde(skip)]
    pub ledger_to_stdout: bool,
}

impl Config {
    /// Parse TOML config content; `path` is used for diagnostics
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::InvalidFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.database_format()?;
        Ok(config)
    }

    /// Load the config file
    ///
    /// An absent file yields the defaults unless it was named explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "loaded config file");
                Self::from_toml(&content, path)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => Ok(Self::default()),
            Err(source) => Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load the file named by the arguments (or the default file) and apply the arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path, true)?,
            None => Self::load(Path::new(DEFAULT_CONFIG_PATH), false)?,
        };
        config.apply_cli(args)?;
        Ok(config)
    }

    /// Overlay command-line values
    pub fn apply_cli(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        if args.json && args.ledger_to_stdout() {
            return Err(ConfigError::ConflictingOptions {
                message: "--json and --output - both write to stdout".to_string(),
            });
        }

        let report = &mut self.report;
        report.include_deps |= args.include_deps;
        report.include_defaults |= args.include_defaults;
        report.include_missing |= args.include_missing;
        report.check_failures |= args.check_failures;
        report.compact |= args.compact;
        if args.no_color {
            report.color = false;
        }

        if let Some(db) = &args.db {
            // one path serves whichever format is in use
            self.paths.apk_db = db.clone();
            self.paths.opkg_status = db.clone();
        }
        if let Some(world) = &args.world {
            self.paths.world = world.clone();
        }
        if let Some(dir) = &args.cache_dir {
            self.paths.cache_dir = Some(dir.clone());
        }
        if args.ledger_to_stdout() {
            self.ledger_to_stdout = true;
        } else if let Some(output) = &args.output {
            self.paths.output = output.clone();
        }

        let device = &mut self.device;
        override_with(&mut device.release, &args.release);
        override_with(&mut device.target, &args.target);
        override_with(&mut device.arch, &args.arch);
        override_with(&mut device.profile, &args.profile);
        if let Some(format) = args.format {
            device.format = Some(
                match format {
                    FormatArg::Apk => "apk",
                    FormatArg::Opkg => "opkg",
                    FormatArg::Auto => "auto",
                }
                .to_string(),
            );
        }

        if let Some(timeout) = args.timeout {
            self.upstream.timeout_secs = timeout.as_secs();
        }
        self.keep = args.keep;
        Ok(())
    }

    /// Requested database format; `None` means detect
    pub fn database_format(&self) -> Result<Option<DatabaseFormat>, ConfigError> {
        match self.device.format.as_deref() {
            None => Ok(None),
            Some(value) if value.eq_ignore_ascii_case("auto") => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidFormat {
                    value: value.to_string(),
                }),
        }
    }

    /// Database locations to probe
    pub fn database_location(&self) -> DatabaseLocation {
        DatabaseLocation {
            apk: self.paths.apk_db.clone(),
            opkg: self.paths.opkg_status.clone(),
        }
    }

    /// Upstream URL layout
    pub fn upstream_urls(&self) -> UpstreamUrls {
        UpstreamUrls::new(
            self.upstream.downloads.as_str(),
            self.upstream.api.as_str(),
            self.upstream.overview.as_str(),
        )
    }

    /// Per-fetch timeout; zero disables it
    pub fn timeout(&self) -> Option<Duration> {
        (self.upstream.timeout_secs > 0).then(|| Duration::from_secs(self.upstream.timeout_secs))
    }

    /// Combine overrides with the detected identity
    pub fn resolve_platform(&self, detected: &DeviceInfo) -> Result<Platform, ConfigError> {
        let release = self
            .device
            .release
            .clone()
            .or_else(|| detected.release.clone())
            .ok_or(ConfigError::MissingDeviceField { field: "release" })?;
        let target = self
            .device
            .target
            .clone()
            .or_else(|| detected.target.clone())
            .ok_or(ConfigError::MissingDeviceField { field: "target" })?;
        let arch = self
            .device
            .arch
            .clone()
            .or_else(|| detected.arch.clone())
            .ok_or(ConfigError::MissingDeviceField { field: "arch" })?;
        let profile = self
            .device
            .profile
            .clone()
            .or_else(|| detected.profile())
            .ok_or(ConfigError::MissingDeviceField { field: "profile" })?;

        Ok(Platform {
            channel: ReleaseChannel::parse(&release),
            target,
            arch,
            profile,
        })
    }
}

fn override_with(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        *slot = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.paths.apk_db, PathBuf::from("/lib/apk/db/installed"));
        assert_eq!(config.paths.world, PathBuf::from("/etc/apk/world"));
        assert_eq!(config.upstream.downloads, "https://downloads.openwrt.org");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config.report.abi_normalization);
        assert!(config.report.color);
        assert_eq!(config.database_format().unwrap(), None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
[upstream]
downloads = "https://mirror.example.org/openwrt"
timeout_secs = 5

[report]
include_deps = true
"#,
            Path::new("pkgdelta.toml"),
        )
        .unwrap();
        assert_eq!(config.upstream.downloads, "https://mirror.example.org/openwrt");
        assert_eq!(config.upstream.api, UpstreamConfig::default().api);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert!(config.report.include_deps);
        assert!(config.report.abi_normalization);
    }

    #[test]
    fn test_invalid_toml() {
        let err =
            Config::from_toml("[report]\ninclude_deps = 3\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml("[report]\nshiny = true\n", Path::new("c.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile { .. }));
    }

    #[test]
    fn test_invalid_format_in_file() {
        let err =
            Config::from_toml("[device]\nformat = \"rpm\"\n", Path::new("c.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat { .. }));
    }

    #[test]
    fn test_load_missing_default_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("absent.toml"), false).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("absent.toml"), true).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgdelta.toml");
        fs::write(
            &path,
            "[device]\nrelease = \"23.05.5\"\ntarget = \"ath79/generic\"\n[report]\ncolor = true\n",
        )
        .unwrap();

        let args = CliArgs::parse_from([
            "pkgdelta",
            "--config",
            path.to_str().unwrap(),
            "-r",
            "SNAPSHOT",
            "--no-color",
            "--db",
            "/tmp/status",
            "--format",
            "opkg",
            "-k",
        ]);
        let config = Config::from_cli(&args).unwrap();
        assert_eq!(config.device.release.as_deref(), Some("SNAPSHOT"));
        assert_eq!(config.device.target.as_deref(), Some("ath79/generic"));
        assert!(!config.report.color);
        assert_eq!(config.paths.opkg_status, PathBuf::from("/tmp/status"));
        assert_eq!(config.database_format().unwrap(), Some(DatabaseFormat::Opkg));
        assert!(config.keep);
    }

    #[test]
    fn test_json_and_stdout_ledger_conflict() {
        let args = CliArgs::parse_from(["pkgdelta", "--json", "-o", "-"]);
        let err = Config::default().apply_cli(&args).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingOptions { .. }));
    }

    fn detected() -> DeviceInfo {
        DeviceInfo {
            release: Some("23.05.3".to_string()),
            target: Some("ath79/generic".to_string()),
            arch: Some("mips_24kc".to_string()),
            board: Some("tplink,archer-c7-v2".to_string()),
        }
    }

    #[test]
    fn test_resolve_platform_from_device() {
        let platform = Config::default().resolve_platform(&detected()).unwrap();
        assert_eq!(platform.channel, ReleaseChannel::parse("23.05.3"));
        assert_eq!(platform.target, "ath79/generic");
        assert_eq!(platform.profile, "tplink_archer-c7-v2");
    }

    #[test]
    fn test_resolve_platform_overrides_win() {
        let mut config = Config::default();
        config.device.release = Some("SNAPSHOT".to_string());
        config.device.profile = Some("generic".to_string());
        let platform = config.resolve_platform(&detected()).unwrap();
        assert!(platform.channel.is_snapshot());
        assert_eq!(platform.profile, "generic");
    }

    #[test]
    fn test_resolve_platform_missing_field() {
        let err = Config::default()
            .resolve_platform(&DeviceInfo::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDeviceField { field: "release" }));
    }
}
