//! Integration tests for pkgdelta
//!
//! These tests verify:
//! - The full scan pipeline against an in-memory document source
//! - Top-level resolution, pins and ABI normalization on real database layouts
//! - Default reconciliation, renames, availability and build failures
//! - Fatal and non-fatal fetch failure handling

use pkgdelta::config::Config;
use pkgdelta::domain::Tag;
use pkgdelta::error::AppError;
use pkgdelta::orchestrator::{Orchestrator, ScanReport, EXIT_BUILD_FAILURE, EXIT_OK};
use pkgdelta::registry::StaticSource;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const PROFILES_URL: &str = "https://dl/releases/23.05.5/targets/ath79/generic/profiles.json";
const ARCH_INDEX_URL: &str = "https://api/releases/23.05.5/packages/mips_24kc-index.json";
const PLATFORM_INDEX_URL: &str = "https://api/releases/23.05.5/targets/ath79/generic/index.json";
const OVERVIEW_URL: &str = "https://api/overview.json";
const BOM_URL: &str =
    "https://dl/releases/23.05.5/targets/ath79/generic/openwrt-23.05.5-ath79-generic.bom.cdx.json";
const FAILLOGS_URL: &str = "https://dl/releases/faillogs-23.05/mips_24kc/packages/";

const RELEASE_FILE: &str = "\
DISTRIB_ID='OpenWrt'
DISTRIB_RELEASE='23.05.3'
DISTRIB_TARGET='ath79/generic'
DISTRIB_ARCH='mips_24kc'
";

/// Test fixture directory with a release file and board name
fn create_test_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::write(dir.path().join("openwrt_release"), RELEASE_FILE).unwrap();
    fs::write(dir.path().join("board_name"), "tplink,archer-c7-v2\n").unwrap();
    dir
}

/// Configuration reading everything from `dir` and targeting 23.05.5
fn config_for(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.apk_db = dir.join("installed");
    config.paths.opkg_status = dir.join("status");
    config.paths.world = dir.join("world");
    config.paths.release_file = dir.join("openwrt_release");
    config.paths.board_name = dir.join("board_name");
    config.paths.output = dir.join("installed_packages.txt");
    config.upstream.downloads = "https://dl".to_string();
    config.upstream.api = "https://api".to_string();
    config.upstream.overview = OVERVIEW_URL.to_string();
    config.device.release = Some("23.05.5".to_string());
    config
}

fn profiles(defaults: &[&str]) -> String {
    format!(
        r#"{{
            "arch_packages": "mips_24kc",
            "default_packages": {},
            "version_code": "r24106-10cc5fcd00",
            "linux_kernel": {{"version": "5.15.167"}},
            "profiles": {{"tplink_archer-c7-v2": {{
                "device_packages": [],
                "images": [{{
                    "name": "{image}",
                    "type": "sysupgrade"
                }}]
            }}}}
        }}"#,
        serde_json::to_string(defaults).unwrap(),
        image = "openwrt-23.05.5-ath79-generic-tplink_archer-c7-v2-squashfs-sysupgrade.bin",
    )
}

fn index(packages: &[&str]) -> String {
    let packages: serde_json::Map<String, serde_json::Value> = packages
        .iter()
        .map(|name| (name.to_string(), serde_json::Value::from("1.0-r1")))
        .collect();
    serde_json::json!({ "architecture": "mips_24kc", "packages": packages }).to_string()
}

const OVERVIEW: &str = r#"{
    "latest": ["23.05.5"],
    "branches": {
        "23.05": {
            "versions": ["23.05.5", "23.05.4"],
            "package_changes": [
                {"source": "auc", "target": "owut"},
                {"source": "auc", "target": "owut"}
            ]
        },
        "SNAPSHOT": {"versions": ["SNAPSHOT"], "package_changes": []}
    }
}"#;

/// Every document served, with the given defaults and index contents
fn full_source(defaults: &[&str], packages: &[&str]) -> StaticSource {
    StaticSource::new()
        .with(PROFILES_URL, profiles(defaults))
        .with(ARCH_INDEX_URL, index(packages))
        .with(PLATFORM_INDEX_URL, index(&[]))
        .with(OVERVIEW_URL, OVERVIEW)
        .with(
            BOM_URL,
            r#"{"components": [{"name": "kernel", "version": "5.15.167"}]}"#,
        )
}

async fn scan(config: Config, source: StaticSource) -> Result<ScanReport, AppError> {
    Orchestrator::with_source(config, Arc::new(source)).run().await
}

mod top_level_resolution {
    use super::*;

    const CHAIN: &str = "\
P:A
V:1.0-r1
D:B

P:B
V:1.0-r1
D:C

P:C
V:1.0-r1

";

    /// A depends on B, B on C: only A was asked for
    #[tokio::test]
    async fn test_chain_without_dependencies() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), CHAIN).unwrap();

        let report = scan(config_for(dir.path()), full_source(&[], &["A", "B", "C"]))
            .await
            .unwrap();

        assert_eq!(report.ledger.names().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(report.top_level_count, 1);
        assert_eq!(report.exit_code(), EXIT_OK);
        assert_eq!(
            fs::read_to_string(dir.path().join("installed_packages.txt")).unwrap(),
            "A\tB\n"
        );
    }

    #[tokio::test]
    async fn test_chain_with_dependencies() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), CHAIN).unwrap();
        let mut config = config_for(dir.path());
        config.report.include_deps = true;

        let report = scan(config, full_source(&[], &["A", "B", "C"]))
            .await
            .unwrap();

        assert_eq!(report.ledger.names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("installed_packages.txt")).unwrap(),
            "A\tB\nB#dependency\tC\nC#dependency\t\n"
        );
    }

    /// A pinned dependency is in the ledger even without -d
    #[tokio::test]
    async fn test_pin_forces_inclusion() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), CHAIN).unwrap();
        fs::write(dir.path().join("world"), "A\nC=1.0-r1\n").unwrap();

        let report = scan(config_for(dir.path()), full_source(&[], &["A", "B", "C"]))
            .await
            .unwrap();

        assert_eq!(report.ledger.names().collect::<Vec<_>>(), vec!["A", "C"]);
        assert_eq!(report.ledger.get("C").unwrap().display_name(), "C=1.0-r1");
    }

    const ABI: &str = "\
P:libfoo7
V:7.0-r1
g:openwrt:abiversion=7

P:app
V:1.0-r1
D:libfoo7

";

    /// With normalization the suffixed library is a dependency of `app`
    #[tokio::test]
    async fn test_abi_suffix_normalized() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), ABI).unwrap();

        let report = scan(config_for(dir.path()), full_source(&[], &["app", "libfoo8"]))
            .await
            .unwrap();

        assert_eq!(report.ledger.names().collect::<Vec<_>>(), vec!["app"]);
    }

    #[tokio::test]
    async fn test_opkg_status_database() {
        let dir = create_test_dir();
        fs::write(
            dir.path().join("status"),
            "Package: luci\n\
             Version: git-23.051.66410-a505bb1\n\
             Depends: libc, luci-base (>= 23)\n\
             Status: install user installed\n\
             \n\
             Package: luci-base\n\
             Version: git-23.051.66410-a505bb1\n\
             Depends: libc\n\
             Status: install ok installed\n\
             \n\
             Package: libc\n\
             Version: 1.2.4-4\n\
             Status: install ok installed\n\
             \n\
             Package: nano\n\
             Version: 7.2-2\n\
             Status: deinstall ok not-installed\n\
             \n",
        )
        .unwrap();

        let report = scan(
            config_for(dir.path()),
            full_source(&["libc"], &["luci", "luci-base", "libc"]),
        )
        .await
        .unwrap();

        assert_eq!(report.database.to_string(), "opkg");
        assert_eq!(report.installed_count, 3);
        assert_eq!(report.ledger_text, "luci\tlibc:luci-base\n");
    }
}

mod release_checks {
    use super::*;

    const DATABASE: &str = "\
P:libfoo-alt
V:2.0-r1
p:libfoo

P:auc
V:0.3.2-r1

P:luci-app-ddns
V:2.4.9-r1

P:cloudflared
V:2024.6.1-r1

";

    const PACKAGES: &[&str] = &["libfoo-alt", "owut", "cloudflared"];

    /// libfoo is a default; libfoo-alt provides it
    #[tokio::test]
    async fn test_replaced_default() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();

        let report = scan(config_for(dir.path()), full_source(&["libfoo"], PACKAGES))
            .await
            .unwrap();

        let replaced: Vec<_> = report.annotations_with(Tag::Replaced).collect();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[0].package, "libfoo-alt");
        assert_eq!(replaced[0].related.as_deref(), Some("libfoo"));
        assert!(report.annotations_with(Tag::Missing).next().is_none());
        assert!(report.ledger.get("libfoo").is_none());
        assert_eq!(report.ledger.get("libfoo-alt").unwrap().tag, Some(Tag::Replaced));
    }

    #[tokio::test]
    async fn test_missing_default_added_on_request() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();
        let mut config = config_for(dir.path());
        config.report.include_missing = true;

        let report = scan(config, full_source(&["ppp"], PACKAGES)).await.unwrap();

        assert_eq!(report.ledger.get("ppp").unwrap().display_name(), "ppp#missing");
    }

    /// The overview lists the auc rename twice
    #[tokio::test]
    async fn test_duplicate_rename_reported_once() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();

        let report = scan(config_for(dir.path()), full_source(&[], PACKAGES))
            .await
            .unwrap();

        let renamed: Vec<_> = report.annotations_with(Tag::Renamed).collect();
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].package, "auc");
        assert_eq!(renamed[0].related.as_deref(), Some("owut"));
    }

    #[tokio::test]
    async fn test_not_available() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();

        let report = scan(config_for(dir.path()), full_source(&[], PACKAGES))
            .await
            .unwrap();

        let entry = report.ledger.get("luci-app-ddns").unwrap();
        assert_eq!(entry.tag, Some(Tag::NotAvailable));
        assert_eq!(entry.display_name(), "luci-app-ddns#not-available");
        assert_eq!(report.release.kernel_version.as_deref(), Some("5.15.167"));
        assert_eq!(report.release.images.len(), 1);
    }

    #[tokio::test]
    async fn test_installed_build_failure_blocks_upgrade() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();
        let mut config = config_for(dir.path());
        config.report.check_failures = true;
        let listing = r#"<table>
<tr><td class="n"><a href="../">Parent directory</a>/</td></tr>
<tr><td class="n"><a href="cloudflared/">cloudflared</a>/</td></tr>
<tr><td class="n"><a href="rust/">rust</a>/</td></tr>
</table>"#;

        let report = scan(config, full_source(&[], PACKAGES).with(FAILLOGS_URL, listing))
            .await
            .unwrap();

        let failures = report.build_failures.as_ref().unwrap();
        let installed: Vec<_> = failures.installed().map(|f| f.name.as_str()).collect();
        assert_eq!(installed, vec!["cloudflared"]);
        assert_eq!(failures.failures.len(), 2);
        assert_eq!(report.exit_code(), EXIT_BUILD_FAILURE);
    }

    /// No listing published for the branch: no known failures
    #[tokio::test]
    async fn test_absent_build_failure_listing() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();
        let mut config = config_for(dir.path());
        config.report.check_failures = true;

        let report = scan(config, full_source(&[], PACKAGES)).await.unwrap();

        assert!(report.build_failures.as_ref().unwrap().is_empty());
        assert_eq!(report.exit_code(), EXIT_OK);
    }
}

mod fetch_failures {
    use super::*;

    const DATABASE: &str = "P:htop\nV:3.3.0-r1\n\n";

    #[tokio::test]
    async fn test_platform_failure_lists_valid_releases() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();

        let source = StaticSource::new().with(OVERVIEW_URL, OVERVIEW);
        let err = scan(config_for(dir.path()), source).await.unwrap_err();

        match &err {
            AppError::PlatformUnavailable { valid_releases, .. } => {
                assert!(valid_releases.contains(&"23.05.4".to_string()));
                assert!(valid_releases.contains(&"SNAPSHOT".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("valid releases:"));
        assert!(!dir.path().join("installed_packages.txt").exists());
    }

    #[tokio::test]
    async fn test_platform_failure_without_overview() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();

        let err = scan(config_for(dir.path()), StaticSource::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::PlatformUnavailable { ref valid_releases, .. } if valid_releases.is_empty()
        ));
        assert!(!err.to_string().contains("valid releases:"));
    }

    /// Without indices nothing is flagged, and the report says so
    #[tokio::test]
    async fn test_missing_indices_are_unverified() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();

        let source = StaticSource::new().with(PROFILES_URL, profiles(&[]));
        let report = scan(config_for(dir.path()), source).await.unwrap();

        assert!(report.annotations_with(Tag::NotAvailable).next().is_none());
        assert!(report.has_unverified());
        assert_eq!(report.exit_code(), 2);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.to_string().starts_with("could not verify package availability")));
        assert_eq!(report.ledger_text, "htop\t\n");
    }

    /// A second run with a filled cache does not need the network
    #[tokio::test]
    async fn test_cache_dir_reused() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();
        let cache = TempDir::new().unwrap();
        let mut config = config_for(dir.path());
        config.paths.cache_dir = Some(cache.path().to_path_buf());

        let first = scan(config.clone(), full_source(&[], &["htop"])).await.unwrap();
        assert_eq!(first.exit_code(), EXIT_OK);

        let second = scan(config, StaticSource::new()).await.unwrap();
        assert_eq!(second.ledger, first.ledger);
        assert_eq!(second.exit_code(), EXIT_OK);
    }

    #[tokio::test]
    async fn test_keep_preserves_documents() {
        let dir = create_test_dir();
        fs::write(dir.path().join("installed"), DATABASE).unwrap();
        let mut config = config_for(dir.path());
        config.keep = true;

        let report = scan(config, full_source(&[], &["htop"])).await.unwrap();

        let kept = report.kept_dir.clone().unwrap();
        assert!(kept.is_dir());
        assert!(fs::read_dir(&kept).unwrap().count() >= 1);
        fs::remove_dir_all(kept).unwrap();
    }
}
