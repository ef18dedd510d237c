//! Default package reconciliation

use crate::domain::{Annotation, InstalledPackages, Tag, TargetRelease};
use crate::graph::DependencyGraph;
use std::collections::{BTreeMap, BTreeSet};

/// Compare the target's default set with what is installed
///
/// Installed defaults are tagged `#default`. A default that is not installed is
/// `#missing`, unless installed packages provide it: then each provider is
/// tagged `#replaced` with the default it stands in for. The result is sorted
/// and free of duplicates.
pub fn reconcile_defaults(
    installed: &InstalledPackages,
    graph: &DependencyGraph,
    target: &TargetRelease,
) -> Vec<Annotation> {
    let mut by_base: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for record in installed.iter() {
        by_base
            .entry(graph.normalize(&record.name))
            .or_default()
            .push(&record.name);
    }

    let mut annotations = BTreeSet::new();
    for default in &target.default_packages {
        let present: Vec<&str> = if installed.contains(default) {
            vec![default.as_str()]
        } else {
            by_base.get(graph.normalize(default)).cloned().unwrap_or_default()
        };

        if !present.is_empty() {
            annotations.extend(present.into_iter().map(|name| Annotation::new(name, Tag::Default)));
            continue;
        }

        let providers = graph.providers(default);
        if providers.is_empty() {
            annotations.insert(Annotation::new(default.as_str(), Tag::Missing));
        } else {
            annotations.extend(providers.into_iter().map(|provider| {
                Annotation::with_related(provider, Tag::Replaced, default.as_str())
            }));
        }
    }

    let annotations: Vec<Annotation> = annotations.into_iter().collect();
    tracing::debug!(
        defaults = target.default_packages.len(),
        annotations = annotations.len(),
        "reconciled default packages"
    );
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PackageRecord, ReleaseChannel};
    use crate::graph::AbiNormalization;

    fn target(defaults: &[&str]) -> TargetRelease {
        let mut target =
            TargetRelease::new(ReleaseChannel::Snapshot, "x86/64", "x86_64", "generic");
        target.default_packages = defaults.iter().map(|s| s.to_string()).collect();
        target
    }

    fn run(installed: &InstalledPackages, defaults: &[&str]) -> Vec<Annotation> {
        let graph = DependencyGraph::build(installed, AbiNormalization::Enabled);
        reconcile_defaults(installed, &graph, &target(defaults))
    }

    #[test]
    fn test_replaced_by_provider() {
        let installed: InstalledPackages = vec![
            PackageRecord::new("libfoo-alt", "1").with_provides(["libfoo"]),
        ]
        .into_iter()
        .collect();

        let annotations = run(&installed, &["libfoo"]);
        assert_eq!(
            annotations,
            vec![Annotation::with_related("libfoo-alt", Tag::Replaced, "libfoo")]
        );
    }

    #[test]
    fn test_missing_and_default() {
        let installed: InstalledPackages = vec![PackageRecord::new("base-files", "1")]
            .into_iter()
            .collect();

        let annotations = run(&installed, &["ppp", "base-files"]);
        assert_eq!(
            annotations,
            vec![
                Annotation::new("base-files", Tag::Default),
                Annotation::new("ppp", Tag::Missing),
            ]
        );
    }

    #[test]
    fn test_every_provider_is_reported() {
        let installed: InstalledPackages = vec![
            PackageRecord::new("wpad-openssl", "1").with_provides(["wpad"]),
            PackageRecord::new("wpad-wolfssl", "1").with_provides(["wpad"]),
        ]
        .into_iter()
        .collect();

        let annotations = run(&installed, &["wpad"]);
        assert_eq!(annotations.len(), 2);
        assert!(annotations.iter().all(|a| a.tag == Tag::Replaced));
    }

    #[test]
    fn test_abi_suffixed_install_counts_as_default() {
        let installed: InstalledPackages = vec![
            PackageRecord::new("libustream-mbedtls20201210", "1").with_abi_version("20201210"),
        ]
        .into_iter()
        .collect();

        let annotations = run(&installed, &["libustream-mbedtls"]);
        assert_eq!(
            annotations,
            vec![Annotation::new("libustream-mbedtls20201210", Tag::Default)]
        );
    }

    #[test]
    fn test_idempotent() {
        let installed: InstalledPackages = vec![
            PackageRecord::new("dnsmasq-full", "1").with_provides(["dnsmasq"]),
            PackageRecord::new("luci", "1"),
        ]
        .into_iter()
        .collect();
        let graph = DependencyGraph::build(&installed, AbiNormalization::Enabled);
        let target = target(&["dnsmasq", "luci", "ppp"]);

        let first = reconcile_defaults(&installed, &graph, &target);
        let second = reconcile_defaults(&installed, &graph, &target);
        assert_eq!(first, second);
    }
}
