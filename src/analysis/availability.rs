//! Availability and rename checks against the target indices

use crate::domain::{Annotation, InstalledPackages, PackageChange, Tag, TargetRelease};
use crate::error::ReferenceMissing;
use crate::parser::split_spec;
use std::collections::{BTreeSet, HashSet};

/// Pseudo-package standing for the kernel image itself
pub const KERNEL: &str = "kernel";

/// Flag ledger packages the target release cannot provide
///
/// `kernel` and target defaults are skipped. A name counts as available when
/// either index lists it, an ABI-suffixed variant of it, or anything reachable
/// through the provides relation of the target indices or the installed record.
/// Returns nothing when no index could be fetched.
pub fn check_availability<'a, I>(
    names: I,
    installed: &InstalledPackages,
    target: &TargetRelease,
) -> Vec<Annotation>
where
    I: IntoIterator<Item = &'a str>,
{
    if !target.has_index() {
        return Vec::new();
    }

    let mut annotations: Vec<Annotation> = names
        .into_iter()
        .filter(|name| *name != KERNEL && !target.default_packages.contains(*name))
        .filter(|name| {
            let mut visited = HashSet::new();
            !is_available(name, installed, target, &mut visited)
        })
        .map(|name| Annotation::new(name, Tag::NotAvailable))
        .collect();
    annotations.sort();
    annotations.dedup();
    annotations
}

fn is_available(
    name: &str,
    installed: &InstalledPackages,
    target: &TargetRelease,
    visited: &mut HashSet<String>,
) -> bool {
    if !visited.insert(name.to_string()) {
        return false;
    }
    if target.index_contains(name) || has_abi_variant(name, installed, target) {
        return true;
    }

    let mut aliases: Vec<String> = target
        .index_providers(name)
        .into_iter()
        .map(str::to_string)
        .collect();
    if let Some(record) = installed.get(name) {
        aliases.extend(
            record
                .provides
                .iter()
                .map(|p| split_spec(p).0)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        );
    }

    aliases
        .iter()
        .any(|alias| is_available(alias, installed, target, visited))
}

/// Provides entries of the target indices whose provider neither index lists
///
/// Only the aliases of the checked names are inspected, so the warnings stay
/// relevant to the ledger.
pub fn check_aliases<'a, I>(names: I, target: &TargetRelease) -> Vec<ReferenceMissing>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut missing: Vec<ReferenceMissing> = names
        .into_iter()
        .filter(|name| *name != KERNEL)
        .flat_map(|name| {
            target
                .index_providers(name)
                .into_iter()
                .filter(|provider| !target.index_contains(provider))
                .map(move |provider| {
                    ReferenceMissing::new(provider, format!("provides entry for '{}'", name))
                })
        })
        .collect();
    missing.sort_by(|a, b| (&a.name, &a.origin).cmp(&(&b.name, &b.origin)));
    missing.dedup();
    missing
}

/// Index lists the package under a different ABI generation
fn has_abi_variant(name: &str, installed: &InstalledPackages, target: &TargetRelease) -> bool {
    let Some(record) = installed.get(name) else {
        return false;
    };
    if record.abi_version.is_none() {
        return false;
    }
    let base = record.base_name();
    if target.index_contains(base) {
        return true;
    }
    target
        .arch_index
        .iter()
        .chain(target.platform_index.iter())
        .flat_map(|index| index.packages.keys())
        .filter_map(|candidate| candidate.strip_prefix(base))
        .any(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Report upstream renames of ledger packages
///
/// Upstream tables sometimes repeat a source; only the first entry per source
/// is used. Returns nothing when the rename table could not be fetched.
pub fn check_renames<'a, I>(names: I, target: &TargetRelease) -> Vec<Annotation>
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(changes) = &target.package_changes else {
        return Vec::new();
    };
    let names: BTreeSet<&str> = names.into_iter().collect();

    let mut seen = HashSet::new();
    let mut annotations: Vec<Annotation> = changes
        .iter()
        .filter(|change| seen.insert(change.source.as_str()))
        .filter(|change| names.contains(change.source.as_str()))
        .map(rename_annotation)
        .collect();
    annotations.sort();
    annotations
}

fn rename_annotation(change: &PackageChange) -> Annotation {
    if change.target.is_empty() {
        Annotation::new(change.source.as_str(), Tag::Renamed)
    } else {
        Annotation::with_related(change.source.as_str(), Tag::Renamed, change.target.as_str())
    }
}
