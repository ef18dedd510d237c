//! Report assembly
//!
//! Merges the classification and every annotation stream onto the user package
//! set. Each entry keeps one primary tag, chosen by `Tag` order.

use crate::domain::{
    Annotation, Classification, InstalledPackages, Ledger, LedgerEntry, Tag, TargetRelease,
};
use crate::graph::{DependencyGraph, Resolution};
use std::collections::{BTreeMap, BTreeSet};

/// Which optional groups make it into the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Include packages pulled in by other packages
    pub include_deps: bool,
    /// Include packages that are part of the target's default set
    pub include_defaults: bool,
    /// Add target defaults that are not installed
    pub include_missing: bool,
}

/// Build the ordered, deduplicated ledger
///
/// Pinned packages are always included. `target` supplies versions for drift
/// reporting and may be absent.
pub fn assemble(
    installed: &InstalledPackages,
    graph: &DependencyGraph,
    resolution: &Resolution,
    annotations: &[Annotation],
    target: Option<&TargetRelease>,
    options: AssemblyOptions,
) -> Ledger {
    let mut tags: BTreeMap<&str, BTreeSet<Tag>> = BTreeMap::new();
    for annotation in annotations {
        tags.entry(annotation.package.as_str())
            .or_default()
            .insert(annotation.tag);
    }

    let mut entries: Vec<LedgerEntry> = Vec::new();
    for name in resolution.user_set(options.include_deps) {
        let Some(record) = installed.get(name) else {
            continue;
        };
        let mut found = tags.get(name).cloned().unwrap_or_default();
        if record.is_pinned() {
            found.insert(Tag::Pinned);
        } else if found.contains(&Tag::Default) && !options.include_defaults {
            continue;
        }

        let classification = resolution.get(name);
        if classification == Some(Classification::Dependency) && options.include_deps {
            found.insert(Tag::Dependency);
        }

        let mut entry = LedgerEntry::new(name);
        entry.tag = found.first().copied();
        entry.pin = record.pin_constraint.clone();
        entry.classification = classification;
        entry.depends = graph.dependencies(name).to_vec();
        entry.installed_version = Some(record.version.clone());
        entry.target_version = target
            .and_then(|t| t.index_version(name))
            .map(str::to_string);
        entries.push(entry);
    }

    if options.include_missing {
        for annotation in annotations.iter().filter(|a| a.tag == Tag::Missing) {
            let mut entry = LedgerEntry::new(annotation.package.as_str());
            entry.tag = Some(Tag::Missing);
            entry.target_version = target
                .and_then(|t| t.index_version(&annotation.package))
                .map(str::to_string);
            entries.push(entry);
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.suffix().cmp(&b.suffix())));
    entries.dedup_by(|a, b| a.name == b.name && a.suffix() == b.suffix());

    tracing::debug!(entries = entries.len(), "assembled ledger");
    Ledger { entries }
}
