//! Top-level package resolution
//!
//! A package is top-level when no other installed package depends on it, after ABI
//! normalization. World-file pins force a package into the user set regardless.

use super::DependencyGraph;
use crate::domain::{Classification, InstalledPackages};
use std::collections::{BTreeMap, BTreeSet};

/// Classification of every installed package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Classification by package name
    pub classifications: BTreeMap<String, Classification>,
    /// Packages carrying a world-file constraint
    pub pinned: BTreeSet<String>,
}

impl Resolution {
    /// Top-level packages
    pub fn top_level(&self) -> impl Iterator<Item = &str> {
        self.by_class(Classification::TopLevel)
    }

    /// Packages something else depends on
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.by_class(Classification::Dependency)
    }

    /// Names that belong in the user ledger: top-level plus pinned, and every
    /// dependency when `include_deps` is set
    pub fn user_set(&self, include_deps: bool) -> BTreeSet<&str> {
        let mut set: BTreeSet<&str> = if include_deps {
            self.classifications.keys().map(String::as_str).collect()
        } else {
            self.top_level().collect()
        };
        set.extend(self.pinned.iter().map(String::as_str));
        set
    }

    /// Classification of one package
    pub fn get(&self, name: &str) -> Option<Classification> {
        self.classifications.get(name).copied()
    }

    fn by_class(&self, class: Classification) -> impl Iterator<Item = &str> {
        self.classifications
            .iter()
            .filter(move |(_, c)| **c == class)
            .map(|(name, _)| name.as_str())
    }
}

/// Classifies installed packages against their dependency graph
pub struct TopLevelResolver<'a> {
    installed: &'a InstalledPackages,
    graph: &'a DependencyGraph,
}

impl<'a> TopLevelResolver<'a> {
    /// Create a resolver over a graph built from `installed`
    pub fn new(installed: &'a InstalledPackages, graph: &'a DependencyGraph) -> Self {
        Self { installed, graph }
    }

    /// Classify a single package
    pub fn classify(&self, name: &str) -> Classification {
        if self.graph.dependents(name).is_empty() {
            Classification::TopLevel
        } else {
            Classification::Dependency
        }
    }

    /// Classify every installed package
    pub fn resolve(&self) -> Resolution {
        let mut resolution = Resolution::default();
        for record in self.installed.iter() {
            resolution
                .classifications
                .insert(record.name.clone(), self.classify(&record.name));
            if record.is_pinned() {
                resolution.pinned.insert(record.name.clone());
            }
        }
        tracing::debug!(
            top_level = resolution.top_level().count(),
            dependencies = resolution.dependencies().count(),
            pinned = resolution.pinned.len(),
            "classified installed packages"
        );
        resolution
    }
}
