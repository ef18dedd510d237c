//! Dependency graph over the installed packages
//!
//! Forward edges come straight from each record's depends list, reduced to bare
//! names. The inverse relation is built in a single pass the first time it is
//! queried and reused for every later query.

mod resolver;

pub use resolver::{Resolution, TopLevelResolver};

use crate::domain::InstalledPackages;
use crate::parser::{dependency_name, split_spec};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// Whether ABI suffixes are stripped before names are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbiNormalization {
    /// `libubox20240329` and `libubox` are the same node
    #[default]
    Enabled,
    /// Names are compared exactly as written
    Disabled,
}

/// Package to dependency adjacency with a lazily built inverse
#[derive(Debug)]
pub struct DependencyGraph {
    /// Package name to normalized dependency names
    forward: BTreeMap<String, BTreeSet<String>>,
    /// Package name to bare dependency names as declared, in order
    declared: BTreeMap<String, Vec<String>>,
    /// Package name to normalized names it provides
    provides: BTreeMap<String, BTreeSet<String>>,
    /// Suffixed or unsuffixed name to its ABI-free base name
    base_names: HashMap<String, String>,
    /// Normalized name to the packages depending on it
    inverse: OnceLock<BTreeMap<String, BTreeSet<String>>>,
}

impl DependencyGraph {
    /// Build the forward edges for every installed package
    pub fn build(installed: &InstalledPackages, normalization: AbiNormalization) -> Self {
        let mut base_names = HashMap::new();
        if normalization == AbiNormalization::Enabled {
            for record in installed.iter() {
                if let Some(abi) = &record.abi_version {
                    let base = record.base_name().to_string();
                    base_names.insert(format!("{}{}", base, abi), base.clone());
                    base_names.insert(record.name.clone(), base);
                }
            }
        }

        let mut graph = Self {
            forward: BTreeMap::new(),
            declared: BTreeMap::new(),
            provides: BTreeMap::new(),
            base_names,
            inverse: OnceLock::new(),
        };

        for record in installed.iter() {
            let mut declared: Vec<String> = Vec::new();
            for name in record.depends_raw.iter().filter_map(|d| dependency_name(d)) {
                if !declared.iter().any(|d| d == name) {
                    declared.push(name.to_string());
                }
            }
            let normalized = declared
                .iter()
                .map(|d| graph.normalize(d).to_string())
                .collect();
            let provided = record
                .provides
                .iter()
                .map(|p| split_spec(p).0)
                .filter(|p| !p.is_empty())
                .map(|p| graph.normalize(p).to_string())
                .collect();

            graph.forward.insert(record.name.clone(), normalized);
            graph.declared.insert(record.name.clone(), declared);
            graph.provides.insert(record.name.clone(), provided);
        }

        graph
    }

    /// ABI-free form of a name; unknown names are returned unchanged
    pub fn normalize<'a>(&'a self, name: &'a str) -> &'a str {
        self.base_names.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Bare dependency names of a package as declared; empty for unknown names
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.declared.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Normalized names a package provides
    pub fn provided_names(&self, name: &str) -> impl Iterator<Item = &str> {
        self.provides
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Installed packages that provide `name`, after normalization
    pub fn providers(&self, name: &str) -> BTreeSet<&str> {
        let key = self.normalize(name);
        self.provides
            .iter()
            .filter(|(_, provided)| provided.contains(key))
            .map(|(pkg, _)| pkg.as_str())
            .collect()
    }

    /// Installed packages that depend on `name`, directly or through a name it provides
    ///
    /// The package itself is never counted. Names that are not installed (virtual or
    /// dangling) yield an empty set.
    pub fn dependents(&self, name: &str) -> BTreeSet<&str> {
        let inverse = self.inverse();
        let mut keys: Vec<&str> = vec![self.normalize(name)];
        keys.extend(self.provided_names(name));

        keys.into_iter()
            .filter_map(|key| inverse.get(key))
            .flat_map(|set| set.iter().map(String::as_str))
            .filter(|dependent| *dependent != name)
            .collect()
    }

    /// Number of packages in the graph
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns true if the graph has no packages
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    fn inverse(&self) -> &BTreeMap<String, BTreeSet<String>> {
        self.inverse.get_or_init(|| {
            let mut inverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for (package, deps) in &self.forward {
                for dep in deps {
                    inverse
                        .entry(dep.clone())
                        .or_default()
                        .insert(package.clone());
                }
            }
            inverse
        })
    }
}
