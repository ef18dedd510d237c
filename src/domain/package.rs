//! Installed package records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One installed package as recorded by the on-device package manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package name, unique within one database
    pub name: String,
    /// Installed version (diagnostic only)
    pub version: String,
    /// ABI generation suffix, e.g. `20240329` for `libubox20240329`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi_version: Option<String>,
    /// Dependency specifications in declaration order, constraints included
    pub depends_raw: Vec<String>,
    /// Names this package declares it can stand in for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    /// Constraint from the world file, e.g. `=1.2.3-r1` or `@testing`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_constraint: Option<String>,
}

impl PackageRecord {
    /// Creates a record with no dependencies
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            abi_version: None,
            depends_raw: Vec::new(),
            provides: Vec::new(),
            pin_constraint: None,
        }
    }

    /// Sets the dependency specifications (builder pattern)
    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_raw = depends.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the provides list (builder pattern)
    pub fn with_provides<I, S>(mut self, provides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides = provides.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the ABI version suffix (builder pattern)
    pub fn with_abi_version(mut self, abi: impl Into<String>) -> Self {
        let abi = abi.into();
        self.abi_version = if abi.is_empty() { None } else { Some(abi) };
        self
    }

    /// Sets the world-file pin (builder pattern)
    pub fn with_pin(mut self, constraint: impl Into<String>) -> Self {
        let constraint = constraint.into();
        self.pin_constraint = if constraint.is_empty() {
            None
        } else {
            Some(constraint)
        };
        self
    }

    /// Name with the ABI suffix removed
    ///
    /// `libubox20240329` with ABI version `20240329` becomes `libubox`. A name that
    /// does not end in its own suffix is returned unchanged.
    pub fn base_name(&self) -> &str {
        match &self.abi_version {
            Some(abi) => self
                .name
                .strip_suffix(abi.as_str())
                .filter(|base| !base.is_empty())
                .unwrap_or(&self.name),
            None => &self.name,
        }
    }

    /// Returns true if the world file pins this package
    pub fn is_pinned(&self) -> bool {
        self.pin_constraint.is_some()
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// All installed packages of one scan, keyed by name, plus database order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledPackages {
    records: BTreeMap<String, PackageRecord>,
    order: Vec<String>,
}

impl InstalledPackages {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record; returns false if the name was already present
    pub fn insert(&mut self, record: PackageRecord) -> bool {
        if self.records.contains_key(&record.name) {
            return false;
        }
        self.order.push(record.name.clone());
        self.records.insert(record.name.clone(), record);
        true
    }

    /// Looks up a record by exact name
    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.records.get(name)
    }

    /// Mutable lookup, used only while applying world-file pins
    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut PackageRecord> {
        self.records.get_mut(name)
    }

    /// Returns true if a package with this exact name is installed
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Records in lexical name order
    pub fn iter(&self) -> impl Iterator<Item = &PackageRecord> {
        self.records.values()
    }

    /// Names in the order the database listed them
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Number of installed packages
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is installed
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<PackageRecord> for InstalledPackages {
    fn from_iter<T: IntoIterator<Item = PackageRecord>>(iter: T) -> Self {
        let mut installed = InstalledPackages::new();
        for record in iter {
            installed.insert(record);
        }
        installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_abi_suffix() {
        let record =
            PackageRecord::new("libubox20240329", "2024.03.29").with_abi_version("20240329");
        assert_eq!(record.base_name(), "libubox");
    }

    #[test]
    fn test_base_name_without_suffix_in_name() {
        let record = PackageRecord::new("libubox", "2024.03.29").with_abi_version("20240329");
        assert_eq!(record.base_name(), "libubox");
    }

    #[test]
    fn test_base_name_never_empty() {
        let record = PackageRecord::new("20240329", "1").with_abi_version("20240329");
        assert_eq!(record.base_name(), "20240329");
    }

    #[test]
    fn test_empty_pin_is_not_a_pin() {
        let record = PackageRecord::new("luci", "1").with_pin("");
        assert!(!record.is_pinned());
        let record = PackageRecord::new("luci", "1").with_pin("=24.1");
        assert!(record.is_pinned());
    }

    #[test]
    fn test_installed_rejects_duplicates_and_keeps_order() {
        let mut installed = InstalledPackages::new();
        assert!(installed.insert(PackageRecord::new("zlib", "1")));
        assert!(installed.insert(PackageRecord::new("busybox", "1")));
        assert!(!installed.insert(PackageRecord::new("zlib", "2")));

        assert_eq!(installed.len(), 2);
        assert_eq!(installed.order(), &["zlib".to_string(), "busybox".to_string()]);
        let names: Vec<_> = installed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["busybox", "zlib"]);
        assert_eq!(installed.get("zlib").map(|r| r.version.as_str()), Some("1"));
    }

    #[test]
    fn test_display() {
        let record = PackageRecord::new("dnsmasq", "2.90-r3");
        assert_eq!(record.to_string(), "dnsmasq 2.90-r3");
    }
}
