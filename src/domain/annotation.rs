//! Classification and annotation tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a package was asked for or pulled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Nothing installed depends on it
    TopLevel,
    /// Some other installed package depends on it
    Dependency,
}

/// Ledger suffix tag
///
/// Variants are declared in precedence order: when several tags apply to one
/// package the smallest one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    /// Version constraint from the world file
    Pinned,
    /// Target default that is not installed
    Missing,
    /// Provides a target default that is not installed itself
    Replaced,
    /// Absent from both target package indices
    NotAvailable,
    /// Upstream renamed the package between releases
    Renamed,
    /// Failed to build for the target release
    BuildFailed,
    /// Part of the target's default package set
    Default,
    /// Pulled in by another installed package
    Dependency,
}

impl Tag {
    /// Suffix label as written after `#` in the ledger
    pub fn label(&self) -> &'static str {
        match self {
            Tag::Pinned => "pinned",
            Tag::Missing => "missing",
            Tag::Replaced => "replaced",
            Tag::NotAvailable => "not-available",
            Tag::Renamed => "renamed",
            Tag::BuildFailed => "build-failed",
            Tag::Default => "default",
            Tag::Dependency => "dependency",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.label())
    }
}

/// A finding about one package produced by an analysis stage
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Annotation {
    /// Package the tag attaches to
    pub package: String,
    /// What was found
    pub tag: Tag,
    /// Other package involved: the replaced default, the rename target, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

impl Annotation {
    /// Creates an annotation without a related package
    pub fn new(package: impl Into<String>, tag: Tag) -> Self {
        Self {
            package: package.into(),
            tag,
            related: None,
        }
    }

    /// Creates an annotation referring to a second package
    pub fn with_related(package: impl Into<String>, tag: Tag, related: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            tag,
            related: Some(related.into()),
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tag, &self.related) {
            (Tag::Replaced, Some(default)) => {
                write!(f, "{}{} (provides default {})", self.package, self.tag, default)
            }
            (Tag::Renamed, Some(target)) => write!(f, "{} -> {}", self.package, target),
            (_, Some(related)) => write!(f, "{}{} ({})", self.package, self.tag, related),
            (_, None) => write!(f, "{}{}", self.package, self.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_precedence_order() {
        let mut tags = vec![
            Tag::Default,
            Tag::BuildFailed,
            Tag::Renamed,
            Tag::NotAvailable,
            Tag::Replaced,
            Tag::Missing,
            Tag::Pinned,
            Tag::Dependency,
        ];
        tags.sort();
        assert_eq!(tags.first(), Some(&Tag::Pinned));
        assert_eq!(tags.last(), Some(&Tag::Dependency));
        assert!(Tag::Missing < Tag::Replaced);
        assert!(Tag::NotAvailable < Tag::Renamed);
        assert!(Tag::BuildFailed < Tag::Default);
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::NotAvailable.to_string(), "#not-available");
        assert_eq!(Tag::BuildFailed.to_string(), "#build-failed");
    }

    #[test]
    fn test_annotation_display() {
        let renamed = Annotation::with_related(
            "libustream-wolfssl20201210",
            Tag::Renamed,
            "libustream-wolfssl",
        );
        assert_eq!(renamed.to_string(), "libustream-wolfssl20201210 -> libustream-wolfssl");

        let replaced = Annotation::with_related("dnsmasq-full", Tag::Replaced, "dnsmasq");
        assert_eq!(
            replaced.to_string(),
            "dnsmasq-full#replaced (provides default dnsmasq)"
        );

        let missing = Annotation::new("ppp", Tag::Missing);
        assert_eq!(missing.to_string(), "ppp#missing");
    }

    #[test]
    fn test_serde_tag_kebab_case() {
        let json = serde_json::to_string(&Tag::NotAvailable).unwrap();
        assert_eq!(json, "\"not-available\"");
    }
}
