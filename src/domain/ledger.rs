//! User package ledger

use super::{Classification, Tag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of the package ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Package name
    pub name: String,
    /// Primary suffix tag, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    /// World-file constraint shown in place of a tag for pinned packages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    /// Top-level or dependency; `None` for packages that are not installed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Direct dependency names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
    /// Installed version, if installed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    /// Version in the target release indices, if listed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
}

impl LedgerEntry {
    /// Creates an untagged entry
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            pin: None,
            classification: None,
            depends: Vec::new(),
            installed_version: None,
            target_version: None,
        }
    }

    /// Name plus pin constraint, or name plus `#tag`
    pub fn display_name(&self) -> String {
        match (self.tag, &self.pin) {
            (Some(Tag::Pinned), Some(pin)) => format!("{}{}", self.name, pin),
            (Some(tag), _) => format!("{}{}", self.name, tag),
            (None, _) => self.name.clone(),
        }
    }

    /// Text that makes two entries distinct in the ledger
    pub fn suffix(&self) -> String {
        match (self.tag, &self.pin) {
            (Some(Tag::Pinned), Some(pin)) => pin.clone(),
            (Some(tag), _) => tag.to_string(),
            (None, _) => String::new(),
        }
    }

    /// Ledger line: `name[#tag]\tdep1:dep2`, or just the name when compact
    pub fn to_line(&self, compact: bool) -> String {
        if compact {
            self.name.clone()
        } else {
            format!("{}\t{}", self.display_name(), self.depends.join(":"))
        }
    }

    /// Returns true if the installed version differs from the target's
    pub fn has_version_drift(&self) -> bool {
        matches!(
            (&self.installed_version, &self.target_version),
            (Some(installed), Some(target)) if installed != target
        )
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Ordered, deduplicated set of ledger entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Entries sorted by name, then suffix
    pub entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Ledger file contents, one entry per line
    pub fn render(&self, compact: bool) -> String {
        let mut out = String::new();
        let mut last: Option<String> = None;
        for entry in &self.entries {
            let line = entry.to_line(compact);
            // compact lines drop the suffix, so distinct entries can collapse
            if last.as_deref() == Some(line.as_str()) {
                continue;
            }
            out.push_str(&line);
            out.push('\n');
            last = Some(line);
        }
        out
    }

    /// Names in ledger order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Looks up an entry by name
    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entries whose installed and target versions differ
    pub fn drifted(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(|e| e.has_version_drift())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ledger has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
