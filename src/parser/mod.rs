//! Package database parsers for the on-device package managers
//!
//! This module provides parsers for:
//! - apk installed database (`/lib/apk/db/installed`)
//! - opkg status file (`/usr/lib/opkg/status`)
//!
//! plus the package specification helpers shared by both formats and the world file.

mod apk;
mod opkg;
mod stanza;

pub use apk::ApkDatabaseParser;
pub use opkg::OpkgDatabaseParser;
pub use stanza::{parse_stanzas, Stanza};

use crate::domain::InstalledPackages;
use crate::error::ParseError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

/// First character that starts a version constraint in a package specification
static CONSTRAINT_START_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[@~<>=]").unwrap());

/// Parenthesised version qualifier, e.g. ` (>= 2.1)`
static PAREN_QUALIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// Splits `name<constraint>` on the first of `@ ~ < > =`
///
/// The constraint is returned verbatim, operator included, so it can be written back
/// out unchanged.
pub fn split_spec(spec: &str) -> (&str, Option<&str>) {
    let spec = spec.trim();
    match CONSTRAINT_START_RE.find(spec) {
        Some(m) => (spec[..m.start()].trim_end(), Some(&spec[m.start()..])),
        None => (spec, None),
    }
}

/// Bare package name of a dependency specification
///
/// Strips parenthesised qualifiers and inline constraints. Returns `None` for
/// conflict markers (`!name`) and empty specifications.
pub fn dependency_name(spec: &str) -> Option<&str> {
    let spec = spec.trim();
    if spec.is_empty() || spec.starts_with('!') {
        return None;
    }
    let bare = match PAREN_QUALIFIER_RE.find(spec) {
        Some(m) => &spec[..m.start()],
        None => spec,
    };
    let (name, _) = split_spec(bare);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// On-device package database layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseFormat {
    /// apk-tools installed database
    Apk,
    /// opkg status file
    Opkg,
}

impl DatabaseFormat {
    /// Returns all supported formats, preferred first
    pub fn all() -> &'static [DatabaseFormat] {
        &[DatabaseFormat::Apk, DatabaseFormat::Opkg]
    }

    /// Guess the format from the first field of the database
    ///
    /// apk keys are single letters (`P:`), opkg keys are words (`Package:`).
    pub fn sniff(content: &str) -> Option<DatabaseFormat> {
        let line = content.lines().find(|line| !line.trim().is_empty())?;
        let (key, _) = line.split_once(':')?;
        match key.trim() {
            "" => None,
            key if key.len() == 1 => Some(DatabaseFormat::Apk),
            _ => Some(DatabaseFormat::Opkg),
        }
    }
}

impl fmt::Display for DatabaseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseFormat::Apk => write!(f, "apk"),
            DatabaseFormat::Opkg => write!(f, "opkg"),
        }
    }
}

impl FromStr for DatabaseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apk" => Ok(DatabaseFormat::Apk),
            "opkg" => Ok(DatabaseFormat::Opkg),
            other => Err(format!("unknown database format '{}'", other)),
        }
    }
}

/// Trait for parsing an installed-package database
pub trait DatabaseParser {
    /// Parse the whole database; `path` is used for diagnostics only
    fn parse(&self, content: &str, path: &Path) -> Result<InstalledPackages, ParseError>;

    /// Returns the format this parser handles
    fn format(&self) -> DatabaseFormat;
}

/// Get a database parser for the specified format
pub fn get_parser(format: DatabaseFormat) -> Box<dyn DatabaseParser> {
    match format {
        DatabaseFormat::Apk => Box::new(ApkDatabaseParser),
        DatabaseFormat::Opkg => Box::new(OpkgDatabaseParser),
    }
}
