//! opkg status file parser
//!
//! Handles `/usr/lib/opkg/status` as written by opkg on pre-apk releases:
//! - `Package:` name
//! - `Version:` version
//! - `Depends:` comma-separated, qualifiers in parentheses, `|` for alternatives
//! - `Provides:` comma-separated
//! - `ABIVersion:` ABI suffix
//! - `Status:` records whose status ends in `not-installed` are skipped

use crate::domain::{InstalledPackages, PackageRecord};
use crate::error::ParseError;
use crate::parser::{parse_stanzas, DatabaseFormat, DatabaseParser};
use std::path::Path;

/// opkg status file parser
pub struct OpkgDatabaseParser;

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split([',', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl DatabaseParser for OpkgDatabaseParser {
    fn parse(&self, content: &str, path: &Path) -> Result<InstalledPackages, ParseError> {
        let mut installed = InstalledPackages::new();

        for stanza in parse_stanzas(content, path, "Package")? {
            let installed_state = stanza
                .get("Status")
                .map(|s| !s.ends_with("not-installed"))
                .unwrap_or(true);
            if !installed_state {
                continue;
            }

            let name = stanza.get("Package").unwrap_or_default();
            let mut record = PackageRecord::new(name, stanza.get("Version").unwrap_or_default());

            if let Some(depends) = stanza.get("Depends") {
                record = record.with_depends(split_list(depends));
            }
            if let Some(provides) = stanza.get("Provides") {
                record = record.with_provides(split_list(provides));
            }
            if let Some(abi) = stanza.get("ABIVersion") {
                record = record.with_abi_version(abi);
            }

            if !installed.insert(record) {
                return Err(ParseError::DuplicatePackage {
                    path: path.to_path_buf(),
                    line: stanza.line,
                    name: name.to_string(),
                });
            }
        }

        Ok(installed)
    }

    fn format(&self) -> DatabaseFormat {
        DatabaseFormat::Opkg
    }
}
