//! apk installed database parser
//!
//! Handles the text database apk-tools keeps at `/lib/apk/db/installed`:
//! - `P:` package name
//! - `V:` version
//! - `D:` space-separated dependencies, constraints inline (`libfoo>=1.2`)
//! - `p:` space-separated provides
//! - `g:` space-separated tags, `openwrt:abiversion=<X>` carries the ABI suffix
//!
//! Every other field is ignored.

use crate::domain::{InstalledPackages, PackageRecord};
use crate::error::ParseError;
use crate::parser::{parse_stanzas, DatabaseFormat, DatabaseParser};
use std::path::Path;

/// Tag key carrying the ABI version
const ABI_TAG: &str = "openwrt:abiversion=";

/// apk installed database parser
pub struct ApkDatabaseParser;

impl DatabaseParser for ApkDatabaseParser {
    fn parse(&self, content: &str, path: &Path) -> Result<InstalledPackages, ParseError> {
        let mut installed = InstalledPackages::new();

        for stanza in parse_stanzas(content, path, "P")? {
            let name = stanza.get("P").unwrap_or_default();
            let mut record = PackageRecord::new(name, stanza.get("V").unwrap_or_default());

            if let Some(depends) = stanza.get("D") {
                record = record.with_depends(depends.split_whitespace());
            }
            if let Some(provides) = stanza.get("p") {
                record = record.with_provides(provides.split_whitespace());
            }
            if let Some(abi) = stanza
                .get("g")
                .into_iter()
                .flat_map(str::split_whitespace)
                .find_map(|tag| tag.strip_prefix(ABI_TAG))
            {
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
        DatabaseFormat::Apk
    }
}
