//! World file: the packages the operator asked for, with optional constraints

use crate::domain::InstalledPackages;
use crate::error::{ParseError, ReferenceMissing};
use crate::parser::split_spec;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// World entries that refer to installed packages, plus the ones that do not
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldPins {
    /// Package name to constraint; the constraint is empty for unpinned entries
    pub pins: BTreeMap<String, String>,
    /// Entries naming packages that are not installed
    pub missing: Vec<ReferenceMissing>,
}

/// Parse world file content into `(name, constraint)` pairs in file order
pub fn parse_world(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(|spec| {
            let (name, constraint) = split_spec(spec);
            (name.to_string(), constraint.unwrap_or_default().to_string())
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Read the world file and check every entry against the installed set
///
/// A missing world file is not an error: opkg systems have none.
pub fn read_world_pins(
    path: &Path,
    installed: &InstalledPackages,
) -> Result<WorldPins, ParseError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(WorldPins::default()),
        Err(e) => return Err(ParseError::read_error(path, e)),
    };

    let mut world = WorldPins::default();
    for (name, constraint) in parse_world(&content) {
        if installed.contains(&name) {
            world.pins.insert(name, constraint);
        } else {
            warn!(
                package = %name,
                path = %path.display(),
                "world entry is not installed, skipping"
            );
            world.missing.push(ReferenceMissing::new(name, "world file"));
        }
    }
    Ok(world)
}

/// Record non-empty world constraints on the installed packages
pub fn apply_pins(installed: &mut InstalledPackages, world: &WorldPins) {
    for (name, constraint) in &world.pins {
        if constraint.is_empty() {
            continue;
        }
        if let Some(record) = installed.get_mut(name) {
            record.pin_constraint = Some(constraint.clone());
        }
    }
}
