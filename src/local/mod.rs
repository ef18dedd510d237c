//! On-device state readers
//!
//! This module provides functionality to:
//! - Locate and parse the installed-package database (apk or opkg)
//! - Read world-file pins and apply them to the installed records
//! - Identify the device's release, target, architecture and profile

mod device;
mod world;

pub use device::{parse_release_file, profile_name, read_device_info, DeviceInfo};
pub use world::{apply_pins, parse_world, read_world_pins, WorldPins};

use crate::domain::InstalledPackages;
use crate::error::ParseError;
use crate::parser::{get_parser, DatabaseFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where to look for each database format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseLocation {
    /// apk installed database
    pub apk: PathBuf,
    /// opkg status file
    pub opkg: PathBuf,
}

impl DatabaseLocation {
    fn path_for(&self, format: DatabaseFormat) -> &Path {
        match format {
            DatabaseFormat::Apk => &self.apk,
            DatabaseFormat::Opkg => &self.opkg,
        }
    }
}

/// Pick the database format: the requested one, or the first whose file exists
pub fn detect_format(
    location: &DatabaseLocation,
    requested: Option<DatabaseFormat>,
) -> Result<DatabaseFormat, ParseError> {
    if let Some(format) = requested {
        return Ok(format);
    }
    DatabaseFormat::all()
        .iter()
        .copied()
        .find(|format| location.path_for(*format).exists())
        .ok_or_else(|| ParseError::DatabaseNotFound {
            candidates: DatabaseFormat::all()
                .iter()
                .map(|f| location.path_for(*f).to_path_buf())
                .collect(),
        })
}

/// Read and parse the installed-package database
pub fn read_installed(
    location: &DatabaseLocation,
    requested: Option<DatabaseFormat>,
) -> Result<(DatabaseFormat, InstalledPackages), ParseError> {
    let mut format = detect_format(location, requested)?;
    let path = location.path_for(format);
    let content = std::fs::read_to_string(path).map_err(|e| ParseError::read_error(path, e))?;

    // a single database path (--db) may hold either format
    if requested.is_none() && location.apk == location.opkg {
        if let Some(sniffed) = DatabaseFormat::sniff(&content) {
            format = sniffed;
        }
    }
    debug!(path = %path.display(), %format, "reading package database");

    let installed = get_parser(format).parse(&content, path)?;

    info!(packages = installed.len(), %format, "package database loaded");
    Ok((format, installed))
}
