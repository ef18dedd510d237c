//! Core domain models for pkgdelta
//!
//! This module contains the fundamental types used throughout the application:
//! - Installed package records as read from the device
//! - Classification and annotation tags attached during analysis
//! - Target release reference data fetched from upstream
//! - Ledger entries that make up the final report

mod annotation;
mod ledger;
mod package;
mod release;

pub use annotation::{Annotation, Classification, Tag};
pub use ledger::{Ledger, LedgerEntry};
pub use package::{InstalledPackages, PackageRecord};
pub use release::{PackageChange, PackageIndex, Platform, ReleaseChannel, TargetRelease, SNAPSHOT};
