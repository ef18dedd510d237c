//! Build-failure cross-reference
//!
//! The failure listing is an HTML directory index with no stable format. Names
//! are taken from the directory cells; anything else is ignored.

use crate::domain::{Annotation, InstalledPackages, Tag};
use crate::error::ScrapeError;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static FAILURE_CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<td class="n"><a href="([^"/]+)/">"#).unwrap()
});

/// How much a build failure matters for this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureSeverity {
    /// The failed package is installed
    DoNotUpgrade,
    /// Not installed here
    Informational,
}

/// One package that failed to build
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BuildFailure {
    pub severity: FailureSeverity,
    pub name: String,
}

/// Outcome of the build-failure check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildFailureReport {
    /// Failures, installed ones first, then by name
    pub failures: Vec<BuildFailure>,
}

impl BuildFailureReport {
    /// Returns true if any installed package failed to build
    pub fn blocks_upgrade(&self) -> bool {
        self.installed().next().is_some()
    }

    /// Installed failures
    pub fn installed(&self) -> impl Iterator<Item = &BuildFailure> {
        self.failures
            .iter()
            .filter(|f| f.severity == FailureSeverity::DoNotUpgrade)
    }

    /// `#build-failed` annotations for installed failures
    pub fn annotations(&self) -> Vec<Annotation> {
        self.installed()
            .map(|f| Annotation::new(f.name.as_str(), Tag::BuildFailed))
            .collect()
    }

    /// Returns true if the listing named no failures
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Package names in a failure listing
pub fn parse_failure_listing(listing: &str) -> BTreeSet<String> {
    FAILURE_CELL
        .captures_iter(listing)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !name.starts_with('.'))
        .map(str::to_string)
        .collect()
}

/// Intersect a failure listing with the installed set
///
/// An absent listing means no known failures. A listing with neither entries
/// nor directory cells is reported as unrecognized so the caller can say so.
pub fn check_build_failures(
    installed: &InstalledPackages,
    listing: Option<&str>,
    url: &str,
) -> Result<BuildFailureReport, ScrapeError> {
    let Some(listing) = listing else {
        return Ok(BuildFailureReport::default());
    };

    let names = parse_failure_listing(listing);
    if names.is_empty() && !listing.contains(r#"class="n""#) {
        return Err(ScrapeError::Unrecognized {
            url: url.to_string(),
        });
    }

    let mut failures: Vec<BuildFailure> = names
        .into_iter()
        .map(|name| {
            let severity = if is_installed(installed, &name) {
                FailureSeverity::DoNotUpgrade
            } else {
                FailureSeverity::Informational
            };
            BuildFailure { severity, name }
        })
        .collect();
    failures.sort();

    tracing::debug!(
        failures = failures.len(),
        installed = failures
            .iter()
            .filter(|f| f.severity == FailureSeverity::DoNotUpgrade)
            .count(),
        "cross-referenced build failures"
    );
    Ok(BuildFailureReport { failures })
}

fn is_installed(installed: &InstalledPackages, name: &str) -> bool {
    installed.contains(name) || installed.iter().any(|record| record.base_name() == name)
}
