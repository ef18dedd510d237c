//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of the scan report
//! - Ledger entries, annotations, build failures and diagnostics as separate arrays

use crate::analysis::BuildFailure;
use crate::domain::{Annotation, LedgerEntry};
use crate::orchestrator::{Diagnostic, ScanReport};
use crate::output::{OutputFormatter, Verbosity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full report
#[derive(Serialize)]
struct JsonOutput<'a> {
    /// When the report was produced
    generated_at: DateTime<Utc>,
    /// Process exit code the report maps to
    exit_code: u8,
    /// Local side of the comparison
    installed: JsonInstalled<'a>,
    /// Release compared against
    target: JsonTarget<'a>,
    /// Ledger entries in ledger order
    ledger: &'a [LedgerEntry],
    /// Ledger file path, absent when written to stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    ledger_path: Option<String>,
    /// Every annotation
    annotations: &'a [Annotation],
    /// Build failures, absent when the check did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    build_failures: Option<&'a [BuildFailure]>,
    /// Non-fatal problems
    diagnostics: Vec<JsonDiagnostic>,
    /// Kept work directory
    #[serde(skip_serializing_if = "Option::is_none")]
    kept_dir: Option<String>,
}

/// JSON representation of the local state
#[derive(Serialize)]
struct JsonInstalled<'a> {
    /// `apk` or `opkg`
    database: String,
    /// Installed release
    #[serde(skip_serializing_if = "Option::is_none")]
    release: Option<&'a str>,
    /// Number of installed packages
    packages: usize,
    /// Number of top-level packages
    top_level: usize,
}

/// JSON representation of the target release
#[derive(Serialize)]
struct JsonTarget<'a> {
    release: String,
    target: &'a str,
    arch: &'a str,
    profile: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kernel_version: Option<&'a str>,
    /// Only in verbose mode
    #[serde(skip_serializing_if = "Option::is_none")]
    default_packages: Option<Vec<&'a str>>,
    /// Only in verbose mode
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

/// JSON representation of a diagnostic
#[derive(Serialize)]
struct JsonDiagnostic {
    kind: &'static str,
    /// Document that could not be fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<&'static str>,
    message: String,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &ScanReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let release = &report.release;
        let verbose = self.verbosity == Verbosity::Verbose;

        let output = JsonOutput {
            generated_at: Utc::now(),
            exit_code: report.exit_code(),
            installed: JsonInstalled {
                database: report.database.to_string(),
                release: report.installed_release.as_deref(),
                packages: report.installed_count,
                top_level: report.top_level_count,
            },
            target: JsonTarget {
                release: release.channel.to_string(),
                target: &release.target,
                arch: &release.arch,
                profile: &release.profile,
                version_code: release.version_code.as_deref(),
                kernel_version: release.kernel_version.as_deref(),
                default_packages: verbose
                    .then(|| release.default_packages.iter().map(String::as_str).collect()),
                images: verbose.then_some(release.images.as_slice()),
            },
            ledger: &report.ledger.entries,
            ledger_path: report
                .ledger_path
                .as_ref()
                .map(|p| p.display().to_string()),
            annotations: &report.annotations,
            build_failures: report
                .build_failures
                .as_ref()
                .map(|b| b.failures.as_slice()),
            diagnostics: report
                .diagnostics
                .iter()
                .map(|d| JsonDiagnostic {
                    kind: d.kind(),
                    document: match d {
                        Diagnostic::Unverified(failure) => Some(failure.document.id()),
                        _ => None,
                    },
                    message: d.to_string(),
                })
                .collect(),
            kept_dir: report.kept_dir.as_ref().map(|p| p.display().to_string()),
        };

        let json = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;

        writeln!(writer, "{}", json)?;

        Ok(())
    }
}
