//! Text output formatter for human-readable display
//!
//! This module provides:
//! - A summary of what was read and which release it was compared against
//! - One section per finding: missing and replaced defaults, renames,
//!   unavailable packages, build failures, version drift
//! - Could-not-verify notes for every document that was unavailable

use crate::analysis::FailureSeverity;
use crate::domain::{Annotation, Tag};
use crate::orchestrator::{Diagnostic, ScanReport};
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn heading(&self, title: &str, count: usize) -> String {
        if self.color {
            format!("{} ({}):", title.bold(), count)
        } else {
            format!("{} ({}):", title, count)
        }
    }

    /// Bullet for a finding that blocks or breaks the upgrade
    fn problem(&self) -> String {
        if self.color {
            "✗".red().to_string()
        } else {
            "-".to_string()
        }
    }

    /// Bullet for an informational finding
    fn note(&self) -> String {
        if self.color {
            "•".dimmed().to_string()
        } else {
            "-".to_string()
        }
    }

    fn format_summary(&self, report: &ScanReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let release = &report.release;
        let from = report.installed_release.as_deref().unwrap_or("unknown");
        let to = release.channel.to_string();

        if self.color {
            writeln!(
                writer,
                "{} {} {} {} ({}, {}, {})",
                "Upgrade".bold(),
                from.dimmed(),
                "→".dimmed(),
                to.bright_white().bold(),
                release.target,
                release.arch,
                release.profile
            )?;
        } else {
            writeln!(
                writer,
                "Upgrade {} -> {} ({}, {}, {})",
                from, to, release.target, release.arch, release.profile
            )?;
        }

        writeln!(
            writer,
            "  {} packages installed ({} database), {} top-level, {} in ledger",
            report.installed_count,
            report.database,
            report.top_level_count,
            report.ledger.len()
        )?;

        if self.verbosity == Verbosity::Verbose {
            if let Some(code) = &release.version_code {
                writeln!(writer, "  revision: {}", code)?;
            }
            if let Some(kernel) = &release.kernel_version {
                writeln!(writer, "  kernel: {}", kernel)?;
            }
            if !release.default_packages.is_empty() {
                writeln!(
                    writer,
                    "  {} default packages for this profile",
                    release.default_packages.len()
                )?;
            }
            for image in &release.images {
                writeln!(writer, "  image: {}", image)?;
            }
        }

        match &report.ledger_path {
            Some(path) => writeln!(writer, "  ledger: {}", path.display())?,
            None => writeln!(writer, "  ledger: stdout")?,
        }
        if let Some(dir) = &report.kept_dir {
            writeln!(writer, "  documents kept in {}", dir.display())?;
        }
        writeln!(writer)
    }

    fn format_annotations(
        &self,
        title: &str,
        annotations: &[&Annotation],
        bullet: &str,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if annotations.is_empty() {
            return Ok(());
        }
        writeln!(writer, "{}", self.heading(title, annotations.len()))?;
        for annotation in annotations {
            writeln!(writer, "  {} {}", bullet, describe(annotation))?;
        }
        writeln!(writer)
    }

    fn format_build_failures(
        &self,
        report: &ScanReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let Some(failures) = &report.build_failures else {
            return Ok(());
        };

        let installed: Vec<_> = failures.installed().collect();
        if !installed.is_empty() {
            let title = if self.color {
                "Build failures: do not upgrade".red().bold().to_string()
            } else {
                "Build failures: do not upgrade".to_string()
            };
            writeln!(writer, "{} ({}):", title, installed.len())?;
            for failure in &installed {
                writeln!(writer, "  {} {}", self.problem(), failure.name)?;
            }
            writeln!(writer)?;
        }

        let other: Vec<_> = failures
            .failures
            .iter()
            .filter(|f| f.severity == FailureSeverity::Informational)
            .collect();
        if self.verbosity == Verbosity::Verbose {
            if !other.is_empty() {
                writeln!(
                    writer,
                    "{}",
                    self.heading("Build failures, not installed", other.len())
                )?;
                for failure in other {
                    writeln!(writer, "  {} {}", self.note(), failure.name)?;
                }
                writeln!(writer)?;
            }
        } else if self.verbosity == Verbosity::Normal {
            if failures.is_empty() {
                writeln!(writer, "No known build failures.")?;
                writeln!(writer)?;
            } else if !other.is_empty() {
                writeln!(
                    writer,
                    "{} build failures for packages not installed (informational, -v to list)",
                    other.len()
                )?;
                writeln!(writer)?;
            }
        }
        Ok(())
    }

    fn format_drift(&self, report: &ScanReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let drifted: Vec<_> = report.ledger.drifted().collect();
        if drifted.is_empty() {
            return Ok(());
        }

        if self.verbosity != Verbosity::Verbose {
            writeln!(
                writer,
                "{} ledger packages change version (-v to list)",
                drifted.len()
            )?;
            return writeln!(writer);
        }

        writeln!(writer, "{}", self.heading("Version drift", drifted.len()))?;
        let width = drifted.iter().map(|e| e.name.len()).max().unwrap_or(0);
        for entry in drifted {
            let installed = entry.installed_version.as_deref().unwrap_or("?");
            let target = entry.target_version.as_deref().unwrap_or("?");
            if self.color {
                writeln!(
                    writer,
                    "  {:width$} {} {} {}",
                    entry.name,
                    installed.dimmed(),
                    "→".dimmed(),
                    target.bright_white(),
                    width = width
                )?;
            } else {
                writeln!(
                    writer,
                    "  {:width$} {} -> {}",
                    entry.name,
                    installed,
                    target,
                    width = width
                )?;
            }
        }
        writeln!(writer)
    }

    fn format_diagnostics(
        &self,
        report: &ScanReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let shown: Vec<&Diagnostic> = report
            .diagnostics
            .iter()
            .filter(|d| {
                self.verbosity == Verbosity::Verbose || matches!(d, Diagnostic::Unverified(_))
            })
            .collect();
        if shown.is_empty() {
            return Ok(());
        }

        let title = if self.color {
            "Notes".yellow().bold().to_string()
        } else {
            "Notes".to_string()
        };
        writeln!(writer, "{}:", title)?;
        for diagnostic in shown {
            if self.color {
                writeln!(writer, "  {} {}", "!".yellow(), diagnostic)?;
            } else {
                writeln!(writer, "  - {}", diagnostic)?;
            }
        }
        writeln!(writer)
    }
}

fn tagged(report: &ScanReport, tag: Tag) -> Vec<&Annotation> {
    report.annotations_with(tag).collect()
}

/// One-line description of an annotation for its section
fn describe(annotation: &Annotation) -> String {
    match (annotation.tag, &annotation.related) {
        (Tag::Replaced, Some(default)) => {
            format!("{} (instead of {})", annotation.package, default)
        }
        (Tag::Renamed, Some(target)) => format!("{} -> {}", annotation.package, target),
        (Tag::Renamed, None) => format!("{} (dropped)", annotation.package),
        _ => annotation.package.clone(),
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &ScanReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let with = |tag: Tag| tagged(report, tag);

        if self.verbosity != Verbosity::Quiet {
            self.format_summary(report, writer)?;
            self.format_annotations(
                "Missing defaults",
                &with(Tag::Missing),
                &self.note(),
                writer,
            )?;
            self.format_annotations(
                "Replaced defaults",
                &with(Tag::Replaced),
                &self.note(),
                writer,
            )?;
            self.format_annotations("Renamed", &with(Tag::Renamed), &self.note(), writer)?;
        }

        self.format_annotations(
            "Not available",
            &with(Tag::NotAvailable),
            &self.problem(),
            writer,
        )?;
        self.format_build_failures(report, writer)?;

        if self.verbosity != Verbosity::Quiet {
            self.format_drift(report, writer)?;
        }
        self.format_diagnostics(report, writer)?;
        Ok(())
    }
}
