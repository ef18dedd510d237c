//! Scan orchestrator for coordinating the whole analysis
//!
//! This module provides:
//! - Workflow coordination: read → graph → resolve → fetch → check → assemble → write
//! - The fatal/non-fatal policy: local parse errors and an unavailable platform
//!   description abort the run, every other problem becomes a `Diagnostic`
//! - Exit code selection for the finished report

use crate::analysis::{
    check_aliases, check_availability, check_build_failures, check_renames, reconcile_defaults,
    BuildFailureReport,
};
use crate::config::Config;
use crate::domain::{Annotation, Ledger, Tag, TargetRelease};
use crate::error::{AppError, ReferenceMissing, ScrapeError};
use crate::graph::{AbiNormalization, DependencyGraph, TopLevelResolver};
use crate::local::{apply_pins, read_device_info, read_installed, read_world_pins};
use crate::output::{assemble, write_ledger, AssemblyOptions};
use crate::parser::DatabaseFormat;
use crate::progress::Progress;
use crate::registry::{
    DocumentKind, DocumentStore, FetchFailure, HttpClient, ManifestSource, ReleaseFetcher,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything checked out
pub const EXIT_OK: u8 = 0;
/// Malformed local database, unavailable platform description, bad configuration
pub const EXIT_FATAL: u8 = 1;
/// Report written, but at least one check could not be verified
pub const EXIT_UNVERIFIED: u8 = 2;
/// An installed package failed to build for the target release
pub const EXIT_BUILD_FAILURE: u8 = 3;

/// A non-fatal problem encountered during the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A document was unavailable, so its checks were skipped
    Unverified(FetchFailure),
    /// A world entry names a package that is not installed, or a provides
    /// entry names a provider the target indices do not list
    MissingReference(ReferenceMissing),
    /// The build-failure listing could not be interpreted
    Scrape(ScrapeError),
}

impl Diagnostic {
    /// Short category used in machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::Unverified(_) => "could-not-verify",
            Diagnostic::MissingReference(_) => "missing-reference",
            Diagnostic::Scrape(_) => "scrape",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unverified(failure) => write!(f, "{}", failure),
            Diagnostic::MissingReference(missing) => write!(f, "{}", missing),
            Diagnostic::Scrape(e) => write!(f, "{}", e),
        }
    }
}

/// Result of one scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Database format that was read
    pub database: DatabaseFormat,
    /// Installed package count
    pub installed_count: usize,
    /// Number of top-level packages
    pub top_level_count: usize,
    /// Release the device runs, if known
    pub installed_release: Option<String>,
    /// Target release data that was fetched
    pub release: TargetRelease,
    /// The assembled package ledger
    pub ledger: Ledger,
    /// Every annotation from every check, sorted
    pub annotations: Vec<Annotation>,
    /// Build-failure cross-reference, when it ran and could be interpreted
    pub build_failures: Option<BuildFailureReport>,
    /// Non-fatal problems
    pub diagnostics: Vec<Diagnostic>,
    /// Where the ledger was written; `None` when it goes to stdout
    pub ledger_path: Option<PathBuf>,
    /// Directory holding the downloaded documents, when kept
    pub kept_dir: Option<PathBuf>,
    /// Rendered ledger contents
    pub ledger_text: String,
}

impl ScanReport {
    /// Annotations carrying one tag
    pub fn annotations_with(&self, tag: Tag) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.tag == tag)
    }

    /// Returns true if some check could not be verified
    pub fn has_unverified(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Unverified(_)))
    }

    /// Process exit code for this report
    pub fn exit_code(&self) -> u8 {
        if self
            .build_failures
            .as_ref()
            .is_some_and(BuildFailureReport::blocks_upgrade)
        {
            EXIT_BUILD_FAILURE
        } else if self.has_unverified() {
            EXIT_UNVERIFIED
        } else {
            EXIT_OK
        }
    }
}

/// Orchestrator for the scan workflow
pub struct Orchestrator {
    /// Merged configuration
    config: Config,
    /// Where remote documents come from
    source: Arc<dyn ManifestSource>,
}

impl Orchestrator {
    /// Create an orchestrator that fetches over HTTP
    pub fn new(config: Config) -> Result<Self, AppError> {
        let client = match config.timeout() {
            Some(timeout) => HttpClient::with_timeout(timeout)?,
            None => HttpClient::new()?,
        };
        Ok(Self::with_source(config, Arc::new(client)))
    }

    /// Create an orchestrator with a custom document source (for testing)
    pub fn with_source(config: Config, source: Arc<dyn ManifestSource>) -> Self {
        Self { config, source }
    }

    /// Merged configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the scan without progress display
    pub async fn run(&self) -> Result<ScanReport, AppError> {
        self.run_with_progress(false).await
    }

    /// Run the scan with optional progress display
    pub async fn run_with_progress(&self, show_progress: bool) -> Result<ScanReport, AppError> {
        let config = &self.config;
        let mut progress = Progress::new(show_progress);
        let mut diagnostics = Vec::new();

        // Step 1: Local state
        let location = config.database_location();
        let (database, mut installed) = read_installed(&location, config.database_format()?)?;
        let world = read_world_pins(&config.paths.world, &installed)?;
        apply_pins(&mut installed, &world);
        diagnostics.extend(
            world
                .missing
                .iter()
                .cloned()
                .map(Diagnostic::MissingReference),
        );

        // Step 2: Graph and classification
        let normalization = if config.report.abi_normalization {
            AbiNormalization::Enabled
        } else {
            AbiNormalization::Disabled
        };
        let graph = DependencyGraph::build(&installed, normalization);
        let resolution = TopLevelResolver::new(&installed, &graph).resolve();
        let top_level_count = resolution.top_level().count();
        info!(
            installed = installed.len(),
            top_level = top_level_count,
            pinned = resolution.pinned.len(),
            "classified installed packages"
        );

        // Step 3: Target release
        let device = read_device_info(&config.paths.release_file, &config.paths.board_name);
        let platform = config.resolve_platform(&device)?;
        let urls = config.upstream_urls();
        let store = DocumentStore::new(config.paths.cache_dir.clone(), config.keep)
            .map_err(|e| AppError::write(std::env::temp_dir(), e))?;

        progress.spinner(&format!("Fetching {} for {}...", platform.channel, platform.target));
        let fetched = ReleaseFetcher::new(&*self.source, &urls, &store)
            .with_timeout(config.timeout())
            .with_build_failures(config.report.check_failures)
            .fetch(&platform)
            .await;
        progress.finish_and_clear();
        let outcome = fetched?;
        let release = outcome.release.clone();
        diagnostics.extend(
            outcome
                .failures
                .iter()
                .cloned()
                .map(Diagnostic::Unverified),
        );

        // Step 4: Checks
        let user_set = resolution.user_set(config.report.include_deps);
        let mut annotations = reconcile_defaults(&installed, &graph, &release);
        annotations.extend(check_availability(
            user_set.iter().copied(),
            &installed,
            &release,
        ));
        annotations.extend(check_renames(user_set.iter().copied(), &release));
        for missing in check_aliases(user_set.iter().copied(), &release) {
            warn!(package = %missing.name, origin = %missing.origin, "unknown provider");
            diagnostics.push(Diagnostic::MissingReference(missing));
        }

        let build_failures = if config.report.check_failures
            && !outcome.failed(DocumentKind::BuildFailures)
        {
            let url = urls.build_failures(&platform);
            match check_build_failures(&installed, release.build_failure_listing.as_deref(), &url)
            {
                Ok(report) => {
                    annotations.extend(report.annotations());
                    Some(report)
                }
                Err(e) => {
                    warn!(error = %e, "ignoring build-failure listing");
                    diagnostics.push(Diagnostic::Scrape(e));
                    None
                }
            }
        } else {
            None
        };
        annotations.sort();
        annotations.dedup();

        // Step 5: Ledger
        let options = AssemblyOptions {
            include_deps: config.report.include_deps,
            include_defaults: config.report.include_defaults,
            include_missing: config.report.include_missing,
        };
        let ledger = assemble(
            &installed,
            &graph,
            &resolution,
            &annotations,
            Some(&release),
            options,
        );
        let ledger_text = ledger.render(config.report.compact);

        let ledger_path = if config.ledger_to_stdout {
            None
        } else {
            let path = config.paths.output.clone();
            write_ledger(&path, &ledger_text).map_err(|e| AppError::write(&path, e))?;
            Some(path)
        };

        let kept_dir = store.is_kept().then(|| store.path().to_path_buf());

        Ok(ScanReport {
            database,
            installed_count: installed.len(),
            top_level_count,
            installed_release: device.release,
            release,
            ledger,
            annotations,
            build_failures,
            diagnostics,
            ledger_path,
            kept_dir,
            ledger_text,
        })
    }
}
