//! pkgdelta - package delta report for OpenWrt upgrades
//!
//! Reads the installed-package database, works out which packages were asked
//! for, and checks them against the release being upgraded to:
//! - default packages that are missing or replaced
//! - packages renamed or no longer built
//! - packages that failed to build for the target

use clap::Parser;
use pkgdelta::cli::CliArgs;
use pkgdelta::config::Config;
use pkgdelta::orchestrator::{Orchestrator, EXIT_FATAL};
use pkgdelta::output::{create_formatter, OutputConfig};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose, args.quiet);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flags
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,pkgdelta={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let config = Config::from_cli(&args)?;
    if !config.report.color {
        colored::control::set_override(false);
    }

    let output_config =
        OutputConfig::from_cli(args.json, args.verbose, args.quiet, config.report.color);
    let show_progress = !args.quiet && !args.json && io::stderr().is_terminal();
    let ledger_to_stdout = config.ledger_to_stdout;

    // Create and run the orchestrator
    let orchestrator = Orchestrator::new(config)?;
    let report = orchestrator.run_with_progress(show_progress).await?;

    let formatter = create_formatter(output_config);
    if ledger_to_stdout {
        // the ledger owns stdout, so the report moves to stderr
        let mut stdout = io::stdout().lock();
        stdout.write_all(report.ledger_text.as_bytes())?;
        stdout.flush()?;
        formatter.format(&report, &mut io::stderr().lock())?;
    } else {
        let mut stdout = io::stdout().lock();
        formatter.format(&report, &mut stdout)?;
        stdout.flush()?;
    }

    Ok(ExitCode::from(report.exit_code()))
}
