//! CLI argument parsing module for pkgdelta

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Parse a timeout: plain seconds (`30`), or `Ns` / `Nm`
fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty timeout".to_string());
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in timeout: {}", num_str))?;
    if num == 0 {
        return Err("timeout must be greater than zero".to_string());
    }

    Ok(Duration::from_secs(num * multiplier))
}

/// Local database format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatArg {
    /// apk installed database
    Apk,
    /// opkg status file
    Opkg,
    /// Whichever database exists, apk first
    #[default]
    Auto,
}

/// Package delta report for OpenWrt upgrades
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pkgdelta",
    version,
    about = "Report what an OpenWrt upgrade changes for the installed packages"
)]
pub struct CliArgs {
    /// Include packages pulled in as dependencies
    #[arg(short = 'd', long)]
    pub include_deps: bool,

    /// Include installed packages that are target defaults
    #[arg(short = 'D', long)]
    pub include_defaults: bool,

    /// Add target defaults that are not installed to the ledger
    #[arg(short = 'm', long)]
    pub include_missing: bool,

    /// Target release: SNAPSHOT or a version such as 23.05.5 (default: installed release)
    #[arg(short = 'r', long, value_name = "NAME")]
    pub release: Option<String>,

    /// Check the target's build-failure listing
    #[arg(short = 'b', long)]
    pub check_failures: bool,

    /// Keep downloaded documents and print their directory
    #[arg(short = 'k', long)]
    pub keep: bool,

    /// Ledger file path, `-` for stdout
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write bare package names only
    #[arg(short = 'c', long)]
    pub compact: bool,

    /// More detail (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only report problems
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Machine-readable report on stdout
    #[arg(long)]
    pub json: bool,

    /// Local package database format
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Package database path (apk installed db or opkg status file)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// World file path
    #[arg(long, value_name = "PATH")]
    pub world: Option<PathBuf>,

    /// Target/subtarget, e.g. ath79/generic
    #[arg(long)]
    pub target: Option<String>,

    /// Package architecture, e.g. mips_24kc
    #[arg(long)]
    pub arch: Option<String>,

    /// Device profile, e.g. tplink_archer-c7-v2
    #[arg(long)]
    pub profile: Option<String>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Timeout for each download (seconds, or Ns / Nm)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Reuse and fill a persistent document cache
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Returns true if the ledger goes to stdout
    pub fn ledger_to_stdout(&self) -> bool {
        self.output.as_deref() == Some(std::path::Path::new("-"))
    }
}
