//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ParseError: malformed local package database or world file (fatal)
//! - FetchError: network/HTTP failure (fatal only for the platform document)
//! - ReferenceMissing: a pin or alias names an unknown package (warning)
//! - ScrapeError: build-failure listing not recognizable (informational)
//! - ConfigError: invalid configuration or device identity

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Local database parsing errors
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Remote document retrieval errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fatal platform fetch, with the release names the operator could use instead
    #[error("{source}{}", format_valid_releases(.valid_releases))]
    PlatformUnavailable {
        #[source]
        source: FetchError,
        valid_releases: Vec<String>,
    },

    /// Local file output (work directory, ledger) failed
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    /// Creates a new Write error
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Write {
            path: path.into(),
            source,
        }
    }
}

fn format_valid_releases(releases: &[String]) -> String {
    if releases.is_empty() {
        String::new()
    } else {
        format!("\nvalid releases: {}", releases.join(", "))
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while reading the on-device package state
#[derive(Error, Debug)]
pub enum ParseError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line that is neither blank nor a field
    #[error("{path}:{line}: malformed field '{content}'")]
    MalformedField {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// A record without a package name field
    #[error("{path}:{line}: record has no package name")]
    MissingName { path: PathBuf, line: usize },

    /// A record that started but was cut off before it was complete
    #[error("{path}:{line}: record starting here is truncated at end of file")]
    Truncated { path: PathBuf, line: usize },

    /// The same package appears twice
    #[error("{path}:{line}: duplicate package '{name}'")]
    DuplicatePackage {
        path: PathBuf,
        line: usize,
        name: String,
    },

    /// No supported database found
    #[error("no package database found (looked for {})", format_paths(.candidates))]
    DatabaseNotFound { candidates: Vec<PathBuf> },
}

/// Errors related to fetching remote release documents
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Document does not exist upstream
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Http { url: String, status: u16 },

    /// Transport-level failure
    #[error("failed to fetch {url}: {message}")]
    Network { url: String, message: String },

    /// Timeout
    #[error("timeout while fetching {url}")]
    Timeout { url: String },

    /// Document was fetched but could not be decoded
    #[error("invalid document at {url}: {message}")]
    InvalidDocument { url: String, message: String },
}

/// A pin or alias referencing an unknown package
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{origin} references unknown package '{name}'")]
pub struct ReferenceMissing {
    /// Name that could not be resolved
    pub name: String,
    /// Where the reference came from (world file, provides list, ...)
    pub origin: String,
}

/// Problems with the scraped build-failure listing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// The listing was retrieved but nothing recognizable was in it
    #[error("build-failure listing at {url} has no recognizable entries")]
    Unrecognized { url: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for our schema
    #[error("failed to parse config file {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },

    /// Device identity could not be determined
    #[error("cannot determine {field}: pass --{field} or set it in the config file")]
    MissingDeviceField { field: &'static str },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },

    /// Unknown database format name
    #[error("invalid database format '{value}': expected 'apk', 'opkg' or 'auto'")]
    InvalidFormat { value: String },
}

impl ParseError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ParseError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new MalformedField error
    pub fn malformed(path: impl Into<PathBuf>, line: usize, content: impl Into<String>) -> Self {
        ParseError::MalformedField {
            path: path.into(),
            line,
            content: content.into(),
        }
    }

    /// Creates a new Truncated error
    pub fn truncated(path: impl Into<PathBuf>, line: usize) -> Self {
        ParseError::Truncated {
            path: path.into(),
            line,
        }
    }
}

impl FetchError {
    /// Creates a new Http error
    pub fn http(url: impl Into<String>, status: u16) -> Self {
        FetchError::Http {
            url: url.into(),
            status,
        }
    }

    /// Creates a new Network error
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidDocument error
    pub fn invalid(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::InvalidDocument {
            url: url.into(),
            message: message.into(),
        }
    }

    /// The URL that failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::NotFound { url }
            | FetchError::Http { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::Timeout { url }
            | FetchError::InvalidDocument { url, .. } => url,
        }
    }
}

impl ReferenceMissing {
    /// Creates a new ReferenceMissing warning
    pub fn new(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_malformed() {
        let err = ParseError::malformed("/lib/apk/db/installed", 12, "garbage");
        let msg = err.to_string();
        assert!(msg.contains("installed:12"));
        assert!(msg.contains("garbage"));
    }

    #[test]
    fn test_parse_error_truncated() {
        let err = ParseError::truncated("/usr/lib/opkg/status", 40);
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_database_not_found_lists_candidates() {
        let err = ParseError::DatabaseNotFound {
            candidates: vec![PathBuf::from("/a"), PathBuf::from("/b")],
        };
        assert!(err.to_string().contains("/a, /b"));
    }

    #[test]
    fn test_fetch_error_carries_url() {
        let err = FetchError::http("https://example.org/x.json", 500);
        assert_eq!(err.url(), "https://example.org/x.json");
        assert!(err.to_string().contains("HTTP 500"));

        let err = FetchError::Timeout {
            url: "https://example.org/y".to_string(),
        };
        assert_eq!(err.url(), "https://example.org/y");
    }

    #[test]
    fn test_reference_missing_display() {
        let err = ReferenceMissing::new("ghost", "world file");
        assert_eq!(
            err.to_string(),
            "world file references unknown package 'ghost'"
        );
    }

    #[test]
    fn test_platform_unavailable_lists_releases() {
        let err = AppError::PlatformUnavailable {
            source: FetchError::NotFound {
                url: "https://example.org/profiles.json".to_string(),
            },
            valid_releases: vec!["SNAPSHOT".to_string(), "23.05.5".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("profiles.json"));
        assert!(msg.contains("valid releases: SNAPSHOT, 23.05.5"));
    }

    #[test]
    fn test_platform_unavailable_without_releases() {
        let err = AppError::PlatformUnavailable {
            source: FetchError::network("https://example.org/p", "refused"),
            valid_releases: Vec::new(),
        };
        assert!(!err.to_string().contains("valid releases"));
    }

    #[test]
    fn test_app_error_from_config_error() {
        let err: AppError = ConfigError::MissingDeviceField { field: "target" }.into();
        assert!(err.to_string().contains("--target"));
    }
}
