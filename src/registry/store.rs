//! Scoped storage for fetched documents
//!
//! Every document lands in a temporary work directory that is removed when the
//! store is dropped, whether the run finished or aborted. `keep` persists it
//! instead. An optional cache directory is consulted before fetching and filled
//! afterwards.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Work directory plus optional persistent cache
#[derive(Debug)]
pub struct DocumentStore {
    work_dir: Option<TempDir>,
    path: PathBuf,
    cache_dir: Option<PathBuf>,
    keep: bool,
}

impl DocumentStore {
    /// Create a fresh work directory; `cache_dir` is created if missing
    pub fn new(cache_dir: Option<PathBuf>, keep: bool) -> io::Result<Self> {
        let work_dir = tempfile::Builder::new().prefix("pkgdelta-").tempdir()?;
        if let Some(dir) = &cache_dir {
            fs::create_dir_all(dir)?;
        }
        let path = work_dir.path().to_path_buf();
        debug!(path = %path.display(), "created work directory");
        Ok(Self {
            work_dir: Some(work_dir),
            path,
            cache_dir,
            keep,
        })
    }

    /// Work directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the work directory outlives the run
    pub fn is_kept(&self) -> bool {
        self.keep
    }

    /// Previously cached copy of the document at `url`
    pub fn cached(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.cache_dir.as_ref()?.join(file_name(url));
        let bytes = fs::read(&path).ok()?;
        debug!(url, path = %path.display(), "using cached document");
        Some(bytes)
    }

    /// Write a fetched document into the work directory and the cache
    ///
    /// Write failures are logged and otherwise ignored: the document is already
    /// in memory.
    pub fn store(&self, url: &str, bytes: &[u8]) -> Option<PathBuf> {
        let name = file_name(url);
        if let Some(dir) = &self.cache_dir {
            if let Err(e) = fs::write(dir.join(&name), bytes) {
                warn!(url, error = %e, "failed to write cache entry");
            }
        }
        let path = self.path.join(&name);
        match fs::write(&path, bytes) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(url, error = %e, "failed to store document");
                None
            }
        }
    }
}

impl Drop for DocumentStore {
    fn drop(&mut self) {
        if let Some(dir) = self.work_dir.take() {
            if self.keep {
                let path = dir.keep();
                info!(path = %path.display(), "kept downloaded documents");
            }
        }
    }
}

/// File name for a URL: scheme dropped, `/` becomes `_`, every other byte
/// outside `[A-Za-z0-9.-]` is `%XX` escaped so distinct URLs never collide
fn file_name(url: &str) -> String {
    let bare = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let mut name = String::with_capacity(bare.len());
    for byte in bare.bytes() {
        match byte {
            b'/' => name.push('_'),
            b if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-') => name.push(b as char),
            b => name.push_str(&format!("%{:02X}", b)),
        }
    }
    name
}
