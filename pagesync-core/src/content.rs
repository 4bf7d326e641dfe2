//! Content files on disk.
//!
//! Items are re-read from their source files on every run; nothing here
//! caches between calls.

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::{ContentError, LoadError};
use crate::types::{ContentItem, RawContentItem};
use crate::validate::validate;

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Read and parse one content file.
pub fn load_item(path: &Path) -> Result<RawContentItem, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    RawContentItem::from_slice(&bytes).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate every file without touching a store.
///
/// Order of the output follows `paths`.
pub fn validate_files(paths: &[PathBuf]) -> Vec<(PathBuf, Result<ContentItem, ContentError>)> {
    paths
        .iter()
        .map(|path| {
            let checked = load_item(path)
                .map_err(ContentError::from)
                .and_then(|raw| validate(&raw).map_err(ContentError::from));
            (path.clone(), checked)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 2. Discovery
// ---------------------------------------------------------------------------

/// Where to look for content files and which ones to pick.
#[derive(Debug, Clone)]
pub struct Discovery {
    roots: Vec<PathBuf>,
    pattern: Pattern,
    recursive: bool,
}

impl Discovery {
    /// `pattern` is matched against file names only, e.g. `*.json`.
    pub fn new(roots: Vec<PathBuf>, pattern: &str, recursive: bool) -> Result<Self, ContentError> {
        let pattern = Pattern::new(pattern).map_err(|source| ContentError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            roots,
            pattern,
            recursive,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Roots that do not exist or are not directories. [`Discovery::files`]
    /// skips them.
    pub fn missing_roots(&self) -> Vec<&Path> {
        self.roots
            .iter()
            .filter(|r| !r.is_dir())
            .map(PathBuf::as_path)
            .collect()
    }

    /// All matching files under the existing roots, sorted and deduplicated.
    ///
    /// Hidden directories (`.git`, `.pagesync`, ...) are not entered.
    pub fn files(&self) -> Result<Vec<PathBuf>, ContentError> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut found = Vec::new();

        for root in self.roots.iter().filter(|r| r.is_dir()) {
            let walker = WalkDir::new(root)
                .min_depth(1)
                .max_depth(max_depth)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));
            for entry in walker {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if self.pattern.matches(&name) {
                    found.push(entry.into_path());
                }
            }
        }

        found.sort();
        found.dedup();
        Ok(found)
    }
}

/// One-call form of [`Discovery::files`].
pub fn discover(
    roots: &[PathBuf],
    pattern: &str,
    recursive: bool,
) -> Result<Vec<PathBuf>, ContentError> {
    Discovery::new(roots.to_vec(), pattern, recursive)?.files()
}

fn is_hidden_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
