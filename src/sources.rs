//! Source discovery and hashing.
//!
//! `SOURCE` is either a single file (read regardless of the include patterns) or a directory
//! walked recursively. Directory entries are matched on their root-relative, forward-slash
//! path; `node_modules` and hidden directories are never entered.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Patterns used when the caller supplies none.
pub const DEFAULT_INCLUDE: &[&str] = &["**/*.js", "**/*.ts"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not found: {path}")]
    NotFound { path: String },

    #[error("invalid include pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// SHA-256 of file content, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the source root, with `/` separators.
    pub relative: String,
    pub text: String,
    pub hash: ContentHash,
}

/// The files of one build, sorted by relative path.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    pub files: Vec<SourceFile>,
}

impl SourceSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Hash over every `(relative path, file hash)` pair, in path order.
    pub fn combined_hash(&self) -> ContentHash {
        let mut hasher = Sha256::new();
        for file in &self.files {
            hasher.update(file.relative.as_bytes());
            hasher.update([0u8]);
            hasher.update(file.hash.0.as_bytes());
            hasher.update([b'\n']);
        }
        ContentHash(hex::encode(hasher.finalize()))
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, SourceError> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| SourceError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }

    builder.build().map_err(|e| SourceError::InvalidPattern {
        pattern: "<combined>".to_string(),
        message: e.to_string(),
    })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "node_modules" || name.starts_with('.')
}

fn read_source(path: &Path, relative: String) -> Result<SourceFile, SourceError> {
    let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let hash = ContentHash::compute(text.as_bytes());
    Ok(SourceFile {
        path: path.to_path_buf(),
        relative,
        text,
        hash,
    })
}

/// Collect the sources under `root`. An empty `include` uses [`DEFAULT_INCLUDE`].
pub fn collect_sources(root: &Path, include: &[String]) -> Result<SourceSet, SourceError> {
    if !root.exists() {
        return Err(SourceError::NotFound {
            path: root.display().to_string(),
        });
    }

    if root.is_file() {
        let relative = root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        return Ok(SourceSet {
            files: vec![read_source(root, relative)?],
        });
    }

    let patterns: Vec<String> = if include.is_empty() {
        DEFAULT_INCLUDE.iter().map(|p| p.to_string()).collect()
    } else {
        include.to_vec()
    };
    let globs = build_glob_set(&patterns)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel_path) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !globs.is_match(&relative) {
            continue;
        }
        files.push(read_source(entry.path(), relative)?);
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    debug!(root = %root.display(), files = files.len(), "collected sources");
    Ok(SourceSet { files })
}
