//! engine::namer
//!
//! Deterministic content-hash naming for cache-busted artifacts.
//!
//! # Design
//!
//! An artifact `app.css` with digest `d41d…` is renamed to `app-d41d….css`.
//! Before a newly named artifact is written, stale siblings sharing the same
//! base name and extension but a different digest are pruned, so at most one
//! hashed artifact exists per logical output at any time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from hash-renaming an artifact.
#[derive(Debug, Error)]
pub enum NamerError {
    /// The artifact could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Artifact path.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// The artifact could not be renamed.
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        /// Original path.
        from: PathBuf,
        /// Hashed path.
        to: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },
}

/// Hex digest of `content`. Stable across repeated calls on identical bytes.
pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Insert `-<digest>` between the base name and extension of `path`.
pub fn hashed_path(path: &Path, digest: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{digest}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{digest}"),
    };
    path.with_file_name(name)
}

/// Remove siblings of a hashed artifact that share `stem` and `suffix` but
/// carry a different digest. Returns how many were removed.
///
/// Matches names of the form `{stem}-{hex}{suffix}`, so unrelated files that
/// merely share a prefix survive.
pub fn prune_stale(dir: &Path, stem: &str, suffix: &str, keep: &str) -> io::Result<usize> {
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();

        let middle = match name
            .strip_prefix(stem)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|rest| rest.strip_suffix(suffix))
        {
            Some(middle) => middle,
            None => continue,
        };

        let is_digest = !middle.is_empty() && middle.chars().all(|c| c.is_ascii_hexdigit());
        if is_digest && middle != keep {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Hash `path`'s content and rename it to its hashed form, pruning stale
/// hashed siblings first. Returns the new path.
pub fn rename_with_digest(path: &Path) -> Result<PathBuf, NamerError> {
    let content = fs::read(path).map_err(|source| NamerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let digest = hash_bytes(&content);

    if let (Some(dir), Some(stem)) = (path.parent(), path.file_stem()) {
        let suffix = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        // Best-effort prune; a failure here must not block the rename.
        let _ = prune_stale(dir, &stem.to_string_lossy(), &suffix, &digest);
    }

    let hashed = hashed_path(path, &digest);
    fs::rename(path, &hashed).map_err(|source| NamerError::Rename {
        from: path.to_path_buf(),
        to: hashed.clone(),
        source,
    })?;

    Ok(hashed)
}
