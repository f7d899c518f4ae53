//! engine::consolidate
//!
//! Flattening of nested source trees into one directory, and tracked
//! cleanup of the files that flattening creates.
//!
//! # Design
//!
//! Some toolchains expect every source file of a unit in a single flat
//! directory. `flatten` walks a nested tree and copies every file found
//! below the root into the root under a synthesized, collision-free name:
//! the file's directory path relative to the root with every separator
//! replaced by the reserved `__` token, then `__`, then the original file
//! name (`pkg/models/user.go` becomes `pkg__models__user.go`).
//!
//! Every created file is recorded in a [`CleanupSet`] owned by the build
//! pass, keyed by the project (or discovered nested dependency) it belongs
//! to. The set must be empty before PreRun and after PostRun of the same
//! pass.
//!
//! Cleanup is best-effort: every tracked entry is attempted, failures are
//! aggregated into one error, and only failed entries stay tracked.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Reserved token substituted for path separators in synthesized names.
///
/// An original file name containing this token would collide with a
/// synthesized one; source trees must not use it.
pub const FLATTEN_TOKEN: &str = "__";

/// Errors from flattening a source tree.
#[derive(Debug, Error)]
pub enum FlattenError {
    /// A directory could not be read.
    #[error("failed to read {dir}: {source}")]
    ReadDir {
        /// Directory that failed to list.
        dir: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// A file could not be copied to its flattened location.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        /// Original nested path.
        from: PathBuf,
        /// Synthesized flat path.
        to: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },
}

/// Aggregated failures from one cleanup pass.
///
/// Cleanup attempts every entry; paths listed here are still on disk and
/// remain tracked.
#[derive(Debug, Error)]
#[error("failed to remove {} flattened file(s): {}", failed.len(), describe(failed))]
pub struct CleanupError {
    /// Paths that could not be removed, in attempt order.
    pub failed: Vec<PathBuf>,
}

fn describe(failed: &[PathBuf]) -> String {
    failed
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Files created by flattening, tracked per key for later removal.
///
/// Owned by one build pass and threaded through it; never process-global,
/// so successive commands in the same process cannot leak entries into each
/// other.
#[derive(Debug, Default)]
pub struct CleanupSet {
    tracked: BTreeMap<String, Vec<PathBuf>>,
}

impl CleanupSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no entries are tracked under any key.
    pub fn is_empty(&self) -> bool {
        self.tracked.values().all(|paths| paths.is_empty())
    }

    /// Record a created file under `key`, in creation order.
    pub fn record(&mut self, key: &str, path: PathBuf) {
        self.tracked.entry(key.to_string()).or_default().push(path);
    }

    /// Paths tracked under `key`, in creation order.
    pub fn tracked(&self, key: &str) -> &[PathBuf] {
        self.tracked.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove every file tracked under `key`.
    ///
    /// Best-effort: all entries are attempted, failures are aggregated, and
    /// only failed entries stay tracked under the key.
    pub fn cleanup(&mut self, key: &str) -> Result<(), CleanupError> {
        let paths = match self.tracked.get_mut(key) {
            Some(paths) => paths,
            None => return Ok(()),
        };

        let mut failed = Vec::new();
        for path in paths.drain(..) {
            if let Err(err) = fs::remove_file(&path) {
                // Already-gone entries count as removed.
                if err.kind() != io::ErrorKind::NotFound {
                    failed.push(path);
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            *paths = failed.clone();
            Err(CleanupError { failed })
        }
    }

    /// Remove every tracked file under every key.
    pub fn cleanup_all(&mut self) -> Result<(), CleanupError> {
        let keys: Vec<String> = self.tracked.keys().cloned().collect();
        let mut failed = Vec::new();
        for key in keys {
            if let Err(err) = self.cleanup(&key) {
                failed.extend(err.failed);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(CleanupError { failed })
        }
    }
}

/// Recursively flatten `source_dir` into `root_dir`.
///
/// Entries whose name matches `exclude` (exact or suffix) are skipped
/// wholesale; excluded and hidden directories are not descended into. Files
/// already at the top level of `root_dir` are left untouched and untracked.
/// Created files are recorded under `CleanupSet[key]`.
pub fn flatten(
    set: &mut CleanupSet,
    key: &str,
    source_dir: &Path,
    root_dir: &Path,
    exclude: &[String],
) -> Result<(), FlattenError> {
    let entries = fs::read_dir(source_dir).map_err(|source| FlattenError::ReadDir {
        dir: source_dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| FlattenError::ReadDir {
            dir: source_dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        if is_excluded(exclude, &name) {
            continue;
        }

        if path.is_dir() {
            if !name.starts_with('.') {
                flatten(set, key, &path, root_dir, exclude)?;
            }
            continue;
        }

        if !path.is_file() {
            continue;
        }

        // Files directly at the root stay in place.
        if source_dir == root_dir {
            continue;
        }

        let flat = root_dir.join(synthesized_name(root_dir, source_dir, &name));
        fs::copy(&path, &flat).map_err(|source| FlattenError::Copy {
            from: path.clone(),
            to: flat.clone(),
            source,
        })?;
        set.record(key, flat);
    }

    Ok(())
}

/// Synthesize the collision-free flat name for a file at
/// `source_dir/name`, where `source_dir` is below `root_dir`.
fn synthesized_name(root_dir: &Path, source_dir: &Path, name: &str) -> String {
    let leading = source_dir
        .strip_prefix(root_dir)
        .unwrap_or(source_dir)
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, FLATTEN_TOKEN);

    format!("{leading}{FLATTEN_TOKEN}{name}")
}

/// Reverse the reserved token back to path separators in diagnostic output,
/// so compiler messages against flattened files report the original nested
/// layout.
pub fn restore_nested_paths(text: &str) -> String {
    text.trim()
        .replace(FLATTEN_TOKEN, &std::path::MAIN_SEPARATOR.to_string())
}

fn is_excluded(exclude: &[String], name: &str) -> bool {
    exclude
        .iter()
        .any(|item| name == item || name.ends_with(item.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    mod flatten_behavior {
        use super::*;

        #[test]
        fn nested_files_get_flat_names_and_tracking() {
            // {root/a.src, root/pkg/b.src, root/pkg/sub/c.src}
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            touch(&root.join("a.src"));
            touch(&root.join("pkg/b.src"));
            touch(&root.join("pkg/sub/c.src"));

            let mut set = CleanupSet::new();
            flatten(&mut set, "demo", root, root, &[]).unwrap();

            let tracked = set.tracked("demo");
            assert_eq!(tracked.len(), 2);
            assert!(tracked.contains(&root.join("pkg__b.src")));
            assert!(tracked.contains(&root.join("pkg__sub__c.src")));
            // top-level file untouched and untracked
            assert!(root.join("a.src").exists());
            assert!(!tracked.contains(&root.join("a.src")));
        }

        #[test]
        fn flat_tree_is_idempotent() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            touch(&root.join("a.src"));
            touch(&root.join("b.src"));

            let mut set = CleanupSet::new();
            flatten(&mut set, "flat", root, root, &[]).unwrap();
            assert!(set.is_empty());
            flatten(&mut set, "flat", root, root, &[]).unwrap();
            assert!(set.is_empty());
            assert_eq!(listing(root), vec!["a.src", "b.src"]);
        }

        #[test]
        fn cleanup_after_flatten_restores_original_file_set() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            touch(&root.join("a.src"));
            touch(&root.join("pkg/b.src"));
            touch(&root.join("pkg/sub/c.src"));
            let before = listing(root);

            let mut set = CleanupSet::new();
            flatten(&mut set, "demo", root, root, &[]).unwrap();
            assert_ne!(listing(root), before);

            set.cleanup("demo").unwrap();
            assert!(set.is_empty());
            assert_eq!(listing(root), before);
            assert!(root.join("pkg/b.src").exists());
        }

        #[test]
        fn excluded_directories_are_not_descended() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            touch(&root.join("pkg/b.src"));
            touch(&root.join("vendor/dep.src"));

            let mut set = CleanupSet::new();
            flatten(&mut set, "demo", root, root, &["vendor".to_string()]).unwrap();

            assert_eq!(set.tracked("demo"), &[root.join("pkg__b.src")]);
            assert!(!root.join("vendor__dep.src").exists());
        }

        #[test]
        fn excluded_suffixes_skip_files() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            touch(&root.join("pkg/b.src"));
            touch(&root.join("pkg/b_test.src"));

            let mut set = CleanupSet::new();
            flatten(&mut set, "demo", root, root, &["_test.src".to_string()]).unwrap();

            assert_eq!(set.tracked("demo"), &[root.join("pkg__b.src")]);
        }

        #[test]
        fn hidden_directories_are_not_descended() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            touch(&root.join(".git/objects/x.src"));
            touch(&root.join("pkg/b.src"));

            let mut set = CleanupSet::new();
            flatten(&mut set, "demo", root, root, &[]).unwrap();

            assert_eq!(set.tracked("demo"), &[root.join("pkg__b.src")]);
        }

        #[test]
        fn separate_source_and_root_directories() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("main");
            let dep = dir.path().join("main/dep");
            touch(&dep.join("inner/d.src"));

            let mut set = CleanupSet::new();
            flatten(&mut set, "dep", &dep, &root, &[]).unwrap();

            assert_eq!(set.tracked("dep"), &[root.join("dep__inner__d.src")]);
        }
    }

    mod cleanup_behavior {
        use super::*;

        #[test]
        fn unknown_key_is_noop() {
            let mut set = CleanupSet::new();
            set.cleanup("nothing").unwrap();
        }

        #[test]
        fn missing_files_count_as_removed() {
            let dir = tempfile::tempdir().unwrap();
            let mut set = CleanupSet::new();
            set.record("demo", dir.path().join("already-gone.src"));
            set.cleanup("demo").unwrap();
            assert!(set.is_empty());
        }

        #[test]
        fn failures_are_aggregated_and_stay_tracked() {
            let dir = tempfile::tempdir().unwrap();
            let kept = dir.path().join("kept.src");
            fs::write(&kept, "x").unwrap();
            // A path whose parent is a file cannot be removed.
            let blocker = dir.path().join("block.src");
            fs::write(&blocker, "x").unwrap();
            let undeletable = blocker.join("child.src");

            let mut set = CleanupSet::new();
            set.record("demo", kept.clone());
            set.record("demo", undeletable.clone());

            let err = set.cleanup("demo").unwrap_err();
            assert_eq!(err.failed, vec![undeletable.clone()]);
            // the removable entry is gone, the failed one stays tracked
            assert!(!kept.exists());
            assert_eq!(set.tracked("demo"), &[undeletable]);
        }

        #[test]
        fn cleanup_all_spans_keys() {
            let dir = tempfile::tempdir().unwrap();
            let a = dir.path().join("a.src");
            let b = dir.path().join("b.src");
            fs::write(&a, "x").unwrap();
            fs::write(&b, "x").unwrap();

            let mut set = CleanupSet::new();
            set.record("one", a.clone());
            set.record("two", b.clone());
            set.cleanup_all().unwrap();
            assert!(set.is_empty());
            assert!(!a.exists());
            assert!(!b.exists());
        }
    }

    mod diagnostics {
        use super::*;

        #[test]
        fn reserved_token_reverses_to_separators() {
            let diag = "pkg__models__user.go:4:2: undefined: Frobnicate";
            assert_eq!(
                restore_nested_paths(diag),
                "pkg/models/user.go:4:2: undefined: Frobnicate"
            );
        }

        #[test]
        fn output_is_trimmed() {
            assert_eq!(restore_nested_paths("  done \n"), "done");
        }
    }

    proptest! {
        // Collision-freedom: distinct relative nested paths synthesize
        // distinct flat names, provided original names avoid the reserved
        // token.
        #[test]
        fn synthesized_names_never_collide(
            dirs_a in proptest::collection::vec("[a-z]{1,6}", 1..4),
            dirs_b in proptest::collection::vec("[a-z]{1,6}", 1..4),
            name in "[a-z]{1,8}\\.src",
        ) {
            prop_assume!(dirs_a != dirs_b);
            let root = Path::new("root");
            let sub_a: PathBuf = root.join(dirs_a.join("/"));
            let sub_b: PathBuf = root.join(dirs_b.join("/"));
            let flat_a = synthesized_name(root, &sub_a, &name);
            let flat_b = synthesized_name(root, &sub_b, &name);
            prop_assert_ne!(flat_a, flat_b);
        }
    }
}
