//! engine::sandbox
//!
//! Snapshot/restore of process-wide environment state, giving the
//! compiled-binary toolchain an isolated-looking execution root.
//!
//! # Design
//!
//! Isolation is implemented by mutating ambient process state: the search
//! path variable, the module-mode toggle, the private-module allowlist, and
//! the current working directory. The sandbox owns the saved snapshots as a
//! value threaded through one build pass, so successive commands in the same
//! process cannot leak state into each other.
//!
//! # Invariants
//!
//! - At most one engaged snapshot per sandbox. `toggle_on` while engaged
//!   overwrites the snapshot and permanently loses the prior state; callers
//!   must serialize sandbox use (the engine builds strictly sequentially).
//! - `toggle_off` restores every variable exactly, including back to unset.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Search-path variable snapshotted and redirected while engaged.
pub const SEARCH_PATH_VAR: &str = "GOPATH";
/// Module-mode toggle variable.
pub const MODULE_MODE_VAR: &str = "GO111MODULE";
/// Private-module allowlist variable.
pub const PRIVATE_LIST_VAR: &str = "GOPRIVATE";

/// Directory under the workspace root used as the sandboxed execution root.
pub const SANDBOX_DIR: &str = "go";

/// Errors from sandbox transitions.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Changing the working directory failed.
    #[error("failed to change directory to {dir}: {source}")]
    ChangeDir {
        /// Directory we tried to enter.
        dir: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// `toggle_off` was called with no live snapshot.
    #[error("sandbox is not engaged")]
    NotEngaged,
}

/// Saved prior state for one engaged sandbox.
#[derive(Debug)]
struct Snapshot {
    prev_search_path: Option<String>,
    prev_dir: PathBuf,
}

/// The environment sandbox for one build pass.
#[derive(Debug)]
pub struct Sandbox {
    workdir: PathBuf,
    saved: Option<Snapshot>,
    saved_module_mode: Option<Option<String>>,
    saved_private: Option<Option<String>>,
}

impl Sandbox {
    /// Create a disengaged sandbox rooted at the workspace directory.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            saved: None,
            saved_module_mode: None,
            saved_private: None,
        }
    }

    /// The sandboxed execution root (`<workspace>/go`).
    pub fn source_root(&self) -> PathBuf {
        self.workdir.join(SANDBOX_DIR)
    }

    /// The workspace root the sandbox returns to on `toggle_off`.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Whether a snapshot is currently live.
    pub fn is_engaged(&self) -> bool {
        self.saved.is_some()
    }

    /// Engage the sandbox: snapshot the search path and working directory,
    /// point the search path at the sandboxed root, and enter it.
    ///
    /// Not reentrant: engaging twice overwrites the snapshot.
    pub fn toggle_on(&mut self) -> Result<(), SandboxError> {
        let root = self.source_root();
        let prev_dir = env::current_dir().unwrap_or_else(|_| self.workdir.clone());

        self.saved = Some(Snapshot {
            prev_search_path: env::var(SEARCH_PATH_VAR).ok(),
            prev_dir,
        });

        env::set_var(SEARCH_PATH_VAR, &root);
        env::set_current_dir(&root).map_err(|source| SandboxError::ChangeDir {
            dir: root,
            source,
        })
    }

    /// Disengage the sandbox: restore the search path exactly (including
    /// back to unset) and return to the workspace root.
    pub fn toggle_off(&mut self) -> Result<(), SandboxError> {
        let snapshot = self.saved.take().ok_or(SandboxError::NotEngaged)?;

        match snapshot.prev_search_path {
            Some(value) => env::set_var(SEARCH_PATH_VAR, value),
            None => env::remove_var(SEARCH_PATH_VAR),
        }

        env::set_current_dir(&self.workdir).map_err(|source| SandboxError::ChangeDir {
            dir: self.workdir.clone(),
            source,
        })
    }

    /// Set the module-mode toggle, snapshotting the original value once.
    pub fn set_module_mode(&mut self, on: bool) {
        if self.saved_module_mode.is_none() {
            self.saved_module_mode = Some(env::var(MODULE_MODE_VAR).ok());
        }
        env::set_var(MODULE_MODE_VAR, if on { "on" } else { "off" });
    }

    /// Restore the module-mode toggle to its snapshotted value.
    pub fn restore_module_mode(&mut self) {
        if let Some(prev) = self.saved_module_mode.take() {
            match prev {
                Some(value) => env::set_var(MODULE_MODE_VAR, value),
                None => env::remove_var(MODULE_MODE_VAR),
            }
        }
    }

    /// Set the private-module allowlist, snapshotting the original once.
    pub fn set_private_list(&mut self, modules: &[String]) {
        if modules.is_empty() {
            return;
        }
        if self.saved_private.is_none() {
            self.saved_private = Some(env::var(PRIVATE_LIST_VAR).ok());
        }
        env::set_var(PRIVATE_LIST_VAR, modules.join(","));
    }

    /// Restore the private-module allowlist to its snapshotted value.
    pub fn restore_private_list(&mut self) {
        if let Some(prev) = self.saved_private.take() {
            match prev {
                Some(value) => env::set_var(PRIVATE_LIST_VAR, value),
                None => env::remove_var(PRIVATE_LIST_VAR),
            }
        }
    }
}
