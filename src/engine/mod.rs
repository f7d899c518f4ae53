//! engine
//!
//! Orchestrates the per-project build lifecycle:
//!
//! ```text
//! PreHooks -> PreRun -> Run -> PostHooks -> PostRun
//! ```
//!
//! # Architecture
//!
//! The engine is the central coordinator for all Braid commands. It reads a
//! project from the workspace descriptor, looks its backend up in the
//! registry, runs the dependency hooks declared in `requires` around the
//! backend's own lifecycle, and reports a per-project outcome.
//!
//! # Invariants
//!
//! - Work is strictly sequential: isolation is implemented by mutating
//!   ambient process state (working directory, environment variables), so
//!   at most one project build is ever in flight.
//! - Per-pass state (the sandbox snapshot and the cleanup set) is an owned
//!   [`BuildState`] value threaded through every call, never a global.
//! - A failing project never stops "build all" iteration; only top-level
//!   errors (unreadable descriptor, explicitly named unknown project) are
//!   fatal to the command.

pub mod command;
pub mod consolidate;
pub mod lifecycle;
pub mod namer;
pub mod requires;
pub mod sandbox;
pub mod scripts;

pub use command::{tool_exists, CommandError, ToolCommand, ToolOutput};
pub use consolidate::{
    flatten, restore_nested_paths, CleanupError, CleanupSet, FlattenError, FLATTEN_TOKEN,
};
pub use lifecycle::{BuildError, BuildOutcome, BuildPhase};
pub use requires::{HookPhase, RequireRef};
pub use sandbox::{Sandbox, SandboxError};

use std::path::PathBuf;

use crate::backend::BackendRegistry;
use crate::config::Workspace;
use crate::ui::Verbosity;

/// Execution context for one command invocation.
///
/// Immutable global settings derived from CLI flags, threaded through every
/// engine call.
#[derive(Debug, Clone)]
pub struct Context {
    /// Workspace root directory.
    pub workdir: PathBuf,
    /// Output verbosity.
    pub verbosity: Verbosity,
}

impl Context {
    /// Create a context rooted at `workdir`.
    pub fn new(workdir: impl Into<PathBuf>, verbosity: Verbosity) -> Self {
        Self {
            workdir: workdir.into(),
            verbosity,
        }
    }
}

/// Mutable state owned by one build pass.
///
/// Holds the environment sandbox and the cleanup tracking for files created
/// by consolidation. Must start empty before PreRun and end empty after
/// PostRun of the same pass.
#[derive(Debug)]
pub struct BuildState {
    /// Environment snapshot/restore for the pass.
    pub sandbox: Sandbox,
    /// Files created by consolidation, pending removal.
    pub cleanup: CleanupSet,
}

impl BuildState {
    /// Create fresh state for one pass rooted at `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            sandbox: Sandbox::new(workdir),
            cleanup: CleanupSet::new(),
        }
    }
}

/// The build engine: workspace + backend registry + context.
///
/// Methods are split across [`lifecycle`], [`requires`], and [`scripts`].
pub struct Engine<'a> {
    /// The loaded workspace descriptor.
    pub workspace: &'a Workspace,
    /// Backend implementations keyed by kind tag.
    pub backends: &'a BackendRegistry,
    /// Invocation context.
    pub ctx: &'a Context,
}

impl<'a> Engine<'a> {
    /// Create an engine over a loaded workspace.
    pub fn new(workspace: &'a Workspace, backends: &'a BackendRegistry, ctx: &'a Context) -> Self {
        Self {
            workspace,
            backends,
            ctx,
        }
    }
}
