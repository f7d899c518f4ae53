//! backend
//!
//! The backend lifecycle contract and the registry that dispatches on a
//! project's backend kind tag.
//!
//! # Design
//!
//! Each backend owns the invocation of one external toolchain and exposes a
//! uniform lifecycle: `check`, `lint`, `pre_run`, `run`, `post_run`, plus
//! the `requires_pre_run` / `requires_post_run` hooks invoked when another
//! project depends on it. The registry is built once at startup; an unknown
//! kind tag is a named lookup error, never a silent no-op.
//!
//! Exactly one backend is environment-mandatory: its teardown restores
//! shared global state (the sandbox), so the engine runs its post phases
//! even when its primary action fails.

mod golang;
mod less;
mod typescript;

pub use golang::GolangBackend;
pub use less::LessBackend;
pub use typescript::TypeScriptBackend;

use std::collections::BTreeMap;
use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::config::{Project, KIND_GO, KIND_LESS, KIND_TYPESCRIPT};
use crate::engine::{BuildState, CleanupError, CommandError, Context, FlattenError, SandboxError};

/// Errors from backend lifecycle operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A required external tool is not on PATH.
    #[error("{tool} is not installed on your system")]
    MissingTool {
        /// The missing executable name.
        tool: String,
    },

    /// The wrapped tool exited non-zero; the message carries its
    /// diagnostics with flattened paths already restored.
    #[error("{0}")]
    Tool(String),

    /// A subprocess could not be launched.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// A sandbox transition failed.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// Source consolidation failed.
    #[error(transparent)]
    Flatten(#[from] FlattenError),

    /// Cleanup of consolidated files failed.
    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    /// Filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Categorized advisory result from `check`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    /// Settings that still work but are slated for removal.
    pub deprecations: Vec<String>,
    /// Settings that will make the build fail.
    pub errors: Vec<String>,
    /// Suggested improvements.
    pub recommendations: Vec<String>,
}

impl CheckReport {
    /// Whether the report carries no findings at all.
    pub fn is_clean(&self) -> bool {
        self.deprecations.is_empty() && self.errors.is_empty() && self.recommendations.is_empty()
    }
}

/// The lifecycle contract one backend kind implements.
pub trait Backend {
    /// Advisory validation of a project's backend-specific settings.
    fn check(&self, project: &Project) -> CheckReport;

    /// Run the backend's linter; `confidence` is the minimum confidence for
    /// reported problems (backends without a confidence notion ignore it).
    fn lint(&self, ctx: &Context, project: &Project, confidence: f64)
        -> Result<(), BackendError>;

    /// Preconditions and environment preparation before `run`.
    fn pre_run(
        &self,
        ctx: &Context,
        project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError>;

    /// The primary build action.
    fn run(&self, ctx: &Context, project: &Project) -> Result<(), BackendError>;

    /// Artifact post-processing and environment teardown after `run`.
    fn post_run(
        &self,
        ctx: &Context,
        project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError>;

    /// Pre-hook invoked when another project's `requires` references this
    /// project.
    fn requires_pre_run(
        &self,
        ctx: &Context,
        project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError>;

    /// Post-hook counterpart of [`Backend::requires_pre_run`].
    fn requires_post_run(
        &self,
        ctx: &Context,
        project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError>;

    /// Whether this backend's post phases must run even after a failed
    /// `run`, to guarantee sandbox teardown.
    fn env_mandatory(&self) -> bool {
        false
    }

    /// Whether this backend supports the `tidy` operation.
    fn supports_tidy(&self) -> bool {
        false
    }

    /// Tidy the project's dependency manifest. No-op by default.
    fn tidy(&self, _ctx: &Context, _project: &Project) -> Result<(), BackendError> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Backend + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Backend")
    }
}

/// Lookup failure for an unknown backend kind tag.
#[derive(Debug, Error)]
#[error("{kind} is not a recognized backend")]
pub struct UnknownBackend {
    /// The tag that failed to resolve.
    pub kind: String,
}

/// Maps a backend kind tag to its implementation.
///
/// Built once at startup; lookups never fall back to a no-op.
pub struct BackendRegistry {
    backends: BTreeMap<String, Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Create an empty registry (tests register their own backends).
    pub fn new() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    /// The standard registry with all built-in backends.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(KIND_GO, Box::new(GolangBackend));
        registry.register(KIND_LESS, Box::new(LessBackend));
        registry.register(KIND_TYPESCRIPT, Box::new(TypeScriptBackend));
        registry
    }

    /// Register a backend under a kind tag.
    pub fn register(&mut self, kind: impl Into<String>, backend: Box<dyn Backend>) {
        self.backends.insert(kind.into(), backend);
    }

    /// Resolve a kind tag to its backend.
    pub fn lookup(&self, kind: &str) -> Result<&dyn Backend, UnknownBackend> {
        self.backends
            .get(kind)
            .map(Box::as_ref)
            .ok_or_else(|| UnknownBackend {
                kind: kind.to_string(),
            })
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod registry {
        use super::*;

        #[test]
        fn standard_resolves_builtin_kinds() {
            let registry = BackendRegistry::standard();
            assert!(registry.lookup(KIND_GO).is_ok());
            assert!(registry.lookup(KIND_LESS).is_ok());
            assert!(registry.lookup(KIND_TYPESCRIPT).is_ok());
        }

        #[test]
        fn unknown_kind_is_named_error() {
            let registry = BackendRegistry::standard();
            let err = registry.lookup("fortran").unwrap_err();
            assert_eq!(err.kind, "fortran");
            assert!(err.to_string().contains("fortran"));
        }

        #[test]
        fn only_the_compiled_binary_backend_is_env_mandatory() {
            let registry = BackendRegistry::standard();
            assert!(registry.lookup(KIND_GO).unwrap().env_mandatory());
            assert!(!registry.lookup(KIND_LESS).unwrap().env_mandatory());
            assert!(!registry.lookup(KIND_TYPESCRIPT).unwrap().env_mandatory());
        }

        #[test]
        fn only_the_compiled_binary_backend_supports_tidy() {
            let registry = BackendRegistry::standard();
            assert!(registry.lookup(KIND_GO).unwrap().supports_tidy());
            assert!(!registry.lookup(KIND_LESS).unwrap().supports_tidy());
        }
    }

    mod check_report {
        use super::*;

        #[test]
        fn empty_report_is_clean() {
            assert!(CheckReport::default().is_clean());
        }

        #[test]
        fn any_finding_marks_dirty() {
            let report = CheckReport {
                recommendations: vec!["set a mode".to_string()],
                ..CheckReport::default()
            };
            assert!(!report.is_clean());
        }

        #[test]
        fn serializes_for_machine_output() {
            let report = CheckReport {
                errors: vec!["bad target".to_string()],
                ..CheckReport::default()
            };
            let json = serde_json::to_string(&report).unwrap();
            assert!(json.contains("bad target"));
        }
    }
}
