//! engine::lifecycle
//!
//! The per-project build state machine:
//!
//! ```text
//! PreHooks -> PreRun -> Run -> PostHooks -> PostRun
//! ```
//!
//! # Invariants
//!
//! - Hook failures never abort the owning build; they are logged.
//! - A PreRun failure aborts everything after it.
//! - A Run failure normally skips the post phases, except for an
//!   environment-mandatory backend, whose post phases must still run so the
//!   sandbox is torn down.
//! - A PostRun failure never downgrades a successful Run.
//! - Success is decided by Run alone.

use std::fmt;

use thiserror::Error;

use super::requires::HookPhase;
use super::{BuildState, Engine};
use crate::backend::UnknownBackend;
use crate::ui::output;

/// One phase of the build state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// Dependency hooks before the backend's own lifecycle.
    PreHooks,
    /// Backend preconditions and environment preparation.
    PreRun,
    /// The primary build action.
    Run,
    /// Dependency hooks after the primary action.
    PostHooks,
    /// Backend artifact post-processing and teardown.
    PostRun,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::PreHooks => "pre-hooks",
            BuildPhase::PreRun => "pre-run",
            BuildPhase::Run => "run",
            BuildPhase::PostHooks => "post-hooks",
            BuildPhase::PostRun => "post-run",
        };
        write!(f, "{name}")
    }
}

/// Terminal result of one project pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The primary action completed.
    Succeeded,
    /// The pass failed in the named phase.
    Failed(BuildPhase),
}

impl BuildOutcome {
    /// Whether the pass succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Succeeded)
    }
}

/// Fatal errors from engine entry points.
///
/// Everything else (tool failures, hook failures) is reported and folded
/// into the per-project [`BuildOutcome`].
#[derive(Debug, Error)]
pub enum BuildError {
    /// A project name that the workspace descriptor does not define.
    #[error("{0} is not a valid project")]
    UnknownProject(String),

    /// A script name that the workspace descriptor does not define.
    #[error("{0} is not a valid script")]
    UnknownScript(String),

    /// A project references a backend kind the registry does not know.
    #[error(transparent)]
    UnknownBackend(#[from] UnknownBackend),
}

impl<'a> Engine<'a> {
    /// Run the full build state machine for one project.
    pub fn build_project(&self, name: &str) -> Result<BuildOutcome, BuildError> {
        let project = self
            .workspace
            .project(name)
            .ok_or_else(|| BuildError::UnknownProject(name.to_string()))?;
        let backend = self.backends.lookup(&project.plugin)?;
        let mut state = BuildState::new(&self.ctx.workdir);

        self.run_requires(HookPhase::Pre, &project.requires, &mut state);

        output::print(
            format!("Performing pre-run checks for {name}"),
            self.ctx.verbosity,
        );
        if let Err(err) = backend.pre_run(self.ctx, project, &mut state) {
            output::error(format!("An error occurred during pre-run checks:\n{err}"));
            return Ok(BuildOutcome::Failed(BuildPhase::PreRun));
        }

        output::print(
            format!("Performing compilation for {name}"),
            self.ctx.verbosity,
        );
        let run_ok = match backend.run(self.ctx, project) {
            Ok(()) => true,
            Err(err) => {
                output::error(format!("An error occurred during compilation:\n{err}"));
                if !backend.env_mandatory() {
                    return Ok(BuildOutcome::Failed(BuildPhase::Run));
                }
                // Teardown below must still run to restore the environment.
                false
            }
        };

        self.run_requires(HookPhase::Post, &project.requires, &mut state);

        output::print(
            format!("Performing post-run for {name}"),
            self.ctx.verbosity,
        );
        if let Err(err) = backend.post_run(self.ctx, project, &mut state) {
            output::error(format!("An error occurred during post-run:\n{err}"));
        }

        if run_ok {
            output::success(format!("Built {name}"), self.ctx.verbosity);
            Ok(BuildOutcome::Succeeded)
        } else {
            Ok(BuildOutcome::Failed(BuildPhase::Run))
        }
    }

    /// Build every project in the workspace, in name order.
    ///
    /// A failing project never stops the iteration; a project whose backend
    /// cannot be resolved is reported and skipped.
    pub fn build_all(&self) -> Vec<(String, BuildOutcome)> {
        let mut outcomes = Vec::new();
        for name in self.workspace.projects.keys() {
            match self.build_project(name) {
                Ok(outcome) => outcomes.push((name.clone(), outcome)),
                Err(err) => output::error(err.to_string()),
            }
        }
        outcomes
    }

    /// Lint one project: PreRun, the backend linter, then PostRun only for
    /// an environment-mandatory backend (its PreRun engaged the sandbox).
    pub fn lint_project(&self, name: &str, confidence: f64) -> Result<BuildOutcome, BuildError> {
        let project = self
            .workspace
            .project(name)
            .ok_or_else(|| BuildError::UnknownProject(name.to_string()))?;
        let backend = self.backends.lookup(&project.plugin)?;
        let mut state = BuildState::new(&self.ctx.workdir);

        output::print(
            format!("Performing pre-run checks for {name}"),
            self.ctx.verbosity,
        );
        if let Err(err) = backend.pre_run(self.ctx, project, &mut state) {
            output::error(format!("An error occurred during pre-run checks:\n{err}"));
            return Ok(BuildOutcome::Failed(BuildPhase::PreRun));
        }

        output::print(format!("Linting {name}"), self.ctx.verbosity);
        let lint_ok = match backend.lint(self.ctx, project, confidence) {
            Ok(()) => true,
            Err(err) => {
                output::error(format!("An error occurred during linting:\n{err}"));
                false
            }
        };

        if backend.env_mandatory() {
            if let Err(err) = backend.post_run(self.ctx, project, &mut state) {
                output::error(format!("An error occurred during post-run:\n{err}"));
            }
        }

        if lint_ok {
            Ok(BuildOutcome::Succeeded)
        } else {
            Ok(BuildOutcome::Failed(BuildPhase::Run))
        }
    }

    /// Lint every project in the workspace, in name order.
    pub fn lint_all(&self, confidence: f64) -> Vec<(String, BuildOutcome)> {
        let mut outcomes = Vec::new();
        for name in self.workspace.projects.keys() {
            match self.lint_project(name, confidence) {
                Ok(outcome) => outcomes.push((name.clone(), outcome)),
                Err(err) => output::error(err.to_string()),
            }
        }
        outcomes
    }

    /// Tidy one project's dependency manifest. Backends without tidy
    /// support are skipped silently.
    pub fn tidy_project(&self, name: &str) -> Result<BuildOutcome, BuildError> {
        let project = self
            .workspace
            .project(name)
            .ok_or_else(|| BuildError::UnknownProject(name.to_string()))?;
        let backend = self.backends.lookup(&project.plugin)?;

        if !backend.supports_tidy() {
            output::debug(
                format!("{name} does not support tidy; skipping"),
                self.ctx.verbosity,
            );
            return Ok(BuildOutcome::Succeeded);
        }

        let mut state = BuildState::new(&self.ctx.workdir);

        output::print(
            format!("Performing pre-run checks for {name}"),
            self.ctx.verbosity,
        );
        if let Err(err) = backend.pre_run(self.ctx, project, &mut state) {
            output::error(format!("An error occurred during pre-run checks:\n{err}"));
            return Ok(BuildOutcome::Failed(BuildPhase::PreRun));
        }

        output::print(format!("Tidying {name}"), self.ctx.verbosity);
        let tidy_ok = match backend.tidy(self.ctx, project) {
            Ok(()) => true,
            Err(err) => {
                output::error(format!("An error occurred during tidying:\n{err}"));
                false
            }
        };

        if let Err(err) = backend.post_run(self.ctx, project, &mut state) {
            output::error(format!("An error occurred during post-run:\n{err}"));
        }

        if tidy_ok {
            Ok(BuildOutcome::Succeeded)
        } else {
            Ok(BuildOutcome::Failed(BuildPhase::Run))
        }
    }

    /// Tidy every project in the workspace, in name order.
    pub fn tidy_all(&self) -> Vec<(String, BuildOutcome)> {
        let mut outcomes = Vec::new();
        for name in self.workspace.projects.keys() {
            match self.tidy_project(name) {
                Ok(outcome) => outcomes.push((name.clone(), outcome)),
                Err(err) => output::error(err.to_string()),
            }
        }
        outcomes
    }
}
