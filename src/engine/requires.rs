//! engine::requires
//!
//! The dependency-hook resolver: executes the pre/post hooks of referenced
//! projects or scripts around a project's (or script's) own lifecycle, in
//! declared order.
//!
//! # Resolution
//!
//! Each `requires` entry names either a project or a script; projects are
//! tried first. A project reference invokes that project's backend
//! `requires_pre_run` / `requires_post_run` hook. A script reference runs
//! the script itself, before the owner by default and after it when the
//! entry carries the `:after` marker.
//!
//! An entry that resolves to neither is logged and stops the remaining
//! entries of this pass; it never aborts the owning lifecycle.

use std::env;
use std::fmt;

use super::sandbox::SANDBOX_DIR;
use super::{BuildState, Engine};
use crate::ui::output;

/// Which side of the owner's lifecycle a hook pass serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Before the owner's PreRun.
    Pre,
    /// After the owner's Run.
    Post,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Pre => write!(f, "pre-run"),
            HookPhase::Post => write!(f, "post-run"),
        }
    }
}

/// A parsed `requires` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireRef {
    /// Referenced project or script name.
    pub target: String,
    /// Whether a script target runs after the owner instead of before.
    /// Meaningless for project targets.
    pub run_after: bool,
}

impl RequireRef {
    /// Parse an entry of the form `name` or `name:after`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((target, marker)) => Self {
                target: target.to_string(),
                run_after: marker == "after",
            },
            None => Self {
                target: raw.to_string(),
                run_after: false,
            },
        }
    }
}

impl<'a> Engine<'a> {
    /// Run one hook pass over `requires` in declared order.
    ///
    /// Failures of individual hooks are logged and do not stop the pass; an
    /// unresolved reference is logged and stops the remaining entries.
    pub fn run_requires(&self, phase: HookPhase, requires: &[String], state: &mut BuildState) {
        if requires.is_empty() {
            return;
        }

        output::print(
            format!("Running requires for {phase}"),
            self.ctx.verbosity,
        );

        for raw in requires {
            let reference = RequireRef::parse(raw);

            if let Some(project) = self.workspace.project(&reference.target) {
                let backend = match self.backends.lookup(&project.plugin) {
                    Ok(backend) => backend,
                    Err(err) => {
                        output::error(format!(
                            "failed to resolve the backend for {}: {err}",
                            reference.target
                        ));
                        return;
                    }
                };

                match phase {
                    HookPhase::Pre => {
                        // The compiled-binary hooks assume the sandbox root
                        // is the working directory.
                        if backend.env_mandatory() && !in_sandbox_root() {
                            let root = state.sandbox.source_root();
                            if let Err(err) = env::set_current_dir(&root) {
                                output::debug(
                                    format!(
                                        "failed to enter sandbox root {}: {err}",
                                        root.display()
                                    ),
                                    self.ctx.verbosity,
                                );
                            }
                        }
                        if let Err(err) = backend.requires_pre_run(self.ctx, project, state) {
                            output::error(format!(
                                "Failed to run {} pre-run hook: {err}",
                                reference.target
                            ));
                        }
                    }
                    HookPhase::Post => {
                        if let Err(err) = backend.requires_post_run(self.ctx, project, state) {
                            output::error(format!(
                                "Failed to run {} post-run hook: {err}",
                                reference.target
                            ));
                        }
                    }
                }
            } else if self.workspace.script(&reference.target).is_some() {
                let runs_now = match phase {
                    HookPhase::Pre => !reference.run_after,
                    HookPhase::Post => reference.run_after,
                };
                if runs_now {
                    if let Err(err) = self.run_script(&reference.target, state) {
                        output::error(format!("Failed to run {}: {err}", reference.target));
                    }
                }
            } else {
                output::error(format!(
                    "unresolved requires entry {}: names neither a project nor a script",
                    reference.target
                ));
                return;
            }
        }
    }
}

/// Whether the current working directory is the sandbox root.
fn in_sandbox_root() -> bool {
    env::current_dir()
        .ok()
        .and_then(|dir| dir.file_name().map(|name| name == SANDBOX_DIR))
        .unwrap_or(false)
}
