//! backend::less
//!
//! The stylesheet backend, wrapping the LESS compiler.

use std::fs;
use std::path::PathBuf;

use super::{Backend, BackendError, CheckReport};
use crate::config::Project;
use crate::engine::{namer, tool_exists, BuildState, Context, ToolCommand};
use crate::ui::output;

/// Flags passed to every compiler invocation.
const COMPILER_FLAGS: [&str; 4] = ["--clean-css", "--glob", "--math=strict", "--no-color"];

/// The stylesheet backend.
pub struct LessBackend;

impl LessBackend {
    fn source(&self, project: &Project) -> String {
        if project.source.is_empty() {
            format!("src/less/{}.less", project.simple_name)
        } else {
            project.source.clone()
        }
    }

    fn destination(&self, project: &Project) -> PathBuf {
        if project.destination.is_empty() {
            PathBuf::from("build").join(format!("{}.css", project.simple_name))
        } else {
            PathBuf::from(&project.destination)
        }
    }
}

impl Backend for LessBackend {
    fn check(&self, _project: &Project) -> CheckReport {
        CheckReport::default()
    }

    fn lint(
        &self,
        ctx: &Context,
        project: &Project,
        _confidence: f64,
    ) -> Result<(), BackendError> {
        let out = ToolCommand::new("lessc")
            .args(COMPILER_FLAGS)
            .arg("--lint")
            .arg(self.source(project))
            .output()?;

        output::print(out.combined(), ctx.verbosity);
        if !out.success() {
            return Err(BackendError::Tool(out.combined()));
        }
        Ok(())
    }

    fn pre_run(
        &self,
        _ctx: &Context,
        _project: &Project,
        _state: &mut BuildState,
    ) -> Result<(), BackendError> {
        if !tool_exists("lessc") {
            return Err(BackendError::MissingTool {
                tool: "lessc".to_string(),
            });
        }
        Ok(())
    }

    fn run(&self, _ctx: &Context, project: &Project) -> Result<(), BackendError> {
        let destination = self.destination(project);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let out = ToolCommand::new("lessc")
            .args(COMPILER_FLAGS)
            .arg(self.source(project))
            .arg(destination.to_string_lossy())
            .output()?;

        if !out.success() {
            return Err(BackendError::Tool(out.combined()));
        }
        Ok(())
    }

    fn post_run(
        &self,
        ctx: &Context,
        project: &Project,
        _state: &mut BuildState,
    ) -> Result<(), BackendError> {
        if project.append_hash {
            let hashed = namer::rename_with_digest(&self.destination(project))
                .map_err(|err| BackendError::Tool(err.to_string()))?;
            output::debug(
                format!("hashed artifact: {}", hashed.display()),
                ctx.verbosity,
            );
        }
        Ok(())
    }

    fn requires_pre_run(
        &self,
        _ctx: &Context,
        _project: &Project,
        _state: &mut BuildState,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn requires_post_run(
        &self,
        _ctx: &Context,
        _project: &Project,
        _state: &mut BuildState,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}
