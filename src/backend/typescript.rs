//! backend::typescript
//!
//! The transpiled-script backend, wrapping the TypeScript compiler and the
//! optional minifier.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Backend, BackendError, CheckReport};
use crate::config::Project;
use crate::engine::{namer, tool_exists, BuildState, Context, ToolCommand};
use crate::ui::output;

/// Declaration generation and comment stripping.
const SIMPLE_FLAGS: [&str; 2] = ["--declaration", "--removeComments"];

/// Stricter diagnostics on top of the simple set.
const ADVANCED_FLAGS: [&str; 4] = [
    "--noFallthroughCasesInSwitch",
    "--noImplicitReturns",
    "--noUnusedLocals",
    "--noUnusedParameters",
];

/// Case consistency on top of the advanced set.
const STRICT_FLAGS: [&str; 1] = ["--forceConsistentCasingInFileNames"];

const VALID_MODES: [&str; 3] = ["simple", "advanced", "strict"];
const VALID_TARGETS: [&str; 3] = ["ES5", "ES6", "ES7"];

/// The transpiled-script backend.
pub struct TypeScriptBackend;

impl TypeScriptBackend {
    fn source(&self, project: &Project) -> String {
        if project.source.is_empty() {
            format!("src/typescript/{}.ts", project.simple_name)
        } else {
            project.source.clone()
        }
    }

    fn destination(&self, project: &Project) -> PathBuf {
        if project.destination.is_empty() {
            PathBuf::from("build").join(format!("{}.js", project.simple_name))
        } else {
            PathBuf::from(&project.destination)
        }
    }

    /// Compiler flags for the project's mode, with invalid and missing
    /// modes falling back to the advanced middle ground.
    fn mode_flags(&self, project: &Project) -> Vec<&'static str> {
        let mode = project.mode.to_lowercase();
        let mode = if VALID_MODES.contains(&mode.as_str()) {
            mode
        } else {
            "advanced".to_string()
        };

        let mut flags: Vec<&'static str> = SIMPLE_FLAGS.to_vec();
        if mode == "advanced" || mode == "strict" {
            flags.extend(ADVANCED_FLAGS);
        }
        if mode == "strict" {
            flags.extend(STRICT_FLAGS);
        }
        flags
    }

    fn target<'a>(&self, project: &'a Project) -> &'a str {
        if VALID_TARGETS.contains(&project.target.as_str()) {
            project.target.as_str()
        } else {
            "ES5"
        }
    }
}

impl Backend for TypeScriptBackend {
    fn check(&self, project: &Project) -> CheckReport {
        let mut report = CheckReport::default();

        if !project.compress {
            report.recommendations.push(
                "Compression is not enabled, meaning only a non-minified file is generated. \
                 Recommend enabling compress."
                    .to_string(),
            );
        }

        if project.mode.is_empty() {
            report
                .recommendations
                .push("No mode is set, meaning the advanced flag set is used. Recommend setting a mode.".to_string());
        } else if !VALID_MODES.contains(&project.mode.to_lowercase().as_str()) {
            report
                .errors
                .push("No valid mode set. Must be simple, advanced, or strict.".to_string());
        }

        if project.target.is_empty() {
            report
                .recommendations
                .push("No target set, meaning ES5 is used. Recommend setting target to ES5, ES6, or ES7.".to_string());
        } else if !VALID_TARGETS.contains(&project.target.as_str()) {
            report
                .errors
                .push("No valid target set. Must be ES5, ES6, or ES7.".to_string());
        }

        report
    }

    fn lint(
        &self,
        ctx: &Context,
        project: &Project,
        _confidence: f64,
    ) -> Result<(), BackendError> {
        output::print(
            format!("Linting of {} is currently not supported.", project.simple_name),
            ctx.verbosity,
        );
        Ok(())
    }

    fn pre_run(
        &self,
        _ctx: &Context,
        _project: &Project,
        _state: &mut BuildState,
    ) -> Result<(), BackendError> {
        for tool in ["tsc", "uglifyjs2"] {
            if !tool_exists(tool) {
                return Err(BackendError::MissingTool {
                    tool: tool.to_string(),
                });
            }
        }
        Ok(())
    }

    fn run(&self, _ctx: &Context, project: &Project) -> Result<(), BackendError> {
        let destination = self.destination(project);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let out = ToolCommand::new("tsc")
            .args(self.mode_flags(project))
            .args(project.flags.iter().cloned())
            .args(["--target", self.target(project)])
            .arg("--outFile")
            .arg(destination.to_string_lossy())
            .arg(self.source(project))
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
        let destination = self.destination(project);

        if project.compress {
            output::print("Minifying compiled JavaScript.", ctx.verbosity);

            let out = ToolCommand::new("uglifyjs2")
                .arg(destination.to_string_lossy())
                .args(["--compress", "--mangle", "warnings=false"])
                .output()?;
            if !out.success() {
                return Err(BackendError::Tool(out.combined()));
            }

            let minified = out.stdout.trim();
            let dir = destination.parent().unwrap_or_else(|| Path::new("."));
            let stem = destination
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let minified_destination = if project.append_hash {
                let digest = namer::hash_bytes(minified.as_bytes());
                let _ = namer::prune_stale(dir, &stem, ".min.js", &digest);
                dir.join(format!("{stem}-{digest}.min.js"))
            } else {
                dir.join(format!("{stem}.min.js"))
            };

            fs::write(minified_destination, minified)?;
        } else if project.append_hash {
            let hashed = namer::rename_with_digest(&destination)
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
