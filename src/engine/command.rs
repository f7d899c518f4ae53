//! engine::command
//!
//! The subprocess invocation primitive shared by backends and scripts.
//!
//! # Design
//!
//! Invocation is synchronous and blocking: stdout and stderr are captured in
//! full before anything is inspected; nothing is streamed. Success is derived
//! from the exit status only: callers must never infer failure by matching
//! substrings of captured output, since output-format drift in a wrapped tool
//! would silently flip success into failure.
//!
//! There are no timeouts and no cancellation: a hung external tool hangs the
//! whole engine.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Errors from launching a subprocess.
///
/// A tool that launches but exits non-zero is not an error at this layer;
/// callers read [`ToolOutput::success`] and decide.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be spawned at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// The program that failed to start.
        program: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

/// Fully captured result of one tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    /// Exit code, when the process exited normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout and stderr joined, trimmed.
    pub fn combined(&self) -> String {
        let mut combined = String::new();
        combined.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stderr.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&self.stderr);
        combined.trim().to_string()
    }
}

/// Builder for one blocking tool invocation.
#[derive(Debug)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a command for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir` instead of the current working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// The command line as it would be typed, for debug output.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the command to completion, capturing both streams.
    pub fn output(&self) -> Result<ToolOutput, CommandError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|source| CommandError::Launch {
            program: self.program.clone(),
            source,
        })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Whether `name` resolves to an executable on PATH.
pub fn tool_exists(name: &str) -> bool {
    let path = match std::env::var_os("PATH") {
        Some(path) => path,
        None => return false,
    };

    std::env::split_paths(&path).any(|dir| is_executable(&dir.join(name)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
