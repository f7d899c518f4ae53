//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the workspace descriptor
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT run build phases directly. A handler returns an error
//! only for fatal conditions (unreadable descriptor, explicitly named
//! unknown project or script); per-project build failures are reported by
//! the engine and exit 0.

mod build;
mod check;
mod completion;
mod lint;
mod pack;
mod script;
mod tidy;

// Re-export command functions for testing and direct invocation
pub use build::build;
pub use check::check;
pub use completion::completion;
pub use lint::lint;
pub use pack::pack;
pub use script::script;
pub use tidy::tidy;

use anyhow::Result;

use crate::cli::args::Command;
use crate::config::{Workspace, WORKSPACE_FILE};
use crate::engine::Context;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Build { project } => build(ctx, project.as_deref()),
        Command::Lint {
            project,
            confidence,
        } => lint(ctx, project.as_deref(), confidence),
        Command::Check { json } => check(ctx, json),
        Command::Tidy { project } => tidy(ctx, project.as_deref()),
        Command::Pack { project } => pack(ctx, project.as_deref()),
        Command::Script { script: name } => script(ctx, name.as_deref()),
        Command::Completion { shell } => completion(shell),
    }
}

/// Load the workspace descriptor from the working directory.
///
/// A missing or invalid descriptor is fatal to every command that needs one.
pub(crate) fn load_workspace(ctx: &Context) -> Result<Workspace> {
    let path = ctx.workdir.join(WORKSPACE_FILE);
    Ok(Workspace::load(&path)?)
}
