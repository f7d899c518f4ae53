//! cli
//!
//! Command-line interface layer for Braid.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT run build phases directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. All build lifecycle work flows through
//! the engine.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::env;

use anyhow::{Context as _, Result};

use crate::engine;
use crate::ui::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    if let Some(dir) = &cli.cwd {
        env::set_current_dir(dir)
            .with_context(|| format!("failed to enter {}", dir.display()))?;
    }
    let workdir = env::current_dir().context("failed to resolve the working directory")?;

    let ctx = engine::Context::new(workdir, Verbosity::from_flags(cli.quiet, cli.debug));

    commands::dispatch(cli.command, &ctx)
}
