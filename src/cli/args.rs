//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug output
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Braid - An opinionated build orchestrator for multi-project workspaces
#[derive(Parser, Debug)]
#[command(name = "braid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if braid was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one project, or every project in the workspace
    #[command(
        name = "build",
        long_about = "Build one project, or every project in the workspace.\n\n\
            Each project runs through the full lifecycle: dependency pre-hooks, \
            pre-run checks, compilation, dependency post-hooks, and post-run \
            processing. A failing project is reported and never stops the \
            remaining projects.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Build everything defined in braid.toml
    braid build

    # Build a single project
    braid build -p api"
    )]
    Build {
        /// Build only this project
        #[arg(short, long, value_name = "NAME")]
        project: Option<String>,
    },

    /// Lint one project, or every project in the workspace
    Lint {
        /// Lint only this project
        #[arg(short, long, value_name = "NAME")]
        project: Option<String>,

        /// Minimum confidence for reported problems
        #[arg(short, long, default_value_t = 0.5)]
        confidence: f64,
    },

    /// Validate project settings and report findings
    Check {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Tidy dependency manifests for projects that support it
    Tidy {
        /// Tidy only this project
        #[arg(short, long, value_name = "NAME")]
        project: Option<String>,
    },

    /// Stage built artifacts into a timestamped directory
    Pack {
        /// Pack only this project
        #[arg(short, long, value_name = "NAME")]
        project: Option<String>,
    },

    /// Run a named workspace script, or every script in the workspace
    Script {
        /// Run only this script
        #[arg(short, long, value_name = "NAME")]
        script: Option<String>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
