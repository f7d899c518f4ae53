//! Braid - An opinionated build orchestrator for multi-project workspaces
//!
//! Braid drives heterogeneous build toolchains from a single workspace
//! descriptor (`braid.toml`): compiled binaries, stylesheets, and transpiled
//! scripts all run through one uniform lifecycle with declared dependencies
//! between them.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Orchestrates the PreHooks → PreRun → Run → PostHooks →
//!   PostRun lifecycle, dependency hooks, and workspace scripts
//! - [`backend`] - Per-toolchain lifecycle implementations and the registry
//!   that dispatches on a project's kind tag
//! - [`config`] - The workspace descriptor
//! - [`ui`] - User-facing output utilities
//!
//! # Correctness Invariants
//!
//! Braid maintains the following invariants:
//!
//! 1. Builds are strictly sequential; ambient process state (environment
//!    variables, the working directory) is mutated by at most one build
//! 2. Environment mutations are snapshotted and restored exactly, even when
//!    the build they serve fails
//! 3. Files created by source consolidation are tracked per build and
//!    removed before the build finishes
//! 4. A failing project never stops the remaining projects

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod ui;
