//! ui
//!
//! Terminal output utilities.
//!
//! # Design
//!
//! Braid is a batch tool driven entirely by its workspace descriptor, so
//! there are no interactive prompts; everything is plain line-oriented
//! output. All printing goes through this module so quiet and debug modes
//! are honored consistently.

pub mod output;

pub use output::{debug, error, print, success, warn, Verbosity};
