//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Errors and
//! warnings always go to stderr; informational messages go to stdout and are
//! suppressed by `--quiet`. Debug messages appear only with `--debug`.

use std::fmt::Display;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    /// Whether debug output is enabled.
    pub fn is_debug(self) -> bool {
        self == Verbosity::Debug
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod verbosity {
        use super::*;

        #[test]
        fn quiet_wins_over_debug() {
            assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        }

        #[test]
        fn debug_flag_enables_debug() {
            assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
            assert!(Verbosity::from_flags(false, true).is_debug());
        }

        #[test]
        fn default_is_normal() {
            assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
            assert!(!Verbosity::from_flags(false, false).is_debug());
        }
    }
}
