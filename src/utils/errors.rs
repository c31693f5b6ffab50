//! Diagnostics printed to stderr for the person running the CLI.
//!
//! These are separate from `tracing` output, which is off unless a log level
//! is configured.

use crate::color::Diagnostic;

pub const DEFAULT_EXIT_CODE: i32 = 1;

pub(crate) fn error_internal(text: &str) {
    eprintln!("{}", Diagnostic::Error.line(text));
}

pub(crate) fn warning_internal(text: &str) {
    eprintln!("{}", Diagnostic::Warning.line(text));
}

#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::warning_internal(&formatted);
    })
}

#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}
