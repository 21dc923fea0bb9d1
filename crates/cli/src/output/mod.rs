//! Output formatting utilities
//!
//! Human-readable and JSON rendering of command results, plus the spinner
//! shown while a network step runs.

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::Spinner;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable the spinner
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
