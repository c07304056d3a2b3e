//! Diagnostics for fatal compilation errors.

mod error;
mod format;
mod info;

pub use error::CompileError;
pub use format::{format_diagnostic, DiagnosticOptions, DisplayStyle};
pub use info::{Diagnostic, DiagnosticDisplay, Location, SourceLine};
