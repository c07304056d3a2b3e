//! Compilation error type.

use std::path::PathBuf;

use thiserror::Error;

use super::info::Diagnostic;
use crate::config::ConfigError;
use crate::plugin::HookPoint;
use crate::resolve::ResolveError;

/// Error type for a failed compilation run.
///
/// Every variant is fatal: the run stops and no asset is returned. Cache
/// faults never show up here, they degrade to cache misses.
///
/// # Example
///
/// ```ignore
/// match transform(options) {
///     Ok(output) => { /* success */ }
///     Err(CompileError::Parse(diagnostic)) => {
///         eprintln!("{}", diagnostic.render(&DiagnosticOptions::colored()));
///     }
///     Err(CompileError::Resolve(err)) => {
///         eprintln!("cannot find '{}' from {}", err.specifier, err.importer);
///     }
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum CompileError {
    /// Options were invalid; raised before any module is parsed.
    #[error("invalid options: {0}")]
    Config(#[from] ConfigError),

    /// A dependency specifier could not be mapped to a file.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A source module failed to parse.
    #[error("{0}")]
    Parse(Box<Diagnostic>),

    /// A module file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A lifecycle hook reported a failure.
    #[error("hook `{point}` failed: {message}")]
    Hook {
        /// Lifecycle point the hook was registered for.
        point: HookPoint,
        /// Failure message.
        message: String,
    },

    /// A source module reached assembly without a syntax tree or cache record.
    #[error("module {identity} has neither a syntax tree nor a cache record")]
    MissingTree {
        /// Identity of the module.
        identity: String,
    },
}

impl CompileError {
    /// Create a parse error from a resolved diagnostic.
    pub fn parse(diagnostic: Diagnostic) -> Self {
        Self::Parse(Box::new(diagnostic))
    }

    /// Create an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a hook failure.
    pub fn hook(point: HookPoint, message: impl Into<String>) -> Self {
        Self::Hook {
            point,
            message: message.into(),
        }
    }

    /// Get the code-frame diagnostic if this is a parse error.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Parse(diagnostic) => Some(diagnostic),
            _ => None,
        }
    }
}
