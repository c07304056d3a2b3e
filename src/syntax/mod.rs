//! Parser/printer seam.
//!
//! The compiler never looks inside a syntax tree. It asks a [`Syntax`] backend
//! to parse a module, asks the resulting [`SyntaxTree`] for the references it
//! contains, and later hands back rewrite instructions keyed by
//! [`LocationToken`] before printing.
//!
//! ```text
//! source ──► Syntax::parse ──► SyntaxTree ──► references()  (graph builder)
//!                                  │
//!                                  ├──► rewrite(token, path) (assembler)
//!                                  └──► print()              (assembler)
//! ```
//!
//! [`EcmaSyntax`] is the bundled backend.

mod ecma;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::diagnostic::Location;

pub use ecma::{EcmaSyntax, EcmaTree};

// =============================================================================
// Dialect
// =============================================================================

/// Whether sources are parsed as ES modules or classic scripts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// ES module: `import`/`export` declarations allowed.
    #[default]
    Module,
    /// Classic script: `import`/`export` declarations are syntax errors.
    Script,
}

/// Language edition accepted by the parser.
///
/// Deserializes from `"latest"`, an edition number (`6`..`20`) or a year
/// (`2015`..).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "JsonValue", into = "JsonValue")]
pub enum EcmaVersion {
    /// Newest edition the backend knows about.
    #[default]
    Latest,
    /// A specific edition, by year.
    Year(u16),
}

impl EcmaVersion {
    /// Whether `import()` expressions are available (ES2020+).
    pub fn supports_dynamic_import(self) -> bool {
        match self {
            Self::Latest => true,
            Self::Year(year) => year >= 2020,
        }
    }
}

impl TryFrom<JsonValue> for EcmaVersion {
    type Error = String;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match &value {
            JsonValue::String(s) if s == "latest" => Ok(Self::Latest),
            JsonValue::Number(n) => match n.as_u64() {
                Some(edition @ 3..=5) => Ok(Self::Year(2009 - (5 - edition as u16))),
                Some(edition @ 6..=20) => Ok(Self::Year(2009 + edition as u16)),
                Some(year @ 2015..=2100) => Ok(Self::Year(year as u16)),
                _ => Err(format!("unsupported ecmaVersion {n}")),
            },
            _ => Err(format!("unsupported ecmaVersion {value}")),
        }
    }
}

impl From<EcmaVersion> for JsonValue {
    fn from(version: EcmaVersion) -> Self {
        match version {
            EcmaVersion::Latest => JsonValue::from("latest"),
            EcmaVersion::Year(year) => JsonValue::from(year),
        }
    }
}

/// Parser options handed through to the backend untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dialect {
    /// Module or script goal.
    pub source_type: SourceType,
    /// Language edition.
    pub ecma_version: EcmaVersion,
}

// =============================================================================
// References
// =============================================================================

/// Syntactic form that introduced a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `import x from "s"`, `import "s"`.
    Import,
    /// `export * from "s"`.
    ExportAll,
    /// `export { a } from "s"`.
    ExportNamed,
    /// `import("s")`.
    DynamicImport,
    /// `require("s")`.
    Require,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Import => "import",
            Self::ExportAll => "export-all",
            Self::ExportNamed => "export-named",
            Self::DynamicImport => "dynamic-import",
            Self::Require => "require",
        })
    }
}

/// Opaque handle to the syntax location of one reference.
///
/// Only meaningful to the tree that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationToken(usize);

impl LocationToken {
    /// Create a token from a backend-specific index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The backend-specific index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A dependency-introducing construct found in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Syntactic form.
    pub kind: ReferenceKind,
    /// The specifier as written.
    pub specifier: String,
    /// Location of the specifier literal.
    pub location: Location,
    /// Handle used to rewrite the specifier later.
    pub token: LocationToken,
}

// =============================================================================
// Backend Traits
// =============================================================================

/// Syntax error reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({location})")]
pub struct SyntaxError {
    /// Error message.
    pub message: String,
    /// Where parsing failed.
    pub location: Location,
}

impl SyntaxError {
    /// Create a syntax error.
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// A parser/printer pair.
pub trait Syntax: Send + Sync {
    /// Parse source text into an owned, mutable tree.
    fn parse(&self, source: &str, dialect: &Dialect) -> Result<Box<dyn SyntaxTree>, SyntaxError>;
}

/// An owned syntax tree.
pub trait SyntaxTree: fmt::Debug + Send + Sync {
    /// Dependency-introducing constructs, in source order.
    fn references(&self) -> Vec<Reference>;

    /// Replace the specifier at `token` with `value`.
    fn rewrite(&mut self, token: LocationToken, value: &str);

    /// Print the (possibly rewritten) tree back to source text.
    fn print(&self) -> String;
}
