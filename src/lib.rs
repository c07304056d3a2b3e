//! # module-transformer
//!
//! Module bundler core: dependency graph, content-addressed cache, output
//! naming and reference rewriting.
//!
//! Starting from a set of entry files (or inline content), the compiler
//! follows every `import`, `export ... from`, `import()` and `require()`
//! to build a module graph, gives each reachable module an output path,
//! rewrites every specifier to point at that path, and returns the
//! resulting assets. Non-script files are copied through untouched.
//!
//! ## Quick Start
//!
//! ```ignore
//! use module_transformer::prelude::*;
//!
//! let options = Options::builder()
//!     .context("project")
//!     .entry("entry-1.js")
//!     .alias("aliasB", "b")
//!     .build()?;
//!
//! let output = Compiler::new(options).with_plugin(EmitFiles).run()?;
//! // dist/entry-1.js now requires './.modules/2.js', ...
//! ```
//!
//! ## Modules
//!
//! - [`config`]: raw options, normalization, [`OptionsBuilder`]
//! - [`graph`]: module graph and depth-first traversal
//! - [`resolve`]: specifier resolution, aliases, builtins
//! - [`cache`]: two-level record cache keyed by configuration fingerprint
//! - [`output`]: naming policies and reference rewriting
//! - [`plugin`]: lifecycle hooks and bundled plugins
//! - [`syntax`]: parser/printer seam and the bundled ECMAScript backend
//! - [`diagnostic`]: error types and code frames

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod graph;
pub mod output;
pub mod plugin;
pub mod prelude;
pub mod process;
pub mod resolve;
pub mod syntax;

#[cfg(test)]
mod testing;

// =============================================================================
// Compilation
// =============================================================================

pub use process::{transform, BuildOutput, Compiler};

// =============================================================================
// Configuration
// =============================================================================

pub use config::{ConfigError, NamingPolicy, Options, OptionsBuilder, RawOptions};

// =============================================================================
// Diagnostics
// =============================================================================

pub use diagnostic::{CompileError, Diagnostic, DiagnosticOptions, DisplayStyle, Location};
pub use resolve::ResolveError;
