//! Prelude module for convenient imports.
//!
//! ```ignore
//! use module_transformer::prelude::*;
//! ```

// Compilation
pub use crate::process::{transform, BuildOutput, Compiler};

// Configuration
pub use crate::config::{Entry, NamingPolicy, Options, OptionsBuilder, RawOptions, SpecifierPattern};

// Graph & assets
pub use crate::graph::{Dependency, Module, ModuleGraph, ModuleId, ModuleState};
pub use crate::output::{Asset, Assets};

// Plugins
pub use crate::plugin::{Clean, ClearCache, EmitFiles, HookContext, HookPoint, HookResult, Hooks, Plugin};

// Syntax backend
pub use crate::syntax::{Dialect, EcmaSyntax, Reference, ReferenceKind, Syntax, SyntaxError, SyntaxTree};

// Diagnostics
pub use crate::diagnostic::{CompileError, Diagnostic, DiagnosticOptions, DisplayStyle, Location};
pub use crate::config::ConfigError;
pub use crate::resolve::ResolveError;

// Cache
pub use crate::cache::{CacheRecord, CacheStore};
