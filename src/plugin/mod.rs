//! Lifecycle hooks and plugins.
//!
//! ```text
//! BeforeResolveEntries ─► AfterEntriesResolved ─► BeforeParse (per module)
//!     ─► AfterModulesClosed ─► AfterAssetsAssembled
//!
//! any fatal error ─► OnFatalError
//! ```
//!
//! # Example
//!
//! ```ignore
//! struct Banner;
//!
//! impl Plugin for Banner {
//!     fn name(&self) -> &str {
//!         "banner"
//!     }
//!
//!     fn apply(&self, hooks: &mut Hooks) {
//!         hooks.on(HookPoint::AfterAssetsAssembled, |ctx| {
//!             for asset in ctx.assets.iter_mut() {
//!                 asset.content.splice(0..0, b"// built\n".iter().copied());
//!             }
//!             Ok(())
//!         });
//!     }
//! }
//! ```

mod clean;
mod emit;

use std::fmt;

use crate::cache::CacheStore;
use crate::config::Options;
use crate::diagnostic::CompileError;
use crate::graph::{ModuleGraph, ModuleId};
use crate::output::Assets;

pub use clean::{Clean, ClearCache};
pub use emit::EmitFiles;

/// Error type returned by hook callbacks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by hook callbacks.
pub type HookResult = Result<(), HookError>;

type Callback = Box<dyn FnMut(&mut HookContext<'_>) -> HookResult>;

// =============================================================================
// Hook Points
// =============================================================================

/// Named points in a compilation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before any entry is looked at.
    BeforeResolveEntries,
    /// Entries are finalized, nothing is parsed yet.
    AfterEntriesResolved,
    /// A module is about to be parsed or restored; `module` is set.
    BeforeParse,
    /// Every reachable module is discovered.
    AfterModulesClosed,
    /// Every asset is assembled.
    AfterAssetsAssembled,
    /// The run failed; `error` is set.
    OnFatalError,
}

impl HookPoint {
    /// Kebab-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeResolveEntries => "before-resolve-entries",
            Self::AfterEntriesResolved => "after-entries-resolved",
            Self::BeforeParse => "before-parse",
            Self::AfterModulesClosed => "after-modules-closed",
            Self::AfterAssetsAssembled => "after-assets-assembled",
            Self::OnFatalError => "on-fatal-error",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Hook Context
// =============================================================================

/// Live state handed to hook callbacks.
pub struct HookContext<'a> {
    /// Finalized options.
    pub options: &'a Options,
    /// Cache store of the run.
    pub cache: &'a CacheStore,
    /// Module graph, empty before traversal starts.
    pub graph: &'a mut ModuleGraph,
    /// Assets, empty before assembly.
    pub assets: &'a mut Assets,
    /// Module about to be parsed, for [`HookPoint::BeforeParse`].
    pub module: Option<ModuleId>,
    /// Error that ended the run, for [`HookPoint::OnFatalError`].
    pub error: Option<&'a CompileError>,
}

// =============================================================================
// Hooks
// =============================================================================

/// Registered callbacks, run in registration order.
#[derive(Default)]
pub struct Hooks {
    callbacks: Vec<(HookPoint, Callback)>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.callbacks.iter().map(|(point, _)| point))
            .finish()
    }
}

impl Hooks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` at `point`.
    pub fn on(&mut self, point: HookPoint, callback: impl FnMut(&mut HookContext<'_>) -> HookResult + 'static) -> &mut Self {
        self.callbacks.push((point, Box::new(callback)));
        self
    }

    /// Whether anything is registered at `point`.
    pub fn has(&self, point: HookPoint) -> bool {
        self.callbacks.iter().any(|(p, _)| *p == point)
    }

    /// Run every callback registered at `point`.
    ///
    /// Stops at the first failure.
    pub fn run(&mut self, point: HookPoint, ctx: &mut HookContext<'_>) -> Result<(), CompileError> {
        for (_, callback) in self.callbacks.iter_mut().filter(|(p, _)| *p == point) {
            callback(ctx).map_err(|err| CompileError::hook(point, err.to_string()))?;
        }
        Ok(())
    }
}

// =============================================================================
// Plugin
// =============================================================================

/// A bundle of hook callbacks.
pub trait Plugin {
    /// Plugin name, used in logs.
    fn name(&self) -> &str;

    /// Register callbacks.
    fn apply(&self, hooks: &mut Hooks);
}
