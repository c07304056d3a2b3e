//! Module nodes and dependency edges.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::CacheRecord;
use crate::syntax::{LocationToken, SyntaxTree};

/// Identifier allocated in discovery order, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

impl ModuleId {
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index + 1)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 - 1
    }

    /// The numeric id.
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a module within one run.
///
/// Passthrough assets stay `Unparsed` until the graph closes.
///
/// ```text
/// Unparsed ─► Parsing ─┬─► DepsDiscovered ─┬─► Closed
///                      └─► CacheRestored ──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Created, not yet looked at.
    Unparsed,
    /// Dependencies are being followed.
    Parsing,
    /// Parsed fresh; every reference has an edge.
    DepsDiscovered,
    /// Edges were replayed from a cache record without parsing.
    CacheRestored,
    /// The graph is closed; no more edges will be added.
    Closed,
}

/// Human-readable naming state, used by the `named` policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Naming {
    /// No reference has named this module yet.
    #[default]
    Pending,
    /// Named by its first reference.
    Assigned {
        /// Short name, the stem of the output file.
        short: String,
        /// Package the name descends from.
        root: Option<String>,
    },
}

impl Naming {
    /// Short name, if assigned.
    pub fn short(&self) -> Option<&str> {
        match self {
            Self::Pending => None,
            Self::Assigned { short, .. } => Some(short),
        }
    }

    /// Root package name, if assigned.
    pub fn root(&self) -> Option<&str> {
        match self {
            Self::Pending => None,
            Self::Assigned { root, .. } => root.as_deref(),
        }
    }
}

/// Guard against replaying the same cached dependency list twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepGuard {
    /// Cached dependencies not replayed yet.
    #[default]
    Clear,
    /// Cached dependencies are being, or have been, replayed.
    Set,
}

/// A directed edge to another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Referenced module.
    pub target: ModuleId,
    /// Reconstructed from a cache record rather than discovered by parsing.
    pub from_cache: bool,
    /// Specifier as written, for fresh edges.
    pub specifier: Option<String>,
    /// Syntax location to rewrite once the target's output path is known.
    pub rewrite: Option<LocationToken>,
}

/// One module of the graph.
pub struct Module {
    pub(crate) id: ModuleId,
    pub(crate) identity: String,
    pub(crate) path: Option<PathBuf>,
    pub(crate) entry: bool,
    pub(crate) content: Vec<u8>,
    pub(crate) context: PathBuf,
    pub(crate) third_party: bool,
    pub(crate) passthrough: bool,
    pub(crate) tree: Option<Box<dyn SyntaxTree>>,
    pub(crate) state: ModuleState,
    pub(crate) naming: Naming,
    pub(crate) guard: DepGuard,
    pub(crate) output: Option<PathBuf>,
    pub(crate) cache_record: Option<Arc<CacheRecord>>,
    pub(crate) dependencies: Vec<Dependency>,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("entry", &self.entry)
            .field("state", &self.state)
            .field("output", &self.output)
            .field("dependencies", &self.dependencies.len())
            .finish_non_exhaustive()
    }
}

impl Module {
    pub(crate) fn new(id: ModuleId, identity: String, path: Option<PathBuf>, content: Vec<u8>, context: PathBuf) -> Self {
        let passthrough = path.as_deref().is_some_and(is_passthrough_path);
        let third_party = path.as_deref().is_some_and(crate::resolve::is_third_party);
        Self {
            id,
            identity,
            path,
            entry: false,
            content,
            context,
            third_party,
            passthrough,
            tree: None,
            state: ModuleState::Unparsed,
            naming: Naming::Pending,
            guard: DepGuard::Clear,
            output: None,
            cache_record: None,
            dependencies: Vec::new(),
        }
    }

    /// Numeric id.
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Identity: `/`-separated absolute path, or a `ghost://` marker.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Backing file, absent for synthetic entries.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether this module is a configured entry.
    pub fn is_entry(&self) -> bool {
        self.entry
    }

    /// Whether the content was supplied inline.
    pub fn is_synthetic(&self) -> bool {
        self.path.is_none()
    }

    /// Source content.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Replace the source content.
    ///
    /// Only meaningful before the module is parsed, e.g. from a
    /// before-parse hook.
    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) {
        self.content = content.into();
    }

    /// Directory relative references resolve against.
    pub fn context(&self) -> &Path {
        &self.context
    }

    /// Whether the module lives inside an installed package.
    pub fn is_third_party(&self) -> bool {
        self.third_party
    }

    /// Whether the module is copied through without parsing.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Parsed tree, present after a fresh parse.
    pub fn tree(&self) -> Option<&dyn SyntaxTree> {
        self.tree.as_deref()
    }

    /// Mutable parsed tree.
    pub fn tree_mut(&mut self) -> Option<&mut (dyn SyntaxTree + 'static)> {
        self.tree.as_deref_mut()
    }

    /// Lifecycle state.
    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// Naming state.
    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    /// Cycle guard for cached dependency replay.
    pub fn guard(&self) -> DepGuard {
        self.guard
    }

    /// Assigned output path.
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Cache record the module was restored from or stored into.
    pub fn cache_record(&self) -> Option<&CacheRecord> {
        self.cache_record.as_deref()
    }

    /// Outgoing edges in discovery order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Original extension, including the dot.
    pub fn extension(&self) -> String {
        match &self.path {
            Some(path) => crate::resolve::path::extension_of(path),
            None => ".js".to_owned(),
        }
    }

    /// File stem of the identity.
    pub fn stem(&self) -> &str {
        crate::resolve::path::file_stem(&self.identity)
    }

    /// Identity under which this module's cache record is keyed.
    ///
    /// Entries are keyed by their output destination, which also separates
    /// the same file compiled as an entry and as a dependency.
    pub fn cache_identity(&self) -> String {
        match (&self.output, self.entry) {
            (Some(output), true) => crate::resolve::path::to_slash(output),
            _ => self.identity.clone(),
        }
    }
}

/// Non-script files bypass parsing and rewriting.
pub fn is_passthrough_path(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    !matches!(ext.as_deref(), Some("js" | "mjs" | "cjs"))
}
