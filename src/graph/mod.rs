//! The module graph.
//!
//! ```text
//! ModuleGraph
//! ├── modules: Vec<Module>              (index = id - 1, discovery order)
//! └── index:   FxHashMap<identity, id>  (exactly one module per identity)
//! ```

mod builder;
mod module;
mod naming;

use std::ops::{Index, IndexMut};
use std::path::PathBuf;

use rustc_hash::FxHashMap;

pub use builder::GraphBuilder;
pub use module::{DepGuard, Dependency, Module, ModuleId, ModuleState, Naming};

/// Modules of one run, keyed by identity and numbered by discovery order.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    index: FxHashMap<String, ModuleId>,
}

impl ModuleGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the graph has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module by id.
    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    /// Mutable module by id.
    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.index())
    }

    /// Id of the module with `identity`.
    pub fn id_of(&self, identity: &str) -> Option<ModuleId> {
        self.index.get(identity).copied()
    }

    /// Module with `identity`.
    pub fn lookup(&self, identity: &str) -> Option<&Module> {
        self.id_of(identity).map(|id| &self[id])
    }

    /// Modules in id order.
    pub fn iter(&self) -> std::slice::Iter<'_, Module> {
        self.modules.iter()
    }

    /// Mutable modules in id order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Module> {
        self.modules.iter_mut()
    }

    /// Entry modules in id order.
    pub fn entries(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| m.is_entry())
    }

    /// Modules with at least one edge to `id`, in id order.
    pub fn dependents(&self, id: ModuleId) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|m| m.dependencies().iter().any(|d| d.target == id))
            .map(Module::id)
            .collect()
    }

    /// Insert a new module; the identity must not be present yet.
    pub(crate) fn insert(&mut self, identity: String, path: Option<PathBuf>, content: Vec<u8>, context: PathBuf) -> ModuleId {
        debug_assert!(!self.index.contains_key(&identity));
        let id = ModuleId::from_index(self.modules.len());
        self.index.insert(identity.clone(), id);
        self.modules.push(Module::new(id, identity, path, content, context));
        id
    }
}

impl Index<ModuleId> for ModuleGraph {
    type Output = Module;

    fn index(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }
}

impl IndexMut<ModuleId> for ModuleGraph {
    fn index_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }
}

impl<'a> IntoIterator for &'a ModuleGraph {
    type Item = &'a Module;
    type IntoIter = std::slice::Iter<'a, Module>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
