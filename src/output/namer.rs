//! Output path assignment.
//!
//! Runs once over the closed graph, in id order. Entries keep their
//! configured destination; every other module lands in the module
//! directory under a name chosen by the [`NamingPolicy`].

use std::path::PathBuf;

use rustc_hash::FxHashSet;

use crate::cache::hash::short_hash;
use crate::config::{NamingPolicy, Options};
use crate::graph::{Module, ModuleGraph};

/// Assign an output path to every module.
pub fn assign_outputs(graph: &mut ModuleGraph, options: &Options) {
    let mut claimed: FxHashSet<PathBuf> = graph.entries().filter_map(|m| m.output.clone()).collect();

    for module in graph.iter_mut().filter(|m| !m.entry) {
        let path = match options.naming {
            NamingPolicy::Id => options.module_dir.join(format!("{}{}", module.id, module.extension())),
            NamingPolicy::Hash => options
                .module_dir
                .join(format!("{}{}", short_hash(&module.identity), module.extension())),
            NamingPolicy::Named => unclaimed_name(module, options, &claimed),
        };
        tracing::debug!(
            target: "module_transformer::naming",
            identity = module.identity(),
            output = %path.display(),
            "output assigned"
        );
        claimed.insert(path.clone());
        module.output = Some(path);
    }
}

/// `<short><ext>`, then `<short>_1<ext>`, `<short>_2<ext>`, ...
fn unclaimed_name(module: &Module, options: &Options, claimed: &FxHashSet<PathBuf>) -> PathBuf {
    let base = module.naming().short().unwrap_or_else(|| module.stem());
    let ext = module.extension();

    let mut candidate = options.module_dir.join(format!("{base}{ext}"));
    let mut suffix = 0;
    while claimed.contains(&candidate) {
        suffix += 1;
        candidate = options.module_dir.join(format!("{base}_{suffix}{ext}"));
    }
    candidate
}
