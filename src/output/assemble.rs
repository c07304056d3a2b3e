//! Reference rewriting and printing.
//!
//! ```text
//! passthrough ─► original bytes
//! cache record ─► stored output, verbatim
//! otherwise    ─► rewrite every edge ─► print ─► store record
//! ```

use std::path::Path;

use crate::cache::CacheStore;
use crate::config::Options;
use crate::diagnostic::CompileError;
use crate::graph::{ModuleGraph, ModuleId};
use crate::resolve::path::{relative_path, relative_specifier, to_slash};
use crate::syntax::LocationToken;

use super::asset::{Asset, Assets};

/// Produce an asset for every module that has an output path.
///
/// Outputs must already be assigned for the whole graph.
pub fn assemble(graph: &mut ModuleGraph, options: &Options, cache: &CacheStore) -> Result<Assets, CompileError> {
    let mut assets = Assets::new();
    let ids: Vec<ModuleId> = graph.iter().map(|m| m.id()).collect();

    for id in ids {
        let Some(output) = graph[id].output.clone() else {
            continue;
        };
        let content = assemble_module(graph, id, &output, cache)?;
        assets.insert(Asset {
            id,
            filename: to_slash(&relative_path(&options.output_path, &output)),
            path: output,
            content,
        });
    }

    tracing::debug!(target: "module_transformer::assemble", assets = assets.len(), "assets assembled");
    Ok(assets)
}

fn assemble_module(
    graph: &mut ModuleGraph,
    id: ModuleId,
    output: &Path,
    cache: &CacheStore,
) -> Result<Vec<u8>, CompileError> {
    let module = &graph[id];
    if module.passthrough {
        return Ok(module.content.clone());
    }
    if let Some(record) = &module.cache_record {
        return Ok(record.output.clone().into_bytes());
    }

    let rewrites: Vec<(LocationToken, String)> = module
        .dependencies
        .iter()
        .filter_map(|dep| {
            let token = dep.rewrite?;
            let target = graph[dep.target].output.as_deref()?;
            Some((token, relative_specifier(output, target)))
        })
        .collect();
    let dependencies: Vec<String> = module
        .dependencies
        .iter()
        .map(|dep| graph[dep.target].identity.clone())
        .collect();

    let module = &mut graph[id];
    let Some(tree) = module.tree.as_mut() else {
        return Err(CompileError::MissingTree {
            identity: module.identity.clone(),
        });
    };
    for (token, specifier) in rewrites {
        tree.rewrite(token, &specifier);
    }
    let printed = tree.print();

    module.cache_record = cache.store(&module.cache_identity(), &module.content, dependencies, printed.clone());
    Ok(printed.into_bytes())
}
