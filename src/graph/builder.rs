//! Graph traversal.
//!
//! Strict depth-first pre-order: a module's references are followed in
//! source order, and each newly discovered target is fully processed before
//! the next reference is looked at. Cached dependency lists are replayed in
//! the same way. Module ids therefore only depend on the inputs.
//!
//! ```text
//! entry ──► parse(id)
//!             ├─ cache hit  ─► replay record deps ─► parse(dep) ...   (edges: from_cache)
//!             └─ cache miss ─► Syntax::parse ─► references()
//!                                 └─► handle_dependency ─► resolve ─► edge ─► parse(dep) ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::module::{DepGuard, Dependency, ModuleState, Naming};
use super::{naming, ModuleGraph, ModuleId};
use crate::cache::{CacheRecord, CacheStore};
use crate::config::{Entry, NamingPolicy, Options};
use crate::diagnostic::{CompileError, Diagnostic};
use crate::resolve::path::to_slash;
use crate::resolve::{is_builtin, is_relative, ResolveError, Resolver};
use crate::syntax::{Reference, Syntax};

/// Callback run before a module is parsed or restored from cache.
type BeforeParse<'a> = Box<dyn FnMut(&mut ModuleGraph, ModuleId) -> Result<(), CompileError> + 'a>;

/// Builds the closed module graph for one run.
pub struct GraphBuilder<'a> {
    options: &'a Options,
    cache: &'a CacheStore,
    syntax: &'a dyn Syntax,
    resolver: Resolver,
    graph: ModuleGraph,
    /// Configured entries by identity, so one reached as a dependency first
    /// is created as an entry.
    entries: FxHashMap<&'a str, &'a Entry>,
    before_parse: Option<BeforeParse<'a>>,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder.
    pub fn new(options: &'a Options, cache: &'a CacheStore, syntax: &'a dyn Syntax) -> Self {
        Self {
            options,
            cache,
            syntax,
            resolver: Resolver::new(options.aliases.clone(), options.extensions.iter().cloned()),
            graph: ModuleGraph::new(),
            entries: options.entries.iter().map(|e| (e.identity.as_str(), e)).collect(),
            before_parse: None,
        }
    }

    /// Run `hook` before each module is parsed or restored.
    ///
    /// The hook may rewrite the module's content.
    pub fn on_before_parse(
        mut self,
        hook: impl FnMut(&mut ModuleGraph, ModuleId) -> Result<(), CompileError> + 'a,
    ) -> Self {
        self.before_parse = Some(Box::new(hook));
        self
    }

    /// Discover every module reachable from the configured entries.
    pub fn build(mut self) -> Result<ModuleGraph, CompileError> {
        let options = self.options;
        for entry in &options.entries {
            let id = self.add_entry(entry);
            self.parse(id)?;
        }

        for module in self.graph.iter_mut() {
            module.state = ModuleState::Closed;
        }
        Ok(self.graph)
    }

    // -------------------------------------------------------------------------
    // Entries
    // -------------------------------------------------------------------------

    fn add_entry(&mut self, entry: &Entry) -> ModuleId {
        if let Some(id) = self.graph.id_of(&entry.identity) {
            // Reached from an earlier entry, already created as one.
            return id;
        }

        let context = entry
            .path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| self.options.context.clone(), Path::to_path_buf);
        let id = self.graph.insert(
            entry.identity.clone(),
            entry.path.clone(),
            entry.content.clone(),
            context,
        );
        self.mark_entry(id, entry);
        id
    }

    fn mark_entry(&mut self, id: ModuleId, entry: &Entry) {
        let module = &mut self.graph[id];
        module.entry = true;
        module.output = Some(entry.output.clone());
    }

    // -------------------------------------------------------------------------
    // Parsing
    // -------------------------------------------------------------------------

    fn parse(&mut self, id: ModuleId) -> Result<(), CompileError> {
        {
            let module = &self.graph[id];
            if module.passthrough || module.state != ModuleState::Unparsed || module.guard == DepGuard::Set {
                return Ok(());
            }
        }
        self.graph[id].state = ModuleState::Parsing;

        if let Some(hook) = self.before_parse.as_mut() {
            hook(&mut self.graph, id)?;
        }

        if let Some(record) = self.restorable_record(id) {
            return self.restore(id, record);
        }
        self.parse_fresh(id)
    }

    /// A valid cache record whose dependencies can all be materialized.
    fn restorable_record(&self, id: ModuleId) -> Option<Arc<CacheRecord>> {
        let module = &self.graph[id];
        let record = self.cache.lookup(&module.cache_identity(), &module.content)?;
        let complete = record
            .dependencies
            .iter()
            .all(|dep| self.graph.id_of(dep).is_some() || Path::new(dep).is_file());
        if !complete {
            tracing::debug!(
                target: "module_transformer::cache",
                identity = module.identity(),
                "cached dependency missing, parsing again"
            );
        }
        complete.then_some(record)
    }

    fn parse_fresh(&mut self, id: ModuleId) -> Result<(), CompileError> {
        let tree = {
            let module = &self.graph[id];
            let source = String::from_utf8_lossy(&module.content);
            self.syntax
                .parse(&source, &self.options.dialect)
                .map_err(|err| {
                    CompileError::parse(Diagnostic::with_source(
                        module.identity.as_str(),
                        err.message,
                        &source,
                        err.location,
                    ))
                })?
        };
        let references = tree.references();
        self.graph[id].tree = Some(tree);

        for reference in references {
            self.handle_dependency(id, reference)?;
        }
        self.graph[id].state = ModuleState::DepsDiscovered;
        Ok(())
    }

    /// Replay a cached dependency list instead of parsing.
    fn restore(&mut self, id: ModuleId, record: Arc<CacheRecord>) -> Result<(), CompileError> {
        {
            let module = &mut self.graph[id];
            module.guard = DepGuard::Set;
            module.state = ModuleState::CacheRestored;
            module.cache_record = Some(record.clone());
        }

        for identity in &record.dependencies {
            let target = match self.graph.id_of(identity) {
                Some(target) => target,
                None => self.create(PathBuf::from(identity))?,
            };
            self.graph[id].dependencies.push(Dependency {
                target,
                from_cache: true,
                specifier: None,
                rewrite: None,
            });
            self.parse(target)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Dependencies
    // -------------------------------------------------------------------------

    fn handle_dependency(&mut self, parent: ModuleId, reference: Reference) -> Result<(), CompileError> {
        let specifier = reference.specifier.as_str();
        let importer = &self.graph[parent];

        if is_builtin(specifier) {
            tracing::trace!(target: "module_transformer::graph", specifier, "builtin dropped");
            return Ok(());
        }
        if !importer.third_party {
            if importer.is_synthetic() && is_relative(specifier) {
                tracing::trace!(target: "module_transformer::graph", specifier, "relative reference in synthetic entry dropped");
                return Ok(());
            }
            if importer.entry && !self.options.allows(specifier) {
                tracing::trace!(target: "module_transformer::graph", specifier, "filtered out");
                return Ok(());
            }
        }

        let resolved = self
            .resolver
            .resolve(specifier, &importer.context, !importer.third_party)
            .ok_or_else(|| ResolveError {
                specifier: reference.specifier.clone(),
                importer: importer.identity.clone(),
                location: Some(reference.location),
            })?;
        let parent_root = importer.naming.root().map(str::to_owned);

        let target = match self.graph.id_of(&to_slash(&resolved)) {
            Some(target) => target,
            None => self.create(resolved)?,
        };
        tracing::trace!(
            target: "module_transformer::graph",
            from = %parent,
            to = %target,
            specifier,
            "edge"
        );

        if self.options.naming == NamingPolicy::Named && self.graph[target].naming == Naming::Pending {
            self.graph[target].naming = naming::derive(specifier, parent_root.as_deref());
        }
        self.graph[parent].dependencies.push(Dependency {
            target,
            from_cache: false,
            specifier: Some(reference.specifier),
            rewrite: Some(reference.token),
        });

        self.parse(target)
    }

    /// Read a file and add it as a new module.
    ///
    /// A configured entry keeps its entry content, output and filter.
    fn create(&mut self, path: PathBuf) -> Result<ModuleId, CompileError> {
        let identity = to_slash(&path);
        let context = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if let Some(&entry) = self.entries.get(identity.as_str()) {
            let id = self.graph.insert(identity, Some(path), entry.content.clone(), context);
            self.mark_entry(id, entry);
            return Ok(id);
        }

        let content = fs::read(&path).map_err(|err| CompileError::io(&path, err))?;
        Ok(self.graph.insert(identity, Some(path), content, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::EcmaSyntax;
    use crate::testing::Project;

    fn build(options: &Options) -> Result<ModuleGraph, CompileError> {
        let cache = CacheStore::from_options(options);
        GraphBuilder::new(options, &cache, &EcmaSyntax).build()
    }

    #[test]
    fn test_discovery_order_and_dedup() {
        let project = Project::packages();
        let options = project.options().entry("entry-1.js").entry("entry-2.js").build().unwrap();
        let graph = build(&options).unwrap();

        // a, b, c, d are each `index.js` inside their package.
        let identities: Vec<_> = graph.iter().map(|m| project.relative(m.identity())).collect();
        assert_eq!(
            identities,
            vec![
                "entry-1.js",
                "node_modules/a/index.js",
                "node_modules/b/index.js",
                "node_modules/c/index.js",
                "node_modules/d/index.js",
                "entry-2.js",
            ]
        );

        let b = graph.id_of(&project.identity("node_modules/b/index.js")).unwrap();
        let c = graph.id_of(&project.identity("node_modules/c/index.js")).unwrap();
        let entry_1 = graph.id_of(&project.identity("entry-1.js")).unwrap();
        assert_eq!(graph.dependents(b), vec![entry_1, c]);

        let entries: Vec<_> = graph.entries().map(|m| m.id().get()).collect();
        assert_eq!(entries, vec![1, 6]);
        assert!(graph.iter().all(|m| m.state() == ModuleState::Closed));
    }

    #[test]
    fn test_entry_filter() {
        let project = Project::packages();
        let options = project
            .options()
            .entry("entry-1.js")
            .exclude("/^[abc]/")
            .exclude("./entry-2")
            .build()
            .unwrap();
        let graph = build(&options).unwrap();

        let identities: Vec<_> = graph.iter().map(|m| project.relative(m.identity())).collect();
        assert_eq!(identities, vec!["entry-1.js", "node_modules/d/index.js"]);
        assert_eq!(graph[ModuleId::from_index(0)].dependencies().len(), 1);
    }

    #[test]
    fn test_filter_applies_to_entry_reached_as_dependency() {
        let project = Project::packages();
        project.file("entry-2.js", "require('a');\n");
        let options = project
            .options()
            .entry("entry-1.js")
            .entry("entry-2.js")
            .exclude("/^a/")
            .build()
            .unwrap();
        let graph = build(&options).unwrap();

        let entry_2 = graph.lookup(&project.identity("entry-2.js")).unwrap();
        assert!(entry_2.is_entry());
        assert!(entry_2.dependencies().is_empty());
        assert!(graph.lookup(&project.identity("node_modules/a/index.js")).is_none());
    }

    #[test]
    fn test_filter_only_applies_to_entries() {
        let project = Project::packages();
        let options = project.options().entry("entry-1.js").exclude("b").build().unwrap();
        let graph = build(&options).unwrap();

        // `c` still pulls in `b`.
        assert!(graph.lookup(&project.identity("node_modules/b/index.js")).is_some());
        let entry = &graph[ModuleId::from_index(0)];
        assert!(entry.dependencies().iter().all(|d| d.specifier.as_deref() != Some("b")));
    }

    #[test]
    fn test_alias_shares_module() {
        let project = Project::packages();
        project.file("alias.js", "const b = require('aliasB');\nconst c = require('c');\n");
        let options = project.options().entry("alias.js").alias("aliasB", "b").build().unwrap();
        let graph = build(&options).unwrap();

        let b = graph.id_of(&project.identity("node_modules/b/index.js")).unwrap();
        // Reached through the alias and, without alias, from inside `c`.
        assert_eq!(graph.dependents(b).len(), 2);
        assert_eq!(graph.iter().filter(|m| m.stem() == "index").count(), 3);
    }

    #[test]
    fn test_cycle_closes() {
        let project = Project::new();
        project.file("a.js", "import './b.js';\nexport const a = 1;\n");
        project.file("b.js", "import './a.js';\nexport const b = 2;\n");
        let options = project.options().entry("a.js").build().unwrap();
        let graph = build(&options).unwrap();

        assert_eq!(graph.len(), 2);
        let (a, b) = (ModuleId::from_index(0), ModuleId::from_index(1));
        assert_eq!(graph[a].dependencies().iter().map(|d| d.target).collect::<Vec<_>>(), vec![b]);
        assert_eq!(graph[b].dependencies().iter().map(|d| d.target).collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn test_builtins_dropped() {
        let project = Project::new();
        project.file("main.js", "const fs = require('fs');\nimport path from 'node:path';\n");
        let options = project.options().entry("main.js").build().unwrap();
        let graph = build(&options).unwrap();

        assert_eq!(graph.len(), 1);
        assert!(graph[ModuleId::from_index(0)].dependencies().is_empty());
    }

    #[test]
    fn test_unresolved_is_fatal() {
        let project = Project::new();
        project.file("main.js", "const x = 1;\nrequire('./missing');\n");
        let options = project.options().entry("main.js").build().unwrap();

        let Err(CompileError::Resolve(err)) = build(&options) else {
            panic!("expected a resolve error");
        };
        assert_eq!(err.specifier, "./missing");
        assert_eq!(err.importer, project.identity("main.js"));
        assert_eq!(err.location.map(|l| (l.line, l.column)), Some((2, 8)));
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let project = Project::new();
        project.file("main.js", "require('./dep');\n");
        project.file("dep.js", "const a = {;\n");
        let options = project.options().entry("main.js").build().unwrap();

        let Err(CompileError::Parse(diagnostic)) = build(&options) else {
            panic!("expected a parse error");
        };
        assert_eq!(diagnostic.path, project.identity("dep.js"));
        assert_eq!(diagnostic.location.line, 1);
        assert!(!diagnostic.source_lines.is_empty());
    }

    #[test]
    fn test_synthetic_entry_drops_relative() {
        let project = Project::packages();
        let options = project
            .options()
            .content_entry("require('./entry-2');\nrequire('a');\n", "inline.js")
            .build()
            .unwrap();
        let graph = build(&options).unwrap();

        assert_eq!(graph[ModuleId::from_index(0)].identity(), "ghost://entry/1.js");
        assert_eq!(graph.len(), 2);
        assert!(graph.lookup(&project.identity("node_modules/a/index.js")).is_some());
    }

    #[test]
    fn test_passthrough_not_parsed() {
        let project = Project::new();
        project.file("main.js", "const logo = require('./logo.png');\n");
        project.file("logo.png", "\u{0}not javascript {");
        let options = project.options().entry("main.js").build().unwrap();
        let graph = build(&options).unwrap();

        let logo = graph.lookup(&project.identity("logo.png")).unwrap();
        assert!(logo.is_passthrough());
        assert!(logo.tree().is_none());
    }

    #[test]
    fn test_named_first_reference_wins() {
        let project = Project::packages();
        project.file("node_modules/c/util.js", "module.exports = 1;\n");
        project.file(
            "node_modules/c/index.js",
            "const b = require('b');\nconst u = require('./util');\nmodule.exports = b + u;\n",
        );
        project.file("main.js", "require('c');\nrequire('aliasB');\n");
        let options = project
            .options()
            .entry("main.js")
            .alias("aliasB", "b")
            .naming(NamingPolicy::Named)
            .build()
            .unwrap();
        let graph = build(&options).unwrap();

        let short = |rel: &str| {
            graph
                .lookup(&project.identity(rel))
                .and_then(|m| m.naming().short().map(str::to_owned))
        };
        assert_eq!(short("node_modules/c/index.js").as_deref(), Some("c"));
        assert_eq!(short("node_modules/c/util.js").as_deref(), Some("c_util"));
        // First referenced as `b` from inside c, not as `aliasB`.
        assert_eq!(short("node_modules/b/index.js").as_deref(), Some("b"));
        assert_eq!(short("main.js"), None);
    }

    #[test]
    fn test_cache_restores_without_parsing() {
        let project = Project::packages();
        let options = project
            .options()
            .entry("entry-1.js")
            .naming(NamingPolicy::Hash)
            .cache(true)
            .cache_dir(".cache")
            .build()
            .unwrap();

        let cache = CacheStore::from_options(&options);
        let entry = project.identity("entry-1.js");
        let c = project.identity("node_modules/c/index.js");
        let b = project.identity("node_modules/b/index.js");
        let d = project.identity("node_modules/d/index.js");
        cache.store(
            &to_slash(&options.entries[0].output),
            &options.entries[0].content,
            vec![c.clone()],
            "cached entry".into(),
        );
        let c_content = fs::read(project.path("node_modules/c/index.js")).unwrap();
        cache.store(&c, &c_content, vec![b.clone(), d.clone()], "cached c".into());
        cache.flush();

        let cache = CacheStore::from_options(&options);
        let graph = GraphBuilder::new(&options, &cache, &EcmaSyntax).build().unwrap();

        let entry = graph.lookup(&entry).unwrap();
        assert!(entry.tree().is_none());
        assert!(entry.cache_record().is_some());
        assert!(entry.dependencies().iter().all(|d| d.from_cache));

        let c = graph.lookup(&c).unwrap();
        assert!(c.tree().is_none());
        assert_eq!(c.guard(), DepGuard::Set);
        // b and d had no records and were parsed.
        assert!(graph.lookup(&b).unwrap().tree().is_some());
        assert!(graph.lookup(&d).unwrap().tree().is_some());
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_cached_cycle_terminates() {
        let project = Project::new();
        project.file("a.js", "require('./b.js');\n");
        project.file("b.js", "require('./a.js');\n");
        let options = project
            .options()
            .entry("a.js")
            .naming(NamingPolicy::Hash)
            .cache(true)
            .cache_dir(".cache")
            .build()
            .unwrap();

        let cache = CacheStore::from_options(&options);
        let a = project.identity("a.js");
        let b = project.identity("b.js");
        cache.store(&to_slash(&options.entries[0].output), b"require('./b.js');\n", vec![b.clone()], "A".into());
        cache.store(&b, b"require('./a.js');\n", vec![a.clone()], "B".into());
        cache.flush();

        let cache = CacheStore::from_options(&options);
        let graph = GraphBuilder::new(&options, &cache, &EcmaSyntax).build().unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.lookup(&a).unwrap().dependencies().len(), 1);
        assert_eq!(graph.lookup(&b).unwrap().dependencies().len(), 1);
        assert!(graph.iter().all(|m| m.tree().is_none()));
    }

    #[test]
    fn test_before_parse_hook_sees_every_module() {
        let project = Project::packages();
        let options = project.options().entry("entry-1.js").build().unwrap();
        let cache = CacheStore::from_options(&options);
        let mut seen = Vec::new();
        let graph = GraphBuilder::new(&options, &cache, &EcmaSyntax)
            .on_before_parse(|graph, id| {
                seen.push(graph[id].id().get());
                Ok(())
            })
            .build()
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(graph.len(), 6);
    }
}
