//! Compilation driver.
//!
//! # Example
//!
//! ```ignore
//! use module_transformer::prelude::*;
//!
//! let options = Options::builder()
//!     .context("project")
//!     .entry("src/main.js")
//!     .naming(NamingPolicy::Hash)
//!     .cache(true)
//!     .build()?;
//!
//! let output = Compiler::new(options)
//!     .with_plugin(Clean)
//!     .with_plugin(EmitFiles)
//!     .run()?;
//!
//! for asset in &output.assets {
//!     println!("{} ({} bytes)", asset.filename, asset.content.len());
//! }
//! ```

use crate::cache::CacheStore;
use crate::config::Options;
use crate::diagnostic::CompileError;
use crate::graph::{GraphBuilder, ModuleGraph};
use crate::output::{assemble, assign_outputs, Assets};
use crate::plugin::{HookContext, HookPoint, HookResult, Hooks, Plugin};
use crate::syntax::{EcmaSyntax, Syntax};

/// Result of a successful run.
#[derive(Debug)]
pub struct BuildOutput {
    /// The closed module graph.
    pub graph: ModuleGraph,
    /// Assembled assets in module-id order.
    pub assets: Assets,
}

/// Builder and driver for one compilation.
///
/// ```text
/// BeforeResolveEntries ─► AfterEntriesResolved
///   ─► graph traversal (BeforeParse per module) ─► AfterModulesClosed
///   ─► naming ─► assembly ─► AfterAssetsAssembled
/// ```
pub struct Compiler {
    options: Options,
    syntax: Box<dyn Syntax>,
    hooks: Hooks,
    plugins: Vec<String>,
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field("plugins", &self.plugins)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Compiler {
    /// Create a compiler using the bundled ECMAScript backend.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            syntax: Box::new(EcmaSyntax::new()),
            hooks: Hooks::new(),
            plugins: Vec::new(),
        }
    }

    /// Replace the parser/printer backend.
    pub fn with_syntax(mut self, syntax: impl Syntax + 'static) -> Self {
        self.syntax = Box::new(syntax);
        self
    }

    /// Register a plugin's callbacks.
    pub fn with_plugin(mut self, plugin: impl Plugin) -> Self {
        plugin.apply(&mut self.hooks);
        self.plugins.push(plugin.name().to_owned());
        self
    }

    /// Register a single callback.
    pub fn with_hook(
        mut self,
        point: HookPoint,
        callback: impl FnMut(&mut HookContext<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.on(point, callback);
        self
    }

    /// Finalized options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Run the whole pipeline.
    ///
    /// Pending cache writes are flushed before returning, whatever the
    /// outcome.
    pub fn run(&mut self) -> Result<BuildOutput, CompileError> {
        let cache = CacheStore::from_options(&self.options);
        let mut graph = ModuleGraph::new();
        let mut assets = Assets::new();

        tracing::info!(
            target: "module_transformer::compile",
            entries = self.options.entries.len(),
            naming = %self.options.naming,
            cache = cache.is_enabled(),
            plugins = ?self.plugins,
            "compilation started"
        );

        let result = self.execute(&cache, &mut graph, &mut assets);
        cache.flush();

        match result {
            Ok(()) => {
                tracing::info!(
                    target: "module_transformer::compile",
                    modules = graph.len(),
                    assets = assets.len(),
                    "compilation finished"
                );
                Ok(BuildOutput { graph, assets })
            }
            Err(err) => {
                tracing::error!(target: "module_transformer::compile", error = %err, "compilation failed");
                let mut ctx = HookContext {
                    options: &self.options,
                    cache: &cache,
                    graph: &mut graph,
                    assets: &mut assets,
                    module: None,
                    error: Some(&err),
                };
                if let Err(hook_err) = self.hooks.run(HookPoint::OnFatalError, &mut ctx) {
                    tracing::warn!(target: "module_transformer::compile", error = %hook_err, "fatal error hook failed");
                }
                Err(err)
            }
        }
    }

    fn execute(&mut self, cache: &CacheStore, graph: &mut ModuleGraph, assets: &mut Assets) -> Result<(), CompileError> {
        let options = &self.options;
        let hooks = &mut self.hooks;

        hooks.run(HookPoint::BeforeResolveEntries, &mut context(options, cache, graph, assets))?;
        hooks.run(HookPoint::AfterEntriesResolved, &mut context(options, cache, graph, assets))?;

        let mut builder = GraphBuilder::new(options, cache, self.syntax.as_ref());
        if hooks.has(HookPoint::BeforeParse) {
            let hooks = &mut *hooks;
            let assets = &mut *assets;
            builder = builder.on_before_parse(move |graph, id| {
                let mut ctx = context(options, cache, graph, assets);
                ctx.module = Some(id);
                hooks.run(HookPoint::BeforeParse, &mut ctx)
            });
        }
        *graph = builder.build()?;
        hooks.run(HookPoint::AfterModulesClosed, &mut context(options, cache, graph, assets))?;

        assign_outputs(graph, options);
        *assets = assemble(graph, options, cache)?;
        hooks.run(HookPoint::AfterAssetsAssembled, &mut context(options, cache, graph, assets))
    }
}

fn context<'a>(
    options: &'a Options,
    cache: &'a CacheStore,
    graph: &'a mut ModuleGraph,
    assets: &'a mut Assets,
) -> HookContext<'a> {
    HookContext {
        options,
        cache,
        graph,
        assets,
        module: None,
        error: None,
    }
}

/// Compile `options` with the default backend and no plugins.
pub fn transform(options: Options) -> Result<BuildOutput, CompileError> {
    Compiler::new(options).run()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::config::NamingPolicy;
    use crate::plugin::{Clean, ClearCache, EmitFiles};
    use crate::syntax::{Dialect, SyntaxError, SyntaxTree};
    use crate::testing::Project;

    /// Counts parse calls made through the bundled backend.
    #[derive(Clone, Default)]
    struct CountingSyntax {
        parses: Arc<AtomicUsize>,
    }

    impl Syntax for CountingSyntax {
        fn parse(&self, source: &str, dialect: &Dialect) -> Result<Box<dyn SyntaxTree>, SyntaxError> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            EcmaSyntax::new().parse(source, dialect)
        }
    }

    #[test]
    fn test_id_naming_scenario() {
        let project = Project::packages();
        let options = project.options().entry("entry-1.js").entry("entry-2.js").build().unwrap();
        Compiler::new(options).with_plugin(EmitFiles).run().unwrap();

        let entry = project.read_output("entry-1.js");
        assert_eq!(
            entry,
            "const a = require('./.modules/2.js');\n\
             const b = require('./.modules/3.js');\n\
             const c = require('./.modules/4.js');\n\
             const d = require('./.modules/5.js');\n\
             const entry2 = require('./entry-2.js');\n\
             module.exports = { a, b, c, d, entry2 };\n"
        );
        assert_eq!(project.read_output(".modules/3.js"), "module.exports = 'b-' + 2;\n");
        assert_eq!(
            project.read_output(".modules/4.js"),
            "const b = require('./3.js');\nconst d = require('./5.js');\nmodule.exports = 'c' + b + d;\n"
        );
        // entry-2 is also an entry, so it keeps its configured destination.
        assert!(!project.path("dist/.modules/6.js").exists());
    }

    #[test]
    fn test_alias_scenario() {
        let project = Project::packages();
        project.file(
            "entry-alias.js",
            "const b = require('aliasB');\nconst b2 = require('b');\nmodule.exports = { b, b2 };\n",
        );
        let options = project.options().entry("entry-alias.js").alias("aliasB", "b").build().unwrap();
        let output = transform(options).unwrap();

        assert_eq!(output.graph.len(), 2);
        let text = output.assets.get("entry-alias.js").unwrap().text().into_owned();
        assert_eq!(text.matches("require('./.modules/2.js')").count(), 2);
        assert_eq!(output.assets.get(".modules/2.js").unwrap().text(), "module.exports = 'b-' + 2;\n");
    }

    #[test]
    fn test_exclude_scenario() {
        let project = Project::packages();
        let options = project
            .options()
            .entry("entry-1.js")
            .exclude("/^[abc]/")
            .exclude("./entry-2")
            .build()
            .unwrap();
        let output = transform(options).unwrap();

        assert_eq!(output.graph.len(), 2);
        assert_eq!(
            output.assets.get("entry-1.js").unwrap().text(),
            "const a = require('a');\n\
             const b = require('b');\n\
             const c = require('c');\n\
             const d = require('./.modules/2.js');\n\
             const entry2 = require('./entry-2');\n\
             module.exports = { a, b, c, d, entry2 };\n"
        );
    }

    #[test]
    fn test_cached_rerun_is_identical_without_parsing() {
        let project = Project::packages();
        let options = || {
            project
                .options()
                .entry("entry-1.js")
                .naming(NamingPolicy::Hash)
                .cache(true)
                .cache_dir(".cache")
                .build()
                .unwrap()
        };

        let syntax = CountingSyntax::default();
        let first = Compiler::new(options()).with_syntax(syntax.clone()).run().unwrap();
        assert_eq!(syntax.parses.load(Ordering::SeqCst), 6);

        let syntax = CountingSyntax::default();
        let second = Compiler::new(options()).with_syntax(syntax.clone()).run().unwrap();
        assert_eq!(syntax.parses.load(Ordering::SeqCst), 0);

        assert_eq!(first.assets.len(), second.assets.len());
        for (a, b) in first.assets.iter().zip(&second.assets) {
            assert_eq!(a.filename, b.filename);
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn test_cached_rerun_with_entry_reached_as_dependency() {
        let project = Project::packages();
        let options = || {
            project
                .options()
                .entry("entry-1.js")
                .entry("entry-2.js")
                .naming(NamingPolicy::Hash)
                .cache(true)
                .cache_dir(".cache")
                .build()
                .unwrap()
        };

        let syntax = CountingSyntax::default();
        let first = Compiler::new(options()).with_syntax(syntax.clone()).run().unwrap();
        assert_eq!(syntax.parses.load(Ordering::SeqCst), 6);

        let syntax = CountingSyntax::default();
        let second = Compiler::new(options()).with_syntax(syntax.clone()).run().unwrap();
        assert_eq!(syntax.parses.load(Ordering::SeqCst), 0);
        assert_eq!(
            first.assets.get("entry-2.js").unwrap().content,
            second.assets.get("entry-2.js").unwrap().content
        );
    }

    #[test]
    fn test_changed_module_is_parsed_again() {
        let project = Project::packages();
        let options = || {
            project
                .options()
                .entry("entry-1.js")
                .naming(NamingPolicy::Hash)
                .cache(true)
                .cache_dir(".cache")
                .build()
                .unwrap()
        };
        transform(options()).unwrap();

        project.file("node_modules/d/index.js", "module.exports = 'd2';\n");
        let syntax = CountingSyntax::default();
        let output = Compiler::new(options()).with_syntax(syntax.clone()).run().unwrap();
        assert_eq!(syntax.parses.load(Ordering::SeqCst), 1);

        let d = output.graph.lookup(&project.identity("node_modules/d/index.js")).unwrap();
        let asset = output.assets.of(d.id()).unwrap();
        assert_eq!(asset.text(), "module.exports = 'd2';\n");
    }

    #[test]
    fn test_cycle_closes() {
        let project = Project::new();
        project.file("a.js", "const b = require('./b');\nmodule.exports = 'a';\n");
        project.file("b.js", "const a = require('./a');\nmodule.exports = 'b';\n");
        let options = project.options().entry("a.js").build().unwrap();
        let output = transform(options).unwrap();

        assert_eq!(output.graph.len(), 2);
        assert_eq!(
            output.assets.get(".modules/2.js").unwrap().text(),
            "const a = require('../a.js');\nmodule.exports = 'b';\n"
        );
    }

    #[test]
    fn test_hook_sequence() {
        let project = Project::packages();
        let options = project.options().entry("entry-1.js").build().unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut compiler = Compiler::new(options);
        for point in [
            HookPoint::BeforeResolveEntries,
            HookPoint::AfterEntriesResolved,
            HookPoint::BeforeParse,
            HookPoint::AfterModulesClosed,
            HookPoint::AfterAssetsAssembled,
            HookPoint::OnFatalError,
        ] {
            let log = log.clone();
            compiler = compiler.with_hook(point, move |ctx| {
                let entry = match ctx.module {
                    Some(id) => format!("{point}:{id}"),
                    None => format!("{point}:{}:{}", ctx.graph.len(), ctx.assets.len()),
                };
                log.borrow_mut().push(entry);
                Ok(())
            });
        }
        compiler.run().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "before-resolve-entries:0:0",
                "after-entries-resolved:0:0",
                "before-parse:1",
                "before-parse:2",
                "before-parse:3",
                "before-parse:4",
                "before-parse:5",
                "before-parse:6",
                "after-modules-closed:6:0",
                "after-assets-assembled:6:6",
            ]
        );
    }

    #[test]
    fn test_before_parse_can_rewrite_content() {
        let project = Project::new();
        project.file("main.js", "require('__DEP__');\n");
        project.file("dep.js", "module.exports = 1;\n");
        let options = project.options().entry("main.js").build().unwrap();

        let output = Compiler::new(options)
            .with_hook(HookPoint::BeforeParse, |ctx| {
                if let Some(id) = ctx.module {
                    let module = &mut ctx.graph[id];
                    let text = String::from_utf8_lossy(module.content()).replace("__DEP__", "./dep");
                    module.set_content(text);
                }
                Ok(())
            })
            .run()
            .unwrap();

        assert_eq!(output.graph.len(), 2);
        assert_eq!(output.assets.get("main.js").unwrap().text(), "require('./.modules/2.js');\n");
    }

    #[test]
    fn test_fatal_error_hook_sees_error() {
        let project = Project::new();
        project.file("main.js", "import x from './missing';\n");
        let options = project.options().entry("main.js").build().unwrap();

        let seen = Rc::new(RefCell::new(None));
        let hook_seen = seen.clone();
        let err = Compiler::new(options)
            .with_plugin(EmitFiles)
            .with_hook(HookPoint::OnFatalError, move |ctx| {
                *hook_seen.borrow_mut() = ctx.error.map(ToString::to_string);
                Ok(())
            })
            .run()
            .unwrap_err();

        assert!(matches!(err, CompileError::Resolve(_)));
        assert_eq!(seen.borrow().as_deref(), Some(err.to_string().as_str()));
        assert!(!project.path("dist").exists());
    }

    #[test]
    fn test_parse_error_renders_frame() {
        let project = Project::new();
        project.file("main.js", "const a = 1;\nconst b = {;\n");
        let options = project.options().entry("main.js").build().unwrap();

        let err = transform(options).unwrap_err();
        let diagnostic = err.diagnostic().unwrap();
        assert!(!diagnostic.message.is_empty());
        assert_eq!(diagnostic.location.line, 2);
        assert!(err.to_string().contains("const b = {;"));
    }

    #[test]
    fn test_hook_failure_is_fatal() {
        let project = Project::packages();
        let options = project.options().entry("entry-1.js").build().unwrap();
        let err = Compiler::new(options)
            .with_hook(HookPoint::AfterModulesClosed, |_| Err("rejected".into()))
            .run()
            .unwrap_err();
        assert!(matches!(err, CompileError::Hook { point: HookPoint::AfterModulesClosed, .. }));
    }

    #[test]
    fn test_clean_and_clear_cache_plugins() {
        let project = Project::packages();
        project.file("dist/stale.js", "old");
        let options = project
            .options()
            .entry("entry-1.js")
            .naming(NamingPolicy::Hash)
            .cache(true)
            .cache_dir(".cache")
            .build()
            .unwrap();
        transform(options.clone()).unwrap();
        assert!(fs::read_dir(project.path(".cache")).unwrap().count() > 0);

        let syntax = CountingSyntax::default();
        Compiler::new(options)
            .with_syntax(syntax.clone())
            .with_plugin(Clean)
            .with_plugin(ClearCache)
            .with_plugin(EmitFiles)
            .run()
            .unwrap();

        assert_eq!(syntax.parses.load(Ordering::SeqCst), 6);
        assert!(!project.path("dist/stale.js").exists());
        assert!(project.path("dist/entry-1.js").exists());
    }

    #[test]
    fn test_synthetic_entry() {
        let project = Project::packages();
        let options = project
            .options()
            .content_entry("const d = require(\"d\");\n", "inline/main.js")
            .build()
            .unwrap();
        let output = transform(options).unwrap();

        assert_eq!(
            output.assets.get("inline/main.js").unwrap().text(),
            "const d = require(\"../.modules/2.js\");\n"
        );
    }
}
