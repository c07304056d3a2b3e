//! Start-of-run cleanup.

use std::fs;
use std::io;

use super::{HookPoint, Hooks, Plugin};

/// Removes the output directory before entries are resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clean;

impl Plugin for Clean {
    fn name(&self) -> &str {
        "clean"
    }

    fn apply(&self, hooks: &mut Hooks) {
        hooks.on(HookPoint::BeforeResolveEntries, |ctx| {
            let output = &ctx.options.output_path;
            match fs::remove_dir_all(output) {
                Ok(()) => {
                    tracing::debug!(target: "module_transformer::clean", path = %output.display(), "output removed");
                    Ok(())
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        });
    }
}

/// Empties the cache directory before entries are resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearCache;

impl Plugin for ClearCache {
    fn name(&self) -> &str {
        "clear-cache"
    }

    fn apply(&self, hooks: &mut Hooks) {
        hooks.on(HookPoint::BeforeResolveEntries, |ctx| Ok(ctx.cache.clear()?));
    }
}
