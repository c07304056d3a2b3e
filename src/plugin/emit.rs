//! Write assets to disk.

use std::fs;
use std::io;

use super::{HookPoint, Hooks, Plugin};
use crate::output::Asset;

/// Writes every asset to its output path once assembly is done.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitFiles;

impl Plugin for EmitFiles {
    fn name(&self) -> &str {
        "emit-files"
    }

    fn apply(&self, hooks: &mut Hooks) {
        hooks.on(HookPoint::AfterAssetsAssembled, |ctx| {
            write_all(ctx.assets.as_slice())?;
            tracing::info!(
                target: "module_transformer::emit",
                files = ctx.assets.len(),
                output = %ctx.options.output_path.display(),
                "assets written"
            );
            Ok(())
        });
    }
}

fn write(asset: &Asset) -> io::Result<()> {
    if let Some(parent) = asset.path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&asset.path, &asset.content)
}

#[cfg(feature = "parallel")]
fn write_all(assets: &[Asset]) -> io::Result<()> {
    use rayon::prelude::*;
    assets.par_iter().try_for_each(write)
}

#[cfg(not(feature = "parallel"))]
fn write_all(assets: &[Asset]) -> io::Result<()> {
    assets.iter().try_for_each(write)
}
