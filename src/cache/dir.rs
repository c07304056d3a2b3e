//! Cache directory discovery.

use std::path::{Path, PathBuf};

use crate::resolve::PACKAGE_DIR;

/// Directory name of the cache, inside the chosen parent.
pub const CACHE_DIR_NAME: &str = ".transformer_cache";

/// Locate the cache directory for a project rooted at `context`.
///
/// Uses the nearest ancestor package directory, falling back to the system
/// temp directory.
pub fn locate(context: &Path) -> PathBuf {
    context
        .ancestors()
        .map(|dir| dir.join(PACKAGE_DIR))
        .find(|dir| dir.is_dir())
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}
