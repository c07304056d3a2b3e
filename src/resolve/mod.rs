//! Path & alias resolution.
//!
//! Turns a raw specifier plus the requesting module's directory into an
//! absolute file identity.
//!
//! ```text
//! specifier ──► alias rules ──► ./ ../ /  ──► file, file+ext, dir/main, dir/index+ext
//!                                 │
//!                                 └─ bare ──► <ancestor>/node_modules/<specifier> (same probes)
//! ```

mod alias;
mod builtin;
mod package;
pub mod path;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::diagnostic::Location;

pub use alias::AliasMap;
pub use builtin::is_builtin;
pub use package::{is_third_party, PACKAGE_DIR};

use self::path::normalize_path;

/// Extensions tried when a specifier names a file without one.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".json", ".node"];

// =============================================================================
// Errors
// =============================================================================

/// A specifier that could not be mapped to a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Can't resolve '{specifier}' in '{importer}'{}", location_suffix(.location))]
pub struct ResolveError {
    /// The specifier as written.
    pub specifier: String,
    /// Identity of the module containing the reference.
    pub importer: String,
    /// Location of the reference, when known.
    pub location: Option<Location>,
}

fn location_suffix(location: &Option<Location>) -> String {
    location.map(|l| format!(" ({l})")).unwrap_or_default()
}

// =============================================================================
// Resolver
// =============================================================================

/// Node-style module resolver with alias support.
#[derive(Debug, Clone)]
pub struct Resolver {
    aliases: AliasMap,
    extensions: Vec<String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(AliasMap::default(), DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()))
    }
}

impl Resolver {
    /// Create a resolver.
    pub fn new(aliases: AliasMap, extensions: impl IntoIterator<Item = String>) -> Self {
        Self {
            aliases,
            extensions: extensions.into_iter().collect(),
        }
    }

    /// Resolve `specifier` as seen from a module in `from_dir`.
    ///
    /// Alias rules are applied first when `apply_aliases` is set. Builtins are
    /// not screened here.
    pub fn resolve(&self, specifier: &str, from_dir: &Path, apply_aliases: bool) -> Option<PathBuf> {
        let aliased = apply_aliases.then(|| self.aliases.apply(specifier)).flatten();
        let specifier = aliased.as_deref().unwrap_or(specifier);

        let resolved = if is_path_like(specifier) {
            self.load(&normalize_path(&from_dir.join(specifier)))
        } else {
            self.load_from_packages(specifier, from_dir)
        };

        tracing::trace!(
            target: "module_transformer::resolve",
            specifier,
            from = %from_dir.display(),
            resolved = ?resolved,
        );
        resolved
    }

    fn load(&self, path: &Path) -> Option<PathBuf> {
        self.load_file(path).or_else(|| self.load_dir(path))
    }

    fn load_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        self.extensions.iter().find_map(|ext| {
            let mut candidate = path.as_os_str().to_owned();
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            candidate.is_file().then_some(candidate)
        })
    }

    fn load_dir(&self, dir: &Path) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        if let Some(main) = package::manifest_main(dir) {
            let main = normalize_path(&dir.join(main));
            if let Some(found) = self.load_file(&main).or_else(|| self.load_index(&main)) {
                return Some(found);
            }
        }
        self.load_index(dir)
    }

    fn load_index(&self, dir: &Path) -> Option<PathBuf> {
        self.extensions.iter().find_map(|ext| {
            let candidate = dir.join(format!("index{ext}"));
            candidate.is_file().then_some(candidate)
        })
    }

    fn load_from_packages(&self, specifier: &str, from_dir: &Path) -> Option<PathBuf> {
        from_dir
            .ancestors()
            .filter(|dir| dir.file_name().is_none_or(|name| name != PACKAGE_DIR))
            .find_map(|dir| self.load(&dir.join(PACKAGE_DIR).join(specifier)))
    }
}

/// Whether a specifier addresses the file system directly.
fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// Whether a specifier is relative to the requesting module.
pub fn is_relative(specifier: &str) -> bool {
    specifier.starts_with('.')
}
