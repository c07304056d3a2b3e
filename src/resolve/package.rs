//! Third-party package lookup.

use std::fs;
use std::path::{Component, Path};

use serde::Deserialize;

/// Directory name that holds installed third-party packages.
pub const PACKAGE_DIR: &str = "node_modules";

/// The fields of `package.json` that resolution cares about.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    main: Option<String>,
}

/// Declared entry point of the package rooted at `dir`.
///
/// A missing or malformed manifest counts as "no entry point declared".
pub fn manifest_main(dir: &Path) -> Option<String> {
    let manifest_path = dir.join("package.json");
    let text = fs::read_to_string(&manifest_path).ok()?;
    match serde_json::from_str::<Manifest>(&text) {
        Ok(manifest) => manifest.main.filter(|main| !main.is_empty()),
        Err(err) => {
            tracing::debug!(
                target: "module_transformer::resolve",
                path = %manifest_path.display(),
                error = %err,
                "ignoring malformed package manifest"
            );
            None
        }
    }
}

/// Whether `path` lives inside an installed package directory.
pub fn is_third_party(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == PACKAGE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_main() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "a", "main": "lib/a.js"}"#).unwrap();
        assert_eq!(manifest_main(dir.path()).as_deref(), Some("lib/a.js"));
    }

    #[test]
    fn test_manifest_main_missing_or_malformed() {
        let dir = TempDir::new().unwrap();
        assert_eq!(manifest_main(dir.path()), None);

        fs::write(dir.path().join("package.json"), "{ not json").unwrap();
        assert_eq!(manifest_main(dir.path()), None);

        fs::write(dir.path().join("package.json"), r#"{"name": "a"}"#).unwrap();
        assert_eq!(manifest_main(dir.path()), None);
    }

    #[test]
    fn test_is_third_party() {
        assert!(is_third_party(Path::new("/p/node_modules/a/index.js")));
        assert!(!is_third_party(Path::new("/p/src/node_modules_like.js")));
    }
}
