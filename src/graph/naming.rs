//! Short-name derivation for the `named` policy.
//!
//! | specifier        | parent root | short          | root           |
//! |------------------|-------------|----------------|----------------|
//! | `./util.js`      | `lodash`    | `lodash_util`  | `lodash`       |
//! | `./util.js`      | -           | `util`         | -              |
//! | `lodash`         | any         | `lodash`       | `lodash`       |
//! | `lodash/fp/map`  | any         | `lodash_map`   | `lodash_map`   |

use super::module::Naming;
use crate::resolve::is_relative;
use crate::resolve::path::file_stem;

/// Name a module after the specifier that first referenced it.
pub fn derive(specifier: &str, parent_root: Option<&str>) -> Naming {
    let stem = file_stem(specifier);

    if is_relative(specifier) {
        let short = match parent_root {
            Some(root) => format!("{root}_{stem}"),
            None => stem.to_owned(),
        };
        return Naming::Assigned {
            short,
            root: parent_root.map(str::to_owned),
        };
    }

    let parts: Vec<&str> = specifier.split('/').filter(|p| !p.is_empty()).collect();
    let mut name = parts.first().copied().unwrap_or(stem).to_owned();
    if let [_, .., last] = parts.as_slice() {
        name = file_stem(&format!("{name}_{last}")).to_owned();
    }
    Naming::Assigned {
        short: name.clone(),
        root: Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(specifier: &str, parent_root: Option<&str>) -> (String, Option<String>) {
        match derive(specifier, parent_root) {
            Naming::Assigned { short, root } => (short, root),
            Naming::Pending => unreachable!(),
        }
    }

    #[test]
    fn test_relative_inherits_root() {
        assert_eq!(short("./util.js", Some("lodash")), ("lodash_util".into(), Some("lodash".into())));
        assert_eq!(short("../lib/util", None), ("util".into(), None));
    }

    #[test]
    fn test_package_sets_root() {
        assert_eq!(short("lodash", Some("other")), ("lodash".into(), Some("lodash".into())));
        assert_eq!(short("lodash/fp/map.js", None), ("lodash_map".into(), Some("lodash_map".into())));
        assert_eq!(short("@scope/pkg", None), ("@scope_pkg".into(), Some("@scope_pkg".into())));
    }
}
