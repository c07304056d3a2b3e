//! Specifier alias rules.

use std::path::Path;

use super::path::{absolutize, to_slash};

/// One `prefix -> replacement` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AliasRule {
    prefix: String,
    replacement: String,
}

impl AliasRule {
    /// The remainder of `specifier` after this rule's prefix, if it matches.
    ///
    /// `prefix` matches itself and anything below it (`prefix/...`), never a
    /// longer name that merely starts with it.
    fn strip<'s>(&self, specifier: &'s str) -> Option<&'s str> {
        let rest = specifier.strip_prefix(self.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }
}

/// Ordered alias rules.
///
/// The longest matching prefix wins; between equally long prefixes the rule
/// declared last wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    rules: Vec<AliasRule>,
}

impl AliasMap {
    /// Build rules from `(prefix, replacement)` pairs in declaration order.
    ///
    /// Relative replacements (`./x`, `../x`) are anchored at `context`.
    pub fn new<I, K, V>(pairs: I, context: &Path) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let rules = pairs
            .into_iter()
            .map(|(prefix, replacement)| {
                let replacement: String = replacement.into();
                let replacement = if replacement.starts_with("./") || replacement.starts_with("../") {
                    to_slash(&absolutize(Path::new(&replacement), context))
                } else {
                    replacement
                };
                AliasRule {
                    prefix: prefix.into(),
                    replacement,
                }
            })
            .collect();
        Self { rules }
    }

    /// Whether no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply the best matching rule, keeping any remainder path.
    pub fn apply(&self, specifier: &str) -> Option<String> {
        // `max_by_key` keeps the last of equal maxima.
        self.rules
            .iter()
            .filter_map(|rule| rule.strip(specifier).map(|rest| (rule, rest)))
            .max_by_key(|(rule, _)| rule.prefix.len())
            .map(|(rule, rest)| format!("{}{rest}", rule.replacement))
    }
}
