//! Compilation options.
//!
//! User-facing options come in as [`RawOptions`], either deserialized from
//! JSON or assembled with [`OptionsBuilder`]. [`RawOptions::normalize`] turns
//! them into the finalized [`Options`] the compiler runs on: every path is
//! absolute, entries are read, patterns are compiled and the cache
//! fingerprint is computed.
//!
//! # Example
//!
//! ```ignore
//! use module_transformer::config::{NamingPolicy, OptionsBuilder};
//!
//! let options = OptionsBuilder::new()
//!     .context("./app")
//!     .entry("src/main.js")
//!     .naming(NamingPolicy::Hash)
//!     .cache(true)
//!     .build()?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::hash::content_hash;
use crate::resolve::path::{absolutize, relative_path, to_slash};
use crate::resolve::{is_relative, AliasMap, DEFAULT_EXTENSIONS};
use crate::syntax::Dialect;

/// Default output directory, relative to the context.
const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Default directory for non-entry modules, relative to the output path.
const DEFAULT_MODULE_DIR: &str = ".modules";

/// Scheme of synthetic entry identities.
pub const SYNTHETIC_SCHEME: &str = "ghost://";

// =============================================================================
// Errors
// =============================================================================

/// Invalid or unusable options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No entries were configured.
    #[error("no input configured")]
    NoEntries,

    /// An entry has neither a filename nor content.
    #[error("input #{index} needs a filename or content")]
    EmptyEntry {
        /// Position in the input list.
        index: usize,
    },

    /// A content-only entry has no output destination.
    #[error("input #{index} has inline content but no output")]
    MissingOutput {
        /// Position in the input list.
        index: usize,
    },

    /// Two entries resolve to the same identity.
    #[error("input {identity} is configured more than once")]
    DuplicateEntry {
        /// Shared identity.
        identity: String,
    },

    /// An entry file could not be read.
    #[error("failed to read input {}: {source}", path.display())]
    ReadEntry {
        /// Entry file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An include/exclude pattern is not a valid regular expression.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Pattern as written.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Caching was enabled with a naming policy that is not stable across runs.
    #[error("cache requires `hash` module naming, got `{naming}`")]
    CacheRequiresHashNaming {
        /// Configured policy.
        naming: NamingPolicy,
    },

    /// The working directory is unavailable.
    #[error("cannot determine working directory: {0}")]
    CurrentDir(#[source] io::Error),

    /// An options file could not be read.
    #[error("failed to read options file {}: {source}", path.display())]
    ReadOptions {
        /// Options file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Options JSON is malformed.
    #[error("malformed options: {0}")]
    Parse(#[from] serde_json::Error),
}

// =============================================================================
// Naming Policy
// =============================================================================

/// How non-entry modules are named in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingPolicy {
    /// `<id><ext>`.
    #[default]
    Id,
    /// `<hash of source path><ext>`.
    Hash,
    /// `<derived name>[_n]<ext>`.
    Named,
}

impl fmt::Display for NamingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Id => "id",
            Self::Hash => "hash",
            Self::Named => "named",
        })
    }
}

// =============================================================================
// Specifier Patterns
// =============================================================================

/// An include/exclude pattern over raw specifiers.
///
/// `/body/flags` is a regular expression, anything else matches exactly.
#[derive(Debug, Clone)]
pub enum SpecifierPattern {
    /// Exact specifier.
    Exact(String),
    /// Regular expression; keeps its source text for fingerprinting.
    Regex {
        /// Pattern as written.
        source: String,
        /// Compiled expression.
        regex: Regex,
    },
}

impl SpecifierPattern {
    /// Parse a pattern.
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let Some((body, flags)) = split_regex_literal(pattern) else {
            return Ok(Self::Exact(pattern.to_owned()));
        };

        let invalid = |reason: String| ConfigError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason,
        };
        let mut builder = RegexBuilder::new(body);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                // Stateful/unicode flags have no meaning for a single test.
                'g' | 'u' | 'y' => &mut builder,
                other => return Err(invalid(format!("unsupported flag `{other}`"))),
            };
        }
        let regex = builder.build().map_err(|err| invalid(err.to_string()))?;
        Ok(Self::Regex {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// Whether `specifier` matches.
    pub fn matches(&self, specifier: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == specifier,
            Self::Regex { regex, .. } => regex.is_match(specifier),
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(exact) => exact,
            Self::Regex { source, .. } => source,
        }
    }
}

impl fmt::Display for SpecifierPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `/body/flags` into its parts; flags must be ASCII letters.
fn split_regex_literal(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = (&rest[..close], &rest[close + 1..]);
    (!body.is_empty() && flags.chars().all(|c| c.is_ascii_alphabetic())).then_some((body, flags))
}

// =============================================================================
// Raw Options
// =============================================================================

/// One configured input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntry {
    /// Source file, relative to the context.
    pub filename: Option<PathBuf>,
    /// Inline content, used instead of reading `filename`.
    pub content: Option<String>,
    /// Output destination, relative to the output path.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum RawInputItem {
    Path(PathBuf),
    Entry(RawEntry),
}

impl From<RawInputItem> for RawEntry {
    fn from(item: RawInputItem) -> Self {
        match item {
            RawInputItem::Path(filename) => RawEntry {
                filename: Some(filename),
                ..RawEntry::default()
            },
            RawInputItem::Entry(entry) => entry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum RawInput {
    One(RawInputItem),
    Many(Vec<RawInputItem>),
}

fn deserialize_input<'de, D>(deserializer: D) -> Result<Vec<RawEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match RawInput::deserialize(deserializer)? {
        RawInput::One(item) => vec![item.into()],
        RawInput::Many(items) => items.into_iter().map(Into::into).collect(),
    })
}

/// Output layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOutput {
    /// Output root, relative to the context.
    pub path: Option<PathBuf>,
    /// Directory for non-entry modules, relative to the output root.
    pub module_dir: Option<PathBuf>,
    /// Naming policy for non-entry modules.
    pub named_module: NamingPolicy,
}

/// Options handed through to collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAdvanced {
    /// Parser dialect.
    pub parse_options: Dialect,
}

/// User-facing options, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOptions {
    /// Working context; relative paths resolve against it.
    pub context: Option<PathBuf>,
    /// Entries: a path, an entry object, or a list of either.
    #[serde(deserialize_with = "deserialize_input")]
    pub input: Vec<RawEntry>,
    /// Output layout.
    pub output: RawOutput,
    /// Relative specifiers entry modules may follow; empty means all.
    /// Non-relative specifiers are always followed unless excluded.
    pub include: Vec<String>,
    /// Specifiers entry modules must not follow.
    pub exclude: Vec<String>,
    /// Specifier prefix aliases for first-party modules.
    pub alias: BTreeMap<String, String>,
    /// Extensions tried during resolution.
    pub extensions: Option<Vec<String>>,
    /// Enable the persistent cache.
    pub cache: bool,
    /// Explicit cache directory, relative to the context.
    pub cache_dir: Option<PathBuf>,
    /// Collaborator options.
    pub advanced: RawAdvanced,
}

impl RawOptions {
    /// Parse options from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadOptions {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Validate and finalize.
    pub fn normalize(self) -> Result<Options, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        let context = absolutize(self.context.as_deref().unwrap_or(Path::new(".")), &cwd);

        let output_path = absolutize(
            self.output.path.as_deref().unwrap_or(Path::new(DEFAULT_OUTPUT_DIR)),
            &context,
        );
        let module_dir = absolutize(
            self.output.module_dir.as_deref().unwrap_or(Path::new(DEFAULT_MODULE_DIR)),
            &output_path,
        );
        let naming = self.output.named_module;

        if self.cache && naming != NamingPolicy::Hash {
            return Err(ConfigError::CacheRequiresHashNaming { naming });
        }

        let include = parse_patterns(&self.include)?;
        let exclude = parse_patterns(&self.exclude)?;
        let extensions = self
            .extensions
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect());
        let aliases = AliasMap::new(self.alias.clone(), &context);
        let dialect = self.advanced.parse_options;

        let entries = normalize_entries(self.input, &context, &output_path)?;
        let cache_dir = self.cache_dir.map(|dir| absolutize(&dir, &context));

        let fingerprint = content_hash(
            serde_json::json!({
                "context": to_slash(&context),
                "output": to_slash(&output_path),
                "moduleDir": to_slash(&module_dir),
                "naming": naming,
                "include": include.iter().map(SpecifierPattern::as_str).collect::<Vec<_>>(),
                "exclude": exclude.iter().map(SpecifierPattern::as_str).collect::<Vec<_>>(),
                "alias": self.alias,
                "extensions": extensions,
                "dialect": dialect,
            })
            .to_string(),
        );

        Ok(Options {
            context,
            entries,
            output_path,
            module_dir,
            naming,
            include,
            exclude,
            aliases,
            extensions,
            cache: self.cache,
            cache_dir,
            dialect,
            fingerprint,
        })
    }
}

fn parse_patterns(patterns: &[String]) -> Result<Vec<SpecifierPattern>, ConfigError> {
    patterns.iter().map(|p| SpecifierPattern::parse(p)).collect()
}

fn normalize_entries(
    input: Vec<RawEntry>,
    context: &Path,
    output_path: &Path,
) -> Result<Vec<Entry>, ConfigError> {
    if input.is_empty() {
        return Err(ConfigError::NoEntries);
    }

    let mut entries: Vec<Entry> = Vec::with_capacity(input.len());
    let mut synthetic_count = 0;
    for (index, raw) in input.into_iter().enumerate() {
        let output = raw.output.as_deref().map(|o| absolutize(o, output_path));

        let entry = match (raw.filename, raw.content) {
            (Some(filename), content) => {
                let path = absolutize(&filename, context);
                let content = match content {
                    Some(text) => text.into_bytes(),
                    None => fs::read(&path).map_err(|source| ConfigError::ReadEntry {
                        path: path.clone(),
                        source,
                    })?,
                };
                let output = output
                    .unwrap_or_else(|| output_path.join(relative_path(context, &path)));
                Entry {
                    identity: to_slash(&path),
                    path: Some(path),
                    content,
                    output,
                }
            }
            (None, Some(content)) => {
                synthetic_count += 1;
                Entry {
                    identity: format!("{SYNTHETIC_SCHEME}entry/{synthetic_count}.js"),
                    path: None,
                    content: content.into_bytes(),
                    output: output.ok_or(ConfigError::MissingOutput { index })?,
                }
            }
            (None, None) => return Err(ConfigError::EmptyEntry { index }),
        };

        if entries.iter().any(|e| e.identity == entry.identity) {
            return Err(ConfigError::DuplicateEntry {
                identity: entry.identity,
            });
        }
        entries.push(entry);
    }
    Ok(entries)
}

// =============================================================================
// Finalized Options
// =============================================================================

/// A finalized entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Module identity: the `/`-separated absolute path, or a `ghost://` marker.
    pub identity: String,
    /// Backing file, absent for synthetic entries.
    pub path: Option<PathBuf>,
    /// Source content.
    pub content: Vec<u8>,
    /// Absolute output destination.
    pub output: PathBuf,
}

impl Entry {
    /// Whether the content was supplied inline rather than read from a file.
    pub fn is_synthetic(&self) -> bool {
        self.path.is_none()
    }
}

/// Finalized compilation options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Absolute working context.
    pub context: PathBuf,
    /// Entries in configuration order.
    pub entries: Vec<Entry>,
    /// Absolute output root.
    pub output_path: PathBuf,
    /// Absolute directory for non-entry modules.
    pub module_dir: PathBuf,
    /// Naming policy for non-entry modules.
    pub naming: NamingPolicy,
    /// Relative specifiers entry modules may follow; empty means all.
    pub include: Vec<SpecifierPattern>,
    /// Specifiers entry modules must not follow.
    pub exclude: Vec<SpecifierPattern>,
    /// Alias rules for first-party modules.
    pub aliases: AliasMap,
    /// Extensions tried during resolution.
    pub extensions: Vec<String>,
    /// Whether the persistent cache is enabled.
    pub cache: bool,
    /// Explicit cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Parser dialect.
    pub dialect: Dialect,
    /// Hash over every option that affects generated output.
    pub fingerprint: String,
}

impl Options {
    /// Start building options.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    /// Whether an entry module may follow `specifier`.
    ///
    /// Non-relative specifiers are always included; `include` only narrows
    /// relative ones. `exclude` applies to both.
    pub fn allows(&self, specifier: &str) -> bool {
        let included = !is_relative(specifier)
            || self.include.is_empty()
            || self.include.iter().any(|p| p.matches(specifier));
        included && !self.exclude.iter().any(|p| p.matches(specifier))
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Fluent builder for [`Options`].
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    raw: RawOptions,
}

impl OptionsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from already-loaded raw options.
    pub fn from_raw(raw: RawOptions) -> Self {
        Self { raw }
    }

    /// Set the working context.
    pub fn context(mut self, context: impl Into<PathBuf>) -> Self {
        self.raw.context = Some(context.into());
        self
    }

    /// Add a file entry; its output mirrors its path under the output root.
    pub fn entry(mut self, filename: impl Into<PathBuf>) -> Self {
        self.raw.input.push(RawEntry {
            filename: Some(filename.into()),
            ..RawEntry::default()
        });
        self
    }

    /// Add a file entry with an explicit output.
    pub fn entry_with_output(mut self, filename: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        self.raw.input.push(RawEntry {
            filename: Some(filename.into()),
            content: None,
            output: Some(output.into()),
        });
        self
    }

    /// Add an entry with inline content.
    pub fn content_entry(mut self, content: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        self.raw.input.push(RawEntry {
            filename: None,
            content: Some(content.into()),
            output: Some(output.into()),
        });
        self
    }

    /// Set the output root.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.output.path = Some(path.into());
        self
    }

    /// Set the directory for non-entry modules.
    pub fn module_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.output.module_dir = Some(dir.into());
        self
    }

    /// Set the naming policy.
    pub fn naming(mut self, naming: NamingPolicy) -> Self {
        self.raw.output.named_module = naming;
        self
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.raw.include.push(pattern.into());
        self
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.raw.exclude.push(pattern.into());
        self
    }

    /// Add an alias rule.
    pub fn alias(mut self, prefix: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.raw.alias.insert(prefix.into(), replacement.into());
        self
    }

    /// Replace the resolution extensions.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Enable or disable the persistent cache.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.raw.cache = enabled;
        self
    }

    /// Set an explicit cache directory.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.cache_dir = Some(dir.into());
        self
    }

    /// Set the parser dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.raw.advanced.parse_options = dialect;
        self
    }

    /// Validate and finalize.
    pub fn build(self) -> Result<Options, ConfigError> {
        self.raw.normalize()
    }
}
