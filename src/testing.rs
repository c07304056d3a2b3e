//! Temporary project trees for tests.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::config::OptionsBuilder;
use crate::resolve::path::to_slash;

/// A project directory that is removed on drop.
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// An empty project.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Two entries over four installed packages.
    ///
    /// ```text
    /// entry-1.js ─► a, b, c, d, ./entry-2
    /// c          ─► b, d
    /// ```
    pub fn packages() -> Self {
        let project = Self::new();
        project.file(
            "entry-1.js",
            "const a = require('a');\n\
             const b = require('b');\n\
             const c = require('c');\n\
             const d = require('d');\n\
             const entry2 = require('./entry-2');\n\
             module.exports = { a, b, c, d, entry2 };\n",
        );
        project.file("entry-2.js", "module.exports = 'entry-2';\n");
        project.file("node_modules/a/index.js", "module.exports = 'a';\n");
        project.file("node_modules/b/index.js", "module.exports = 'b-' + 2;\n");
        project.file(
            "node_modules/c/index.js",
            "const b = require('b');\nconst d = require('d');\nmodule.exports = 'c' + b + d;\n",
        );
        project.file("node_modules/d/index.js", "module.exports = 'd';\n");
        project
    }

    /// Write a file, creating parent directories.
    pub fn file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Absolute path of a project file.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Module identity of a project file.
    pub fn identity(&self, relative: &str) -> String {
        to_slash(&self.path(relative))
    }

    /// Project-relative form of an identity.
    pub fn relative(&self, identity: &str) -> String {
        let root = format!("{}/", to_slash(self.dir.path()));
        identity.strip_prefix(&root).unwrap_or(identity).to_owned()
    }

    /// Read an output file under `dist/`.
    pub fn read_output(&self, relative: &str) -> String {
        fs::read_to_string(self.path("dist").join(relative)).unwrap()
    }

    /// Options rooted at this project.
    pub fn options(&self) -> OptionsBuilder {
        OptionsBuilder::new().context(self.dir.path())
    }
}
