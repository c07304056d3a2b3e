//! Assembled output files.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::graph::ModuleId;

/// One output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Module the asset was produced from.
    pub id: ModuleId,
    /// Absolute output path.
    pub path: PathBuf,
    /// Path relative to the output root, `/`-separated.
    pub filename: String,
    /// Final content.
    pub content: Vec<u8>,
}

impl Asset {
    /// Content as text, replacing invalid UTF-8.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Assets of one run, kept in module-id order.
#[derive(Debug, Default)]
pub struct Assets {
    assets: Vec<Asset>,
    by_filename: FxHashMap<String, usize>,
}

impl Assets {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether there are no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Add an asset; an existing asset with the same filename is replaced.
    pub fn insert(&mut self, asset: Asset) {
        match self.by_filename.get(&asset.filename) {
            Some(&index) => self.assets[index] = asset,
            None => {
                self.by_filename.insert(asset.filename.clone(), self.assets.len());
                self.assets.push(asset);
            }
        }
    }

    /// Asset by filename relative to the output root.
    pub fn get(&self, filename: &str) -> Option<&Asset> {
        self.by_filename.get(filename).map(|&i| &self.assets[i])
    }

    /// Mutable asset by filename relative to the output root.
    pub fn get_mut(&mut self, filename: &str) -> Option<&mut Asset> {
        self.by_filename.get(filename).map(|&i| &mut self.assets[i])
    }

    /// Asset produced from module `id`.
    pub fn of(&self, id: ModuleId) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Asset whose absolute output path is `path`.
    pub fn at(&self, path: &Path) -> Option<&Asset> {
        self.assets.iter().find(|a| a.path == path)
    }

    /// Assets in module-id order.
    pub fn iter(&self) -> std::slice::Iter<'_, Asset> {
        self.assets.iter()
    }

    /// Mutable assets in module-id order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Asset> {
        self.assets.iter_mut()
    }

    pub(crate) fn as_slice(&self) -> &[Asset] {
        &self.assets
    }
}

impl<'a> IntoIterator for &'a Assets {
    type Item = &'a Asset;
    type IntoIter = std::slice::Iter<'a, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
