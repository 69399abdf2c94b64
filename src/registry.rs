//! The post registry and its JSON file.
//!
//! A [`Registry`] is an ordered list of [`Item`]s. Order is display order:
//! the front end lists posts exactly as they appear here, so every operation
//! that builds a registry decides order explicitly.
//!
//! The file is a JSON array of items (see [`ItemRecord`](crate::types::ItemRecord)
//! for the field names). It is always rewritten whole. A missing file is an
//! empty registry; anything unreadable is an error, never a silent reset.

use crate::types::{Identity, Item};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error on registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed registry {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Ordered collection of posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    items: Vec<Item>,
}

impl Registry {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Find an item by identity.
    pub fn get(&self, identity: &Identity) -> Option<&Item> {
        self.items.iter().find(|i| &i.identity == identity)
    }

    /// Map of identity → position, for order-preserving merges.
    pub fn positions(&self) -> HashMap<Identity, usize> {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.identity, idx))
            .collect()
    }

    /// First identity that appears more than once, if any.
    pub fn duplicate_identity(&self) -> Option<Identity> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .map(|i| i.identity)
            .find(|id| !seen.insert(*id))
    }

    /// Load a registry file. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let meta = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no registry file, starting empty");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if !meta.is_file() {
            return Err(RegistryError::Malformed {
                path: path.to_path_buf(),
                reason: "not a regular file".into(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|reason| RegistryError::Malformed {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse a registry document and check its invariants.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let registry: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        if let Some(dup) = registry.duplicate_identity() {
            return Err(format!("identity {dup} appears more than once"));
        }
        Ok(registry)
    }

    /// Serialize the whole registry and overwrite `path`.
    ///
    /// Not atomic: a crash mid-write can truncate the file. The publish swap
    /// is the only all-or-nothing step in the system.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let io_err = |source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| io_err(e.into()))?;
        fs::write(path, json).map_err(io_err)?;
        debug!(path = %path.display(), items = self.len(), "registry saved");
        Ok(())
    }
}

impl IntoIterator for Registry {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Item> for Registry {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// What changed between two registries, by identity.
///
/// Lists follow the order of the registry they come from: `added` and
/// `changed` in `next` order, `removed` in `previous` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDiff {
    /// In `next` but not in `previous`.
    pub added: Vec<Identity>,
    /// In `previous` but not in `next`.
    pub removed: Vec<Identity>,
    /// In both, with at least one field different.
    pub changed: Vec<Identity>,
    /// Same set of items but in a different order.
    pub reordered: bool,
}

impl RegistryDiff {
    pub fn between(previous: &Registry, next: &Registry) -> Self {
        let mut diff = Self::default();
        for item in next {
            match previous.get(&item.identity) {
                None => diff.added.push(item.identity),
                Some(old) if old != item => diff.changed.push(item.identity),
                Some(_) => {}
            }
        }
        for item in previous {
            if next.get(&item.identity).is_none() {
                diff.removed.push(item.identity);
            }
        }

        let common_prev: Vec<Identity> = previous
            .iter()
            .map(|i| i.identity)
            .filter(|id| next.get(id).is_some())
            .collect();
        let common_next: Vec<Identity> = next
            .iter()
            .map(|i| i.identity)
            .filter(|id| previous.get(id).is_some())
            .collect();
        diff.reordered = common_prev != common_next;
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty() && !self.reordered
    }
}
