//! Folders the user has opened

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tagtree_core::tagpath;

/// Node keys (`root/a/→ b`) of expanded folders
///
/// Collapsing a folder also forgets every folder opened beneath it, since
/// those keys would otherwise reopen the collapsed path on the next build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandedSet {
    keys: BTreeSet<String>,
}

impl ExpandedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the set changed
    pub fn set(&mut self, key: &str, expanded: bool) -> bool {
        if expanded {
            return self.keys.insert(key.to_string());
        }
        let before = self.keys.len();
        self.keys.retain(|k| !tagpath::is_path_prefix(key, k));
        self.keys.len() != before
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| tagpath::eq_fold(k, key))
    }

    /// Replace the whole set
    pub fn restore<S: Into<String>>(&mut self, keys: impl IntoIterator<Item = S>) {
        self.keys = keys.into_iter().map(Into::into).filter(|k: &String| !k.is_empty()).collect();
    }

    /// Keys in stable order, for persistence
    pub fn serialize(&self) -> Vec<String> {
        self.keys.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
