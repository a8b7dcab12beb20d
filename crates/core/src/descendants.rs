//! Aggregated descendant sets with dirty propagation
//!
//! Every folder caches the items reachable beneath it. A `None` cache means
//! the node must be recomputed; [`ripple_dirty`] pushes that state up to the
//! ancestors and [`expand_descendants`] recomputes only what is dirty, reusing
//! the cached `Arc`s of clean subtrees untouched.

use crate::item::ItemRef;
use crate::tree::{Child, ItemSet, NodeId, TagTree};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which items a folder hides from its visible set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HidePolicy {
    /// Show every reachable item
    #[default]
    #[serde(rename = "NONE")]
    None,
    /// Hide nested items only on dedicated nested-tag heads
    #[serde(rename = "DEDICATED_INTERMIDIATES", alias = "DEDICATED_INTERMEDIATES")]
    DedicatedIntermediates,
    /// Hide nested items on every folder
    #[serde(rename = "ALL_EXCEPT_BOTTOM")]
    AllExceptBottom,
}

impl HidePolicy {
    fn hides(self, dedicated: bool) -> bool {
        match self {
            HidePolicy::None => false,
            HidePolicy::DedicatedIntermediates => dedicated,
            HidePolicy::AllExceptBottom => true,
        }
    }
}

/// Propagate dirtiness from children up to `id`
///
/// Every folder child is visited. Returns whether `id` needs recomputation.
pub fn ripple_dirty(tree: &mut TagTree, id: NodeId) -> bool {
    let mut child_dirty = false;
    for child in tree.folder_children(id) {
        child_dirty |= ripple_dirty(tree, child);
    }
    if child_dirty {
        tree.mark_dirty(id);
    }
    !tree.node(id).is_clean()
}

/// Recompute the caches of `id` and its dirty descendants
///
/// Returns the unfiltered set (`all_descendants`), unique by item path.
pub fn expand_descendants(tree: &mut TagTree, id: NodeId, hide: HidePolicy) -> ItemSet {
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut all: Vec<ItemRef> = Vec::new();

    let children = tree.node(id).children.clone();
    for child in &children {
        match child {
            Child::Folder(folder) => {
                let cached = tree.node(*folder).all_descendants.clone().filter(|_| tree.node(*folder).is_clean());
                let set = match cached {
                    Some(set) => set,
                    None => expand_descendants(tree, *folder, hide),
                };
                for item in set.iter() {
                    if seen.insert(item.path.clone()) {
                        all.push(item.clone());
                    }
                }
            }
            Child::Leaf(item) => {
                if seen.insert(item.path.clone()) {
                    all.push(item.clone());
                }
            }
        }
    }

    let memo = match tree.node(id).descendants_memo.clone() {
        Some(memo) => memo,
        None => nested_items(tree, &children),
    };
    let nested: AHashSet<&str> = memo.iter().map(|i| i.path.as_str()).collect();

    let all = Arc::new(all);
    let visible = if hide.hides(tree.node(id).is_dedicated_tree) {
        Arc::new(all.iter().filter(|i| !nested.contains(i.path.as_str())).cloned().collect())
    } else {
        all.clone()
    };
    let items_count = all.len() + nested.iter().filter(|p| !seen.contains(**p)).count();

    let node = tree.node_mut(id);
    node.descendants = Some(visible);
    node.all_descendants = Some(all.clone());
    node.descendants_memo = Some(memo.clone());
    node.items_count = items_count;
    all
}

/// Ripple then recompute from the root
pub fn refresh(tree: &mut TagTree, hide: HidePolicy) -> ItemSet {
    let root = tree.root();
    ripple_dirty(tree, root);
    expand_descendants(tree, root, hide)
}

/// Items reachable by skipping the immediate child level
fn nested_items(tree: &TagTree, children: &[Child]) -> ItemSet {
    let mut seen = AHashSet::new();
    let mut out = Vec::new();
    for folder in children.iter().filter_map(Child::as_folder) {
        for slot in &tree.node(folder).children {
            for item in tree.leaves_of_child(slot) {
                if seen.insert(item.path.clone()) {
                    out.push(item);
                }
            }
        }
    }
    Arc::new(out)
}
