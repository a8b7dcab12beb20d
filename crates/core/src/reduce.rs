//! Post-build normalization: duplicate branches and empty nodes

use crate::tree::{NodeId, TagTree};
use ahash::AHashSet;
use tracing::debug;

/// Drop sibling branches that cover exactly the same set of documents
///
/// Children are reduced first so nested duplicates resolve bottom-up. Among
/// siblings with identical descendant path sets, the first one encountered
/// is kept. Returns the number of branches removed.
pub fn merge_redundant_combination(tree: &mut TagTree, id: NodeId) -> usize {
    let mut removed = 0;
    for child in tree.folder_children(id) {
        removed += merge_redundant_combination(tree, child);
    }

    let mut seen: AHashSet<Vec<String>> = AHashSet::new();
    let mut redundant = Vec::new();
    for child in tree.folder_children(id) {
        let mut paths: Vec<String> = tree.leaves_under(child).iter().map(|i| i.path.clone()).collect();
        paths.sort();
        if !seen.insert(paths) {
            redundant.push(child);
        }
    }
    if !redundant.is_empty() {
        debug!("Merging {} redundant branches under {}", redundant.len(), tree.node(id).key());
        for child in &redundant {
            tree.remove_folder(id, *child);
        }
        tree.mark_dirty(id);
    }
    removed + redundant.len()
}

/// Remove every folder left without children, bottom-up
///
/// Returns the number of nodes removed.
pub fn snip_empty(tree: &mut TagTree, id: NodeId) -> usize {
    let mut removed = 0;
    for child in tree.folder_children(id) {
        removed += snip_empty(tree, child);
    }
    let empty: Vec<NodeId> = tree
        .node(id)
        .folders()
        .filter(|child| tree.node(*child).children.is_empty())
        .collect();
    for child in &empty {
        tree.remove_folder(id, *child);
    }
    if !empty.is_empty() {
        tree.mark_dirty(id);
    }
    removed + empty.len()
}

/// Whether any folder in the tree has no children
pub fn has_empty_folders(tree: &TagTree) -> bool {
    tree.walk()
        .into_iter()
        .skip(1)
        .any(|id| tree.node(id).children.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build, materialize, BuildOptions};
    use crate::item::{Item, ItemRef};
    use crate::tree::{Child, TagNode};
    use std::sync::Arc;

    fn items(specs: &[(&str, &[&str])]) -> Vec<ItemRef> {
        specs
            .iter()
            .map(|(path, tags)| Arc::new(Item::new(*path, tags.iter().copied())))
            .collect()
    }

    #[test]
    fn test_merge_removes_identical_siblings() {
        let mut tree = build(&items(&[("n1", &["a", "b"]), ("n2", &["b", "a"])]), &BuildOptions::default()).unwrap();
        let root = tree.root();
        assert_eq!(tree.node(root).folders().count(), 2);

        let removed = merge_redundant_combination(&mut tree, root);
        assert_eq!(removed, 1);
        let remaining: Vec<_> = tree.node(root).folders().map(|f| tree.node(f).tag.clone()).collect();
        assert_eq!(remaining, vec!["a"]);
        let paths: Vec<_> = tree.leaves_under(root).iter().map(|i| i.path.clone()).collect();
        assert_eq!(paths, vec!["n1", "n2"]);
    }

    #[test]
    fn test_merge_keeps_distinct_siblings() {
        let mut tree = build(&items(&[("n1", &["a"]), ("n2", &["b"])]), &BuildOptions::default()).unwrap();
        let root = tree.root();
        assert_eq!(merge_redundant_combination(&mut tree, root), 0);
        assert_eq!(tree.node(root).folders().count(), 2);
    }

    #[test]
    fn test_merge_resolves_nested_duplicates_first() {
        let specs: &[(&str, &[&str])] = &[("n1", &["x", "a", "b"])];
        let opts = BuildOptions::default();
        let mut tree = build(&items(specs), &opts).unwrap();
        let x = tree.find_folder_child(tree.root(), "x").unwrap();
        materialize(&mut tree, x, &opts).unwrap();
        assert_eq!(tree.node(x).folders().count(), 2);
        merge_redundant_combination(&mut tree, x);
        assert_eq!(tree.node(x).folders().count(), 1);
    }

    #[test]
    fn test_snip_empty_is_bottom_up() {
        let mut tree = TagTree::new();
        let root = tree.root();
        let mut ancestors = tree.node(root).ancestors.clone();
        ancestors.push("a".into());
        let a = tree.alloc(TagNode::folder("a", ancestors.clone(), Vec::new()));
        ancestors.push("b".into());
        let b = tree.alloc(TagNode::folder("b", ancestors, Vec::new()));
        tree.push_child(a, Child::Folder(b));
        tree.push_child(root, Child::Folder(a));

        assert!(has_empty_folders(&tree));
        assert_eq!(snip_empty(&mut tree, root), 2);
        assert_eq!(tree.node(root).children.len(), 0);
        assert!(!has_empty_folders(&tree));
    }
}
