//! Tree construction: flat items → nested tag nodes
//!
//! `expand_tree` turns the tags carried by a node's leaves into child nodes;
//! `split_tag` decomposes children whose tag is nested (`a/b/c`) into a head
//! node with continuation children. Both run until a pass changes nothing.

use crate::error::TreeError;
use crate::item::ItemRef;
use crate::tagpath::{self, ancestors_to_tags, fold, mark_continuation, split_head};
use crate::tree::{Ancestors, Child, NodeId, TagNode, TagTree};
use ahash::AHashSet;
use tracing::debug;

/// Knobs for a single build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Fold `a/x` under an existing `a` earlier in the chain instead of repeating `a`
    pub reduce_nested_parent: bool,
    /// Decompose slash-delimited tags into sub-trees (off for the link tree)
    pub split_nested: bool,
    /// Tags whose documents are grouped under their own top-level branch
    pub archive_tags: Vec<String>,
    /// Levels below the root discovered by default
    pub expand_depth: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            reduce_nested_parent: true,
            split_nested: true,
            archive_tags: Vec::new(),
            expand_depth: 1,
        }
    }
}

/// Build a fresh tree from a flat set of items
pub fn build(items: &[ItemRef], opts: &BuildOptions) -> Result<TagTree, TreeError> {
    let mut tree = TagTree::new();
    let root = tree.root();
    let archive: Vec<String> = opts.archive_tags.iter().map(|t| fold(t)).filter(|t| !t.is_empty()).collect();

    for item in items {
        if !item.tags.iter().any(|t| archive.contains(&fold(t))) {
            tree.push_child(root, Child::Leaf(item.clone()));
        }
    }
    for archive_tag in &archive {
        let archived: Vec<Child> = items
            .iter()
            .filter(|item| item.tags.iter().any(|t| fold(t) == *archive_tag))
            .map(|item| Child::Leaf(item.clone()))
            .collect();
        if archived.is_empty() {
            continue;
        }
        let ancestors: Ancestors = smallvec::smallvec![tagpath::ROOT_TAG.to_string(), archive_tag.clone()];
        let id = tree.alloc(TagNode::folder(archive_tag.clone(), ancestors, archived));
        tree.push_child(root, Child::Folder(id));
    }

    let mut builder = TreeBuilder::new(&mut tree, opts);
    builder.expand_tree(root)?;
    builder.tree.node_mut(root).children.retain(|c| matches!(c, Child::Folder(_)));
    if opts.split_nested {
        builder.split_tag(root)?;
    }
    builder.tree.node_mut(root).materialized = true;
    builder.materialize_to_depth(root, opts.expand_depth as isize)?;

    debug!("Built tag tree: {} items, {} nodes", items.len(), tree.walk().len());
    Ok(tree)
}

/// Discover the children of one node on demand
pub fn materialize(tree: &mut TagTree, id: NodeId, opts: &BuildOptions) -> Result<bool, TreeError> {
    tree.try_node(id)?;
    TreeBuilder::new(tree, opts).materialize(id)
}

/// Re-apply a persisted expanded-folder set to a freshly built tree
///
/// Every node lying on a recorded path is materialized; a node whose key
/// matches a recorded path exactly also gets its folder children
/// materialized so the opened level shows its sub-folders. Returns the
/// number of nodes materialized.
pub fn apply_expanded<S: AsRef<str>>(tree: &mut TagTree, keys: &[S], opts: &BuildOptions) -> Result<usize, TreeError> {
    if keys.is_empty() {
        return Ok(0);
    }
    let mut builder = TreeBuilder::new(tree, opts);
    let mut count = 0;
    let mut queue = vec![builder.tree.root()];
    while let Some(id) = queue.pop() {
        let key = builder.tree.node(id).key();
        let exact = keys.iter().any(|k| tagpath::eq_fold(k.as_ref(), &key));
        let on_path = exact || keys.iter().any(|k| tagpath::is_path_prefix(&key, k.as_ref()));
        if !on_path {
            continue;
        }
        if builder.materialize(id)? {
            count += 1;
        }
        let folders = builder.tree.folder_children(id);
        if exact {
            for child in &folders {
                if builder.materialize(*child)? {
                    count += 1;
                }
            }
        }
        queue.extend(folders);
    }
    Ok(count)
}

struct TreeBuilder<'a> {
    tree: &'a mut TagTree,
    opts: &'a BuildOptions,
}

impl<'a> TreeBuilder<'a> {
    fn new(tree: &'a mut TagTree, opts: &'a BuildOptions) -> Self {
        Self { tree, opts }
    }

    fn materialize(&mut self, id: NodeId) -> Result<bool, TreeError> {
        if self.tree.node(id).materialized {
            return Ok(false);
        }
        self.tree.node_mut(id).materialized = true;
        let changed = self.expand_tree(id)?;
        if changed {
            self.tree.mark_dirty(id);
        }
        Ok(changed)
    }

    /// Default lazy discovery below `id`
    ///
    /// Chains that cannot branch (dedicated trees, single-folder links) do
    /// not consume depth.
    fn materialize_to_depth(&mut self, id: NodeId, depth: isize) -> Result<(), TreeError> {
        for child in self.tree.folder_children(id) {
            let next = if self.is_chain_link(child) { depth } else { depth - 1 };
            if next < 0 {
                continue;
            }
            self.materialize(child)?;
            self.materialize_to_depth(child, next)?;
        }
        Ok(())
    }

    fn is_chain_link(&self, id: NodeId) -> bool {
        let node = self.tree.node(id);
        node.is_dedicated_tree || (node.folders().count() == 1 && !node.has_leaves())
    }

    /// Create a child node for every tag carried by the node's leaves
    ///
    /// Tags already present in the ancestor chain, or already present as a
    /// sibling, are skipped. Returns whether anything changed.
    fn expand_tree(&mut self, id: NodeId) -> Result<bool, TreeError> {
        let mut modified = false;
        let mut handled: AHashSet<String> = AHashSet::new();
        loop {
            let node = self.tree.node(id);
            // The leading `root` segment is not a tag; a document may carry `root`.
            let ancestor_tags: AHashSet<String> =
                ancestors_to_tags(&node.ancestors).iter().skip(1).map(|t| fold(t)).collect();
            let tags = tagpath::unique_folded(node.leaves().flat_map(|item| item.tags.iter().cloned()));

            let mut created = false;
            for tag in tags {
                let folded = fold(&tag);
                if ancestor_tags.contains(&folded) || !handled.insert(folded) {
                    continue;
                }
                if self.tree.find_folder_child(id, &tag).is_some() {
                    continue;
                }
                let node = self.tree.node(id);
                let children: Vec<Child> = node
                    .leaves()
                    .filter(|item| item.has_tag(&tag))
                    .map(|item| Child::Leaf(item.clone()))
                    .collect();
                let mut ancestors = node.ancestors.clone();
                ancestors.push(tag.clone());
                let mut child = TagNode::folder(tag, ancestors, children);
                child.extra_tags = node.extra_tags.clone();
                let child = self.tree.alloc(child);
                self.tree.push_child(id, Child::Folder(child));
                created = true;
            }

            let split = self.opts.split_nested && self.split_tag(id)?;
            modified |= created || split;
            if !created {
                break;
            }
        }
        Ok(modified)
    }

    /// Decompose nested-tag children of `entry` into head/continuation chains
    fn split_tag(&mut self, entry: NodeId) -> Result<bool, TreeError> {
        let mut modified = false;
        self.order_for_split(entry);

        for cur in self.tree.folder_children(entry) {
            if !self.tree.has_folder(entry, cur) {
                continue;
            }
            modified |= self.split_tag(cur)?;

            let cur_tag = self.tree.node(cur).tag.clone();
            let Some((car, rest)) = split_head(&cur_tag) else {
                continue;
            };
            let car = car.to_string();
            let cdr = mark_continuation(rest);

            if !self.tree.remove_folder(entry, cur) {
                return Err(TreeError::structural(entry, format!("nested tag `{cur_tag}` vanished before split")));
            }
            modified = true;

            let source = self.tree.node(cur).clone();
            let folded: Vec<String> = source.ancestors.iter().map(|a| fold(a)).collect();
            let base: Ancestors = source.ancestors.iter().filter(|a| **a != cur_tag).cloned().collect();
            // Index 0 is the root segment, never a tag
            let position = |wanted: &str| folded.iter().skip(1).position(|a| *a == wanted).map(|i| i + 1);
            let idx_car = position(&fold(&car));
            let idx_cdr = position(&fold(&cdr));

            if let Some(idx_car) = idx_car {
                if idx_cdr.is_some_and(|idx_cdr| idx_car < idx_cdr) {
                    debug!("Dropping `{}`: already represented in its chain", cur_tag);
                    continue;
                }
                if self.opts.reduce_nested_parent {
                    // The head is already in the chain; hang the continuation here.
                    let mut ancestors = base.clone();
                    ancestors.push(car.clone());
                    ancestors.push(cdr.clone());
                    let mut replacer = TagNode::folder(cdr.clone(), ancestors, Vec::new());
                    replacer.extra_tags = source.extra_tags.clone();
                    replacer.is_dedicated_tree = source.is_dedicated_tree;
                    replacer.materialized = source.materialized;
                    let replacer = self.tree.alloc(replacer);
                    self.merge_children(replacer, source.children.clone());
                    if let Some(old) = self.tree.find_folder_child(entry, &cdr) {
                        self.tree.remove_folder(entry, old);
                        let old_children = self.tree.node(old).children.clone();
                        self.merge_children(replacer, old_children);
                    }
                    self.tree.push_child(entry, Child::Folder(replacer));
                    continue;
                }
            }

            match self.tree.find_folder_child(entry, &car) {
                None => {
                    let mut grand_ancestors = base.clone();
                    grand_ancestors.push(car.clone());
                    let child_ancestors = grand_ancestors.clone();
                    grand_ancestors.push(cdr.clone());

                    let mut grandchild = TagNode::folder(cdr.clone(), grand_ancestors, source.children.clone());
                    grandchild.extra_tags = source.extra_tags.clone();
                    grandchild.materialized = source.materialized;
                    let grandchild = self.tree.alloc(grandchild);

                    let mut head = TagNode::folder(car.clone(), child_ancestors, vec![Child::Folder(grandchild)]);
                    head.extra_tags = source.extra_tags.clone();
                    head.is_dedicated_tree = true;
                    head.materialized = true;
                    let head = self.tree.alloc(head);
                    self.tree.push_child(entry, Child::Folder(head));
                }
                Some(parent) => {
                    match self.tree.find_folder_child(parent, &cdr) {
                        Some(old) => {
                            self.merge_children(old, source.children.clone());
                            self.split_tag(old)?;
                        }
                        None => {
                            let mut ancestors = base.clone();
                            ancestors.push(car.clone());
                            ancestors.push(cdr.clone());
                            let mut branch = TagNode::folder(cdr.clone(), ancestors, source.children.clone());
                            branch.extra_tags = source.extra_tags.clone();
                            branch.materialized = source.materialized;
                            let branch = self.tree.alloc(branch);
                            self.tree.push_child(parent, Child::Folder(branch));
                            // A second, different branch: no longer a single dedicated path.
                            // Cleared unconditionally; clearing an unset flag is a no-op.
                            self.tree.node_mut(parent).is_dedicated_tree = false;
                            self.split_tag(parent)?;
                        }
                    }
                    self.tree.mark_dirty(parent);
                }
            }
        }

        if modified {
            self.split_tag(entry)?;
            let node = self.tree.node_mut(entry);
            if node.is_dedicated_tree && node.has_leaves() {
                node.is_dedicated_tree = false;
            }
            node.invalidate();
        }
        Ok(modified)
    }

    /// Leaves first, then folders by ascending nesting depth (stable)
    fn order_for_split(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.tree.node_mut(id).children);
        let (mut leaves, mut folders): (Vec<Child>, Vec<Child>) =
            children.into_iter().partition(|c| matches!(c, Child::Leaf(_)));
        folders.sort_by_key(|c| match c {
            Child::Folder(f) => self.tree.node(*f).tag.split(tagpath::SEPARATOR).count(),
            Child::Leaf(_) => 0,
        });
        leaves.extend(folders);
        self.tree.node_mut(id).children = leaves;
    }

    /// Concatenate children into `target`, de-duplicating leaves by path
    /// and merging folders that carry the same tag
    fn merge_children(&mut self, target: NodeId, incoming: Vec<Child>) {
        for child in incoming {
            match child {
                Child::Leaf(item) => {
                    let present = self.tree.node(target).leaves().any(|i| i.path == item.path);
                    if !present {
                        self.tree.push_child(target, Child::Leaf(item));
                    }
                }
                Child::Folder(folder) => {
                    let tag = self.tree.node(folder).tag.clone();
                    match self.tree.find_folder_child(target, &tag) {
                        Some(existing) if existing != folder => {
                            let nested = self.tree.node(folder).children.clone();
                            self.merge_children(existing, nested);
                        }
                        Some(_) => {}
                        None => self.tree.push_child(target, Child::Folder(folder)),
                    }
                }
            }
        }
        self.tree.mark_dirty(target);
    }
}
