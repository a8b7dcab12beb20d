//! Arena-backed tag tree
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. A build
//! always starts from a fresh arena, so node identity never survives a
//! rebuild; readers hold an `Arc<TagTree>` of a completed build.

use crate::error::TreeError;
use crate::item::ItemRef;
use crate::tagpath::{self, ROOT_TAG};
use ahash::AHashSet;
use smallvec::{smallvec, SmallVec};
use std::fmt;
use std::sync::Arc;

/// Index of a node in its tree's arena
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A child slot: either a nested tag node or a document leaf, never both
#[derive(Debug, Clone)]
pub enum Child {
    /// Nested tag node
    Folder(NodeId),
    /// Document leaf
    Leaf(ItemRef),
}

impl Child {
    /// Folder id, if this is a folder
    pub fn as_folder(&self) -> Option<NodeId> {
        match self {
            Child::Folder(id) => Some(*id),
            Child::Leaf(_) => None,
        }
    }

    /// Item, if this is a leaf
    pub fn as_leaf(&self) -> Option<&ItemRef> {
        match self {
            Child::Folder(_) => None,
            Child::Leaf(item) => Some(item),
        }
    }
}

/// Shared, immutable set of items cached on a node
pub type ItemSet = Arc<Vec<ItemRef>>;

/// Ancestor chain; most tag paths are shallow
pub type Ancestors = SmallVec<[String; 4]>;

/// One path segment of the taxonomy
#[derive(Debug, Clone)]
pub struct TagNode {
    /// Segment, or a continuation segment prefixed with the subtree mark
    pub tag: String,
    /// Full chain from the root, this node included (case-preserving)
    pub ancestors: Ancestors,
    /// Children in insertion (later: sorted) order
    pub children: Vec<Child>,
    /// Tags carried along for display, not placement
    pub extra_tags: Vec<String>,
    /// Hosts exactly one unbranched nested-tag chain
    pub is_dedicated_tree: bool,
    /// Distinct items reachable under this node
    pub items_count: usize,
    /// Visible items after hide-policy filtering; `None` means dirty
    pub descendants: Option<ItemSet>,
    /// Items before hide-policy filtering; `None` means dirty
    pub all_descendants: Option<ItemSet>,
    /// Items reachable strictly below the immediate children
    pub descendants_memo: Option<ItemSet>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) materialized: bool,
}

impl TagNode {
    /// New, dirty folder node
    pub fn folder(tag: impl Into<String>, ancestors: Ancestors, children: Vec<Child>) -> Self {
        Self {
            tag: tag.into(),
            ancestors,
            children,
            extra_tags: Vec::new(),
            is_dedicated_tree: false,
            items_count: 0,
            descendants: None,
            all_descendants: None,
            descendants_memo: None,
            parent: None,
            materialized: false,
        }
    }

    /// Parent node, `None` for the root or a detached node
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the node's children have been discovered beyond the default depth
    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// Whether all three caches are populated
    pub fn is_clean(&self) -> bool {
        self.descendants.is_some()
    }

    /// Null out every cache
    pub fn invalidate(&mut self) {
        self.descendants = None;
        self.all_descendants = None;
        self.descendants_memo = None;
    }

    /// Key used by the expanded-folder set
    pub fn key(&self) -> String {
        tagpath::tag_path_key(&self.ancestors)
    }

    /// Item children in order
    pub fn leaves(&self) -> impl Iterator<Item = &ItemRef> {
        self.children.iter().filter_map(Child::as_leaf)
    }

    /// Folder children in order
    pub fn folders(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().filter_map(Child::as_folder)
    }

    /// Whether any direct child is a document leaf
    pub fn has_leaves(&self) -> bool {
        self.children.iter().any(|c| matches!(c, Child::Leaf(_)))
    }
}

/// A complete tag tree rooted at a single virtual node
#[derive(Debug, Clone)]
pub struct TagTree {
    nodes: Vec<TagNode>,
    root: NodeId,
}

impl TagTree {
    /// Tree holding only the virtual root
    pub fn new() -> Self {
        let root = TagNode::folder(ROOT_TAG, smallvec![ROOT_TAG.to_string()], Vec::new());
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// The virtual root
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node
    ///
    /// Ids are only minted by this arena, so indexing cannot go out of bounds
    /// for ids obtained from the same tree.
    pub fn node(&self, id: NodeId) -> &TagNode {
        &self.nodes[id.index()]
    }

    /// Mutably borrow a node
    pub fn node_mut(&mut self, id: NodeId) -> &mut TagNode {
        &mut self.nodes[id.index()]
    }

    /// Borrow a node whose id came from outside this tree
    pub fn try_node(&self, id: NodeId) -> Result<&TagNode, TreeError> {
        self.nodes.get(id.index()).ok_or(TreeError::UnknownNode(id))
    }

    /// Number of arena slots, detached nodes included
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Add a detached node to the arena
    pub fn alloc(&mut self, node: TagNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        for child in self.nodes[id.index()].folders().collect::<Vec<_>>() {
            self.nodes[child.index()].parent = Some(id);
        }
        id
    }

    /// Append a child, re-parenting folders
    pub fn push_child(&mut self, parent: NodeId, child: Child) {
        if let Child::Folder(id) = child {
            self.nodes[id.index()].parent = Some(parent);
        }
        self.nodes[parent.index()].children.push(child);
    }

    /// Detach a folder child; returns whether it was present
    pub fn remove_folder(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self.nodes[parent.index()].children;
        match children.iter().position(|c| c.as_folder() == Some(child)) {
            Some(pos) => {
                children.remove(pos);
                self.nodes[child.index()].parent = None;
                true
            }
            None => false,
        }
    }

    /// Whether `child` is currently a folder child of `parent`
    pub fn has_folder(&self, parent: NodeId, child: NodeId) -> bool {
        self.node(parent).folders().any(|id| id == child)
    }

    /// Folder children of a node (snapshot)
    pub fn folder_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).folders().collect()
    }

    /// Folder child whose tag equals `tag` case-insensitively
    pub fn find_folder_child(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        let folded = tagpath::fold(tag);
        self.node(parent)
            .folders()
            .find(|id| tagpath::fold(&self.node(*id).tag) == folded)
    }

    /// Every document leaf at any depth under `id`, unique by path
    pub fn leaves_under(&self, id: NodeId) -> Vec<ItemRef> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current);
            for item in node.leaves() {
                if seen.insert(item.path.clone()) {
                    out.push(item.clone());
                }
            }
            let folders: Vec<_> = node.folders().collect();
            stack.extend(folders.into_iter().rev());
        }
        out
    }

    /// Leaves under a single child slot (the slot itself if it is a leaf)
    pub fn leaves_of_child(&self, child: &Child) -> Vec<ItemRef> {
        match child {
            Child::Folder(id) => self.leaves_under(*id),
            Child::Leaf(item) => vec![item.clone()],
        }
    }

    /// Nodes reachable from the root, pre-order
    pub fn walk(&self) -> Vec<NodeId> {
        self.walk_from(self.root)
    }

    /// Nodes reachable from `start`, pre-order
    pub fn walk_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            let folders: Vec<_> = self.node(id).folders().collect();
            stack.extend(folders.into_iter().rev());
        }
        out
    }

    /// Canonical tags of a node's chain, root excluded
    pub fn display_tags(&self, id: NodeId) -> Vec<String> {
        let node = self.node(id);
        let tags = tagpath::ancestors_to_tags(&node.ancestors);
        tags.into_iter().skip(1).collect()
    }

    /// Canonical tag this node stands for (`web/css` for `→ css` under `web`)
    pub fn canonical_tag(&self, id: NodeId) -> String {
        self.display_tags(id)
            .pop()
            .unwrap_or_else(|| ROOT_TAG.to_string())
    }

    /// Find a node by its expanded-folder key (`root/web/→ css`)
    pub fn find_by_key(&self, key: &str) -> Option<NodeId> {
        let folded = tagpath::fold(key);
        self.walk()
            .into_iter()
            .find(|id| tagpath::fold(&self.node(*id).key()) == folded)
    }

    /// Find a node by slash-joined segments, each matched case-insensitively
    ///
    /// The leading `root` segment is optional. Continuation segments may be
    /// given with or without the subtree mark.
    pub fn find_by_tag_path(&self, path: &str) -> Option<NodeId> {
        let mut segments: Vec<&str> = path.split(tagpath::SEPARATOR).filter(|s| !s.is_empty()).collect();
        if segments.first().is_some_and(|s| tagpath::eq_fold(s, ROOT_TAG)) {
            segments.remove(0);
        }
        let mut current = self.root;
        for segment in segments {
            let wanted = tagpath::fold(tagpath::strip_marker(segment));
            current = self
                .node(current)
                .folders()
                .find(|id| tagpath::fold(tagpath::strip_marker(&self.node(*id).tag)) == wanted)?;
        }
        Some(current)
    }

    /// Null every cache of a node
    pub fn mark_dirty(&mut self, id: NodeId) {
        self.nodes[id.index()].invalidate();
    }

    /// Replace an item everywhere it appears as a direct leaf
    ///
    /// Every node holding it is marked dirty; ancestors are left for
    /// `ripple_dirty` to discover. Returns how many nodes were touched.
    pub fn replace_item(&mut self, item: ItemRef) -> usize {
        let path = item.path.clone();
        self.update_items(&path, |_| item.clone())
    }

    /// Rewrite every leaf for `path`, one call per occurrence
    ///
    /// Same dirty-marking as [`TagTree::replace_item`]; the closure sees the
    /// leaf being replaced, so per-leaf fields can be carried over.
    pub fn update_items<F>(&mut self, path: &str, mut update: F) -> usize
    where
        F: FnMut(&ItemRef) -> ItemRef,
    {
        let mut touched = 0;
        for id in self.walk() {
            let node = &mut self.nodes[id.index()];
            let mut hit = false;
            for child in node.children.iter_mut() {
                if let Child::Leaf(existing) = child {
                    if existing.path == path {
                        *existing = update(existing);
                        hit = true;
                    }
                }
            }
            if hit {
                node.invalidate();
                touched += 1;
            }
        }
        touched
    }

    /// Lift the items of the `_untagged` branch onto the root
    pub fn expand_untagged_to_root(&mut self) -> bool {
        let root = self.root;
        let Some(untagged) = self
            .node(root)
            .folders()
            .find(|id| self.node(*id).tag == crate::item::UNTAGGED)
        else {
            return false;
        };
        let items = self.leaves_under(untagged);
        self.remove_folder(root, untagged);
        for item in items {
            self.push_child(root, Child::Leaf(item));
        }
        self.mark_dirty(root);
        true
    }
}

impl Default for TagTree {
    fn default() -> Self {
        Self::new()
    }
}
