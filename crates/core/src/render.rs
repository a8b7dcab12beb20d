//! Plain-text views of a tree

use crate::item::{CANVAS_TAG, FRESHNESS_TAG};
use crate::taginfo::TagInfoDict;
use crate::tagpath;
use crate::tree::{Child, NodeId, TagTree};

/// Options for [`render_tree`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions<'a> {
    /// Append the number of reachable items to each folder
    pub counts: bool,
    /// Apply `mark`/`alt` overrides
    pub tag_info: Option<&'a TagInfoDict>,
}

/// Structural outline: one line per node, folders by tag, leaves by path
pub fn outline(tree: &TagTree) -> Vec<String> {
    let mut lines = Vec::new();
    visit(tree, tree.root(), 0, &mut |depth, child| {
        let label = match child {
            Child::Folder(id) => tree.node(*id).tag.clone(),
            Child::Leaf(item) => item.path.clone(),
        };
        lines.push(format!("{}{}", "  ".repeat(depth), label));
    });
    lines
}

/// Indented tree for display, root omitted
pub fn render_tree(tree: &TagTree, opts: &RenderOptions<'_>) -> String {
    let mut out = String::new();
    visit(tree, tree.root(), 0, &mut |depth, child| {
        out.push_str(&"  ".repeat(depth));
        match child {
            Child::Folder(id) => {
                out.push_str(&folder_label(tree, *id, opts.tag_info));
                if opts.counts {
                    out.push_str(&format!(" ({})", tree.node(*id).items_count));
                }
            }
            Child::Leaf(item) => out.push_str(&item.display_name),
        }
        out.push('\n');
    });
    out
}

/// Label for a folder after overrides
pub fn folder_label(tree: &TagTree, id: NodeId, tag_info: Option<&TagInfoDict>) -> String {
    let node = tree.node(id);
    let info = tag_info.and_then(|dict| dict.get(&tree.canonical_tag(id)).or_else(|| dict.get(&node.tag)));
    let plain = builtin_label(&node.tag).unwrap_or_else(|| node.tag.clone());
    let Some(info) = info else {
        return plain;
    };
    let name = match &info.alt {
        Some(alt) if tagpath::is_subtree_marker(&node.tag) => tagpath::mark_continuation(alt),
        Some(alt) => alt.clone(),
        None => plain,
    };
    match &info.mark {
        Some(mark) => format!("{mark} {name}"),
        None => name,
    }
}

const BUILTIN_LABELS: &[(&str, &str)] = &[
    (FRESHNESS_TAG, "⌛"),
    (CANVAS_TAG, "📋 Canvas"),
    ("FRESHNESS_01", "🕐"),
    ("FRESHNESS_02", "📖"),
    ("FRESHNESS_03", "📗"),
    ("FRESHNESS_04", "📚"),
    ("FRESHNESS_05", "🗄"),
];

/// Display label for a virtual tag segment
fn builtin_label(segment: &str) -> Option<String> {
    let bare = tagpath::strip_marker(segment);
    let (_, label) = BUILTIN_LABELS.iter().find(|(tag, _)| *tag == bare)?;
    if tagpath::is_subtree_marker(segment) {
        Some(tagpath::mark_continuation(label))
    } else {
        Some(label.to_string())
    }
}

fn visit<F>(tree: &TagTree, id: NodeId, depth: usize, f: &mut F)
where
    F: FnMut(usize, &Child),
{
    for child in &tree.node(id).children {
        f(depth, child);
        if let Child::Folder(folder) = child {
            visit(tree, *folder, depth + 1, f);
        }
    }
}
