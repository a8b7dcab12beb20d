//! Sibling ordering for tag nodes and document leaves
//!
//! Comparators are built from settings alone. Direction is applied by
//! reversing the result of one comparator, never by a second comparator, and
//! every sort is stable so equal keys keep their input order.

use crate::error::TreeError;
use crate::item::Item;
use crate::taginfo::TagInfoDict;
use crate::tagpath;
use crate::tree::{Child, NodeId, TagNode, TagTree};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Offset that lets pinned tags dominate count-based order
const PIN_COUNT_OFFSET: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "ASC" => Some(Direction::Asc),
            "DESC" => Some(Direction::Desc),
            _ => None,
        }
    }
}

/// Field documents are ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemSortKey {
    #[default]
    DisplayName,
    FullPath,
    Mtime,
    Ctime,
    FileName,
}

impl ItemSortKey {
    fn as_str(self) -> &'static str {
        match self {
            ItemSortKey::DisplayName => "DISPNAME",
            ItemSortKey::FullPath => "FULLPATH",
            ItemSortKey::Mtime => "MTIME",
            ItemSortKey::Ctime => "CTIME",
            ItemSortKey::FileName => "NAME",
        }
    }
}

/// Field tag nodes are ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSortKey {
    #[default]
    Name,
    Items,
}

impl TagSortKey {
    fn as_str(self) -> &'static str {
        match self {
            TagSortKey::Name => "NAME",
            TagSortKey::Items => "ITEMS",
        }
    }
}

/// Document order, written as e.g. `MTIME_DESC`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemSort {
    pub key: ItemSortKey,
    pub direction: Direction,
}

/// Tag order, written as e.g. `ITEMS_ASC`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagSort {
    pub key: TagSortKey,
    pub direction: Direction,
}

fn split_sort_name(s: &str) -> Result<(&str, Direction), TreeError> {
    let (key, dir) = s
        .rsplit_once('_')
        .ok_or_else(|| TreeError::InvalidSettings(format!("sort order `{s}` has no direction")))?;
    let dir = Direction::parse(dir)
        .ok_or_else(|| TreeError::InvalidSettings(format!("unknown sort direction in `{s}`")))?;
    Ok((key, dir))
}

impl FromStr for ItemSort {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, direction) = split_sort_name(s)?;
        let key = match key {
            "DISPNAME" => ItemSortKey::DisplayName,
            "FULLPATH" => ItemSortKey::FullPath,
            "MTIME" => ItemSortKey::Mtime,
            "CTIME" => ItemSortKey::Ctime,
            "NAME" => ItemSortKey::FileName,
            other => return Err(TreeError::InvalidSettings(format!("unknown item sort key `{other}`"))),
        };
        Ok(Self { key, direction })
    }
}

impl FromStr for TagSort {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, direction) = split_sort_name(s)?;
        let key = match key {
            "NAME" => TagSortKey::Name,
            "ITEMS" => TagSortKey::Items,
            other => return Err(TreeError::InvalidSettings(format!("unknown tag sort key `{other}`"))),
        };
        Ok(Self { key, direction })
    }
}

impl fmt::Display for ItemSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.key.as_str(), self.direction.as_str())
    }
}

impl fmt::Display for TagSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.key.as_str(), self.direction.as_str())
    }
}

impl TryFrom<String> for ItemSort {
    type Error = TreeError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for TagSort {
    type Error = TreeError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ItemSort> for String {
    fn from(sort: ItemSort) -> Self {
        sort.to_string()
    }
}

impl From<TagSort> for String {
    fn from(sort: TagSort) -> Self {
        sort.to_string()
    }
}

/// Everything the sort pass needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSettings {
    pub items: ItemSort,
    pub tags: TagSort,
}

/// Case-insensitive natural order with a byte-wise tiebreak
///
/// `note2` sorts before `note10`, and `Alpha` next to `alpha`. Letters
/// compare by their lowercase code points; there is no locale collation,
/// so `é` sorts after `z`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut xs = a.chars().peekable();
    let mut ys = b.chars().peekable();
    loop {
        match (xs.peek().copied(), ys.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let mut nx = String::new();
                while let Some(c) = xs.next_if(char::is_ascii_digit) {
                    nx.push(c);
                }
                let mut ny = String::new();
                while let Some(c) = ys.next_if(char::is_ascii_digit) {
                    ny.push(c);
                }
                let tx = nx.trim_start_matches('0');
                let ty = ny.trim_start_matches('0');
                let ord = tx.len().cmp(&ty.len()).then_with(|| tx.cmp(ty));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                xs.next();
                ys.next();
            }
        }
    }
}

/// Name a tag sorts under, with pins pulled to the front
///
/// Pinned tags get a `-` marker that sorts before the unpinned marker in
/// ascending order and after it once the order is reversed, so pins lead
/// in both directions.
pub fn pin_sort_name(tag: &str, tag_info: Option<&TagInfoDict>, direction: Direction) -> String {
    let Some(info) = tag_info else {
        return tag.to_string();
    };
    let (prefix, unpinned) = match direction {
        Direction::Asc => ('\u{0001}', '\u{ffff}'),
        Direction::Desc => ('\u{ffff}', '\u{0001}'),
    };
    match info.pin_key(tag) {
        Some(key) => format!("{prefix}_-{key}__{tag}"),
        None => format!("{prefix}_{unpinned}_{tag}"),
    }
}

/// Tag used for TagInfo lookups: the full nested tag, else the bare segment
fn lookup_tag(node: &TagNode, tag_info: &TagInfoDict) -> String {
    let canonical = tagpath::ancestors_to_tags(&node.ancestors).pop().unwrap_or_default();
    if tag_info.get(&canonical).is_some() {
        canonical
    } else {
        node.tag.clone()
    }
}

/// Comparator over sibling tag nodes
///
/// `tag_info` is `None` when overrides are disabled.
pub fn compare_tag_nodes(sort: TagSort, tag_info: Option<&TagInfoDict>) -> impl Fn(&TagNode, &TagNode) -> Ordering + '_ {
    move |a, b| match sort.key {
        TagSortKey::Items => {
            let invert: i64 = if sort.direction == Direction::Desc { -1 } else { 1 };
            let count = |node: &TagNode| {
                let pinned = tag_info.is_some_and(|info| info.is_pinned(&lookup_tag(node, info)));
                node.items_count as i64 - if pinned { PIN_COUNT_OFFSET * invert } else { 0 }
            };
            sort.direction.apply(count(a).cmp(&count(b)))
        }
        TagSortKey::Name => {
            let name = |node: &TagNode| match tag_info {
                Some(info) => pin_sort_name(&lookup_tag(node, info), Some(info), sort.direction),
                None => node.tag.clone(),
            };
            sort.direction.apply(natural_cmp(&name(a), &name(b)))
        }
    }
}

/// Comparator over documents
pub fn compare_items(sort: ItemSort) -> impl Fn(&Item, &Item) -> Ordering {
    move |a, b| {
        let ord = match sort.key {
            ItemSortKey::DisplayName => natural_cmp(&a.display_name, &b.display_name),
            ItemSortKey::FullPath => natural_cmp(&a.path, &b.path),
            ItemSortKey::Mtime => a.mtime.cmp(&b.mtime),
            ItemSortKey::Ctime => a.ctime.cmp(&b.ctime),
            ItemSortKey::FileName => natural_cmp(&a.filename, &b.filename),
        };
        sort.direction.apply(ord)
    }
}

/// Order every level below `id`: folders first, then documents
///
/// Cached visible sets are re-ordered too; a set already in order keeps its
/// allocation.
pub fn sort_tree(tree: &mut TagTree, id: NodeId, settings: &SortSettings, tag_info: Option<&TagInfoDict>) {
    let compare_tags = compare_tag_nodes(settings.tags, tag_info);
    let compare_docs = compare_items(settings.items);
    sort_level(tree, id, &compare_tags, &compare_docs);
}

fn sort_level<T, I>(tree: &mut TagTree, id: NodeId, compare_tags: &T, compare_docs: &I)
where
    T: Fn(&TagNode, &TagNode) -> Ordering,
    I: Fn(&Item, &Item) -> Ordering,
{
    let mut children = std::mem::take(&mut tree.node_mut(id).children);
    children.sort_by(|a, b| match (a, b) {
        (Child::Folder(x), Child::Folder(y)) => compare_tags(tree.node(*x), tree.node(*y)),
        (Child::Folder(_), Child::Leaf(_)) => Ordering::Less,
        (Child::Leaf(_), Child::Folder(_)) => Ordering::Greater,
        (Child::Leaf(x), Child::Leaf(y)) => compare_docs(x, y),
    });
    let folders: Vec<NodeId> = children.iter().filter_map(Child::as_folder).collect();
    tree.node_mut(id).children = children;

    for folder in folders {
        sort_level(tree, folder, compare_tags, compare_docs);
    }

    if let Some(visible) = tree.node(id).descendants.clone() {
        let ordered = visible.windows(2).all(|w| compare_docs(&w[0], &w[1]) != Ordering::Greater);
        if !ordered {
            let mut sorted = visible.as_ref().clone();
            sorted.sort_by(|a, b| compare_docs(a, b));
            tree.node_mut(id).descendants = Some(Arc::new(sorted));
        }
    }
}
