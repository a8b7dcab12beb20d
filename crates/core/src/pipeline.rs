//! The full build: records → items → tree → normalized, cached, sorted tree

use crate::builder::{self, apply_expanded};
use crate::config::TreeSettings;
use crate::descendants::refresh;
use crate::error::TreeError;
use crate::ingest::{items_from_records, IngestContext};
use crate::item::{DocumentRecord, ItemRef};
use crate::reduce::{merge_redundant_combination, snip_empty};
use crate::sort::sort_tree;
use crate::taginfo::TagInfoDict;
use crate::tree::TagTree;
use tracing::debug;

/// Ingest records and build a finished tree
///
/// `expanded` holds the keys of folders the user has opened; they are
/// materialized past the default depth.
pub fn run_pipeline<S: AsRef<str>>(
    records: &[DocumentRecord],
    ctx: &IngestContext<'_>,
    expanded: &[S],
) -> Result<TagTree, TreeError> {
    let items = items_from_records(records, ctx);
    build_tree(&items, ctx.settings, ctx.tag_info, expanded)
}

/// Build a finished tree from items that are already ingested
pub fn build_tree<S: AsRef<str>>(
    items: &[ItemRef],
    settings: &TreeSettings,
    tag_info: &TagInfoDict,
    expanded: &[S],
) -> Result<TagTree, TreeError> {
    let opts = settings.build_options();
    let mut tree = builder::build(items, &opts)?;
    let opened = apply_expanded(&mut tree, expanded, &opts)?;
    if opened > 0 {
        debug!("Re-opened {} folders from the expanded set", opened);
    }

    let root = tree.root();
    snip_empty(&mut tree, root);
    if settings.merge_redundant_combination {
        merge_redundant_combination(&mut tree, root);
    }
    if settings.expand_untagged_to_root {
        tree.expand_untagged_to_root();
    }
    finish(&mut tree, settings, tag_info);
    Ok(tree)
}

/// Open folders on an already finished tree
///
/// Only the touched branches are recomputed; everything else keeps its
/// caches. Returns the number of folders materialized.
pub fn reveal<S: AsRef<str>>(
    tree: &mut TagTree,
    keys: &[S],
    settings: &TreeSettings,
    tag_info: &TagInfoDict,
) -> Result<usize, TreeError> {
    let opened = apply_expanded(tree, keys, &settings.build_options())?;
    if opened == 0 {
        return Ok(0);
    }
    let root = tree.root();
    snip_empty(tree, root);
    if settings.merge_redundant_combination {
        merge_redundant_combination(tree, root);
    }
    finish(tree, settings, tag_info);
    Ok(opened)
}

/// Recompute dirty caches and re-sort
///
/// The tail of every build; also used after items are patched in place.
pub fn finish(tree: &mut TagTree, settings: &TreeSettings, tag_info: &TagInfoDict) {
    refresh(tree, settings.hide_items);
    let root = tree.root();
    let pins = settings.use_tag_info.then_some(tag_info);
    sort_tree(tree, root, &settings.sort_settings(), pins);
}
