//! Tagtree Core - tag-tree construction and maintenance
//!
//! This crate provides:
//! - Item model and tag-path utilities
//! - Arena-backed tag tree
//! - Tree builder (expansion + nested-tag splitting)
//! - Redundant-branch and empty-node reduction
//! - Descendant caches with dirty propagation
//! - Pin-aware sorting
//! - Ingestion, settings, fingerprints and the full pipeline

pub mod builder;
pub mod config;
pub mod descendants;
pub mod error;
pub mod fingerprint;
pub mod ingest;
pub mod item;
pub mod pipeline;
pub mod reduce;
pub mod render;
pub mod sort;
pub mod taginfo;
pub mod tagpath;
pub mod tree;

// Re-export main types for convenience
pub use builder::{apply_expanded, build, materialize, BuildOptions};
pub use config::{DisplayMethod, TreeSettings, CONFIG_FILE_NAME};
pub use descendants::{expand_descendants, refresh, ripple_dirty, HidePolicy};
pub use error::TreeError;
pub use fingerprint::{fingerprint_bytes, fingerprint_json, Fingerprint, Fingerprinter};
pub use ingest::{freshness_bucket, items_from_records, now_millis, refresh_item, IngestContext, ResolvedLinks, SearchFilter};
pub use item::{DocumentRecord, Item, ItemRef, CANVAS_TAG, FRESHNESS_BUCKETS, FRESHNESS_TAG, UNTAGGED};
pub use pipeline::{build_tree, finish, reveal, run_pipeline};
pub use reduce::{merge_redundant_combination, snip_empty};
pub use render::{outline, render_tree, RenderOptions};
pub use sort::{compare_items, compare_tag_nodes, sort_tree, ItemSort, SortSettings, TagSort};
pub use taginfo::{TagInfo, TagInfoDict};
pub use tree::{Child, NodeId, TagNode, TagTree};
