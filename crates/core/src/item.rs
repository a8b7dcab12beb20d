//! Document items and the raw records they are derived from

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reserved tag assigned to documents that carry no tag at all
pub const UNTAGGED: &str = "_untagged";

/// Virtual tag carried by `.canvas` documents
pub const CANVAS_TAG: &str = "_VIRTUAL_TAG_CANVAS";

/// Parent of the freshness buckets, freshest first
pub const FRESHNESS_TAG: &str = "_VIRTUAL_TAG_FRESHNESS";
pub const FRESHNESS_BUCKETS: [&str; 5] = ["FRESHNESS_01", "FRESHNESS_02", "FRESHNESS_03", "FRESHNESS_04", "FRESHNESS_05"];

/// Raw per-document record as supplied by the host document store
///
/// Tags may still carry a leading `#`; ingestion canonicalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentRecord {
    /// Opaque unique identifier (usually a vault-relative path)
    pub path: String,
    /// Tags as written in the document
    pub tags: Vec<String>,
    /// Outgoing link targets (paths)
    pub links: Vec<String>,
    /// Title taken from metadata, if any
    pub title: Option<String>,
    /// Modification time in milliseconds since the Unix epoch
    pub mtime: i64,
    /// Creation time (opaque sort key)
    pub ctime: i64,
}

impl DocumentRecord {
    /// Create a record with just a path and tags
    pub fn new<S: Into<String>>(path: impl Into<String>, tags: impl IntoIterator<Item = S>) -> Self {
        Self {
            path: path.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Attach outgoing links
    pub fn with_links<S: Into<String>>(mut self, links: impl IntoIterator<Item = S>) -> Self {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach timestamps
    pub fn with_times(mut self, mtime: i64, ctime: i64) -> Self {
        self.mtime = mtime;
        self.ctime = ctime;
        self
    }

    /// File name without directories and extension
    pub fn basename(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Directory part of the path (empty at top level)
    pub fn dirname(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

/// One document's tag membership, immutable within a build pass
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier
    pub path: String,
    /// Canonical tags used for tree placement (ordered, de-duplicated)
    pub tags: Vec<String>,
    /// Tags associated with the item but elided from placement
    pub extra_tags: Vec<String>,
    /// Paths of related items (link tree)
    pub links: Vec<String>,
    /// Label shown for the item
    pub display_name: String,
    /// Basename without extension
    pub filename: String,
    /// Modification time
    pub mtime: i64,
    /// Creation time
    pub ctime: i64,
}

impl Item {
    /// Minimal item, display name and filename derived from the path
    pub fn new<S: Into<String>>(path: impl Into<String>, tags: impl IntoIterator<Item = S>) -> Self {
        let path = path.into();
        let record = DocumentRecord {
            path: path.clone(),
            ..Default::default()
        };
        let filename = record.basename().to_string();
        Self {
            path,
            tags: tags.into_iter().map(Into::into).collect(),
            display_name: filename.clone(),
            filename,
            ..Default::default()
        }
    }

    /// Whether the item carries `tag`, compared case-insensitively
    pub fn has_tag(&self, tag: &str) -> bool {
        let folded = crate::tagpath::fold(tag);
        self.tags.iter().any(|t| crate::tagpath::fold(t) == folded)
    }
}

/// Items are shared between every node they appear under
pub type ItemRef = Arc<Item>;
