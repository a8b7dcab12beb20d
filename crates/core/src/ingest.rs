//! Raw document records → tree items
//!
//! Folder filters, tag canonicalization, aliases, the search filter and the
//! ignore lists are all applied here, before any tree is built.

use crate::config::TreeSettings;
use crate::item::{DocumentRecord, Item, ItemRef, CANVAS_TAG, FRESHNESS_BUCKETS, FRESHNESS_TAG, UNTAGGED};
use crate::taginfo::TagInfoDict;
use crate::tagpath::{self, fold, SEPARATOR};
use ahash::AHashSet;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Link graph: source path → target path → number of links
pub type ResolvedLinks = BTreeMap<String, BTreeMap<String, usize>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Include(String),
    Exclude(String),
}

impl Term {
    fn holds(&self, tags: &[String]) -> bool {
        match self {
            Term::Include(needle) => tags.iter().any(|t| t.contains(needle.as_str())),
            Term::Exclude(needle) => !tags.iter().any(|t| t.contains(needle.as_str())),
        }
    }
}

/// Parsed search string
///
/// `|` separates alternatives, whitespace separates terms that must all
/// hold, and a leading `-` negates a term. Terms match tags by
/// case-insensitive substring. A lone `-` excludes every document of its
/// alternative.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFilter {
    raw: String,
    alternatives: Vec<Vec<Term>>,
}

impl SearchFilter {
    pub fn parse(search: &str) -> Self {
        let alternatives = fold(search)
            .split('|')
            .map(|alt| {
                alt.split_whitespace()
                    .filter_map(|term| match term.strip_prefix('-') {
                        Some(rest) => Some(Term::Exclude(rest.to_string())),
                        None => Some(Term::Include(term.to_string())),
                    })
                    .collect()
            })
            .collect();
        Self {
            raw: search.trim().to_string(),
            alternatives,
        }
    }

    /// The search string as entered
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the filter keeps everything
    pub fn is_empty(&self) -> bool {
        self.alternatives.iter().all(Vec::is_empty)
    }

    /// Whether a document with these tags is kept
    pub fn matches<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        if self.is_empty() {
            return true;
        }
        let folded: Vec<String> = tags.iter().map(|t| fold(t.as_ref())).collect();
        self.alternatives.iter().any(|alt| alt.iter().all(|term| term.holds(&folded)))
    }
}

/// Inputs to ingestion besides the records themselves
#[derive(Debug, Clone, Copy)]
pub struct IngestContext<'a> {
    pub settings: &'a TreeSettings,
    pub tag_info: &'a TagInfoDict,
    pub search: &'a SearchFilter,
    /// Consulted only in link mode
    pub links: &'a ResolvedLinks,
    /// Wall clock in milliseconds since the Unix epoch, for freshness tags
    pub now: i64,
}

/// Current wall clock in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Freshness bucket for a document modified `age_ms` ago
///
/// Future timestamps are bucketed by their distance from now.
pub fn freshness_bucket(age_ms: i64) -> &'static str {
    const HOUR: u64 = 60 * 60;
    const DAY: u64 = 24 * HOUR;
    let secs = (age_ms / 1000).unsigned_abs();
    let idx = if secs < HOUR {
        0
    } else if secs < 6 * HOUR {
        1
    } else if secs < 3 * DAY {
        2
    } else if secs < 7 * DAY {
        3
    } else {
        4
    };
    FRESHNESS_BUCKETS[idx]
}

/// Convert records into items, sorted by path
pub fn items_from_records(records: &[DocumentRecord], ctx: &IngestContext<'_>) -> Vec<ItemRef> {
    let settings = ctx.settings;
    let target_folders = folded_list(&settings.target_folders);
    let ignore_folders = folded_list(&settings.ignore_folders);
    let ignore_doc_tags: AHashSet<String> = folded_list(&settings.ignore_doc_tags).into_iter().collect();
    let ignore_tags: AHashSet<String> = folded_list(&settings.ignore_tags).into_iter().collect();
    let archive_tags: AHashSet<String> = folded_list(&settings.archive_tags).into_iter().collect();
    let backlinks = if settings.link_mode { backlinks(ctx.links) } else { BTreeMap::new() };

    let mut items: Vec<ItemRef> = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for record in records {
        let path = fold(&record.path);
        if !target_folders.is_empty() && !target_folders.iter().any(|f| path.starts_with(f.as_str())) {
            skipped += 1;
            continue;
        }
        if ignore_folders.iter().any(|f| path.starts_with(f.as_str())) {
            skipped += 1;
            continue;
        }

        let mut tags = if settings.link_mode {
            link_tags(record, ctx.links, &backlinks)
        } else {
            document_tags(record, settings, ctx.tag_info)
        };
        if tags.is_empty() {
            tags.push(UNTAGGED.to_string());
        }
        if !settings.link_mode {
            tags.extend(virtual_tags(record, settings, ctx.now));
        }
        if tags.iter().any(|t| ignore_doc_tags.contains(&fold(t))) {
            skipped += 1;
            continue;
        }
        if !ctx.search.matches(&tags) {
            skipped += 1;
            continue;
        }
        tags.retain(|t| !ignore_tags.contains(&fold(t)));
        if tags.is_empty() {
            tags.push(UNTAGGED.to_string());
        }

        let template = item_template(record, settings);
        if settings.disable_narrowing_down {
            let archived: Vec<&String> = tags.iter().filter(|t| archive_tags.contains(&fold(t))).collect();
            let targets: Vec<&String> = if archived.is_empty() { tags.iter().collect() } else { archived };
            for target in targets {
                let mut item = template.clone();
                item.tags = vec![target.clone()];
                item.extra_tags = tags.iter().filter(|t| *t != target).cloned().collect();
                items.push(Arc::new(item));
            }
        } else {
            let mut item = template;
            item.tags = tags;
            items.push(Arc::new(item));
        }
    }

    items.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.tags.cmp(&b.tags)));
    debug!("Ingested {} items from {} records ({} skipped)", items.len(), records.len(), skipped);
    items
}

/// Canonical tags of a document: `#` stripped, aliases applied, de-duplicated
fn document_tags(record: &DocumentRecord, settings: &TreeSettings, tag_info: &TagInfoDict) -> Vec<String> {
    let mut tags = Vec::with_capacity(record.tags.len());
    for raw in &record.tags {
        let tag = normalize(tagpath::canonical_tag(raw));
        if tag.is_empty() {
            continue;
        }
        let tag = if settings.use_tag_info { normalize(tag_info.resolve(&tag)) } else { tag };
        if settings.disable_nested_tags {
            tags.extend(tag.split(SEPARATOR).map(str::to_string));
        } else {
            tags.push(tag);
        }
    }
    tagpath::unique_folded(tags)
}

/// Tags derived from the document itself rather than its metadata
fn virtual_tags(record: &DocumentRecord, settings: &TreeSettings, now: i64) -> Vec<String> {
    let mut tags = Vec::new();
    if record.path.ends_with(".canvas") {
        tags.push(CANVAS_TAG.to_string());
    }
    if settings.use_virtual_tag {
        let bucket = freshness_bucket(now.saturating_sub(record.mtime));
        tags.push(format!("{FRESHNESS_TAG}{SEPARATOR}{bucket}"));
    }
    tags
}

/// Drop empty segments (`a//b` → `a/b`)
fn normalize(tag: &str) -> String {
    tag.split(SEPARATOR).filter(|s| !s.trim().is_empty()).collect::<Vec<_>>().join("/")
}

/// Link-tree tags: outgoing targets plus documents linking here
fn link_tags(record: &DocumentRecord, links: &ResolvedLinks, backlinks: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let outgoing: Vec<String> = match links.get(&record.path) {
        Some(targets) => targets.keys().cloned().collect(),
        None => record.links.clone(),
    };
    let incoming = backlinks.get(&record.path).cloned().unwrap_or_default();
    tagpath::unique_folded(outgoing.into_iter().chain(incoming).filter(|p| *p != record.path))
}

fn backlinks(links: &ResolvedLinks) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (source, targets) in links {
        for target in targets.keys() {
            out.entry(target.clone()).or_default().push(source.clone());
        }
    }
    out
}

/// Rebuild an item from a fresh record, keeping its tree placement
///
/// Used when only metadata (title, times) changed and the published tree is
/// patched instead of rebuilt.
pub fn refresh_item(existing: &Item, record: &DocumentRecord, settings: &TreeSettings) -> Item {
    let mut item = item_template(record, settings);
    item.tags = existing.tags.clone();
    item.extra_tags = existing.extra_tags.clone();
    item
}

fn item_template(record: &DocumentRecord, settings: &TreeSettings) -> Item {
    let filename = record.basename().to_string();
    let name = match &record.title {
        Some(title) if settings.use_title && !title.trim().is_empty() => title.trim(),
        _ => filename.as_str(),
    };
    Item {
        path: record.path.clone(),
        tags: Vec::new(),
        extra_tags: Vec::new(),
        links: record.links.clone(),
        display_name: settings.display_method.label(name, record.dirname()),
        filename,
        mtime: record.mtime,
        ctime: record.ctime,
    }
}

fn folded_list(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|s| fold(s.trim()))
        .map(|s| s.trim_start_matches('#').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
