//! Apply a drained batch of document events to the snapshot cache

use crate::doc_cache::{DocCache, Upsert};
use crate::source::DocumentStore;
use ahash::AHashSet;
use std::collections::BTreeSet;
use tagtree_core::DocumentRecord;
use tagtree_watcher::DocumentEvent;
use tracing::{debug, warn};

/// What one batch did to the cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Documents whose tags or links changed, or that appeared
    pub changed: Vec<String>,
    /// Documents dropped from the cache
    pub removed: Vec<String>,
    /// Documents whose title or timestamps changed and nothing else
    pub metadata_only: Vec<String>,
    /// Documents re-read because a linked document changed
    pub relinked: Vec<String>,
}

impl DiffOutcome {
    /// Whether the tree's shape may differ
    pub fn is_structural(&self) -> bool {
        !self.changed.is_empty() || !self.removed.is_empty()
    }
}

/// Apply `events` to `cache`, fetching fresh records from `store`
///
/// In link mode, a document whose outgoing links changed causes every
/// document on either side of those links to be re-read once. Re-read
/// documents do not propagate further.
pub async fn apply_events<S>(cache: &mut DocCache, store: &S, events: &[DocumentEvent], link_mode: bool) -> DiffOutcome
where
    S: DocumentStore + ?Sized,
{
    let mut outcome = DiffOutcome::default();
    let mut processed: AHashSet<String> = AHashSet::new();
    let mut neighbours: BTreeSet<String> = BTreeSet::new();

    for event in events {
        match event {
            DocumentEvent::Changed { path } => {
                processed.insert(path.clone());
                let before = cache.get(path).map(|r| r.links.clone()).unwrap_or_default();
                if let Some(record) = fetch(store, path).await {
                    let after = record.links.clone();
                    classify(&mut outcome, path, cache.upsert(record));
                    if link_mode && before != after {
                        neighbours.extend(before);
                        neighbours.extend(after);
                        neighbours.extend(cache.referencing(path));
                    }
                }
            }
            DocumentEvent::Deleted { path } => {
                processed.insert(path.clone());
                if let Some(old) = cache.remove(path) {
                    outcome.removed.push(path.clone());
                    if link_mode {
                        neighbours.extend(old.links);
                        neighbours.extend(cache.referencing(path));
                    }
                }
            }
            DocumentEvent::Renamed { from, to } => {
                processed.insert(from.clone());
                processed.insert(to.clone());
                let old = cache.remove(from);
                if old.is_some() {
                    outcome.removed.push(from.clone());
                }
                let record = match fetch(store, to).await {
                    Some(record) => Some(record),
                    None => old.clone().map(|mut r| {
                        r.path = to.clone();
                        r
                    }),
                };
                if let Some(record) = record {
                    classify(&mut outcome, to, cache.upsert(record));
                }
                if link_mode {
                    if let Some(old) = old {
                        neighbours.extend(old.links);
                    }
                    neighbours.extend(cache.referencing(from));
                    neighbours.extend(cache.referencing(to));
                }
            }
        }
    }

    for path in neighbours {
        if !processed.insert(path.clone()) || !cache.contains(&path) {
            continue;
        }
        if let Some(record) = fetch(store, &path).await {
            classify(&mut outcome, &path, cache.upsert(record));
            outcome.relinked.push(path);
        }
    }

    debug!(
        "Applied {} events: {} changed, {} removed, {} metadata-only, {} relinked",
        events.len(),
        outcome.changed.len(),
        outcome.removed.len(),
        outcome.metadata_only.len(),
        outcome.relinked.len()
    );
    outcome
}

fn classify(outcome: &mut DiffOutcome, path: &str, upsert: Upsert) {
    match upsert {
        Upsert::Added | Upsert::Changed => outcome.changed.push(path.to_string()),
        Upsert::MetadataOnly => outcome.metadata_only.push(path.to_string()),
        Upsert::Unchanged => {}
    }
}

/// Read one record; failures and unresolved paths keep the cached copy
async fn fetch<S>(store: &S, path: &str) -> Option<DocumentRecord>
where
    S: DocumentStore + ?Sized,
{
    match store.document(path).await {
        Ok(Some(record)) => Some(record),
        Ok(None) => {
            warn!("Document no longer resolves, keeping last-known record: {}", path);
            None
        }
        Err(e) => {
            warn!("Failed to read {}, keeping last-known record: {:#}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryStore;

    fn seeded(records: Vec<DocumentRecord>) -> (InMemoryStore, DocCache) {
        let mut cache = DocCache::new();
        cache.replace_all(records.clone());
        (InMemoryStore::from_records(records), cache)
    }

    #[tokio::test]
    async fn test_identical_resave_is_not_a_change() {
        let (store, mut cache) = seeded(vec![DocumentRecord::new("a.md", ["x"])]);
        let before = cache.fingerprint();
        let outcome = apply_events(&mut cache, &store, &[DocumentEvent::changed("a.md")], false).await;
        assert_eq!(outcome, DiffOutcome::default());
        assert_eq!(cache.fingerprint(), before);
    }

    #[tokio::test]
    async fn test_tag_edit_and_metadata_edit() {
        let (store, mut cache) = seeded(vec![DocumentRecord::new("a.md", ["x"]), DocumentRecord::new("b.md", ["x"])]);
        store.upsert(DocumentRecord::new("a.md", ["y"]));
        store.upsert(DocumentRecord::new("b.md", ["x"]).with_title("B"));
        let events = [DocumentEvent::changed("a.md"), DocumentEvent::changed("b.md")];
        let outcome = apply_events(&mut cache, &store, &events, false).await;
        assert_eq!(outcome.changed, vec!["a.md"]);
        assert_eq!(outcome.metadata_only, vec!["b.md"]);
        assert!(outcome.is_structural());
    }

    #[tokio::test]
    async fn test_unreadable_document_keeps_last_known() {
        let (store, mut cache) = seeded(vec![DocumentRecord::new("a.md", ["x"])]);
        store.set_unreadable("a.md", true);
        let outcome = apply_events(&mut cache, &store, &[DocumentEvent::changed("a.md")], false).await;
        assert!(!outcome.is_structural());
        assert_eq!(cache.get("a.md").unwrap().tags, vec!["x"]);
    }

    #[tokio::test]
    async fn test_rename_falls_back_to_cached_record() {
        let (store, mut cache) = seeded(vec![DocumentRecord::new("a.md", ["x"])]);
        store.remove("a.md");
        let outcome = apply_events(&mut cache, &store, &[DocumentEvent::renamed("a.md", "b.md")], false).await;
        assert_eq!(outcome.removed, vec!["a.md"]);
        assert_eq!(outcome.changed, vec!["b.md"]);
        assert_eq!(cache.get("b.md").unwrap().tags, vec!["x"]);
    }

    #[tokio::test]
    async fn test_link_change_rereads_one_hop() {
        let (store, mut cache) = seeded(vec![
            DocumentRecord::new("a.md", ["t"]).with_links(["b.md"]),
            DocumentRecord::new("b.md", ["t"]).with_links(["c.md"]),
            DocumentRecord::new("c.md", ["t"]),
            DocumentRecord::new("d.md", ["t"]).with_links(["a.md"]),
        ]);
        // The store has moved on for b.md but nobody told us
        store.upsert(DocumentRecord::new("b.md", ["u"]).with_links(["c.md"]));
        store.upsert(DocumentRecord::new("a.md", ["t"]).with_links(["c.md"]));

        let outcome = apply_events(&mut cache, &store, &[DocumentEvent::changed("a.md")], true).await;
        assert_eq!(outcome.changed, vec!["a.md", "b.md"]);
        // b.md (old target), c.md (new target) and d.md (links here), once each
        assert_eq!(outcome.relinked, vec!["b.md", "c.md", "d.md"]);
        assert_eq!(cache.get("b.md").unwrap().tags, vec!["u"]);
    }

    #[tokio::test]
    async fn test_link_closure_off_outside_link_mode() {
        let (store, mut cache) = seeded(vec![
            DocumentRecord::new("a.md", ["t"]).with_links(["b.md"]),
            DocumentRecord::new("b.md", ["t"]),
        ]);
        store.upsert(DocumentRecord::new("a.md", ["t"]));
        let outcome = apply_events(&mut cache, &store, &[DocumentEvent::changed("a.md")], false).await;
        assert!(outcome.relinked.is_empty());
    }
}
