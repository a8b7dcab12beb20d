//! Last-known record per document

use std::collections::BTreeMap;
use tagtree_core::{DocumentRecord, Fingerprint, Fingerprinter};

/// Snapshot of every document as of the last applied diff
///
/// Only path, tags and links feed the fingerprint; titles and timestamps
/// are metadata and never force a rebuild on their own.
#[derive(Debug, Clone, Default)]
pub struct DocCache {
    docs: BTreeMap<String, DocumentRecord>,
}

/// What an upsert did to the cached copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// Not cached before
    Added,
    /// Tags or links differ
    Changed,
    /// Same tags and links, other fields differ
    MetadataOnly,
    /// Byte-identical
    Unchanged,
}

impl DocCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, records: Vec<DocumentRecord>) {
        self.docs = records.into_iter().map(|r| (r.path.clone(), r)).collect();
    }

    pub fn upsert(&mut self, record: DocumentRecord) -> Upsert {
        let outcome = match self.docs.get(&record.path) {
            None => Upsert::Added,
            Some(old) if old == &record => Upsert::Unchanged,
            Some(old) if old.tags == record.tags && old.links == record.links => Upsert::MetadataOnly,
            Some(_) => Upsert::Changed,
        };
        self.docs.insert(record.path.clone(), record);
        outcome
    }

    pub fn remove(&mut self, path: &str) -> Option<DocumentRecord> {
        self.docs.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&DocumentRecord> {
        self.docs.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.docs.contains_key(path)
    }

    pub fn records(&self) -> Vec<DocumentRecord> {
        self.docs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Documents whose outgoing links include `path`
    pub fn referencing(&self, path: &str) -> Vec<String> {
        self.docs
            .values()
            .filter(|r| r.links.iter().any(|l| l == path))
            .map(|r| r.path.clone())
            .collect()
    }

    /// Fingerprint of the observable content (paths, tags, links)
    pub fn fingerprint(&self) -> Fingerprint {
        let mut fp = Fingerprinter::new();
        for record in self.docs.values() {
            fp.field(&record.path).list(&record.tags).list(&record.links);
        }
        fp.finalize()
    }
}
