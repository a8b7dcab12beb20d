//! The host document store

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tagtree_core::{DocumentRecord, ResolvedLinks};

/// Where documents, the tag-info table and the link graph come from
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Every document currently known to the host
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>>;

    /// One document; `Ok(None)` when the path does not resolve
    async fn document(&self, path: &str) -> Result<Option<DocumentRecord>>;

    /// Raw tag-info JSON; parsed leniently by the caller
    async fn load_tag_info(&self) -> Result<String>;

    /// Link graph, consulted in link mode
    async fn resolved_links(&self) -> Result<ResolvedLinks>;
}

/// Store backed by a map, for tests and the CLI
#[derive(Debug, Default)]
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<String, DocumentRecord>>,
    tag_info: RwLock<String>,
    unreadable: RwLock<BTreeSet<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = DocumentRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.upsert(record);
        }
        store
    }

    /// Load a JSON array of records
    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read documents: {}", path.display()))?;
        let records: Vec<DocumentRecord> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse documents: {}", path.display()))?;
        Ok(Self::from_records(records))
    }

    pub fn upsert(&self, record: DocumentRecord) {
        self.docs.write().insert(record.path.clone(), record);
    }

    pub fn remove(&self, path: &str) -> Option<DocumentRecord> {
        self.docs.write().remove(path)
    }

    /// Move a record to a new path
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let mut docs = self.docs.write();
        match docs.remove(from) {
            Some(mut record) => {
                record.path = to.to_string();
                docs.insert(to.to_string(), record);
                true
            }
            None => false,
        }
    }

    pub fn set_tag_info(&self, text: impl Into<String>) {
        *self.tag_info.write() = text.into();
    }

    /// Make reads of `path` fail until cleared
    pub fn set_unreadable(&self, path: &str, unreadable: bool) {
        let mut set = self.unreadable.write();
        if unreadable {
            set.insert(path.to_string());
        } else {
            set.remove(path);
        }
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.docs.read().values().cloned().collect())
    }

    async fn document(&self, path: &str) -> Result<Option<DocumentRecord>> {
        if self.unreadable.read().contains(path) {
            anyhow::bail!("Document is unreadable: {}", path);
        }
        Ok(self.docs.read().get(path).cloned())
    }

    async fn load_tag_info(&self) -> Result<String> {
        Ok(self.tag_info.read().clone())
    }

    async fn resolved_links(&self) -> Result<ResolvedLinks> {
        let docs = self.docs.read();
        let mut graph = ResolvedLinks::new();
        for record in docs.values() {
            for target in &record.links {
                if docs.contains_key(target) {
                    *graph
                        .entry(record.path.clone())
                        .or_default()
                        .entry(target.clone())
                        .or_insert(0) += 1;
                }
            }
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolved_links_skip_dangling_targets() {
        let store = InMemoryStore::from_records([
            DocumentRecord::new("a.md", ["t"]).with_links(["b.md", "b.md", "missing.md"]),
            DocumentRecord::new("b.md", ["t"]),
        ]);
        let links = store.resolved_links().await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links["a.md"]["b.md"], 2);
    }

    #[tokio::test]
    async fn test_rename_and_unreadable() {
        let store = InMemoryStore::from_records([DocumentRecord::new("a.md", ["t"])]);
        assert!(store.rename("a.md", "dir/a.md"));
        assert!(store.document("a.md").await.unwrap().is_none());
        assert_eq!(store.document("dir/a.md").await.unwrap().unwrap().path, "dir/a.md");

        store.set_unreadable("dir/a.md", true);
        assert!(store.document("dir/a.md").await.is_err());
        store.set_unreadable("dir/a.md", false);
        assert!(store.document("dir/a.md").await.is_ok());
    }
}
