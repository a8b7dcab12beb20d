//! Event coalescing
//!
//! Bursts of notifications for the same document (bulk rename, repeated
//! saves) collapse into one event per document, in first-seen order.

use crate::DocumentEvent;
use ahash::AHashMap;

/// Accumulates events until drained
#[derive(Debug, Default)]
pub struct EventCoalescer {
    slots: Vec<Option<DocumentEvent>>,
    /// Current path of a document → its slot
    index: AHashMap<String, usize>,
}

impl EventCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an event into the pending set
    pub fn push(&mut self, event: DocumentEvent) {
        match event {
            DocumentEvent::Changed { path } => match self.take(&path) {
                // Already pending under this path; a refetch covers the change
                Some((slot, prev @ (DocumentEvent::Changed { .. } | DocumentEvent::Renamed { .. }))) => {
                    self.put(slot, path, prev)
                }
                Some((slot, DocumentEvent::Deleted { .. })) => self.put(slot, path.clone(), DocumentEvent::Changed { path }),
                None => self.append(path.clone(), DocumentEvent::Changed { path }),
            },
            DocumentEvent::Deleted { path } => match self.take(&path) {
                Some((slot, DocumentEvent::Renamed { from, .. })) => {
                    self.put(slot, from.clone(), DocumentEvent::Deleted { path: from })
                }
                Some((slot, _)) => self.put(slot, path.clone(), DocumentEvent::Deleted { path }),
                None => self.append(path.clone(), DocumentEvent::Deleted { path }),
            },
            DocumentEvent::Renamed { from, to } => {
                // Renaming onto a path supersedes whatever was pending there
                self.take(&to);
                match self.take(&from) {
                    Some((slot, DocumentEvent::Renamed { from: origin, .. })) => {
                        let event = if origin == to {
                            DocumentEvent::Changed { path: to.clone() }
                        } else {
                            DocumentEvent::Renamed { from: origin, to: to.clone() }
                        };
                        self.put(slot, to, event);
                    }
                    Some((slot, _)) => self.put(slot, to.clone(), DocumentEvent::Renamed { from, to }),
                    None => self.append(to.clone(), DocumentEvent::Renamed { from, to }),
                }
            }
        }
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Take every pending event in first-seen order
    pub fn drain(&mut self) -> Vec<DocumentEvent> {
        self.index.clear();
        self.slots.drain(..).flatten().collect()
    }

    fn take(&mut self, key: &str) -> Option<(usize, DocumentEvent)> {
        let slot = self.index.remove(key)?;
        self.slots[slot].take().map(|event| (slot, event))
    }

    fn put(&mut self, slot: usize, key: String, event: DocumentEvent) {
        self.slots[slot] = Some(event);
        self.index.insert(key, slot);
    }

    fn append(&mut self, key: String, event: DocumentEvent) {
        self.slots.push(Some(event));
        self.index.insert(key, self.slots.len() - 1);
    }
}
