//! Document change events for Tagtree
//!
//! This crate provides:
//! - The event model hosts report document changes with
//! - Event coalescing (bursts collapse to one event per document)
//! - A restartable debounce timer

pub mod coalesce;
pub mod debounce;

pub use coalesce::EventCoalescer;
pub use debounce::{Debouncer, DebouncedQueue};

use serde::{Deserialize, Serialize};

/// A change reported by the host document store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentEvent {
    /// Content or metadata of a document changed (or it was created)
    Changed { path: String },
    /// A document moved
    Renamed { from: String, to: String },
    /// A document is gone
    Deleted { path: String },
}

impl DocumentEvent {
    pub fn changed(path: impl Into<String>) -> Self {
        Self::Changed { path: path.into() }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Renamed {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self::Deleted { path: path.into() }
    }

    /// Path the document lives at after this event, if it still exists
    pub fn current_path(&self) -> Option<&str> {
        match self {
            Self::Changed { path } => Some(path.as_str()),
            Self::Renamed { to, .. } => Some(to.as_str()),
            Self::Deleted { .. } => None,
        }
    }

    /// Every path this event touches
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::Changed { path } | Self::Deleted { path } => vec![path.as_str()],
            Self::Renamed { from, to } => vec![from.as_str(), to.as_str()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_paths() {
        assert_eq!(DocumentEvent::changed("a").current_path(), Some("a"));
        assert_eq!(DocumentEvent::renamed("a", "b").current_path(), Some("b"));
        assert_eq!(DocumentEvent::deleted("a").current_path(), None);
        assert_eq!(DocumentEvent::renamed("a", "b").paths(), vec!["a", "b"]);
    }
}
