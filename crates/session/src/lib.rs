//! Live tag-tree sessions
//!
//! This crate provides:
//! - The [`DocumentStore`] trait hosts implement, plus an in-memory store
//! - A per-document snapshot cache with content fingerprints
//! - Event application with one-hop link closure
//! - The persisted expanded-folder set
//! - [`TreeController`], the single rebuild worker behind a [`TreeHandle`]

pub mod controller;
pub mod doc_cache;
pub mod expanded;
pub mod incremental;
pub mod source;

pub use controller::{ControllerOptions, TreeController, TreeHandle, TreeUpdate, UpdateKind};
pub use doc_cache::DocCache;
pub use expanded::ExpandedSet;
pub use incremental::{apply_events, DiffOutcome};
pub use source::{DocumentStore, InMemoryStore};
