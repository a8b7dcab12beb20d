//! Error types for tree construction

use crate::tree::NodeId;
use thiserror::Error;

/// Errors raised while building or reshaping a tag tree
#[derive(Debug, Error)]
pub enum TreeError {
    /// A structural invariant was violated mid-build (logic bug)
    #[error("structural invariant violated at node {node}: {reason}")]
    Structural { node: NodeId, reason: String },

    /// A node id did not resolve in the arena
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Settings failed validation
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl TreeError {
    pub(crate) fn structural(node: NodeId, reason: impl Into<String>) -> Self {
        Self::Structural {
            node,
            reason: reason.into(),
        }
    }
}
