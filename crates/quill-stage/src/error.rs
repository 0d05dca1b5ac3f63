use quill_engine::coords::SingularMatrixError;
use thiserror::Error;

use crate::node::NodeId;

/// Errors raised by scene graph queries and mutations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// The two nodes share no ancestor, so no space conversion exists.
    #[error("nodes {from:?} and {to:?} are not part of the same tree")]
    DisconnectedTree { from: NodeId, to: NodeId },

    /// A transform on the conversion path cannot be inverted.
    #[error(transparent)]
    SingularMatrix(#[from] SingularMatrixError),

    /// A scaled size was requested for a node whose unscaled size is zero.
    #[error("cannot scale {axis} of {node:?}: unscaled size is zero")]
    DegenerateSize { node: NodeId, axis: Axis },

    /// The id refers to a node that was destroyed (or never existed here).
    #[error("node {0:?} does not exist")]
    StaleNode(NodeId),

    #[error("child index {index} out of range for {len} children")]
    InvalidChildIndex { index: usize, len: usize },

    /// Attaching `child` under `parent` would make a node its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle { parent: NodeId, child: NodeId },

    /// The stage root cannot be attached elsewhere or destroyed.
    #[error("the stage root cannot be re-parented or destroyed")]
    RootNode,
}

/// Axis named by [`SceneError::DegenerateSize`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Horizontal => f.write_str("width"),
            Axis::Vertical => f.write_str("height"),
        }
    }
}
