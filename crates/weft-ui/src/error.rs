//! Error type shared by every fallible weft-ui operation.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::node::NodeId;

/// Everything that can go wrong in the UI core.
///
/// Misuse (stale ids, double attach, destroying an attached node) is
/// reported here instead of panicking or corrupting the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiError {
    #[error("allocation failed")]
    Alloc,
    #[error("node {0} already has a parent")]
    AlreadyAttached(NodeId),
    #[error("node {0} is still attached to a parent")]
    StillAttached(NodeId),
    #[error("node {0} is stale or was never created")]
    InvalidNode(NodeId),
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("tree is deeper than {max} levels")]
    DepthExceeded { max: usize },
    #[error("capacity must be at least 1")]
    Capacity,
    #[error("layout engine: {0}")]
    Layout(String),
}

impl From<TryReserveError> for UiError {
    fn from(_: TryReserveError) -> Self {
        Self::Alloc
    }
}

pub type Result<T> = std::result::Result<T, UiError>;
