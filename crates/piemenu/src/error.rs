use crate::tree::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MenuError {
    #[error("index {index} is out of bounds for a menu with {len} entries")]
    Index { index: usize, len: usize },
    #[error("menu node {0} does not belong to this menu")]
    UnknownNode(NodeId),
    #[error("menu node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),
    #[error("attaching menu node {0} would create a cycle")]
    Cycle(NodeId),
    #[error("could not locate a top-level surface for the host widget")]
    UnsupportedHost,
    #[error("invalid configuration: {0}")]
    Configuration(String),
}
