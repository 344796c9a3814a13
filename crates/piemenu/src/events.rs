use crate::tree::{Label, NodeId};
use derive_more::Display;

/// Lifecycle notifications delivered to the listeners of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuEvent {
    AboutToShow(NodeId),
    AboutToHide(NodeId),
    /// The gesture ended without choosing anything.
    Canceled(NodeId),
    /// A leaf item was committed; its action has already run.
    Activated {
        node: NodeId,
        item: usize,
        label: Label,
    },
}

impl MenuEvent {
    pub fn node(&self) -> NodeId {
        match self {
            Self::AboutToShow(node) | Self::AboutToHide(node) | Self::Canceled(node) => *node,
            Self::Activated { node, .. } => *node,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("listener#{_0}")]
pub struct ListenerId(pub(crate) u64);

pub(crate) type Listener = Box<dyn FnMut(&MenuEvent)>;
