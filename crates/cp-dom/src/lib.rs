//! copy-point DOM
//!
//! Arena-backed document model the interactive components run against.
//! Single threaded: listeners and tasks receive `&mut Document` and may
//! mutate it freely.

mod attributes;
mod classlist;
mod dialog;
mod document;
mod event;
mod node;
mod registry;
mod selector;
mod timers;
mod tree;

pub use attributes::{Attr, NamedNodeMap};
pub use classlist::DOMTokenList;
pub use dialog::DialogState;
pub use document::{Document, ReadyState};
pub use event::{Event, EventType, Key, Listener, ListenerId};
pub use node::{ElementData, Node, NodeData};
pub use registry::Teardown;
pub use selector::SelectorList;
pub use timers::TimerId;
pub use tree::{Ancestors, Children, Descendants, DomTree};

use std::fmt;

/// Node identifier (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The document node
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node" in sibling/parent links
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("{0} not found")]
    NotFound(NodeId),

    #[error("{0} is not an element")]
    NotAnElement(NodeId),

    #[error("cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    #[error("<{tag}> {node} is not a dialog")]
    NotADialog { node: NodeId, tag: String },
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;
