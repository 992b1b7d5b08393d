//! ARIA Support
//!
//! Disclosure state (`aria-expanded`) and the `aria-controls` relation.

use cp_dom::{Document, DomResult, NodeId};
use tracing::trace;

/// Parse an ARIA boolean (`"true"` / `"false"`, case-insensitive)
pub fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Explicit `aria-expanded` state, `None` when absent or not a boolean
pub fn expanded_state(doc: &Document, control: NodeId) -> Option<bool> {
    doc.attr(control, "aria-expanded").and_then(parse_bool)
}

/// Expanded only when `aria-expanded="true"`
pub fn is_expanded(doc: &Document, control: NodeId) -> bool {
    expanded_state(doc, control) == Some(true)
}

pub fn set_expanded(doc: &mut Document, control: NodeId, expanded: bool) -> DomResult<()> {
    trace!(control = %control, expanded, "aria-expanded");
    doc.set_attr(control, "aria-expanded", if expanded { "true" } else { "false" })
}

/// Id tokens of `aria-controls`
pub fn controls(doc: &Document, control: NodeId) -> Vec<String> {
    doc.attr(control, "aria-controls")
        .map(|v| v.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Resolution of a control's `aria-controls` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlLink {
    /// No `aria-controls` (or an empty one)
    Missing,
    /// Referenced id is not in the document
    Unresolved(String),
    Resolved(NodeId),
}

impl ControlLink {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Resolved(node) => Some(*node),
            _ => None,
        }
    }
}

/// Resolve the element named by the first `aria-controls` token
pub fn controlled_element(doc: &Document, control: NodeId) -> ControlLink {
    let Some(first) = controls(doc, control).into_iter().next() else {
        return ControlLink::Missing;
    };
    match doc.get_element_by_id(&first) {
        Some(node) => ControlLink::Resolved(node),
        None => ControlLink::Unresolved(first),
    }
}
