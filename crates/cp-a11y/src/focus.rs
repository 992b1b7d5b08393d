//! Focus Management
//!
//! Focusability rules and keyboard navigation order.

use cp_dom::{Document, NodeId};

/// Tab index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabIndex {
    /// tabindex="-1": focusable by script, skipped by keyboard order
    NotFocusable,
    /// tabindex="0" or positive
    Sequential(i32),
}

impl TabIndex {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().parse::<i32>() {
            Ok(n) if n < 0 => Some(Self::NotFocusable),
            Ok(n) => Some(Self::Sequential(n)),
            Err(_) => None,
        }
    }

    pub fn is_focusable(&self) -> bool {
        matches!(self, Self::Sequential(_))
    }
}

fn natively_focusable(doc: &Document, id: NodeId) -> bool {
    let Some(element) = doc.tree().element(id) else {
        return false;
    };
    match element.tag.as_str() {
        "a" | "area" => element.has_attr("href"),
        "input" => !element.get_attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")),
        "button" | "select" | "textarea" | "summary" | "iframe" => true,
        _ => element
            .get_attr("contenteditable")
            .is_some_and(|v| !v.eq_ignore_ascii_case("false")),
    }
}

/// Whether keyboard focus can land on the element
pub fn is_focusable(doc: &Document, id: NodeId) -> bool {
    if !doc.is_element(id) || doc.has_attr(id, "disabled") || doc.is_hidden(id) || doc.is_inert(id) {
        return false;
    }
    match doc.attr(id, "tabindex").and_then(TabIndex::parse) {
        Some(index) => index.is_focusable(),
        None => natively_focusable(doc, id),
    }
}

/// Focusable descendants of `root` in document order
pub fn focusable_descendants(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.tree()
        .descendants(root)
        .filter(|&id| is_focusable(doc, id))
        .collect()
}

pub fn first_focusable(doc: &Document, root: NodeId) -> Option<NodeId> {
    doc.tree().descendants(root).find(|&id| is_focusable(doc, id))
}

/// Arrow-key focus order over a fixed set of elements
#[derive(Debug, Clone, Default)]
pub struct RovingFocus {
    order: Vec<NodeId>,
    wrap: bool,
}

impl RovingFocus {
    pub fn new(order: Vec<NodeId>, wrap: bool) -> Self {
        Self { order, wrap }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.order.contains(&id)
    }

    pub fn first(&self) -> Option<NodeId> {
        self.order.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.order.last().copied()
    }

    /// Element after `current`; `None` at the end unless wrapping
    pub fn next(&self, current: NodeId) -> Option<NodeId> {
        let pos = self.order.iter().position(|&id| id == current)?;
        match self.order.get(pos + 1) {
            Some(&next) => Some(next),
            None if self.wrap => self.first(),
            None => None,
        }
    }

    /// Element before `current`; `None` at the start unless wrapping
    pub fn prev(&self, current: NodeId) -> Option<NodeId> {
        let pos = self.order.iter().position(|&id| id == current)?;
        match pos.checked_sub(1) {
            Some(p) => Some(self.order[p]),
            None if self.wrap => self.last(),
            None => None,
        }
    }
}
