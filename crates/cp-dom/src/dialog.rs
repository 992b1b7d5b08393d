//! Dialog API
//!
//! `<dialog>` element semantics: the `open` attribute, the top layer for
//! modally shown dialogs, return values and the queued `close` event.

use tracing::debug;

use crate::{DomError, DomResult, Document, Event, EventType, NodeId};

/// Dialog state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Open,
    Modal,
}

impl Document {
    pub fn is_dialog(&self, id: NodeId) -> bool {
        self.tree().element(id).is_some_and(|e| e.is("dialog"))
    }

    /// Live open state (the `open` attribute)
    pub fn is_dialog_open(&self, id: NodeId) -> bool {
        self.is_dialog(id) && self.has_attr(id, "open")
    }

    pub fn is_modal_dialog(&self, id: NodeId) -> bool {
        self.is_dialog_open(id) && self.top_layer.contains(&id)
    }

    pub fn dialog_state(&self, id: NodeId) -> DialogState {
        if self.is_modal_dialog(id) {
            DialogState::Modal
        } else if self.is_dialog_open(id) {
            DialogState::Open
        } else {
            DialogState::Closed
        }
    }

    fn require_dialog(&self, id: NodeId) -> DomResult<()> {
        match self.tree().element(id) {
            Some(e) if e.is("dialog") => Ok(()),
            Some(e) => Err(DomError::NotADialog { node: id, tag: e.tag.clone() }),
            None => Err(DomError::NotAnElement(id)),
        }
    }

    /// Show non-modally; returns false if already open
    pub fn show_dialog(&mut self, id: NodeId) -> DomResult<bool> {
        self.require_dialog(id)?;
        if self.is_dialog_open(id) {
            return Ok(false);
        }
        self.set_attr(id, "open", "")?;
        debug!(dialog = %id, "dialog shown");
        Ok(true)
    }

    /// Show modally (pushed onto the top layer); returns false if already open
    pub fn show_modal_dialog(&mut self, id: NodeId) -> DomResult<bool> {
        self.require_dialog(id)?;
        if self.is_dialog_open(id) {
            return Ok(false);
        }
        self.set_attr(id, "open", "")?;
        self.top_layer.push(id);
        debug!(dialog = %id, depth = self.top_layer.len(), "dialog shown modally");
        Ok(true)
    }

    /// Close the dialog and queue its `close` event
    ///
    /// Returns false (and queues nothing) when the dialog was not open.
    pub fn close_dialog(&mut self, id: NodeId, return_value: Option<&str>) -> DomResult<bool> {
        self.require_dialog(id)?;
        if !self.is_dialog_open(id) {
            return Ok(false);
        }
        if let Some(value) = return_value {
            self.set_dialog_return_value(id, value);
        }
        self.remove_attr(id, "open");
        self.remove_from_top_layer(id);
        if self.active_element().is_some_and(|a| self.contains(id, a)) {
            self.blur();
        }
        debug!(dialog = %id, "dialog closed");

        self.queue_task(
            "dialog-close",
            Box::new(move |doc: &mut Document| {
                doc.dispatch_event(Event::new(EventType::Close, id));
                Ok(())
            }),
        );
        Ok(true)
    }

    pub fn dialog_return_value(&self, id: NodeId) -> Option<&str> {
        self.return_values.get(&id).map(String::as_str)
    }

    pub fn set_dialog_return_value(&mut self, id: NodeId, value: &str) {
        self.return_values.insert(id, value.to_string());
    }

    pub fn clear_dialog_return_value(&mut self, id: NodeId) {
        self.return_values.remove(&id);
    }

    /// Modally shown dialogs, bottom first
    pub fn top_layer(&self) -> &[NodeId] {
        &self.top_layer
    }

    pub fn topmost_modal(&self) -> Option<NodeId> {
        self.top_layer.last().copied()
    }

    pub fn remove_from_top_layer(&mut self, id: NodeId) -> bool {
        let before = self.top_layer.len();
        self.top_layer.retain(|&n| n != id);
        self.top_layer.len() != before
    }

    /// Flush pending style changes (counted so callers can observe it)
    pub fn force_reflow(&mut self) {
        self.reflows += 1;
    }

    pub fn reflow_count(&self) -> u64 {
        self.reflows
    }
}
