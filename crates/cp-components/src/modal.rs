//! Modal
//!
//! Focus handling, dismissal policy and auto-open around a native
//! `<dialog>`. Showing, the top layer and the `close` event stay with the
//! dialog; the controller only decides when to call them and what to do
//! around them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use cp_a11y::first_focusable;
use cp_dom::{Document, Event as DomEvent, EventType, Key, ListenerId, NodeId, Teardown, TimerId};
use cp_emitter::{Emitter, Event};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::config::{bool_attr, ms_attr, string_attr};
use crate::error::{ComponentError, ComponentResult};

/// Payload of `BeforeOpen` / `AfterOpen`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenDetail {
    pub dialog: NodeId,
    /// Shown modally (top layer) rather than in place
    pub modal: bool,
}

/// Payload of `BeforeClose` / `AfterClose`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseDetail {
    pub dialog: NodeId,
    pub return_value: Option<String>,
}

pub struct BeforeOpen;
pub struct AfterOpen;
pub struct BeforeClose;
pub struct AfterClose;

impl Event for BeforeOpen {
    type Payload = OpenDetail;
    const NAME: &'static str = "modal:before-open";
}

impl Event for AfterOpen {
    type Payload = OpenDetail;
    const NAME: &'static str = "modal:after-open";
}

impl Event for BeforeClose {
    type Payload = CloseDetail;
    const NAME: &'static str = "modal:before-close";
}

impl Event for AfterClose {
    type Payload = CloseDetail;
    const NAME: &'static str = "modal:after-close";
}

/// Modal options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModalOptions {
    /// Click on the backdrop closes (`data-modal-backdrop`)
    pub backdrop_dismiss: bool,
    /// Escape closes (`data-modal-escape`)
    pub escape_dismiss: bool,
    /// Return focus to the opener on close (`data-modal-restore-focus`)
    pub restore_focus: bool,
    /// Selector for the initially focused element (`data-modal-focus`)
    pub focus_target: Option<String>,
    /// Open once constructed (`data-modal-auto-open`)
    pub auto_open: bool,
    /// `data-modal-delay`
    pub auto_open_delay_ms: u64,
    /// Auto-open modally; `data-modal-non-modal` turns this off
    pub auto_open_modal: bool,
}

impl Default for ModalOptions {
    fn default() -> Self {
        Self {
            backdrop_dismiss: true,
            escape_dismiss: true,
            restore_focus: true,
            focus_target: None,
            auto_open: false,
            auto_open_delay_ms: 0,
            auto_open_modal: true,
        }
    }
}

impl ModalOptions {
    fn with_attributes(mut self, doc: &Document, dialog: NodeId) -> Self {
        if let Some(v) = bool_attr(doc, dialog, "data-modal-backdrop") {
            self.backdrop_dismiss = v;
        }
        if let Some(v) = bool_attr(doc, dialog, "data-modal-escape") {
            self.escape_dismiss = v;
        }
        if let Some(v) = bool_attr(doc, dialog, "data-modal-restore-focus") {
            self.restore_focus = v;
        }
        if let Some(selector) = string_attr(doc, dialog, "data-modal-focus") {
            self.focus_target = Some(selector);
        }
        if let Some(v) = bool_attr(doc, dialog, "data-modal-auto-open") {
            self.auto_open = v;
        }
        if let Some(ms) = ms_attr(doc, dialog, "data-modal-delay") {
            self.auto_open_delay_ms = ms;
        }
        if let Some(non_modal) = bool_attr(doc, dialog, "data-modal-non-modal") {
            self.auto_open_modal = !non_modal;
        }
        self
    }
}

pub type OpenCallback = Rc<dyn Fn(&mut Document, &OpenDetail) -> anyhow::Result<()>>;
pub type CloseCallback = Rc<dyn Fn(&mut Document, &CloseDetail) -> anyhow::Result<()>>;

/// Optional hooks run after the `AfterOpen` / `AfterClose` events
#[derive(Clone, Default)]
pub struct ModalCallbacks {
    pub on_open: Option<OpenCallback>,
    pub on_close: Option<CloseCallback>,
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalPhase {
    #[default]
    Closed,
    Opening,
    Open,
    /// Closed natively, waiting for the `close` event
    Closing,
}

#[derive(Default)]
struct ModalState {
    phase: ModalPhase,
    close_listener: Option<ListenerId>,
    dismiss_listeners: Vec<(NodeId, ListenerId)>,
    return_focus: Option<NodeId>,
    auto_open_timer: Option<TimerId>,
    destroyed: bool,
}

/// Modal controller for one `<dialog>`
pub struct Modal {
    dialog: NodeId,
    options: ModalOptions,
    callbacks: ModalCallbacks,
    events: Emitter<Document>,
    state: RefCell<ModalState>,
    me: Weak<Modal>,
}

impl Modal {
    pub fn new(doc: &mut Document, dialog: NodeId, options: ModalOptions) -> ComponentResult<Rc<Self>> {
        Self::with_callbacks(doc, dialog, options, ModalCallbacks::default())
    }

    /// Control `dialog`, or return the instance already attached to it
    ///
    /// Callbacks are ignored when an instance already exists.
    pub fn with_callbacks(
        doc: &mut Document,
        dialog: NodeId,
        options: ModalOptions,
        callbacks: ModalCallbacks,
    ) -> ComponentResult<Rc<Self>> {
        let Some(tag) = doc.tag_name(dialog) else {
            return Err(ComponentError::NotAnElement(dialog));
        };
        if tag != "dialog" {
            return Err(ComponentError::WrongElementKind {
                node: dialog,
                expected: "dialog",
                found: tag.to_string(),
            });
        }
        if let Some(existing) = Self::get_instance(doc, dialog) {
            return Ok(existing);
        }
        let options = options.with_attributes(doc, dialog);

        let modal = Rc::new_cyclic(|me| Self {
            dialog,
            options,
            callbacks,
            events: Emitter::new(),
            state: RefCell::new(ModalState {
                phase: if doc.is_dialog_open(dialog) { ModalPhase::Open } else { ModalPhase::Closed },
                ..ModalState::default()
            }),
            me: me.clone(),
        });

        let me = modal.me.clone();
        let close_listener = doc.add_event_listener(
            dialog,
            EventType::Close,
            Rc::new(move |doc: &mut Document, _event: &mut DomEvent| {
                if let Some(modal) = me.upgrade() {
                    modal.after_close(doc)?;
                }
                Ok(())
            }),
        );
        modal.state.borrow_mut().close_listener = Some(close_listener);
        if doc.is_dialog_open(dialog) {
            modal.bind_dismissal(doc);
        }
        if modal.options.auto_open {
            modal.schedule_auto_open(doc);
        }

        doc.attach_component(dialog, Rc::clone(&modal));
        debug!(dialog = %dialog, "modal created");
        Ok(modal)
    }

    pub fn get_instance(doc: &Document, dialog: NodeId) -> Option<Rc<Self>> {
        doc.instance::<Self>(dialog)
    }

    pub fn dialog(&self) -> NodeId {
        self.dialog
    }

    pub fn options(&self) -> &ModalOptions {
        &self.options
    }

    pub fn events(&self) -> &Emitter<Document> {
        &self.events
    }

    pub fn phase(&self) -> ModalPhase {
        self.state.borrow().phase
    }

    /// Live open state of the dialog
    pub fn is_open(&self, doc: &Document) -> bool {
        doc.is_dialog_open(self.dialog)
    }

    fn set_phase(&self, phase: ModalPhase) {
        self.state.borrow_mut().phase = phase;
    }

    fn schedule_auto_open(&self, doc: &mut Document) {
        let me = self.me.clone();
        let modal_open = self.options.auto_open_modal;
        let delay = Duration::from_millis(self.options.auto_open_delay_ms);
        let timer = doc.set_timeout(delay, move |doc| {
            let Some(modal) = me.upgrade() else {
                return Ok(());
            };
            modal.state.borrow_mut().auto_open_timer = None;
            if modal.is_open(doc) {
                debug!(dialog = %modal.dialog, "already open, auto-open skipped");
                return Ok(());
            }
            modal.open_with(doc, modal_open)?;
            Ok(())
        });
        self.state.borrow_mut().auto_open_timer = Some(timer);
        trace!(dialog = %self.dialog, ?delay, "auto-open scheduled");
    }

    /// Show modally (top layer, backdrop)
    pub fn open_modal(&self, doc: &mut Document) -> ComponentResult<()> {
        self.open_with(doc, true)
    }

    pub fn open_non_modal(&self, doc: &mut Document) -> ComponentResult<()> {
        self.open_with(doc, false)
    }

    fn open_with(&self, doc: &mut Document, modal: bool) -> ComponentResult<()> {
        if self.state.borrow().destroyed || self.is_open(doc) {
            return Ok(());
        }
        let opener = doc.active_element();
        self.set_phase(ModalPhase::Opening);

        let detail = OpenDetail {
            dialog: self.dialog,
            modal,
        };
        if let Err(err) = self.events.emit::<BeforeOpen>(doc, &detail) {
            self.set_phase(ModalPhase::Closed);
            return Err(err.into());
        }
        if self.options.restore_focus {
            self.state.borrow_mut().return_focus = opener;
        }

        doc.clear_dialog_return_value(self.dialog);
        if modal {
            doc.show_modal_dialog(self.dialog)?;
        } else {
            doc.show_dialog(self.dialog)?;
        }
        self.bind_dismissal(doc);
        self.place_focus(doc);
        self.set_phase(ModalPhase::Open);
        debug!(dialog = %self.dialog, modal, "modal opened");

        self.events.emit::<AfterOpen>(doc, &detail)?;
        if let Some(on_open) = &self.callbacks.on_open {
            on_open(doc, &detail)?;
        }
        Ok(())
    }

    /// Focus target selector, else first focusable descendant, else a footer button
    fn place_focus(&self, doc: &mut Document) {
        let explicit = self.options.focus_target.as_deref().and_then(|selector| {
            match doc.query_selector(self.dialog, selector) {
                Ok(found) => found,
                Err(err) => {
                    warn!(dialog = %self.dialog, "focus target ignored: {err}");
                    None
                }
            }
        });
        let target = explicit
            .or_else(|| first_focusable(doc, self.dialog))
            .or_else(|| doc.query_selector(self.dialog, "footer button").ok().flatten());
        match target {
            Some(target) => {
                if !doc.focus(target) {
                    trace!(dialog = %self.dialog, target = %target, "initial focus refused");
                }
            }
            None => trace!(dialog = %self.dialog, "nothing to focus"),
        }
    }

    /// Close with an optional return value
    pub fn close(&self, doc: &mut Document, return_value: Option<&str>) -> ComponentResult<()> {
        if !self.is_open(doc) {
            return Ok(());
        }
        let detail = CloseDetail {
            dialog: self.dialog,
            return_value: return_value.map(String::from),
        };
        self.events.emit::<BeforeClose>(doc, &detail)?;

        if let Some(value) = return_value {
            doc.set_dialog_return_value(self.dialog, value);
        }
        self.unbind_dismissal(doc);
        doc.close_dialog(self.dialog, return_value)?;
        self.force_cleanup(doc);
        self.set_phase(ModalPhase::Closing);
        debug!(dialog = %self.dialog, "modal closing");
        Ok(())
    }

    /// Shared tail of every close, run from the dialog's `close` event
    fn after_close(&self, doc: &mut Document) -> ComponentResult<()> {
        if self.is_open(doc) {
            // reopened before the queued close event ran
            trace!(dialog = %self.dialog, "stale close event skipped");
            return Ok(());
        }
        self.unbind_dismissal(doc);
        self.force_cleanup(doc);
        self.set_phase(ModalPhase::Closed);

        let return_focus = self.state.borrow_mut().return_focus.take();
        if let Some(target) = return_focus {
            if doc.tree().is_connected(target) {
                doc.focus(target);
            }
        }

        let detail = CloseDetail {
            dialog: self.dialog,
            return_value: doc.dialog_return_value(self.dialog).map(String::from),
        };
        debug!(dialog = %self.dialog, return_value = ?detail.return_value, "modal closed");
        self.events.emit::<AfterClose>(doc, &detail)?;
        if let Some(on_close) = &self.callbacks.on_close {
            on_close(doc, &detail)?;
        }
        Ok(())
    }

    /// Drop any presentation state the native close left behind
    fn force_cleanup(&self, doc: &mut Document) {
        doc.remove_attr(self.dialog, "open");
        doc.remove_from_top_layer(self.dialog);
        doc.force_reflow();
    }

    /// Backdrop click and Escape listeners; always rebinds from scratch
    fn bind_dismissal(&self, doc: &mut Document) {
        self.unbind_dismissal(doc);
        let dialog = self.dialog;

        let me = self.me.clone();
        let click = doc.add_event_listener(
            dialog,
            EventType::Click,
            Rc::new(move |doc: &mut Document, event: &mut DomEvent| {
                let Some(modal) = me.upgrade() else {
                    return Ok(());
                };
                // the backdrop reports the dialog itself as target
                if event.target() == dialog && modal.options.backdrop_dismiss && modal.is_open(doc) {
                    modal.close(doc, None)?;
                }
                Ok(())
            }),
        );

        let me = self.me.clone();
        let keydown = doc.add_event_listener(
            doc.root(),
            EventType::KeyDown,
            Rc::new(move |doc: &mut Document, event: &mut DomEvent| {
                let Some(modal) = me.upgrade() else {
                    return Ok(());
                };
                if event.key() != Some(&Key::Escape) || event.is_default_prevented() {
                    return Ok(());
                }
                let on_top = doc.topmost_modal().is_none_or(|top| top == dialog);
                if !modal.is_open(doc) || !on_top {
                    return Ok(());
                }
                // keep the native cancel path from bypassing the policy
                event.prevent_default();
                if modal.options.escape_dismiss {
                    modal.close(doc, None)?;
                }
                Ok(())
            }),
        );

        self.state.borrow_mut().dismiss_listeners = vec![(dialog, click), (doc.root(), keydown)];
    }

    fn unbind_dismissal(&self, doc: &mut Document) {
        let listeners = std::mem::take(&mut self.state.borrow_mut().dismiss_listeners);
        for (target, id) in listeners {
            doc.remove_event_listener(target, id);
        }
    }

    /// Remove every listener, force-close if open and detach; safe in any state
    pub fn destroy(&self, doc: &mut Document) -> ComponentResult<()> {
        let (close_listener, timer) = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return Ok(());
            }
            state.destroyed = true;
            (state.close_listener.take(), state.auto_open_timer.take())
        };
        if let Some(id) = close_listener {
            doc.remove_event_listener(self.dialog, id);
        }
        if let Some(timer) = timer {
            doc.clear_timeout(timer);
        }
        self.unbind_dismissal(doc);
        if self.is_open(doc) {
            doc.close_dialog(self.dialog, None)?;
            self.force_cleanup(doc);
        }
        self.set_phase(ModalPhase::Closed);
        self.events.clear();

        if Self::get_instance(doc, self.dialog).is_some_and(|i| std::ptr::eq(Rc::as_ptr(&i), self)) {
            doc.detach_instance::<Self>(self.dialog);
        }
        debug!(dialog = %self.dialog, "modal destroyed");
        Ok(())
    }
}

/// Removing the dialog releases the root keydown listener and any pending auto-open
impl Teardown for Modal {
    fn teardown(&self, doc: &mut Document) -> anyhow::Result<()> {
        Ok(self.destroy(doc)?)
    }
}

impl std::fmt::Debug for Modal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modal")
            .field("dialog", &self.dialog)
            .field("phase", &self.phase())
            .field("options", &self.options)
            .finish()
    }
}
