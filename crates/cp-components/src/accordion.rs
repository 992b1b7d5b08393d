//! Accordion
//!
//! Groups the expand controls under a `[data-accordion]` container. In
//! single mode at most one item is expanded: before an item expands, every
//! other expanded item collapses, in document order. Arrow keys, Home and
//! End move focus between the item controls.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use cp_a11y::RovingFocus;
use cp_dom::{Document, Event as DomEvent, EventType, Key, ListenerId, NodeId, Teardown};
use cp_emitter::Handler;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::config::bool_attr;
use crate::error::{ComponentError, ComponentResult};
use crate::expand::{BeforeExpand, Expand, ExpandOptions, ToggleDetail};

/// Item selector inside an accordion container
pub const ITEM_CONTROL_SELECTOR: &str = "[aria-expanded][aria-controls]";

/// Group mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccordionMode {
    /// At most one item expanded
    Single,
    #[default]
    Multiple,
}

impl AccordionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Some(Self::Single),
            "multiple" => Some(Self::Multiple),
            _ => None,
        }
    }
}

/// Accordion options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccordionOptions {
    pub mode: AccordionMode,
    /// Arrow/Home/End navigation between controls
    pub keyboard: bool,
    /// ArrowDown on the last control moves to the first (and back)
    pub wrap: bool,
    /// Options for expand instances the accordion creates
    #[serde(skip)]
    pub items: ExpandOptions,
}

impl Default for AccordionOptions {
    fn default() -> Self {
        Self {
            mode: AccordionMode::Multiple,
            keyboard: true,
            wrap: true,
            items: ExpandOptions::default(),
        }
    }
}

impl AccordionOptions {
    fn with_attributes(mut self, doc: &Document, container: NodeId) -> Self {
        if let Some(value) = doc.attr(container, "data-accordion-mode") {
            match AccordionMode::parse(value) {
                Some(mode) => self.mode = mode,
                None => warn!(container = %container, value, "unknown accordion mode, ignored"),
            }
        }
        if let Some(keyboard) = bool_attr(doc, container, "data-accordion-keyboard") {
            self.keyboard = keyboard;
        }
        if let Some(wrap) = bool_attr(doc, container, "data-accordion-wrap") {
            self.wrap = wrap;
        }
        self
    }
}

#[derive(Default)]
struct AccordionState {
    keydown_listener: Option<ListenerId>,
    subscriptions: Vec<(Weak<Expand>, Handler<Document, BeforeExpand>)>,
    destroyed: bool,
}

/// Accordion coordinator
pub struct Accordion {
    container: NodeId,
    options: AccordionOptions,
    items: Vec<Rc<Expand>>,
    state: RefCell<AccordionState>,
}

impl Accordion {
    /// Coordinate the items of `container`, or return the existing instance
    pub fn new(doc: &mut Document, container: NodeId, options: AccordionOptions) -> ComponentResult<Rc<Self>> {
        if !doc.is_element(container) {
            return Err(ComponentError::NotAnElement(container));
        }
        if let Some(existing) = Self::get_instance(doc, container) {
            return Ok(existing);
        }
        let options = options.with_attributes(doc, container);

        let mut items = Vec::new();
        for control in doc.query_selector_all(container, ITEM_CONTROL_SELECTOR)? {
            if !Self::owns(doc, container, control) {
                continue;
            }
            let item = match Expand::get_instance(doc, control) {
                Some(item) => item,
                None => Expand::new(doc, control, options.items.clone())?,
            };
            items.push(item);
        }

        let accordion = Rc::new(Self {
            container,
            options,
            items,
            state: RefCell::new(AccordionState::default()),
        });
        accordion.bind(doc);
        doc.attach_component(container, Rc::clone(&accordion));
        debug!(
            container = %container,
            items = accordion.items.len(),
            mode = ?accordion.options.mode,
            "accordion created"
        );
        Ok(accordion)
    }

    pub fn get_instance(doc: &Document, container: NodeId) -> Option<Rc<Self>> {
        doc.instance::<Self>(container)
    }

    /// Controls belong to the nearest enclosing accordion only
    fn owns(doc: &Document, container: NodeId, control: NodeId) -> bool {
        !doc.has_attr(control, "data-modal-open")
            && doc
                .tree()
                .ancestors(control)
                .take_while(|&a| a != container)
                .all(|a| !doc.has_attr(a, "data-accordion"))
    }

    fn bind(self: &Rc<Self>, doc: &mut Document) {
        let mut subscriptions = Vec::new();
        if self.options.mode == AccordionMode::Single {
            for item in &self.items {
                let me = Rc::downgrade(self);
                let handler: Handler<Document, BeforeExpand> = Rc::new(move |doc: &mut Document, detail: &ToggleDetail| {
                    if let Some(accordion) = me.upgrade() {
                        accordion.collapse_others(doc, detail.control)?;
                    }
                    Ok(())
                });
                item.events().on::<BeforeExpand>(Rc::clone(&handler));
                subscriptions.push((Rc::downgrade(item), handler));
            }
        }

        let keydown = self.options.keyboard.then(|| {
            let me = Rc::downgrade(self);
            doc.add_event_listener(
                self.container,
                EventType::KeyDown,
                Rc::new(move |doc: &mut Document, event: &mut DomEvent| {
                    if let Some(accordion) = me.upgrade() {
                        accordion.handle_key(doc, event);
                    }
                    Ok(())
                }),
            )
        });

        let mut state = self.state.borrow_mut();
        state.subscriptions = subscriptions;
        state.keydown_listener = keydown;
    }

    fn collapse_others(&self, doc: &mut Document, keep: NodeId) -> ComponentResult<()> {
        for item in &self.items {
            if item.control() != keep && item.is_expanded(doc) {
                trace!(container = %self.container, control = %item.control(), "collapsing sibling");
                item.collapse(doc)?;
            }
        }
        Ok(())
    }

    fn handle_key(&self, doc: &mut Document, event: &mut DomEvent) {
        let target = event.target();
        let order = RovingFocus::new(self.controls(), self.options.wrap);
        if !order.contains(target) {
            return;
        }
        let next = match event.key() {
            Some(Key::ArrowDown) => order.next(target),
            Some(Key::ArrowUp) => order.prev(target),
            Some(Key::Home) => order.first(),
            Some(Key::End) => order.last(),
            _ => return,
        };
        event.prevent_default();
        if let Some(next) = next {
            doc.focus(next);
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn mode(&self) -> AccordionMode {
        self.options.mode
    }

    pub fn options(&self) -> &AccordionOptions {
        &self.options
    }

    /// Managed items in document order
    pub fn items(&self) -> &[Rc<Expand>] {
        &self.items
    }

    pub fn controls(&self) -> Vec<NodeId> {
        self.items.iter().map(|i| i.control()).collect()
    }

    pub fn expanded_items(&self, doc: &Document) -> Vec<Rc<Expand>> {
        self.items.iter().filter(|i| i.is_expanded(doc)).cloned().collect()
    }

    /// Stop coordinating; the items stay enhanced
    pub fn destroy(&self, doc: &mut Document) {
        let (keydown, subscriptions) = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            (state.keydown_listener.take(), std::mem::take(&mut state.subscriptions))
        };
        if let Some(id) = keydown {
            doc.remove_event_listener(self.container, id);
        }
        for (item, handler) in subscriptions {
            if let Some(item) = item.upgrade() {
                item.events().off::<BeforeExpand>(&handler);
            }
        }
        if Self::get_instance(doc, self.container).is_some_and(|i| std::ptr::eq(Rc::as_ptr(&i), self)) {
            doc.detach_instance::<Self>(self.container);
        }
        debug!(container = %self.container, "accordion destroyed");
    }
}

impl Teardown for Accordion {
    fn teardown(&self, doc: &mut Document) -> anyhow::Result<()> {
        self.destroy(doc);
        Ok(())
    }
}

impl std::fmt::Debug for Accordion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accordion")
            .field("container", &self.container)
            .field("mode", &self.options.mode)
            .field("items", &self.controls())
            .finish()
    }
}
