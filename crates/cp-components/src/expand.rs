//! Expand / collapse
//!
//! Disclosure behaviour for a control + content pair linked by
//! `aria-controls`. The open state is the control's `aria-expanded`
//! attribute; nothing else stores it.
//!
//! With an animation name, showing and hiding run a class based enter/leave
//! transition on the content and `hidden` is only applied once the leave
//! phase completes.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use cp_a11y::{aria, ControlLink};
use cp_dom::{Document, Event as DomEvent, EventType, ListenerId, NodeId, Teardown, TimerId};
use cp_emitter::{Emitter, Event};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::config::{ms_attr, string_attr};
use crate::error::{ComponentError, ComponentResult};

/// Payload of every expand event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleDetail {
    pub control: NodeId,
    pub content: NodeId,
    /// Target state for `Before*`, realized state for `After*`
    pub expanded: bool,
}

pub struct BeforeExpand;
pub struct AfterExpand;
pub struct BeforeCollapse;
pub struct AfterCollapse;

impl Event for BeforeExpand {
    type Payload = ToggleDetail;
    const NAME: &'static str = "expand:before-expand";
}

impl Event for AfterExpand {
    type Payload = ToggleDetail;
    const NAME: &'static str = "expand:after-expand";
}

impl Event for BeforeCollapse {
    type Payload = ToggleDetail;
    const NAME: &'static str = "expand:before-collapse";
}

impl Event for AfterCollapse {
    type Payload = ToggleDetail;
    const NAME: &'static str = "expand:after-collapse";
}

/// Expand options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpandOptions {
    /// Class prefix for enter/leave transitions (`data-expand-animation`)
    pub animation: Option<String>,
    /// Elements made inert while expanded (`data-expand-inert`)
    pub inert: Option<String>,
    /// Completes a transition phase when no end event arrives
    pub transition_timeout_ms: u64,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            animation: None,
            inert: None,
            transition_timeout_ms: 500,
        }
    }
}

impl ExpandOptions {
    /// Declarative overrides; the content's attributes win over the control's
    fn with_attributes(mut self, doc: &Document, control: NodeId, content: Option<NodeId>) -> Self {
        for node in [Some(control), content].into_iter().flatten() {
            if let Some(name) = string_attr(doc, node, "data-expand-animation") {
                self.animation = Some(name);
            }
            if let Some(selector) = string_attr(doc, node, "data-expand-inert") {
                self.inert = Some(selector);
            }
            if let Some(ms) = ms_attr(doc, node, "data-expand-timeout") {
                self.transition_timeout_ms = ms;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseKind {
    Enter,
    Leave,
}

impl PhaseKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Leave => "leave",
        }
    }
}

/// In-flight transition
#[derive(Debug)]
struct Phase {
    generation: u64,
    kind: PhaseKind,
    name: String,
    frame: TimerId,
    timeout: TimerId,
}

impl Phase {
    fn class(&self, step: &str) -> String {
        format!("{}-{}-{}", self.name, self.kind.as_str(), step)
    }
}

#[derive(Debug, Default)]
struct ExpandState {
    click_listener: Option<ListenerId>,
    end_listeners: Vec<ListenerId>,
    inert_marked: Vec<NodeId>,
    phase: Option<Phase>,
    generation: u64,
    destroyed: bool,
}

/// Expand / collapse controller for one control element
pub struct Expand {
    control: NodeId,
    content: Option<NodeId>,
    options: ExpandOptions,
    events: Emitter<Document>,
    state: RefCell<ExpandState>,
    me: Weak<Expand>,
}

impl Expand {
    /// Enhance `control`, or return the instance already attached to it
    pub fn new(doc: &mut Document, control: NodeId, options: ExpandOptions) -> ComponentResult<Rc<Self>> {
        if !doc.is_element(control) {
            return Err(ComponentError::NotAnElement(control));
        }
        if let Some(existing) = Self::get_instance(doc, control) {
            return Ok(existing);
        }

        let content = match aria::controlled_element(doc, control) {
            ControlLink::Resolved(content) => Some(content),
            ControlLink::Missing => {
                debug!(control = %control, "no aria-controls, toggling disabled");
                None
            }
            ControlLink::Unresolved(id) => {
                warn!(control = %control, id = %id, "aria-controls target not found");
                None
            }
        };
        let options = options.with_attributes(doc, control, content);

        if aria::expanded_state(doc, control).is_none() {
            let visible = content.is_some_and(|c| !doc.has_attr(c, "hidden"));
            aria::set_expanded(doc, control, visible)?;
        }

        let expand = Rc::new_cyclic(|me| Self {
            control,
            content,
            options,
            events: Emitter::new(),
            state: RefCell::new(ExpandState::default()),
            me: me.clone(),
        });
        expand.bind(doc);
        if expand.is_expanded(doc) {
            expand.mark_inert(doc)?;
        }
        doc.attach_component(control, Rc::clone(&expand));
        debug!(control = %control, content = ?content, "expand created");
        Ok(expand)
    }

    /// Instance attached to `control`, never constructs
    pub fn get_instance(doc: &Document, control: NodeId) -> Option<Rc<Self>> {
        doc.instance::<Self>(control)
    }

    fn bind(&self, doc: &mut Document) {
        let me = self.me.clone();
        let click = doc.add_event_listener(
            self.control,
            EventType::Click,
            Rc::new(move |doc: &mut Document, _event: &mut DomEvent| {
                if let Some(expand) = me.upgrade() {
                    expand.toggle(doc)?;
                }
                Ok(())
            }),
        );

        let mut end_listeners = Vec::new();
        if let Some(content) = self.content {
            for event_type in [EventType::AnimationEnd, EventType::TransitionEnd] {
                let me = self.me.clone();
                let id = doc.add_event_listener(
                    content,
                    event_type,
                    Rc::new(move |doc: &mut Document, event: &mut DomEvent| {
                        // ends bubbling up from animated descendants do not count
                        if event.target() != content {
                            return Ok(());
                        }
                        if let Some(expand) = me.upgrade() {
                            expand.complete_phase(doc, None)?;
                        }
                        Ok(())
                    }),
                );
                end_listeners.push(id);
            }
        }

        let mut state = self.state.borrow_mut();
        state.click_listener = Some(click);
        state.end_listeners = end_listeners;
    }

    pub fn control(&self) -> NodeId {
        self.control
    }

    /// Controlled element, `None` when `aria-controls` is missing or unresolved
    pub fn content(&self) -> Option<NodeId> {
        self.content
    }

    pub fn options(&self) -> &ExpandOptions {
        &self.options
    }

    pub fn events(&self) -> &Emitter<Document> {
        &self.events
    }

    pub fn is_expanded(&self, doc: &Document) -> bool {
        aria::is_expanded(doc, self.control)
    }

    /// Whether an enter or leave transition is in flight
    pub fn is_animating(&self) -> bool {
        self.state.borrow().phase.is_some()
    }

    fn active_content(&self) -> Option<NodeId> {
        if self.state.borrow().destroyed {
            return None;
        }
        self.content
    }

    pub fn toggle(&self, doc: &mut Document) -> ComponentResult<()> {
        if self.is_expanded(doc) {
            self.collapse(doc)
        } else {
            self.expand(doc)
        }
    }

    pub fn expand(&self, doc: &mut Document) -> ComponentResult<()> {
        let Some(content) = self.active_content() else {
            return Ok(());
        };
        if self.is_expanded(doc) {
            return Ok(());
        }
        let detail = ToggleDetail {
            control: self.control,
            content,
            expanded: true,
        };
        self.events.emit::<BeforeExpand>(doc, &detail)?;

        aria::set_expanded(doc, self.control, true)?;
        self.show(doc, content)?;
        self.mark_inert(doc)?;
        debug!(control = %self.control, "expanded");

        self.events.emit::<AfterExpand>(doc, &detail)?;
        Ok(())
    }

    pub fn collapse(&self, doc: &mut Document) -> ComponentResult<()> {
        let Some(content) = self.active_content() else {
            return Ok(());
        };
        if !self.is_expanded(doc) {
            return Ok(());
        }
        let detail = ToggleDetail {
            control: self.control,
            content,
            expanded: false,
        };
        self.events.emit::<BeforeCollapse>(doc, &detail)?;

        aria::set_expanded(doc, self.control, false)?;
        if doc.active_element().is_some_and(|a| doc.contains(content, a)) {
            doc.focus(self.control);
        }
        self.hide(doc, content)?;
        self.unmark_inert(doc)?;
        debug!(control = %self.control, "collapsed");

        self.events.emit::<AfterCollapse>(doc, &detail)?;
        Ok(())
    }

    fn show(&self, doc: &mut Document, content: NodeId) -> ComponentResult<()> {
        self.cancel_phase(doc)?;
        doc.set_hidden(content, false)?;
        match &self.options.animation {
            Some(name) => self.start_phase(doc, content, name, PhaseKind::Enter),
            None => Ok(()),
        }
    }

    fn hide(&self, doc: &mut Document, content: NodeId) -> ComponentResult<()> {
        self.cancel_phase(doc)?;
        match &self.options.animation {
            Some(name) => self.start_phase(doc, content, name, PhaseKind::Leave),
            None => Ok(doc.set_hidden(content, true)?),
        }
    }

    fn start_phase(&self, doc: &mut Document, content: NodeId, name: &str, kind: PhaseKind) -> ComponentResult<()> {
        let generation = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.generation
        };

        let me = self.me.clone();
        let frame = doc.request_animation_frame(move |doc| {
            if let Some(expand) = me.upgrade() {
                expand.advance_phase(doc, generation)?;
            }
            Ok(())
        });
        let me = self.me.clone();
        let timeout = doc.set_timeout(Duration::from_millis(self.options.transition_timeout_ms), move |doc| {
            if let Some(expand) = me.upgrade() {
                expand.complete_phase(doc, Some(generation))?;
            }
            Ok(())
        });

        let phase = Phase {
            generation,
            kind,
            name: name.to_string(),
            frame,
            timeout,
        };
        doc.add_class(content, &phase.class("from"))?;
        doc.add_class(content, &phase.class("active"))?;
        doc.force_reflow();
        trace!(content = %content, generation, phase = kind.as_str(), "transition started");
        self.state.borrow_mut().phase = Some(phase);
        Ok(())
    }

    /// Next frame: `-from` becomes `-to`
    fn advance_phase(&self, doc: &mut Document, generation: u64) -> ComponentResult<()> {
        let Some(content) = self.content else {
            return Ok(());
        };
        let classes = self
            .state
            .borrow()
            .phase
            .as_ref()
            .filter(|p| p.generation == generation)
            .map(|p| (p.class("from"), p.class("to")));
        if let Some((from, to)) = classes {
            doc.remove_class(content, &from)?;
            doc.add_class(content, &to)?;
        }
        Ok(())
    }

    /// Finish the current phase (or only `generation`, when given)
    fn complete_phase(&self, doc: &mut Document, generation: Option<u64>) -> ComponentResult<()> {
        let phase = {
            let mut state = self.state.borrow_mut();
            let current = state.phase.as_ref().map(|p| p.generation);
            match current {
                Some(g) if generation.is_none_or(|wanted| wanted == g) => state.phase.take(),
                _ => None,
            }
        };
        let (Some(phase), Some(content)) = (phase, self.content) else {
            return Ok(());
        };
        self.clear_phase(doc, content, &phase)?;
        if phase.kind == PhaseKind::Leave {
            doc.set_hidden(content, true)?;
        }
        trace!(content = %content, generation = phase.generation, "transition finished");
        Ok(())
    }

    /// Drop an in-flight phase without applying its end state
    fn cancel_phase(&self, doc: &mut Document) -> ComponentResult<()> {
        let phase = self.state.borrow_mut().phase.take();
        if let (Some(phase), Some(content)) = (phase, self.content) {
            self.clear_phase(doc, content, &phase)?;
            trace!(content = %content, generation = phase.generation, "transition interrupted");
        }
        Ok(())
    }

    fn clear_phase(&self, doc: &mut Document, content: NodeId, phase: &Phase) -> ComponentResult<()> {
        doc.clear_timeout(phase.frame);
        doc.clear_timeout(phase.timeout);
        for step in ["from", "active", "to"] {
            doc.remove_class(content, &phase.class(step))?;
        }
        Ok(())
    }

    /// Elements this instance made inert
    pub fn inert_elements(&self) -> Vec<NodeId> {
        self.state.borrow().inert_marked.clone()
    }

    fn mark_inert(&self, doc: &mut Document) -> ComponentResult<()> {
        let (Some(selector), Some(content)) = (&self.options.inert, self.content) else {
            return Ok(());
        };
        let candidates = match doc.query_selector_all(doc.root(), selector) {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(control = %self.control, "inert scope ignored: {err}");
                return Ok(());
            }
        };

        let mut marked = Vec::new();
        for node in candidates {
            let related = [self.control, content]
                .iter()
                .any(|&own| doc.contains(node, own) || doc.contains(own, node));
            // already inert elements belong to someone else
            if related || doc.has_attr(node, "inert") {
                continue;
            }
            doc.set_inert(node, true)?;
            marked.push(node);
        }
        trace!(control = %self.control, count = marked.len(), "marked inert");
        self.state.borrow_mut().inert_marked.extend(marked);
        Ok(())
    }

    fn unmark_inert(&self, doc: &mut Document) -> ComponentResult<()> {
        let marked = std::mem::take(&mut self.state.borrow_mut().inert_marked);
        for node in marked {
            doc.set_inert(node, false)?;
        }
        Ok(())
    }

    /// Remove listeners, undo inert marks and detach from the control
    ///
    /// An in-flight transition is finished immediately.
    pub fn destroy(&self, doc: &mut Document) -> ComponentResult<()> {
        let (click, ends) = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return Ok(());
            }
            state.destroyed = true;
            (state.click_listener.take(), std::mem::take(&mut state.end_listeners))
        };
        if let Some(id) = click {
            doc.remove_event_listener(self.control, id);
        }
        if let Some(content) = self.content {
            for id in ends {
                doc.remove_event_listener(content, id);
            }
        }
        self.complete_phase(doc, None)?;
        self.unmark_inert(doc)?;
        self.events.clear();

        if Self::get_instance(doc, self.control).is_some_and(|i| std::ptr::eq(Rc::as_ptr(&i), self)) {
            doc.detach_instance::<Self>(self.control);
        }
        debug!(control = %self.control, "expand destroyed");
        Ok(())
    }
}

/// Removing the control restores hidden state and inert marks outside it
impl Teardown for Expand {
    fn teardown(&self, doc: &mut Document) -> anyhow::Result<()> {
        Ok(self.destroy(doc)?)
    }
}

impl std::fmt::Debug for Expand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expand")
            .field("control", &self.control)
            .field("content", &self.content)
            .field("options", &self.options)
            .finish()
    }
}
