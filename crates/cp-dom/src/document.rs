//! Document - High-level document API
//!
//! Owns the tree plus everything a page needs at runtime: listeners,
//! focus, the top layer, the event loop and attached component instances.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tracing::{error, trace, warn};

use crate::event::ListenerEntry;
use crate::registry::InstanceRegistry;
use crate::timers::{EventLoop, Task};
use crate::{
    DOMTokenList, DomError, DomResult, DomTree, Event, EventType, Key, Listener, ListenerId,
    NodeId, SelectorList, TimerId,
};

/// Upper bound on tasks run by one `run_until_idle`/`advance` call
const MAX_TASKS_PER_TURN: usize = 10_000;

/// Document readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
}

/// HTML Document
pub struct Document {
    tree: DomTree,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
    ready_state: ReadyState,
    active_element: Option<NodeId>,
    listeners: HashMap<NodeId, Vec<ListenerEntry>>,
    next_listener: u64,
    pub(crate) top_layer: Vec<NodeId>,
    pub(crate) return_values: HashMap<NodeId, String>,
    pub(crate) event_loop: EventLoop,
    pub(crate) instances: InstanceRegistry,
    pub(crate) reflows: u64,
}

impl Document {
    /// Create a document with `<html><head></head><body></body></html>`
    pub fn new() -> Self {
        let mut doc = Self::empty();
        let html = doc.tree.create_element("html");
        let head = doc.tree.create_element("head");
        let body = doc.tree.create_element("body");
        // freshly created nodes cannot violate the hierarchy
        let _ = doc.tree.append_child(NodeId::ROOT, html);
        let _ = doc.tree.append_child(html, head);
        let _ = doc.tree.append_child(html, body);
        doc.html_element = html;
        doc.head_element = head;
        doc.body_element = body;
        doc
    }

    /// Create an empty document (no structure); call `finalize` once built
    pub fn empty() -> Self {
        Self {
            tree: DomTree::new(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
            ready_state: ReadyState::Loading,
            active_element: None,
            listeners: HashMap::new(),
            next_listener: 0,
            top_layer: Vec::new(),
            return_values: HashMap::new(),
            event_loop: EventLoop::default(),
            instances: InstanceRegistry::default(),
            reflows: 0,
        }
    }

    /// Locate `<html>`, `<head>` and `<body>` after external construction
    pub fn finalize(&mut self) {
        let find = |tree: &DomTree, tag: &str| {
            tree.descendants(NodeId::ROOT)
                .find(|&id| tree.tag_name(id) == Some(tag))
                .unwrap_or(NodeId::NONE)
        };
        self.html_element = find(&self.tree, "html");
        self.head_element = find(&self.tree, "head");
        self.body_element = find(&self.tree, "body");
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    pub fn head(&self) -> NodeId {
        self.head_element
    }

    pub fn body(&self) -> NodeId {
        self.body_element
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Mark the document interactive and fire `DOMContentLoaded`
    pub fn finish_parsing(&mut self) {
        if self.ready_state == ReadyState::Interactive {
            return;
        }
        self.ready_state = ReadyState::Interactive;
        self.dispatch_event(Event::new(EventType::DomContentLoaded, NodeId::ROOT));
    }

    // === Tree ===

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.create_element(tag)
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.tree.create_text(text)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.tree.append_child(parent, child)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.tree.insert_before(parent, child, reference)
    }

    /// Detach a subtree and release everything attached to it
    pub fn remove_node(&mut self, id: NodeId) -> DomResult<()> {
        if id == NodeId::ROOT {
            return Err(DomError::HierarchyRequest { parent: NodeId::NONE, child: id });
        }
        if self.tree.get(id).is_none() {
            return Err(DomError::NotFound(id));
        }
        let subtree: Vec<NodeId> = std::iter::once(id).chain(self.tree.descendants(id)).collect();
        for (node, teardown) in self.instances.teardowns(&subtree) {
            if let Err(err) = teardown(self) {
                error!(node = %node, "teardown failed: {err:#}");
            }
        }
        self.tree.detach(id);

        self.listeners.retain(|node, _| !subtree.contains(node));
        let dropped = self.instances.purge(&subtree);
        self.top_layer.retain(|node| !subtree.contains(node));
        self.return_values.retain(|node, _| !subtree.contains(node));
        if self.active_element.is_some_and(|a| subtree.contains(&a)) {
            self.active_element = None;
        }
        trace!(node = %id, nodes = subtree.len(), instances = dropped, "removed subtree");
        Ok(())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tree.is_element(id)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.tree.tag_name(id)
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.tree.contains(ancestor, node)
    }

    // === Attributes ===

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.tree.element(id)?.get_attr(name)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.tree.element(id).is_some_and(|e| e.has_attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.tree.try_element_mut(id)?.attrs.set(name, value);
        Ok(())
    }

    /// Remove an attribute, returns whether it was present
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        self.tree
            .element_mut(id)
            .is_some_and(|e| e.attrs.remove(name).is_some())
    }

    pub fn toggle_attr(&mut self, id: NodeId, name: &str, force: Option<bool>) -> DomResult<bool> {
        Ok(self.tree.try_element_mut(id)?.attrs.toggle(name, force))
    }

    pub fn class_list(&self, id: NodeId) -> DOMTokenList {
        self.tree.element(id).map(|e| e.class_list()).unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.tree.element(id).is_some_and(|e| e.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        self.update_class_list(id, |list| {
            list.add(class);
        })
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        self.update_class_list(id, |list| {
            list.remove(class);
        })
    }

    pub fn replace_class(&mut self, id: NodeId, old: &str, new: &str) -> DomResult<bool> {
        let mut replaced = false;
        self.update_class_list(id, |list| replaced = list.replace(old, new))?;
        Ok(replaced)
    }

    fn update_class_list(&mut self, id: NodeId, f: impl FnOnce(&mut DOMTokenList)) -> DomResult<()> {
        let element = self.tree.try_element_mut(id)?;
        let mut list = element.class_list();
        f(&mut list);
        element.set_class_list(&list);
        Ok(())
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> DomResult<()> {
        self.toggle_attr(id, "hidden", Some(hidden)).map(|_| ())
    }

    /// Not rendered: the node or an ancestor is `hidden` or a closed `<dialog>`
    pub fn is_hidden(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .filter_map(|n| self.tree.element(n))
            .any(|e| e.has_attr("hidden") || (e.is("dialog") && !e.has_attr("open")))
    }

    pub fn set_inert(&mut self, id: NodeId, inert: bool) -> DomResult<()> {
        self.toggle_attr(id, "inert", Some(inert)).map(|_| ())
    }

    /// Inert through the `inert` attribute or blocked by an open modal dialog
    pub fn is_inert(&self, id: NodeId) -> bool {
        let by_attr = std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .filter_map(|n| self.tree.element(n))
            .any(|e| e.has_attr("inert"));
        let blocked = self
            .top_layer
            .last()
            .is_some_and(|&modal| !self.tree.contains(modal, id));
        by_attr || blocked
    }

    // === Queries ===

    pub fn query_selector(&self, root: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.tree.descendants(root).find(|&n| selector.matches(&self.tree, n)))
    }

    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> DomResult<Vec<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .tree
            .descendants(root)
            .filter(|&n| selector.matches(&self.tree, n))
            .collect())
    }

    pub fn matches(&self, id: NodeId, selector: &str) -> DomResult<bool> {
        Ok(SelectorList::parse(selector)?.matches(&self.tree, id))
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, id: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .find(|&n| selector.matches(&self.tree, n)))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.tree
            .descendants(NodeId::ROOT)
            .find(|&n| self.tree.element(n).and_then(|e| e.id()) == Some(id))
    }

    // === Focus ===

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    /// Move focus; refused for detached, hidden or inert elements
    pub fn focus(&mut self, id: NodeId) -> bool {
        let focusable = self.tree.is_element(id)
            && self.tree.is_connected(id)
            && !self.is_hidden(id)
            && !self.is_inert(id);
        if focusable {
            self.active_element = Some(id);
        } else {
            trace!(node = %id, "focus refused");
        }
        focusable
    }

    pub fn blur(&mut self) {
        self.active_element = None;
    }

    // === Events ===

    pub fn add_event_listener(
        &mut self,
        target: NodeId,
        event_type: EventType,
        listener: Listener,
    ) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.entry(target).or_default().push(ListenerEntry {
            id,
            event_type,
            listener,
        });
        id
    }

    pub fn remove_event_listener(&mut self, target: NodeId, id: ListenerId) -> bool {
        let Some(entries) = self.listeners.get_mut(&target) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.listeners.remove(&target);
        }
        removed
    }

    pub fn listener_count(&self, target: NodeId, event_type: EventType) -> usize {
        self.listeners
            .get(&target)
            .map_or(0, |entries| entries.iter().filter(|e| e.event_type == event_type).count())
    }

    fn is_registered(&self, target: NodeId, id: ListenerId) -> bool {
        self.listeners
            .get(&target)
            .is_some_and(|entries| entries.iter().any(|e| e.id == id))
    }

    /// Dispatch to the target, then its ancestors for bubbling events
    ///
    /// Returns false if a listener called `prevent_default`.
    pub fn dispatch_event(&mut self, mut event: Event) -> bool {
        let target = event.target();
        let mut path = vec![target];
        if event.bubbles() {
            path.extend(self.tree.ancestors(target));
        }
        trace!(event = %event.event_type(), target = %target, "dispatch");

        for node in path {
            event.set_current_target(node);
            let snapshot: Vec<(ListenerId, Listener)> = self
                .listeners
                .get(&node)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|e| e.event_type == event.event_type())
                        .map(|e| (e.id, Rc::clone(&e.listener)))
                        .collect()
                })
                .unwrap_or_default();

            for (id, listener) in snapshot {
                // removed by an earlier listener in this dispatch
                if !self.is_registered(node, id) {
                    continue;
                }
                if let Err(err) = listener(self, &mut event) {
                    error!(event = %event.event_type(), node = %node, "listener failed: {err:#}");
                }
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        !event.is_default_prevented()
    }

    /// Simulate a user click, including the native default action
    pub fn click(&mut self, target: NodeId) -> bool {
        let proceed = self.dispatch_event(Event::new(EventType::Click, target));
        if proceed {
            self.click_default_action(target);
        }
        proceed
    }

    /// Simulate a key press on the focused element (or body)
    pub fn key_down(&mut self, key: Key) -> bool {
        let target = self
            .active_element
            .filter(|&a| self.tree.is_connected(a))
            .unwrap_or(if self.body_element.is_valid() { self.body_element } else { NodeId::ROOT });
        let escape = key == Key::Escape;
        let proceed = self.dispatch_event(Event::key_down(target, key));
        if proceed && escape {
            self.escape_default_action();
        }
        proceed
    }

    /// Submit buttons in `<form method="dialog">` close their dialog
    fn click_default_action(&mut self, target: NodeId) {
        let tree = &self.tree;
        let Some(button) = std::iter::once(target).chain(tree.ancestors(target)).find(|&n| {
            tree.element(n).is_some_and(|e| {
                let kind = e.get_attr("type").unwrap_or("submit");
                (e.is("button") || e.is("input")) && kind.eq_ignore_ascii_case("submit")
            })
        }) else {
            return;
        };
        let Some(form) = tree.ancestors(button).find(|&n| {
            tree.element(n).is_some_and(|e| {
                e.is("form") && e.get_attr("method").is_some_and(|m| m.eq_ignore_ascii_case("dialog"))
            })
        }) else {
            return;
        };
        let Some(dialog) = tree
            .ancestors(form)
            .find(|&n| tree.element(n).is_some_and(|e| e.is("dialog")))
        else {
            return;
        };
        let value = self.attr(button, "value").map(str::to_string);
        if let Err(err) = self.close_dialog(dialog, value.as_deref()) {
            warn!(dialog = %dialog, "form close failed: {err}");
        }
    }

    /// Escape cancels the topmost modal dialog
    fn escape_default_action(&mut self) {
        let Some(&dialog) = self.top_layer.last() else {
            return;
        };
        if self.dispatch_event(Event::new(EventType::Cancel, dialog)) {
            if let Err(err) = self.close_dialog(dialog, None) {
                warn!(dialog = %dialog, "cancel failed: {err}");
            }
        }
    }

    // === Event loop ===

    pub fn now(&self) -> Duration {
        self.event_loop.now()
    }

    pub fn set_timeout(
        &mut self,
        delay: Duration,
        task: impl FnOnce(&mut Document) -> anyhow::Result<()> + 'static,
    ) -> TimerId {
        self.event_loop.schedule(delay, "timeout", Box::new(task))
    }

    /// Run `task` on the next turn of the loop
    pub fn request_animation_frame(
        &mut self,
        task: impl FnOnce(&mut Document) -> anyhow::Result<()> + 'static,
    ) -> TimerId {
        self.event_loop.schedule(Duration::ZERO, "animation-frame", Box::new(task))
    }

    pub(crate) fn queue_task(&mut self, label: &'static str, task: Task) -> TimerId {
        self.event_loop.schedule(Duration::ZERO, label, task)
    }

    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.event_loop.cancel(id)
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.event_loop.has_pending()
    }

    pub fn time_until_next(&self) -> Option<Duration> {
        self.event_loop.time_until_next()
    }

    /// Run every task due now, including ones queued while running
    pub fn run_until_idle(&mut self) -> usize {
        let now = self.event_loop.now();
        let mut ran = 0;
        while ran < MAX_TASKS_PER_TURN {
            let Some((_, label, task)) = self.event_loop.take_due(now) else {
                return ran;
            };
            self.run_task(label, task);
            ran += 1;
        }
        warn!(ran, "task limit reached, yielding");
        ran
    }

    /// Move the clock forward, running timers in deadline order
    pub fn advance(&mut self, by: Duration) -> usize {
        let deadline = self.event_loop.now() + by;
        let mut ran = 0;
        while ran < MAX_TASKS_PER_TURN {
            let Some((due, label, task)) = self.event_loop.take_due(deadline) else {
                break;
            };
            self.event_loop.set_now(due);
            self.run_task(label, task);
            ran += 1;
        }
        self.event_loop.set_now(deadline);
        ran
    }

    fn run_task(&mut self, label: &'static str, task: Task) {
        trace!(task = label, now = ?self.event_loop.now(), "run task");
        if let Err(err) = task(self) {
            error!(task = label, "task failed: {err:#}");
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.len())
            .field("ready_state", &self.ready_state)
            .field("active_element", &self.active_element)
            .field("top_layer", &self.top_layer)
            .field("event_loop", &self.event_loop)
            .finish()
    }
}
