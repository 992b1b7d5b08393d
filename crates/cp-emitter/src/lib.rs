//! copy-point Event Channel
//!
//! Typed publish/subscribe. An event is a marker type naming its payload, so
//! the compiler checks that emitters and subscribers agree on the shape.
//!
//! Handlers receive a mutable context (the document, for components) plus
//! the payload, and run synchronously in registration order.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use serde::Deserialize;
use tracing::{trace, warn};

/// Event marker
pub trait Event: 'static {
    type Payload: 'static;
    /// Name used in logs and error context
    const NAME: &'static str;
}

/// Subscribed callback; identity (for `off`) is the `Rc` allocation
pub type Handler<C, E> = Rc<dyn Fn(&mut C, &<E as Event>::Payload) -> anyhow::Result<()>>;

/// What `emit` does when a handler fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// Stop at the first error and return it
    #[default]
    FailFast,
    /// Log each error and keep dispatching
    Isolate,
}

struct Entry {
    id: u64,
    /// `Handler<C, E>` for the event type this entry is filed under
    handler: Box<dyn Any>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<TypeId, Vec<Entry>>,
}

impl Registry {
    fn remove_id(&mut self, event: TypeId, id: u64) -> bool {
        let Some(entries) = self.handlers.get_mut(&event) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        entries.remove(pos);
        true
    }
}

/// Event channel over context type `C`
///
/// Cloning shares the same subscriptions.
pub struct Emitter<C: 'static> {
    registry: Rc<RefCell<Registry>>,
    mode: Rc<Cell<DispatchMode>>,
    _context: PhantomData<fn(&mut C)>,
}

impl<C: 'static> Emitter<C> {
    pub fn new() -> Self {
        Self::with_mode(DispatchMode::default())
    }

    pub fn with_mode(mode: DispatchMode) -> Self {
        Self {
            registry: Rc::default(),
            mode: Rc::new(Cell::new(mode)),
            _context: PhantomData,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode.get()
    }

    pub fn set_mode(&self, mode: DispatchMode) {
        self.mode.set(mode);
    }

    fn register<E: Event>(&self, handler: Handler<C, E>) -> u64 {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Entry { id, handler: Box::new(handler) });
        id
    }

    /// Subscribe; registering the same handler twice makes it run twice
    pub fn on<E: Event>(&self, handler: Handler<C, E>) {
        self.register::<E>(handler);
    }

    /// Remove the first registration of `handler`; false if it was not subscribed
    pub fn off<E: Event>(&self, handler: &Handler<C, E>) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(entries) = registry.handlers.get_mut(&TypeId::of::<E>()) else {
            return false;
        };
        let pos = entries.iter().position(|e| {
            e.handler
                .downcast_ref::<Handler<C, E>>()
                .is_some_and(|h| Rc::ptr_eq(h, handler))
        });
        match pos {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Subscribe for a single emission
    ///
    /// Returns the registered wrapper, which can be passed to `off` to
    /// unsubscribe before it fires.
    pub fn once<E: Event>(&self, handler: Handler<C, E>) -> Handler<C, E> {
        let registry: Weak<RefCell<Registry>> = Rc::downgrade(&self.registry);
        let slot = Rc::new(Cell::new(0u64));
        let fired = Cell::new(false);
        let id = Rc::clone(&slot);
        let wrapper: Handler<C, E> = Rc::new(move |ctx: &mut C, payload: &E::Payload| {
            if fired.replace(true) {
                return Ok(());
            }
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().remove_id(TypeId::of::<E>(), id.get());
            }
            handler(ctx, payload)
        });
        slot.set(self.register::<E>(Rc::clone(&wrapper)));
        wrapper
    }

    /// Run every handler subscribed to `E`
    ///
    /// Handlers added or removed while emitting take effect from the next
    /// emission.
    pub fn emit<E: Event>(&self, ctx: &mut C, payload: &E::Payload) -> anyhow::Result<()> {
        let snapshot: Vec<Handler<C, E>> = self
            .registry
            .borrow()
            .handlers
            .get(&TypeId::of::<E>())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.handler.downcast_ref::<Handler<C, E>>().cloned())
                    .collect()
            })
            .unwrap_or_default();
        trace!(event = E::NAME, handlers = snapshot.len(), "emit");

        for handler in snapshot {
            if let Err(err) = handler(ctx, payload) {
                match self.mode() {
                    DispatchMode::FailFast => {
                        return Err(err.context(format!("`{}` handler failed", E::NAME)));
                    }
                    DispatchMode::Isolate => {
                        warn!(event = E::NAME, "handler failed: {err:#}");
                    }
                }
            }
        }
        Ok(())
    }

    pub fn listener_count<E: Event>(&self) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.registry.borrow_mut().handlers.clear();
    }
}

impl<C: 'static> Clone for Emitter<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
            mode: Rc::clone(&self.mode),
            _context: PhantomData,
        }
    }
}

impl<C: 'static> Default for Emitter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> std::fmt::Debug for Emitter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.borrow();
        let handlers: usize = registry.handlers.values().map(Vec::len).sum();
        f.debug_struct("Emitter")
            .field("mode", &self.mode.get())
            .field("handlers", &handlers)
            .finish()
    }
}
