//! Per-node instance registry
//!
//! Component objects are attached to the element they enhance, keyed by
//! `(component type, node)`. One slot per type per node. Components that
//! hold state outside their own subtree attach through
//! [`Document::attach_component`] so removing the element tears them down.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use crate::{Document, NodeId};

/// Cleanup run by [`Document::remove_node`] for instances inside the
/// removed subtree, before their listeners and slots are dropped
pub trait Teardown: Any {
    fn teardown(&self, doc: &mut Document) -> anyhow::Result<()>;
}

type TeardownFn = Rc<dyn Fn(&mut Document) -> anyhow::Result<()>>;

struct Slot {
    instance: Rc<dyn Any>,
    teardown: Option<TeardownFn>,
}

#[derive(Default)]
pub(crate) struct InstanceRegistry {
    slots: HashMap<(TypeId, NodeId), Slot>,
}

impl InstanceRegistry {
    /// Teardown hooks of instances attached to `nodes`, in `nodes` order
    pub fn teardowns(&self, nodes: &[NodeId]) -> Vec<(NodeId, TeardownFn)> {
        let mut hooks: Vec<(NodeId, TeardownFn)> = self
            .slots
            .iter()
            .filter(|((_, node), _)| nodes.contains(node))
            .filter_map(|((_, node), slot)| slot.teardown.clone().map(|hook| (*node, hook)))
            .collect();
        hooks.sort_by_key(|(node, _)| nodes.iter().position(|n| n == node));
        hooks
    }

    /// Drop every instance attached to one of `nodes`
    pub fn purge(&mut self, nodes: &[NodeId]) -> usize {
        let before = self.slots.len();
        self.slots.retain(|(_, node), _| !nodes.contains(node));
        before - self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    fn insert(&mut self, key: (TypeId, NodeId), slot: Slot) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        self.slots.insert(key, slot);
        true
    }
}

impl Document {
    /// Attach `instance` to `node`
    ///
    /// Returns false (and keeps the existing instance) when the slot is taken.
    pub fn attach_instance<T: Any>(&mut self, node: NodeId, instance: Rc<T>) -> bool {
        let slot = Slot {
            instance,
            teardown: None,
        };
        self.instances.insert((TypeId::of::<T>(), node), slot)
    }

    /// Like [`attach_instance`](Self::attach_instance), and runs
    /// [`Teardown::teardown`] when `node` leaves the document
    pub fn attach_component<T: Teardown>(&mut self, node: NodeId, instance: Rc<T>) -> bool {
        let hook = Rc::clone(&instance);
        let slot = Slot {
            instance,
            teardown: Some(Rc::new(move |doc: &mut Document| hook.teardown(doc))),
        };
        self.instances.insert((TypeId::of::<T>(), node), slot)
    }

    /// Instance of `T` attached to `node`
    pub fn instance<T: Any>(&self, node: NodeId) -> Option<Rc<T>> {
        let slot = self.instances.slots.get(&(TypeId::of::<T>(), node))?;
        Rc::clone(&slot.instance).downcast::<T>().ok()
    }

    pub fn detach_instance<T: Any>(&mut self, node: NodeId) -> Option<Rc<T>> {
        let slot = self.instances.slots.remove(&(TypeId::of::<T>(), node))?;
        slot.instance.downcast::<T>().ok()
    }

    /// All instances of `T`, in document order
    pub fn instances_of<T: Any>(&self) -> Vec<(NodeId, Rc<T>)> {
        let root = self.root();
        std::iter::once(root)
            .chain(self.tree().descendants(root))
            .filter_map(|node| self.instance::<T>(node).map(|i| (node, i)))
            .collect()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}
