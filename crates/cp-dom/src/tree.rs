//! DOM Tree (arena-based allocation)

use crate::{DomError, DomResult, ElementData, Node, NodeId};

/// Arena-based DOM tree
///
/// Index 0 is always the document node. Removed nodes stay in the arena,
/// detached, so ids are never reused.
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Element data or `NotAnElement`/`NotFound`
    pub fn try_element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        match self.nodes.get_mut(id.index()) {
            Some(node) => node.as_element_mut().ok_or(DomError::NotAnElement(id)),
            None => Err(DomError::NotFound(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node::comment(text))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Append `child` as last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.check_exists(parent)?;
        self.check_exists(child)?;
        if child == NodeId::ROOT || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, child: reference });
            }
            if reference == child {
                return Ok(());
            }
        }

        self.detach(child);

        let prev = match reference {
            Some(reference) => self.nodes[reference.index()].prev_sibling,
            None => self.nodes[parent.index()].last_child,
        };
        let next = reference.unwrap_or(NodeId::NONE);

        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }
        Ok(())
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Unlink a node from its parent and siblings; its subtree stays intact
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Whether `node` is `ancestor` or one of its descendants
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while current.is_valid() {
            if current == ancestor {
                return true;
            }
            current = match self.get(current) {
                Some(n) => n.parent,
                None => return false,
            };
        }
        false
    }

    /// Whether the node is attached to the document
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(NodeId::ROOT, id)
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Preorder (document order) traversal, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.get(id).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Parent chain, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id).unwrap_or(NodeId::NONE),
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }

    fn check_exists(&self, id: NodeId) -> DomResult<()> {
        if self.get(id).is_some() {
            Ok(())
        } else {
            Err(DomError::NotFound(id))
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next;
        let node = self.tree.get(current)?;
        self.next = node.next_sibling;
        Some(current)
    }
}

pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next;
        let node = self.tree.get(current)?;

        self.next = if node.first_child.is_valid() {
            node.first_child
        } else {
            let mut cursor = current;
            loop {
                if cursor == self.root {
                    break NodeId::NONE;
                }
                let Some(n) = self.tree.get(cursor) else {
                    break NodeId::NONE;
                };
                if n.next_sibling.is_valid() {
                    break n.next_sibling;
                }
                cursor = n.parent;
                if !cursor.is_valid() || cursor == self.root {
                    break NodeId::NONE;
                }
            }
        };
        Some(current)
    }
}

pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next;
        let node = self.tree.get(current)?;
        self.next = node.parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, [NodeId; 3]) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_element("p");
        let b = tree.create_element("p");
        let c = tree.create_element("p");
        tree.append_child(tree.root(), div).unwrap();
        for child in [a, b, c] {
            tree.append_child(div, child).unwrap();
        }
        (tree, div, [a, b, c])
    }

    #[test]
    fn test_sibling_chain() {
        let (tree, div, [a, b, c]) = sample();
        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(tree.get(b).unwrap().prev_sibling, a);
        assert_eq!(tree.get(div).unwrap().last_child, c);
    }

    #[test]
    fn test_insert_before_and_remove() {
        let (mut tree, div, [a, b, c]) = sample();
        let d = tree.create_element("span");
        tree.insert_before(div, d, Some(b)).unwrap();
        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![a, d, b, c]);

        tree.remove_child(div, a).unwrap();
        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![d, b, c]);
        assert!(!tree.is_connected(a));
        assert_eq!(
            tree.remove_child(div, a),
            Err(DomError::NotAChild { parent: div, child: a })
        );
    }

    #[test]
    fn test_hierarchy_request() {
        let (mut tree, div, [a, ..]) = sample();
        assert!(matches!(
            tree.append_child(a, div),
            Err(DomError::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn test_descendants_document_order() {
        let (mut tree, div, [a, b, c]) = sample();
        let inner = tree.create_element("em");
        tree.append_child(a, inner).unwrap();
        let text = tree.create_text("hi");
        tree.append_child(inner, text).unwrap();

        let order: Vec<_> = tree.descendants(div).collect();
        assert_eq!(order, vec![a, inner, text, b, c]);

        // subtree traversal stops at the subtree root
        assert_eq!(tree.descendants(a).collect::<Vec<_>>(), vec![inner, text]);
        assert_eq!(tree.text_content(div), "hi");
    }

    #[test]
    fn test_ancestors_and_contains() {
        let (tree, div, [a, ..]) = sample();
        assert_eq!(tree.ancestors(a).collect::<Vec<_>>(), vec![div, NodeId::ROOT]);
        assert!(tree.contains(div, a));
        assert!(tree.contains(a, a));
        assert!(!tree.contains(a, div));
    }
}
