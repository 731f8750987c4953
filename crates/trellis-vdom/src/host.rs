#![forbid(unsafe_code)]

//! Host operation abstraction.
//!
//! The diff engine never touches a concrete UI toolkit: it emits the small
//! operation set of the [`Host`] trait against opaque arena handles. A real
//! binding (browser DOM, terminal, native) implements `Host`;
//! [`RecordingHost`] is the in-memory reference implementation used by the
//! test suites — it maintains a real child-list arena *and* an operation
//! log, so tests can assert both the final tree shape and the exact number
//! of physical operations a diff produced.

use std::collections::BTreeMap;
use std::rc::Rc;

use trellis_reactive::Value;

/// Opaque handle to one physical node, an index into the host's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostHandle(pub u64);

/// The physical operations the diff engine is allowed to perform.
pub trait Host {
    fn create_element(&mut self, tag: &str) -> HostHandle;
    fn create_text(&mut self, text: &str) -> HostHandle;
    fn create_comment(&mut self, text: &str) -> HostHandle;
    /// Insert `node` into `parent` before `anchor`, or append when `anchor`
    /// is `None`. Inserting an already-attached node moves it.
    fn insert(&mut self, node: HostHandle, parent: HostHandle, anchor: Option<HostHandle>);
    /// Detach `node` from its parent.
    fn remove(&mut self, node: HostHandle);
    /// Replace the textual content of `node`. On an element this clears its
    /// children (the "clear, then mount fresh" path relies on it).
    fn set_text(&mut self, node: HostHandle, text: &str);
    /// Apply one attribute change; `new = None` removes the attribute.
    fn patch_attribute(
        &mut self,
        node: HostHandle,
        key: &str,
        old: Option<&Value>,
        new: Option<&Value>,
    );
}

/// One logged physical operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    CreateElement { node: HostHandle, tag: Rc<str> },
    CreateText { node: HostHandle },
    CreateComment { node: HostHandle },
    /// `moved` is true when the node was already attached somewhere.
    Insert { node: HostHandle, parent: HostHandle, moved: bool },
    Remove { node: HostHandle },
    SetText { node: HostHandle, text: Rc<str> },
    SetAttribute { node: HostHandle, key: Rc<str> },
    RemoveAttribute { node: HostHandle, key: Rc<str> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArenaKind {
    Element(Rc<str>),
    Text,
    Comment,
}

#[derive(Debug)]
struct ArenaNode {
    kind: ArenaKind,
    text: String,
    attrs: BTreeMap<Rc<str>, Value>,
    children: Vec<HostHandle>,
    parent: Option<HostHandle>,
}

/// In-memory host backend with operation recording.
#[derive(Default)]
pub struct RecordingHost {
    nodes: Vec<ArenaNode>,
    ops: Vec<HostOp>,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element to serve as a mount point.
    pub fn create_root(&mut self) -> HostHandle {
        let root = self.alloc(ArenaKind::Element(Rc::from("root")));
        self.ops.pop(); // the root is scaffolding, not a diff-issued op
        root
    }

    fn alloc(&mut self, kind: ArenaKind) -> HostHandle {
        let handle = HostHandle(self.nodes.len() as u64);
        let op = match &kind {
            ArenaKind::Element(tag) => HostOp::CreateElement {
                node: handle,
                tag: Rc::clone(tag),
            },
            ArenaKind::Text => HostOp::CreateText { node: handle },
            ArenaKind::Comment => HostOp::CreateComment { node: handle },
        };
        self.nodes.push(ArenaNode {
            kind,
            text: String::new(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
        });
        self.ops.push(op);
        handle
    }

    fn node(&self, handle: HostHandle) -> &ArenaNode {
        &self.nodes[handle.0 as usize]
    }

    fn node_mut(&mut self, handle: HostHandle) -> &mut ArenaNode {
        &mut self.nodes[handle.0 as usize]
    }

    fn detach(&mut self, node: HostHandle) {
        if let Some(parent) = self.node(node).parent {
            self.node_mut(parent).children.retain(|&c| c != node);
            self.node_mut(node).parent = None;
        }
    }

    /// All operations issued so far.
    #[must_use]
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Drain the log; subsequent assertions see only newer operations.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    /// Child handles of `parent`, in order.
    #[must_use]
    pub fn children_of(&self, parent: HostHandle) -> Vec<HostHandle> {
        self.node(parent).children.clone()
    }

    /// Rendered label of one node: the tag for elements, the text for
    /// text/comment nodes. Convenience for order assertions.
    #[must_use]
    pub fn label_of(&self, handle: HostHandle) -> String {
        let node = self.node(handle);
        match &node.kind {
            ArenaKind::Element(tag) => tag.to_string(),
            ArenaKind::Text | ArenaKind::Comment => node.text.clone(),
        }
    }

    /// Labels of the children of `parent`, in order.
    #[must_use]
    pub fn child_labels(&self, parent: HostHandle) -> Vec<String> {
        self.node(parent)
            .children
            .iter()
            .map(|&c| self.label_of(c))
            .collect()
    }

    #[must_use]
    pub fn text_of(&self, handle: HostHandle) -> String {
        self.node(handle).text.clone()
    }

    #[must_use]
    pub fn attr_of(&self, handle: HostHandle, key: &str) -> Option<Value> {
        self.node(handle).attrs.get(key).cloned()
    }

    #[must_use]
    pub fn is_attached(&self, handle: HostHandle) -> bool {
        self.node(handle).parent.is_some()
    }
}

impl Host for RecordingHost {
    fn create_element(&mut self, tag: &str) -> HostHandle {
        self.alloc(ArenaKind::Element(Rc::from(tag)))
    }

    fn create_text(&mut self, text: &str) -> HostHandle {
        let handle = self.alloc(ArenaKind::Text);
        self.node_mut(handle).text = text.to_string();
        handle
    }

    fn create_comment(&mut self, text: &str) -> HostHandle {
        let handle = self.alloc(ArenaKind::Comment);
        self.node_mut(handle).text = text.to_string();
        handle
    }

    fn insert(&mut self, node: HostHandle, parent: HostHandle, anchor: Option<HostHandle>) {
        let moved = self.node(node).parent.is_some();
        self.detach(node);
        let position = match anchor {
            Some(a) => self
                .node(parent)
                .children
                .iter()
                .position(|&c| c == a)
                .unwrap_or(self.node(parent).children.len()),
            None => self.node(parent).children.len(),
        };
        self.node_mut(parent).children.insert(position, node);
        self.node_mut(node).parent = Some(parent);
        self.ops.push(HostOp::Insert {
            node,
            parent,
            moved,
        });
    }

    fn remove(&mut self, node: HostHandle) {
        self.detach(node);
        self.ops.push(HostOp::Remove { node });
    }

    fn set_text(&mut self, node: HostHandle, text: &str) {
        let children = std::mem::take(&mut self.node_mut(node).children);
        for child in children {
            self.node_mut(child).parent = None;
        }
        self.node_mut(node).text = text.to_string();
        self.ops.push(HostOp::SetText {
            node,
            text: Rc::from(text),
        });
    }

    fn patch_attribute(
        &mut self,
        node: HostHandle,
        key: &str,
        _old: Option<&Value>,
        new: Option<&Value>,
    ) {
        let key: Rc<str> = Rc::from(key);
        match new {
            Some(value) => {
                self.node_mut(node)
                    .attrs
                    .insert(Rc::clone(&key), value.clone());
                self.ops.push(HostOp::SetAttribute { node, key });
            }
            None => {
                self.node_mut(node).attrs.remove(&key);
                self.ops.push(HostOp::RemoveAttribute { node, key });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_with_anchor_orders_children() {
        let mut host = RecordingHost::new();
        let root = host.create_root();
        let a = host.create_text("a");
        let b = host.create_text("b");
        let c = host.create_text("c");
        host.insert(a, root, None);
        host.insert(c, root, None);
        host.insert(b, root, Some(c));
        assert_eq!(host.child_labels(root), vec!["a", "b", "c"]);
    }

    #[test]
    fn reinsert_moves_instead_of_duplicating() {
        let mut host = RecordingHost::new();
        let root = host.create_root();
        let a = host.create_text("a");
        let b = host.create_text("b");
        host.insert(a, root, None);
        host.insert(b, root, None);
        host.insert(a, root, None); // move to the end
        assert_eq!(host.child_labels(root), vec!["b", "a"]);
        let moves = host
            .ops()
            .iter()
            .filter(|op| matches!(op, HostOp::Insert { moved: true, .. }))
            .count();
        assert_eq!(moves, 1);
    }

    #[test]
    fn set_text_clears_children() {
        let mut host = RecordingHost::new();
        let root = host.create_root();
        let a = host.create_text("a");
        host.insert(a, root, None);
        host.set_text(root, "plain");
        assert!(host.children_of(root).is_empty());
        assert!(!host.is_attached(a));
        assert_eq!(host.text_of(root), "plain");
    }

    #[test]
    fn attribute_roundtrip() {
        let mut host = RecordingHost::new();
        let el = host.create_element("div");
        host.patch_attribute(el, "class", None, Some(&Value::from("x")));
        assert_eq!(host.attr_of(el, "class"), Some(Value::from("x")));
        host.patch_attribute(el, "class", Some(&Value::from("x")), None);
        assert_eq!(host.attr_of(el, "class"), None);
    }
}
