#![forbid(unsafe_code)]

//! Tree node model.
//!
//! # Design
//!
//! [`VNode`] is a closed tagged union over the renderable kinds — text,
//! comment, fragment, element, component — dispatched by exhaustive match
//! in the diff engine, never by runtime shape sniffing. Children are a
//! three-way shape ([`Children`]): absent, a text run, or an ordered node
//! sequence.
//!
//! # Identity
//!
//! Two nodes are "the same identity" iff their discriminant matches (for
//! elements: same tag; for components: same component instance) AND their
//! keys match. A missing key compares equal only to a missing key. Identity
//! is never value-based: equal props or children do not make two nodes the
//! same.
//!
//! # Host handle
//!
//! Each node carries an interior-mutable slot for the host handle assigned
//! at mount time. Patching transfers the handle from the old node to the
//! new one, which is what lets the next diff compute anchors from the new
//! tree alone.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use trellis_reactive::Value;

use crate::host::HostHandle;

/// Sibling identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

/// Attribute/prop map with deterministic iteration order.
#[derive(Clone, Default, PartialEq)]
pub struct PropMap {
    entries: BTreeMap<Rc<str>, Value>,
}

impl PropMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PropMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// A renderable component: turns props into a subtree.
///
/// Lifecycle option normalization, state, and async loading live outside
/// this core; the diff engine only needs the render contract plus instance
/// identity (components match iff they are the same `Rc` instance).
pub trait Component {
    fn render(&self, props: &PropMap) -> VNode;
}

/// Children of an element: absent, one text run, or ordered nodes.
#[derive(Debug)]
pub enum Children {
    None,
    Text(Rc<str>),
    Nodes(Vec<VNode>),
}

/// The node kind discriminant with per-kind payload.
pub enum NodeKind {
    Text(Rc<str>),
    Comment(Rc<str>),
    Fragment(Vec<VNode>),
    Element {
        tag: Rc<str>,
        props: PropMap,
        children: Children,
    },
    Component {
        component: Rc<dyn Component>,
        props: PropMap,
        /// Rendered output, filled at mount and carried forward by patches.
        subtree: RefCell<Option<Box<VNode>>>,
    },
}

/// One node of the abstract render tree.
pub struct VNode {
    pub(crate) kind: NodeKind,
    pub(crate) key: Option<Key>,
    pub(crate) handle: Cell<Option<HostHandle>>,
}

impl VNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            key: None,
            handle: Cell::new(None),
        }
    }

    #[must_use]
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Self::new(NodeKind::Text(text.into()))
    }

    #[must_use]
    pub fn comment(text: impl Into<Rc<str>>) -> Self {
        Self::new(NodeKind::Comment(text.into()))
    }

    #[must_use]
    pub fn fragment(children: impl IntoIterator<Item = VNode>) -> Self {
        Self::new(NodeKind::Fragment(children.into_iter().collect()))
    }

    #[must_use]
    pub fn element(tag: impl Into<Rc<str>>) -> Self {
        Self::new(NodeKind::Element {
            tag: tag.into(),
            props: PropMap::new(),
            children: Children::None,
        })
    }

    #[must_use]
    pub fn component(component: Rc<dyn Component>, props: PropMap) -> Self {
        Self::new(NodeKind::Component {
            component,
            props,
            subtree: RefCell::new(None),
        })
    }

    /// Attach a sibling identity key.
    #[must_use]
    pub fn keyed(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set one attribute (elements only; a no-op on other kinds).
    #[must_use]
    pub fn prop(mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        if let NodeKind::Element { props, .. } = &mut self.kind {
            props.insert(key, value);
        }
        self
    }

    /// Set a text run as the element's children.
    #[must_use]
    pub fn text_children(mut self, text: impl Into<Rc<str>>) -> Self {
        if let NodeKind::Element { children, .. } = &mut self.kind {
            *children = Children::Text(text.into());
        }
        self
    }

    /// Set an ordered node sequence as the element's children.
    #[must_use]
    pub fn children(mut self, nodes: impl IntoIterator<Item = VNode>) -> Self {
        if let NodeKind::Element { children, .. } = &mut self.kind {
            *children = Children::Nodes(nodes.into_iter().collect());
        }
        self
    }

    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The host handle assigned at mount, if this node is mounted.
    #[must_use]
    pub fn handle(&self) -> Option<HostHandle> {
        self.handle.get()
    }

    /// `(tag, key)` identity per the reconciliation contract.
    #[must_use]
    pub fn same_identity(&self, other: &VNode) -> bool {
        if self.key != other.key {
            return false;
        }
        match (&self.kind, &other.kind) {
            (NodeKind::Text(_), NodeKind::Text(_)) => true,
            (NodeKind::Comment(_), NodeKind::Comment(_)) => true,
            (NodeKind::Fragment(_), NodeKind::Fragment(_)) => true,
            (NodeKind::Element { tag: a, .. }, NodeKind::Element { tag: b, .. }) => a == b,
            (
                NodeKind::Component { component: a, .. },
                NodeKind::Component { component: b, .. },
            ) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// First physical handle in this subtree, resolving through fragments
    /// and components. Used for anchor computation.
    #[must_use]
    pub fn first_handle(&self) -> Option<HostHandle> {
        match &self.kind {
            NodeKind::Fragment(children) => children.iter().find_map(VNode::first_handle),
            NodeKind::Component { subtree, .. } => {
                subtree.borrow().as_ref().and_then(|n| n.first_handle())
            }
            _ => self.handle.get(),
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        match &self.kind {
            NodeKind::Text(t) => s.field("text", t),
            NodeKind::Comment(t) => s.field("comment", t),
            NodeKind::Fragment(c) => s.field("fragment", &c.len()),
            NodeKind::Element { tag, .. } => s.field("element", tag),
            NodeKind::Component { .. } => s.field("component", &".."),
        };
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        s.finish()
    }
}
