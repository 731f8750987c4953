#![forbid(unsafe_code)]

//! The diff/patch engine.
//!
//! # Entry contract
//!
//! `patch(old, new, container, anchor)`: if `old` exists and is not the
//! same identity as `new`, the old subtree is unconditionally unmounted and
//! the engine proceeds as a fresh mount. Dispatch is by node kind: text and
//! comment nodes update content in place through the transferred host
//! handle; fragments recurse into children with no physical wrapper;
//! elements diff attributes key-by-key and then children; components reuse
//! their rendered subtree, re-rendering only when props changed.
//!
//! # Keyed children
//!
//! The two-ended "sandwich" walk consumes identical front and back runs,
//! then reconciles the middle with one general algorithm: build a
//! `key → new position` index (first match wins; duplicates are reported),
//! walk the remaining old nodes patching matches and unmounting the rest,
//! and drive mounts and moves from the back using the longest increasing
//! subsequence of recorded old positions. Nodes in the LIS are already in
//! relative order and are never physically moved, so a middle of size M
//! issues exactly `M − LIS` moves.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Duplicate key in one new sibling list | `warn!`, first match wins |
//! | Old node missing its host handle | debug assert; subtree skipped |
//! | Identity mismatch at the root | old unmounted, new mounted fresh |

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use tracing::warn;

use crate::host::{Host, HostHandle};
use crate::lis::longest_increasing_subsequence;
use crate::node::{Children, Key, NodeKind, VNode};

/// Diff engine over a mutably borrowed host.
pub struct Patcher<'h, H: Host> {
    host: &'h mut H,
}

impl<'h, H: Host> Patcher<'h, H> {
    pub fn new(host: &'h mut H) -> Self {
        Self { host }
    }

    /// Root-level convenience: diff two optional trees in `container`.
    pub fn render(&mut self, prev: Option<&VNode>, next: Option<&VNode>, container: HostHandle) {
        match (prev, next) {
            (_, Some(next)) => self.patch(prev, next, container, None),
            (Some(prev), None) => self.unmount(prev),
            (None, None) => {}
        }
    }

    /// Transform the subtree previously rendered as `old` into `new`.
    pub fn patch(
        &mut self,
        mut old: Option<&VNode>,
        new: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
    ) {
        if let Some(o) = old {
            if !o.same_identity(new) {
                self.unmount(o);
                old = None;
            }
        }
        match &new.kind {
            NodeKind::Text(text) => match old {
                None => {
                    let handle = self.host.create_text(text);
                    new.handle.set(Some(handle));
                    self.host.insert(handle, container, anchor);
                }
                Some(o) => self.patch_leaf_content(o, new, text),
            },
            NodeKind::Comment(text) => match old {
                None => {
                    let handle = self.host.create_comment(text);
                    new.handle.set(Some(handle));
                    self.host.insert(handle, container, anchor);
                }
                Some(o) => self.patch_leaf_content(o, new, text),
            },
            NodeKind::Fragment(children) => match old {
                None => {
                    for child in children {
                        self.patch(None, child, container, anchor);
                    }
                }
                Some(o) => {
                    let NodeKind::Fragment(old_children) = &o.kind else {
                        debug_assert!(false, "identity match with differing kinds");
                        return;
                    };
                    self.patch_sequences(old_children, children, container, anchor);
                }
            },
            NodeKind::Element { .. } => match old {
                None => self.mount_element(new, container, anchor),
                Some(o) => self.patch_element(o, new),
            },
            NodeKind::Component { .. } => match old {
                None => self.mount_component(new, container, anchor),
                Some(o) => self.patch_component(o, new, container, anchor),
            },
        }
    }

    /// Detach the physical nodes of a subtree. Fragments and components
    /// have no wrapper of their own, so unmounting recurses to their
    /// rendered content.
    pub fn unmount(&mut self, node: &VNode) {
        match &node.kind {
            NodeKind::Fragment(children) => {
                for child in children {
                    self.unmount(child);
                }
            }
            NodeKind::Component { subtree, .. } => {
                if let Some(rendered) = subtree.borrow().as_ref() {
                    self.unmount(rendered);
                }
            }
            _ => {
                if let Some(handle) = node.handle.get() {
                    self.host.remove(handle);
                }
            }
        }
    }

    /// Text/comment in-place update: transfer the handle, rewrite content
    /// only when it changed.
    fn patch_leaf_content(&mut self, old: &VNode, new: &VNode, text: &str) {
        let handle = old.handle.get();
        debug_assert!(handle.is_some(), "patching an unmounted leaf");
        new.handle.set(handle);
        let old_text = match &old.kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => Some(t),
            _ => None,
        };
        if let (Some(handle), Some(old_text)) = (handle, old_text) {
            if &**old_text != text {
                self.host.set_text(handle, text);
            }
        }
    }

    fn mount_element(&mut self, node: &VNode, container: HostHandle, anchor: Option<HostHandle>) {
        let NodeKind::Element {
            tag,
            props,
            children,
        } = &node.kind
        else {
            debug_assert!(false, "mount_element on a non-element");
            return;
        };
        let handle = self.host.create_element(tag);
        node.handle.set(Some(handle));
        match children {
            Children::Text(text) => self.host.set_text(handle, text),
            Children::Nodes(nodes) => {
                for child in nodes {
                    self.patch(None, child, handle, None);
                }
            }
            Children::None => {}
        }
        for (key, value) in props.iter() {
            self.host.patch_attribute(handle, key, None, Some(value));
        }
        self.host.insert(handle, container, anchor);
    }

    fn patch_element(&mut self, old: &VNode, new: &VNode) {
        let (
            NodeKind::Element {
                props: old_props,
                children: old_children,
                ..
            },
            NodeKind::Element {
                props: new_props,
                children: new_children,
                ..
            },
        ) = (&old.kind, &new.kind)
        else {
            debug_assert!(false, "identity match with differing kinds");
            return;
        };
        let Some(handle) = old.handle.get() else {
            debug_assert!(false, "patching an unmounted element");
            return;
        };
        new.handle.set(Some(handle));

        // Changed and added attributes.
        for (key, value) in new_props.iter() {
            let prev = old_props.get(key);
            if prev != Some(value) {
                self.host.patch_attribute(handle, key, prev, Some(value));
            }
        }
        // Attributes absent from the new set are removed.
        for (key, value) in old_props.iter() {
            if !new_props.contains(key) {
                self.host.patch_attribute(handle, key, Some(value), None);
            }
        }

        self.patch_children(old_children, new_children, handle);
    }

    fn mount_component(&mut self, node: &VNode, container: HostHandle, anchor: Option<HostHandle>) {
        let NodeKind::Component {
            component,
            props,
            subtree,
        } = &node.kind
        else {
            debug_assert!(false, "mount_component on a non-component");
            return;
        };
        let rendered = component.render(props);
        self.patch(None, &rendered, container, anchor);
        *subtree.borrow_mut() = Some(Box::new(rendered));
    }

    fn patch_component(
        &mut self,
        old: &VNode,
        new: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
    ) {
        let (
            NodeKind::Component {
                props: old_props,
                subtree: old_subtree,
                ..
            },
            NodeKind::Component {
                component,
                props: new_props,
                subtree: new_subtree,
            },
        ) = (&old.kind, &new.kind)
        else {
            debug_assert!(false, "identity match with differing kinds");
            return;
        };
        let Some(prev) = old_subtree.borrow_mut().take() else {
            debug_assert!(false, "patching an unmounted component");
            return;
        };
        if new_props == old_props {
            // Unchanged props: carry the rendered subtree forward untouched.
            *new_subtree.borrow_mut() = Some(prev);
            return;
        }
        let rendered = component.render(new_props);
        self.patch(Some(&prev), &rendered, container, anchor);
        *new_subtree.borrow_mut() = Some(Box::new(rendered));
    }

    /// Children diff by shape of old/new.
    fn patch_children(&mut self, old: &Children, new: &Children, container: HostHandle) {
        match new {
            Children::Text(text) => {
                if let Children::Nodes(old_nodes) = old {
                    for node in old_nodes {
                        self.unmount(node);
                    }
                }
                let same_text = matches!(old, Children::Text(t) if t == text);
                if !same_text {
                    self.host.set_text(container, text);
                }
            }
            Children::Nodes(new_nodes) => match old {
                Children::Nodes(old_nodes) => {
                    self.patch_sequences(old_nodes, new_nodes, container, None);
                }
                other => {
                    if matches!(other, Children::Text(_)) {
                        self.host.set_text(container, "");
                    }
                    for node in new_nodes {
                        self.patch(None, node, container, None);
                    }
                }
            },
            Children::None => match old {
                Children::Nodes(old_nodes) => {
                    for node in old_nodes {
                        self.unmount(node);
                    }
                }
                Children::Text(_) => self.host.set_text(container, ""),
                Children::None => {}
            },
        }
    }

    /// Diff two sibling sequences, choosing keyed or positional strategy.
    fn patch_sequences(
        &mut self,
        old: &[VNode],
        new: &[VNode],
        container: HostHandle,
        anchor: Option<HostHandle>,
    ) {
        let keyed = new.first().is_some_and(|n| n.key.is_some());
        if keyed {
            self.patch_keyed(old, new, container, anchor);
        } else {
            self.patch_unkeyed(old, new, container, anchor);
        }
    }

    /// Positional diff: patch the overlap, mount or unmount the tail.
    fn patch_unkeyed(
        &mut self,
        old: &[VNode],
        new: &[VNode],
        container: HostHandle,
        anchor: Option<HostHandle>,
    ) {
        let overlap = old.len().min(new.len());
        for i in 0..overlap {
            if old[i].same_identity(&new[i]) {
                self.patch(Some(&old[i]), &new[i], container, None);
            } else {
                // Replacement: the fresh mount must land where the outgoing
                // node stood, so anchor on the next surviving sibling.
                let next = old[i + 1..]
                    .iter()
                    .find_map(VNode::first_handle)
                    .or(anchor);
                self.patch(Some(&old[i]), &new[i], container, next);
            }
        }
        if new.len() > overlap {
            for node in &new[overlap..] {
                self.patch(None, node, container, anchor);
            }
        } else {
            for node in &old[overlap..] {
                self.unmount(node);
            }
        }
    }

    /// Two-ended keyed diff with LIS-driven moves.
    fn patch_keyed(
        &mut self,
        old: &[VNode],
        new: &[VNode],
        container: HostHandle,
        anchor: Option<HostHandle>,
    ) {
        report_duplicate_keys(new);

        // (a) identical front run.
        let mut front = 0usize;
        while front < old.len()
            && front < new.len()
            && old[front].same_identity(&new[front])
        {
            self.patch(Some(&old[front]), &new[front], container, None);
            front += 1;
        }

        // (b) identical back run. Bounds are exclusive ends.
        let mut old_end = old.len();
        let mut new_end = new.len();
        while old_end > front
            && new_end > front
            && old[old_end - 1].same_identity(&new[new_end - 1])
        {
            self.patch(Some(&old[old_end - 1]), &new[new_end - 1], container, None);
            old_end -= 1;
            new_end -= 1;
        }

        match (front == old_end, front == new_end) {
            // Fully consumed on both sides.
            (true, true) => {}
            // (c) only new nodes remain: mount before the first back-run node
            // that owns a physical handle (an empty fragment owns none).
            (true, false) => {
                let anchor = new[new_end..]
                    .iter()
                    .find_map(VNode::first_handle)
                    .or(anchor);
                for node in &new[front..new_end] {
                    self.patch(None, node, container, anchor);
                }
            }
            // (c) only old nodes remain: unmount them.
            (false, true) => {
                for node in &old[front..old_end] {
                    self.unmount(node);
                }
            }
            // (d) both sides have a middle range.
            (false, false) => {
                self.patch_keyed_middle(old, new, container, anchor, front, old_end, new_end);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn patch_keyed_middle(
        &mut self,
        old: &[VNode],
        new: &[VNode],
        container: HostHandle,
        anchor: Option<HostHandle>,
        front: usize,
        old_end: usize,
        new_end: usize,
    ) {
        let count = new_end - front;
        // source[i] = old position of the node now at new position front+i,
        // None for slots that will be freshly mounted.
        let mut source: SmallVec<[Option<usize>; 16]> = SmallVec::from_elem(None, count);

        // key → new position, first match wins.
        let mut key_index: HashMap<&Key, usize> = HashMap::with_capacity(count);
        for (offset, node) in new[front..new_end].iter().enumerate() {
            if let Some(key) = &node.key {
                key_index.entry(key).or_insert(front + offset);
            }
        }

        let mut patched = 0usize;
        for (offset, old_node) in old[front..old_end].iter().enumerate() {
            if patched >= count {
                // Every new slot is already matched; the rest of the old
                // range has nowhere to go.
                self.unmount(old_node);
                continue;
            }
            let target = old_node
                .key
                .as_ref()
                .and_then(|key| key_index.get(key))
                .copied()
                .filter(|&pos| source[pos - front].is_none())
                .filter(|&pos| old_node.same_identity(&new[pos]));
            match target {
                Some(pos) => {
                    self.patch(Some(old_node), &new[pos], container, None);
                    source[pos - front] = Some(front + offset);
                    patched += 1;
                }
                None => self.unmount(old_node),
            }
        }

        // Mounts and moves, driven from the back so each node's successor
        // already has its final handle.
        let seq = longest_increasing_subsequence(&source);
        let mut s = seq.len();
        for i in (0..count).rev() {
            let pos = front + i;
            // Successors to the right are already placed; skip any without a
            // physical handle (empty fragments) when resolving the anchor.
            let anchor = new[pos + 1..]
                .iter()
                .find_map(VNode::first_handle)
                .or(anchor);
            match source[i] {
                None => self.patch(None, &new[pos], container, anchor),
                Some(_) => {
                    if s > 0 && seq[s - 1] == i {
                        // Member of the LIS: already in relative order.
                        s -= 1;
                    } else {
                        self.move_node(&new[pos], container, anchor);
                    }
                }
            }
        }
    }

    /// Physically relocate an already-patched subtree. Fragments and
    /// components relocate their rendered content node by node.
    fn move_node(&mut self, node: &VNode, container: HostHandle, anchor: Option<HostHandle>) {
        match &node.kind {
            NodeKind::Fragment(children) => {
                for child in children {
                    self.move_node(child, container, anchor);
                }
            }
            NodeKind::Component { subtree, .. } => {
                if let Some(rendered) = subtree.borrow().as_ref() {
                    self.move_node(rendered, container, anchor);
                }
            }
            _ => {
                if let Some(handle) = node.handle.get() {
                    self.host.insert(handle, container, anchor);
                }
            }
        }
    }
}

fn report_duplicate_keys(nodes: &[VNode]) {
    let mut seen: HashSet<&Key> = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if let Some(key) = &node.key {
            if !seen.insert(key) {
                warn!(?key, "duplicate key in sibling list, first match wins");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use trellis_reactive::Value;

    use super::*;
    use crate::host::{HostOp, RecordingHost};
    use crate::node::{Component, PropMap};

    fn keyed_list(keys: &[&str]) -> VNode {
        VNode::element("ul").children(
            keys.iter()
                .map(|&k| VNode::element("li").keyed(k).text_children(k)),
        )
    }

    fn plain_list(labels: &[&str]) -> VNode {
        VNode::element("ul")
            .children(labels.iter().map(|&l| VNode::element("li").text_children(l)))
    }

    fn mount(host: &mut RecordingHost, node: &VNode) -> HostHandle {
        let root = host.create_root();
        Patcher::new(host).patch(None, node, root, None);
        root
    }

    fn count_ops(ops: &[HostOp], pred: impl Fn(&HostOp) -> bool) -> usize {
        ops.iter().filter(|op| pred(op)).count()
    }

    fn moves(ops: &[HostOp]) -> usize {
        count_ops(ops, |op| matches!(op, HostOp::Insert { moved: true, .. }))
    }

    fn creates(ops: &[HostOp]) -> usize {
        count_ops(ops, |op| {
            matches!(
                op,
                HostOp::CreateElement { .. } | HostOp::CreateText { .. } | HostOp::CreateComment { .. }
            )
        })
    }

    fn removes(ops: &[HostOp]) -> usize {
        count_ops(ops, |op| matches!(op, HostOp::Remove { .. }))
    }

    #[test]
    fn mount_builds_the_whole_tree() {
        let mut host = RecordingHost::new();
        let tree = VNode::element("div")
            .prop("class", "card")
            .children([VNode::text("hello"), VNode::element("hr")]);
        let root = mount(&mut host, &tree);
        assert_eq!(host.child_labels(root), vec!["div"]);
        let div = tree.handle().unwrap();
        assert_eq!(host.child_labels(div), vec!["hello", "hr"]);
        assert_eq!(host.attr_of(div, "class"), Some(Value::from("card")));
    }

    #[test]
    fn text_updates_in_place() {
        let mut host = RecordingHost::new();
        let old = VNode::text("before");
        let root = mount(&mut host, &old);
        host.take_ops();

        let new = VNode::text("after");
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        assert_eq!(creates(host.ops()), 0);
        assert_eq!(new.handle(), old.handle());
        assert_eq!(host.text_of(new.handle().unwrap()), "after");
    }

    #[test]
    fn identity_mismatch_replaces_the_subtree() {
        let mut host = RecordingHost::new();
        let old = VNode::element("div").text_children("x");
        let root = mount(&mut host, &old);

        let new = VNode::element("span").text_children("x");
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        assert!(!host.is_attached(old.handle().unwrap()));
        assert_eq!(host.child_labels(root), vec!["span"]);
    }

    #[test]
    fn attribute_diff_is_minimal() {
        let mut host = RecordingHost::new();
        let old = VNode::element("div")
            .prop("id", "a")
            .prop("class", "x")
            .prop("hidden", true);
        let root = mount(&mut host, &old);
        host.take_ops();

        // `id` unchanged, `class` rewritten, `hidden` dropped, `title` added.
        let new = VNode::element("div")
            .prop("id", "a")
            .prop("class", "y")
            .prop("title", "t");
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let ops = host.take_ops();
        assert_eq!(
            count_ops(&ops, |op| matches!(op, HostOp::SetAttribute { .. })),
            2
        );
        assert_eq!(
            count_ops(&ops, |op| matches!(op, HostOp::RemoveAttribute { .. })),
            1
        );
        let div = new.handle().unwrap();
        assert_eq!(host.attr_of(div, "class"), Some(Value::from("y")));
        assert_eq!(host.attr_of(div, "hidden"), None);
    }

    #[test]
    fn unkeyed_shrink_unmounts_the_tail() {
        let mut host = RecordingHost::new();
        let old = plain_list(&["a", "b", "c", "d", "e"]);
        let root = mount(&mut host, &old);
        host.take_ops();

        let new = plain_list(&["a", "b", "c"]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let ops = host.take_ops();
        assert_eq!(removes(&ops), 2);
        assert_eq!(creates(&ops), 0);
        assert_eq!(host.child_labels(new.handle().unwrap()), vec!["li"; 3]);
    }

    #[test]
    fn unkeyed_grow_mounts_the_tail() {
        let mut host = RecordingHost::new();
        let old = plain_list(&["a", "b", "c"]);
        let root = mount(&mut host, &old);
        host.take_ops();

        let new = plain_list(&["a", "b", "c", "d", "e"]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let ops = host.take_ops();
        assert_eq!(creates(&ops), 2);
        assert_eq!(removes(&ops), 0);
        assert_eq!(host.children_of(new.handle().unwrap()).len(), 5);
    }

    #[test]
    fn unkeyed_mid_replacement_stays_in_position() {
        let mut host = RecordingHost::new();
        let old = VNode::element("ul").children([
            VNode::element("li").text_children("a"),
            VNode::element("span").text_children("b"),
            VNode::element("li").text_children("c"),
        ]);
        let root = mount(&mut host, &old);
        host.take_ops();

        // The middle node changes tag; its replacement must keep the slot.
        let new = plain_list(&["a", "b", "c"]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let texts: Vec<String> = host
            .children_of(new.handle().unwrap())
            .iter()
            .map(|&c| host.text_of(c))
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn keyed_swap_issues_exactly_one_move() {
        let mut host = RecordingHost::new();
        let old = keyed_list(&["a", "b", "c", "d", "e"]);
        let root = mount(&mut host, &old);
        host.take_ops();

        let new = keyed_list(&["a", "c", "b", "d", "e"]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let ops = host.take_ops();
        assert_eq!(moves(&ops), 1);
        assert_eq!(creates(&ops), 0);
        assert_eq!(removes(&ops), 0);
        let ul = new.handle().unwrap();
        let labels: Vec<String> = host
            .children_of(ul)
            .iter()
            .map(|&c| host.text_of(c))
            .collect();
        assert_eq!(labels, vec!["a", "c", "b", "d", "e"]);
    }

    #[test]
    fn keyed_reverse_keeps_one_node_still() {
        let mut host = RecordingHost::new();
        let old = keyed_list(&["a", "b", "c", "d"]);
        let root = mount(&mut host, &old);
        host.take_ops();

        let new = keyed_list(&["d", "c", "b", "a"]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let ops = host.take_ops();
        assert_eq!(moves(&ops), 3);
        assert_eq!(creates(&ops), 0);
        let labels: Vec<String> = host
            .children_of(new.handle().unwrap())
            .iter()
            .map(|&c| host.text_of(c))
            .collect();
        assert_eq!(labels, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn keyed_mixed_insert_remove_and_move() {
        let mut host = RecordingHost::new();
        let old = keyed_list(&["a", "b", "c"]);
        let root = mount(&mut host, &old);
        host.take_ops();

        let new = keyed_list(&["b", "d", "a"]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let ops = host.take_ops();
        assert_eq!(removes(&ops), 1); // c
        assert_eq!(creates(&ops), 1); // d
        let labels: Vec<String> = host
            .children_of(new.handle().unwrap())
            .iter()
            .map(|&c| host.text_of(c))
            .collect();
        assert_eq!(labels, vec!["b", "d", "a"]);
    }

    #[test]
    fn identical_trees_diff_to_nothing() {
        let mut host = RecordingHost::new();
        let old = keyed_list(&["a", "b", "c"]);
        let root = mount(&mut host, &old);
        host.take_ops();

        let new = keyed_list(&["a", "b", "c"]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        assert!(host.ops().is_empty(), "unexpected ops: {:?}", host.ops());
    }

    #[test]
    fn duplicate_keys_do_not_panic() {
        let mut host = RecordingHost::new();
        let old = keyed_list(&["a", "a", "b"]);
        let root = mount(&mut host, &old);

        let new = keyed_list(&["b", "a", "a"]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        assert_eq!(host.children_of(new.handle().unwrap()).len(), 3);
    }

    /// Counts WARN-level events emitted while a closure runs.
    struct WarnCounter(Arc<AtomicUsize>);

    impl tracing::Subscriber for WarnCounter {
        fn enabled(&self, metadata: &tracing::Metadata<'_>) -> bool {
            *metadata.level() == tracing::Level::WARN
        }
        fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }
        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}
        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}
        fn event(&self, _: &tracing::Event<'_>) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
        fn enter(&self, _: &tracing::span::Id) {}
        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[test]
    fn duplicate_keys_emit_one_warning() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = WarnCounter(Arc::clone(&warnings));
        tracing::subscriber::with_default(subscriber, || {
            let mut host = RecordingHost::new();
            let old = keyed_list(&["a", "b"]);
            let root = mount(&mut host, &old);
            let new = keyed_list(&["b", "a", "a"]);
            Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        });
        assert_eq!(warnings.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn empty_fragment_successor_does_not_break_anchoring() {
        let mut host = RecordingHost::new();
        let old = keyed_list(&["a", "b"]);
        let root = mount(&mut host, &old);
        host.take_ops();

        // The moved node's immediate successor owns no physical handle; the
        // anchor must come from the next sibling that does.
        let new = VNode::element("ul").children([
            VNode::element("li").keyed("b").text_children("b"),
            VNode::fragment(Vec::new()).keyed("f"),
            VNode::element("li").keyed("a").text_children("a"),
        ]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let ops = host.take_ops();
        assert_eq!(moves(&ops), 1);
        let texts: Vec<String> = host
            .children_of(new.handle().unwrap())
            .iter()
            .map(|&c| host.text_of(c))
            .collect();
        assert_eq!(texts, vec!["b", "a"]);
    }

    #[test]
    fn fragment_children_mount_flat() {
        let mut host = RecordingHost::new();
        let tree = VNode::fragment([
            VNode::text("a"),
            VNode::fragment([VNode::text("b"), VNode::text("c")]),
        ]);
        let root = mount(&mut host, &tree);
        assert_eq!(host.child_labels(root), vec!["a", "b", "c"]);
    }

    #[test]
    fn keyed_fragment_moves_all_its_nodes() {
        let mut host = RecordingHost::new();
        let frag = |key: &str, items: [&str; 2]| {
            VNode::fragment(items.map(VNode::text)).keyed(key)
        };
        let old = VNode::element("div")
            .children([frag("x", ["x1", "x2"]), frag("y", ["y1", "y2"])]);
        let root = mount(&mut host, &old);
        host.take_ops();

        let new = VNode::element("div")
            .children([frag("y", ["y1", "y2"]), frag("x", ["x1", "x2"])]);
        Patcher::new(&mut host).patch(Some(&old), &new, root, None);
        let labels = host.child_labels(new.handle().unwrap());
        assert_eq!(labels, vec!["y1", "y2", "x1", "x2"]);
    }

    #[test]
    fn children_switch_between_text_and_nodes() {
        let mut host = RecordingHost::new();
        let old = VNode::element("div").text_children("plain");
        let root = mount(&mut host, &old);

        let mid = VNode::element("div").children([VNode::text("a"), VNode::text("b")]);
        Patcher::new(&mut host).patch(Some(&old), &mid, root, None);
        let div = mid.handle().unwrap();
        assert_eq!(host.child_labels(div), vec!["a", "b"]);
        assert_eq!(host.text_of(div), "");

        let new = VNode::element("div").text_children("again");
        Patcher::new(&mut host).patch(Some(&mid), &new, root, None);
        assert!(host.children_of(div).is_empty());
        assert_eq!(host.text_of(div), "again");
    }

    struct LabelCard {
        renders: Cell<usize>,
    }

    impl Component for LabelCard {
        fn render(&self, props: &PropMap) -> VNode {
            self.renders.set(self.renders.get() + 1);
            let label = props
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            VNode::element("p").text_children(label)
        }
    }

    #[test]
    fn component_rerenders_only_when_props_change() {
        let mut host = RecordingHost::new();
        let card = Rc::new(LabelCard {
            renders: Cell::new(0),
        });
        let props_a = {
            let mut p = PropMap::new();
            p.insert("label", "one");
            p
        };
        let old = VNode::component(Rc::clone(&card) as Rc<dyn Component>, props_a.clone());
        let root = mount(&mut host, &old);
        assert_eq!(card.renders.get(), 1);
        assert_eq!(host.child_labels(root), vec!["p"]);

        // Same props: the cached subtree is carried forward.
        let unchanged = VNode::component(Rc::clone(&card) as Rc<dyn Component>, props_a);
        Patcher::new(&mut host).patch(Some(&old), &unchanged, root, None);
        assert_eq!(card.renders.get(), 1);

        let mut props_b = PropMap::new();
        props_b.insert("label", "two");
        let changed = VNode::component(Rc::clone(&card) as Rc<dyn Component>, props_b);
        Patcher::new(&mut host).patch(Some(&unchanged), &changed, root, None);
        assert_eq!(card.renders.get(), 2);
        let subtree_handle = changed
            .first_handle()
            .expect("component subtree is mounted");
        assert_eq!(host.text_of(subtree_handle), "two");
    }

    #[test]
    fn unmount_component_removes_rendered_nodes() {
        let mut host = RecordingHost::new();
        let card = Rc::new(LabelCard {
            renders: Cell::new(0),
        });
        let tree = VNode::component(card as Rc<dyn Component>, PropMap::new());
        let root = mount(&mut host, &tree);
        let rendered = tree.first_handle().unwrap();
        assert!(host.is_attached(rendered));

        Patcher::new(&mut host).render(Some(&tree), None, root);
        assert!(!host.is_attached(rendered));
    }
}
