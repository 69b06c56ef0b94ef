//! Fragment - a movable group of sibling nodes with a trailing anchor.
//!
//! Dynamic regions (conditionals, list slots) render into fragments so the
//! renderer can find, replace, or remove their content without walking the
//! parent. The anchor is a marker node that TRAILS the content: content is
//! inserted before the anchor, and the position after the fragment is the
//! last content node's next sibling (or the anchor's, when empty).

use std::cell::RefCell;
use std::rc::Rc;

use super::document::{Document, NodeId};

/// A run of sibling nodes kept behind a shared handle. Clones refer to the
/// same fragment.
#[derive(Clone)]
pub struct Fragment {
    inner: Rc<RefCell<FragmentInner>>,
}

struct FragmentInner {
    anchor: NodeId,
    nodes: Vec<NodeId>,
}

impl Fragment {
    /// Create an empty fragment with a fresh anchor marker. The anchor is
    /// not yet placed; mount it with [`Document::insert_before`].
    pub fn new(doc: &Document) -> Fragment {
        Fragment {
            inner: Rc::new(RefCell::new(FragmentInner {
                anchor: doc.create_marker(),
                nodes: Vec::new(),
            })),
        }
    }

    /// The trailing anchor marker.
    pub fn anchor(&self) -> NodeId {
        self.inner.borrow().anchor
    }

    /// Add `node` to the fragment, before `reference` if that is already a
    /// member, otherwise at the end. When the anchor is mounted the node is
    /// placed into the host tree at the matching position.
    pub fn insert_before(&self, doc: &Document, node: NodeId, reference: Option<NodeId>) {
        let (anchor, target) = {
            let mut inner = self.inner.borrow_mut();
            let position = reference
                .and_then(|r| inner.nodes.iter().position(|&n| n == r));
            match position {
                Some(index) => inner.nodes.insert(index, node),
                None => inner.nodes.push(node),
            }
            (inner.anchor, reference.filter(|r| inner.nodes.contains(r)))
        };
        if let Some(parent) = doc.parent(anchor) {
            doc.insert_before(parent, node, target.or(Some(anchor)));
        }
    }

    /// The host node immediately after this fragment: the last content
    /// node's next sibling, or the anchor's when the fragment is empty.
    /// Regions stacked in one parent use this to place a successor.
    pub fn next_sibling(&self, doc: &Document) -> Option<NodeId> {
        let inner = self.inner.borrow();
        match inner.nodes.last() {
            Some(&last) => doc.next_sibling(last),
            None => doc.next_sibling(inner.anchor),
        }
    }

    /// Destroy the fragment's content nodes, keeping the anchor in place so
    /// the region can render new content at the same position.
    pub fn clear(&self, doc: &Document) {
        let nodes = std::mem::take(&mut self.inner.borrow_mut().nodes);
        for node in nodes {
            doc.remove(node);
        }
    }

    /// Destroy content and anchor both. The fragment is gone from the host
    /// tree entirely.
    pub fn remove(&self, doc: &Document) {
        self.clear(doc);
        doc.remove(self.inner.borrow().anchor);
    }
}
