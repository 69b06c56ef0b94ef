//! Host document - the in-memory node tree the renderer mutates.
//!
//! Nodes live in a slotmap arena and are addressed by [`NodeId`] handles;
//! parents hold the owning child lists, children keep a back handle. Three
//! node kinds exist: elements (tag, attributes, inline style, class list,
//! event listeners), text, and markers (position holders for dynamic
//! regions, the comment nodes of this document model).
//!
//! Mutating a node that was already destroyed is a tolerated no-op: region
//! teardown is multi-step and a late write must not bring the tree down.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle to a node in a [`Document`] arena.
    pub struct NodeId;
}

/// An event delivered to listeners via [`Document::dispatch`].
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub name: String,
    pub detail: Option<String>,
}

impl Event {
    pub fn new(name: &str) -> Event {
        Event { name: name.to_string(), detail: None }
    }

    pub fn with_detail(name: &str, detail: &str) -> Event {
        Event { name: name.to_string(), detail: Some(detail.to_string()) }
    }
}

/// Event listener callback. `Rc` so handlers can be shared between the view
/// tree and the host node that ends up owning them.
pub type Listener = Rc<dyn Fn(&Event)>;

enum NodeKind {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
        styles: IndexMap<String, String>,
        classes: IndexSet<String>,
        listeners: Vec<(String, Listener)>,
    },
    Text(String),
    Marker,
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

// =============================================================================
// Document
// =============================================================================

thread_local! {
    /// Arena identity source. Node keys repeat across arenas (every fresh
    /// slotmap hands out the same first key), so anything keyed by node
    /// across documents must qualify the key with this id.
    static NEXT_DOCUMENT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Clonable handle to a host document. Clones share the same arena.
#[derive(Clone)]
pub struct Document {
    id: u64,
    nodes: Rc<RefCell<SlotMap<NodeId, NodeData>>>,
}

impl Document {
    pub fn new() -> Document {
        let id = NEXT_DOCUMENT_ID.get();
        NEXT_DOCUMENT_ID.set(id + 1);
        Document { id, nodes: Rc::new(RefCell::new(SlotMap::with_key())) }
    }

    /// This arena's identity, stable across clones of the handle.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    // -------------------------------------------------------------------------
    // Creation & destruction
    // -------------------------------------------------------------------------

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.insert_node(NodeKind::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            styles: IndexMap::new(),
            classes: IndexSet::new(),
            listeners: Vec::new(),
        })
    }

    pub fn create_text(&self, data: &str) -> NodeId {
        self.insert_node(NodeKind::Text(data.to_string()))
    }

    pub fn create_marker(&self) -> NodeId {
        self.insert_node(NodeKind::Marker)
    }

    fn insert_node(&self, kind: NodeKind) -> NodeId {
        self.nodes.borrow_mut().insert(NodeData { kind, parent: None, children: Vec::new() })
    }

    /// Destroy `node` and its whole subtree, freeing the arena entries.
    pub fn remove(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        detach_in(&mut nodes, node);
        destroy_subtree(&mut nodes, node);
    }

    /// Remove `node` from its parent but keep it (and its subtree) alive.
    pub fn detach(&self, node: NodeId) {
        detach_in(&mut self.nodes.borrow_mut(), node);
    }

    /// Destroy every child of `parent`, keeping `parent` itself.
    pub fn clear_children(&self, parent: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let children = match nodes.get_mut(parent) {
            Some(data) => std::mem::take(&mut data.children),
            None => return,
        };
        for child in children {
            destroy_subtree(&mut nodes, child);
        }
    }

    // -------------------------------------------------------------------------
    // Tree structure
    // -------------------------------------------------------------------------

    /// Insert `node` into `parent`'s child list, before `reference` (or at
    /// the end when `reference` is `None` or not a child of `parent`). A
    /// node already placed elsewhere is moved, not duplicated.
    pub fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        let mut nodes = self.nodes.borrow_mut();
        if !nodes.contains_key(parent) || !nodes.contains_key(node) {
            tracing::warn!("insert_before on a destroyed node ignored");
            return;
        }
        detach_in(&mut nodes, node);

        let position = {
            let siblings = &nodes[parent].children;
            reference
                .and_then(|r| siblings.iter().position(|&c| c == r))
                .unwrap_or(siblings.len())
        };
        nodes[parent].children.insert(position, node);
        nodes[node].parent = Some(parent);
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node).and_then(|data| data.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        let parent = nodes.get(node)?.parent?;
        let siblings = &nodes.get(parent)?.children;
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains_key(node)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.borrow().get(node).map(|d| &d.kind),
            Some(NodeKind::Element { .. })
        )
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        match self.nodes.borrow().get(node).map(|d| &d.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.clone()),
            _ => None,
        }
    }

    /// Number of live nodes in the arena. Used by tests to prove that a
    /// reconciliation pass created or destroyed nothing.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    // -------------------------------------------------------------------------
    // Node state
    // -------------------------------------------------------------------------

    pub fn set_text(&self, node: NodeId, data: &str) {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(node).map(|d| &mut d.kind) {
            Some(NodeKind::Text(text)) => {
                data.clone_into(text);
            }
            Some(_) => tracing::warn!("set_text on a non-text node ignored"),
            None => {}
        }
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        match self.nodes.borrow().get(node).map(|d| &d.kind) {
            Some(NodeKind::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Set or remove (`None`) an attribute.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: Option<&str>) {
        self.with_element(node, "set_attribute", |attrs, _, _, _| match value {
            Some(value) => {
                attrs.insert(name.to_string(), value.to_string());
            }
            None => {
                attrs.shift_remove(name);
            }
        });
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match self.nodes.borrow().get(node).map(|d| &d.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs.get(name).cloned(),
            _ => None,
        }
    }

    /// Set or unset (`None`) an inline style property.
    pub fn set_style(&self, node: NodeId, name: &str, value: Option<&str>) {
        self.with_element(node, "set_style", |_, styles, _, _| match value {
            Some(value) => {
                styles.insert(name.to_string(), value.to_string());
            }
            None => {
                styles.shift_remove(name);
            }
        });
    }

    pub fn style(&self, node: NodeId, name: &str) -> Option<String> {
        match self.nodes.borrow().get(node).map(|d| &d.kind) {
            Some(NodeKind::Element { styles, .. }) => styles.get(name).cloned(),
            _ => None,
        }
    }

    pub fn toggle_class(&self, node: NodeId, name: &str, on: bool) {
        self.with_element(node, "toggle_class", |_, _, classes, _| {
            if on {
                classes.insert(name.to_string());
            } else {
                classes.shift_remove(name);
            }
        });
    }

    pub fn has_class(&self, node: NodeId, name: &str) -> bool {
        match self.nodes.borrow().get(node).map(|d| &d.kind) {
            Some(NodeKind::Element { classes, .. }) => classes.contains(name),
            _ => false,
        }
    }

    pub fn add_listener(&self, node: NodeId, event: &str, listener: Listener) {
        self.with_element(node, "add_listener", |_, _, _, listeners| {
            listeners.push((event.to_string(), listener));
        });
    }

    /// Deliver an event to `target` and then to each ancestor in turn
    /// (bubbling). Listener lists are snapshotted before any callback runs,
    /// so handlers may mutate the tree freely.
    pub fn dispatch(&self, target: NodeId, event: &Event) {
        let chain: Vec<Listener> = {
            let nodes = self.nodes.borrow();
            let mut collected = Vec::new();
            let mut current = Some(target);
            while let Some(node) = current {
                let Some(data) = nodes.get(node) else { break };
                if let NodeKind::Element { listeners, .. } = &data.kind {
                    for (name, listener) in listeners {
                        if name == &event.name {
                            collected.push(listener.clone());
                        }
                    }
                }
                current = data.parent;
            }
            collected
        };
        for listener in chain {
            listener(event);
        }
    }

    fn with_element(
        &self,
        node: NodeId,
        op: &str,
        f: impl FnOnce(
            &mut IndexMap<String, String>,
            &mut IndexMap<String, String>,
            &mut IndexSet<String>,
            &mut Vec<(String, Listener)>,
        ),
    ) {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(node).map(|d| &mut d.kind) {
            Some(NodeKind::Element { attrs, styles, classes, listeners, .. }) => {
                f(attrs, styles, classes, listeners);
            }
            Some(_) => tracing::warn!(op, "element operation on a non-element node ignored"),
            None => {}
        }
    }

    // -------------------------------------------------------------------------
    // Serialization (tests & diagnostics)
    // -------------------------------------------------------------------------

    /// Render `node` and its subtree as markup. Markers serialize as
    /// `<!---->`; attribute order follows insertion order, so output is
    /// deterministic.
    pub fn markup(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        write_markup(&nodes, node, &mut out);
        out
    }

    /// Concatenated text content of `node`'s subtree.
    pub fn text_content(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        collect_text(&nodes, node, &mut out);
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

fn detach_in(nodes: &mut SlotMap<NodeId, NodeData>, node: NodeId) {
    let Some(parent) = nodes.get(node).and_then(|d| d.parent) else {
        return;
    };
    if let Some(parent_data) = nodes.get_mut(parent) {
        parent_data.children.retain(|&c| c != node);
    }
    if let Some(data) = nodes.get_mut(node) {
        data.parent = None;
    }
}

fn destroy_subtree(nodes: &mut SlotMap<NodeId, NodeData>, node: NodeId) {
    let Some(data) = nodes.remove(node) else { return };
    for child in data.children {
        destroy_subtree(nodes, child);
    }
}

fn write_markup(nodes: &SlotMap<NodeId, NodeData>, node: NodeId, out: &mut String) {
    let Some(data) = nodes.get(node) else { return };
    match &data.kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Marker => out.push_str("<!---->"),
        NodeKind::Element { tag, attrs, styles, classes, .. } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push_str(&format!(" {name}=\"{value}\""));
            }
            if !classes.is_empty() {
                let joined: Vec<&str> = classes.iter().map(String::as_str).collect();
                out.push_str(&format!(" class=\"{}\"", joined.join(" ")));
            }
            if !styles.is_empty() {
                let joined: Vec<String> =
                    styles.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                out.push_str(&format!(" style=\"{}\"", joined.join("; ")));
            }
            out.push('>');
            for &child in &data.children {
                write_markup(nodes, child, out);
            }
            out.push_str(&format!("</{tag}>"));
        }
    }
}

fn collect_text(nodes: &SlotMap<NodeId, NodeData>, node: NodeId, out: &mut String) {
    let Some(data) = nodes.get(node) else { return };
    if let NodeKind::Text(text) = &data.kind {
        out.push_str(text);
    }
    for &child in &data.children {
        collect_text(nodes, child, out);
    }
}
