//! Renderer - mounts a view tree onto a host document.
//!
//! Mounting is a single pass over the view driven by a work stack: each job
//! pairs a view with the scope that owns its reactive machinery and the
//! target it inserts host nodes into. Static content becomes plain nodes
//! with no effects at all; reactive leaves get one effect each that mutates
//! its node in place. There is no retained mirror of the tree and nothing
//! diffs whole views: after mount, updates flow only through the effects
//! the regions and leaves registered.
//!
//! Dynamic regions (conditionals, lists) mount behind marker nodes and
//! manage their content through [`Fragment`]s, so they can replace or
//! truncate content without touching surrounding siblings.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RenderError;
use crate::host::{Document, Fragment, NodeId};
use crate::props;
use crate::reactive::effect::effect;
use crate::reactive::runtime::untrack;
use crate::reactive::scope::{Scope, on_cleanup};
use crate::view::{CondUpdate, ConditionalNode, ListBody, ListIndexNode, ListSlots, Source, View};

thread_local! {
    /// Root scope per mounted element, so a re-render can dispose the
    /// previous tree's effects before building the new one. Keyed by
    /// arena identity plus node: bare node keys repeat across documents.
    static ROOTS: RefCell<HashMap<(u64, NodeId), Scope>> = RefCell::new(HashMap::new());
}

/// Mount `view` as the content of `root`, replacing whatever a previous
/// [`render`] onto the same element mounted (its effects are disposed
/// first, then its nodes).
pub fn render(doc: &Document, root: NodeId, view: impl Into<View>) -> Result<(), RenderError> {
    if !doc.is_element(root) {
        return Err(RenderError::NotAnElement);
    }
    evict_dead_roots(doc);
    unmount(doc, root);

    let scope = Scope::detached();
    let mut jobs = vec![Job {
        scope: scope.clone(),
        target: Target::Node(root),
        view: view.into(),
    }];
    if let Err(error) = commit(doc, &mut jobs) {
        scope.clear(false);
        doc.clear_children(root);
        return Err(error);
    }
    ROOTS.with_borrow_mut(|roots| {
        roots.insert((doc.id(), root), scope);
    });
    tracing::debug!(?root, "view mounted");
    Ok(())
}

/// Dispose registry entries whose root node this document has destroyed;
/// their keys can never be addressed again, but their scopes still hold
/// live subscriptions.
fn evict_dead_roots(doc: &Document) {
    let stale: Vec<Scope> = ROOTS.with_borrow_mut(|roots| {
        let keys: Vec<(u64, NodeId)> = roots
            .keys()
            .filter(|&&(doc_id, node)| doc_id == doc.id() && !doc.is_alive(node))
            .copied()
            .collect();
        keys.into_iter().filter_map(|key| roots.remove(&key)).collect()
    });
    // Cleanups may re-enter the registry; run them outside the borrow.
    for scope in stale {
        scope.clear(false);
    }
}

/// Dispose the tree mounted on `root`: effects and cleanups first, then the
/// host nodes. A root that holds no mounted tree just has its children
/// cleared.
pub fn unmount(doc: &Document, root: NodeId) {
    if let Some(previous) = ROOTS.with_borrow_mut(|roots| roots.remove(&(doc.id(), root))) {
        previous.clear(false);
    }
    doc.clear_children(root);
}

// =============================================================================
// Work stack
// =============================================================================

/// Where a job inserts its host nodes.
#[derive(Clone)]
enum Target {
    Node(NodeId),
    Fragment(Fragment),
}

impl Target {
    fn insert(&self, doc: &Document, node: NodeId, before: Option<NodeId>) {
        match self {
            Target::Node(parent) => doc.insert_before(*parent, node, before),
            Target::Fragment(fragment) => fragment.insert_before(doc, node, before),
        }
    }

    /// The nearest enclosing host element.
    fn element(&self, doc: &Document) -> Option<NodeId> {
        match self {
            Target::Node(node) => Some(*node),
            Target::Fragment(fragment) => doc.parent(fragment.anchor()),
        }
    }
}

struct Job {
    scope: Scope,
    target: Target,
    view: View,
}

/// Drain the work stack. Children are pushed in reverse so they pop in
/// document order; every insert appends, which keeps sibling order equal to
/// traversal order.
fn commit(doc: &Document, jobs: &mut Vec<Job>) -> Result<(), RenderError> {
    while let Some(job) = jobs.pop() {
        let Job { scope, target, view } = job;
        match view {
            View::Empty => {}
            View::Text(source) => mount_text(doc, &scope, &target, source),
            View::Many(children) => {
                for child in children.into_iter().rev() {
                    jobs.push(Job {
                        scope: scope.clone(),
                        target: target.clone(),
                        view: child,
                    });
                }
            }
            View::Element(node) => {
                let host = doc.create_element(&node.tag);
                scope.run(|| props::bind(doc, host, node.props));
                target.insert(doc, host, None);
                for child in node.children.into_iter().rev() {
                    jobs.push(Job {
                        scope: scope.clone(),
                        target: Target::Node(host),
                        view: child,
                    });
                }
            }
            View::Component(build) => {
                // One untracked invocation; the body never re-runs.
                let view = scope.run(|| untrack(build));
                jobs.push(Job { scope, target, view });
            }
            View::Attach(f) => match target.element(doc) {
                Some(host) => f(host),
                None => tracing::warn!("attach callback without a host element ignored"),
            },
            View::When(node) => mount_conditional(doc, scope, target, node, jobs),
            View::IndexList(node) => mount_index_list(doc, scope, target, node, jobs)?,
            View::KeyedList(_) => return Err(RenderError::KeyedListUnsupported),
        }
    }
    Ok(())
}

fn mount_text(doc: &Document, scope: &Scope, target: &Target, source: Source<String>) {
    if !source.is_reactive() {
        let node = doc.create_text(&source.peek());
        target.insert(doc, node, None);
        return;
    }
    let node = doc.create_text("");
    target.insert(doc, node, None);
    let doc = doc.clone();
    scope.run(|| {
        effect(move || {
            let value = source.get();
            doc.set_text(node, &value);
        });
    });
}

// =============================================================================
// Conditional regions
// =============================================================================

/// Mount a conditional region. The probe owns the key comparison; this side
/// owns one fragment and one child scope, disposed and reused across every
/// key change. A static condition probes once and mounts inline, with no
/// marker and no effect.
fn mount_conditional(
    doc: &Document,
    scope: Scope,
    target: Target,
    node: ConditionalNode,
    jobs: &mut Vec<Job>,
) {
    let mut probe = node.probe;
    if !node.reactive {
        if let CondUpdate::Mount(build) = untrack(|| probe()) {
            let view = scope.run(|| untrack(build));
            jobs.push(Job { scope, target, view });
        }
        return;
    }

    let fragment = Fragment::new(doc);
    target.insert(doc, fragment.anchor(), None);
    let child_scope = scope.child();
    let doc = doc.clone();
    let region_doc = doc.clone();
    let region_fragment = fragment.clone();
    scope.run(|| {
        // An enclosing fragment tracks only this region's anchor; the
        // content nodes belong to this fragment alone, so the owning scope
        // removes them on teardown.
        on_cleanup(move || region_fragment.remove(&region_doc));
        effect(move || match probe() {
            CondUpdate::Unchanged => {}
            CondUpdate::Unmount => {
                child_scope.clear(true);
                fragment.clear(&doc);
            }
            CondUpdate::Mount(build) => {
                child_scope.clear(true);
                fragment.clear(&doc);
                let view = child_scope.run(|| untrack(build));
                let mut jobs = vec![Job {
                    scope: child_scope.clone(),
                    target: Target::Fragment(fragment.clone()),
                    view,
                }];
                if let Err(error) = commit(&doc, &mut jobs) {
                    tracing::error!(%error, "conditional region failed to render");
                    child_scope.clear(true);
                    fragment.clear(&doc);
                }
            }
        });
    });
}

// =============================================================================
// List regions
// =============================================================================

/// One mounted list position: the scope owning its effects and the fragment
/// holding its nodes.
struct Slot {
    scope: Scope,
    fragment: Fragment,
}

/// Mount an index-reconciled list region.
///
/// A static list mounts its items inline (the fallback takes their place
/// when there are none). A reactive list keeps a trailing marker and a slot
/// vector; its driver reads the source inside the region effect and issues
/// prefix writes, appends, and truncation against the slots.
fn mount_index_list(
    doc: &Document,
    scope: Scope,
    target: Target,
    node: ListIndexNode,
    jobs: &mut Vec<Job>,
) -> Result<(), RenderError> {
    match node.body {
        ListBody::Static { thunks, fallback } => {
            if thunks.is_empty() {
                if let Some(fallback) = fallback {
                    jobs.push(Job { scope, target, view: *fallback });
                }
                return Ok(());
            }
            let views: Vec<View> = thunks
                .into_iter()
                .map(|build| scope.run(|| untrack(build)))
                .collect();
            for view in views.into_iter().rev() {
                jobs.push(Job {
                    scope: scope.clone(),
                    target: target.clone(),
                    view,
                });
            }
            Ok(())
        }
        ListBody::Reactive { mut driver } => {
            let marker = doc.create_marker();
            target.insert(doc, marker, None);

            let slots: Rc<RefCell<Vec<Slot>>> = Rc::new(RefCell::new(Vec::new()));
            let region = scope.clone();
            let doc = doc.clone();
            let slots_effect = slots.clone();
            let slots_cleanup = slots.clone();
            let cleanup_doc = doc.clone();
            scope.run(|| {
                // Slot content nodes belong to the per-slot fragments; an
                // enclosing fragment tracks only the region marker, so slot
                // teardown is the owning scope's job.
                on_cleanup(move || {
                    for slot in slots_cleanup.borrow_mut().drain(..) {
                        slot.fragment.remove(&cleanup_doc);
                    }
                    cleanup_doc.remove(marker);
                });
                effect(move || {
                    let mut jobs = Vec::new();
                    {
                        let mut slots = slots_effect.borrow_mut();
                        let mut sync = SlotSync {
                            doc: &doc,
                            region: &region,
                            target: &target,
                            marker,
                            slots: &mut slots,
                            jobs: &mut jobs,
                        };
                        driver(&mut sync);
                    }
                    // The slot borrow is released before committing: item
                    // content may contain further list regions.
                    if let Err(error) = commit(&doc, &mut jobs) {
                        tracing::error!(%error, "list region failed to render");
                    }
                });
            });
            Ok(())
        }
    }
}

/// Slot operations handed to a reactive list driver, bound to one run of
/// its region effect.
struct SlotSync<'a> {
    doc: &'a Document,
    region: &'a Scope,
    target: &'a Target,
    marker: NodeId,
    slots: &'a mut Vec<Slot>,
    jobs: &'a mut Vec<Job>,
}

impl ListSlots for SlotSync<'_> {
    fn append(&mut self, build: Box<dyn FnOnce() -> View>) {
        // Slots sit in order before the region marker; a new slot lands
        // after the previous slot's run (or directly before the marker when
        // it is the first).
        let before = match self.slots.last() {
            Some(prev) => prev.fragment.next_sibling(self.doc),
            None => Some(self.marker),
        };
        let slot_scope = self.region.child();
        let fragment = Fragment::new(self.doc);
        self.target.insert(self.doc, fragment.anchor(), before);

        let view = slot_scope.run(|| untrack(build));
        self.jobs.push(Job {
            scope: slot_scope.clone(),
            target: Target::Fragment(fragment.clone()),
            view,
        });
        self.slots.push(Slot {
            scope: slot_scope,
            fragment,
        });
    }

    fn truncate(&mut self, keep: usize) {
        for slot in self.slots.drain(keep..) {
            // Scope first: cleanups may still want to read the nodes.
            slot.scope.clear(false);
            slot.fragment.remove(self.doc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Event;
    use crate::reactive::batch::batch;
    use crate::reactive::signal::signal;
    use crate::view::el;
    use std::cell::Cell;

    fn fixture() -> (Document, NodeId) {
        let doc = Document::new();
        let root = doc.create_element("root");
        (doc, root)
    }

    #[test]
    fn test_static_tree_mounts_without_effects() {
        let (doc, root) = fixture();
        render(
            &doc,
            root,
            el("div")
                .attr("id", "app")
                .child(el("span").child("hello"))
                .child(" world"),
        )
        .unwrap();
        assert_eq!(
            doc.markup(root),
            "<root><div id=\"app\"><span>hello</span> world</div></root>"
        );
    }

    #[test]
    fn test_render_rejects_non_element_roots() {
        let doc = Document::new();
        let text = doc.create_text("x");
        assert!(matches!(
            render(&doc, text, "nope"),
            Err(RenderError::NotAnElement)
        ));
    }

    #[test]
    fn test_reactive_text_updates_in_place() {
        let (doc, root) = fixture();
        let name = signal(String::from("ada"));
        render(&doc, root, el("p").child(View::text(name.clone()))).unwrap();
        assert_eq!(doc.text_content(root), "ada");

        let nodes_before = doc.node_count();
        name.set("lin".to_string());
        assert_eq!(doc.text_content(root), "lin");
        assert_eq!(doc.node_count(), nodes_before, "text updates reuse the node");
    }

    #[test]
    fn test_component_body_runs_once_untracked() {
        let (doc, root) = fixture();
        let count = signal(0);
        let bodies = Rc::new(Cell::new(0));

        let (count_inner, bodies_inner) = (count.clone(), bodies.clone());
        render(
            &doc,
            root,
            View::component(move || {
                bodies_inner.set(bodies_inner.get() + 1);
                count_inner.get();
                View::from("static")
            }),
        )
        .unwrap();
        assert_eq!(bodies.get(), 1);

        count.set(5);
        assert_eq!(bodies.get(), 1, "component bodies must never re-run");
    }

    #[test]
    fn test_attach_receives_enclosing_element() {
        let (doc, root) = fixture();
        let seen: Rc<Cell<Option<NodeId>>> = Rc::new(Cell::new(None));
        let seen_inner = seen.clone();
        render(
            &doc,
            root,
            el("div").child(View::attach(move |node| seen_inner.set(Some(node)))),
        )
        .unwrap();

        let div = doc.children(root)[0];
        assert_eq!(seen.get(), Some(div));
    }

    #[test]
    fn test_conditional_mounts_and_unmounts() {
        let (doc, root) = fixture();
        let open = signal(false);
        render(
            &doc,
            root,
            View::when(open.clone(), || el("span").child("shown").into()),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "");

        open.set(true);
        assert_eq!(doc.text_content(root), "shown");

        open.set(false);
        assert_eq!(doc.text_content(root), "");
    }

    #[test]
    fn test_conditional_same_key_skips_rebuild() {
        let (doc, root) = fixture();
        let count = signal(1);
        let builds = Rc::new(Cell::new(0));

        let count_inner = count.clone();
        let builds_inner = builds.clone();
        render(
            &doc,
            root,
            View::when(Source::from_fn(move || count_inner.get() > 0), move || {
                builds_inner.set(builds_inner.get() + 1);
                el("b").child("positive").into()
            }),
        )
        .unwrap();
        assert_eq!(builds.get(), 1);

        count.set(2);
        assert_eq!(builds.get(), 1, "truth unchanged, content must survive");

        count.set(-1);
        assert_eq!(doc.text_content(root), "");
        count.set(3);
        assert_eq!(builds.get(), 2, "back to true rebuilds once");
        assert_eq!(doc.text_content(root), "positive");
    }

    #[test]
    fn test_conditional_disposes_content_effects() {
        let (doc, root) = fixture();
        let open = signal(true);
        let dep = signal(0);
        let cleanups = Rc::new(Cell::new(0));
        let runs = Rc::new(Cell::new(0));

        let (dep_inner, cleanups_inner, runs_inner) = (dep.clone(), cleanups.clone(), runs.clone());
        render(
            &doc,
            root,
            View::when(open.clone(), move || {
                let cleanups = cleanups_inner.clone();
                on_cleanup(move || cleanups.set(cleanups.get() + 1));
                let dep = dep_inner.clone();
                let runs = runs_inner.clone();
                effect(move || {
                    dep.get();
                    runs.set(runs.get() + 1);
                });
                View::from("content")
            }),
        )
        .unwrap();
        assert_eq!(runs.get(), 1);

        open.set(false);
        assert_eq!(cleanups.get(), 1, "unmount runs the content's cleanups");
        dep.set(1);
        assert_eq!(runs.get(), 1, "unmounted content's effects are silenced");
    }

    #[test]
    fn test_when_some_keys_on_value() {
        let (doc, root) = fixture();
        let user = signal(Some("ada".to_string()));
        let builds = Rc::new(Cell::new(0));

        let builds_inner = builds.clone();
        render(
            &doc,
            root,
            View::when_some(user.clone(), move |name| {
                builds_inner.set(builds_inner.get() + 1);
                el("em").child(name).into()
            }),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "ada");
        assert_eq!(builds.get(), 1);

        user.set(Some("lin".to_string()));
        assert_eq!(doc.text_content(root), "lin", "a different value rebuilds");
        assert_eq!(builds.get(), 2);

        user.set(Some("lin".to_string()));
        assert_eq!(builds.get(), 2, "an equal value is a no-op write");

        user.set(None);
        assert_eq!(doc.text_content(root), "");
    }

    #[test]
    fn test_static_list_mounts_inline() {
        let (doc, root) = fixture();
        render(
            &doc,
            root,
            el("ul").child(View::index(vec![10, 20, 30], |item, _| {
                el("li").child(View::text(Source::from_fn(move || item.get().to_string())))
                    .into()
            })),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "102030");
    }

    #[test]
    fn test_empty_static_list_shows_fallback() {
        let (doc, root) = fixture();
        render(
            &doc,
            root,
            View::index_or(Vec::<i32>::new(), |_, _| View::Empty, "no items"),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "no items");
    }

    #[test]
    fn test_list_prefix_update_reuses_nodes() {
        let (doc, root) = fixture();
        let items = signal(vec![1, 2, 3]);
        render(
            &doc,
            root,
            el("ul").child(View::index(items.clone(), |item, _| {
                el("li").child(View::text(Source::from_fn(move || item.get().to_string())))
                    .into()
            })),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "123");

        let ul = doc.children(root)[0];
        let layout_before = doc.children(ul);
        let count_before = doc.node_count();

        items.set(vec![9, 2, 3]);
        assert_eq!(doc.text_content(root), "923");
        assert_eq!(doc.children(ul), layout_before, "every host node is reused");
        assert_eq!(doc.node_count(), count_before);
    }

    #[test]
    fn test_list_appends_in_order_and_truncates() {
        let (doc, root) = fixture();
        let items = signal(vec!["a".to_string()]);
        let cleanups = Rc::new(Cell::new(0));

        let cleanups_outer = cleanups.clone();
        render(
            &doc,
            root,
            el("ul").child(View::index(items.clone(), move |item, _| {
                let cleanups = cleanups_outer.clone();
                on_cleanup(move || cleanups.set(cleanups.get() + 1));
                el("li").child(View::text(Source::from_fn(move || item.get()))).into()
            })),
        )
        .unwrap();

        items.set(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(doc.text_content(root), "abc", "appends land in index order");

        items.set(vec!["b".to_string()]);
        assert_eq!(doc.text_content(root), "b", "slot 0 received the new head");
        assert_eq!(cleanups.get(), 2, "two trailing slots disposed");
    }

    #[test]
    fn test_list_item_builder_runs_once_per_slot() {
        let (doc, root) = fixture();
        let items = signal(vec![1, 2]);
        let builds = Rc::new(Cell::new(0));

        let builds_inner = builds.clone();
        render(
            &doc,
            root,
            View::index(items.clone(), move |item, _| {
                builds_inner.set(builds_inner.get() + 1);
                View::text(Source::from_fn(move || item.get().to_string()))
            }),
        )
        .unwrap();
        assert_eq!(builds.get(), 2);

        items.set(vec![7, 8]);
        assert_eq!(doc.text_content(root), "78");
        assert_eq!(builds.get(), 2, "prefix updates flow through slot signals");

        items.set(vec![7, 8, 9]);
        assert_eq!(builds.get(), 3, "only the appended slot builds");
    }

    #[test]
    fn test_keyed_list_is_reported_unsupported() {
        let (doc, root) = fixture();
        let result = render(
            &doc,
            root,
            View::keyed(vec![1, 2], |n| *n, |n| View::from(n)),
        );
        assert!(matches!(result, Err(RenderError::KeyedListUnsupported)));
        assert_eq!(doc.markup(root), "<root></root>", "a failed mount leaves no debris");
    }

    #[test]
    fn test_conditional_inside_list_slot() {
        let (doc, root) = fixture();
        let items = signal(vec![1, 2, 3]);
        render(
            &doc,
            root,
            View::index(items.clone(), |item, _| {
                let gate = item.clone();
                View::when(Source::from_fn(move || gate.get() % 2 == 1), move || {
                    let item = item.clone();
                    View::text(Source::from_fn(move || format!("[{}]", item.get())))
                })
            }),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "[1][3]");

        items.set(vec![2, 2, 3]);
        assert_eq!(doc.text_content(root), "[3]");

        items.set(vec![5]);
        assert_eq!(doc.text_content(root), "[5]");
    }

    #[test]
    fn test_conditional_teardown_removes_nested_list_nodes() {
        let (doc, root) = fixture();
        let open = signal(true);
        let items = signal(vec![1, 2]);

        let items_view = items.clone();
        render(
            &doc,
            root,
            View::when(open.clone(), move || {
                let items = items_view.clone();
                View::index(items, |item, _| {
                    View::text(Source::from_fn(move || item.get().to_string()))
                })
            }),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "12");

        open.set(false);
        assert_eq!(
            doc.text_content(root),
            "",
            "closing the region must remove the nested list's nodes"
        );

        open.set(true);
        assert_eq!(doc.text_content(root), "12");
        let baseline = doc.node_count();
        open.set(false);
        open.set(true);
        assert_eq!(doc.node_count(), baseline, "toggle cycles must not leak nodes");
    }

    #[test]
    fn test_truncated_slot_removes_nested_conditional_nodes() {
        let (doc, root) = fixture();
        let items = signal(vec![1, 2]);
        render(
            &doc,
            root,
            View::index(items.clone(), |item, _| {
                let gate = item.clone();
                View::when(Source::from_fn(move || gate.get() > 0), move || {
                    let item = item.clone();
                    View::text(Source::from_fn(move || item.get().to_string()))
                })
            }),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "12");
        let baseline = doc.node_count();

        items.set(vec![1]);
        assert_eq!(
            doc.text_content(root),
            "1",
            "the dropped slot's conditional content must go with it"
        );
        assert!(doc.node_count() < baseline);
    }

    #[test]
    fn test_roots_are_scoped_per_document() {
        let doc1 = Document::new();
        let root1 = doc1.create_element("root");
        let doc2 = Document::new();
        let root2 = doc2.create_element("root");
        assert_eq!(root1, root2, "fresh arenas hand out the same first key");

        let count = signal(0);
        let count_inner = count.clone();
        render(
            &doc1,
            root1,
            View::text(Source::from_fn(move || count_inner.get().to_string())),
        )
        .unwrap();
        render(&doc2, root2, "other").unwrap();

        count.set(7);
        assert_eq!(
            doc1.text_content(root1),
            "7",
            "mounting onto another document must not disturb this one"
        );
        assert_eq!(doc2.text_content(root2), "other");
    }

    #[test]
    fn test_destroyed_root_entry_is_evicted() {
        let (doc, root) = fixture();
        let count = signal(0);
        let runs = Rc::new(Cell::new(0));

        let (count_inner, runs_inner) = (count.clone(), runs.clone());
        render(
            &doc,
            root,
            View::text(Source::from_fn(move || {
                runs_inner.set(runs_inner.get() + 1);
                count_inner.get().to_string()
            })),
        )
        .unwrap();
        assert_eq!(runs.get(), 1);

        doc.remove(root);
        let other = doc.create_element("root");
        render(&doc, other, "fresh").unwrap();

        count.set(1);
        assert_eq!(
            runs.get(),
            1,
            "the destroyed root's bindings are disposed at the next mount"
        );
    }

    #[test]
    fn test_rerender_replaces_previous_tree() {
        let (doc, root) = fixture();
        let count = signal(0);
        let runs = Rc::new(Cell::new(0));

        let (count_inner, runs_inner) = (count.clone(), runs.clone());
        render(
            &doc,
            root,
            View::text(Source::from_fn(move || {
                runs_inner.set(runs_inner.get() + 1);
                count_inner.get().to_string()
            })),
        )
        .unwrap();
        assert_eq!(runs.get(), 1);

        render(&doc, root, "replacement").unwrap();
        assert_eq!(doc.text_content(root), "replacement");

        count.set(1);
        assert_eq!(runs.get(), 1, "the replaced tree's effects are disposed");
    }

    #[test]
    fn test_unmount_disposes_and_clears() {
        let (doc, root) = fixture();
        let open = signal(true);
        let cleanups = Rc::new(Cell::new(0));

        let cleanups_inner = cleanups.clone();
        render(
            &doc,
            root,
            View::when(open.clone(), move || {
                let cleanups = cleanups_inner.clone();
                on_cleanup(move || cleanups.set(cleanups.get() + 1));
                View::from("x")
            }),
        )
        .unwrap();

        unmount(&doc, root);
        assert_eq!(cleanups.get(), 1);
        assert_eq!(doc.markup(root), "<root></root>");
    }

    #[test]
    fn test_event_driven_counter() {
        let (doc, root) = fixture();
        let count = signal(0);

        let count_click = count.clone();
        let count_text = count.clone();
        render(
            &doc,
            root,
            el("button")
                .on("click", move |_: &Event| {
                    count_click.update(|n| n + 1);
                })
                .child(View::text(Source::from_fn(move || {
                    count_text.get().to_string()
                }))),
        )
        .unwrap();
        assert_eq!(doc.text_content(root), "0");

        let button = doc.children(root)[0];
        doc.dispatch(button, &Event::new("click"));
        doc.dispatch(button, &Event::new("click"));
        assert_eq!(doc.text_content(root), "2");
    }

    #[test]
    fn test_batched_writes_paint_once() {
        let (doc, root) = fixture();
        let first = signal(String::from("a"));
        let second = signal(String::from("b"));
        let paints = Rc::new(Cell::new(0));

        let (first_inner, second_inner, paints_inner) =
            (first.clone(), second.clone(), paints.clone());
        render(
            &doc,
            root,
            View::text(Source::from_fn(move || {
                paints_inner.set(paints_inner.get() + 1);
                format!("{}{}", first_inner.get(), second_inner.get())
            })),
        )
        .unwrap();
        assert_eq!(paints.get(), 1);

        batch(|| {
            first.set("x".to_string());
            second.set("y".to_string());
        });
        assert_eq!(doc.text_content(root), "xy");
        assert_eq!(paints.get(), 2, "two writes, one repaint");
    }
}
