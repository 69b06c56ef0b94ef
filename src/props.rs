//! Property binding - wiring element properties to host nodes.
//!
//! Static values apply once at mount; reactive sources get one effect each,
//! owned by the scope active at bind time, so a region teardown silences
//! them. Dynamic style and class maps are diffed against the previously
//! applied map (kept in a side table keyed by node): keys missing from the
//! new map are unset, keys with an unchanged value are left alone.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::host::{Document, Listener, NodeId};
use crate::reactive::effect::effect;
use crate::reactive::scope::on_cleanup;
use crate::view::{ClassMap, Source, StyleMap};

pub(crate) struct Props {
    pub(crate) attrs: Vec<(String, Source<Option<String>>)>,
    pub(crate) static_styles: StyleMap,
    pub(crate) styles: Option<Source<StyleMap>>,
    pub(crate) static_classes: Vec<String>,
    pub(crate) classes: Option<Source<ClassMap>>,
    pub(crate) listeners: Vec<(String, Listener)>,
}

impl Props {
    pub(crate) fn new() -> Props {
        Props {
            attrs: Vec::new(),
            static_styles: StyleMap::new(),
            styles: None,
            static_classes: Vec::new(),
            classes: None,
            listeners: Vec::new(),
        }
    }
}

thread_local! {
    /// Last-applied dynamic style map per node, for diffing. Keyed by
    /// arena identity plus node: bare node keys repeat across documents.
    static STYLE_CACHE: RefCell<HashMap<(u64, NodeId), StyleMap>> =
        RefCell::new(HashMap::new());

    /// Last-applied dynamic class map per node, for diffing.
    static CLASS_CACHE: RefCell<HashMap<(u64, NodeId), ClassMap>> =
        RefCell::new(HashMap::new());
}

/// Apply `props` to `node`. Reactive bindings attach their effects to the
/// currently active scope.
pub(crate) fn bind(doc: &Document, node: NodeId, props: Props) {
    let Props {
        attrs,
        static_styles,
        styles,
        static_classes,
        classes,
        listeners,
    } = props;

    for (event, listener) in listeners {
        doc.add_listener(node, &event, listener);
    }
    for (name, value) in static_styles {
        doc.set_style(node, &name, Some(&value));
    }
    for name in static_classes {
        doc.toggle_class(node, &name, true);
    }

    for (name, source) in attrs {
        if source.is_reactive() {
            let doc = doc.clone();
            effect(move || {
                let value = source.get();
                doc.set_attribute(node, &name, value.as_deref());
            });
        } else if let Some(value) = source.peek() {
            doc.set_attribute(node, &name, Some(&value));
        }
    }

    if let Some(source) = styles {
        bind_styles(doc, node, source);
    }
    if let Some(source) = classes {
        bind_classes(doc, node, source);
    }
}

fn bind_styles(doc: &Document, node: NodeId, source: Source<StyleMap>) {
    if !source.is_reactive() {
        for (name, value) in source.peek() {
            doc.set_style(node, &name, Some(&value));
        }
        return;
    }
    let key = (doc.id(), node);
    let doc = doc.clone();
    effect(move || {
        let next = source.get();
        apply_styles(&doc, node, next);
    });
    on_cleanup(move || {
        STYLE_CACHE.with_borrow_mut(|cache| {
            cache.remove(&key);
        });
    });
}

fn apply_styles(doc: &Document, node: NodeId, next: StyleMap) {
    STYLE_CACHE.with_borrow_mut(|cache| {
        let prev = cache.remove(&(doc.id(), node)).unwrap_or_default();
        for name in prev.keys() {
            if !next.contains_key(name) {
                doc.set_style(node, name, None);
            }
        }
        for (name, value) in &next {
            if prev.get(name) != Some(value) {
                doc.set_style(node, name, Some(value));
            }
        }
        cache.insert((doc.id(), node), next);
    });
}

fn bind_classes(doc: &Document, node: NodeId, source: Source<ClassMap>) {
    if !source.is_reactive() {
        for (name, on) in source.peek() {
            doc.toggle_class(node, &name, on);
        }
        return;
    }
    let key = (doc.id(), node);
    let doc = doc.clone();
    effect(move || {
        let next = source.get();
        apply_classes(&doc, node, next);
    });
    on_cleanup(move || {
        CLASS_CACHE.with_borrow_mut(|cache| {
            cache.remove(&key);
        });
    });
}

fn apply_classes(doc: &Document, node: NodeId, next: ClassMap) {
    CLASS_CACHE.with_borrow_mut(|cache| {
        let prev = cache.remove(&(doc.id(), node)).unwrap_or_default();
        for (name, &was_on) in &prev {
            if was_on && !next.contains_key(name) {
                doc.toggle_class(node, name, false);
            }
        }
        for (name, &on) in &next {
            if prev.get(name) != Some(&on) {
                doc.toggle_class(node, name, on);
            }
        }
        cache.insert((doc.id(), node), next);
    });
}
