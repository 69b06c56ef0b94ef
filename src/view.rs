//! View tree - the declarative description the renderer consumes.
//!
//! A [`View`] is a one-shot value: building it allocates no host nodes and
//! runs no reactive code; the renderer walks it once, creates host nodes,
//! and wires effects for the reactive leaves. Dynamic behavior enters
//! through [`Source`] values (a static value or a reactive cell, behind one
//! type) and through the region constructors [`View::when`] and
//! [`View::index`].

use std::rc::Rc;

use indexmap::IndexMap;

use crate::host::{Event, NodeId};
use crate::props::Props;
use crate::reactive::derived::Derived;
use crate::reactive::runtime::untrack;
use crate::reactive::signal::{Signal, signal};

/// Inline style properties, in application order.
pub type StyleMap = IndexMap<String, String>;

/// Class names with an on/off flag each, in application order.
pub type ClassMap = IndexMap<String, bool>;

// =============================================================================
// Source
// =============================================================================

/// A value a view can consume either as a constant or as a live cell.
///
/// Reading through [`get`](Source::get) inside an effect subscribes it for
/// the reactive variants; the renderer checks [`is_reactive`] first and
/// skips effect creation entirely for static values.
///
/// [`is_reactive`]: Source::is_reactive
pub enum Source<T: 'static> {
    Static(T),
    Signal(Signal<T>),
    Derived(Derived<T>),
    Getter(Rc<dyn Fn() -> T>),
}

impl<T: Clone + 'static> Source<T> {
    /// Wrap a closure; it is re-evaluated on every read and tracked like
    /// any other reactive read.
    pub fn from_fn(f: impl Fn() -> T + 'static) -> Source<T> {
        Source::Getter(Rc::new(f))
    }

    /// Read the current value, tracked.
    pub fn get(&self) -> T {
        match self {
            Source::Static(value) => value.clone(),
            Source::Signal(cell) => cell.get(),
            Source::Derived(cell) => cell.get(),
            Source::Getter(f) => f(),
        }
    }

    /// Read the current value without subscribing.
    pub fn peek(&self) -> T {
        match self {
            Source::Static(value) => value.clone(),
            Source::Signal(cell) => cell.peek(),
            Source::Derived(cell) => cell.peek(),
            Source::Getter(f) => untrack(|| f()),
        }
    }

    /// Whether reads can ever observe a change.
    pub fn is_reactive(&self) -> bool {
        !matches!(self, Source::Static(_))
    }
}

impl<T: Clone + 'static> Clone for Source<T> {
    fn clone(&self) -> Self {
        match self {
            Source::Static(value) => Source::Static(value.clone()),
            Source::Signal(cell) => Source::Signal(cell.clone()),
            Source::Derived(cell) => Source::Derived(cell.clone()),
            Source::Getter(f) => Source::Getter(f.clone()),
        }
    }
}

impl<T: 'static> From<Signal<T>> for Source<T> {
    fn from(cell: Signal<T>) -> Self {
        Source::Signal(cell)
    }
}

impl<T: 'static> From<Derived<T>> for Source<T> {
    fn from(cell: Derived<T>) -> Self {
        Source::Derived(cell)
    }
}

impl From<&str> for Source<String> {
    fn from(value: &str) -> Self {
        Source::Static(value.to_string())
    }
}

impl From<String> for Source<String> {
    fn from(value: String) -> Self {
        Source::Static(value)
    }
}

impl From<&str> for Source<Option<String>> {
    fn from(value: &str) -> Self {
        Source::Static(Some(value.to_string()))
    }
}

impl From<String> for Source<Option<String>> {
    fn from(value: String) -> Self {
        Source::Static(Some(value))
    }
}

impl From<Signal<String>> for Source<Option<String>> {
    fn from(cell: Signal<String>) -> Self {
        Source::Getter(Rc::new(move || Some(cell.get())))
    }
}

impl From<Derived<String>> for Source<Option<String>> {
    fn from(cell: Derived<String>) -> Self {
        Source::Getter(Rc::new(move || Some(cell.get())))
    }
}

impl From<bool> for Source<bool> {
    fn from(value: bool) -> Self {
        Source::Static(value)
    }
}

impl<T: 'static> From<Vec<T>> for Source<Vec<T>> {
    fn from(value: Vec<T>) -> Self {
        Source::Static(value)
    }
}

impl From<StyleMap> for Source<StyleMap> {
    fn from(value: StyleMap) -> Self {
        Source::Static(value)
    }
}

impl From<ClassMap> for Source<ClassMap> {
    fn from(value: ClassMap) -> Self {
        Source::Static(value)
    }
}

// =============================================================================
// View
// =============================================================================

/// A node of the declarative tree handed to [`render`](crate::render::render).
pub enum View {
    /// Renders nothing.
    Empty,
    /// A text node; reactive sources keep it updated in place.
    Text(Source<String>),
    /// A flat run of sibling views.
    Many(Vec<View>),
    /// A host element with properties and children.
    Element(ElementNode),
    /// A component body, invoked once (untracked) at mount.
    Component(Box<dyn FnOnce() -> View>),
    /// Escape hatch: receives the nearest enclosing host element at mount.
    Attach(Box<dyn FnOnce(NodeId)>),
    /// A conditional region (see [`View::when`]).
    When(ConditionalNode),
    /// An index-reconciled list region (see [`View::index`]).
    IndexList(ListIndexNode),
    /// Reserved; the renderer reports it as unsupported.
    KeyedList(ListKeyedNode),
}

/// A conditional region: content keyed by the probe so equal keys skip the
/// rebuild.
pub struct ConditionalNode {
    pub(crate) reactive: bool,
    pub(crate) probe: Box<dyn FnMut() -> CondUpdate>,
}

/// Outcome of one conditional probe.
pub(crate) enum CondUpdate {
    /// Key unchanged; keep current content.
    Unchanged,
    /// Key changed to a rendering one; dispose and build this content.
    Mount(Box<dyn FnOnce() -> View>),
    /// Key changed to a non-rendering one; dispose current content.
    Unmount,
}

pub struct ListIndexNode {
    pub(crate) body: ListBody,
}

pub(crate) enum ListBody {
    Static {
        thunks: Vec<Box<dyn FnOnce() -> View>>,
        fallback: Option<Box<View>>,
    },
    Reactive {
        driver: Box<dyn FnMut(&mut dyn ListSlots)>,
    },
}

/// Renderer-side slot operations a list driver issues while syncing its
/// slot set to the source items.
pub(crate) trait ListSlots {
    fn append(&mut self, build: Box<dyn FnOnce() -> View>);
    fn truncate(&mut self, keep: usize);
}

pub struct ListKeyedNode;

impl View {
    /// A text view over a static string or a live cell.
    pub fn text(value: impl Into<Source<String>>) -> View {
        View::Text(value.into())
    }

    /// A component boundary. The body runs exactly once, untracked, when
    /// the view mounts; reactivity inside it comes from the regions and
    /// sources it returns, never from re-running the body.
    pub fn component(build: impl FnOnce() -> View + 'static) -> View {
        View::Component(Box::new(build))
    }

    /// Receive the host element this view mounts into. Runs once.
    pub fn attach(f: impl FnOnce(NodeId) + 'static) -> View {
        View::Attach(Box::new(f))
    }

    /// A conditional region over a boolean condition.
    ///
    /// While the condition is true the region shows `content`; while false
    /// it is empty. The region keys on the boolean itself, so writes that
    /// leave the condition's truth unchanged never rebuild the content.
    pub fn when(cond: impl Into<Source<bool>>, content: impl Fn() -> View + 'static) -> View {
        let source = cond.into();
        let reactive = source.is_reactive();
        let content = Rc::new(content);
        let mut prev: Option<bool> = None;
        View::When(ConditionalNode {
            reactive,
            probe: Box::new(move || {
                let now = source.get();
                if prev == Some(now) {
                    return CondUpdate::Unchanged;
                }
                prev = Some(now);
                if now {
                    let content = content.clone();
                    CondUpdate::Mount(Box::new(move || content()))
                } else {
                    CondUpdate::Unmount
                }
            }),
        })
    }

    /// A conditional region over an optional value.
    ///
    /// `Some(v)` shows `content(v)`, `None` shows nothing. The region keys
    /// on the value: a write producing an equal `Some` keeps the existing
    /// content, a different `Some` disposes and rebuilds it.
    pub fn when_some<T>(
        source: impl Into<Source<Option<T>>>,
        content: impl Fn(T) -> View + 'static,
    ) -> View
    where
        T: Clone + PartialEq + 'static,
    {
        let source = source.into();
        let reactive = source.is_reactive();
        let content = Rc::new(content);
        let mut prev: Option<Option<T>> = None;
        View::When(ConditionalNode {
            reactive,
            probe: Box::new(move || {
                let now = source.get();
                if prev.as_ref() == Some(&now) {
                    return CondUpdate::Unchanged;
                }
                prev = Some(now.clone());
                match now {
                    Some(value) => {
                        let content = content.clone();
                        CondUpdate::Mount(Box::new(move || content(value)))
                    }
                    None => CondUpdate::Unmount,
                }
            }),
        })
    }

    /// An index-reconciled list region.
    ///
    /// Each position gets one slot holding a signal of the item at that
    /// index. When the source changes, positions shared with the previous
    /// run receive the new item through their slot signal (reusing the
    /// slot's host nodes), positions past the old length append new slots,
    /// and a shorter list truncates trailing slots. `item` runs once per
    /// slot, untracked; read the provided signal for per-item reactivity.
    pub fn index<T>(
        source: impl Into<Source<Vec<T>>>,
        item: impl Fn(Signal<T>, usize) -> View + 'static,
    ) -> View
    where
        T: Clone + PartialEq + 'static,
    {
        index_list(source.into(), Rc::new(item), None)
    }

    /// [`index`](View::index) with a fallback shown when a static source is
    /// empty. A reactive source renders empty instead; its emptiness is
    /// transient state, not a structural alternative.
    pub fn index_or<T>(
        source: impl Into<Source<Vec<T>>>,
        item: impl Fn(Signal<T>, usize) -> View + 'static,
        fallback: impl Into<View>,
    ) -> View
    where
        T: Clone + PartialEq + 'static,
    {
        index_list(source.into(), Rc::new(item), Some(Box::new(fallback.into())))
    }

    /// A key-reconciled list region. Not implemented: rendering one fails
    /// with [`RenderError::KeyedListUnsupported`].
    ///
    /// [`RenderError::KeyedListUnsupported`]: crate::error::RenderError::KeyedListUnsupported
    pub fn keyed<T, K>(
        _source: impl Into<Source<Vec<T>>>,
        _key: impl Fn(&T) -> K + 'static,
        _item: impl Fn(T) -> View + 'static,
    ) -> View
    where
        T: Clone + 'static,
        K: 'static,
    {
        View::KeyedList(ListKeyedNode)
    }
}

fn index_list<T>(
    source: Source<Vec<T>>,
    item: Rc<dyn Fn(Signal<T>, usize) -> View>,
    fallback: Option<Box<View>>,
) -> View
where
    T: Clone + PartialEq + 'static,
{
    if !source.is_reactive() {
        let thunks: Vec<Box<dyn FnOnce() -> View>> = source
            .peek()
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let item = item.clone();
                Box::new(move || item(signal(value), index)) as Box<dyn FnOnce() -> View>
            })
            .collect();
        return View::IndexList(ListIndexNode {
            body: ListBody::Static { thunks, fallback },
        });
    }

    let mut cells: Vec<Signal<T>> = Vec::new();
    let driver = Box::new(move |slots: &mut dyn ListSlots| {
        let items = source.get();
        let shared = cells.len().min(items.len());

        // Snapshot the reused handles before writing through them; a write
        // may run effects that change this list again.
        let reused: Vec<Signal<T>> = cells[..shared].to_vec();
        for (cell, value) in reused.into_iter().zip(items.iter()) {
            cell.set(value.clone());
        }

        for (index, value) in items.iter().enumerate().skip(shared) {
            let cell = signal(value.clone());
            cells.push(cell.clone());
            let item = item.clone();
            slots.append(Box::new(move || item(cell, index)));
        }

        if items.len() < cells.len() {
            cells.truncate(items.len());
            slots.truncate(items.len());
        }
    });
    View::IndexList(ListIndexNode {
        body: ListBody::Reactive { driver },
    })
}

impl Default for View {
    fn default() -> Self {
        View::Empty
    }
}

impl From<()> for View {
    fn from(_: ()) -> Self {
        View::Empty
    }
}

impl From<&str> for View {
    fn from(value: &str) -> Self {
        View::Text(Source::Static(value.to_string()))
    }
}

impl From<String> for View {
    fn from(value: String) -> Self {
        View::Text(Source::Static(value))
    }
}

impl From<Signal<String>> for View {
    fn from(cell: Signal<String>) -> Self {
        View::Text(Source::Signal(cell))
    }
}

impl From<Derived<String>> for View {
    fn from(cell: Derived<String>) -> Self {
        View::Text(Source::Derived(cell))
    }
}

macro_rules! impl_view_from_display {
    ($($t:ty),*) => {
        $(impl From<$t> for View {
            fn from(value: $t) -> Self {
                View::Text(Source::Static(value.to_string()))
            }
        })*
    };
}

impl_view_from_display!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize, f32, f64);

impl From<Vec<View>> for View {
    fn from(children: Vec<View>) -> Self {
        View::Many(children)
    }
}

impl From<ElementNode> for View {
    fn from(node: ElementNode) -> Self {
        View::Element(node)
    }
}

// =============================================================================
// Element builder
// =============================================================================

/// Builder for a host element view. Start with [`el`], chain properties
/// and children, and it converts into a [`View`] where one is expected.
pub struct ElementNode {
    pub(crate) tag: String,
    pub(crate) props: Props,
    pub(crate) children: Vec<View>,
}

/// Start building an element with the given tag.
pub fn el(tag: &str) -> ElementNode {
    ElementNode {
        tag: tag.to_string(),
        props: Props::new(),
        children: Vec::new(),
    }
}

impl ElementNode {
    /// Set an attribute. A reactive source keeps it synced; a `None` value
    /// removes the attribute.
    pub fn attr(mut self, name: &str, value: impl Into<Source<Option<String>>>) -> Self {
        self.props.attrs.push((name.to_string(), value.into()));
        self
    }

    /// Set one static inline style property.
    pub fn style(mut self, name: &str, value: &str) -> Self {
        self.props
            .static_styles
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Bind the element's dynamic style set to a source of property maps.
    /// Properties missing from a later map are unset; static properties set
    /// via [`style`](Self::style) are untouched unless the map names them.
    pub fn styles(mut self, styles: impl Into<Source<StyleMap>>) -> Self {
        self.props.styles = Some(styles.into());
        self
    }

    /// Add a static class.
    pub fn class(mut self, name: &str) -> Self {
        self.props.static_classes.push(name.to_string());
        self
    }

    /// Bind the element's dynamic class set to a source of class maps.
    pub fn classes(mut self, classes: impl Into<Source<ClassMap>>) -> Self {
        self.props.classes = Some(classes.into());
        self
    }

    /// Attach an event listener.
    pub fn on(mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.props
            .listeners
            .push((event.to_string(), Rc::new(handler)));
        self
    }

    /// Append one child view.
    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several child views.
    pub fn children(mut self, children: Vec<View>) -> Self {
        self.children.extend(children);
        self
    }
}
