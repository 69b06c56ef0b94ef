//! Derived - the lazily-recomputed reactive cell.
//!
//! A [`Derived`] wraps a pure computation over other cells. It memoizes its
//! last value and recomputes only when read after a dependency changed
//! (pull-based): upstream notifications mark it dirty and propagate
//! dirtiness to its own dependents, but never recompute eagerly, so derived
//! values that are not read during a pass cost nothing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::runtime::{self, Dependency, Dependent, Tracker};

// =============================================================================
// Derived
// =============================================================================

/// A memoized, lazily-recomputed function of other cells.
pub struct Derived<T: 'static> {
    inner: Rc<DerivedInner<T>>,
}

impl<T: 'static> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Derived {
            inner: self.inner.clone(),
        }
    }
}

pub(crate) struct DerivedInner<T> {
    id: u64,
    compute: RefCell<Box<dyn FnMut() -> T>>,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    version: Cell<u64>,
    /// Cells read during the latest recomputation.
    sources: RefCell<Vec<Rc<dyn Dependency>>>,
    /// Downstream dependents, in registration order.
    subscribers: RefCell<Vec<Rc<dyn Dependent>>>,
}

/// Create a derived cell over `compute`.
///
/// The computation runs inside a fresh tracking context each time, so a
/// dependency set that changes between runs (conditional reads) is released
/// and re-registered exactly like an effect's.
pub fn derived<T: 'static>(compute: impl FnMut() -> T + 'static) -> Derived<T> {
    Derived {
        inner: Rc::new(DerivedInner {
            id: runtime::next_id(),
            compute: RefCell::new(Box::new(compute)),
            value: RefCell::new(None),
            dirty: Cell::new(true),
            version: Cell::new(0),
            sources: RefCell::new(Vec::new()),
            subscribers: RefCell::new(Vec::new()),
        }),
    }
}

/// Alias for [`derived`].
pub fn computed<T: 'static>(compute: impl FnMut() -> T + 'static) -> Derived<T> {
    derived(compute)
}

/// Alias for [`derived`].
pub fn readable<T: 'static>(compute: impl FnMut() -> T + 'static) -> Derived<T> {
    derived(compute)
}

impl<T: Clone + 'static> Derived<T> {
    /// Read the derived value, recomputing it first if a dependency changed
    /// since the last read.
    ///
    /// Subscribes the active tracking context the same way a signal read
    /// does.
    pub fn get(&self) -> T {
        self.inner.track();
        self.inner.ensure();
        self.inner.cached()
    }

    /// Read without registering a dependency. Still recomputes if stale, so
    /// the returned value is never out of date.
    pub fn peek(&self) -> T {
        self.inner.ensure();
        self.inner.cached()
    }

    /// The recompute generation of this cell.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }
}

impl<T: Clone + 'static> DerivedInner<T> {
    fn cached(&self) -> T {
        match &*self.value.borrow() {
            Some(value) => value.clone(),
            // ensure() ran just before; the cache is populated.
            None => unreachable!("derived cache must be populated after ensure()"),
        }
    }
}

impl<T: 'static> DerivedInner<T> {
    fn track(self: &Rc<Self>) {
        if let Some(tracker) = runtime::active_tracker() {
            let id = tracker.id();
            let newly_subscribed = {
                let mut subscribers = self.subscribers.borrow_mut();
                if subscribers.iter().any(|d| d.id() == id) {
                    false
                } else {
                    subscribers.push(tracker.clone().as_dependent());
                    true
                }
            };
            if newly_subscribed {
                tracker.record(self.clone() as Rc<dyn Dependency>);
            }
        }
    }

    /// Recompute if dirty, releasing the previous run's subscriptions first.
    fn ensure(self: &Rc<Self>) {
        if !self.dirty.get() {
            return;
        }
        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for source in sources {
            source.unsubscribe(self.id);
        }

        let tracker: Rc<dyn Tracker> = self.clone();
        let value = runtime::with_tracker(Some(tracker), || (self.compute.borrow_mut())());
        *self.value.borrow_mut() = Some(value);
        self.dirty.set(false);
        self.version.set(self.version.get() + 1);
    }
}

impl<T: 'static> Dependency for DerivedInner<T> {
    fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|d| d.id() != id);
    }
}

impl<T: 'static> Dependent for DerivedInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    /// Upstream changed: mark dirty and pass the notification downstream
    /// without recomputing. The dirty flag deduplicates cascades when
    /// several dependencies change in one pass.
    fn notify(self: Rc<Self>) {
        if self.dirty.get() {
            return;
        }
        self.dirty.set(true);
        let dependents: Vec<Rc<dyn Dependent>> = self.subscribers.borrow().clone();
        for dependent in dependents {
            dependent.notify();
        }
    }
}

impl<T: 'static> Tracker for DerivedInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn record(&self, dependency: Rc<dyn Dependency>) {
        self.sources.borrow_mut().push(dependency);
    }

    fn as_dependent(self: Rc<Self>) -> Rc<dyn Dependent> {
        self
    }
}
