//! Effect - the re-run side-effecting subscriber.
//!
//! An effect runs its closure once on creation and again whenever any cell
//! it read during its latest run changes. Before every run it releases the
//! previous run's subscriptions, so a branch change stops notifications from
//! cells that are no longer read.
//!
//! Effects created inside another effect's body, and cleanups registered
//! there, attach to the effect's own nested scope and are torn down with it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::batch;
use super::runtime::{self, Dependency, Dependent, Tracker};
use super::scope::{self, Scope};

// =============================================================================
// Effect
// =============================================================================

/// Handle to a running effect.
///
/// Dropping the handle does not stop the effect; its lifetime is governed by
/// the scope that owns it (or by [`dispose`](Effect::dispose)).
pub struct Effect {
    inner: Rc<EffectInner>,
}

pub(crate) struct EffectInner {
    id: u64,
    /// Taken while running so a self-disposal mid-run cannot re-enter it.
    func: RefCell<Option<Box<dyn FnMut()>>>,
    /// Cells read during the latest run.
    sources: RefCell<Vec<Rc<dyn Dependency>>>,
    /// Set while waiting in the pending queue; deduplicates a flush.
    queued: Cell<bool>,
    disposed: Cell<bool>,
    /// Owns nested effects and cleanups registered during runs.
    nested: Scope,
}

/// Create an effect and run it immediately.
///
/// The effect registers with the active scope (if any) so it is stopped when
/// that scope is cleared.
pub fn effect(f: impl FnMut() + 'static) -> Effect {
    let nested = Scope::new();
    let inner = Rc::new(EffectInner {
        id: runtime::next_id(),
        func: RefCell::new(Some(Box::new(f))),
        sources: RefCell::new(Vec::new()),
        queued: Cell::new(false),
        disposed: Cell::new(false),
        nested,
    });
    scope::register_effect(inner.clone());
    inner.run();
    Effect { inner }
}

impl Effect {
    /// Stop the effect: unsubscribe from every cell and drop its closure.
    /// It will never run again, even if former dependencies change.
    pub fn dispose(&self) {
        self.inner.stop();
    }
}

impl EffectInner {
    /// Execute one run: release stale subscriptions, then track a fresh set.
    pub(crate) fn run(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        self.release_sources();

        let Some(mut f) = self.func.borrow_mut().take() else {
            return;
        };
        let tracker: Rc<dyn Tracker> = self.clone();
        runtime::with_tracker(Some(tracker), || self.nested.run(|| f()));
        if !self.disposed.get() {
            *self.func.borrow_mut() = Some(f);
        }
    }

    pub(crate) fn stop(&self) {
        if self.disposed.get() {
            return;
        }
        self.disposed.set(true);
        self.release_sources();
        self.func.borrow_mut().take();
        self.nested.clear(false);
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub(crate) fn clear_queued(&self) {
        self.queued.set(false);
    }

    fn release_sources(&self) {
        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for source in sources {
            source.unsubscribe(self.id);
        }
    }
}

impl Dependent for EffectInner {
    fn id(&self) -> u64 {
        self.id
    }

    fn notify(self: Rc<Self>) {
        if self.disposed.get() || self.queued.get() {
            return;
        }
        self.queued.set(true);
        batch::schedule(self);
    }
}

impl Tracker for EffectInner {
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
