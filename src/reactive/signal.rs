//! Signal - the mutable reactive cell.
//!
//! A [`Signal`] is an identity-bearing container: cloning the handle clones
//! a reference to the same cell. Reading it inside an effect or derived cell
//! subscribes that context; writing it notifies current dependents unless
//! the new value is equal to the old one under the configured equality
//! (default: `PartialEq`).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::batch;
use super::runtime::{self, Dependency, Dependent};

// =============================================================================
// Signal
// =============================================================================

/// A mutable reactive memory cell.
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal {
            inner: self.inner.clone(),
        }
    }
}

pub(crate) struct SignalInner<T> {
    value: RefCell<T>,
    /// Bumped on every accepted write; used to observe staleness in tests
    /// and diagnostics.
    version: Cell<u64>,
    equals: Box<dyn Fn(&T, &T) -> bool>,
    /// Dependents in registration order. Snapshotted before notification so
    /// an effect that subscribes mid-flush cannot corrupt the traversal.
    subscribers: RefCell<Vec<Rc<dyn Dependent>>>,
}

/// Create a signal with `PartialEq` equality.
pub fn signal<T: Clone + PartialEq + 'static>(initial: T) -> Signal<T> {
    signal_with_equals(initial, |a, b| a == b)
}

/// Create a signal with a custom equality predicate.
///
/// Writes of a value equal to the current one are no-ops: no version bump,
/// no notification.
pub fn signal_with_equals<T: Clone + 'static>(
    initial: T,
    equals: impl Fn(&T, &T) -> bool + 'static,
) -> Signal<T> {
    Signal {
        inner: Rc::new(SignalInner {
            value: RefCell::new(initial),
            version: Cell::new(0),
            equals: Box::new(equals),
            subscribers: RefCell::new(Vec::new()),
        }),
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Read the current value.
    ///
    /// If called while an effect or derived cell is executing, that context
    /// is registered as a dependent of this cell (and the cell is recorded
    /// in the context's read set, so it can unsubscribe later).
    pub fn get(&self) -> T {
        self.inner.track();
        self.inner.value.borrow().clone()
    }

    /// Read without registering a dependency.
    ///
    /// Escape hatch for code that needs the current state but must not
    /// subscribe, e.g. event handlers deciding what to write.
    pub fn peek(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Write a new value, notifying dependents if it differs from the
    /// current one under the configured equality.
    ///
    /// Inside a [`batch`](super::batch::batch), the value and version update
    /// immediately (reads observe the new value) but dependent effects run
    /// once, at the close of the outermost batch.
    pub fn set(&self, next: T) {
        {
            let current = self.inner.value.borrow();
            if (self.inner.equals)(&current, &next) {
                return;
            }
        }
        *self.inner.value.borrow_mut() = next;
        self.inner.version.set(self.inner.version.get() + 1);

        let dependents: Vec<Rc<dyn Dependent>> = self.inner.subscribers.borrow().clone();
        // One coalesced flush per write: every dependent is enqueued before
        // the first effect runs, in registration order.
        batch::batch(|| {
            for dependent in dependents {
                dependent.notify();
            }
        });
    }

    /// Read-modify-write through the same equality-gated [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow().clone());
        self.set(next);
    }

    /// The write generation of this cell.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }
}

impl<T: 'static> SignalInner<T> {
    /// Subscribe the active tracking context, if any, with bidirectional
    /// bookkeeping. Repeated reads within one run subscribe once.
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
}

impl<T: 'static> Dependency for SignalInner<T> {
    fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|d| d.id() != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect::effect;
    use std::cell::Cell;

    #[test]
    fn test_get_set_roundtrip() {
        let count = signal(1);
        assert_eq!(count.get(), 1);
        count.set(5);
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_equal_write_is_a_no_op() {
        let count = signal(3);
        let runs = Rc::new(Cell::new(0));

        let runs_inner = runs.clone();
        let count_inner = count.clone();
        let _e = effect(move || {
            count_inner.get();
            runs_inner.set(runs_inner.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        let version = count.version();
        count.set(3);
        assert_eq!(runs.get(), 1, "writing the held value must not notify");
        assert_eq!(count.version(), version, "no-op write must not bump the version");
    }

    #[test]
    fn test_peek_does_not_subscribe() {
        let count = signal(0);
        let runs = Rc::new(Cell::new(0));

        let runs_inner = runs.clone();
        let count_inner = count.clone();
        let _e = effect(move || {
            count_inner.peek();
            runs_inner.set(runs_inner.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        count.set(7);
        assert_eq!(runs.get(), 1, "peek must not register a dependency");
    }

    #[test]
    fn test_custom_equality() {
        // Treat values as equal when their parity matches.
        let parity = signal_with_equals(2, |a: &i32, b: &i32| a % 2 == b % 2);
        let runs = Rc::new(Cell::new(0));

        let runs_inner = runs.clone();
        let parity_inner = parity.clone();
        let _e = effect(move || {
            parity_inner.get();
            runs_inner.set(runs_inner.get() + 1);
        });

        parity.set(4);
        assert_eq!(runs.get(), 1, "same parity should short-circuit");
        parity.set(5);
        assert_eq!(runs.get(), 2, "parity change should notify");
    }

    #[test]
    fn test_update_goes_through_equality_gate() {
        let count = signal(10);
        count.update(|n| n + 1);
        assert_eq!(count.get(), 11);

        let version = count.version();
        count.update(|n| *n);
        assert_eq!(count.version(), version);
    }

    #[test]
    fn test_version_bumps_on_accepted_writes() {
        let count = signal(0);
        let v0 = count.version();
        count.set(1);
        count.set(2);
        assert_eq!(count.version(), v0 + 2);
    }
}
