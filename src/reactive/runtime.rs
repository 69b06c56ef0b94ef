//! Tracking runtime - the "who is currently reading" machinery.
//!
//! Dependency tracking needs one piece of ambient state: the tracking
//! context (effect or derived cell) that is currently executing. It is kept
//! as an explicit thread-local stack with push/pop save-and-restore around
//! every nested execution, so re-entrant and nested runs cannot corrupt each
//! other's tracking sets. An [`untrack`] window pushes a `None` entry, which
//! shadows any outer context without discarding it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

// =============================================================================
// Runtime State
// =============================================================================

thread_local! {
    /// Stack of active tracking contexts. `None` entries are untracked
    /// windows opened by [`untrack`].
    static TRACKERS: RefCell<Vec<Option<Rc<dyn Tracker>>>> = const { RefCell::new(Vec::new()) };

    /// Monotonic id source for cells, effects, and scopes.
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Allocate a unique id.
pub(crate) fn next_id() -> u64 {
    let id = NEXT_ID.get();
    NEXT_ID.set(id + 1);
    id
}

// =============================================================================
// Tracking Protocol
// =============================================================================

/// A cell that dependents can later unsubscribe from.
///
/// Implemented by signal and derived internals; an observer records one
/// handle per cell read during its latest run, and releases them all before
/// the next run (the unsubscribe-then-resubscribe discipline).
pub(crate) trait Dependency {
    /// Remove the dependent with the given id from this cell's subscriber
    /// list. Absent ids are ignored.
    fn unsubscribe(&self, id: u64);
}

/// Something a cell notifies when it changes.
pub(crate) trait Dependent {
    fn id(&self) -> u64;

    /// Upstream changed. Effects schedule themselves; derived cells mark
    /// themselves dirty and propagate to their own dependents.
    fn notify(self: Rc<Self>);
}

/// An executing context that records the cells it reads.
pub(crate) trait Tracker {
    fn id(&self) -> u64;

    /// Record a cell read during the current run.
    fn record(&self, dependency: Rc<dyn Dependency>);

    fn as_dependent(self: Rc<Self>) -> Rc<dyn Dependent>;
}

/// The innermost tracking context, if reads should currently subscribe.
pub(crate) fn active_tracker() -> Option<Rc<dyn Tracker>> {
    TRACKERS.with_borrow(|stack| stack.last().cloned().flatten())
}

/// Run `f` with `tracker` as the active tracking context.
pub(crate) fn with_tracker<R>(tracker: Option<Rc<dyn Tracker>>, f: impl FnOnce() -> R) -> R {
    TRACKERS.with_borrow_mut(|stack| stack.push(tracker));
    let result = f();
    TRACKERS.with_borrow_mut(|stack| {
        stack.pop();
    });
    result
}

/// Run `f` with dependency tracking suspended.
///
/// Reads inside `f` return current values without registering the caller as
/// a dependent. The renderer uses this when invoking user callbacks (component
/// bodies, branch and item builders) whose reads must not become reactive
/// subscriptions of the surrounding region effect.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    with_tracker(None, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = next_id();
        let b = next_id();
        assert!(b > a, "ids must increase monotonically");
    }

    #[test]
    fn test_no_tracker_by_default() {
        assert!(
            active_tracker().is_none(),
            "nothing should be tracking outside an effect"
        );
    }

    #[test]
    fn test_untrack_shadows_and_restores() {
        // An untracked window must report no tracker, and the stack must be
        // balanced afterwards.
        untrack(|| {
            assert!(active_tracker().is_none());
            untrack(|| assert!(active_tracker().is_none()));
        });
        assert!(active_tracker().is_none());
    }
}
