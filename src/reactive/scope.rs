//! Scope - the ownership tree governing effect and cleanup lifetime.
//!
//! Scopes form a tree: each scope owns its child scopes, its effects, and an
//! ordered list of cleanup callbacks. Clearing a scope tears everything down
//! depth-first (children, then effects, then cleanups) and is idempotent, so
//! a parent-driven and an independent disposal may overlap safely.
//!
//! A scope holds only a weak reference to its parent - it never extends the
//! parent's lifetime - while the parent's child list is the owning edge.
//! The renderer clears a region's scope with `from_parent = true` and keeps
//! rebuilding into the same scope; list slots removed independently clear
//! with `from_parent = false`, which detaches them from the parent so a
//! later parent teardown cannot double-clear them.

use std::cell::RefCell;
use std::mem;
use std::rc::{Rc, Weak};

use super::effect::EffectInner;
use super::runtime;

// =============================================================================
// Scope
// =============================================================================

/// An ownership node for effects, cleanups, and sub-scopes.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

pub(crate) struct ScopeInner {
    id: u64,
    parent: RefCell<Weak<ScopeInner>>,
    children: RefCell<Vec<Rc<ScopeInner>>>,
    effects: RefCell<Vec<Rc<EffectInner>>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
}

thread_local! {
    /// Stack of scopes entered via [`Scope::run`].
    static ACTIVE: RefCell<Vec<Rc<ScopeInner>>> = const { RefCell::new(Vec::new()) };
}

/// Create a scope owned by the currently active scope (see [`Scope::new`]).
pub fn scope() -> Scope {
    Scope::new()
}

impl Scope {
    /// Create a scope. If another scope is currently active it becomes the
    /// parent and owner; otherwise the scope is a root.
    pub fn new() -> Scope {
        let scope = Scope::detached();
        if let Some(parent) = ACTIVE.with_borrow(|stack| stack.last().cloned()) {
            adopt(&parent, &scope.inner);
        }
        scope
    }

    /// Create a root scope, ignoring any active scope.
    pub fn detached() -> Scope {
        Scope {
            inner: Rc::new(ScopeInner {
                id: runtime::next_id(),
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                effects: RefCell::new(Vec::new()),
                cleanups: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create a child scope owned by `self`, regardless of which scope is
    /// active.
    pub fn child(&self) -> Scope {
        let child = Scope::detached();
        adopt(&self.inner, &child.inner);
        child
    }

    /// Run `f` with this scope as the active owner: effects and cleanups
    /// registered by `f` attach here rather than to whatever scope was
    /// previously active.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        ACTIVE.with_borrow_mut(|stack| stack.push(self.inner.clone()));
        let result = f();
        ACTIVE.with_borrow_mut(|stack| {
            stack.pop();
        });
        result
    }

    /// Dispose everything this scope owns: child scopes depth-first, then
    /// effects, then cleanup callbacks in registration order.
    ///
    /// `from_parent` marks a parent-driven clear: the scope skips detaching
    /// itself from the parent's child list (the parent is discarding that
    /// list wholesale, or intends to keep rebuilding into this scope). An
    /// independent clear (`from_parent = false`) detaches, so the parent
    /// cannot later double-clear a scope that no longer exists logically.
    ///
    /// Clearing twice is a safe no-op, and a cleared scope may be reused:
    /// new effects and cleanups attach as before.
    pub fn clear(&self, from_parent: bool) {
        self.inner.clear(from_parent);
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::new()
    }
}

impl ScopeInner {
    fn clear(self: &Rc<Self>, from_parent: bool) {
        let children = mem::take(&mut *self.children.borrow_mut());
        for child in children {
            child.clear(true);
        }

        let effects = mem::take(&mut *self.effects.borrow_mut());
        for effect in effects {
            effect.stop();
        }

        let cleanups = mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }

        if !from_parent {
            if let Some(parent) = self.parent.borrow().upgrade() {
                parent.children.borrow_mut().retain(|c| c.id != self.id);
            }
        }
    }
}

fn adopt(parent: &Rc<ScopeInner>, child: &Rc<ScopeInner>) {
    *child.parent.borrow_mut() = Rc::downgrade(parent);
    parent.children.borrow_mut().push(child.clone());
}

/// Register a cleanup callback on the active scope. It runs once, when that
/// scope is cleared. Outside any scope the callback can never run and is
/// dropped with a warning.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    match ACTIVE.with_borrow(|stack| stack.last().cloned()) {
        Some(scope) => scope.cleanups.borrow_mut().push(Box::new(f)),
        None => {
            tracing::warn!("cleanup registered outside of a scope will never run");
        }
    }
}

/// Attach an effect to the active scope, if any. Unowned effects live for as
/// long as they stay subscribed (or until disposed through their handle).
pub(crate) fn register_effect(effect: Rc<EffectInner>) {
    if let Some(scope) = ACTIVE.with_borrow(|stack| stack.last().cloned()) {
        scope.effects.borrow_mut().push(effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect::effect;
    use crate::reactive::signal::signal;
    use std::cell::Cell;

    #[test]
    fn test_teardown_cascade_depth_first() {
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let parent = Scope::detached();

        parent.run(|| {
            let first = Scope::new();
            first.run(|| {
                let order = order.clone();
                on_cleanup(move || order.borrow_mut().push("first child"));
            });

            let second = Scope::new();
            second.run(|| {
                let order = order.clone();
                on_cleanup(move || order.borrow_mut().push("second child"));
            });

            let order = order.clone();
            on_cleanup(move || order.borrow_mut().push("parent"));
        });

        parent.clear(false);
        assert_eq!(
            *order.borrow(),
            vec!["first child", "second child", "parent"],
            "children tear down depth-first, before the parent's own cleanups"
        );
    }

    #[test]
    fn test_cleared_scope_silences_owned_effects() {
        let dep = signal(0);
        let runs = Rc::new(Cell::new(0));
        let owner = Scope::detached();

        owner.run(|| {
            let runs = runs.clone();
            let dep = dep.clone();
            effect(move || {
                dep.get();
                runs.set(runs.get() + 1);
            });
        });
        assert_eq!(runs.get(), 1);

        owner.clear(false);
        dep.set(1);
        assert_eq!(
            runs.get(),
            1,
            "effects owned by a cleared scope must never fire again"
        );
    }

    #[test]
    fn test_clear_is_idempotent() {
        let cleanups = Rc::new(Cell::new(0));
        let owner = Scope::detached();

        owner.run(|| {
            let cleanups = cleanups.clone();
            on_cleanup(move || cleanups.set(cleanups.get() + 1));
        });

        owner.clear(false);
        owner.clear(false);
        assert_eq!(cleanups.get(), 1, "double clear must run cleanups once");
    }

    #[test]
    fn test_independent_clear_detaches_from_parent() {
        let cleanups = Rc::new(Cell::new(0));
        let parent = Scope::detached();
        let child = parent.child();

        child.run(|| {
            let cleanups = cleanups.clone();
            on_cleanup(move || cleanups.set(cleanups.get() + 1));
        });

        // Independent disposal, then the parent tears down: the child must
        // not be cleared a second time.
        child.clear(false);
        parent.clear(false);
        assert_eq!(cleanups.get(), 1);
    }

    #[test]
    fn test_mid_tree_disposal_spares_siblings_and_ancestors() {
        let dep = signal(0);
        let sibling_runs = Rc::new(Cell::new(0));
        let parent = Scope::detached();
        let doomed = parent.child();
        let sibling = parent.child();

        sibling.run(|| {
            let sibling_runs = sibling_runs.clone();
            let dep = dep.clone();
            effect(move || {
                dep.get();
                sibling_runs.set(sibling_runs.get() + 1);
            });
        });

        doomed.clear(false);
        dep.set(1);
        assert_eq!(
            sibling_runs.get(),
            2,
            "disposing one child must not disturb its siblings"
        );
    }

    #[test]
    fn test_scope_is_reusable_after_clear() {
        let cleanups = Rc::new(Cell::new(0));
        let region = Scope::detached();

        for _ in 0..2 {
            region.run(|| {
                let cleanups = cleanups.clone();
                on_cleanup(move || cleanups.set(cleanups.get() + 1));
            });
            region.clear(true);
        }
        assert_eq!(cleanups.get(), 2, "a cleared scope accepts new registrations");
    }

    #[test]
    fn test_run_restores_previous_owner() {
        let outer = Scope::detached();
        let inner = Scope::detached();
        let cleanups: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        outer.run(|| {
            inner.run(|| {
                let cleanups = cleanups.clone();
                on_cleanup(move || cleanups.borrow_mut().push("inner"));
            });
            let cleanups = cleanups.clone();
            on_cleanup(move || cleanups.borrow_mut().push("outer"));
        });

        inner.clear(false);
        assert_eq!(*cleanups.borrow(), vec!["inner"]);
        outer.clear(false);
        assert_eq!(*cleanups.borrow(), vec!["inner", "outer"]);
    }
}
