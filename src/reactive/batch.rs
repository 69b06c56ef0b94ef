//! Batch coordinator - coalesced notification delivery.
//!
//! Every write funnels through here. Outside a batch a write drains the
//! pending queue immediately (synchronous propagation); inside a batch the
//! queue accumulates until the outermost batch closes, so several writes in
//! one unit of work produce one update pass. The flush itself is re-entrant:
//! writes performed by a running effect fold into the same drain loop rather
//! than deferring to a future turn.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use super::effect::EffectInner;

// =============================================================================
// Batch State
// =============================================================================

thread_local! {
    /// Re-entrancy counter; only the outermost batch triggers the flush.
    static DEPTH: Cell<usize> = const { Cell::new(0) };

    /// Guards against nested drains; a flush already in progress absorbs
    /// anything scheduled while it runs.
    static FLUSHING: Cell<bool> = const { Cell::new(false) };

    /// Effects awaiting execution, first-notified-first-run. Entries are
    /// deduplicated by the effect's queued flag before they get here.
    static PENDING: RefCell<VecDeque<Rc<EffectInner>>> = const { RefCell::new(VecDeque::new()) };
}

/// Run `f` as one transaction: writes inside it update values immediately
/// but deliver dependent notifications once, when the outermost batch
/// closes. Each affected effect runs exactly once per flush, no matter how
/// many of its dependencies changed.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    DEPTH.set(DEPTH.get() + 1);
    let result = f();
    DEPTH.set(DEPTH.get() - 1);
    if DEPTH.get() == 0 {
        flush();
    }
    result
}

/// Enqueue an effect whose dependency changed. Runs it right away (via the
/// drain loop) unless a batch or an ongoing flush defers it.
pub(crate) fn schedule(effect: Rc<EffectInner>) {
    PENDING.with_borrow_mut(|queue| queue.push_back(effect));
    if DEPTH.get() == 0 {
        flush();
    }
}

fn flush() {
    if FLUSHING.get() {
        return;
    }
    FLUSHING.set(true);
    loop {
        let next = PENDING.with_borrow_mut(|queue| queue.pop_front());
        let Some(effect) = next else { break };
        effect.clear_queued();
        if !effect.is_disposed() {
            effect.run();
        }
    }
    FLUSHING.set(false);
}
