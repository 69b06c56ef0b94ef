//! Reactive core - signals, derived cells, effects, scopes, batches.
//!
//! The dependency graph is tracked at read time: while an effect or derived
//! cell executes, every signal it reads registers it as a dependent. Writes
//! notify dependents either immediately or, inside a [`batch`], once at the
//! close of the outermost transaction. Everything is single-threaded and
//! synchronous; ownership and teardown are governed by the [`Scope`] tree.

pub mod batch;
pub mod derived;
pub mod effect;
pub mod runtime;
pub mod scope;
pub mod signal;

pub use batch::batch;
pub use derived::{Derived, computed, derived, readable};
pub use effect::{Effect, effect};
pub use runtime::untrack;
pub use scope::{Scope, on_cleanup, scope};
pub use signal::{Signal, signal, signal_with_equals};
