//! # weft
//!
//! Fine-grained reactive UI runtime: signals, scopes, and a direct-mutation
//! renderer over an in-memory host document.
//!
//! ## Architecture
//!
//! State lives in reactive cells ([`Signal`] for mutable state, [`Derived`]
//! for lazy computations over it). Dependencies are discovered at read time:
//! whatever an [`effect`] reads during a run, it is subscribed to until its
//! next run. There is no virtual tree and no diffing pass:
//!
//! ```text
//! View tree → one mount pass → host nodes + targeted effects
//! ```
//!
//! The mount pass walks a declarative [`View`] once, creates host nodes, and
//! installs one effect per reactive leaf (a text binding, an attribute, a
//! conditional region, a list region). After that, a signal write updates
//! exactly the nodes that depend on it. Ownership follows the [`Scope`]
//! tree: unmounting a region disposes its effects and cleanups before its
//! nodes are dropped.
//!
//! ## Modules
//!
//! - [`reactive`] - signals, derived cells, effects, scopes, batches
//! - [`host`] - the in-memory document and fragment primitives
//! - [`view`] - the declarative view tree and the [`el`] builder
//! - [`render`] - mounting, regions, reconciliation
//! - [`error`] - render error type

pub mod error;
pub mod host;
pub mod render;
pub mod view;

pub mod reactive;

mod props;

pub use error::RenderError;

pub use host::{Document, Event, Listener, NodeId};

pub use reactive::{
    Derived, Effect, Scope, Signal, batch, computed, derived, effect, on_cleanup, readable, scope,
    signal, signal_with_equals, untrack,
};

pub use render::{render, unmount};

pub use view::{ClassMap, ElementNode, Source, StyleMap, View, el};
