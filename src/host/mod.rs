//! In-memory host tree the renderer targets.

pub mod document;
pub mod fragment;

pub use document::{Document, Event, Listener, NodeId};
pub use fragment::Fragment;
