//! Error types for the renderer.
//!
//! The view tree is a closed set of variants, so "unknown content shape"
//! cannot occur at runtime; what remains are structural errors a caller can
//! act on. State-consistency hazards (double disposal, writes racing a
//! teardown) are absorbed with idempotency guards instead of surfaced here,
//! because they are reachable through ordinary, correct usage.

use thiserror::Error;

/// Structural errors raised while mounting a view tree.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A keyed (by-identity) list region reached the renderer. The keyed
    /// variant exists for API parity but has no reconciliation strategy yet;
    /// use an index list region instead.
    #[error("keyed list regions are not implemented; use an index list region")]
    KeyedListUnsupported,

    /// The mount target is not an element node (text and marker nodes cannot
    /// hold children).
    #[error("render target must be an element node")]
    NotAnElement,
}
