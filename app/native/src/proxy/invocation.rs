//! Invocation records and capability surfaces.
//!
//! A capability is a plain trait (for example a notification handler). Each
//! trait gets a companion enum with one variant per method; those variants are
//! the invocation records a [`DeferredProxy`](super::DeferredProxy) queues and
//! replays.

use serde_json::Value;

use crate::error::BridgeError;

/// Describes the method surface a proxy impersonates.
///
/// Typed callers never go through this trait: they call the capability trait
/// directly and the compiler rules out unknown methods. `Surface` covers the
/// dynamic, by-name entry point used by hosts that deliver callbacks as
/// messages.
pub trait Surface: Sized {
    /// Human-readable name of the impersonated capability.
    const NAME: &'static str;

    /// Every selector the capability responds to.
    const SELECTORS: &'static [&'static str];

    /// Builds an invocation record from a selector and its JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedOperation`] for a selector outside
    /// [`Self::SELECTORS`] and [`BridgeError::MalformedPayload`] when the
    /// arguments cannot be decoded.
    fn decode(selector: &str, args: Value) -> Result<Self, BridgeError>;

    /// Returns `true` if `selector` belongs to this surface.
    fn responds_to(selector: &str) -> bool { Self::SELECTORS.contains(&selector) }

    /// The error reported for a selector this surface does not know.
    fn unsupported(selector: &str) -> BridgeError {
        BridgeError::UnsupportedOperation {
            surface: Self::NAME,
            selector: selector.to_string(),
        }
    }
}

/// A captured method call against a target of type `T`.
///
/// Records are cloned once per attached target when fanned out, so any
/// single-shot state they carry (completion callbacks, for instance) must be
/// shared between clones.
///
/// Only unit-returning methods can be captured. A proxy has no meaningful
/// return value to hand back while a call sits in the queue, and with several
/// targets attached there is no single answer either; capabilities that need
/// results should route them through a callback argument instead.
pub trait Invocation<T: ?Sized>: Surface + Clone + Send {
    /// The selector this record invokes.
    fn selector(&self) -> &'static str;

    /// Replays the call against `target`.
    fn apply(&self, target: &T);
}
