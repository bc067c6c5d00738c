//! Event managers.
//!
//! Each manager receives one category of OS notification callback and
//! re-publishes it as a named event through an [`EventEmitter`]. OS-facing
//! code never holds a manager directly: it holds the manager's process-wide
//! [`ManagedProxy`], which exists from first access and buffers callbacks until
//! the real manager is constructed and activates itself.

pub mod content_available;
pub mod registration;
pub mod user_notification;

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

pub use content_available::{
    ContentAvailableCall, ContentAvailableHandler, ContentAvailableManager, ContentAvailableProxy,
};
pub use registration::{
    PushToken, RegistrationCall, RegistrationError, RegistrationHandler, RegistrationManager,
    RegistrationProxy,
};
pub use user_notification::{
    UserNotificationCall, UserNotificationHandler, UserNotificationManager, UserNotificationProxy,
};

use crate::emitter::EventEmitter;
use crate::proxy::{DeferredProxy, FlushReport, Invocation};

// ============================================================================
// Lifecycle
// ============================================================================

/// Readiness of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Only the proxy exists; callbacks queue.
    Unready,
    /// A real manager is attached and the backlog has been flushed.
    Ready,
}

/// A [`DeferredProxy`] with a one-way readiness flag.
///
/// Dereferences to the underlying proxy, so every proxy operation (and the
/// handler trait the proxy implements) is available directly.
pub struct ManagedProxy<T: ?Sized, I> {
    proxy: DeferredProxy<T, I>,
    ready: AtomicBool,
}

impl<T, I> ManagedProxy<T, I>
where
    T: ?Sized,
    I: Invocation<T>,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            proxy: DeferredProxy::new(),
            ready: AtomicBool::new(false),
        }
    }

    /// Current readiness. Never goes back to [`ManagerState::Unready`].
    #[must_use]
    pub fn state(&self) -> ManagerState {
        if self.ready.load(Ordering::Acquire) {
            ManagerState::Ready
        } else {
            ManagerState::Unready
        }
    }

    /// The wrapped proxy.
    #[must_use]
    pub const fn proxy(&self) -> &DeferredProxy<T, I> { &self.proxy }

    /// Attaches `target` and immediately flushes the backlog into it.
    pub fn activate(&self, target: Arc<T>) -> FlushReport {
        self.proxy.add_target(target);
        let report = self.proxy.flush_invocations();

        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::info!(
                manager = I::NAME,
                replayed = report.replayed,
                "manager ready"
            );
        }

        report
    }

    /// Detaches `target`. The manager stays [`ManagerState::Ready`].
    pub fn deactivate(&self, target: &Arc<T>) -> bool {
        let removed = self.proxy.remove_target(target);
        if removed {
            tracing::debug!(manager = I::NAME, "manager detached");
        }
        removed
    }
}

impl<T, I> Default for ManagedProxy<T, I>
where
    T: ?Sized,
    I: Invocation<T>,
{
    fn default() -> Self { Self::new() }
}

impl<T: ?Sized, I> Deref for ManagedProxy<T, I> {
    type Target = DeferredProxy<T, I>;

    fn deref(&self) -> &Self::Target { &self.proxy }
}

impl<T: ?Sized, I> std::fmt::Debug for ManagedProxy<T, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProxy")
            .field("proxy", &self.proxy)
            .field("ready", &self.ready.load(Ordering::Relaxed))
            .finish()
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emits `name` through `emitter`, logging the event.
pub(crate) fn emit(emitter: &dyn EventEmitter, manager: &'static str, name: &str, body: Value) {
    tracing::debug!(manager, event = name, "emitting event");
    tracing::trace!(manager, event = name, %body, "event body");
    emitter.emit(name, body);
}
