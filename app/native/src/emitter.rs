//! Downstream event emission.
//!
//! Managers publish named events with a JSON body through an [`EventEmitter`].
//! The application runtime supplies the concrete emitter; this module ships
//! three: an in-process listener hub, a channel bridge to another execution
//! context, and an in-memory recorder.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// A named event with a generic key/value body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeEvent {
    /// Event name, see [`crate::events`].
    pub name: String,
    /// Event body.
    pub body: Value,
}

impl BridgeEvent {
    /// Creates an event.
    pub fn new(name: impl Into<String>, body: Value) -> Self {
        Self { name: name.into(), body }
    }
}

/// Something that delivers named events to application listeners.
pub trait EventEmitter: Send + Sync {
    /// Emits `name` with `body`. Emission never fails from the caller's side.
    fn emit(&self, name: &str, body: Value);
}

impl<E: EventEmitter + ?Sized> EventEmitter for Arc<E> {
    fn emit(&self, name: &str, body: Value) { (**self).emit(name, body); }
}

// ============================================================================
// Listener Hub
// ============================================================================

/// Identifies a listener registered on an [`EventHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// In-process registry of listeners keyed by event name.
///
/// Listeners run on the emitting thread, outside the registry lock, so they
/// may add or remove listeners themselves.
#[derive(Default)]
pub struct EventHub {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl EventHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers `listener` for events named `name`.
    pub fn add_listener<F>(&self, name: &str, listener: F) -> ListenerId
    where F: Fn(&Value) + Send + Sync + 'static {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(name.to_string())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        for entries in listeners.values_mut() {
            if let Some(index) = entries.iter().position(|(existing, _)| *existing == id) {
                entries.remove(index);
                return true;
            }
        }
        false
    }

    /// Removes every listener for `name`.
    pub fn remove_all_listeners(&self, name: &str) { self.listeners.write().remove(name); }

    /// Number of listeners registered for `name`.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.read().get(name).map_or(0, Vec::len)
    }
}

impl EventEmitter for EventHub {
    fn emit(&self, name: &str, body: Value) {
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .get(name)
            .map(|entries| entries.iter().map(|(_, listener)| listener.clone()).collect())
            .unwrap_or_default();

        if snapshot.is_empty() {
            tracing::debug!(event = name, "no listeners for event");
            return;
        }

        for listener in &snapshot {
            listener(&body);
        }
    }
}

// ============================================================================
// Channel Emitter
// ============================================================================

/// Ships events over an unbounded channel to whichever context drains it.
#[derive(Clone)]
pub struct ChannelEmitter {
    sender: mpsc::UnboundedSender<BridgeEvent>,
}

impl ChannelEmitter {
    /// Creates an emitter and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, name: &str, body: Value) {
        if self.sender.send(BridgeEvent::new(name, body)).is_err() {
            // Receiver dropped means the runtime is shutting down
            tracing::debug!(event = name, "event channel closed, dropping event");
        }
    }
}

// ============================================================================
// Recording Emitter
// ============================================================================

/// Keeps every emitted event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<BridgeEvent>>,
}

impl RecordingEmitter {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<BridgeEvent> { self.events.lock().clone() }

    /// Removes and returns the recorded events.
    pub fn take(&self) -> Vec<BridgeEvent> { std::mem::take(&mut *self.events.lock()) }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize { self.events.lock().len() }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.events.lock().is_empty() }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, name: &str, body: Value) { self.events.lock().push(BridgeEvent::new(name, body)); }
}
