//! Pushbridge - bridges OS push-notification callbacks to application event listeners.
//!
//! OS callbacks can arrive before the application's listener subsystem exists.
//! Each category of callback is handled by a manager that OS-facing code only
//! reaches through a [`proxy::DeferredProxy`]: calls made before the manager
//! is ready are queued and replayed, in order, once it activates.
//!
//! - [`proxy`] - the deferred-dispatch proxy
//! - [`managers`] - silent notification, registration and notification center managers
//! - [`emitter`] - downstream named-event emission
//! - [`completion`] - single-shot background fetch completions
//! - [`convert`] - notification objects to and from generic dictionaries

pub mod cli;
pub mod completion;
pub mod config;
pub mod convert;
pub mod emitter;
pub mod error;
pub mod events;
pub mod logging;
pub mod managers;
pub mod proxy;

pub use completion::{FetchCompletion, FetchResult, PendingCompletions};
pub use emitter::{BridgeEvent, EventEmitter, EventHub};
pub use error::BridgeError;
pub use managers::{
    ContentAvailableHandler, ContentAvailableManager, ManagedProxy, ManagerState,
    RegistrationHandler, RegistrationManager, UserNotificationHandler, UserNotificationManager,
};
pub use proxy::{DeferredProxy, Dispatch, FlushReport, Invocation, Surface};
