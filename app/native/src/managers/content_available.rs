//! Silent (content-available) notification manager.
//!
//! The OS hands each background notification a completion it is waiting on.
//! The manager parks that completion under a fresh `notificationId`, emits the
//! formatted payload with the id attached, and completes it once the
//! application calls [`ContentAvailableManager::finish_remote_notification`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::{Value, json};
use uuid::Uuid;

use super::{ManagedProxy, emit};
use crate::completion::{CompletionReceiver, FetchCompletion, FetchResult, PendingCompletions};
use crate::config::SilentNotificationConfig;
use crate::convert::format_content_available_notification;
use crate::emitter::EventEmitter;
use crate::error::BridgeError;
use crate::events::content_available;
use crate::proxy::{DeferredProxy, Invocation, Surface};

/// Receives background notifications from the OS.
pub trait ContentAvailableHandler: Send + Sync {
    /// A silent notification arrived. `completion` must eventually run once.
    fn did_receive_silent_notification(&self, notification: Value, completion: FetchCompletion);
}

/// Invocation records for [`ContentAvailableHandler`].
#[derive(Debug, Clone)]
pub enum ContentAvailableCall {
    DidReceiveSilentNotification {
        notification: Value,
        completion: FetchCompletion,
    },
}

impl Surface for ContentAvailableCall {
    const NAME: &'static str = "ContentAvailableNotificationManager";
    const SELECTORS: &'static [&'static str] = &["didReceiveSilentNotification"];

    fn decode(selector: &str, args: Value) -> Result<Self, BridgeError> {
        match selector {
            "didReceiveSilentNotification" => {
                let Value::Object(mut args) = args else {
                    return Err(BridgeError::malformed(
                        "didReceiveSilentNotification expects an object with a `notification`",
                    ));
                };
                let notification = args.remove("notification").unwrap_or(Value::Null);
                Ok(Self::DidReceiveSilentNotification {
                    notification,
                    completion: FetchCompletion::logging(selector),
                })
            }
            other => Err(Self::unsupported(other)),
        }
    }
}

impl Invocation<dyn ContentAvailableHandler> for ContentAvailableCall {
    fn selector(&self) -> &'static str {
        match self {
            Self::DidReceiveSilentNotification { .. } => "didReceiveSilentNotification",
        }
    }

    fn apply(&self, target: &dyn ContentAvailableHandler) {
        match self {
            Self::DidReceiveSilentNotification { notification, completion } => {
                target.did_receive_silent_notification(notification.clone(), completion.clone());
            }
        }
    }
}

impl ContentAvailableHandler for DeferredProxy<dyn ContentAvailableHandler, ContentAvailableCall> {
    fn did_receive_silent_notification(&self, notification: Value, completion: FetchCompletion) {
        self.invoke(ContentAvailableCall::DidReceiveSilentNotification { notification, completion });
    }
}

/// The proxy OS-facing code holds for silent notifications.
pub type ContentAvailableProxy = ManagedProxy<dyn ContentAvailableHandler, ContentAvailableCall>;

static PROXY: OnceLock<ContentAvailableProxy> = OnceLock::new();

/// Re-publishes silent notifications as `contentAvailableNotificationReceived`.
pub struct ContentAvailableManager {
    emitter: Arc<dyn EventEmitter>,
    pending: PendingCompletions,
    default_result: FetchResult,
    completion_timeout: Duration,
}

impl ContentAvailableManager {
    #[must_use]
    pub fn new(emitter: Arc<dyn EventEmitter>, config: &SilentNotificationConfig) -> Self {
        Self {
            emitter,
            pending: PendingCompletions::new(),
            default_result: config.default_fetch_result,
            completion_timeout: config.completion_timeout(),
        }
    }

    /// The process-wide proxy, created on first access.
    pub fn proxied_instance() -> &'static ContentAvailableProxy {
        PROXY.get_or_init(ContentAvailableProxy::new)
    }

    /// Builds the manager and activates it on the process-wide proxy.
    pub fn register(emitter: Arc<dyn EventEmitter>, config: &SilentNotificationConfig) -> Arc<Self> {
        Self::attach_to(Self::proxied_instance(), emitter, config)
    }

    /// Builds the manager and activates it on `proxy`.
    pub fn attach_to(
        proxy: &ContentAvailableProxy,
        emitter: Arc<dyn EventEmitter>,
        config: &SilentNotificationConfig,
    ) -> Arc<Self> {
        let manager = Arc::new(Self::new(emitter, config));
        proxy.activate(manager.clone());
        manager
    }

    /// Events this manager emits.
    #[must_use]
    pub const fn supported_events() -> &'static [&'static str] { &[content_available::RECEIVED] }

    /// Reports the application's fetch result for `notification_id` to the OS.
    ///
    /// Returns `false` if the id is malformed, unknown or already finished.
    pub fn finish_remote_notification(&self, notification_id: &str, result: FetchResult) -> bool {
        match Uuid::parse_str(notification_id) {
            Ok(id) => self.pending.finish(&id, result),
            Err(err) => {
                tracing::warn!(notification_id, error = %err, "invalid notification id");
                false
            }
        }
    }

    /// Waits for the application's fetch result on `receiver`.
    ///
    /// Falls back to the configured default result when the application does
    /// not finish within the configured budget, or when the completion is
    /// dropped. The host reports whatever this returns to the OS.
    pub async fn await_completion(&self, receiver: CompletionReceiver) -> FetchResult {
        match receiver.wait(self.completion_timeout).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    result = %self.default_result,
                    "no fetch result from application, using default"
                );
                self.default_result
            }
        }
    }

    /// Number of notifications still waiting for a fetch result.
    #[must_use]
    pub fn pending_count(&self) -> usize { self.pending.len() }

    /// Detaches from `proxy` and completes every waiting notification with the
    /// configured default result. Returns how many completions ran.
    pub fn teardown(self: &Arc<Self>, proxy: &ContentAvailableProxy) -> usize {
        let target: Arc<dyn ContentAvailableHandler> = self.clone();
        proxy.deactivate(&target);

        let completed = self.pending.complete_all(self.default_result);
        if completed > 0 {
            tracing::info!(
                completed,
                result = %self.default_result,
                "completed pending silent notifications on teardown"
            );
        }
        completed
    }
}

impl ContentAvailableHandler for ContentAvailableManager {
    fn did_receive_silent_notification(&self, notification: Value, completion: FetchCompletion) {
        let id = self.pending.register(completion);

        let mut body = format_content_available_notification(&notification);
        body.insert("notificationId".into(), json!(id.to_string()));

        emit(
            self.emitter.as_ref(),
            ContentAvailableCall::NAME,
            content_available::RECEIVED,
            Value::Object(body),
        );
    }
}

impl std::fmt::Debug for ContentAvailableManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentAvailableManager")
            .field("pending", &self.pending.len())
            .field("default_result", &self.default_result)
            .field("completion_timeout", &self.completion_timeout)
            .finish_non_exhaustive()
    }
}
