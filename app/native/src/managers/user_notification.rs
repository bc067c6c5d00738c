//! User notification center manager.
//!
//! Forwards user responses to delivered notifications and foreground
//! presentation callbacks.

use std::sync::{Arc, OnceLock};

use serde_json::Value;

use super::{ManagedProxy, emit};
use crate::convert::{
    Notification, NotificationResponse, format_response, format_will_present,
    notification_from_json, response_from_json,
};
use crate::emitter::EventEmitter;
use crate::error::BridgeError;
use crate::events::user_notification;
use crate::proxy::{DeferredProxy, Invocation, Surface};

/// Receives user notification center callbacks from the OS.
pub trait UserNotificationHandler: Send + Sync {
    /// The user opened, dismissed or acted on a notification.
    fn did_receive_response(&self, response: NotificationResponse);

    /// A notification is about to be presented while the app is in the foreground.
    fn will_present(&self, notification: Notification);
}

/// Invocation records for [`UserNotificationHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum UserNotificationCall {
    DidReceiveResponse(NotificationResponse),
    WillPresent(Notification),
}

impl Surface for UserNotificationCall {
    const NAME: &'static str = "UserNotificationCenterManager";
    const SELECTORS: &'static [&'static str] = &["didReceiveNotificationResponse", "willPresentNotification"];

    fn decode(selector: &str, args: Value) -> Result<Self, BridgeError> {
        match selector {
            "didReceiveNotificationResponse" => {
                let response = args.get("response").unwrap_or(&args);
                Ok(Self::DidReceiveResponse(response_from_json(response)?))
            }
            "willPresentNotification" => {
                let notification = args.get("notification").unwrap_or(&args);
                Ok(Self::WillPresent(notification_from_json(notification)?))
            }
            other => Err(Self::unsupported(other)),
        }
    }
}

impl Invocation<dyn UserNotificationHandler> for UserNotificationCall {
    fn selector(&self) -> &'static str {
        match self {
            Self::DidReceiveResponse(_) => "didReceiveNotificationResponse",
            Self::WillPresent(_) => "willPresentNotification",
        }
    }

    fn apply(&self, target: &dyn UserNotificationHandler) {
        match self {
            Self::DidReceiveResponse(response) => target.did_receive_response(response.clone()),
            Self::WillPresent(notification) => target.will_present(notification.clone()),
        }
    }
}

impl UserNotificationHandler for DeferredProxy<dyn UserNotificationHandler, UserNotificationCall> {
    fn did_receive_response(&self, response: NotificationResponse) {
        self.invoke(UserNotificationCall::DidReceiveResponse(response));
    }

    fn will_present(&self, notification: Notification) {
        self.invoke(UserNotificationCall::WillPresent(notification));
    }
}

pub type UserNotificationProxy = ManagedProxy<dyn UserNotificationHandler, UserNotificationCall>;

static PROXY: OnceLock<UserNotificationProxy> = OnceLock::new();

/// Re-publishes notification center callbacks as `didReceiveNotificationResponse`
/// and `willPresentNotification`.
pub struct UserNotificationManager {
    emitter: Arc<dyn EventEmitter>,
}

impl UserNotificationManager {
    #[must_use]
    pub fn new(emitter: Arc<dyn EventEmitter>) -> Self { Self { emitter } }

    pub fn proxied_instance() -> &'static UserNotificationProxy {
        PROXY.get_or_init(UserNotificationProxy::new)
    }

    pub fn register(emitter: Arc<dyn EventEmitter>) -> Arc<Self> {
        Self::attach_to(Self::proxied_instance(), emitter)
    }

    pub fn attach_to(proxy: &UserNotificationProxy, emitter: Arc<dyn EventEmitter>) -> Arc<Self> {
        let manager = Arc::new(Self::new(emitter));
        proxy.activate(manager.clone());
        manager
    }

    #[must_use]
    pub const fn supported_events() -> &'static [&'static str] {
        &[user_notification::RESPONSE_RECEIVED, user_notification::WILL_PRESENT]
    }
}

impl UserNotificationHandler for UserNotificationManager {
    fn did_receive_response(&self, response: NotificationResponse) {
        let body = Value::Object(format_response(&response));
        emit(self.emitter.as_ref(), UserNotificationCall::NAME, user_notification::RESPONSE_RECEIVED, body);
    }

    fn will_present(&self, notification: Notification) {
        let body = Value::Object(format_will_present(&notification));
        emit(self.emitter.as_ref(), UserNotificationCall::NAME, user_notification::WILL_PRESENT, body);
    }
}

impl std::fmt::Debug for UserNotificationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserNotificationManager").finish_non_exhaustive()
    }
}
