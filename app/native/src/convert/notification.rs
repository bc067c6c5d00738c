//! Delivered notifications and user responses.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use super::request::format_content;
use super::{
    Dictionary, NotificationRequest, NotificationTrigger, date_field, expect_object, format_date,
    format_trigger, insert_opt, request_from_json, string_field,
};
use crate::error::BridgeError;

/// Action identifier reported when the user opens the notification.
pub const DEFAULT_ACTION_IDENTIFIER: &str = "com.apple.UNNotificationDefaultActionIdentifier";

/// Action identifier reported when the user dismisses the notification.
pub const DISMISS_ACTION_IDENTIFIER: &str = "com.apple.UNNotificationDismissActionIdentifier";

/// A notification the OS delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub date: DateTime<Utc>,
    pub request: NotificationRequest,
}

impl Notification {
    /// Whether the notification came from the push service.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self.request.trigger, Some(NotificationTrigger::Push { .. }))
    }

    const fn notification_type(&self) -> &'static str {
        if self.is_remote() { "iOS-remote" } else { "iOS-local" }
    }
}

/// The user's reaction to a delivered notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationResponse {
    pub notification: Notification,
    pub action_identifier: String,
    /// Text typed into a text-input action.
    pub user_text: Option<String>,
}

/// Parses `{ date, request }`. A missing date means "now".
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] if the request is missing or invalid.
pub fn notification_from_json(value: &Value) -> Result<Notification, BridgeError> {
    let map = expect_object(value, "notification")?;
    let request = map
        .get("request")
        .ok_or_else(|| BridgeError::malformed("notification requires a `request`"))?;
    Ok(Notification {
        date: date_field(map, "date").unwrap_or_else(Utc::now),
        request: request_from_json(request)?,
    })
}

/// Parses `{ actionIdentifier, userText, notification }`.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] if the notification is missing or invalid.
pub fn response_from_json(value: &Value) -> Result<NotificationResponse, BridgeError> {
    let map = expect_object(value, "notification response")?;
    let notification = map
        .get("notification")
        .ok_or_else(|| BridgeError::malformed("notification response requires a `notification`"))?;
    Ok(NotificationResponse {
        notification: notification_from_json(notification)?,
        action_identifier: string_field(map, "actionIdentifier")
            .unwrap_or_else(|| DEFAULT_ACTION_IDENTIFIER.to_string()),
        user_text: string_field(map, "userText"),
    })
}

/// Formats a delivered notification.
///
/// Content fields are flattened to the top level the way the notification
/// center listing reports them (`category`, `thread-id`).
#[must_use]
pub fn format_notification(notification: &Notification) -> Dictionary {
    let request = &notification.request;
    let content = &request.content;

    let mut map = Dictionary::new();
    map.insert("identifier".into(), json!(request.identifier));
    map.insert("date".into(), json!(format_date(&notification.date)));
    insert_opt(&mut map, "title", content.title.clone());
    insert_opt(&mut map, "subtitle", content.subtitle.clone());
    insert_opt(&mut map, "body", content.body.clone());
    insert_opt(&mut map, "badge", content.badge);
    insert_opt(&mut map, "category", content.category_identifier.clone());
    insert_opt(&mut map, "thread-id", content.thread_identifier.clone());
    map.insert("userInfo".into(), Value::Object(content.user_info.clone()));
    map.insert("content".into(), Value::Object(format_content(content)));
    insert_opt(&mut map, "trigger", request.trigger.as_ref().map(|t| Value::Object(format_trigger(t))));
    map.insert("remote".into(), json!(notification.is_remote()));
    map.insert("notificationType".into(), json!(notification.notification_type()));
    map
}

/// Formats a notification about to be presented while the app is in the foreground.
#[must_use]
pub fn format_will_present(notification: &Notification) -> Dictionary {
    let mut map = format_notification(notification);
    map.insert("foreground".into(), json!(true));
    map.insert("userInteraction".into(), json!(false));
    map
}

/// Formats a user response.
#[must_use]
pub fn format_response(response: &NotificationResponse) -> Dictionary {
    let mut map = format_notification(&response.notification);
    map.insert("actionIdentifier".into(), json!(response.action_identifier));
    insert_opt(&mut map, "userText", response.user_text.clone());
    map.insert("foreground".into(), json!(false));
    map.insert(
        "userInteraction".into(),
        json!(response.action_identifier != DISMISS_ACTION_IDENTIFIER),
    );
    map
}
