//! Notification requests and their content.

use serde_json::{Value, json};

use super::{
    Dictionary, NotificationTrigger, expect_object, format_trigger, i64_field, insert_opt,
    object_field, string_field, trigger_from_json,
};
use crate::error::BridgeError;

/// Sound played on delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSound {
    /// The system default sound.
    Default,
    /// A sound file in the app bundle.
    Named(String),
}

impl NotificationSound {
    fn from_json(value: &Value) -> Option<Self> {
        let name = match value {
            Value::Null => return None,
            Value::String(name) => Some(name.as_str()),
            Value::Object(map) => map.get("name").and_then(Value::as_str),
            _ => None,
        };
        match name {
            None | Some("" | "default") => Some(Self::Default),
            Some(name) => Some(Self::Named(name.to_string())),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Default => json!({ "name": "default" }),
            Self::Named(name) => json!({ "name": name }),
        }
    }
}

/// The user-visible part of a notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationContent {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub badge: Option<i64>,
    pub sound: Option<NotificationSound>,
    pub category_identifier: Option<String>,
    pub thread_identifier: Option<String>,
    pub launch_image_name: Option<String>,
    pub user_info: Dictionary,
}

/// A request to deliver a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub identifier: String,
    pub content: NotificationContent,
    /// `None` delivers immediately.
    pub trigger: Option<NotificationTrigger>,
}

pub(crate) fn content_from_json(map: &Dictionary) -> NotificationContent {
    NotificationContent {
        title: string_field(map, "title"),
        subtitle: string_field(map, "subtitle"),
        body: string_field(map, "body"),
        badge: i64_field(map, "badge"),
        sound: map.get("sound").and_then(NotificationSound::from_json),
        category_identifier: string_field(map, "categoryIdentifier"),
        thread_identifier: string_field(map, "threadIdentifier"),
        launch_image_name: string_field(map, "launchImageName"),
        user_info: object_field(map, "userInfo"),
    }
}

pub(crate) fn format_content(content: &NotificationContent) -> Dictionary {
    let mut map = Dictionary::new();
    insert_opt(&mut map, "title", content.title.clone());
    insert_opt(&mut map, "subtitle", content.subtitle.clone());
    insert_opt(&mut map, "body", content.body.clone());
    insert_opt(&mut map, "badge", content.badge);
    insert_opt(&mut map, "sound", content.sound.as_ref().map(NotificationSound::to_json));
    insert_opt(&mut map, "categoryIdentifier", content.category_identifier.clone());
    insert_opt(&mut map, "threadIdentifier", content.thread_identifier.clone());
    insert_opt(&mut map, "launchImageName", content.launch_image_name.clone());
    map.insert("userInfo".into(), Value::Object(content.user_info.clone()));
    map
}

/// Parses a request dictionary.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] if the request has no identifier
/// or carries an invalid trigger.
pub fn request_from_json(value: &Value) -> Result<NotificationRequest, BridgeError> {
    let map = expect_object(value, "notification request")?;
    let identifier = string_field(map, "identifier")
        .filter(|identifier| !identifier.is_empty())
        .ok_or_else(|| BridgeError::malformed("notification request requires an `identifier`"))?;

    let trigger = match map.get("trigger") {
        None | Some(Value::Null) => None,
        Some(trigger) => Some(trigger_from_json(trigger)?),
    };

    Ok(NotificationRequest {
        identifier,
        content: content_from_json(&object_field(map, "content")),
        trigger,
    })
}

/// Formats a request as a dictionary.
#[must_use]
pub fn format_request(request: &NotificationRequest) -> Dictionary {
    let mut map = Dictionary::new();
    map.insert("identifier".into(), json!(request.identifier));
    map.insert("content".into(), Value::Object(format_content(&request.content)));
    insert_opt(&mut map, "trigger", request.trigger.as_ref().map(|t| Value::Object(format_trigger(t))));
    map
}
