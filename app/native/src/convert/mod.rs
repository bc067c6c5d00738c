//! Conversion between notification objects and generic dictionaries.
//!
//! OS notification objects are modelled as plain Rust types. Each has a
//! lenient `*_from_json` parser (for dictionaries coming from application
//! code) and a `format_*` function producing the dictionary shipped in event
//! bodies.
//!
//! Parsers reject only what makes an object unusable (a request without an
//! identifier, a negative time interval) and otherwise ignore unknown or
//! mistyped fields. Formatters for payloads delivered by the OS never fail:
//! see [`remote`].

mod calendar;
mod category;
mod local;
mod notification;
pub mod remote;
mod request;
mod settings;
mod trigger;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

pub use calendar::{
    CalendarUnit, DateComponents, calendar_unit_from_json, date_components_from_json,
    format_calendar_unit, format_date_components,
};
pub use category::{
    ActionOptions, CategoryOptions, NotificationAction, NotificationCategory, TextInputAction,
    category_from_json, format_category, format_category_options,
};
pub use local::{
    LocalNotification, format_local_notification, local_notification_from_json,
    local_notification_to_request,
};
pub use notification::{
    DEFAULT_ACTION_IDENTIFIER, DISMISS_ACTION_IDENTIFIER, Notification, NotificationResponse,
    format_notification, format_response, format_will_present, notification_from_json,
    response_from_json,
};
pub use remote::{format_content_available_notification, format_legacy_remote_notification};
pub use request::{
    NotificationContent, NotificationRequest, NotificationSound, format_request, request_from_json,
};
pub use settings::{
    AlertStyle, AuthorizationStatus, NotificationSetting, NotificationSettings, format_settings,
};
pub use trigger::{LocationRegion, NotificationTrigger, format_trigger, trigger_from_json};

use crate::error::BridgeError;

/// A JSON object.
pub type Dictionary = Map<String, Value>;

/// Borrows `value` as an object or reports which object was expected.
pub(crate) fn expect_object<'a>(value: &'a Value, what: &str) -> Result<&'a Dictionary, BridgeError> {
    value
        .as_object()
        .ok_or_else(|| BridgeError::malformed(format!("{what} must be an object")))
}

pub(crate) fn string_field(map: &Dictionary, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn f64_field(map: &Dictionary, key: &str) -> Option<f64> { map.get(key).and_then(Value::as_f64) }

/// Integers may arrive as floats from JavaScript.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn i64_field(map: &Dictionary, key: &str) -> Option<i64> {
    map.get(key).and_then(|value| value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)))
}

/// Booleans may arrive as `0`/`1`.
pub(crate) fn bool_field(map: &Dictionary, key: &str) -> Option<bool> {
    match map.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

pub(crate) fn object_field(map: &Dictionary, key: &str) -> Dictionary {
    map.get(key).and_then(Value::as_object).cloned().unwrap_or_default()
}

pub(crate) fn string_list_field(map: &Dictionary, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Reads a date given as an RFC 3339 string or as milliseconds since the epoch.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn date_field(map: &Dictionary, key: &str) -> Option<DateTime<Utc>> {
    match map.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_f64()? as i64).single(),
        _ => None,
    }
}

/// Formats a date the way JavaScript's `Date.toISOString` does.
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String { date.to_rfc3339_opts(SecondsFormat::Millis, true) }

/// Inserts `value` under `key` unless it is `None`.
pub(crate) fn insert_opt<V: Into<Value>>(map: &mut Dictionary, key: &str, value: Option<V>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_date_field_accepts_iso_and_millis() {
        let map = json!({ "iso": "2024-03-01T12:00:00.000Z", "ms": 1_709_294_400_000_i64 });
        let map = map.as_object().unwrap();
        let iso = date_field(map, "iso").unwrap();
        let ms = date_field(map, "ms").unwrap();
        assert_eq!(iso, ms);
        assert_eq!(format_date(&iso), "2024-03-01T12:00:00.000Z");
    }

    #[test]
    fn test_bool_field_accepts_numbers() {
        let map = json!({ "a": 1, "b": false, "c": "yes" });
        let map = map.as_object().unwrap();
        assert_eq!(bool_field(map, "a"), Some(true));
        assert_eq!(bool_field(map, "b"), Some(false));
        assert_eq!(bool_field(map, "c"), None);
    }

    #[test]
    fn test_expect_object_names_the_field() {
        let err = expect_object(&json!(3), "trigger").unwrap_err();
        assert!(err.to_string().contains("trigger must be an object"));
    }
}
