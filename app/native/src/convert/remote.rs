//! Formatting of raw remote-notification payloads.
//!
//! These payloads come straight from the OS and are handed to the bridge
//! together with a completion the OS is waiting on. Formatting therefore never
//! fails: whatever can be read is reported, and a body that was missing
//! expected fields carries `"malformed": true` so listeners can tell.

use serde_json::{Value, json};

use super::{Dictionary, bool_field, i64_field, insert_opt, string_field};

/// `notificationType` of a background notification.
pub const SILENT_NOTIFICATION_TYPE: &str = "iOS-silent";

/// `notificationType` of a user-visible remote notification.
pub const REMOTE_NOTIFICATION_TYPE: &str = "iOS-remote";

/// Formats a remote notification delivered through the legacy app-delegate path.
#[must_use]
pub fn format_legacy_remote_notification(payload: &Value, is_initial: bool) -> Dictionary {
    let mut problems = Vec::new();
    let mut map = format_remote(payload, REMOTE_NOTIFICATION_TYPE, &mut problems);
    map.insert("initialNotification".into(), json!(is_initial));
    finish(map, &problems)
}

/// Formats a background (`content-available`) notification.
///
/// A payload without `aps.content-available` set is still formatted, but is
/// flagged as malformed.
#[must_use]
pub fn format_content_available_notification(payload: &Value) -> Dictionary {
    let mut problems = Vec::new();
    let map = format_remote(payload, SILENT_NOTIFICATION_TYPE, &mut problems);
    if map.get("contentAvailable") != Some(&json!(true)) {
        problems.push("aps.content-available is not set");
    }
    finish(map, &problems)
}

fn format_remote(payload: &Value, notification_type: &str, problems: &mut Vec<&'static str>) -> Dictionary {
    let mut map = Dictionary::new();

    let user_info = if let Value::Object(user_info) = payload {
        user_info.clone()
    } else {
        problems.push("payload is not an object");
        if !payload.is_null() {
            map.insert("raw".into(), payload.clone());
        }
        Dictionary::new()
    };

    match user_info.get("aps") {
        Some(Value::Object(aps)) => format_aps(aps, &mut map),
        Some(_) => problems.push("aps is not an object"),
        None => problems.push("aps is missing"),
    }

    map.insert("userInfo".into(), Value::Object(user_info));
    map.insert("remote".into(), json!(true));
    map.insert("foreground".into(), json!(false));
    map.insert("notificationType".into(), json!(notification_type));
    map
}

fn format_aps(aps: &Dictionary, map: &mut Dictionary) {
    match aps.get("alert") {
        Some(Value::String(body)) => {
            map.insert("alertBody".into(), json!(body));
        }
        Some(Value::Object(alert)) => {
            insert_opt(map, "alertTitle", string_field(alert, "title"));
            insert_opt(map, "alertSubtitle", string_field(alert, "subtitle"));
            insert_opt(map, "alertBody", string_field(alert, "body"));
        }
        _ => {}
    }
    insert_opt(map, "badge", i64_field(aps, "badge"));
    insert_opt(map, "sound", string_field(aps, "sound"));
    insert_opt(map, "category", string_field(aps, "category"));
    insert_opt(map, "threadId", string_field(aps, "thread-id"));
    map.insert(
        "contentAvailable".into(),
        json!(bool_field(aps, "content-available").unwrap_or(false)),
    );
}

fn finish(mut map: Dictionary, problems: &[&str]) -> Dictionary {
    if !problems.is_empty() {
        tracing::warn!(problems = ?problems, "formatted malformed remote notification");
        map.insert("malformed".into(), json!(true));
    }
    map
}
