//! Legacy local notifications.
//!
//! The older local-notification API is still what most application code
//! speaks. These objects are parsed from its dictionaries and can be turned
//! into modern requests with [`local_notification_to_request`].

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{
    CalendarUnit, DateComponents, Dictionary, NotificationContent, NotificationRequest, NotificationSound,
    NotificationTrigger, bool_field, date_field, expect_object, format_date, i64_field,
    insert_opt, object_field, string_field,
};
use crate::error::BridgeError;

/// Shortest interval used for "deliver now".
const IMMEDIATE_INTERVAL: f64 = 0.1;

/// A legacy local notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalNotification {
    /// `None` delivers immediately.
    pub fire_date: Option<DateTime<Utc>>,
    pub alert_title: Option<String>,
    pub alert_body: Option<String>,
    pub alert_action: Option<String>,
    pub alert_launch_image: Option<String>,
    pub has_action: bool,
    /// Empty means silent.
    pub sound_name: Option<String>,
    pub application_icon_badge_number: Option<i64>,
    pub category: Option<String>,
    pub identifier: Option<String>,
    pub user_info: Dictionary,
    pub repeat_interval: Option<CalendarUnit>,
}

/// Repeat names legacy code uses, with the seconds one repeat covers when it
/// fits an interval trigger.
const REPEAT_INTERVALS: &[(&str, CalendarUnit, Option<f64>)] = &[
    ("minute", CalendarUnit::MINUTE, Some(60.0)),
    ("hour", CalendarUnit::HOUR, Some(3_600.0)),
    ("day", CalendarUnit::DAY, Some(86_400.0)),
    ("week", CalendarUnit::WEEK_OF_YEAR, Some(604_800.0)),
    ("month", CalendarUnit::MONTH, None),
    ("year", CalendarUnit::YEAR, None),
];

fn repeat_interval_from_name(name: &str) -> Option<CalendarUnit> {
    REPEAT_INTERVALS.iter().find(|(n, _, _)| *n == name).map(|(_, unit, _)| *unit)
}

fn repeat_interval_name(unit: CalendarUnit) -> Option<&'static str> {
    REPEAT_INTERVALS.iter().find(|(_, u, _)| *u == unit).map(|(name, _, _)| *name)
}

fn repeat_interval_seconds(unit: CalendarUnit) -> Option<f64> {
    REPEAT_INTERVALS.iter().find(|(_, u, _)| *u == unit).and_then(|(_, _, seconds)| *seconds)
}

/// Parses a legacy local-notification dictionary.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] if `value` is not an object or
/// names an unknown repeat interval.
pub fn local_notification_from_json(value: &Value) -> Result<LocalNotification, BridgeError> {
    let map = expect_object(value, "local notification")?;

    let repeat_interval = match string_field(map, "repeatInterval") {
        None => None,
        Some(name) => Some(repeat_interval_from_name(&name).ok_or_else(|| {
            BridgeError::malformed(format!("unknown repeat interval `{name}`"))
        })?),
    };

    Ok(LocalNotification {
        fire_date: date_field(map, "fireDate"),
        alert_title: string_field(map, "alertTitle"),
        alert_body: string_field(map, "alertBody"),
        alert_action: string_field(map, "alertAction"),
        alert_launch_image: string_field(map, "alertLaunchImage"),
        has_action: bool_field(map, "hasAction").unwrap_or(true),
        sound_name: string_field(map, "soundName"),
        application_icon_badge_number: i64_field(map, "applicationIconBadgeNumber"),
        category: string_field(map, "category"),
        identifier: string_field(map, "identifier"),
        user_info: object_field(map, "userInfo"),
        repeat_interval,
    })
}

/// Formats a local notification; `is_initial` marks the one that launched the app.
#[must_use]
pub fn format_local_notification(notification: &LocalNotification, is_initial: bool) -> Dictionary {
    let mut map = Dictionary::new();
    insert_opt(&mut map, "fireDate", notification.fire_date.as_ref().map(format_date));
    insert_opt(&mut map, "alertTitle", notification.alert_title.clone());
    insert_opt(&mut map, "alertBody", notification.alert_body.clone());
    insert_opt(&mut map, "alertAction", notification.alert_action.clone());
    insert_opt(&mut map, "alertLaunchImage", notification.alert_launch_image.clone());
    map.insert("hasAction".into(), json!(notification.has_action));
    insert_opt(&mut map, "soundName", notification.sound_name.clone());
    insert_opt(&mut map, "applicationIconBadgeNumber", notification.application_icon_badge_number);
    insert_opt(&mut map, "category", notification.category.clone());
    insert_opt(&mut map, "identifier", notification.identifier.clone());
    insert_opt(
        &mut map,
        "repeatInterval",
        notification.repeat_interval.and_then(repeat_interval_name),
    );
    map.insert("userInfo".into(), Value::Object(notification.user_info.clone()));
    map.insert("remote".into(), json!(false));
    map.insert("notificationType".into(), json!("iOS-local"));
    map.insert("initialNotification".into(), json!(is_initial));
    map
}

/// Converts a legacy notification into a modern request scheduled relative to `now`.
///
/// Without a fire date the request is delivered almost immediately. Repeats of
/// a minute to a week become repeating interval triggers; longer repeats fall
/// back to a calendar trigger on the fire date's matching components.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] if the fire date is in the past
/// and the notification does not repeat.
#[allow(clippy::cast_precision_loss)]
pub fn local_notification_to_request(
    notification: &LocalNotification,
    now: DateTime<Utc>,
) -> Result<NotificationRequest, BridgeError> {
    let identifier = notification
        .identifier
        .clone()
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let sound = match notification.sound_name.as_deref() {
        Some("") => None,
        None | Some("default") => Some(NotificationSound::Default),
        Some(name) => Some(NotificationSound::Named(name.to_string())),
    };

    let content = NotificationContent {
        title: notification.alert_title.clone(),
        body: notification.alert_body.clone(),
        badge: notification.application_icon_badge_number,
        sound,
        category_identifier: notification.category.clone(),
        launch_image_name: notification.alert_launch_image.clone(),
        user_info: notification.user_info.clone(),
        ..NotificationContent::default()
    };

    let delay = notification
        .fire_date
        .map_or(IMMEDIATE_INTERVAL, |fire| (fire - now).num_milliseconds() as f64 / 1_000.0);

    let trigger = match notification.repeat_interval {
        Some(unit) => match repeat_interval_seconds(unit) {
            Some(seconds) => NotificationTrigger::TimeInterval { interval: seconds, repeats: true },
            None => NotificationTrigger::Calendar {
                components: repeat_components(unit, notification.fire_date.unwrap_or(now)),
                repeats: true,
            },
        },
        None if delay > 0.0 => NotificationTrigger::TimeInterval { interval: delay, repeats: false },
        None => {
            return Err(BridgeError::malformed("local notification fire date is in the past"));
        }
    };

    Ok(NotificationRequest { identifier, content, trigger: Some(trigger) })
}

/// Components that recur every `unit`, anchored on `anchor`.
fn repeat_components(unit: CalendarUnit, anchor: DateTime<Utc>) -> DateComponents {
    let mut components = DateComponents {
        day: Some(i64::from(anchor.day())),
        hour: Some(i64::from(anchor.hour())),
        minute: Some(i64::from(anchor.minute())),
        ..DateComponents::default()
    };
    if unit == CalendarUnit::YEAR {
        components.month = Some(i64::from(anchor.month()));
    }
    components
}
