//! Notification settings as reported by the OS.

use serde::Serialize;
use serde_json::{Value, json};

use super::Dictionary;

/// Whether the app may post notifications at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Denied,
    Authorized,
    Provisional,
}

/// State of an individual presentation setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationSetting {
    #[default]
    NotSupported,
    Disabled,
    Enabled,
}

impl NotificationSetting {
    const fn is_enabled(self) -> bool { matches!(self, Self::Enabled) }
}

/// How alerts are shown when the device is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertStyle {
    #[default]
    None,
    Banner,
    Alert,
}

/// Snapshot of the user's notification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationSettings {
    pub authorization_status: AuthorizationStatus,
    pub alert: NotificationSetting,
    pub badge: NotificationSetting,
    pub sound: NotificationSetting,
    pub lock_screen: NotificationSetting,
    pub notification_center: NotificationSetting,
    pub car_play: NotificationSetting,
    pub alert_style: AlertStyle,
}

fn to_value<T: Serialize>(value: T) -> Value { serde_json::to_value(value).unwrap_or(Value::Null) }

/// Formats settings.
///
/// `alert`, `badge` and `sound` are reported as booleans, matching the
/// permissions shape application code checks; the remaining settings keep
/// their three-state value.
#[must_use]
pub fn format_settings(settings: &NotificationSettings) -> Dictionary {
    let mut map = Dictionary::new();
    map.insert("authorizationStatus".into(), to_value(settings.authorization_status));
    map.insert("alert".into(), json!(settings.alert.is_enabled()));
    map.insert("badge".into(), json!(settings.badge.is_enabled()));
    map.insert("sound".into(), json!(settings.sound.is_enabled()));
    map.insert("lockScreen".into(), to_value(settings.lock_screen));
    map.insert("notificationCenter".into(), to_value(settings.notification_center));
    map.insert("carPlay".into(), to_value(settings.car_play));
    map.insert("alertStyle".into(), to_value(settings.alert_style));
    map
}
