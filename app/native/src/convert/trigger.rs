//! Notification triggers.

use serde_json::{Value, json};

use super::{
    DateComponents, Dictionary, bool_field, date_components_from_json, expect_object, f64_field,
    format_date_components, object_field, string_field,
};
use crate::error::BridgeError;

/// Repeating time-interval triggers must be at least this long, in seconds.
const MIN_REPEAT_INTERVAL: f64 = 60.0;

/// A circular region for location triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRegion {
    pub identifier: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub notify_on_entry: bool,
    pub notify_on_exit: bool,
}

/// What causes a notification request to fire.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationTrigger {
    /// Fire after `interval` seconds.
    TimeInterval { interval: f64, repeats: bool },
    /// Fire when the current date matches `components`.
    Calendar { components: DateComponents, repeats: bool },
    /// Fire when entering or leaving `region`.
    Location { region: LocationRegion, repeats: bool },
    /// Delivered by the push service.
    Push { content_available: bool },
}

impl NotificationTrigger {
    /// Dictionary name of the trigger kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TimeInterval { .. } => "timeInterval",
            Self::Calendar { .. } => "calendar",
            Self::Location { .. } => "location",
            Self::Push { .. } => "push",
        }
    }

    /// Whether the trigger fires repeatedly.
    #[must_use]
    pub const fn repeats(&self) -> bool {
        match self {
            Self::TimeInterval { repeats, .. }
            | Self::Calendar { repeats, .. }
            | Self::Location { repeats, .. } => *repeats,
            Self::Push { .. } => false,
        }
    }
}

/// Parses a trigger dictionary.
///
/// ```json
/// { "type": "timeInterval", "timeInterval": 30, "repeats": false }
/// { "type": "calendar", "dateComponents": { "hour": 8 }, "repeats": true }
/// { "type": "location", "region": { "latitude": 0, "longitude": 0, "radius": 100 } }
/// { "type": "push", "contentAvailable": true }
/// ```
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] for a missing or unknown type,
/// a non-positive interval, a repeating interval under a minute, an empty
/// calendar match, or a region without coordinates.
pub fn trigger_from_json(value: &Value) -> Result<NotificationTrigger, BridgeError> {
    let map = expect_object(value, "trigger")?;
    let repeats = bool_field(map, "repeats").unwrap_or(false);

    match string_field(map, "type").as_deref() {
        Some("timeInterval") => {
            let interval = f64_field(map, "timeInterval")
                .ok_or_else(|| BridgeError::malformed("timeInterval trigger requires `timeInterval`"))?;
            if interval <= 0.0 {
                return Err(BridgeError::malformed(format!(
                    "time interval must be positive, got {interval}"
                )));
            }
            if repeats && interval < MIN_REPEAT_INTERVAL {
                return Err(BridgeError::malformed(format!(
                    "repeating time interval must be at least {MIN_REPEAT_INTERVAL} seconds"
                )));
            }
            Ok(NotificationTrigger::TimeInterval { interval, repeats })
        }
        Some("calendar") => {
            let components = date_components_from_json(&object_field(map, "dateComponents"));
            if components.is_empty() {
                return Err(BridgeError::malformed("calendar trigger requires `dateComponents`"));
            }
            Ok(NotificationTrigger::Calendar { components, repeats })
        }
        Some("location") => {
            let region = region_from_json(&object_field(map, "region"))?;
            Ok(NotificationTrigger::Location { region, repeats })
        }
        Some("push") => Ok(NotificationTrigger::Push {
            content_available: bool_field(map, "contentAvailable").unwrap_or(false),
        }),
        Some(other) => Err(BridgeError::malformed(format!("unknown trigger type `{other}`"))),
        None => Err(BridgeError::malformed("trigger requires a `type`")),
    }
}

fn region_from_json(map: &Dictionary) -> Result<LocationRegion, BridgeError> {
    let (Some(latitude), Some(longitude)) = (f64_field(map, "latitude"), f64_field(map, "longitude"))
    else {
        return Err(BridgeError::malformed("location region requires `latitude` and `longitude`"));
    };
    Ok(LocationRegion {
        identifier: string_field(map, "identifier").unwrap_or_default(),
        latitude,
        longitude,
        radius: f64_field(map, "radius").unwrap_or(0.0),
        notify_on_entry: bool_field(map, "notifyOnEntry").unwrap_or(true),
        notify_on_exit: bool_field(map, "notifyOnExit").unwrap_or(false),
    })
}

/// Formats a trigger as a dictionary.
#[must_use]
pub fn format_trigger(trigger: &NotificationTrigger) -> Dictionary {
    let mut map = Dictionary::new();
    map.insert("type".into(), json!(trigger.kind()));
    map.insert("repeats".into(), json!(trigger.repeats()));

    match trigger {
        NotificationTrigger::TimeInterval { interval, .. } => {
            map.insert("timeInterval".into(), json!(interval));
        }
        NotificationTrigger::Calendar { components, .. } => {
            map.insert("dateComponents".into(), Value::Object(format_date_components(components)));
        }
        NotificationTrigger::Location { region, .. } => {
            map.insert(
                "region".into(),
                json!({
                    "identifier": region.identifier,
                    "latitude": region.latitude,
                    "longitude": region.longitude,
                    "radius": region.radius,
                    "notifyOnEntry": region.notify_on_entry,
                    "notifyOnExit": region.notify_on_exit,
                }),
            );
        }
        NotificationTrigger::Push { content_available } => {
            map.insert("contentAvailable".into(), json!(content_available));
        }
    }

    map
}
