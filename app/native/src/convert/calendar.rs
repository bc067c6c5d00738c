//! Calendar units and date components.

use bitflags::bitflags;
use serde_json::{Value, json};

use super::{Dictionary, i64_field, insert_opt};
use crate::error::BridgeError;

bitflags! {
    /// Calendar units, used for repeat intervals and calendar triggers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CalendarUnit: u32 {
        const ERA = 1 << 1;
        const YEAR = 1 << 2;
        const MONTH = 1 << 3;
        const DAY = 1 << 4;
        const HOUR = 1 << 5;
        const MINUTE = 1 << 6;
        const SECOND = 1 << 7;
        const WEEKDAY = 1 << 9;
        const WEEKDAY_ORDINAL = 1 << 10;
        const QUARTER = 1 << 11;
        const WEEK_OF_MONTH = 1 << 12;
        const WEEK_OF_YEAR = 1 << 13;
        const YEAR_FOR_WEEK_OF_YEAR = 1 << 14;
        const NANOSECOND = 1 << 15;
        const CALENDAR = 1 << 20;
        const TIME_ZONE = 1 << 21;
    }
}

/// Dictionary names for each unit, in flag order.
const UNIT_NAMES: &[(&str, CalendarUnit)] = &[
    ("era", CalendarUnit::ERA),
    ("year", CalendarUnit::YEAR),
    ("month", CalendarUnit::MONTH),
    ("day", CalendarUnit::DAY),
    ("hour", CalendarUnit::HOUR),
    ("minute", CalendarUnit::MINUTE),
    ("second", CalendarUnit::SECOND),
    ("weekday", CalendarUnit::WEEKDAY),
    ("weekdayOrdinal", CalendarUnit::WEEKDAY_ORDINAL),
    ("quarter", CalendarUnit::QUARTER),
    ("weekOfMonth", CalendarUnit::WEEK_OF_MONTH),
    ("weekOfYear", CalendarUnit::WEEK_OF_YEAR),
    ("yearForWeekOfYear", CalendarUnit::YEAR_FOR_WEEK_OF_YEAR),
    ("nanosecond", CalendarUnit::NANOSECOND),
    ("calendar", CalendarUnit::CALENDAR),
    ("timeZone", CalendarUnit::TIME_ZONE),
];

impl CalendarUnit {
    /// Looks up a single unit by name. `week` is accepted for `weekOfYear`.
    #[must_use]
    pub fn from_unit_name(name: &str) -> Option<Self> {
        if name == "week" {
            return Some(Self::WEEK_OF_YEAR);
        }
        UNIT_NAMES.iter().find(|(n, _)| *n == name).map(|(_, unit)| *unit)
    }
}

/// Parses a unit name or an array of unit names.
///
/// `null` yields an empty set.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] for unknown names or other value types.
pub fn calendar_unit_from_json(value: &Value) -> Result<CalendarUnit, BridgeError> {
    let parse = |name: &str| {
        CalendarUnit::from_unit_name(name)
            .ok_or_else(|| BridgeError::malformed(format!("unknown calendar unit `{name}`")))
    };

    match value {
        Value::Null => Ok(CalendarUnit::empty()),
        Value::String(name) => parse(name),
        Value::Array(items) => items.iter().try_fold(CalendarUnit::empty(), |units, item| {
            let name = item
                .as_str()
                .ok_or_else(|| BridgeError::malformed("calendar units must be strings"))?;
            Ok(units | parse(name)?)
        }),
        _ => Err(BridgeError::malformed("calendar unit must be a string or an array")),
    }
}

/// Formats a unit set as an array of names.
#[must_use]
pub fn format_calendar_unit(units: CalendarUnit) -> Value {
    let names: Vec<&str> = UNIT_NAMES
        .iter()
        .filter(|(_, unit)| units.contains(*unit))
        .map(|(name, _)| *name)
        .collect();
    json!(names)
}

/// Date components for calendar-based triggers. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateComponents {
    pub era: Option<i64>,
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,
    pub hour: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<i64>,
    pub weekday: Option<i64>,
    pub weekday_ordinal: Option<i64>,
    pub quarter: Option<i64>,
    pub week_of_month: Option<i64>,
    pub week_of_year: Option<i64>,
    pub year_for_week_of_year: Option<i64>,
    pub nanosecond: Option<i64>,
}

impl DateComponents {
    fn fields(&self) -> [(&'static str, Option<i64>); 14] {
        [
            ("era", self.era),
            ("year", self.year),
            ("month", self.month),
            ("day", self.day),
            ("hour", self.hour),
            ("minute", self.minute),
            ("second", self.second),
            ("weekday", self.weekday),
            ("weekdayOrdinal", self.weekday_ordinal),
            ("quarter", self.quarter),
            ("weekOfMonth", self.week_of_month),
            ("weekOfYear", self.week_of_year),
            ("yearForWeekOfYear", self.year_for_week_of_year),
            ("nanosecond", self.nanosecond),
        ]
    }

    /// The units that are set.
    #[must_use]
    pub fn units(&self) -> CalendarUnit {
        self.fields()
            .iter()
            .filter(|(_, value)| value.is_some())
            .filter_map(|(name, _)| CalendarUnit::from_unit_name(name))
            .fold(CalendarUnit::empty(), |units, unit| units | unit)
    }

    /// Returns `true` if no component is set.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.units().is_empty() }
}

/// Parses date components from a dictionary.
#[must_use]
pub fn date_components_from_json(map: &Dictionary) -> DateComponents {
    DateComponents {
        era: i64_field(map, "era"),
        year: i64_field(map, "year"),
        month: i64_field(map, "month"),
        day: i64_field(map, "day"),
        hour: i64_field(map, "hour"),
        minute: i64_field(map, "minute"),
        second: i64_field(map, "second"),
        weekday: i64_field(map, "weekday"),
        weekday_ordinal: i64_field(map, "weekdayOrdinal"),
        quarter: i64_field(map, "quarter"),
        week_of_month: i64_field(map, "weekOfMonth"),
        week_of_year: i64_field(map, "weekOfYear"),
        year_for_week_of_year: i64_field(map, "yearForWeekOfYear"),
        nanosecond: i64_field(map, "nanosecond"),
    }
}

/// Formats date components, omitting unset fields.
#[must_use]
pub fn format_date_components(components: &DateComponents) -> Dictionary {
    let mut map = Dictionary::new();
    for (name, value) in components.fields() {
        insert_opt(&mut map, name, value);
    }
    map
}
