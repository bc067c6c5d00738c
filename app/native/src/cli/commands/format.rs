//! `pushbridge format`: run a payload formatter over a JSON document.

use clap::ValueEnum;
use serde_json::Value;

use crate::cli::output::print_highlighted_json;
use crate::convert::{
    category_from_json, format_category, format_content_available_notification,
    format_legacy_remote_notification, format_local_notification, format_notification,
    format_request, format_response, local_notification_from_json, notification_from_json,
    request_from_json, response_from_json,
};
use crate::error::BridgeError;

/// Formatter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatKind {
    /// Raw background notification payload (`aps.content-available`).
    ContentAvailable,
    /// Raw remote notification payload from the legacy delegate path.
    LegacyRemote,
    /// Notification request (`identifier`, `content`, `trigger`).
    Request,
    /// Notification category with its actions.
    Category,
    /// Legacy local notification.
    LocalNotification,
    /// Delivered notification (`date`, `request`).
    Notification,
    /// User response to a delivered notification.
    Response,
}

/// Runs the formatter for `kind` over `payload`.
///
/// Remote payload formatters never fail; the others reject documents they
/// cannot parse.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] if `payload` does not parse as `kind`.
pub fn format_payload(kind: FormatKind, payload: &Value, initial: bool) -> Result<Value, BridgeError> {
    let formatted = match kind {
        FormatKind::ContentAvailable => format_content_available_notification(payload),
        FormatKind::LegacyRemote => format_legacy_remote_notification(payload, initial),
        FormatKind::Request => format_request(&request_from_json(payload)?),
        FormatKind::Category => format_category(&category_from_json(payload)?),
        FormatKind::LocalNotification => {
            format_local_notification(&local_notification_from_json(payload)?, initial)
        }
        FormatKind::Notification => format_notification(&notification_from_json(payload)?),
        FormatKind::Response => format_response(&response_from_json(payload)?),
    };
    Ok(Value::Object(formatted))
}

/// Execute the format command.
///
/// # Errors
///
/// Returns an error if the payload cannot be formatted.
pub fn execute(kind: FormatKind, payload: &Value, initial: bool, raw: bool) -> Result<(), BridgeError> {
    let formatted = format_payload(kind, payload, initial)?;
    if raw {
        println!("{}", serde_json::to_string(&formatted)?);
    } else {
        print_highlighted_json(&formatted);
    }
    Ok(())
}
