//! Notification categories and actions.

use bitflags::bitflags;
use serde_json::{Value, json};

use super::{Dictionary, bool_field, expect_object, insert_opt, string_field, string_list_field};
use crate::error::BridgeError;

bitflags! {
    /// Behaviour flags for a category.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CategoryOptions: u32 {
        /// Send dismiss actions to the app.
        const CUSTOM_DISMISS_ACTION = 1 << 0;
        /// Allow the category in CarPlay.
        const ALLOW_IN_CAR_PLAY = 1 << 1;
        /// Show the title when previews are hidden.
        const HIDDEN_PREVIEWS_SHOW_TITLE = 1 << 2;
        /// Show the subtitle when previews are hidden.
        const HIDDEN_PREVIEWS_SHOW_SUBTITLE = 1 << 3;
    }
}

bitflags! {
    /// Behaviour flags for an action button.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActionOptions: u32 {
        const AUTHENTICATION_REQUIRED = 1 << 0;
        const DESTRUCTIVE = 1 << 1;
        const FOREGROUND = 1 << 2;
    }
}

const CATEGORY_OPTION_NAMES: &[(&str, CategoryOptions)] = &[
    ("customDismissAction", CategoryOptions::CUSTOM_DISMISS_ACTION),
    ("allowInCarPlay", CategoryOptions::ALLOW_IN_CAR_PLAY),
    ("hiddenPreviewsShowTitle", CategoryOptions::HIDDEN_PREVIEWS_SHOW_TITLE),
    ("hiddenPreviewsShowSubtitle", CategoryOptions::HIDDEN_PREVIEWS_SHOW_SUBTITLE),
];

const ACTION_OPTION_NAMES: &[(&str, ActionOptions)] = &[
    ("authenticationRequired", ActionOptions::AUTHENTICATION_REQUIRED),
    ("destructive", ActionOptions::DESTRUCTIVE),
    ("foreground", ActionOptions::FOREGROUND),
];

/// Extra fields of an action that collects text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInputAction {
    pub button_title: String,
    pub placeholder: String,
}

/// A button shown with notifications of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub identifier: String,
    pub title: String,
    pub options: ActionOptions,
    pub text_input: Option<TextInputAction>,
}

/// A group of actions that notifications can opt into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationCategory {
    pub identifier: String,
    pub actions: Vec<NotificationAction>,
    pub intent_identifiers: Vec<String>,
    pub hidden_previews_body_placeholder: Option<String>,
    pub options: CategoryOptions,
}

/// Reads flags given either as `{ name: bool }` or as `[name, ...]`.
fn flags_from_json<F: bitflags::Flags + Copy>(value: Option<&Value>, names: &[(&str, F)]) -> F {
    let enabled = |name: &str| names.iter().find(|(n, _)| *n == name).map(|(_, flag)| *flag);
    match value {
        Some(Value::Object(map)) => names
            .iter()
            .filter(|(name, _)| bool_field(map, name).unwrap_or(false))
            .fold(F::empty(), |flags, (_, flag)| flags.union(*flag)),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(enabled)
            .fold(F::empty(), F::union),
        _ => F::empty(),
    }
}

fn format_flags<F: bitflags::Flags + Copy>(flags: F, names: &[(&str, F)]) -> Dictionary {
    names
        .iter()
        .map(|(name, flag)| ((*name).to_string(), json!(flags.contains(*flag))))
        .collect()
}

fn action_from_json(value: &Value) -> Result<NotificationAction, BridgeError> {
    let map = expect_object(value, "notification action")?;
    let identifier = string_field(map, "identifier")
        .ok_or_else(|| BridgeError::malformed("notification action requires an `identifier`"))?;
    let text_input = map.get("textInput").and_then(Value::as_object).map(|input| TextInputAction {
        button_title: string_field(input, "buttonTitle").unwrap_or_default(),
        placeholder: string_field(input, "placeholder").unwrap_or_default(),
    });

    Ok(NotificationAction {
        title: string_field(map, "title").unwrap_or_else(|| identifier.clone()),
        identifier,
        options: flags_from_json(map.get("options"), ACTION_OPTION_NAMES),
        text_input,
    })
}

fn format_action(action: &NotificationAction) -> Value {
    let mut map = Dictionary::new();
    map.insert("identifier".into(), json!(action.identifier));
    map.insert("title".into(), json!(action.title));
    map.insert("options".into(), Value::Object(format_flags(action.options, ACTION_OPTION_NAMES)));
    insert_opt(
        &mut map,
        "textInput",
        action.text_input.as_ref().map(|input| {
            json!({ "buttonTitle": input.button_title, "placeholder": input.placeholder })
        }),
    );
    Value::Object(map)
}

/// Parses a category dictionary.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedPayload`] if the category or one of its
/// actions has no identifier.
pub fn category_from_json(value: &Value) -> Result<NotificationCategory, BridgeError> {
    let map = expect_object(value, "notification category")?;
    let identifier = string_field(map, "identifier")
        .ok_or_else(|| BridgeError::malformed("notification category requires an `identifier`"))?;
    let actions = map
        .get("actions")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(action_from_json).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    Ok(NotificationCategory {
        identifier,
        actions,
        intent_identifiers: string_list_field(map, "intentIdentifiers"),
        hidden_previews_body_placeholder: string_field(map, "hiddenPreviewsBodyPlaceholder"),
        options: flags_from_json(map.get("options"), CATEGORY_OPTION_NAMES),
    })
}

/// Formats category options as `{ name: bool }` for every known option.
#[must_use]
pub fn format_category_options(options: CategoryOptions) -> Dictionary {
    format_flags(options, CATEGORY_OPTION_NAMES)
}

/// Formats a category as a dictionary.
#[must_use]
pub fn format_category(category: &NotificationCategory) -> Dictionary {
    let mut map = Dictionary::new();
    map.insert("identifier".into(), json!(category.identifier));
    map.insert(
        "actions".into(),
        Value::Array(category.actions.iter().map(format_action).collect()),
    );
    map.insert("intentIdentifiers".into(), json!(category.intent_identifiers));
    insert_opt(
        &mut map,
        "hiddenPreviewsBodyPlaceholder",
        category.hidden_previews_body_placeholder.clone(),
    );
    map.insert("options".into(), Value::Object(format_category_options(category.options)));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_with_actions() {
        let category = category_from_json(&json!({
            "identifier": "MESSAGE",
            "actions": [
                { "identifier": "REPLY", "title": "Reply", "textInput": { "buttonTitle": "Send" } },
                { "identifier": "DELETE", "options": ["destructive", "authenticationRequired"] }
            ],
            "options": { "customDismissAction": true }
        }))
        .unwrap();

        assert_eq!(category.actions.len(), 2);
        assert_eq!(category.actions[1].title, "DELETE");
        assert_eq!(
            category.actions[1].options,
            ActionOptions::DESTRUCTIVE | ActionOptions::AUTHENTICATION_REQUIRED
        );
        assert_eq!(category.options, CategoryOptions::CUSTOM_DISMISS_ACTION);
        assert_eq!(category.actions[0].text_input.as_ref().unwrap().button_title, "Send");
    }

    #[test]
    fn test_format_category_options_lists_every_flag() {
        let formatted = format_category_options(CategoryOptions::ALLOW_IN_CAR_PLAY);
        assert_eq!(
            Value::Object(formatted),
            json!({
                "customDismissAction": false,
                "allowInCarPlay": true,
                "hiddenPreviewsShowTitle": false,
                "hiddenPreviewsShowSubtitle": false
            })
        );
    }

    #[test]
    fn test_category_requires_identifier() {
        assert!(category_from_json(&json!({ "actions": [] })).is_err());
        assert!(category_from_json(&json!({ "identifier": "A", "actions": [{}] })).is_err());
    }

    #[test]
    fn test_format_category_shape() {
        let category = category_from_json(&json!({ "identifier": "A" })).unwrap();
        let formatted = Value::Object(format_category(&category));
        assert_eq!(formatted["identifier"], json!("A"));
        assert_eq!(formatted["actions"], json!([]));
        assert_eq!(formatted["intentIdentifiers"], json!([]));
    }
}
