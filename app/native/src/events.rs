//! Centralized event names for application listeners.
//!
//! All events emitted downstream are defined here so the native side and the
//! application code stay in sync. Names are lowerCamelCase and match what
//! existing JavaScript listeners subscribe to.

/// Remote notification registration events.
pub mod registration {
    /// Emitted when the OS hands out a device token.
    ///
    /// Payload: `{ deviceToken: String }`
    pub const REGISTERED: &str = "remoteNotificationsRegistered";

    /// Emitted when registration with the push service fails.
    ///
    /// Payload: `{ message: String, code: i64, details: Object }`
    pub const REGISTRATION_ERROR: &str = "remoteNotificationRegistrationError";
}

/// Silent (content-available) notification events.
pub mod content_available {
    /// Emitted when a background notification arrives.
    ///
    /// Payload: formatted notification including `notificationId`, which must
    /// be passed back to finish the background fetch.
    pub const RECEIVED: &str = "contentAvailableNotificationReceived";
}

/// User notification center events.
pub mod user_notification {
    /// Emitted when the user interacts with a delivered notification.
    ///
    /// Payload: formatted notification response.
    pub const RESPONSE_RECEIVED: &str = "didReceiveNotificationResponse";

    /// Emitted when a notification is about to be shown in the foreground.
    ///
    /// Payload: formatted notification with `foreground: true`.
    pub const WILL_PRESENT: &str = "willPresentNotification";
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [&str; 5] = [
        registration::REGISTERED,
        registration::REGISTRATION_ERROR,
        content_available::RECEIVED,
        user_notification::RESPONSE_RECEIVED,
        user_notification::WILL_PRESENT,
    ];

    #[test]
    fn test_event_names_are_lower_camel_case() {
        for event in ALL {
            assert!(
                event.chars().next().is_some_and(|c| c.is_ascii_lowercase()),
                "Event '{event}' should start lowercase"
            );
            assert!(
                event.chars().all(|c| c.is_ascii_alphanumeric()),
                "Event '{event}' should be alphanumeric"
            );
        }
    }

    #[test]
    fn test_event_names_are_unique() {
        let mut names = ALL.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }
}
