//! Error types for Pushbridge.
//!
//! This module provides the unified error type used throughout the bridge.
//! The enum serializes with a `kind` tag so it can be shipped to application
//! listeners as a structured event body.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while bridging notification callbacks.
///
/// Queue and target operations on the deferred-dispatch proxy are infallible;
/// these variants cover the dynamic dispatch surface, payload conversion,
/// configuration, and the CLI.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum BridgeError {
    /// A message named a selector outside the impersonated capability set.
    ///
    /// This is a programmer error and should be surfaced loudly.
    #[error("{surface} does not respond to `{selector}`")]
    UnsupportedOperation {
        /// Name of the impersonated capability.
        surface: &'static str,
        /// The selector that was requested.
        selector: String,
    },
    /// A payload could not be converted.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    /// The OS reported a failure to register for remote notifications.
    #[error("Registration failure: {0}")]
    RegistrationFailure(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl BridgeError {
    /// Shorthand for a [`BridgeError::MalformedPayload`].
    pub fn malformed(msg: impl Into<String>) -> Self { Self::MalformedPayload(msg.into()) }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self { Self::MalformedPayload(err.to_string()) }
}

impl From<String> for BridgeError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for BridgeError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_operation_display() {
        let err = BridgeError::UnsupportedOperation {
            surface: "RegistrationHandler",
            selector: "explode".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("RegistrationHandler"));
        assert!(msg.contains("`explode`"));
    }

    #[test]
    fn test_malformed_payload_display() {
        let err = BridgeError::malformed("missing identifier");
        let msg = err.to_string();
        assert!(msg.contains("Malformed payload"));
        assert!(msg.contains("missing identifier"));
    }

    #[test]
    fn test_registration_failure_display() {
        let err = BridgeError::RegistrationFailure("no valid aps-environment".to_string());
        assert!(err.to_string().contains("Registration failure"));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: BridgeError = io_err.into();
        assert!(matches!(err, BridgeError::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_json_error_maps_to_malformed_payload() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: BridgeError = json_err.into();
        assert!(matches!(err, BridgeError::MalformedPayload(_)));
    }

    #[test]
    fn test_command_error_display() {
        let err = BridgeError::CommandError("Generic failure".to_string());
        assert_eq!(err.to_string(), "Generic failure");
    }

    #[test]
    fn test_from_str() {
        let err: BridgeError = "test error".into();
        assert!(matches!(err, BridgeError::CommandError(_)));
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = BridgeError::ConfigError("bad encoding".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("ConfigError"));
        assert!(json.contains("bad encoding"));
    }
}
