//! Remote notification registration manager.
//!
//! Forwards the outcome of registering with the push service: a device token
//! on success, an error description on failure. Failure is not an internal
//! error; it is emitted like any other event.

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::{ManagedProxy, emit};
use crate::config::{RegistrationConfig, TokenEncoding};
use crate::emitter::EventEmitter;
use crate::error::BridgeError;
use crate::events::registration;
use crate::proxy::{DeferredProxy, Invocation, Surface};

/// Raw device token bytes as delivered by the OS.
pub type PushToken = Vec<u8>;

/// Why registration with the push service failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationError {
    pub code: i64,
    pub domain: String,
    pub message: String,
    /// Extra information supplied by the OS, usually its `userInfo` dictionary.
    pub details: Value,
}

impl RegistrationError {
    pub fn new(code: i64, domain: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            domain: domain.into(),
            message: message.into(),
            details: Value::Object(Map::new()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

impl std::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} {})", self.message, self.domain, self.code)
    }
}

impl From<RegistrationError> for BridgeError {
    fn from(err: RegistrationError) -> Self { Self::RegistrationFailure(err.to_string()) }
}

/// Receives push-service registration outcomes from the OS.
pub trait RegistrationHandler: Send + Sync {
    fn did_register_for_remote_notifications(&self, device_token: PushToken);

    fn did_fail_to_register_for_remote_notifications(&self, error: RegistrationError);
}

/// Invocation records for [`RegistrationHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationCall {
    DidRegister(PushToken),
    DidFailToRegister(RegistrationError),
}

impl Surface for RegistrationCall {
    const NAME: &'static str = "RemoteNotificationRegistrationManager";
    const SELECTORS: &'static [&'static str] =
        &["didRegisterForRemoteNotifications", "didFailToRegisterForRemoteNotifications"];

    fn decode(selector: &str, args: Value) -> Result<Self, BridgeError> {
        match selector {
            "didRegisterForRemoteNotifications" => {
                let token = args
                    .get("deviceToken")
                    .ok_or_else(|| BridgeError::malformed("registration requires a `deviceToken`"))?;
                Ok(Self::DidRegister(token_from_json(token)?))
            }
            "didFailToRegisterForRemoteNotifications" => {
                let error = args.get("error").unwrap_or(&args);
                Ok(Self::DidFailToRegister(registration_error_from_json(error)?))
            }
            other => Err(Self::unsupported(other)),
        }
    }
}

impl Invocation<dyn RegistrationHandler> for RegistrationCall {
    fn selector(&self) -> &'static str {
        match self {
            Self::DidRegister(_) => "didRegisterForRemoteNotifications",
            Self::DidFailToRegister(_) => "didFailToRegisterForRemoteNotifications",
        }
    }

    fn apply(&self, target: &dyn RegistrationHandler) {
        match self {
            Self::DidRegister(token) => target.did_register_for_remote_notifications(token.clone()),
            Self::DidFailToRegister(error) => {
                target.did_fail_to_register_for_remote_notifications(error.clone());
            }
        }
    }
}

impl RegistrationHandler for DeferredProxy<dyn RegistrationHandler, RegistrationCall> {
    fn did_register_for_remote_notifications(&self, device_token: PushToken) {
        self.invoke(RegistrationCall::DidRegister(device_token));
    }

    fn did_fail_to_register_for_remote_notifications(&self, error: RegistrationError) {
        self.invoke(RegistrationCall::DidFailToRegister(error));
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Accepts a hex string or an array of byte values.
fn token_from_json(value: &Value) -> Result<PushToken, BridgeError> {
    match value {
        Value::String(hex) => decode_hex(hex),
        Value::Array(bytes) => bytes
            .iter()
            .map(|byte| {
                byte.as_u64()
                    .and_then(|byte| u8::try_from(byte).ok())
                    .ok_or_else(|| BridgeError::malformed("device token bytes must be 0-255"))
            })
            .collect(),
        _ => Err(BridgeError::malformed("device token must be a hex string or a byte array")),
    }
}

fn decode_hex(hex: &str) -> Result<PushToken, BridgeError> {
    let hex: String = hex.chars().filter(|c| !matches!(c, ' ' | '<' | '>')).collect();
    if !hex.is_ascii() {
        return Err(BridgeError::malformed("device token hex must be ASCII"));
    }
    if hex.len() % 2 != 0 {
        return Err(BridgeError::malformed("device token hex has an odd length"));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| BridgeError::malformed(format!("invalid hex in device token: `{hex}`")))
        })
        .collect()
}

fn registration_error_from_json(value: &Value) -> Result<RegistrationError, BridgeError> {
    let Value::Object(map) = value else {
        return Err(BridgeError::malformed("registration error must be an object"));
    };
    Ok(RegistrationError {
        code: map.get("code").and_then(Value::as_i64).unwrap_or_default(),
        domain: map.get("domain").and_then(Value::as_str).unwrap_or_default().to_string(),
        message: map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown registration error")
            .to_string(),
        details: map
            .get("details")
            .or_else(|| map.get("userInfo"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
    })
}

// ============================================================================
// Manager
// ============================================================================

/// Formats a device token for the `deviceToken` field.
#[must_use]
pub fn encode_token(token: &[u8], encoding: TokenEncoding) -> String {
    match encoding {
        TokenEncoding::Hex => token.iter().fold(String::with_capacity(token.len() * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        }),
        TokenEncoding::Base64 => STANDARD.encode(token),
    }
}

/// The proxy OS-facing code holds for registration outcomes.
pub type RegistrationProxy = ManagedProxy<dyn RegistrationHandler, RegistrationCall>;

static PROXY: OnceLock<RegistrationProxy> = OnceLock::new();

/// Re-publishes registration outcomes as `remoteNotificationsRegistered` and
/// `remoteNotificationRegistrationError`.
pub struct RegistrationManager {
    emitter: Arc<dyn EventEmitter>,
    encoding: TokenEncoding,
}

impl RegistrationManager {
    #[must_use]
    pub fn new(emitter: Arc<dyn EventEmitter>, config: &RegistrationConfig) -> Self {
        Self { emitter, encoding: config.token_encoding }
    }

    /// The process-wide proxy, created on first access.
    pub fn proxied_instance() -> &'static RegistrationProxy { PROXY.get_or_init(RegistrationProxy::new) }

    /// Builds the manager and activates it on the process-wide proxy.
    pub fn register(emitter: Arc<dyn EventEmitter>, config: &RegistrationConfig) -> Arc<Self> {
        Self::attach_to(Self::proxied_instance(), emitter, config)
    }

    /// Builds the manager and activates it on `proxy`.
    pub fn attach_to(
        proxy: &RegistrationProxy,
        emitter: Arc<dyn EventEmitter>,
        config: &RegistrationConfig,
    ) -> Arc<Self> {
        let manager = Arc::new(Self::new(emitter, config));
        proxy.activate(manager.clone());
        manager
    }

    #[must_use]
    pub const fn supported_events() -> &'static [&'static str] {
        &[registration::REGISTERED, registration::REGISTRATION_ERROR]
    }
}

impl RegistrationHandler for RegistrationManager {
    fn did_register_for_remote_notifications(&self, device_token: PushToken) {
        let body = json!({ "deviceToken": encode_token(&device_token, self.encoding) });
        emit(self.emitter.as_ref(), RegistrationCall::NAME, registration::REGISTERED, body);
    }

    fn did_fail_to_register_for_remote_notifications(&self, error: RegistrationError) {
        tracing::warn!(code = error.code, domain = %error.domain, "remote notification registration failed");
        let body = json!({
            "message": error.message,
            "code": error.code,
            "details": error.details,
        });
        emit(self.emitter.as_ref(), RegistrationCall::NAME, registration::REGISTRATION_ERROR, body);
    }
}

impl std::fmt::Debug for RegistrationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationManager").field("encoding", &self.encoding).finish_non_exhaustive()
    }
}
