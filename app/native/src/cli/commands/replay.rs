//! `pushbridge replay`: feed a recorded callback trace through the managers.
//!
//! Every message goes through a proxy's by-name entry point, exactly as a host
//! delivering callbacks as messages would. The real managers are activated
//! after a configurable number of messages, so the trace shows both the queued
//! backlog being flushed and later calls being forwarded directly.

use std::io::BufRead;
use std::sync::Arc;

use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;

use crate::cli::output::print_event;
use crate::completion::FetchResult;
use crate::config::BridgeConfig;
use crate::emitter::{BridgeEvent, RecordingEmitter};
use crate::error::BridgeError;
use crate::events::content_available;
use crate::managers::{
    ContentAvailableManager, ContentAvailableProxy, RegistrationManager, RegistrationProxy,
    UserNotificationManager, UserNotificationProxy,
};
use crate::proxy::Dispatch;

/// One line of a trace.
#[derive(Debug, Deserialize)]
struct TraceMessage {
    manager: String,
    selector: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagerKind {
    ContentAvailable,
    Registration,
    UserNotification,
}

impl ManagerKind {
    fn from_name(name: &str) -> Result<Self, BridgeError> {
        match name {
            "contentAvailable" | "content-available" | "ContentAvailableNotificationManager" => {
                Ok(Self::ContentAvailable)
            }
            "registration" | "RemoteNotificationRegistrationManager" => Ok(Self::Registration),
            "userNotification" | "user-notification" | "UserNotificationCenterManager" => {
                Ok(Self::UserNotification)
            }
            other => Err(BridgeError::malformed(format!("unknown manager `{other}`"))),
        }
    }
}

/// A trace line that could not be dispatched.
#[derive(Debug)]
pub struct ReplayFailure {
    /// 1-based line number in the trace.
    pub line: usize,
    pub error: BridgeError,
}

/// What a replay produced.
#[derive(Debug, Default)]
pub struct ReplayReport {
    /// Every emitted event, in emission order.
    pub events: Vec<BridgeEvent>,
    /// Messages read, failures included.
    pub messages: usize,
    /// Messages that were queued by a proxy.
    pub queued: usize,
    /// Messages forwarded straight to a manager.
    pub forwarded: usize,
    /// Queued messages replayed when the managers were activated.
    pub replayed: usize,
    /// Silent notifications finished with the requested result.
    pub finished: usize,
    /// Silent notifications completed with the default result on teardown.
    pub defaulted: usize,
    pub failures: Vec<ReplayFailure>,
}

/// Fresh proxies for one replay, independent of the process-wide ones.
#[derive(Default)]
struct Proxies {
    content_available: ContentAvailableProxy,
    registration: RegistrationProxy,
    user_notification: UserNotificationProxy,
}

impl Proxies {
    fn dispatch(&self, message: TraceMessage) -> Result<Dispatch, BridgeError> {
        match ManagerKind::from_name(&message.manager)? {
            ManagerKind::ContentAvailable => {
                self.content_available.invoke_message(&message.selector, message.args)
            }
            ManagerKind::Registration => self.registration.invoke_message(&message.selector, message.args),
            ManagerKind::UserNotification => {
                self.user_notification.invoke_message(&message.selector, message.args)
            }
        }
    }

    /// Activates a real manager on every proxy. Returns the content-available
    /// manager, the only one with state worth keeping, and the replay count.
    fn activate(
        &self,
        recorder: &Arc<RecordingEmitter>,
        config: &BridgeConfig,
    ) -> (Arc<ContentAvailableManager>, usize) {
        let before = self.queued();
        tracing::debug!(backlog = before, "activating managers");

        let content = ContentAvailableManager::attach_to(
            &self.content_available,
            recorder.clone(),
            &config.silent_notifications,
        );
        RegistrationManager::attach_to(&self.registration, recorder.clone(), &config.registration);
        UserNotificationManager::attach_to(&self.user_notification, recorder.clone());

        (content, before)
    }

    fn queued(&self) -> usize {
        self.content_available.queued_len()
            + self.registration.queued_len()
            + self.user_notification.queued_len()
    }
}

/// Replays the trace read from `reader`.
///
/// Managers are activated once `attach_after` messages have been read, or at
/// the end of the trace if it is shorter. With `finish`, every emitted silent
/// notification is finished with that result; the rest are completed with the
/// configured default when the content-available manager is torn down.
///
/// Lines that fail to parse or dispatch are collected in
/// [`ReplayReport::failures`] and do not stop the replay.
///
/// # Errors
///
/// Returns an error only if reading from `reader` fails.
pub fn replay(
    reader: impl BufRead,
    attach_after: usize,
    finish: Option<FetchResult>,
    config: &BridgeConfig,
) -> Result<ReplayReport, BridgeError> {
    let recorder = Arc::new(RecordingEmitter::new());
    let proxies = Proxies::default();
    let mut content_manager = None;
    let mut report = ReplayReport::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        if content_manager.is_none() && report.messages >= attach_after {
            let (manager, replayed) = proxies.activate(&recorder, config);
            content_manager = Some(manager);
            report.replayed = replayed;
        }
        report.messages += 1;

        let dispatched = serde_json::from_str::<TraceMessage>(trimmed)
            .map_err(BridgeError::from)
            .and_then(|message| proxies.dispatch(message));

        match dispatched {
            Ok(Dispatch::Queued { .. }) => report.queued += 1,
            Ok(Dispatch::Forwarded { .. }) => report.forwarded += 1,
            Err(error) => {
                tracing::warn!(line = index + 1, error = %error, "failed to replay message");
                report.failures.push(ReplayFailure { line: index + 1, error });
            }
        }
    }

    let content_manager = match content_manager {
        Some(manager) => manager,
        None => {
            let (manager, replayed) = proxies.activate(&recorder, config);
            report.replayed = replayed;
            manager
        }
    };

    report.events = recorder.take();

    if let Some(result) = finish {
        report.finished = report
            .events
            .iter()
            .filter(|event| event.name == content_available::RECEIVED)
            .filter_map(|event| event.body.get("notificationId").and_then(Value::as_str))
            .filter(|id| content_manager.finish_remote_notification(id, result))
            .count();
    }
    report.defaulted = content_manager.teardown(&proxies.content_available);

    Ok(report)
}

/// Execute the replay command.
///
/// # Errors
///
/// Returns an error if the trace cannot be read or any message failed.
pub fn execute(
    reader: impl BufRead,
    attach_after: usize,
    finish: Option<FetchResult>,
    json: bool,
    config: &BridgeConfig,
) -> Result<(), BridgeError> {
    let report = replay(reader, attach_after, finish, config)?;

    for (index, event) in report.events.iter().enumerate() {
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            print_event(index + 1, event);
        }
    }

    eprintln!(
        "{} {} messages, {} queued ({} replayed on activation), {} forwarded, {} events",
        "replay:".bold(),
        report.messages,
        report.queued,
        report.replayed,
        report.forwarded,
        report.events.len(),
    );
    if report.finished > 0 || report.defaulted > 0 {
        eprintln!(
            "{} {} finished, {} completed with the default result",
            "silent notifications:".bold(),
            report.finished,
            report.defaulted,
        );
    }
    for failure in &report.failures {
        eprintln!("{} line {}: {}", "error:".red().bold(), failure.line, failure.error);
    }

    if report.failures.is_empty() {
        Ok(())
    } else {
        Err(BridgeError::CommandError(format!(
            "{} of {} messages could not be replayed",
            report.failures.len(),
            report.messages
        )))
    }
}
