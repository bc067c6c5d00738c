//! Single-shot completion for silent (content-available) notifications.
//!
//! The OS hands every background notification a completion callback that must
//! be invoked exactly once with a [`FetchResult`]. The callback is wrapped in a
//! [`FetchCompletion`] token that can be cloned freely (invocation records are
//! cloned per proxy target) while still guaranteeing a single invocation.
//!
//! [`PendingCompletions`] keeps tokens addressable by notification id so that
//! application code, which only sees a generic event body, can acknowledge the
//! notification later.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::BridgeError;

/// Outcome reported back to the OS for a background fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FetchResult {
    /// New data was downloaded.
    #[serde(rename = "UIBackgroundFetchResultNewData")]
    NewData,
    /// There was nothing new.
    #[default]
    #[serde(rename = "UIBackgroundFetchResultNoData")]
    NoData,
    /// The fetch failed.
    #[serde(rename = "UIBackgroundFetchResultFailed")]
    Failed,
}

impl FetchResult {
    /// Wire name used in event bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewData => "UIBackgroundFetchResultNewData",
            Self::NoData => "UIBackgroundFetchResultNoData",
            Self::Failed => "UIBackgroundFetchResultFailed",
        }
    }
}

impl fmt::Display for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FetchResult {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let short = s.strip_prefix("UIBackgroundFetchResult").unwrap_or(s);
        match short.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "newdata" => Ok(Self::NewData),
            "nodata" => Ok(Self::NoData),
            "failed" => Ok(Self::Failed),
            _ => Err(BridgeError::malformed(format!("unknown fetch result `{s}`"))),
        }
    }
}

type Callback = Box<dyn FnOnce(FetchResult) + Send>;

/// A cloneable handle to a completion callback that runs at most once.
#[derive(Clone)]
pub struct FetchCompletion {
    slot: Arc<Mutex<Option<Callback>>>,
}

impl FetchCompletion {
    /// Wraps an OS completion callback.
    pub fn new<F>(callback: F) -> Self
    where F: FnOnce(FetchResult) + Send + 'static {
        Self {
            slot: Arc::new(Mutex::new(Some(Box::new(callback)))),
        }
    }

    /// A completion that only logs the result.
    ///
    /// Used when a callback arrives as a message with no native callback to
    /// carry, for example when replaying a recorded trace.
    #[must_use]
    pub fn logging(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::new(move |result| tracing::info!(%label, %result, "completion invoked"))
    }

    /// A completion paired with a receiver the host can await.
    #[must_use]
    pub fn channel() -> (Self, CompletionReceiver) {
        let (tx, rx) = oneshot::channel();
        let completion = Self::new(move |result| {
            let _ = tx.send(result);
        });
        (completion, CompletionReceiver { rx })
    }

    /// Invokes the callback with `result`.
    ///
    /// Returns `false` if this completion (or any clone of it) already ran.
    pub fn complete(&self, result: FetchResult) -> bool {
        let callback = self.slot.lock().take();
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => {
                tracing::debug!(%result, "completion already invoked, ignoring");
                false
            }
        }
    }

    /// Returns `true` once the callback has run.
    #[must_use]
    pub fn is_completed(&self) -> bool { self.slot.lock().is_none() }
}

impl fmt::Debug for FetchCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCompletion").field("completed", &self.is_completed()).finish()
    }
}

/// Errors from waiting on a [`CompletionReceiver`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CompletionError {
    /// Nobody completed the notification in time.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// Every handle was dropped without completing.
    #[error("completion dropped without a result")]
    Dropped,
}

/// Host-side end of [`FetchCompletion::channel`].
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: oneshot::Receiver<FetchResult>,
}

impl CompletionReceiver {
    /// Waits for the application to complete, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::Timeout`] if the budget runs out and
    /// [`CompletionError::Dropped`] if the completion can no longer fire.
    pub async fn wait(self, timeout: Duration) -> Result<FetchResult, CompletionError> {
        tokio::time::timeout(timeout, self.rx)
            .await
            .map_err(|_| CompletionError::Timeout(timeout))?
            .map_err(|_| CompletionError::Dropped)
    }

    /// Returns the result if the completion already ran.
    pub fn try_result(&mut self) -> Option<FetchResult> { self.rx.try_recv().ok() }
}

/// Completions awaiting an acknowledgement, keyed by notification id.
#[derive(Debug, Default)]
pub struct PendingCompletions {
    entries: Mutex<HashMap<Uuid, FetchCompletion>>,
}

impl PendingCompletions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Stores `completion` under a fresh time-ordered id.
    pub fn register(&self, completion: FetchCompletion) -> Uuid {
        let id = Uuid::now_v7();
        self.entries.lock().insert(id, completion);
        id
    }

    /// Completes and forgets the entry for `id`.
    ///
    /// Returns `false` if the id is unknown or the completion already ran.
    pub fn finish(&self, id: &Uuid, result: FetchResult) -> bool {
        let completion = self.entries.lock().remove(id);
        let Some(completion) = completion else {
            tracing::warn!(notification_id = %id, "no pending completion for notification");
            return false;
        };
        completion.complete(result)
    }

    /// Returns `true` if `id` is still waiting.
    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool { self.entries.lock().contains_key(id) }

    /// Number of entries waiting.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.lock().len() }

    /// Returns `true` if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.lock().is_empty() }

    /// Completes every waiting entry with `result`, returning how many ran.
    pub fn complete_all(&self, result: FetchResult) -> usize {
        let drained: Vec<FetchCompletion> =
            self.entries.lock().drain().map(|(_, completion)| completion).collect();
        drained.iter().filter(|completion| completion.complete(result)).count()
    }
}
