//! End-to-end tests for the deferred-dispatch proxy and the managers built on it.
//!
//! These exercise the public API only: OS-facing code calls through a proxy,
//! the application side activates real managers, and listeners observe events
//! through an emitter.
//!
//! ```bash
//! cargo test -p pushbridge --test bridge_integration
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use pushbridge_lib::config::{RegistrationConfig, SilentNotificationConfig};
use pushbridge_lib::convert::{DEFAULT_ACTION_IDENTIFIER, DISMISS_ACTION_IDENTIFIER};
use pushbridge_lib::emitter::{ChannelEmitter, RecordingEmitter};
use pushbridge_lib::events;
use pushbridge_lib::managers::{
    ContentAvailableProxy, RegistrationError, RegistrationProxy, UserNotificationProxy,
};
use pushbridge_lib::{
    BridgeError, ContentAvailableHandler, ContentAvailableManager, DeferredProxy, Dispatch,
    EventHub, FetchCompletion, FetchResult, Invocation, ManagerState, RegistrationHandler,
    RegistrationManager, Surface, UserNotificationManager,
};
use serde_json::{Value, json};

// ============================================================================
// Test Capability
// ============================================================================

trait Ping: Send + Sync {
    fn ping(&self, n: i64);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PingCall {
    Ping(i64),
}

impl Surface for PingCall {
    const NAME: &'static str = "Ping";
    const SELECTORS: &'static [&'static str] = &["ping"];

    fn decode(selector: &str, args: Value) -> Result<Self, BridgeError> {
        match selector {
            "ping" => args
                .as_i64()
                .map(Self::Ping)
                .ok_or_else(|| BridgeError::malformed("ping takes an integer")),
            other => Err(Self::unsupported(other)),
        }
    }
}

impl Invocation<dyn Ping> for PingCall {
    fn selector(&self) -> &'static str { "ping" }

    fn apply(&self, target: &dyn Ping) {
        let Self::Ping(n) = self;
        target.ping(*n);
    }
}

impl Ping for DeferredProxy<dyn Ping, PingCall> {
    fn ping(&self, n: i64) { self.invoke(PingCall::Ping(n)); }
}

#[derive(Default)]
struct Target {
    seen: Mutex<Vec<i64>>,
}

impl Target {
    fn seen(&self) -> Vec<i64> { self.seen.lock().clone() }
}

impl Ping for Target {
    fn ping(&self, n: i64) { self.seen.lock().push(n); }
}

type PingProxy = DeferredProxy<dyn Ping, PingCall>;

// ============================================================================
// Proxy Properties
// ============================================================================

#[test]
fn test_backlog_is_replayed_in_arrival_order() {
    let proxy = PingProxy::new();
    for n in 0..50 {
        proxy.ping(n);
    }

    let target = Arc::new(Target::default());
    proxy.add_target(target.clone());
    assert!(target.seen().is_empty(), "attaching must not flush");

    let report = proxy.flush_invocations();
    assert_eq!(report.replayed, 50);
    assert_eq!(target.seen(), (0..50).collect::<Vec<_>>());
}

#[test]
fn test_post_attach_calls_are_never_replayed_twice() {
    let proxy = PingProxy::new();
    let target = Arc::new(Target::default());
    proxy.add_target(target.clone());

    assert_eq!(proxy.invoke(PingCall::Ping(7)), Dispatch::Forwarded { targets: 1 });
    assert_eq!(proxy.queued_len(), 0);

    let report = proxy.flush_invocations();
    assert_eq!(report.replayed, 0);
    assert_eq!(target.seen(), vec![7]);
}

#[test]
fn test_flush_without_targets_drops_backlog() {
    let proxy = PingProxy::new();
    proxy.ping(1);
    proxy.ping(2);

    let report = proxy.flush_invocations();
    assert_eq!(report.dropped, 2);
    assert_eq!(proxy.queued_len(), 0);

    let target = Arc::new(Target::default());
    proxy.add_target(target.clone());
    assert_eq!(proxy.flush_invocations().replayed, 0);
    assert!(target.seen().is_empty());
}

#[test]
fn test_duplicate_attachment_fans_out_per_attachment() {
    let proxy = PingProxy::new();
    let target = Arc::new(Target::default());
    proxy.add_target(target.clone());
    proxy.add_target(target.clone());

    proxy.ping(1);
    proxy.ping(2);

    assert_eq!(proxy.target_count(), 2);
    assert_eq!(target.seen(), vec![1, 1, 2, 2]);
}

#[test]
fn test_unknown_selector_leaves_state_untouched() {
    let proxy = PingProxy::new();
    proxy.ping(1);

    let err = proxy.invoke_message("pong", json!(1)).unwrap_err();
    assert!(matches!(err, BridgeError::UnsupportedOperation { surface: "Ping", ref selector } if selector == "pong"));
    assert_eq!(proxy.queued_len(), 1);
    assert_eq!(proxy.target_count(), 0);

    let target = Arc::new(Target::default());
    proxy.add_target(target.clone());
    proxy.invoke_message("pong", json!(2)).unwrap_err();
    proxy.flush_invocations();
    assert_eq!(target.seen(), vec![1]);
}

// ============================================================================
// Startup Ordering
// ============================================================================

#[test]
fn test_queued_pings_reach_target_after_flush() {
    let proxy = PingProxy::new();
    proxy.ping(1);
    proxy.ping(2);

    let target = Arc::new(Target::default());
    proxy.add_target(target.clone());
    proxy.flush_invocations();

    assert_eq!(target.seen(), vec![1, 2]);
    assert_eq!(proxy.queued_len(), 0);
}

#[test]
fn test_ping_between_attach_and_flush_keeps_order() {
    let proxy = PingProxy::new();
    proxy.ping(1);
    proxy.ping(2);

    let target = Arc::new(Target::default());
    proxy.add_target(target.clone());
    proxy.ping(3);
    proxy.flush_invocations();

    assert_eq!(target.seen(), vec![1, 2, 3]);

    // Nothing is left to deliver a second time.
    proxy.flush_invocations();
    proxy.ping(4);
    assert_eq!(target.seen(), vec![1, 2, 3, 4]);
}

#[test]
fn test_token_registered_before_activation_emits_once() {
    let proxy = RegistrationProxy::new();
    proxy.did_register_for_remote_notifications(vec![0xab, 0xcd]);
    assert_eq!(proxy.state(), ManagerState::Unready);

    let recorder = Arc::new(RecordingEmitter::new());
    RegistrationManager::attach_to(&proxy, recorder.clone(), &RegistrationConfig::default());

    assert_eq!(proxy.state(), ManagerState::Ready);
    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, events::registration::REGISTERED);
    assert_eq!(events[0].body, json!({ "deviceToken": "abcd" }));
}

#[test]
fn test_malformed_silent_payload_still_emits_and_completes() {
    let proxy = ContentAvailableProxy::new();
    let recorder = Arc::new(RecordingEmitter::new());
    let manager =
        ContentAvailableManager::attach_to(&proxy, recorder.clone(), &SilentNotificationConfig::default());

    let (completion, mut receiver) = FetchCompletion::channel();
    proxy.did_receive_silent_notification(json!({ "unexpected": [1, 2, 3] }), completion.clone());

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, events::content_available::RECEIVED);
    assert_eq!(events[0].body["malformed"], true);

    assert!(!completion.is_completed());
    let id = events[0].body["notificationId"].as_str().unwrap();
    assert!(manager.finish_remote_notification(id, FetchResult::Failed));
    assert_eq!(receiver.try_result(), Some(FetchResult::Failed));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_producers_keep_per_thread_order_across_activation() {
    let proxy = Arc::new(PingProxy::new());
    let target = Arc::new(Target::default());

    let producers: Vec<_> = (0..4_i64)
        .map(|thread_id| {
            let proxy = proxy.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    proxy.ping(thread_id * 1_000 + i);
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(1));
    proxy.add_target(target.clone());
    proxy.flush_invocations();

    for producer in producers {
        producer.join().unwrap();
    }
    proxy.flush_invocations();

    let seen = target.seen();
    assert_eq!(seen.len(), 1_000);
    for thread_id in 0..4 {
        let own: Vec<_> = seen.iter().copied().filter(|n| n / 1_000 == thread_id).collect();
        assert_eq!(own, (0..250).map(|i| thread_id * 1_000 + i).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_completion_can_be_finished_from_another_task() {
    let proxy = ContentAvailableProxy::new();
    let (emitter, mut events) = ChannelEmitter::new();
    let manager = ContentAvailableManager::attach_to(
        &proxy,
        Arc::new(emitter),
        &SilentNotificationConfig::default(),
    );

    let (completion, receiver) = FetchCompletion::channel();
    proxy.did_receive_silent_notification(json!({ "aps": { "content-available": 1 } }), completion);

    let event = events.recv().await.unwrap();
    let id = event.body["notificationId"].as_str().unwrap().to_string();
    let finisher = manager.clone();
    tokio::spawn(async move { finisher.finish_remote_notification(&id, FetchResult::NewData) });

    let result = receiver.wait(Duration::from_secs(1)).await.unwrap();
    assert_eq!(result, FetchResult::NewData);
}

// ============================================================================
// Listener Hub
// ============================================================================

#[test]
fn test_hub_listeners_receive_user_notification_events() {
    let proxy = UserNotificationProxy::new();
    let hub = Arc::new(EventHub::new());
    let identifiers = Arc::new(Mutex::new(Vec::new()));

    let sink = identifiers.clone();
    hub.add_listener(events::user_notification::WILL_PRESENT, move |body| {
        sink.lock().push(body["identifier"].clone());
    });

    proxy
        .invoke_message(
            "willPresentNotification",
            json!({ "notification": { "request": { "identifier": "early" } } }),
        )
        .unwrap();
    UserNotificationManager::attach_to(&proxy, hub.clone());
    proxy
        .invoke_message(
            "willPresentNotification",
            json!({ "notification": { "request": { "identifier": "late" } } }),
        )
        .unwrap();

    assert_eq!(*identifiers.lock(), vec![json!("early"), json!("late")]);
}

#[test]
fn test_response_action_identifiers_are_public() {
    let proxy = UserNotificationProxy::new();
    let recorder = Arc::new(RecordingEmitter::new());
    UserNotificationManager::attach_to(&proxy, recorder.clone());

    for action in [DEFAULT_ACTION_IDENTIFIER, DISMISS_ACTION_IDENTIFIER] {
        proxy
            .invoke_message(
                "didReceiveNotificationResponse",
                json!({
                    "response": {
                        "actionIdentifier": action,
                        "notification": { "request": { "identifier": "n-1" } },
                    }
                }),
            )
            .unwrap();
    }

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].body["actionIdentifier"], DEFAULT_ACTION_IDENTIFIER);
    assert_eq!(events[0].body["userInteraction"], true);
    assert_eq!(events[1].body["actionIdentifier"], DISMISS_ACTION_IDENTIFIER);
    assert_eq!(events[1].body["userInteraction"], false);
}

#[test]
fn test_registration_failure_is_an_event_not_an_error() {
    let proxy = RegistrationProxy::new();
    let hub = Arc::new(EventHub::new());
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let sink = bodies.clone();
    hub.add_listener(events::registration::REGISTRATION_ERROR, move |body| sink.lock().push(body.clone()));

    RegistrationManager::attach_to(&proxy, hub, &RegistrationConfig::default());
    proxy.did_fail_to_register_for_remote_notifications(RegistrationError::new(
        3000,
        "NSCocoaErrorDomain",
        "no valid aps-environment entitlement",
    ));

    let bodies = bodies.lock();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["code"], 3000);
}

#[test]
fn test_process_wide_proxy_is_shared() {
    let first = ContentAvailableManager::proxied_instance();
    let second = ContentAvailableManager::proxied_instance();
    assert!(std::ptr::eq(first, second));
}
