//! Deferred-dispatch proxy.
//!
//! Native notification callbacks can arrive before the module that handles
//! them has been constructed. A [`DeferredProxy`] stands in for that module:
//! callers invoke it exactly as they would the real thing, and every call made
//! while nothing is attached is recorded. Once the real instance attaches and
//! calls [`DeferredProxy::flush_invocations`], the recorded calls are replayed
//! in arrival order.
//!
//! # Ordering
//!
//! - Calls made with no target attached are queued in arrival order.
//! - Calls made while a queued backlog is still waiting for its flush are held
//!   behind that backlog, so a target always observes calls in the order they
//!   were made. Each one is delivered exactly once, by the flush.
//! - Once the backlog is empty, calls go straight to every attached target, in
//!   attachment order, and are never stored.
//! - Flushing with no target attached drops the backlog.
//!
//! # Concurrency
//!
//! Queue and target list live behind a mutex. Delivery is serialized by a
//! separate re-entrant lock: producers on different threads observe a single
//! arrival order, and a target may call back into the proxy from inside a
//! delivery on the same thread. Re-entrant calls made during a flush or a
//! direct fan-out are queued, then delivered by the same call once every
//! target has seen the outer invocation.

mod invocation;

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;

pub use invocation::{Invocation, Surface};

use crate::error::BridgeError;

/// What happened to a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The call was recorded; `backlog` is the queue length including it.
    Queued { backlog: usize },
    /// The call was delivered to `targets` attached targets.
    Forwarded { targets: usize },
}

/// Summary of a [`DeferredProxy::flush_invocations`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    /// Number of queued invocations replayed.
    pub replayed: usize,
    /// Number of queued invocations discarded because no target was attached.
    pub dropped: usize,
}

struct ProxyState<T: ?Sized, I> {
    queued: Vec<I>,
    targets: Vec<Arc<T>>,
    flushing: bool,
}

/// A stand-in for a capability `T` whose real implementation may not exist yet.
///
/// `I` is the invocation record type for `T`. Capability traits are
/// implemented for the concrete proxy type, so a
/// `DeferredProxy<dyn Handler, HandlerCall>` can be handed out wherever a
/// `&dyn Handler` is expected.
pub struct DeferredProxy<T: ?Sized, I> {
    state: Mutex<ProxyState<T, I>>,
    delivery: ReentrantMutex<()>,
}

impl<T, I> DeferredProxy<T, I>
where
    T: ?Sized,
    I: Invocation<T>,
{
    /// Creates a proxy with no targets and an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProxyState {
                queued: Vec::new(),
                targets: Vec::new(),
                flushing: false,
            }),
            delivery: ReentrantMutex::new(()),
        }
    }

    /// Name of the impersonated capability.
    #[must_use]
    pub const fn surface(&self) -> &'static str { I::NAME }

    /// Queues or forwards an invocation.
    ///
    /// A target that invokes the proxy while a forwarded call is still being
    /// fanned out gets its call queued; it is delivered to every target once
    /// the outer call has reached all of them.
    pub fn invoke(&self, invocation: I) -> Dispatch {
        let _delivery = self.delivery.lock();

        let targets = {
            let mut state = self.state.lock();
            if state.targets.is_empty() || !state.queued.is_empty() || state.flushing {
                state.queued.push(invocation);
                let backlog = state.queued.len();
                drop(state);
                tracing::debug!(surface = I::NAME, backlog, "queued invocation");
                return Dispatch::Queued { backlog };
            }
            state.targets.clone()
        };

        tracing::trace!(
            surface = I::NAME,
            selector = invocation.selector(),
            targets = targets.len(),
            "forwarding invocation"
        );
        let _delivering = FlushingGuard::enter(&self.state);
        for target in &targets {
            invocation.apply(target);
        }

        let nested = self.replay_queued();
        if nested > 0 {
            tracing::debug!(surface = I::NAME, nested, "delivered nested invocations");
        }

        Dispatch::Forwarded { targets: targets.len() }
    }

    /// Dispatches a call named by `selector` with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedOperation`] if the selector is not
    /// part of the impersonated surface, or [`BridgeError::MalformedPayload`]
    /// if the arguments cannot be decoded. Proxy state is left untouched in
    /// both cases.
    pub fn invoke_message(&self, selector: &str, args: Value) -> Result<Dispatch, BridgeError> {
        if !I::responds_to(selector) {
            tracing::error!(surface = I::NAME, selector, "unsupported selector");
            return Err(I::unsupported(selector));
        }
        let invocation = I::decode(selector, args)?;
        Ok(self.invoke(invocation))
    }

    /// Attaches a target. Queued invocations stay queued until the next flush.
    ///
    /// Attaching the same target twice makes it receive every later call twice.
    pub fn add_target(&self, target: Arc<T>) {
        let mut state = self.state.lock();
        state.targets.push(target);
        tracing::debug!(surface = I::NAME, targets = state.targets.len(), "attached target");
    }

    /// Detaches one attachment of `target`. Returns `false` if it was not attached.
    pub fn remove_target(&self, target: &Arc<T>) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.targets.iter().position(|attached| same_target(attached, target))
        else {
            return false;
        };
        state.targets.remove(index);
        tracing::debug!(surface = I::NAME, targets = state.targets.len(), "detached target");
        true
    }

    /// Replays every queued invocation against the attached targets, then
    /// clears the queue.
    ///
    /// With no targets attached the queue is discarded, so callers must attach
    /// before flushing.
    pub fn flush_invocations(&self) -> FlushReport {
        let _delivery = self.delivery.lock();
        let _flushing = FlushingGuard::enter(&self.state);

        let replayed = self.replay_queued();
        let dropped = {
            let mut state = self.state.lock();
            let dropped = state.queued.len();
            state.queued.clear();
            dropped
        };
        let report = FlushReport { replayed, dropped };

        if report.dropped > 0 {
            tracing::warn!(
                surface = I::NAME,
                dropped = report.dropped,
                "flushed with no targets attached, discarding queued invocations"
            );
        } else if report.replayed > 0 {
            tracing::debug!(surface = I::NAME, replayed = report.replayed, "flushed invocations");
        }

        report
    }

    /// Delivers queued invocations, oldest first, until the queue is empty or
    /// no target is left. Calls queued by targets during delivery are picked
    /// up by the same loop. Must run under the delivery lock.
    fn replay_queued(&self) -> usize {
        let mut replayed = 0;

        loop {
            let (batch, targets) = {
                let mut state = self.state.lock();
                if state.queued.is_empty() || state.targets.is_empty() {
                    break;
                }
                (std::mem::take(&mut state.queued), state.targets.clone())
            };

            for invocation in &batch {
                for target in &targets {
                    invocation.apply(target);
                }
            }
            replayed += batch.len();
        }

        replayed
    }

    /// Number of invocations waiting for a flush.
    #[must_use]
    pub fn queued_len(&self) -> usize { self.state.lock().queued.len() }

    /// Selectors of the queued invocations, oldest first.
    #[must_use]
    pub fn queued_selectors(&self) -> Vec<&'static str> {
        self.state.lock().queued.iter().map(|invocation| invocation.selector()).collect()
    }

    /// Number of attachments, counting repeated attachments of one target.
    #[must_use]
    pub fn target_count(&self) -> usize { self.state.lock().targets.len() }

    /// Returns `true` if at least one target is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool { !self.state.lock().targets.is_empty() }
}

impl<T, I> Default for DeferredProxy<T, I>
where
    T: ?Sized,
    I: Invocation<T>,
{
    fn default() -> Self { Self::new() }
}

impl<T: ?Sized, I> std::fmt::Debug for DeferredProxy<T, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DeferredProxy")
            .field("queued", &state.queued.len())
            .field("targets", &state.targets.len())
            .finish()
    }
}

/// Marks the proxy as delivering for the lifetime of the guard, so re-entrant
/// calls queue behind the one in flight. Resets on unwind too.
struct FlushingGuard<'a, T: ?Sized, I> {
    state: &'a Mutex<ProxyState<T, I>>,
    outer: bool,
}

impl<'a, T: ?Sized, I> FlushingGuard<'a, T, I> {
    fn enter(state: &'a Mutex<ProxyState<T, I>>) -> Self {
        let outer = !std::mem::replace(&mut state.lock().flushing, true);
        Self { state, outer }
    }
}

impl<T: ?Sized, I> Drop for FlushingGuard<'_, T, I> {
    fn drop(&mut self) {
        if self.outer {
            self.state.lock().flushing = false;
        }
    }
}

/// Targets are compared by allocation, ignoring trait-object metadata.
fn same_target<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json::json;

    use super::*;

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
                    .get("n")
                    .and_then(Value::as_i64)
                    .map(Self::Ping)
                    .ok_or_else(|| BridgeError::malformed("ping requires an integer `n`")),
                other => Err(Self::unsupported(other)),
            }
        }
    }

    impl Invocation<dyn Ping> for PingCall {
        fn selector(&self) -> &'static str { "ping" }

        fn apply(&self, target: &dyn Ping) {
            match self {
                Self::Ping(n) => target.ping(*n),
            }
        }
    }

    impl Ping for DeferredProxy<dyn Ping, PingCall> {
        fn ping(&self, n: i64) { self.invoke(PingCall::Ping(n)); }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<i64>>,
    }

    impl Recorder {
        fn seen(&self) -> Vec<i64> { self.seen.lock().clone() }
    }

    impl Ping for Recorder {
        fn ping(&self, n: i64) { self.seen.lock().push(n); }
    }

    type PingProxy = DeferredProxy<dyn Ping, PingCall>;

    fn recorder() -> (Arc<Recorder>, Arc<dyn Ping>) {
        let recorder = Arc::new(Recorder::default());
        let target: Arc<dyn Ping> = recorder.clone();
        (recorder, target)
    }

    #[test]
    fn test_calls_without_target_are_queued() {
        let proxy = PingProxy::new();
        assert_eq!(proxy.invoke(PingCall::Ping(1)), Dispatch::Queued { backlog: 1 });
        assert_eq!(proxy.invoke(PingCall::Ping(2)), Dispatch::Queued { backlog: 2 });
        assert_eq!(proxy.queued_len(), 2);
        assert_eq!(proxy.queued_selectors(), vec!["ping", "ping"]);
        assert!(!proxy.is_attached());
    }

    #[test]
    fn test_attach_does_not_flush() {
        let proxy = PingProxy::new();
        let (recorder, target) = recorder();
        proxy.ping(1);
        proxy.add_target(target);
        assert!(recorder.seen().is_empty());
        assert_eq!(proxy.queued_len(), 1);
    }

    #[test]
    fn test_flush_replays_in_order() {
        let proxy = PingProxy::new();
        let (recorder, target) = recorder();
        for n in 1..=5 {
            proxy.ping(n);
        }
        proxy.add_target(target);
        let report = proxy.flush_invocations();

        assert_eq!(report, FlushReport { replayed: 5, dropped: 0 });
        assert_eq!(recorder.seen(), vec![1, 2, 3, 4, 5]);
        assert_eq!(proxy.queued_len(), 0);
    }

    #[test]
    fn test_forwards_directly_once_backlog_is_empty() {
        let proxy = PingProxy::new();
        let (recorder, target) = recorder();
        proxy.add_target(target);

        assert_eq!(proxy.invoke(PingCall::Ping(7)), Dispatch::Forwarded { targets: 1 });
        assert_eq!(recorder.seen(), vec![7]);
        assert_eq!(proxy.queued_len(), 0);

        proxy.flush_invocations();
        assert_eq!(recorder.seen(), vec![7]);
    }

    #[test]
    fn test_call_between_attach_and_flush_waits_behind_backlog() {
        let proxy = PingProxy::new();
        let (recorder, target) = recorder();
        proxy.ping(1);
        proxy.ping(2);
        proxy.add_target(target);
        assert_eq!(proxy.invoke(PingCall::Ping(3)), Dispatch::Queued { backlog: 3 });

        proxy.flush_invocations();
        assert_eq!(recorder.seen(), vec![1, 2, 3]);
    }

    #[test]
    fn test_flush_without_targets_drops_backlog() {
        let proxy = PingProxy::new();
        proxy.ping(1);
        proxy.ping(2);

        let report = proxy.flush_invocations();
        assert_eq!(report, FlushReport { replayed: 0, dropped: 2 });

        let (recorder, target) = recorder();
        proxy.add_target(target);
        assert_eq!(proxy.flush_invocations(), FlushReport::default());
        assert!(recorder.seen().is_empty());
    }

    #[test]
    fn test_fan_out_in_attachment_order() {
        struct Tagged {
            tag: &'static str,
            log: Arc<Mutex<Vec<(&'static str, i64)>>>,
        }
        impl Ping for Tagged {
            fn ping(&self, n: i64) { self.log.lock().push((self.tag, n)); }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let proxy = PingProxy::new();
        proxy.ping(1);
        proxy.add_target(Arc::new(Tagged { tag: "a", log: log.clone() }));
        proxy.add_target(Arc::new(Tagged { tag: "b", log: log.clone() }));
        proxy.flush_invocations();
        proxy.ping(2);

        assert_eq!(*log.lock(), vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
    }

    #[test]
    fn test_duplicate_attachment_delivers_once_per_attachment() {
        let proxy = PingProxy::new();
        let (recorder, target) = recorder();
        proxy.add_target(target.clone());
        proxy.add_target(target.clone());
        assert_eq!(proxy.target_count(), 2);

        proxy.ping(9);
        assert_eq!(recorder.seen(), vec![9, 9]);

        assert!(proxy.remove_target(&target));
        proxy.ping(10);
        assert_eq!(recorder.seen(), vec![9, 9, 10]);
    }

    #[test]
    fn test_remove_target_is_noop_when_absent() {
        let proxy = PingProxy::new();
        let (_recorder, target) = recorder();
        assert!(!proxy.remove_target(&target));
    }

    #[test]
    fn test_removed_target_stops_receiving() {
        let proxy = PingProxy::new();
        let (recorder, target) = recorder();
        proxy.add_target(target.clone());
        proxy.ping(1);
        proxy.remove_target(&target);
        proxy.ping(2);

        assert_eq!(recorder.seen(), vec![1]);
        assert_eq!(proxy.queued_len(), 1);
    }

    #[test]
    fn test_invoke_message_decodes_known_selector() {
        let proxy = PingProxy::new();
        let dispatch = proxy.invoke_message("ping", json!({ "n": 4 })).unwrap();
        assert_eq!(dispatch, Dispatch::Queued { backlog: 1 });
    }

    #[test]
    fn test_invoke_message_rejects_unknown_selector() {
        let proxy = PingProxy::new();
        proxy.ping(1);
        let (_recorder, target) = recorder();
        proxy.add_target(target);

        let err = proxy.invoke_message("pong", json!({})).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnsupportedOperation { surface: "Ping", ref selector } if selector == "pong"
        ));
        assert_eq!(proxy.queued_len(), 1);
        assert_eq!(proxy.target_count(), 1);
    }

    #[test]
    fn test_invoke_message_rejects_bad_arguments() {
        let proxy = PingProxy::new();
        let err = proxy.invoke_message("ping", json!({ "n": "one" })).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload(_)));
        assert_eq!(proxy.queued_len(), 0);
    }

    #[test]
    fn test_reentrant_call_during_flush_keeps_order() {
        struct Echo {
            proxy: Arc<PingProxy>,
            seen: Mutex<Vec<i64>>,
        }
        impl Ping for Echo {
            fn ping(&self, n: i64) {
                self.seen.lock().push(n);
                if n == 1 {
                    self.proxy.ping(100);
                }
            }
        }

        let proxy = Arc::new(PingProxy::new());
        proxy.ping(1);
        proxy.ping(2);
        let echo = Arc::new(Echo { proxy: proxy.clone(), seen: Mutex::new(Vec::new()) });
        proxy.add_target(echo.clone());
        let report = proxy.flush_invocations();

        assert_eq!(report.replayed, 3);
        assert_eq!(*echo.seen.lock(), vec![1, 2, 100]);
        assert_eq!(proxy.queued_len(), 0);
    }

    #[test]
    fn test_reentrant_call_during_fan_out_reaches_every_target_in_order() {
        struct Echo {
            tag: &'static str,
            proxy: Arc<PingProxy>,
            log: Arc<Mutex<Vec<(&'static str, i64)>>>,
        }
        impl Ping for Echo {
            fn ping(&self, n: i64) {
                self.log.lock().push((self.tag, n));
                if self.tag == "a" && n == 1 {
                    assert_eq!(self.proxy.invoke(PingCall::Ping(100)), Dispatch::Queued {
                        backlog: 1
                    });
                }
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let proxy = Arc::new(PingProxy::new());
        proxy.add_target(Arc::new(Echo { tag: "a", proxy: proxy.clone(), log: log.clone() }));
        proxy.add_target(Arc::new(Echo { tag: "b", proxy: proxy.clone(), log: log.clone() }));

        assert_eq!(proxy.invoke(PingCall::Ping(1)), Dispatch::Forwarded { targets: 2 });
        assert_eq!(*log.lock(), vec![("a", 1), ("b", 1), ("a", 100), ("b", 100)]);
        assert_eq!(proxy.queued_len(), 0);

        proxy.ping(2);
        assert_eq!(log.lock().last(), Some(&("b", 2)));
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let proxy = Arc::new(PingProxy::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let proxy = proxy.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        proxy.ping(worker * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let (recorder, target) = recorder();
        proxy.add_target(target);
        proxy.flush_invocations();

        let seen = recorder.seen();
        assert_eq!(seen.len(), 200);
        for worker in 0..4 {
            let mine: Vec<i64> = seen.iter().copied().filter(|n| n / 1000 == worker).collect();
            let expected: Vec<i64> = (0..50).map(|i| worker * 1000 + i).collect();
            assert_eq!(mine, expected);
        }
    }
}
