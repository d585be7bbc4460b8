mod transport;

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

pub use transport::{ProbeTransport, TelemetryError, TelemetryFrame, TelemetryTransport};

pub type FrameCallback = Box<dyn FnMut(&TelemetryFrame)>;

const RETRY_BACKOFF: Duration = Duration::from_secs(3);

enum SubscriptionState {
    /// No subscription. An explicit stop lands here after the server-side
    /// release signal has been sent.
    Idle,
    /// Channel open, no frame seen yet.
    Subscribing {
        target: String,
        rx: Receiver<TelemetryFrame>,
    },
    /// Frames are flowing for `target`.
    Streaming {
        target: String,
        rx: Receiver<TelemetryFrame>,
    },
    /// Transport dropped while we were still interested; resubscribe to the
    /// same target once the backoff elapses, if its callback is still there.
    Reconnecting { target: String, retry_at: Instant },
}

impl SubscriptionState {
    fn target(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Subscribing { target, .. }
            | Self::Streaming { target, .. }
            | Self::Reconnecting { target, .. } => Some(target),
        }
    }
}

/// Owns at most one live telemetry subscription, keyed by a stable client
/// identifier, and fans frames out to the single callback registered for
/// the subscribed target. Driven from the frame loop via [`Self::tick`];
/// all transport I/O is delegated so the state machine stays headless.
pub struct TelemetryManager<T: TelemetryTransport> {
    transport: T,
    client_id: String,
    is_active: bool,
    state: SubscriptionState,
    callbacks: HashMap<String, FrameCallback>,
    last_frames: HashMap<String, TelemetryFrame>,
    backoff: Duration,
}

impl<T: TelemetryTransport> TelemetryManager<T> {
    pub fn new(transport: T, client_id: String) -> Self {
        Self::with_backoff(transport, client_id, RETRY_BACKOFF)
    }

    pub fn with_backoff(transport: T, client_id: String, backoff: Duration) -> Self {
        Self {
            transport,
            client_id,
            is_active: false,
            state: SubscriptionState::Idle,
            callbacks: HashMap::new(),
            last_frames: HashMap::new(),
            backoff,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Interest flag, toggled by the surrounding view's visibility. Losing
    /// interest tears the active subscription down; `monitor` calls that
    /// arrive while inactive are guaranteed no-ops.
    pub fn set_active(&mut self, active: bool) {
        if self.is_active == active {
            return;
        }
        self.is_active = active;
        if !active {
            self.stop_all();
        }
    }

    pub fn active_target(&self) -> Option<&str> {
        self.state.target()
    }

    pub fn is_reconnecting(&self) -> bool {
        matches!(self.state, SubscriptionState::Reconnecting { .. })
    }

    pub fn last_frame(&self, target: &str) -> Option<&TelemetryFrame> {
        self.last_frames.get(target)
    }

    /// Subscribe to live frames for `target`. If a stream for the same
    /// target is already open this only re-registers the callback and
    /// replays the cached last frame synchronously; otherwise any existing
    /// subscription is stopped first so at most one is ever live.
    pub fn monitor(&mut self, target: &str, mut callback: FrameCallback) {
        if !self.is_active {
            debug!(addr = target, "monitor ignored while view is hidden");
            return;
        }

        let same_stream = matches!(
            &self.state,
            SubscriptionState::Subscribing { target: current, .. }
            | SubscriptionState::Streaming { target: current, .. }
                if current == target
        );
        if same_stream {
            if let Some(frame) = self.last_frames.get(target) {
                callback(frame);
            }
            self.callbacks.insert(target.to_string(), callback);
            return;
        }

        self.teardown();
        self.callbacks.insert(target.to_string(), callback);
        self.open(target.to_string(), Instant::now());
    }

    /// Deregister the callback for `target`; tears the subscription down if
    /// `target` is the currently active one.
    pub fn stop_monitoring(&mut self, target: &str) {
        self.callbacks.remove(target);
        if self.state.target() == Some(target) {
            self.teardown();
        }
    }

    /// Unconditional teardown; idempotent, used when the surrounding view
    /// goes away entirely.
    pub fn stop_all(&mut self) {
        self.callbacks.clear();
        self.teardown();
    }

    /// Drive the state machine one step: drain pending frames, detect
    /// transport drops, and resubscribe once the backoff elapses. Returns
    /// true while more activity is expected so the caller keeps repainting.
    pub fn tick(&mut self, now: Instant) -> bool {
        match std::mem::replace(&mut self.state, SubscriptionState::Idle) {
            SubscriptionState::Idle => false,
            SubscriptionState::Subscribing { target, rx } => self.drain(target, rx, false, now),
            SubscriptionState::Streaming { target, rx } => self.drain(target, rx, true, now),
            SubscriptionState::Reconnecting { target, retry_at } => {
                if now < retry_at {
                    self.state = SubscriptionState::Reconnecting { target, retry_at };
                    return true;
                }

                if self.is_active && self.callbacks.contains_key(&target) {
                    debug!(addr = %target, "resubscribing after transport error");
                    self.open(target, now);
                } else {
                    // Nobody wants the stream anymore; release server-side
                    // resources instead of resubscribing.
                    self.send_stop();
                }
                true
            }
        }
    }

    fn drain(
        &mut self,
        target: String,
        rx: Receiver<TelemetryFrame>,
        mut streaming: bool,
        now: Instant,
    ) -> bool {
        loop {
            match rx.try_recv() {
                Ok(frame) => {
                    streaming = true;
                    if let Some(callback) = self.callbacks.get_mut(&target) {
                        callback(&frame);
                    }
                    self.last_frames.insert(target.clone(), frame);
                }
                Err(TryRecvError::Empty) => {
                    self.state = if streaming {
                        SubscriptionState::Streaming { target, rx }
                    } else {
                        SubscriptionState::Subscribing { target, rx }
                    };
                    return true;
                }
                Err(TryRecvError::Disconnected) => {
                    if self.is_active && self.callbacks.contains_key(&target) {
                        warn!(addr = %target, "telemetry stream dropped; will resubscribe");
                        self.state = SubscriptionState::Reconnecting {
                            target,
                            retry_at: now + self.backoff,
                        };
                    } else {
                        self.send_stop();
                    }
                    return true;
                }
            }
        }
    }

    fn open(&mut self, target: String, now: Instant) {
        match self.transport.open_stream(&target, &self.client_id) {
            Ok(rx) => {
                debug!(addr = %target, "telemetry stream opened");
                self.state = SubscriptionState::Subscribing { target, rx };
            }
            Err(error) => {
                warn!(addr = %target, %error, "telemetry stream open failed; will retry");
                self.state = SubscriptionState::Reconnecting {
                    target,
                    retry_at: now + self.backoff,
                };
            }
        }
    }

    fn teardown(&mut self) {
        let had_subscription = !matches!(self.state, SubscriptionState::Idle);
        self.state = SubscriptionState::Idle;
        if had_subscription {
            self.send_stop();
        }
    }

    /// Best effort, attempted exactly once per stop. A lost release only
    /// risks a server-side resource leak, never local correctness.
    fn send_stop(&mut self) {
        if let Err(error) = self.transport.close_subscription(&self.client_id) {
            warn!(client_id = %self.client_id, %error, "telemetry stop signal failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc::{self, Sender};

    use super::*;

    #[derive(Default)]
    struct TransportLog {
        opens: Vec<(String, String)>,
        closes: Vec<String>,
        senders: Vec<Sender<TelemetryFrame>>,
    }

    #[derive(Clone, Default)]
    struct ScriptedTransport {
        log: Rc<RefCell<TransportLog>>,
        fail_opens: Rc<RefCell<bool>>,
    }

    impl TelemetryTransport for ScriptedTransport {
        fn open_stream(
            &mut self,
            target: &str,
            client_id: &str,
        ) -> Result<Receiver<TelemetryFrame>, TelemetryError> {
            if *self.fail_opens.borrow() {
                return Err(TelemetryError::Open {
                    addr: target.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }

            let mut log = self.log.borrow_mut();
            log.opens.push((target.to_string(), client_id.to_string()));
            let (tx, rx) = mpsc::channel();
            log.senders.push(tx);
            Ok(rx)
        }

        fn close_subscription(&mut self, client_id: &str) -> Result<(), TelemetryError> {
            self.log.borrow_mut().closes.push(client_id.to_string());
            Ok(())
        }
    }

    fn frame(time_ms: f64) -> TelemetryFrame {
        TelemetryFrame {
            success: true,
            time_ms: Some(time_ms),
            signal_pct: Some(80.0),
            processing: false,
        }
    }

    fn active_manager(backoff: Duration) -> (TelemetryManager<ScriptedTransport>, ScriptedTransport)
    {
        let transport = ScriptedTransport::default();
        let mut manager =
            TelemetryManager::with_backoff(transport.clone(), "client-1".to_string(), backoff);
        manager.set_active(true);
        (manager, transport)
    }

    fn recording_callback() -> (FrameCallback, Rc<RefCell<Vec<TelemetryFrame>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (
            Box::new(move |frame: &TelemetryFrame| sink.borrow_mut().push(frame.clone())),
            seen,
        )
    }

    #[test]
    fn monitor_while_inactive_is_a_noop() {
        let transport = ScriptedTransport::default();
        let mut manager =
            TelemetryManager::new(transport.clone(), "client-1".to_string());
        let (callback, seen) = recording_callback();

        manager.monitor("10.0.0.5", callback);
        manager.tick(Instant::now());

        assert!(transport.log.borrow().opens.is_empty());
        assert!(seen.borrow().is_empty());
        assert!(manager.active_target().is_none());
    }

    #[test]
    fn switching_targets_keeps_a_single_subscription() {
        let (mut manager, transport) = active_manager(RETRY_BACKOFF);
        let (cb1, _) = recording_callback();
        let (cb2, _) = recording_callback();

        manager.monitor("10.0.0.1", cb1);
        manager.monitor("10.0.0.2", cb2);

        let log = transport.log.borrow();
        assert_eq!(
            log.opens,
            [
                ("10.0.0.1".to_string(), "client-1".to_string()),
                ("10.0.0.2".to_string(), "client-1".to_string()),
            ]
        );
        // Exactly one stop signal, for the superseded first subscription.
        assert_eq!(log.closes, ["client-1"]);
        drop(log);
        assert_eq!(manager.active_target(), Some("10.0.0.2"));
    }

    #[test]
    fn frames_reach_the_registered_callback_in_order() {
        let (mut manager, transport) = active_manager(RETRY_BACKOFF);
        let (callback, seen) = recording_callback();
        manager.monitor("10.0.0.1", callback);

        let sender = transport.log.borrow().senders[0].clone();
        sender.send(frame(5.0)).unwrap();
        sender.send(frame(7.0)).unwrap();
        manager.tick(Instant::now());

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].time_ms, Some(5.0));
        assert_eq!(seen[1].time_ms, Some(7.0));
    }

    #[test]
    fn reselecting_same_target_reuses_stream_and_replays_cached_frame() {
        let (mut manager, transport) = active_manager(RETRY_BACKOFF);
        let (cb1, _) = recording_callback();
        manager.monitor("10.0.0.1", cb1);

        let sender = transport.log.borrow().senders[0].clone();
        sender.send(frame(9.0)).unwrap();
        manager.tick(Instant::now());

        let (cb2, seen2) = recording_callback();
        manager.monitor("10.0.0.1", cb2);

        // No new channel, no stop signal, and the cached frame arrived
        // synchronously on the fresh callback.
        let log = transport.log.borrow();
        assert_eq!(log.opens.len(), 1);
        assert!(log.closes.is_empty());
        assert_eq!(seen2.borrow().len(), 1);
        assert_eq!(seen2.borrow()[0].time_ms, Some(9.0));
    }

    #[test]
    fn transport_drop_resubscribes_after_backoff() {
        let (mut manager, transport) = active_manager(Duration::ZERO);
        let (callback, _) = recording_callback();
        manager.monitor("10.0.0.1", callback);

        transport.log.borrow_mut().senders.clear();
        let now = Instant::now();
        manager.tick(now);
        assert!(manager.is_reconnecting());

        manager.tick(now + Duration::from_millis(1));
        assert_eq!(transport.log.borrow().opens.len(), 2);
        assert_eq!(manager.active_target(), Some("10.0.0.1"));
    }

    #[test]
    fn open_failure_schedules_retry_instead_of_erroring() {
        let (mut manager, transport) = active_manager(Duration::ZERO);
        *transport.fail_opens.borrow_mut() = true;

        let (callback, _) = recording_callback();
        manager.monitor("10.0.0.1", callback);
        assert!(manager.is_reconnecting());

        *transport.fail_opens.borrow_mut() = false;
        manager.tick(Instant::now() + Duration::from_millis(1));
        assert_eq!(transport.log.borrow().opens.len(), 1);
    }

    #[test]
    fn reconnecting_without_callback_sends_stop_and_goes_idle() {
        let (mut manager, transport) = active_manager(Duration::ZERO);
        let (callback, _) = recording_callback();
        manager.monitor("10.0.0.1", callback);

        transport.log.borrow_mut().senders.clear();
        let now = Instant::now();
        manager.tick(now);
        assert!(manager.is_reconnecting());

        manager.stop_monitoring("10.0.0.1");
        assert!(manager.active_target().is_none());
        assert_eq!(transport.log.borrow().closes.len(), 1);
        assert!(!manager.tick(now + Duration::from_millis(1)));
    }

    #[test]
    fn stop_all_is_idempotent_with_exactly_one_stop_signal() {
        let (mut manager, transport) = active_manager(RETRY_BACKOFF);
        let (callback, _) = recording_callback();
        manager.monitor("10.0.0.1", callback);

        manager.stop_all();
        manager.stop_all();

        assert_eq!(transport.log.borrow().closes.len(), 1);
        assert!(manager.active_target().is_none());
    }

    #[test]
    fn hiding_the_view_tears_down_and_later_monitors_are_ignored() {
        let (mut manager, transport) = active_manager(RETRY_BACKOFF);
        let (callback, _) = recording_callback();
        manager.monitor("10.0.0.1", callback);

        manager.set_active(false);
        assert_eq!(transport.log.borrow().closes.len(), 1);

        let (stale, seen) = recording_callback();
        manager.monitor("10.0.0.1", stale);
        assert_eq!(transport.log.borrow().opens.len(), 1);
        assert!(seen.borrow().is_empty());
    }
}
