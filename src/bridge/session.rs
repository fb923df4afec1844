//! Speech session context.
//!
//! All per-activity speech state lives on one object handed to both the
//! dispatch-side entry points and the recognizer callbacks. Lock order is
//! session slot, then queue; the start monitor is never taken while the
//! session slot is held by a waiter.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::events::{EventQueue, SpeechEvent, SpeechState};
use super::monitor::BridgeMonitor;
use super::{AMPLITUDE_MIN_INTERVAL, SPEECH_QUEUE_CAPACITY};
use crate::error::BridgeError;
use crate::patcher::markers::{request_codes, Capability, RequestCodeRange};

struct SessionSlot {
    active: Option<u32>,
    next: u32,
    /// Request code of the start rendezvous, while the recognizer warms up
    pending_start: Option<i32>,
    last_amplitude: Option<Instant>,
}

pub struct SpeechContext {
    start: BridgeMonitor<()>,
    queue: EventQueue,
    slot: Mutex<SessionSlot>,
    amplitude_interval: Duration,
}

impl Default for SpeechContext {
    fn default() -> Self {
        let codes = request_codes(Capability::SpeechRecognition)
            .unwrap_or(RequestCodeRange { base: 41_200, span: 100 });
        SpeechContext::new(codes, SPEECH_QUEUE_CAPACITY, AMPLITUDE_MIN_INTERVAL)
    }
}

impl SpeechContext {
    pub fn new(codes: RequestCodeRange, capacity: usize, amplitude_interval: Duration) -> Self {
        SpeechContext {
            start: BridgeMonitor::new(codes),
            queue: EventQueue::new(capacity),
            slot: Mutex::new(SessionSlot {
                active: None,
                next: 0,
                pending_start: None,
                last_amplitude: None,
            }),
            amplitude_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new session: `(session id, start request code)`.
    ///
    /// Fails with `Busy` while another session is active. The queue and the
    /// amplitude limiter are reset.
    pub fn begin_session(&self) -> Result<(u32, i32), BridgeError> {
        let mut slot = self.lock();
        if slot.active.is_some() {
            return Err(BridgeError::Busy);
        }
        let code = self.start.begin()?;
        slot.next = slot.next.wrapping_add(1).max(1);
        let session = slot.next;
        slot.active = Some(session);
        slot.pending_start = Some(code);
        slot.last_amplitude = None;
        self.queue.clear();
        log::debug!("[Bridge] [SPEECH] session {} opened (request {})", session, code);
        Ok((session, code))
    }

    /// Blocking start: open a session, hand it to `trigger`, wait for ready.
    ///
    /// On any failure the session is closed again so the next start is not
    /// rejected as busy.
    pub fn start_blocking<F>(&self, timeout: Duration, trigger: F) -> Result<u32, BridgeError>
    where
        F: FnOnce(u32, i32),
    {
        let (session, code) = self.begin_session()?;
        trigger(session, code);
        match self.start.wait(code, timeout) {
            Ok(()) => {
                self.lock().pending_start = None;
                Ok(session)
            }
            Err(e) => {
                self.finish(session);
                Err(e)
            }
        }
    }

    /// Recognizer reported ready for the start request `code`
    pub fn ready(&self, code: i32) -> bool {
        self.start.complete(code, Ok(())).is_ok()
    }

    /// Recognizer failed before becoming ready
    pub fn fail_start(&self, code: i32, message: impl Into<String>) -> bool {
        self.start
            .complete(code, Err(BridgeError::Failed(message.into())))
            .is_ok()
    }

    /// Queue an event from the recognizer thread.
    ///
    /// Events for a session that is not active are dropped, as are amplitude
    /// samples arriving faster than the configured spacing. Returns whether
    /// the event was queued.
    pub fn emit(&self, event: SpeechEvent, now: Instant) -> bool {
        let mut slot = self.lock();
        if slot.active != Some(event.session()) {
            return false;
        }
        if event.is_amplitude() {
            if let Some(last) = slot.last_amplitude {
                if now.saturating_duration_since(last) < self.amplitude_interval {
                    return false;
                }
            }
            slot.last_amplitude = Some(now);
        }
        let ends = event.ends_session();
        self.queue.push(event);
        if ends {
            slot.active = None;
            slot.pending_start = None;
        }
        true
    }

    /// Ask the recognizer to stop listening; only the active session counts
    pub fn stop(&self, session: u32) -> bool {
        self.lock().active == Some(session)
    }

    /// Abort the active session, waking a pending start with `Cancelled`
    pub fn cancel(&self, session: u32) -> bool {
        let mut slot = self.lock();
        if slot.active != Some(session) {
            return false;
        }
        if let Some(code) = slot.pending_start.take() {
            let _ = self.start.complete(code, Err(BridgeError::Cancelled));
        }
        self.queue.push(SpeechEvent::State {
            session,
            state: SpeechState::Cancelled,
        });
        slot.active = None;
        true
    }

    /// Close `session` without emitting anything (recognizer released)
    pub fn finish(&self, session: u32) {
        let mut slot = self.lock();
        if slot.active == Some(session) {
            slot.active = None;
            slot.pending_start = None;
        }
    }

    pub fn drain(&self, max_events: usize) -> Vec<SpeechEvent> {
        self.queue.drain(max_events)
    }

    /// Drain and serialize to the JSON array string the entry point returns
    pub fn drain_json(&self, max_events: usize) -> String {
        serde_json::to_string(&self.drain(max_events)).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn active_session(&self) -> Option<u32> {
        self.lock().active
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{parse_drained, SPEECH_DRAIN_MAX};
    use std::sync::Arc;
    use std::thread;

    fn partial(session: u32, text: &str) -> SpeechEvent {
        SpeechEvent::Partial {
            session,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_second_session_is_busy() {
        let ctx = SpeechContext::default();
        let (session, _) = ctx.begin_session().unwrap();
        assert_eq!(ctx.begin_session(), Err(BridgeError::Busy));
        ctx.finish(session);
        assert!(ctx.begin_session().is_ok());
    }

    #[test]
    fn test_start_resolves_on_ready() {
        let ctx = Arc::new(SpeechContext::default());
        let recognizer = Arc::clone(&ctx);

        let session = ctx
            .start_blocking(Duration::from_secs(5), move |session, code| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    recognizer.emit(
                        SpeechEvent::State {
                            session,
                            state: SpeechState::Listening,
                        },
                        Instant::now(),
                    );
                    recognizer.ready(code);
                });
            })
            .unwrap();

        assert_eq!(ctx.active_session(), Some(session));
    }

    #[test]
    fn test_start_timeout_releases_session() {
        let ctx = SpeechContext::default();
        let result = ctx.start_blocking(Duration::from_millis(30), |_, _| {});
        assert_eq!(result, Err(BridgeError::Timeout(30)));
        assert_eq!(ctx.active_session(), None);
        assert!(ctx.begin_session().is_ok());
    }

    #[test]
    fn test_start_failure_propagates() {
        let ctx = SpeechContext::default();
        let result = ctx.start_blocking(Duration::from_secs(1), |_, code| {
            ctx.fail_start(code, "recognizer unavailable");
        });
        assert_eq!(
            result,
            Err(BridgeError::Failed("recognizer unavailable".to_string()))
        );
        assert_eq!(ctx.active_session(), None);
    }

    #[test]
    fn test_stop_and_cancel_only_match_active_session() {
        let ctx = SpeechContext::default();
        let (session, _) = ctx.begin_session().unwrap();

        assert!(!ctx.stop(session + 1));
        assert!(!ctx.cancel(session + 1));
        assert_eq!(ctx.active_session(), Some(session));

        assert!(ctx.stop(session));
        assert!(ctx.cancel(session));
        assert_eq!(ctx.active_session(), None);

        let drained = ctx.drain(0);
        assert_eq!(
            drained,
            vec![SpeechEvent::State {
                session,
                state: SpeechState::Cancelled
            }]
        );
    }

    #[test]
    fn test_events_for_stale_session_are_dropped() {
        let ctx = SpeechContext::default();
        let (first, _) = ctx.begin_session().unwrap();
        ctx.finish(first);
        let (second, _) = ctx.begin_session().unwrap();

        assert!(!ctx.emit(partial(first, "old"), Instant::now()));
        assert!(ctx.emit(partial(second, "new"), Instant::now()));
        assert_eq!(ctx.drain(0), vec![partial(second, "new")]);
    }

    #[test]
    fn test_amplitude_rate_limit() {
        let ctx = SpeechContext::default();
        let (session, _) = ctx.begin_session().unwrap();
        let t0 = Instant::now();

        let accepted = (0..10)
            .filter(|i| {
                ctx.emit(
                    SpeechEvent::Amplitude { session, rms: 1.0 },
                    t0 + Duration::from_millis(i * 30),
                )
            })
            .count();
        // 0, 120, 240 ms pass the 100 ms spacing
        assert_eq!(accepted, 3);

        // Non-amplitude events are never rate limited
        assert!(ctx.emit(partial(session, "a"), t0));
        assert!(ctx.emit(partial(session, "b"), t0));
    }

    #[test]
    fn test_unconsumed_stream_stays_bounded() {
        let ctx = SpeechContext::default();
        let (session, _) = ctx.begin_session().unwrap();
        let t0 = Instant::now();
        for i in 0..200u64 {
            ctx.emit(
                SpeechEvent::Amplitude {
                    session,
                    rms: i as f32,
                },
                t0 + AMPLITUDE_MIN_INTERVAL * (i as u32),
            );
            assert!(ctx.queued() <= SPEECH_QUEUE_CAPACITY);
        }
        assert_eq!(ctx.queued(), SPEECH_QUEUE_CAPACITY);
    }

    #[test]
    fn test_final_event_ends_session_and_drains_as_json() {
        let ctx = SpeechContext::default();
        let (session, _) = ctx.begin_session().unwrap();
        ctx.emit(partial(session, "hel"), Instant::now());
        ctx.emit(
            SpeechEvent::Final {
                session,
                text: "hello".to_string(),
            },
            Instant::now(),
        );
        assert_eq!(ctx.active_session(), None);

        let events = parse_drained(&ctx.drain_json(SPEECH_DRAIN_MAX)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(ctx.drain_json(5), "[]");
    }

    #[test]
    fn test_new_session_clears_queue() {
        let ctx = SpeechContext::default();
        let (first, _) = ctx.begin_session().unwrap();
        ctx.emit(partial(first, "left over"), Instant::now());
        ctx.finish(first);
        ctx.begin_session().unwrap();
        assert_eq!(ctx.queued(), 0);
    }
}
