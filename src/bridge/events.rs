//! Speech event wire format and the bounded drop-oldest queue.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::SPEECH_DRAIN_MAX;

/// Recognizer lifecycle states reported through `state` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechState {
    Listening,
    Speaking,
    Processing,
    Cancelled,
}

/// One recognizer event, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpeechEvent {
    State { session: u32, state: SpeechState },
    Amplitude { session: u32, rms: f32 },
    Partial { session: u32, text: String },
    Final { session: u32, text: String },
    Error { session: u32, code: i32, message: String },
}

impl SpeechEvent {
    pub fn session(&self) -> u32 {
        match self {
            SpeechEvent::State { session, .. }
            | SpeechEvent::Amplitude { session, .. }
            | SpeechEvent::Partial { session, .. }
            | SpeechEvent::Final { session, .. }
            | SpeechEvent::Error { session, .. } => *session,
        }
    }

    pub fn is_amplitude(&self) -> bool {
        matches!(self, SpeechEvent::Amplitude { .. })
    }

    /// Final transcript, error, or cancellation: the session is over
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            SpeechEvent::Final { .. }
                | SpeechEvent::Error { .. }
                | SpeechEvent::State {
                    state: SpeechState::Cancelled,
                    ..
                }
        )
    }
}

/// Decode the JSON array string returned by `drainSpeechEvents`
pub fn parse_drained(json: &str) -> Result<Vec<SpeechEvent>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

/// Bounded FIFO guarded by its own lock; evicts the oldest entry when full.
pub struct EventQueue {
    capacity: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    events: VecDeque<SpeechEvent>,
    evicted: u64,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        EventQueue {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                events: VecDeque::with_capacity(capacity),
                evicted: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push an event; returns true when an older one was evicted to make room
    pub fn push(&self, event: SpeechEvent) -> bool {
        let mut inner = self.lock();
        let mut evicted = false;
        while inner.events.len() >= self.capacity {
            inner.events.pop_front();
            inner.evicted += 1;
            evicted = true;
        }
        inner.events.push_back(event);
        evicted
    }

    /// Remove up to `max` events in FIFO order. `max == 0` means the hard cap.
    pub fn drain(&self, max: usize) -> Vec<SpeechEvent> {
        let limit = if max == 0 {
            SPEECH_DRAIN_MAX
        } else {
            max.min(SPEECH_DRAIN_MAX)
        };
        let mut inner = self.lock();
        let take = limit.min(inner.events.len());
        inner.events.drain(..take).collect()
    }

    pub fn clear(&self) {
        self.lock().events.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total evictions since creation
    pub fn evicted(&self) -> u64 {
        self.lock().evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::SPEECH_QUEUE_CAPACITY;

    fn amplitude(session: u32, rms: f32) -> SpeechEvent {
        SpeechEvent::Amplitude { session, rms }
    }

    #[test]
    fn test_wire_format() {
        let event = SpeechEvent::State {
            session: 3,
            state: SpeechState::Listening,
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"state","session":3,"state":"listening"}"#
        );

        let event = SpeechEvent::Error {
            session: 3,
            code: 7,
            message: "no match".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"error","session":3,"code":7,"message":"no match"}"#
        );
    }

    #[test]
    fn test_parse_drained_array() {
        let json = r#"[{"type":"partial","session":1,"text":"hel"},{"type":"final","session":1,"text":"hello"}]"#;
        let events = parse_drained(json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            SpeechEvent::Final {
                session: 1,
                text: "hello".to_string()
            }
        );
        assert!(events[1].ends_session());
        assert!(parse_drained("[]").unwrap().is_empty());
        assert!(parse_drained("").unwrap().is_empty());
    }

    #[test]
    fn test_queue_bound_with_200_amplitude_events() {
        let queue = EventQueue::new(SPEECH_QUEUE_CAPACITY);
        for i in 0..200 {
            queue.push(amplitude(1, i as f32));
            assert!(queue.len() <= SPEECH_QUEUE_CAPACITY);
        }
        assert_eq!(queue.len(), SPEECH_QUEUE_CAPACITY);
        assert_eq!(queue.evicted(), 200 - SPEECH_QUEUE_CAPACITY as u64);

        // Oldest evicted, newest preserved
        let first = queue.drain(1);
        assert_eq!(first, vec![amplitude(1, (200 - SPEECH_QUEUE_CAPACITY) as f32)]);
        let mut last = None;
        while !queue.is_empty() {
            last = queue.drain(0).pop();
        }
        assert_eq!(last, Some(amplitude(1, 199.0)));
    }

    #[test]
    fn test_drain_is_capped_and_fifo() {
        let queue = EventQueue::new(SPEECH_QUEUE_CAPACITY);
        for i in 0..50 {
            queue.push(amplitude(1, i as f32));
        }
        let batch = queue.drain(1000);
        assert_eq!(batch.len(), SPEECH_DRAIN_MAX);
        assert_eq!(batch[0], amplitude(1, 0.0));
        assert_eq!(batch[SPEECH_DRAIN_MAX - 1], amplitude(1, (SPEECH_DRAIN_MAX - 1) as f32));
        assert_eq!(queue.len(), 50 - SPEECH_DRAIN_MAX);
    }

    #[test]
    fn test_drain_empty_queue() {
        let queue = EventQueue::new(4);
        assert!(queue.drain(10).is_empty());
    }
}
