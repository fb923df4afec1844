//! One bridge monitor: a mutex-guarded state machine plus a condition variable.
//!
//! `Idle -> Waiting -> Done -> Idle`. The blocking side owns `Idle -> Waiting`
//! and `Done -> Idle` (or `Waiting -> Idle` on timeout); the callback side
//! owns `Waiting -> Done`, and only for the request code it was issued for.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::BridgeError;
use crate::patcher::markers::RequestCodeRange;

/// Explicit bridge state; the outcome lives inside `Done`.
#[derive(Debug)]
pub enum BridgeState<T> {
    Idle,
    Waiting {
        request_code: i32,
    },
    Done {
        request_code: i32,
        outcome: Result<T, BridgeError>,
    },
}

impl<T> BridgeState<T> {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeState::Idle => "idle",
            BridgeState::Waiting { .. } => "waiting",
            BridgeState::Done { .. } => "done",
        }
    }
}

struct Slot<T> {
    state: BridgeState<T>,
    /// Monotonic invocation counter feeding the request code
    sequence: u32,
}

/// Rendezvous between one blocking caller and one asynchronous callback.
pub struct BridgeMonitor<T> {
    codes: RequestCodeRange,
    slot: Mutex<Slot<T>>,
    signal: Condvar,
}

impl<T> BridgeMonitor<T> {
    pub fn new(codes: RequestCodeRange) -> Self {
        BridgeMonitor {
            codes,
            slot: Mutex::new(Slot {
                state: BridgeState::Idle,
                sequence: 0,
            }),
            signal: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the next request code and move to `Waiting`
    pub fn begin(&self) -> Result<i32, BridgeError> {
        let mut slot = self.lock();
        if let BridgeState::Waiting { .. } = slot.state {
            return Err(BridgeError::Busy);
        }
        let request_code = self.codes.code_for(slot.sequence);
        slot.sequence = slot.sequence.wrapping_add(1);
        slot.state = BridgeState::Waiting { request_code };
        Ok(request_code)
    }

    /// Record the outcome for `request_code` and wake all waiters.
    ///
    /// Codes outside this bridge's range, or for a request that is no longer
    /// pending, are rejected without touching state.
    pub fn complete(&self, request_code: i32, outcome: Result<T, BridgeError>) -> Result<(), BridgeError> {
        let mut slot = self.lock();
        match slot.state {
            BridgeState::Waiting { request_code: pending } if pending == request_code => {
                slot.state = BridgeState::Done {
                    request_code,
                    outcome,
                };
                self.signal.notify_all();
                Ok(())
            }
            _ => Err(BridgeError::StaleRequest(request_code)),
        }
    }

    /// Block until the request completes or `timeout` elapses.
    ///
    /// Spurious wakeups are absorbed by re-checking state; the deadline is
    /// fixed at entry so repeated wakeups never extend it.
    pub fn wait(&self, request_code: i32, timeout: Duration) -> Result<T, BridgeError> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();
        loop {
            let (done, pending) = match &slot.state {
                BridgeState::Done { request_code: c, .. } => (*c == request_code, false),
                BridgeState::Waiting { request_code: c } => (false, *c == request_code),
                BridgeState::Idle => (false, false),
            };

            if done {
                let state = std::mem::replace(&mut slot.state, BridgeState::Idle);
                return match state {
                    BridgeState::Done { outcome, .. } => outcome,
                    _ => Err(BridgeError::StaleRequest(request_code)),
                };
            }
            if !pending {
                return Err(BridgeError::StaleRequest(request_code));
            }

            let now = Instant::now();
            if now >= deadline {
                slot.state = BridgeState::Idle;
                return Err(BridgeError::Timeout(timeout.as_millis() as u64));
            }
            let (guard, _) = self
                .signal
                .wait_timeout(slot, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            slot = guard;
        }
    }

    /// Blocking entry point: begin, hand the code to `trigger`, wait.
    pub fn request<F>(&self, timeout: Duration, trigger: F) -> Result<T, BridgeError>
    where
        F: FnOnce(i32),
    {
        let code = self.begin()?;
        trigger(code);
        self.wait(code, timeout)
    }

    /// Give up on a pending request without an outcome
    pub fn abandon(&self, request_code: i32) -> bool {
        let mut slot = self.lock();
        match slot.state {
            BridgeState::Waiting { request_code: pending } if pending == request_code => {
                slot.state = BridgeState::Idle;
                self.signal.notify_all();
                true
            }
            _ => false,
        }
    }

    pub fn owns(&self, request_code: i32) -> bool {
        self.codes.contains(request_code)
    }

    pub fn state_name(&self) -> &'static str {
        self.lock().state.name()
    }
}
