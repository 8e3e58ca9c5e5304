//! Repeat suppression.
//!
//! A decoded payload is reportable when it differs from the last reported
//! payload, or when the same payload has been quiet for the cooldown
//! duration. The state lives for the whole process and is only touched from
//! the driving loop.

use std::time::{Duration, Instant};

/// Tracks the last reported payload and when it was reported.
///
/// Callers evaluate with [`should_emit`](Self::should_emit) and, when it
/// returns true, must [`record`](Self::record) before the next evaluation.
#[derive(Debug)]
pub struct RepeatSuppressor {
    cooldown: Duration,
    last_payload: Option<String>,
    last_emitted_at: Option<Instant>,
}

impl RepeatSuppressor {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_payload: None,
            last_emitted_at: None,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether this payload should be reported at `now`.
    ///
    /// A payload different from the last reported one always passes; the
    /// cooldown only gates repeats of the same payload.
    pub fn should_emit(&self, payload: &str, now: Instant) -> bool {
        match (&self.last_payload, self.last_emitted_at) {
            (Some(last), Some(at)) if last == payload => {
                now.saturating_duration_since(at) >= self.cooldown
            }
            _ => true,
        }
    }

    /// Record an emission. Must follow every positive `should_emit`.
    pub fn record(&mut self, payload: &str, now: Instant) {
        self.last_payload = Some(payload.to_string());
        // Instants from the single driving thread never go backwards, so
        // the recorded timestamp is monotonically non-decreasing.
        self.last_emitted_at = Some(now);
    }

    /// Remaining cooldown at `now`, clamped to zero. Zero means the last
    /// payload is emit-eligible again.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_emitted_at {
            Some(at) => self
                .cooldown
                .saturating_sub(now.saturating_duration_since(at)),
            None => Duration::ZERO,
        }
    }

    /// Whether the suppressor is in the cooling window for its last payload.
    pub fn is_cooling(&self, now: Instant) -> bool {
        self.last_payload.is_some() && self.remaining(now) > Duration::ZERO
    }

    pub fn last_payload(&self) -> Option<&str> {
        self.last_payload.as_deref()
    }
}
