use std::time::Instant;

/// Timeout value which disables all time checks.
pub const NO_TIMEOUT: f64 = f64::INFINITY;

/// Monotonic clock with a deadline measured in seconds from the start.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
    deadline: f64,
}

impl Clock {
    pub fn new(timeout: f64) -> Self {
        Self::with_deadline(Instant::now(), timeout)
    }

    pub fn with_deadline(start: Instant, deadline: f64) -> Self {
        Self { start, deadline }
    }

    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn remaining_time(&self) -> f64 {
        if self.deadline.is_infinite() {
            return NO_TIMEOUT;
        }
        (self.deadline - self.elapsed()).max(0.)
    }

    pub fn timed_out(&self) -> bool {
        self.deadline.is_finite() && self.elapsed() >= self.deadline
    }

    /// Time limit for the next solver call.
    pub fn solver_timeout(&self) -> Option<f64> {
        if self.deadline.is_infinite() {
            None
        } else {
            Some(self.remaining_time())
        }
    }
}
