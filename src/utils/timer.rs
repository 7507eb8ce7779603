//! Timer utilities
//!
//! Wall-clock measurement around a closure or a future. The duration is
//! taken once the operation has produced its output, so a `Result::Err`
//! is timed exactly like a success.

use std::future::Future;
use std::time::{Duration, Instant};

/// Simple timer for measuring elapsed time
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get elapsed time in milliseconds, two decimals
    pub fn elapsed_ms(&self) -> f64 {
        round_ms(self.elapsed())
    }

    /// Stop timer and return elapsed milliseconds
    pub fn stop(self) -> f64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("{}: {}ms", self.label, elapsed);
        elapsed
    }
}

/// Output of a timed operation
#[derive(Clone, Debug, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub duration_ms: f64,
}

/// Milliseconds rounded to two decimals
pub fn round_ms(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Time a synchronous operation
pub fn time_sync<T>(operation: impl FnOnce() -> T) -> Timed<T> {
    let start = Instant::now();
    let value = operation();
    Timed {
        value,
        duration_ms: round_ms(start.elapsed()),
    }
}

/// Time an asynchronous operation
pub async fn time_async<F: Future>(operation: F) -> Timed<F::Output> {
    let start = Instant::now();
    let value = operation.await;
    Timed {
        value,
        duration_ms: round_ms(start.elapsed()),
    }
}
