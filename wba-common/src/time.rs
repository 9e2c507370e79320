//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds elapsed since `start`, with sub-millisecond precision
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
