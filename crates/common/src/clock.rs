//! Clock and timing utilities for generation jobs.
//!
//! A job is anchored to a monotonic instant recorded when it starts. This
//! module provides utilities for:
//! - Stamping job log lines with wall-clock time
//! - Measuring elapsed time
//! - Estimating the time remaining for a batch

use std::time::Instant;

use chrono::{DateTime, Local, Utc};

/// A job clock that measures elapsed time from a fixed epoch (the moment the
/// job started).
#[derive(Debug, Clone)]
pub struct JobClock {
    /// The instant the job started.
    epoch: Instant,
}

impl JobClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Seconds elapsed since the job started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Estimated seconds remaining after `done` of `total` units of work.
    pub fn eta_secs(&self, done: usize, total: usize) -> f64 {
        estimate_remaining(self.elapsed_secs(), done, total)
    }
}

/// Estimate remaining seconds from elapsed time and completed work.
pub fn estimate_remaining(elapsed_secs: f64, done: usize, total: usize) -> f64 {
    if done == 0 || total == 0 {
        return 0.0;
    }
    let fraction = (done as f64 / total as f64).clamp(0.0, 1.0);
    ((elapsed_secs / fraction) - elapsed_secs).max(0.0)
}

/// Local `HH:MM:SS` stamp used as the prefix of job log lines.
pub fn log_stamp(at: DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
