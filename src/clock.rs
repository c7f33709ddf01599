//! Millisecond timestamp source for the sampler.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::capabilities::Capabilities;

/// Where a [`Clock`] reads time from, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// `Instant`: monotonic, sub-microsecond resolution.
    Monotonic,
    /// `SystemTime`: wall clock, may jump; last resort.
    WallClock,
}

impl ClockSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockSource::Monotonic => "monotonic",
            ClockSource::WallClock => "wall-clock",
        }
    }
}

/// A timestamp source fixed at construction.
///
/// `now()` returns milliseconds since the clock was created. The source never
/// changes for the lifetime of the value, so every sample in one sampler run
/// comes from the same counter.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    source: ClockSource,
    origin: Instant,
    wall_origin_ms: f64,
}

impl Clock {
    pub fn from_capabilities(caps: &Capabilities) -> Self {
        let source = if caps.has_high_res_clock {
            ClockSource::Monotonic
        } else {
            ClockSource::WallClock
        };
        Self::with_source(source)
    }

    pub fn with_source(source: ClockSource) -> Self {
        Self {
            source,
            origin: Instant::now(),
            wall_origin_ms: wall_ms(),
        }
    }

    pub fn source(&self) -> ClockSource {
        self.source
    }

    pub fn now(&self) -> f64 {
        match self.source {
            ClockSource::Monotonic => self.origin.elapsed().as_secs_f64() * 1000.0,
            // Clamp so a backwards wall-clock step cannot yield negative time.
            ClockSource::WallClock => (wall_ms() - self.wall_origin_ms).max(0.0),
        }
    }
}

fn wall_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
        * 1000.0
}
