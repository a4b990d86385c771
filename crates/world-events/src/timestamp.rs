//! Simulation Time
//!
//! Handles discrete-tick simulation time with day labels and simulated
//! wall-clock hours.
//!
//! # Example
//!
//! ```
//! use world_events::{TickClock, TickStamp};
//!
//! let clock = TickClock::new(2, 60, 8, 20);
//! assert_eq!(clock.ticks_per_day(), 12);
//! assert_eq!(clock.total_ticks(), 24);
//!
//! let first = clock.stamp(0);
//! assert_eq!(first.day, 1);
//! assert_eq!(first.hour, 8);
//! assert_eq!(first.day_label(), "day_1");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in simulation time.
///
/// Contains a monotonic tick counter plus the derived day and simulated
/// wall-clock position within the active hour window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickStamp {
    /// Monotonically increasing absolute tick index (0-based across days).
    pub tick: u64,
    /// 1-based day index.
    pub day: u32,
    /// Tick index within the day (0-based).
    pub tick_of_day: u32,
    /// Simulated hour of day (0-23).
    pub hour: u8,
    /// Simulated minute of hour (0-59).
    pub minute: u8,
}

impl TickStamp {
    /// Human-readable day label, e.g. `day_3`.
    pub fn day_label(&self) -> String {
        format!("day_{}", self.day)
    }
}

impl fmt::Display for TickStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day_{} {:02}:{:02}", self.day, self.hour, self.minute)
    }
}

/// Deterministic tick sequence generator for a run.
///
/// Given a day count, tick length in minutes, and an active hour window
/// `[start_hour, end_hour)`, produces the finite, strictly increasing tick
/// sequence `days * ticks_per_day` long. Parameter validation happens at the
/// configuration layer; the clock assumes sane inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    days: u32,
    tick_minutes: u32,
    start_hour: u8,
    end_hour: u8,
}

impl TickClock {
    /// Creates a clock for the given window.
    pub fn new(days: u32, tick_minutes: u32, start_hour: u8, end_hour: u8) -> Self {
        Self {
            days,
            tick_minutes,
            start_hour,
            end_hour,
        }
    }

    /// Number of ticks in one simulated day.
    pub fn ticks_per_day(&self) -> u32 {
        (self.end_hour as u32 - self.start_hour as u32) * 60 / self.tick_minutes
    }

    /// Total ticks across all days.
    pub fn total_ticks(&self) -> u64 {
        self.days as u64 * self.ticks_per_day() as u64
    }

    /// Tick length in minutes.
    pub fn tick_minutes(&self) -> u32 {
        self.tick_minutes
    }

    /// Number of simulated days.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Computes the stamp for an absolute tick index.
    pub fn stamp(&self, tick: u64) -> TickStamp {
        let per_day = self.ticks_per_day() as u64;
        let day = (tick / per_day) as u32 + 1;
        let tick_of_day = (tick % per_day) as u32;
        let offset_minutes = tick_of_day * self.tick_minutes;
        TickStamp {
            tick,
            day,
            tick_of_day,
            hour: self.start_hour + (offset_minutes / 60) as u8,
            minute: (offset_minutes % 60) as u8,
        }
    }

    /// Iterates over every stamp of the run in order.
    pub fn iter(&self) -> impl Iterator<Item = TickStamp> + '_ {
        (0..self.total_ticks()).map(move |t| self.stamp(t))
    }
}
