//! Error types for the simulation engine.

use thiserror::Error;

/// Errors raised while validating or loading run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Run length must be at least one day.
    #[error("days must be at least 1")]
    InvalidDays,
    /// Tick length must divide evenly into a waking day.
    #[error("tick_minutes must be between 1 and 720, got {0}")]
    InvalidTickMinutes(u32),
    /// Waking window must start before it ends.
    #[error("start_hour {start} must be earlier than end_hour {end}")]
    InvalidHours { start: u8, end: u8 },
    /// The waking window is too short to hold a single tick.
    #[error("waking window holds no ticks at the configured tick length")]
    EmptyWindow,
    /// IO error reading a config file.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing TOML config.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised by durable storage of events, conversations and reports.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Failure appending to the event log.
    #[error("event log write failed: {0}")]
    EventLog(#[source] std::io::Error),
    /// Failure serializing an event record.
    #[error("event encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    /// Failure writing a daily report file.
    #[error("report write failed: {0}")]
    Report(#[source] std::io::Error),
}

/// Top-level error for a simulation run.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
