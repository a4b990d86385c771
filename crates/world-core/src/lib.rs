//! World simulation engine.
//!
//! Drives autonomous multi-agent daily life over timeboxed "day" runs:
//! a tick scheduler selects and dispatches per-agent actions (travel,
//! reflection, paired/group dialogue, task updates), routes dialogue-bearing
//! actions through the conversation bridge under a concurrency cap, and feeds
//! accepted turns into the fact/relationship extraction pipeline.

pub mod actions;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod extractor;
pub mod report;
pub mod scheduler;
pub mod selector;
pub mod setup;
pub mod store;

pub use config::{RunOptions, WorldConfig};
pub use error::{ConfigError, PersistenceError, WorldError};
pub use report::ReportFormat;
pub use scheduler::{RunSummary, WorldScheduler};
pub use setup::{default_location_graph, seed_demo_world};
pub use store::{EventLog, WorldStore};
