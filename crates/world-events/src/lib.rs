//! Shared record types and serialization for the world simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace.

pub mod action;
pub mod event;
pub mod record;
pub mod timestamp;

// Re-export timestamp types
pub use timestamp::{TickClock, TickStamp};

// Re-export action types
pub use action::{ActionKind, EventStatus};

// Re-export event types
pub use event::{EventMeta, WorldEvent};

// Re-export record types
pub use record::{
    ActivityId, Agent, AgentId, AgentLocation, Activity, Conversation, ConversationId,
    DailyReport, Location, LocationId, Memory, MemoryId, MemoryKind, OpenHours, Relationship,
    ScheduleSlot, Turn, TurnId, TurnRole,
};
