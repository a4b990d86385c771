//! Durable Record Model
//!
//! Typed rows for every collection the simulation persists: agents,
//! locations, activities, placements, schedules, conversations, turns,
//! memories, relationships, and daily reports.

use serde::{Deserialize, Serialize};

pub type AgentId = u64;
pub type LocationId = u64;
pub type ActivityId = u64;
pub type ConversationId = u64;
pub type TurnId = u64;
pub type MemoryId = u64;

/// A simulated persona. Created once at seed time, lives for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub bio: String,
    pub job: String,
    /// Interest tags, strongest first.
    pub interests: Vec<String>,
    /// Actions taken today. Reset at day boundaries.
    #[serde(default)]
    pub actions_today: u32,
}

/// Open-hours window for a location, in whole hours `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenHours {
    pub start: u8,
    pub end: u8,
}

impl OpenHours {
    pub fn contains(&self, hour: u8) -> bool {
        self.start <= hour && hour < self.end
    }
}

/// A place agents can occupy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// home / cafe / office / gym / park
    pub kind: String,
    pub capacity: u32,
    /// Missing hours mean always open.
    #[serde(default)]
    pub open_hours: Option<OpenHours>,
}

/// Catalog entry referenced by executors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    /// work / social / wellness
    pub category: String,
    pub default_duration_min: u32,
}

/// Open interval placing an agent at a location.
///
/// Invariant: at most one row per agent has `until_tick == None` at any
/// instant. An agent mid-travel has no open row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLocation {
    pub agent_id: AgentId,
    pub location_id: LocationId,
    pub since_tick: u64,
    pub until_tick: Option<u64>,
}

impl AgentLocation {
    pub fn is_open(&self) -> bool {
        self.until_tick.is_none()
    }
}

/// Scripted activity for an agent at a specific day/tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub agent_id: AgentId,
    pub day: u32,
    pub tick_of_day: u32,
    pub action: crate::ActionKind,
    #[serde(default)]
    pub partner_id: Option<AgentId>,
}

/// A dialogue produced by a dialogue-bearing action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub scenario: String,
    pub initial_prompt: String,
    pub participants: Vec<AgentId>,
    pub started_tick: u64,
}

/// Role of a speaker within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Assistant,
    Moderator,
}

/// One ordered utterance within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub conversation_id: ConversationId,
    /// 0-based position within the conversation.
    pub index: u32,
    pub agent_id: AgentId,
    pub role: TurnRole,
    /// Originating model identifier.
    pub model: String,
    pub content: String,
    /// Generation attempts consumed by the guardrail gate.
    pub attempts: u32,
    /// True when the guardrail retry budget ran out and the last output was
    /// accepted as-is.
    pub exhausted: bool,
}

/// Kind of extracted fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Preference,
    Event,
    Fact,
    Relationship,
    Reflection,
}

/// Agent-scoped long-term fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub agent_id: AgentId,
    pub kind: MemoryKind,
    pub text: String,
    /// Clamped to [0.2, 0.95]; non-decreasing across upserts of the same
    /// (agent, dedupe hash).
    pub confidence: f32,
    pub source_turn_id: Option<TurnId>,
    /// Normalized-text fingerprint used for dedupe.
    pub normalized_hash: String,
    pub created_tick: u64,
    pub updated_tick: u64,
}

/// Directed pair-of-agents record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub from_agent_id: AgentId,
    pub to_agent_id: AgentId,
    /// spouse / friend / coworker / ...
    pub kind: String,
    /// In [0, 1]; only ever increases in v1.
    pub strength: f32,
    pub updated_tick: u64,
}

/// Per-day run summary row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub day_label: String,
    pub summary: String,
    pub metrics: serde_json::Value,
}
