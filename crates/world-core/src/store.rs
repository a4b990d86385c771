//! World Store
//!
//! In-memory collections backing a run plus append-only JSONL event
//! logging. Every row type lives in `world_events`; the store owns id
//! assignment, placement bookkeeping, memory dedupe and relationship
//! strength updates.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use world_events::{
    Activity, ActivityId, Agent, AgentId, AgentLocation, Conversation, ConversationId,
    DailyReport, Location, LocationId, Memory, MemoryId, MemoryKind, Relationship,
    ScheduleSlot, Turn, TurnId, TurnRole, WorldEvent,
};

use crate::error::PersistenceError;

const CONFIDENCE_FLOOR: f32 = 0.2;
const CONFIDENCE_CEIL: f32 = 0.95;
const RELATIONSHIP_CAP: f32 = 1.0;

/// Append-only JSONL sink for world events.
pub struct EventLog {
    writer: Option<BufWriter<File>>,
    event_count: u64,
}

impl EventLog {
    /// Creates a log writing to the given path, truncating any prior run.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            event_count: 0,
        })
    }

    /// Creates a log that discards events (for testing and dry runs).
    pub fn null() -> Self {
        Self {
            writer: None,
            event_count: 0,
        }
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Appends one event as a JSON line.
    pub fn log(&mut self, event: &WorldEvent) -> Result<(), PersistenceError> {
        self.event_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(event)?;
            writeln!(writer, "{}", json).map_err(PersistenceError::EventLog)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), PersistenceError> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(PersistenceError::EventLog)?;
        }
        Ok(())
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Some(ref mut writer) = self.writer {
            if let Err(e) = writer.flush() {
                eprintln!("Warning: failed to flush event log: {}", e);
            }
        }
    }
}

/// All mutable world state for one run.
pub struct WorldStore {
    pub agents: BTreeMap<AgentId, Agent>,
    pub locations: BTreeMap<LocationId, Location>,
    pub activities: BTreeMap<ActivityId, Activity>,
    pub schedule: Vec<ScheduleSlot>,
    pub placements: Vec<AgentLocation>,
    pub events: Vec<WorldEvent>,
    pub conversations: BTreeMap<ConversationId, Conversation>,
    pub turns: Vec<Turn>,
    pub memories: Vec<Memory>,
    pub relationships: Vec<Relationship>,
    pub reports: Vec<DailyReport>,
    log: EventLog,
    next_agent_id: AgentId,
    next_location_id: LocationId,
    next_activity_id: ActivityId,
    next_event_id: u64,
    next_conversation_id: ConversationId,
    next_turn_id: TurnId,
    next_memory_id: MemoryId,
}

impl WorldStore {
    pub fn new(log: EventLog) -> Self {
        Self {
            agents: BTreeMap::new(),
            locations: BTreeMap::new(),
            activities: BTreeMap::new(),
            schedule: Vec::new(),
            placements: Vec::new(),
            events: Vec::new(),
            conversations: BTreeMap::new(),
            turns: Vec::new(),
            memories: Vec::new(),
            relationships: Vec::new(),
            reports: Vec::new(),
            log,
            next_agent_id: 1,
            next_location_id: 1,
            next_activity_id: 1,
            next_event_id: 1,
            next_conversation_id: 1,
            next_turn_id: 1,
            next_memory_id: 1,
        }
    }

    // --- seeding -----------------------------------------------------------

    pub fn insert_agent(
        &mut self,
        name: &str,
        bio: &str,
        job: &str,
        interests: Vec<String>,
    ) -> AgentId {
        let id = self.next_agent_id;
        self.next_agent_id += 1;
        self.agents.insert(
            id,
            Agent {
                id,
                name: name.to_string(),
                bio: bio.to_string(),
                job: job.to_string(),
                interests,
                actions_today: 0,
            },
        );
        id
    }

    pub fn insert_location(
        &mut self,
        name: &str,
        kind: &str,
        capacity: u32,
        open_hours: Option<world_events::OpenHours>,
    ) -> LocationId {
        let id = self.next_location_id;
        self.next_location_id += 1;
        self.locations.insert(
            id,
            Location {
                id,
                name: name.to_string(),
                kind: kind.to_string(),
                capacity,
                open_hours,
            },
        );
        id
    }

    pub fn insert_activity(
        &mut self,
        name: &str,
        category: &str,
        default_duration_min: u32,
    ) -> ActivityId {
        let id = self.next_activity_id;
        self.next_activity_id += 1;
        self.activities.insert(
            id,
            Activity {
                id,
                name: name.to_string(),
                category: category.to_string(),
                default_duration_min,
            },
        );
        id
    }

    pub fn insert_schedule_slot(&mut self, slot: ScheduleSlot) {
        self.schedule.push(slot);
    }

    // --- lookups -----------------------------------------------------------

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn location_by_name(&self, name: &str) -> Option<&Location> {
        self.locations
            .values()
            .find(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn activity_by_name(&self, name: &str) -> Option<&Activity> {
        self.activities
            .values()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Matches a spoken name against known agents by first token,
    /// case-insensitive. "sam" matches the agent named "Sam Okafor".
    pub fn agent_by_spoken_name(&self, spoken: &str) -> Option<&Agent> {
        let spoken = spoken.trim();
        if spoken.is_empty() {
            return None;
        }
        self.agents.values().find(|a| {
            a.name
                .split_whitespace()
                .next()
                .map(|first| first.eq_ignore_ascii_case(spoken))
                .unwrap_or(false)
        })
    }

    /// Scheduled slot for an agent at an exact (day, tick_of_day), if any.
    pub fn scheduled_slot(&self, agent_id: AgentId, day: u32, tick_of_day: u32) -> Option<&ScheduleSlot> {
        self.schedule
            .iter()
            .find(|s| s.agent_id == agent_id && s.day == day && s.tick_of_day == tick_of_day)
    }

    // --- placement ---------------------------------------------------------

    /// The single open placement row for an agent, if any.
    pub fn open_location_row(&self, agent_id: AgentId) -> Option<&AgentLocation> {
        self.placements
            .iter()
            .find(|p| p.agent_id == agent_id && p.is_open())
    }

    /// Closes any open row at `tick` and opens a new one at the location.
    pub fn place_agent(&mut self, agent_id: AgentId, location_id: LocationId, tick: u64) {
        self.close_open_row(agent_id, tick);
        self.placements.push(AgentLocation {
            agent_id,
            location_id,
            since_tick: tick,
            until_tick: None,
        });
    }

    /// Closes the agent's open placement row, if present.
    pub fn close_open_row(&mut self, agent_id: AgentId, tick: u64) {
        if let Some(row) = self
            .placements
            .iter_mut()
            .find(|p| p.agent_id == agent_id && p.is_open())
        {
            row.until_tick = Some(tick);
        }
    }

    /// Count of agents currently at a location.
    pub fn occupancy(&self, location_id: LocationId) -> usize {
        self.placements
            .iter()
            .filter(|p| p.location_id == location_id && p.is_open())
            .count()
    }

    /// Ids of agents currently at a location, ascending.
    pub fn agents_at(&self, location_id: LocationId) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self
            .placements
            .iter()
            .filter(|p| p.location_id == location_id && p.is_open())
            .map(|p| p.agent_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    // --- events ------------------------------------------------------------

    /// Assigns an id, appends the event to the JSONL log and keeps it
    /// in memory for reporting.
    pub fn append_event(&mut self, mut event: WorldEvent) -> Result<u64, PersistenceError> {
        event.id = self.next_event_id;
        self.next_event_id += 1;
        self.log.log(&event)?;
        let id = event.id;
        self.events.push(event);
        Ok(id)
    }

    pub fn flush_events(&mut self) -> Result<(), PersistenceError> {
        self.log.flush()
    }

    // --- conversations -----------------------------------------------------

    pub fn create_conversation(
        &mut self,
        scenario: &str,
        initial_prompt: &str,
        participants: Vec<AgentId>,
        started_tick: u64,
    ) -> ConversationId {
        let id = self.next_conversation_id;
        self.next_conversation_id += 1;
        self.conversations.insert(
            id,
            Conversation {
                id,
                scenario: scenario.to_string(),
                initial_prompt: initial_prompt.to_string(),
                participants,
                started_tick,
            },
        );
        id
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_turn(
        &mut self,
        conversation_id: ConversationId,
        index: u32,
        agent_id: AgentId,
        model: &str,
        content: &str,
        attempts: u32,
        exhausted: bool,
    ) -> TurnId {
        let id = self.next_turn_id;
        self.next_turn_id += 1;
        self.turns.push(Turn {
            id,
            conversation_id,
            index,
            agent_id,
            role: TurnRole::Assistant,
            model: model.to_string(),
            content: content.to_string(),
            attempts,
            exhausted,
        });
        id
    }

    pub fn turns_for(&self, conversation_id: ConversationId) -> Vec<&Turn> {
        self.turns
            .iter()
            .filter(|t| t.conversation_id == conversation_id)
            .collect()
    }

    // --- memories ----------------------------------------------------------

    /// Dedupe fingerprint over `agent:kind:normalized-text`.
    pub fn memory_hash(agent_id: AgentId, kind: MemoryKind, text: &str) -> String {
        let normalized = text.trim().to_lowercase();
        let kind_name = serde_json::to_string(&kind)
            .map(|s| s.trim_matches('"').to_string())
            .unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}:{}", agent_id, kind_name, normalized));
        hex::encode(hasher.finalize())
    }

    /// Inserts a memory, or refreshes an existing one with the same
    /// fingerprint. Confidence is clamped to [0.2, 0.95] and never drops
    /// on an update.
    pub fn upsert_memory(
        &mut self,
        agent_id: AgentId,
        kind: MemoryKind,
        text: &str,
        confidence: f32,
        source_turn_id: Option<TurnId>,
        tick: u64,
    ) -> MemoryId {
        let hash = Self::memory_hash(agent_id, kind, text);
        self.upsert_memory_with_hash(agent_id, kind, text, confidence, source_turn_id, hash, tick)
    }

    /// Like [`upsert_memory`](Self::upsert_memory) but with a caller-chosen
    /// fingerprint. Reflections use a per-tick key so each one is a fresh
    /// row.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_memory_with_hash(
        &mut self,
        agent_id: AgentId,
        kind: MemoryKind,
        text: &str,
        confidence: f32,
        source_turn_id: Option<TurnId>,
        hash: String,
        tick: u64,
    ) -> MemoryId {
        let clamped = confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEIL);
        if let Some(existing) = self
            .memories
            .iter_mut()
            .find(|m| m.agent_id == agent_id && m.normalized_hash == hash)
        {
            existing.confidence = existing.confidence.max(clamped);
            existing.updated_tick = tick;
            return existing.id;
        }
        let id = self.next_memory_id;
        self.next_memory_id += 1;
        self.memories.push(Memory {
            id,
            agent_id,
            kind,
            text: text.trim().to_string(),
            confidence: clamped,
            source_turn_id,
            normalized_hash: hash,
            created_tick: tick,
            updated_tick: tick,
        });
        id
    }

    /// An agent's memories, most recently updated first.
    pub fn memories_for(&self, agent_id: AgentId) -> Vec<&Memory> {
        let mut out: Vec<&Memory> = self
            .memories
            .iter()
            .filter(|m| m.agent_id == agent_id)
            .collect();
        out.sort_by(|a, b| b.updated_tick.cmp(&a.updated_tick).then(b.id.cmp(&a.id)));
        out
    }

    // --- relationships -----------------------------------------------------

    /// Creates a relationship at `initial` strength or steps an existing
    /// one up, capped at 1.0.
    pub fn bump_relationship(
        &mut self,
        from: AgentId,
        to: AgentId,
        kind: &str,
        initial: f32,
        step: f32,
        tick: u64,
    ) {
        if from == to {
            return;
        }
        if let Some(existing) = self
            .relationships
            .iter_mut()
            .find(|r| r.from_agent_id == from && r.to_agent_id == to && r.kind == kind)
        {
            existing.strength = (existing.strength + step).min(RELATIONSHIP_CAP);
            existing.updated_tick = tick;
            return;
        }
        self.relationships.push(Relationship {
            from_agent_id: from,
            to_agent_id: to,
            kind: kind.to_string(),
            strength: initial.min(RELATIONSHIP_CAP),
            updated_tick: tick,
        });
    }

    /// Relationships out of an agent, strongest first.
    pub fn relationships_from(&self, agent_id: AgentId) -> Vec<&Relationship> {
        let mut out: Vec<&Relationship> = self
            .relationships
            .iter()
            .filter(|r| r.from_agent_id == agent_id)
            .collect();
        out.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.to_agent_id.cmp(&b.to_agent_id))
        });
        out
    }

    // --- reports and day boundaries ----------------------------------------

    /// Stores a daily report, replacing any prior row for the same day.
    pub fn record_report(&mut self, report: DailyReport) {
        if let Some(existing) = self
            .reports
            .iter_mut()
            .find(|r| r.day_label == report.day_label)
        {
            *existing = report;
            return;
        }
        self.reports.push(report);
    }

    pub fn reset_daily_counters(&mut self) {
        for agent in self.agents.values_mut() {
            agent.actions_today = 0;
        }
    }

    pub fn increment_actions(&mut self, agent_id: AgentId) {
        if let Some(agent) = self.agents.get_mut(&agent_id) {
            agent.actions_today += 1;
        }
    }
}
