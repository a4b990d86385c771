//! World Event Types
//!
//! Append-only records of executed actions. A `WorldEvent` is never mutated
//! after it is written.

use serde::{Deserialize, Serialize};

use crate::action::{ActionKind, EventStatus};
use crate::record::{ActivityId, AgentId, ConversationId, LocationId};
use crate::timestamp::TickStamp;

/// Structured outcome metadata attached to a world event.
///
/// Only the fields relevant to the action kind are populated; the rest
/// are omitted from the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Conversation produced by a dialogue-bearing action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    /// Turns actually persisted for that conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turns_persisted: Option<u32>,
    /// Dialogue partner (duo chat).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<AgentId>,
    /// All participants (group standup).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub participants: Vec<AgentId>,
    /// Travel origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_location: Option<String>,
    /// Travel destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_location: Option<String>,
    /// Travel duration in ticks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_ticks: Option<u32>,
    /// Reflection prompt or task name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Total guardrail attempts across the conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardrail_attempts: Option<u32>,
    /// True when any turn was accepted only after retry exhaustion.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub guardrail_exhausted: bool,
    /// Why the action failed or was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Immutable record of one executed (or skipped) action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEvent {
    pub id: u64,
    pub agent_id: AgentId,
    pub stamp: TickStamp,
    pub action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<ActivityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    pub status: EventStatus,
    pub meta: EventMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::TickClock;

    fn sample_event() -> WorldEvent {
        WorldEvent {
            id: 1,
            agent_id: 42,
            stamp: TickClock::new(1, 60, 8, 20).stamp(2),
            action: ActionKind::DuoChat,
            activity_id: Some(3),
            location_id: Some(5),
            status: EventStatus::Completed,
            meta: EventMeta {
                conversation_id: Some(9),
                turns_persisted: Some(4),
                partner_id: Some(43),
                guardrail_attempts: Some(5),
                ..EventMeta::default()
            },
        }
    }

    #[test]
    fn test_event_roundtrip() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        let parsed: WorldEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, 1);
        assert_eq!(parsed.action, ActionKind::DuoChat);
        assert_eq!(parsed.meta.conversation_id, Some(9));
        assert_eq!(parsed.meta.partner_id, Some(43));
    }

    #[test]
    fn test_empty_meta_fields_are_omitted() {
        let mut event = sample_event();
        event.meta = EventMeta::default();
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("conversation_id"));
        assert!(!json.contains("participants"));
        assert!(!json.contains("guardrail_exhausted"));
    }

    #[test]
    fn test_exhausted_flag_serialized_when_set() {
        let mut event = sample_event();
        event.meta.guardrail_exhausted = true;
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""guardrail_exhausted":true"#));
    }
}
