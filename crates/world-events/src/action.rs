//! Action Catalog Types
//!
//! The closed set of action kinds an agent can take each tick, and the
//! outcome status recorded on world events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of action an agent can take in a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Move,
    SoloReflection,
    DuoChat,
    GroupStandup,
    TaskUpdate,
    Idle,
}

impl ActionKind {
    /// Stable lowercase name, used for weight-table lookup and tie-breaking.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Move => "move",
            ActionKind::SoloReflection => "solo_reflection",
            ActionKind::DuoChat => "duo_chat",
            ActionKind::GroupStandup => "group_standup",
            ActionKind::TaskUpdate => "task_update",
            ActionKind::Idle => "idle",
        }
    }

    /// True for actions that route through the conversation bridge.
    pub fn dialogue_bearing(&self) -> bool {
        matches!(self, ActionKind::DuoChat | ActionKind::GroupStandup)
    }

    /// All selectable variants, in stable name order.
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::DuoChat,
            ActionKind::GroupStandup,
            ActionKind::Idle,
            ActionKind::Move,
            ActionKind::SoloReflection,
            ActionKind::TaskUpdate,
        ]
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome status of an executed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Action ran to completion.
    Completed,
    /// Dialogue action produced fewer turns than requested.
    Partial,
    /// Action could not run at all.
    Failed,
    /// Preconditions failed at selection time; resolved to a no-op.
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_are_stable() {
        assert_eq!(ActionKind::Move.name(), "move");
        assert_eq!(ActionKind::GroupStandup.name(), "group_standup");
        assert_eq!(ActionKind::Idle.to_string(), "idle");
    }

    #[test]
    fn test_all_is_sorted_by_name() {
        let names: Vec<&str> = ActionKind::all().iter().map(|a| a.name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_dialogue_bearing() {
        assert!(ActionKind::DuoChat.dialogue_bearing());
        assert!(ActionKind::GroupStandup.dialogue_bearing());
        assert!(!ActionKind::Move.dialogue_bearing());
        assert!(!ActionKind::Idle.dialogue_bearing());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&ActionKind::SoloReflection).unwrap(),
            r#""solo_reflection""#
        );
        assert_eq!(
            serde_json::to_string(&EventStatus::Partial).unwrap(),
            r#""partial""#
        );
    }
}
