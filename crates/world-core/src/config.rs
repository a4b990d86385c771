//! Configuration for world runs.
//!
//! All simulation settings load from a TOML configuration file, with
//! per-run knobs (days, agent cap, tick sizing) supplied on the command
//! line as [`RunOptions`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use world_dialogue::GuardrailPolicy;
use world_events::{ActionKind, TickClock};

use crate::error::ConfigError;
use crate::report::ReportFormat;

/// Complete world configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Per-action selection weights
    pub action_weights: ActionWeights,
    /// Action selection settings
    pub selector: SelectorConfig,
    /// Dialogue backend settings
    pub dialogue: DialogueConfig,
    /// Turn guardrail settings
    pub guardrails: GuardrailConfig,
    /// Context card composition settings
    pub context: ContextConfig,
    /// Memory and relationship extraction settings
    pub memory: MemoryConfig,
    /// Travel minutes between named locations
    pub location_graph: HashMap<String, HashMap<String, u32>>,
    /// Abort the run on the first persistence failure instead of logging it
    pub strict_persistence: bool,
}

impl WorldConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Relative selection weights for each action kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionWeights {
    pub r#move: f32,
    pub solo_reflection: f32,
    pub duo_chat: f32,
    pub group_standup: f32,
    pub task_update: f32,
    pub idle: f32,
}

impl Default for ActionWeights {
    fn default() -> Self {
        Self {
            r#move: 0.15,
            solo_reflection: 0.20,
            duo_chat: 0.30,
            group_standup: 0.20,
            task_update: 0.15,
            idle: 0.05,
        }
    }
}

impl ActionWeights {
    /// Returns the weight table in stable action-name order.
    pub fn resolved(&self) -> Vec<(ActionKind, f32)> {
        ActionKind::all()
            .iter()
            .map(|kind| {
                let w = match kind {
                    ActionKind::Move => self.r#move,
                    ActionKind::SoloReflection => self.solo_reflection,
                    ActionKind::DuoChat => self.duo_chat,
                    ActionKind::GroupStandup => self.group_standup,
                    ActionKind::TaskUpdate => self.task_update,
                    ActionKind::Idle => self.idle,
                };
                (*kind, w.max(0.0))
            })
            .collect()
    }
}

/// Action selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Maximum non-idle actions an agent may take per day
    pub daily_action_cap: u32,
    /// Ticks an agent sits out of dialogue after finishing one
    pub dialogue_cooldown_ticks: u64,
    /// Longest travel an agent will consider when moving
    pub max_travel_minutes: u32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            daily_action_cap: 6,
            dialogue_cooldown_ticks: 2,
            max_travel_minutes: 30,
        }
    }
}

/// Dialogue backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Model name passed to the backend
    pub model: String,
    /// Turns per conversation before it closes
    pub max_turns: u32,
    /// Per-call timeout in seconds
    pub call_timeout_secs: u64,
    /// Base URL for the Ollama backend
    pub ollama_url: String,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            model: "tinyllama:1.1b".to_string(),
            max_turns: 4,
            call_timeout_secs: 30,
            ollama_url: world_dialogue::DEFAULT_OLLAMA_URL.to_string(),
        }
    }
}

/// Turn guardrail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Word cap for a single turn
    pub max_words: usize,
    /// Lowercase substrings that reject a turn
    pub banned_terms: Vec<String>,
    /// Generation attempts per turn before accepting with a flag
    pub max_attempts: u32,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_words: 25,
            banned_terms: vec![
                "instruction".to_string(),
                "narrator".to_string(),
                "please enter".to_string(),
                "respond as follows".to_string(),
                "as you requested".to_string(),
                "invoice".to_string(),
                "accountant".to_string(),
            ],
            max_attempts: 2,
        }
    }
}

impl GuardrailConfig {
    pub fn to_policy(&self) -> GuardrailPolicy {
        GuardrailPolicy {
            max_words: self.max_words,
            banned_terms: self.banned_terms.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

/// Context card composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Recent memories surfaced per card
    pub topk_recent: usize,
    /// Similarity hits surfaced per card when a retriever is wired in
    pub topk_memories: usize,
    /// Word budget for the assembled card
    pub word_cap: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            topk_recent: 3,
            topk_memories: 5,
            word_cap: 300,
        }
    }
}

/// Memory and relationship extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Strength added when a known relationship resurfaces
    pub relationship_step: f32,
    /// Strength assigned to a newly observed relationship
    pub new_relationship_strength: f32,
    /// Fact cap per processed turn
    pub max_facts_per_turn: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            relationship_step: 0.05,
            new_relationship_strength: 0.4,
            max_facts_per_turn: 6,
        }
    }
}

/// Per-run options, typically from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Simulated days to run
    pub days: u32,
    /// Agent count cap, applied in id order
    pub max_agents: usize,
    /// Minutes of simulated time per tick
    pub tick_minutes: u32,
    /// Hour the waking window opens
    pub start_hour: u8,
    /// Hour the waking window closes
    pub end_hour: u8,
    /// Write events, conversations and reports durably
    pub persist: bool,
    /// Select actions but skip all backend calls
    pub dry_run: bool,
    /// Concurrent dialogue call cap
    pub max_concurrent_chats: usize,
    /// Daily report output format
    pub report_format: ReportFormat,
    /// RNG seed for reproducible runs
    pub seed: u64,
    /// Directory for daily report files
    pub reports_dir: std::path::PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            days: 1,
            max_agents: 4,
            tick_minutes: 60,
            start_hour: 8,
            end_hour: 20,
            persist: true,
            dry_run: false,
            max_concurrent_chats: 1,
            report_format: ReportFormat::Markdown,
            seed: 42,
            reports_dir: std::path::PathBuf::from("reports"),
        }
    }
}

impl RunOptions {
    /// Checks that the options describe a runnable world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::InvalidDays);
        }
        if self.tick_minutes == 0 || self.tick_minutes > 720 {
            return Err(ConfigError::InvalidTickMinutes(self.tick_minutes));
        }
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(ConfigError::InvalidHours {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        let clock = self.clock();
        if clock.ticks_per_day() == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        Ok(())
    }

    /// Builds the tick clock these options describe.
    pub fn clock(&self) -> TickClock {
        TickClock::new(self.days, self.tick_minutes, self.start_hour, self.end_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_near_one() {
        let weights = ActionWeights::default();
        let total: f32 = weights.resolved().iter().map(|(_, w)| w).sum();
        assert!((total - 1.05).abs() < 1e-5);
    }

    #[test]
    fn test_resolved_weights_follow_name_order() {
        let resolved = ActionWeights::default().resolved();
        let kinds: Vec<_> = resolved.iter().map(|(k, _)| k.name()).collect();
        assert_eq!(
            kinds,
            vec![
                "duo_chat",
                "group_standup",
                "idle",
                "move",
                "solo_reflection",
                "task_update"
            ]
        );
    }

    #[test]
    fn test_negative_weight_clamps_to_zero() {
        let weights = ActionWeights {
            idle: -1.0,
            ..ActionWeights::default()
        };
        let resolved = weights.resolved();
        let idle = resolved
            .iter()
            .find(|(k, _)| *k == ActionKind::Idle)
            .map(|(_, w)| *w);
        assert_eq!(idle, Some(0.0));
    }

    #[test]
    fn test_parse_config_from_toml() {
        let toml = r#"
            [action_weights]
            duo_chat = 0.5
            idle = 0.0

            [selector]
            daily_action_cap = 3

            [guardrails]
            max_words = 12
            banned_terms = ["narrator"]
        "#;

        let config = WorldConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.action_weights.duo_chat, 0.5);
        assert_eq!(config.selector.daily_action_cap, 3);
        assert_eq!(config.guardrails.max_words, 12);
        assert_eq!(config.guardrails.banned_terms, vec!["narrator"]);
        // Defaults survive a partial file
        assert_eq!(config.dialogue.max_turns, 4);
        assert_eq!(config.memory.max_facts_per_turn, 6);
    }

    #[test]
    fn test_location_graph_parses() {
        let toml = r#"
            [location_graph.cafe]
            office = 15
            park = 10
        "#;

        let config = WorldConfig::from_toml_str(toml).unwrap();
        let cafe = config.location_graph.get("cafe").unwrap();
        assert_eq!(cafe.get("office"), Some(&15));
        assert_eq!(cafe.get("park"), Some(&10));
    }

    #[test]
    fn test_run_options_validate_rejects_bad_hours() {
        let options = RunOptions {
            start_hour: 20,
            end_hour: 8,
            ..RunOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidHours { start: 20, end: 8 })
        ));
    }

    #[test]
    fn test_run_options_validate_rejects_zero_days() {
        let options = RunOptions {
            days: 0,
            ..RunOptions::default()
        };
        assert!(matches!(options.validate(), Err(ConfigError::InvalidDays)));
    }

    #[test]
    fn test_run_options_validate_rejects_empty_window() {
        let options = RunOptions {
            start_hour: 8,
            end_hour: 9,
            tick_minutes: 90,
            ..RunOptions::default()
        };
        assert!(matches!(options.validate(), Err(ConfigError::EmptyWindow)));
    }

    #[test]
    fn test_default_options_validate() {
        let options = RunOptions::default();
        options.validate().unwrap();
        assert_eq!(options.clock().ticks_per_day(), 12);
    }

    #[test]
    fn test_guardrail_config_to_policy() {
        let config = GuardrailConfig::default();
        let policy = config.to_policy();
        assert_eq!(policy.max_words, 25);
        assert_eq!(policy.max_attempts, 2);
        assert!(policy.banned_terms.contains(&"narrator".to_string()));
    }
}
