//! Context Cards
//!
//! Compact persona summaries injected as system prompts for dialogue.
//! A card stitches together the agent's bio, its strongest relationships
//! and a handful of memories, then clips to a word budget.

use world_events::{Agent, AgentId, Memory};

use crate::config::ContextConfig;
use crate::store::WorldStore;

/// Optional semantic retriever over an agent's memories. The default
/// composer runs without one and falls back to recency alone.
pub trait SimilaritySource: Send + Sync {
    /// Memory ids most relevant to the topic, best first.
    fn similar(&self, agent_id: AgentId, topic: &str, limit: usize) -> Vec<u64>;
}

/// Builds context cards from the store.
pub struct ContextComposer {
    topk_recent: usize,
    topk_memories: usize,
    word_cap: usize,
    similarity: Option<Box<dyn SimilaritySource>>,
}

impl ContextComposer {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            topk_recent: config.topk_recent,
            topk_memories: config.topk_memories,
            word_cap: config.word_cap,
            similarity: None,
        }
    }

    pub fn with_similarity(mut self, source: Box<dyn SimilaritySource>) -> Self {
        self.similarity = Some(source);
        self
    }

    /// Assembles the card for one agent and topic.
    pub fn compose(&self, store: &WorldStore, agent: &Agent, topic: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push(format!("Context card for {}", agent.name));
        lines.push(persona_line(agent));

        let relationships = store.relationships_from(agent.id);
        if !relationships.is_empty() {
            lines.push("Relationships:".to_string());
            for rel in relationships.iter().take(2) {
                let name = store
                    .agent(rel.to_agent_id)
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| format!("agent {}", rel.to_agent_id));
                lines.push(format!("- {} with {} ({:.2})", rel.kind, name, rel.strength));
            }
        }

        let memories = self.pick_memories(store, agent.id, topic);
        if !memories.is_empty() {
            lines.push("Memories:".to_string());
            for memory in &memories {
                lines.push(format!("- [{}] {}", kind_name(memory), memory.text));
            }
        }

        clip_words(&lines.join("\n"), self.word_cap)
    }

    /// Similarity hits first, then recents, deduped, bounded by the
    /// configured limits.
    fn pick_memories<'a>(
        &self,
        store: &'a WorldStore,
        agent_id: AgentId,
        topic: &str,
    ) -> Vec<&'a Memory> {
        let all = store.memories_for(agent_id);
        let mut picked: Vec<&Memory> = Vec::new();

        if let Some(source) = &self.similarity {
            for id in source.similar(agent_id, topic, self.topk_memories) {
                if let Some(memory) = all.iter().find(|m| m.id == id) {
                    if !picked.iter().any(|m| m.id == id) {
                        picked.push(memory);
                    }
                }
            }
        }

        for memory in all.iter().take(self.topk_recent) {
            if !picked.iter().any(|m| m.id == memory.id) {
                picked.push(memory);
            }
        }

        // topk_memories is the overall card budget, even when topk_recent
        // is configured larger.
        picked.truncate(self.topk_memories);
        picked
    }
}

fn persona_line(agent: &Agent) -> String {
    let mut line = agent.bio.trim().to_string();
    if !agent.job.is_empty() {
        if !line.is_empty() {
            line.push_str(" | ");
        }
        line.push_str(&format!("Job: {}", agent.job));
    }
    if !agent.interests.is_empty() {
        let top: Vec<&str> = agent.interests.iter().take(2).map(String::as_str).collect();
        if !line.is_empty() {
            line.push_str(" | ");
        }
        line.push_str(&format!("Interests: {}", top.join(", ")));
    }
    line
}

fn kind_name(memory: &Memory) -> String {
    serde_json::to_string(&memory.kind)
        .map(|s| s.trim_matches('"').to_string())
        .unwrap_or_default()
}

/// Clips text to a word budget, dropping from the end and marking the
/// cut with an ellipsis.
fn clip_words(text: &str, cap: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= cap {
        return text.to_string();
    }
    let mut clipped = words[..cap].join(" ");
    clipped.push_str("...");
    clipped
}
