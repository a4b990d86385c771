//! Fact Extraction
//!
//! Heuristic pattern extraction of memories and relationship mentions
//! from accepted dialogue turns. Deliberately small: first-person
//! statements about preferences, recent events, jobs and family or
//! social ties.

use once_cell::sync::Lazy;
use regex::Regex;

use world_events::{AgentId, MemoryKind, TurnId};

use crate::config::MemoryConfig;
use crate::store::WorldStore;

const MAX_FRAGMENT_CHARS: usize = 240;

static PREFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bI (?:really )?(?:like|love|enjoy|adore)\s+(?P<object>[^.!?]+)")
        .unwrap()
});
static DISLIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bI (?:really )?(?:dislike|hate|can't stand)\s+(?P<object>[^.!?]+)")
        .unwrap()
});
static EVENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bI (?:just\s+)?(?:went to|visited|traveled to|attended)\s+(?P<object>[^.!?]+)")
        .unwrap()
});
static JOB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bI (?:work as|work at|am (?:an?|the))\s+(?P<object>[^.!?]+)").unwrap()
});
static RELATIONSHIP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bmy\s+(?P<relation>wife|husband|spouse|partner|son|daughter|mom|mother|dad|father|brother|sister|friend|coworker|boss|manager)(?:\s+named)?\s+(?P<name>[A-Z][a-zA-Z]+)?",
    )
    .unwrap()
});

/// Canonical relation type for a spoken keyword.
fn canonical_relation(keyword: &str) -> &'static str {
    match keyword.to_lowercase().as_str() {
        "wife" | "husband" | "spouse" => "spouse",
        "partner" => "partner",
        "son" | "daughter" => "child",
        "mom" | "mother" | "dad" | "father" => "parent",
        "brother" | "sister" => "sibling",
        "coworker" => "coworker",
        "boss" => "boss",
        "manager" => "manager",
        _ => "friend",
    }
}

/// A relationship mention riding on an extracted fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationHint {
    pub relation_type: String,
    pub target_name: Option<String>,
}

/// One fact pulled from a turn, before dedupe.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFact {
    pub kind: MemoryKind,
    pub text: String,
    pub confidence: f32,
    pub relation: Option<RelationHint>,
}

/// Turn-text fact extraction. Swappable so a model-backed extractor can
/// replace the pattern one later.
pub trait FactExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<CandidateFact>;
}

/// Regex-based extractor, capped at a handful of facts per turn.
pub struct PatternExtractor {
    max_facts: usize,
}

impl PatternExtractor {
    pub fn new(max_facts: usize) -> Self {
        Self {
            max_facts: max_facts.max(1),
        }
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl FactExtractor for PatternExtractor {
    fn extract(&self, text: &str) -> Vec<CandidateFact> {
        let mut results: Vec<CandidateFact> = Vec::new();

        let scans: [(&Regex, MemoryKind, f32, &str); 4] = [
            (&PREFERENCE, MemoryKind::Preference, 0.8, "Enjoys"),
            (&DISLIKE, MemoryKind::Preference, 0.75, "Dislikes"),
            (&EVENT, MemoryKind::Event, 0.7, "Recently"),
            (&JOB, MemoryKind::Fact, 0.65, "Role"),
        ];
        for (pattern, kind, confidence, prefix) in scans {
            for captures in pattern.captures_iter(text) {
                let object = captures
                    .name("object")
                    .map(|m| clean_fragment(m.as_str()))
                    .unwrap_or_default();
                if object.is_empty() {
                    continue;
                }
                let text = if prefix == "Role" {
                    format!("{}: {}", prefix, object)
                } else {
                    format!("{} {}", prefix, object)
                };
                results.push(CandidateFact {
                    kind,
                    text,
                    confidence,
                    relation: None,
                });
                if results.len() >= self.max_facts {
                    return results;
                }
            }
        }

        for captures in RELATIONSHIP.captures_iter(text) {
            let relation = match captures.name("relation") {
                Some(m) => canonical_relation(m.as_str()),
                None => continue,
            };
            let target_name = captures
                .name("name")
                .map(|m| clean_fragment(m.as_str()))
                .filter(|n| !n.is_empty());
            let text = match &target_name {
                Some(name) => format!("Mentions {}: {}", relation, name),
                None => format!("Talks about their {}", relation),
            };
            results.push(CandidateFact {
                kind: MemoryKind::Relationship,
                text,
                confidence: 0.7,
                relation: Some(RelationHint {
                    relation_type: relation.to_string(),
                    target_name,
                }),
            });
            if results.len() >= self.max_facts {
                break;
            }
        }

        results
    }
}

fn clean_fragment(value: &str) -> String {
    let trimmed = value
        .trim()
        .trim_matches(|c: char| ",.;:!?".contains(c))
        .trim();
    trimmed.chars().take(MAX_FRAGMENT_CHARS).collect()
}

/// Outcome counters from processing one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub facts: usize,
    pub upserts: usize,
    pub relationships: usize,
}

/// Feeds extracted facts into the store as memories and relationship
/// strength updates.
pub struct MemoryPipeline {
    extractor: Box<dyn FactExtractor>,
    relationship_step: f32,
    new_relationship_strength: f32,
}

impl MemoryPipeline {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            extractor: Box::new(PatternExtractor::new(config.max_facts_per_turn)),
            relationship_step: config.relationship_step,
            new_relationship_strength: config.new_relationship_strength,
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn FactExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Extracts facts from one accepted turn and applies them for the
    /// speaking agent. Relationship mentions only count when the named
    /// target resolves to a known agent.
    pub fn process_turn(
        &self,
        store: &mut WorldStore,
        agent_id: AgentId,
        turn_id: Option<TurnId>,
        content: &str,
        tick: u64,
    ) -> ExtractionStats {
        let facts = self.extractor.extract(content);
        let mut stats = ExtractionStats {
            facts: facts.len(),
            ..ExtractionStats::default()
        };
        for fact in facts {
            let before = store.memories.len();
            store.upsert_memory(agent_id, fact.kind, &fact.text, fact.confidence, turn_id, tick);
            if store.memories.len() > before {
                stats.upserts += 1;
            }
            if let Some(hint) = &fact.relation {
                let target = hint
                    .target_name
                    .as_deref()
                    .and_then(|name| store.agent_by_spoken_name(name))
                    .map(|a| a.id);
                if let Some(target_id) = target {
                    store.bump_relationship(
                        agent_id,
                        target_id,
                        &hint.relation_type,
                        self.new_relationship_strength,
                        self.relationship_step,
                        tick,
                    );
                    stats.relationships += 1;
                }
            }
        }
        stats
    }
}
