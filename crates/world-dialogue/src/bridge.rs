//! Conversation Bridge
//!
//! Turns persona cards plus an interaction context into validated dialogue
//! turns. Each candidate turn is one governed external call followed by a
//! guardrail review; rejected candidates are regenerated with a redo prompt
//! until accepted or the retry budget is exhausted. A backend failure or
//! timeout fails only that turn; the outcome keeps whichever turns already
//! succeeded.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::governor::ChatGovernor;
use crate::guardrail::{GateDecision, GuardrailPolicy, TurnGate};
use crate::{ChatMessage, DialogueBackend, GenerationRequest};

/// Persona context for one dialogue participant.
#[derive(Debug, Clone)]
pub struct PersonaCard {
    pub agent_id: u64,
    pub name: String,
    /// Full system prompt: persona line plus any injected context card.
    pub system_prompt: String,
}

/// One dialogue-bearing interaction to run.
#[derive(Debug, Clone)]
pub struct DialogueSpec {
    /// Human-readable scenario line, e.g. "Coffee chat between Ada and Sam".
    pub scenario: String,
    /// Topic hint seeding the first turn.
    pub topic: String,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Turns requested; speakers rotate in participant order.
    pub max_turns: u32,
    pub participants: Vec<PersonaCard>,
}

/// An accepted turn, ready for persistence.
#[derive(Debug, Clone)]
pub struct TurnDraft {
    pub agent_id: u64,
    pub content: String,
    pub model: String,
    pub attempts: u32,
    pub exhausted: bool,
}

/// Result of running one dialogue.
#[derive(Debug, Clone, Default)]
pub struct DialogueOutcome {
    pub turns: Vec<TurnDraft>,
    /// Turns requested by the spec.
    pub requested: u32,
    /// Turn attempts abandoned due to backend errors or timeouts.
    pub failed_turns: u32,
    /// Guardrail attempts summed across all turns.
    pub total_attempts: u32,
    /// True when any turn was accepted via retry exhaustion.
    pub any_exhausted: bool,
}

impl DialogueOutcome {
    /// True when fewer turns succeeded than were requested.
    pub fn is_partial(&self) -> bool {
        (self.turns.len() as u32) < self.requested
    }
}

/// Runs dialogues against a backend under the governor's concurrency cap.
pub struct ConversationBridge {
    backend: Arc<dyn DialogueBackend>,
    governor: ChatGovernor,
    policy: GuardrailPolicy,
    call_timeout: Duration,
}

impl ConversationBridge {
    pub fn new(
        backend: Arc<dyn DialogueBackend>,
        governor: ChatGovernor,
        policy: GuardrailPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            governor,
            policy,
            call_timeout,
        }
    }

    pub fn policy(&self) -> &GuardrailPolicy {
        &self.policy
    }

    /// Runs one dialogue to completion and returns the accepted turns.
    pub async fn run_dialogue(&self, spec: &DialogueSpec) -> DialogueOutcome {
        let mut outcome = DialogueOutcome {
            requested: spec.max_turns,
            ..DialogueOutcome::default()
        };
        if spec.participants.is_empty() {
            return outcome;
        }

        // (participant index, content) per accepted turn so far.
        let mut history: Vec<(usize, String)> = Vec::new();

        for turn_idx in 0..spec.max_turns {
            let speaker_idx = (turn_idx as usize) % spec.participants.len();
            let mut messages = self.build_messages(spec, speaker_idx, &history);
            let mut gate = TurnGate::new(&self.policy);

            let accepted = loop {
                let request = GenerationRequest {
                    model: spec.model.clone(),
                    messages: messages.clone(),
                };
                let text = match self.call_backend(&request).await {
                    Ok(text) => text,
                    Err(reason) => {
                        warn!(
                            scenario = %spec.scenario,
                            turn = turn_idx,
                            %reason,
                            "turn attempt failed"
                        );
                        outcome.failed_turns += 1;
                        break None;
                    }
                };

                match gate.review(&text) {
                    GateDecision::Accepted { attempts } => {
                        break Some((text, attempts, false));
                    }
                    GateDecision::AcceptedExhausted { attempts } => {
                        debug!(
                            scenario = %spec.scenario,
                            turn = turn_idx,
                            attempts,
                            "guardrail budget exhausted, accepting as-is"
                        );
                        break Some((text, attempts, true));
                    }
                    GateDecision::Retry(violation) => {
                        debug!(
                            scenario = %spec.scenario,
                            turn = turn_idx,
                            %violation,
                            "guardrail retry"
                        );
                        messages.push(ChatMessage::user(format!(
                            "Redo that response in under {} words. \
                             Stay fully in character and avoid meta language.",
                            self.policy.max_words
                        )));
                        gate.regenerate();
                    }
                }
            };

            outcome.total_attempts += gate.attempts();
            if let Some((content, attempts, exhausted)) = accepted {
                let speaker = &spec.participants[speaker_idx];
                history.push((speaker_idx, content.clone()));
                outcome.any_exhausted |= exhausted;
                outcome.turns.push(TurnDraft {
                    agent_id: speaker.agent_id,
                    content,
                    model: spec.model.clone(),
                    attempts,
                    exhausted,
                });
            }
        }

        outcome
    }

    /// One governed, timed external call.
    async fn call_backend(&self, request: &GenerationRequest) -> Result<String, String> {
        let _permit = self
            .governor
            .admit()
            .await
            .map_err(|e| e.to_string())?;
        match tokio::time::timeout(self.call_timeout, self.backend.generate(request)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "call timed out after {} ms",
                self.call_timeout.as_millis()
            )),
        }
    }

    fn build_messages(
        &self,
        spec: &DialogueSpec,
        speaker_idx: usize,
        history: &[(usize, String)],
    ) -> Vec<ChatMessage> {
        let speaker = &spec.participants[speaker_idx];
        let mut messages = vec![ChatMessage::system(speaker.system_prompt.clone())];

        for (pidx, content) in history {
            if *pidx == speaker_idx {
                messages.push(ChatMessage::assistant(content.clone()));
            } else {
                let name = &spec.participants[*pidx].name;
                messages.push(ChatMessage::user(format!("{}: {}", name, content)));
            }
        }

        let payload = match history.last() {
            None => format!(
                "You are {}. Start a brief conversation about: {}",
                speaker.name, spec.topic
            ),
            Some((last_idx, _)) => format!(
                "You are {}. Respond to what {} just said.",
                speaker.name, spec.participants[*last_idx].name
            ),
        };
        messages.push(ChatMessage::user(payload));
        messages
    }
}
