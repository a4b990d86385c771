//! Guardrail State Machine
//!
//! Validates generated dialogue turns against a word cap and a banned-term
//! list. Each candidate turn walks an explicit state machine:
//!
//! ```text
//! Generated -> Validating -> Accepted
//!                         -> Rejected -> Generated   (until max_attempts)
//! ```
//!
//! Once `max_attempts` consecutive rejections are reached, the last output is
//! accepted as-is and flagged exhausted. Exhaustion is a terminal outcome,
//! not an error.

use std::fmt;

/// Guardrail configuration for one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardrailPolicy {
    /// Maximum words per turn.
    pub max_words: usize,
    /// Lowercased substrings that must not appear.
    pub banned_terms: Vec<String>,
    /// Generation attempts allowed per turn before exhaustion.
    pub max_attempts: u32,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            max_words: 25,
            banned_terms: Vec::new(),
            max_attempts: 2,
        }
    }
}

impl GuardrailPolicy {
    /// Checks a candidate turn, returning the first violation found.
    pub fn violation(&self, text: &str) -> Option<Violation> {
        let stripped = text.trim();
        if stripped.is_empty() {
            return Some(Violation::Empty);
        }
        let words = stripped.split_whitespace().count();
        if self.max_words > 0 && words > self.max_words {
            return Some(Violation::TooLong {
                words,
                max: self.max_words,
            });
        }
        let lowered = stripped.to_lowercase();
        for term in &self.banned_terms {
            if lowered.contains(term.to_lowercase().as_str()) {
                return Some(Violation::BannedTerm(term.clone()));
            }
        }
        None
    }
}

/// Why a candidate turn was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Empty,
    TooLong { words: usize, max: usize },
    BannedTerm(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Empty => write!(f, "empty response"),
            Violation::TooLong { words, max } => {
                write!(f, "too long ({} words > {})", words, max)
            }
            Violation::BannedTerm(term) => write!(f, "contains forbidden term '{}'", term),
        }
    }
}

/// State of the per-turn guardrail machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for a candidate from the backend.
    Generated,
    /// A candidate is under validation.
    Validating,
    /// A candidate passed (or exhausted the retry budget).
    Accepted,
    /// The last candidate was rejected; regeneration required.
    Rejected,
}

/// Decision produced by one review pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Candidate is clean.
    Accepted { attempts: u32 },
    /// Candidate violated the policy; caller should regenerate.
    Retry(Violation),
    /// Retry budget spent; the candidate is accepted with the exhausted flag.
    AcceptedExhausted { attempts: u32 },
}

/// Tracks attempts and state for a single turn.
#[derive(Debug)]
pub struct TurnGate<'a> {
    policy: &'a GuardrailPolicy,
    attempts: u32,
    state: TurnState,
}

impl<'a> TurnGate<'a> {
    pub fn new(policy: &'a GuardrailPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            state: TurnState::Generated,
        }
    }

    /// Attempts consumed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current machine state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Reviews one generated candidate and advances the machine.
    pub fn review(&mut self, text: &str) -> GateDecision {
        self.attempts += 1;
        self.state = TurnState::Validating;

        match self.policy.violation(text) {
            None => {
                self.state = TurnState::Accepted;
                GateDecision::Accepted {
                    attempts: self.attempts,
                }
            }
            Some(_) if self.attempts >= self.policy.max_attempts => {
                self.state = TurnState::Accepted;
                GateDecision::AcceptedExhausted {
                    attempts: self.attempts,
                }
            }
            Some(violation) => {
                self.state = TurnState::Rejected;
                GateDecision::Retry(violation)
            }
        }
    }

    /// Marks that a fresh candidate has been requested after a rejection.
    pub fn regenerate(&mut self) {
        self.state = TurnState::Generated;
    }
}
