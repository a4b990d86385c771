//! World Scheduler
//!
//! The tick loop. Each tick resolves travel arrivals, selects one action
//! per eligible agent in id order, executes synchronous actions
//! immediately and runs dialogue jobs through the conversation bridge,
//! joining every job before the tick ends. Day boundaries reset daily
//! counters and emit reports.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use world_dialogue::{ChatGovernor, ConversationBridge, DialogueBackend, DialogueOutcome};
use world_events::{AgentId, EventStatus, TickClock, TickStamp, WorldEvent};

use crate::actions::{
    duo_chat_job, execute_idle, execute_move, execute_solo_reflection, execute_task_update,
    group_standup_job, DialogueJob,
};
use crate::config::{RunOptions, WorldConfig};
use crate::context::ContextComposer;
use crate::environment::Environment;
use crate::error::WorldError;
use crate::extractor::MemoryPipeline;
use crate::report::DailyReporter;
use crate::selector::{ActionChoice, Selector};
use crate::store::WorldStore;

/// End-of-run counters.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub days: u32,
    pub ticks: u64,
    pub events: u64,
    pub conversations: u64,
    pub turns: u64,
}

/// Drives one full simulation run over a seeded store.
pub struct WorldScheduler {
    config: WorldConfig,
    options: RunOptions,
    clock: TickClock,
    store: WorldStore,
    env: Environment,
    selector: Selector,
    composer: ContextComposer,
    pipeline: MemoryPipeline,
    bridge: Option<Arc<ConversationBridge>>,
    rng: SmallRng,
    run_id: Uuid,
}

impl WorldScheduler {
    /// Validates the options and assembles the engine. The backend is
    /// optional; without one (or under `--dry-run`) dialogue actions are
    /// recorded as skipped.
    pub fn new(
        config: WorldConfig,
        options: RunOptions,
        store: WorldStore,
        backend: Option<Arc<dyn DialogueBackend>>,
    ) -> Result<Self, WorldError> {
        options.validate()?;
        let clock = options.clock();
        let env = Environment::new(config.location_graph.clone(), options.tick_minutes);
        let selector = Selector::new(&config.action_weights, &config.selector);
        let composer = ContextComposer::new(&config.context);
        let pipeline = MemoryPipeline::new(&config.memory);
        let bridge = backend.map(|backend| {
            Arc::new(ConversationBridge::new(
                backend,
                ChatGovernor::new(options.max_concurrent_chats),
                config.guardrails.to_policy(),
                Duration::from_secs(config.dialogue.call_timeout_secs),
            ))
        });
        let rng = SmallRng::seed_from_u64(options.seed);
        Ok(Self {
            config,
            options,
            clock,
            store,
            env,
            selector,
            composer,
            pipeline,
            bridge,
            rng,
            run_id: Uuid::new_v4(),
        })
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    /// Runs every tick of the configured window.
    pub async fn run(mut self) -> Result<(RunSummary, WorldStore), WorldError> {
        info!(
            run_id = %self.run_id,
            days = self.options.days,
            ticks_per_day = self.clock.ticks_per_day(),
            dry_run = self.options.dry_run,
            "starting world run"
        );

        let stamps: Vec<TickStamp> = self.clock.iter().collect();
        for stamp in stamps {
            self.run_tick(&stamp).await?;
            if stamp.tick_of_day + 1 == self.clock.ticks_per_day() {
                self.end_of_day(&stamp)?;
            }
        }

        self.store.flush_events()?;
        let summary = RunSummary {
            run_id: self.run_id,
            days: self.options.days,
            ticks: self.clock.total_ticks(),
            events: self.store.events.len() as u64,
            conversations: self.store.conversations.len() as u64,
            turns: self.store.turns.len() as u64,
        };
        info!(
            events = summary.events,
            conversations = summary.conversations,
            turns = summary.turns,
            "world run complete"
        );
        Ok((summary, self.store))
    }

    async fn run_tick(&mut self, stamp: &TickStamp) -> Result<(), WorldError> {
        let arrived = self.env.resolve_arrivals(&mut self.store, stamp.tick);
        if !arrived.is_empty() {
            debug!(tick = stamp.tick, arrivals = arrived.len(), "travel arrivals");
        }

        let agent_ids: Vec<AgentId> = self
            .store
            .agents
            .keys()
            .copied()
            .take(self.options.max_agents)
            .collect();

        let mut claimed: HashSet<AgentId> = HashSet::new();
        let mut jobs: Vec<DialogueJob> = Vec::new();

        for agent_id in agent_ids {
            if claimed.contains(&agent_id) || self.env.is_traveling(agent_id) {
                continue;
            }
            let choice =
                self.selector
                    .select(&mut self.rng, &self.store, &self.env, agent_id, stamp);
            debug!(tick = stamp.tick, agent = agent_id, action = choice.kind().name(), "selected");
            match choice {
                ActionChoice::Idle => {
                    let event = execute_idle(&self.store, agent_id, stamp);
                    self.persist_event(event)?;
                }
                ActionChoice::Move { destination } => {
                    let event =
                        execute_move(&mut self.store, &mut self.env, agent_id, destination, stamp);
                    self.persist_event(event)?;
                    self.store.increment_actions(agent_id);
                }
                ActionChoice::SoloReflection => {
                    let event =
                        execute_solo_reflection(&mut self.store, &mut self.rng, agent_id, stamp);
                    self.persist_event(event)?;
                    self.store.increment_actions(agent_id);
                }
                ActionChoice::TaskUpdate => {
                    let event =
                        execute_task_update(&self.store, &mut self.rng, agent_id, stamp);
                    self.persist_event(event)?;
                    self.store.increment_actions(agent_id);
                }
                ActionChoice::DuoChat { partner } => {
                    claimed.insert(agent_id);
                    claimed.insert(partner);
                    jobs.push(duo_chat_job(
                        &self.store,
                        &self.composer,
                        &self.config.dialogue,
                        agent_id,
                        partner,
                        stamp,
                    ));
                }
                ActionChoice::GroupStandup { participants } => {
                    claimed.extend(participants.iter().copied());
                    jobs.push(group_standup_job(
                        &self.store,
                        &self.composer,
                        &self.config.dialogue,
                        agent_id,
                        participants,
                        stamp,
                    ));
                }
            }
        }

        self.resolve_dialogues(jobs, stamp).await
    }

    /// Runs this tick's dialogue jobs to completion. All jobs are joined
    /// here; the next tick never overlaps an in-flight call.
    async fn resolve_dialogues(
        &mut self,
        jobs: Vec<DialogueJob>,
        stamp: &TickStamp,
    ) -> Result<(), WorldError> {
        if jobs.is_empty() {
            return Ok(());
        }

        let bridge = match (&self.bridge, self.options.dry_run) {
            (Some(bridge), false) => Arc::clone(bridge),
            _ => {
                for job in jobs {
                    self.skip_dialogue(job, stamp)?;
                }
                return Ok(());
            }
        };

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let bridge = Arc::clone(&bridge);
            let spec = job.spec.clone();
            let handle = tokio::spawn(async move { bridge.run_dialogue(&spec).await });
            handles.push((job, handle));
        }

        for (job, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "dialogue task panicked");
                    DialogueOutcome {
                        requested: job.spec.max_turns,
                        ..DialogueOutcome::default()
                    }
                }
            };
            self.finish_dialogue(job, outcome, stamp)?;
        }
        Ok(())
    }

    /// Records a dialogue-bearing action that ran without a backend.
    fn skip_dialogue(&mut self, job: DialogueJob, stamp: &TickStamp) -> Result<(), WorldError> {
        let mut event = self.dialogue_event(&job, stamp);
        event.status = EventStatus::Skipped;
        event.meta.reason = Some("dry_run".to_string());
        self.persist_event(event)?;
        self.store.increment_actions(job.initiator);
        for id in &job.participants {
            self.selector.note_dialogue(*id, stamp.tick);
        }
        Ok(())
    }

    /// Persists a finished dialogue: conversation row, accepted turns,
    /// the world event, then fact extraction over each turn.
    fn finish_dialogue(
        &mut self,
        job: DialogueJob,
        outcome: DialogueOutcome,
        stamp: &TickStamp,
    ) -> Result<(), WorldError> {
        let conversation_id = self.store.create_conversation(
            &job.spec.scenario,
            &job.spec.topic,
            job.participants.clone(),
            stamp.tick,
        );

        let mut turn_records = Vec::with_capacity(outcome.turns.len());
        for (index, draft) in outcome.turns.iter().enumerate() {
            let turn_id = self.store.record_turn(
                conversation_id,
                index as u32,
                draft.agent_id,
                &draft.model,
                &draft.content,
                draft.attempts,
                draft.exhausted,
            );
            turn_records.push((turn_id, draft.agent_id, draft.content.clone()));
        }

        let status = if outcome.turns.is_empty() {
            EventStatus::Failed
        } else if outcome.is_partial() {
            EventStatus::Partial
        } else {
            EventStatus::Completed
        };

        let mut event = self.dialogue_event(&job, stamp);
        event.status = status;
        event.meta.conversation_id = Some(conversation_id);
        event.meta.turns_persisted = Some(outcome.turns.len() as u32);
        event.meta.guardrail_attempts = Some(outcome.total_attempts);
        event.meta.guardrail_exhausted = outcome.any_exhausted;
        if status == EventStatus::Failed {
            event.meta.reason = Some("all_turns_failed".to_string());
        }
        self.persist_event(event)?;

        self.store.increment_actions(job.initiator);
        for id in &job.participants {
            self.selector.note_dialogue(*id, stamp.tick);
        }

        for (turn_id, agent_id, content) in turn_records {
            let stats = self.pipeline.process_turn(
                &mut self.store,
                agent_id,
                Some(turn_id),
                &content,
                stamp.tick,
            );
            if stats.facts > 0 {
                debug!(
                    agent = agent_id,
                    facts = stats.facts,
                    upserts = stats.upserts,
                    relationships = stats.relationships,
                    "turn facts extracted"
                );
            }
        }
        Ok(())
    }

    fn dialogue_event(&self, job: &DialogueJob, stamp: &TickStamp) -> WorldEvent {
        let mut event = WorldEvent {
            id: 0,
            agent_id: job.initiator,
            stamp: *stamp,
            action: job.kind,
            activity_id: job.activity_id,
            location_id: job.location_id,
            status: EventStatus::Completed,
            meta: Default::default(),
        };
        if job.participants.len() == 2 {
            event.meta.partner_id = job
                .participants
                .iter()
                .copied()
                .find(|id| *id != job.initiator);
        } else {
            event.meta.participants = job.participants.clone();
        }
        event
    }

    /// Appends an event, honoring `strict_persistence`.
    fn persist_event(&mut self, event: WorldEvent) -> Result<(), WorldError> {
        match self.store.append_event(event) {
            Ok(_) => Ok(()),
            Err(e) if self.config.strict_persistence => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "event write failed, continuing");
                Ok(())
            }
        }
    }

    fn end_of_day(&mut self, stamp: &TickStamp) -> Result<(), WorldError> {
        let day_label = stamp.day_label();
        if self.options.persist && !self.options.dry_run {
            let reporter =
                DailyReporter::new(&self.options.reports_dir, self.options.report_format);
            match reporter.generate(&mut self.store, &day_label) {
                Ok(paths) => {
                    info!(day = %day_label, files = paths.len(), "daily report written");
                }
                Err(e) if self.config.strict_persistence => {
                    return Err(WorldError::Persistence(e));
                }
                Err(e) => warn!(error = %e, day = %day_label, "daily report failed"),
            }
        }
        self.store.reset_daily_counters();
        debug!(day = %day_label, "day complete");
        Ok(())
    }
}
