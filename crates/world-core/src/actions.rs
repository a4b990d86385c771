//! Action Execution
//!
//! Builders for the concrete effects of each action kind. Synchronous
//! actions produce a finished [`WorldEvent`] directly; dialogue-bearing
//! actions produce a [`DialogueJob`] the scheduler runs through the
//! conversation bridge before the event is finalized.

use rand::Rng;

use world_dialogue::{DialogueSpec, PersonaCard};
use world_events::{
    ActionKind, ActivityId, AgentId, EventMeta, EventStatus, LocationId, MemoryKind, TickStamp,
    WorldEvent,
};

use crate::config::DialogueConfig;
use crate::context::ContextComposer;
use crate::environment::Environment;
use crate::store::WorldStore;

pub const REFLECTION_PROMPTS: [&str; 4] = [
    "reflect on recent experiences",
    "think about goals and aspirations",
    "review the day's events",
    "contemplate personal growth",
];

pub const WORK_TASKS: [&str; 5] = [
    "code review",
    "feature implementation",
    "bug fixing",
    "documentation",
    "planning",
];

fn base_event(
    agent_id: AgentId,
    stamp: &TickStamp,
    action: ActionKind,
    activity_id: Option<ActivityId>,
    location_id: Option<LocationId>,
) -> WorldEvent {
    WorldEvent {
        id: 0,
        agent_id,
        stamp: *stamp,
        action,
        activity_id,
        location_id,
        status: EventStatus::Completed,
        meta: EventMeta::default(),
    }
}

/// An agent passing the tick. Always succeeds.
pub fn execute_idle(store: &WorldStore, agent_id: AgentId, stamp: &TickStamp) -> WorldEvent {
    let here = store.open_location_row(agent_id).map(|r| r.location_id);
    base_event(agent_id, stamp, ActionKind::Idle, None, here)
}

/// Starts travel toward an already-validated destination.
pub fn execute_move(
    store: &mut WorldStore,
    env: &mut Environment,
    agent_id: AgentId,
    destination: LocationId,
    stamp: &TickStamp,
) -> WorldEvent {
    let from_name = store
        .open_location_row(agent_id)
        .and_then(|r| store.location(r.location_id))
        .map(|l| l.name.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let to_name = store
        .location(destination)
        .map(|l| l.name.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let arrive = env.begin_travel(store, agent_id, &from_name, destination, &to_name, stamp.tick);
    let travel_ticks = (arrive - stamp.tick) as u32;

    let mut event = base_event(agent_id, stamp, ActionKind::Move, None, Some(destination));
    event.meta.from_location = Some(from_name);
    event.meta.to_location = Some(to_name);
    event.meta.travel_ticks = Some(travel_ticks);
    event
}

/// Private reflection. Writes a low-confidence reflection memory keyed
/// by tick so repeated prompts never collapse into one row.
pub fn execute_solo_reflection<R: Rng>(
    store: &mut WorldStore,
    rng: &mut R,
    agent_id: AgentId,
    stamp: &TickStamp,
) -> WorldEvent {
    let prompt = REFLECTION_PROMPTS[rng.gen_range(0..REFLECTION_PROMPTS.len())];
    let activity = store.activity_by_name("reflection").map(|a| a.id);
    let here = store.open_location_row(agent_id).map(|r| r.location_id);

    let name = store
        .agent(agent_id)
        .map(|a| a.name.clone())
        .unwrap_or_default();
    let text = format!("{} spent time {}", name, prompt);
    let hash = format!("reflection_{}_{}", stamp.tick, agent_id);
    store.upsert_memory_with_hash(agent_id, MemoryKind::Reflection, &text, 0.6, None, hash, stamp.tick);

    let mut event = base_event(agent_id, stamp, ActionKind::SoloReflection, activity, here);
    event.meta.detail = Some(prompt.to_string());
    event
}

/// Progress on a named work task.
pub fn execute_task_update<R: Rng>(
    store: &WorldStore,
    rng: &mut R,
    agent_id: AgentId,
    stamp: &TickStamp,
) -> WorldEvent {
    let task = WORK_TASKS[rng.gen_range(0..WORK_TASKS.len())];
    let activity = store.activity_by_name("work_task").map(|a| a.id);
    let here = store.open_location_row(agent_id).map(|r| r.location_id);

    let mut event = base_event(agent_id, stamp, ActionKind::TaskUpdate, activity, here);
    event.meta.detail = Some(task.to_string());
    event
}

/// A dialogue-bearing action awaiting its conversation.
#[derive(Debug, Clone)]
pub struct DialogueJob {
    pub kind: ActionKind,
    pub initiator: AgentId,
    pub participants: Vec<AgentId>,
    pub activity_id: Option<ActivityId>,
    pub location_id: Option<LocationId>,
    pub spec: DialogueSpec,
}

/// Topic agents talk about: a shared interest when one exists, the
/// initiator's first interest otherwise, a fallback when nobody has any.
fn pick_topic(store: &WorldStore, participants: &[AgentId]) -> String {
    let interest_sets: Vec<Vec<String>> = participants
        .iter()
        .filter_map(|id| store.agent(*id))
        .map(|a| a.interests.clone())
        .collect();
    if let Some(first) = interest_sets.first() {
        for interest in first {
            if interest_sets.iter().skip(1).all(|set| set.contains(interest)) {
                return interest.clone();
            }
        }
        if let Some(own) = first.first() {
            return own.clone();
        }
    }
    "how the day is going".to_string()
}

fn persona_card(store: &WorldStore, composer: &ContextComposer, id: AgentId, topic: &str) -> PersonaCard {
    let agent = store.agent(id);
    let name = agent.map(|a| a.name.clone()).unwrap_or_default();
    let card = agent
        .map(|a| composer.compose(store, a, topic))
        .unwrap_or_default();
    PersonaCard {
        agent_id: id,
        name: name.clone(),
        system_prompt: format!(
            "You are {}. Speak casually, in first person, a sentence or two at a time.\n{}",
            name, card
        ),
    }
}

fn dialogue_job(
    store: &WorldStore,
    composer: &ContextComposer,
    config: &DialogueConfig,
    kind: ActionKind,
    activity_name: &str,
    scenario_prefix: &str,
    initiator: AgentId,
    participants: Vec<AgentId>,
    stamp: &TickStamp,
) -> DialogueJob {
    let topic = pick_topic(store, &participants);
    let here = store.open_location_row(initiator).map(|r| r.location_id);
    let location_name = here
        .and_then(|id| store.location(id))
        .map(|l| l.name.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let cards: Vec<PersonaCard> = participants
        .iter()
        .map(|id| persona_card(store, composer, *id, &topic))
        .collect();
    DialogueJob {
        kind,
        initiator,
        participants,
        activity_id: store.activity_by_name(activity_name).map(|a| a.id),
        location_id: here,
        spec: DialogueSpec {
            scenario: format!("{} at {} ({})", scenario_prefix, location_name, stamp),
            topic,
            model: config.model.clone(),
            max_turns: config.max_turns,
            participants: cards,
        },
    }
}

/// Two co-located agents chatting.
pub fn duo_chat_job(
    store: &WorldStore,
    composer: &ContextComposer,
    config: &DialogueConfig,
    initiator: AgentId,
    partner: AgentId,
    stamp: &TickStamp,
) -> DialogueJob {
    dialogue_job(
        store,
        composer,
        config,
        ActionKind::DuoChat,
        "coffee_chat",
        "coffee_chat",
        initiator,
        vec![initiator, partner],
        stamp,
    )
}

/// Standup among everyone at the initiator's location.
pub fn group_standup_job(
    store: &WorldStore,
    composer: &ContextComposer,
    config: &DialogueConfig,
    initiator: AgentId,
    participants: Vec<AgentId>,
    stamp: &TickStamp,
) -> DialogueJob {
    dialogue_job(
        store,
        composer,
        config,
        ActionKind::GroupStandup,
        "team_standup",
        "team_standup",
        initiator,
        participants,
        stamp,
    )
}
