//! Full-run integration tests
//!
//! Drives the scheduler end to end over seeded worlds and checks the
//! run-level invariants: tick accounting, dry-run isolation, the
//! dialogue concurrency cap, guardrail retry budgets, placement
//! consistency and daily report output.

use std::sync::Arc;
use std::time::Duration;

use world_core::{
    default_location_graph, seed_demo_world, EventLog, ReportFormat, RunOptions, WorldConfig,
    WorldScheduler, WorldStore,
};
use world_dialogue::{DialogueBackend, ScriptedBackend};
use world_events::{ActionKind, EventStatus, ScheduleSlot};

fn demo_store() -> WorldStore {
    let mut store = WorldStore::new(EventLog::null());
    seed_demo_world(&mut store);
    store
}

fn demo_config() -> WorldConfig {
    let mut config = WorldConfig::default();
    config.location_graph = default_location_graph();
    config
}

fn short_day(ticks: u32) -> RunOptions {
    RunOptions {
        days: 1,
        tick_minutes: 60,
        start_hour: 9,
        end_hour: 9 + ticks as u8,
        persist: false,
        ..RunOptions::default()
    }
}

/// Pins all weight on non-dialogue actions so only schedule slots
/// produce conversations.
fn scheduled_only(config: &mut WorldConfig) {
    config.action_weights.duo_chat = 0.0;
    config.action_weights.group_standup = 0.0;
    config.action_weights.r#move = 0.0;
    config.selector.dialogue_cooldown_ticks = 0;
}

#[tokio::test]
async fn test_dry_run_full_day_makes_no_backend_calls() {
    let backend = Arc::new(ScriptedBackend::repeating("hello"));
    let calls = backend.clone();
    let mut opts = RunOptions {
        persist: false,
        dry_run: true,
        ..RunOptions::default()
    };
    opts.seed = 11;

    let scheduler = WorldScheduler::new(
        demo_config(),
        opts,
        demo_store(),
        Some(backend as Arc<dyn DialogueBackend>),
    )
    .unwrap();
    let (summary, store) = scheduler.run().await.unwrap();

    // Default window is 12 one-hour ticks
    assert_eq!(summary.ticks, 12);
    assert_eq!(summary.turns, 0);
    assert_eq!(summary.conversations, 0);
    assert_eq!(calls.calls(), 0);
    assert!(summary.events > 0);
    for event in store.events.iter().filter(|e| e.action.dialogue_bearing()) {
        assert_eq!(event.status, EventStatus::Skipped);
        assert_eq!(event.meta.reason.as_deref(), Some("dry_run"));
    }
}

#[tokio::test]
async fn test_every_agent_keeps_exactly_one_open_placement() {
    let mut opts = RunOptions {
        days: 2,
        persist: false,
        dry_run: true,
        ..RunOptions::default()
    };
    opts.seed = 3;

    let scheduler = WorldScheduler::new(demo_config(), opts, demo_store(), None).unwrap();
    let (_, store) = scheduler.run().await.unwrap();

    for agent_id in store.agents.keys() {
        let open = store
            .placements
            .iter()
            .filter(|p| p.agent_id == *agent_id && p.is_open())
            .count();
        // Agents mid-travel have no open row until they arrive
        assert!(open <= 1, "agent {} has {} open placements", agent_id, open);
        let closed_unordered = store
            .placements
            .iter()
            .filter(|p| p.agent_id == *agent_id)
            .filter(|p| p.until_tick.is_some_and(|until| until < p.since_tick))
            .count();
        assert_eq!(closed_unordered, 0);
    }
}

#[tokio::test]
async fn test_concurrency_cap_of_one_serializes_dialogue_calls() {
    let mut store = demo_store();
    // Two pairs chat in the same tick: Ada with Sam, Mia with Leo.
    // Mia starts at the office, so move Leo there first.
    let office = store.location_by_name("Office").unwrap().id;
    store.place_agent(4, office, 0);
    for (initiator, partner) in [(1, Some(2)), (3, Some(4))] {
        store.insert_schedule_slot(ScheduleSlot {
            agent_id: initiator,
            day: 1,
            tick_of_day: 0,
            action: ActionKind::DuoChat,
            partner_id: partner,
        });
    }
    let mut config = demo_config();
    scheduled_only(&mut config);

    let backend = Arc::new(
        ScriptedBackend::repeating("Busy day so far.").with_delay(Duration::from_millis(15)),
    );
    let probe = backend.clone();
    let mut opts = short_day(1);
    opts.max_concurrent_chats = 1;

    let scheduler = WorldScheduler::new(
        config,
        opts,
        store,
        Some(backend as Arc<dyn DialogueBackend>),
    )
    .unwrap();
    let (summary, _) = scheduler.run().await.unwrap();

    assert_eq!(summary.conversations, 2);
    assert!(probe.calls() >= 2);
    // Both dialogues ran in the same tick, but never overlapped a call
    assert_eq!(probe.peak_in_flight(), 1);
}

#[tokio::test]
async fn test_weight_forced_duo_chat_pairs_every_tick() {
    let mut store = demo_store();
    // Two co-located pairs: Ada with Sam at the cafe, Mia with Leo at
    // the office. No slots; selection runs purely off the weight table.
    let office = store.location_by_name("Office").unwrap().id;
    store.place_agent(4, office, 0);

    let mut config = demo_config();
    config.action_weights.duo_chat = 1.0;
    config.action_weights.r#move = 0.0;
    config.action_weights.solo_reflection = 0.0;
    config.action_weights.group_standup = 0.0;
    config.action_weights.task_update = 0.0;
    config.action_weights.idle = 0.0;
    config.selector.dialogue_cooldown_ticks = 0;

    let backend: Arc<dyn DialogueBackend> =
        Arc::new(ScriptedBackend::repeating("Good to catch up."));
    let scheduler = WorldScheduler::new(config, short_day(2), store, Some(backend)).unwrap();
    let (summary, store) = scheduler.run().await.unwrap();

    // Two pairs per tick, two ticks
    assert_eq!(summary.conversations, 4);
    let duo_events = store
        .events
        .iter()
        .filter(|e| e.action == ActionKind::DuoChat)
        .count();
    assert_eq!(duo_events, 4);
    for event in &store.events {
        assert_eq!(event.action, ActionKind::DuoChat);
        assert_eq!(event.status, EventStatus::Completed);
    }
}

#[tokio::test]
async fn test_guardrail_exhaustion_consumes_full_retry_budget() {
    let mut store = demo_store();
    store.insert_schedule_slot(ScheduleSlot {
        agent_id: 1,
        day: 1,
        tick_of_day: 0,
        action: ActionKind::DuoChat,
        partner_id: Some(2),
    });
    let mut config = demo_config();
    scheduled_only(&mut config);
    // Every scripted line violates the word cap, so each turn burns the
    // whole budget and is accepted flagged.
    config.guardrails.max_words = 3;
    config.guardrails.max_attempts = 2;

    let backend: Arc<dyn DialogueBackend> = Arc::new(ScriptedBackend::repeating(
        "this reply is far too long for the cap",
    ));
    let scheduler = WorldScheduler::new(config, short_day(1), store, Some(backend)).unwrap();
    let (summary, store) = scheduler.run().await.unwrap();

    assert_eq!(summary.conversations, 1);
    assert!(summary.turns > 0);
    for turn in &store.turns {
        assert!(turn.exhausted);
        assert_eq!(turn.attempts, 2);
    }
    let event = store
        .events
        .iter()
        .find(|e| e.action == ActionKind::DuoChat)
        .unwrap();
    assert_eq!(event.status, EventStatus::Completed);
    assert!(event.meta.guardrail_exhausted);
    assert_eq!(event.meta.guardrail_attempts, Some(summary.turns as u32 * 2));
}

#[tokio::test]
async fn test_same_seed_reproduces_event_sequence() {
    let run = |seed: u64| async move {
        let mut opts = RunOptions {
            persist: false,
            dry_run: true,
            ..RunOptions::default()
        };
        opts.seed = seed;
        let scheduler = WorldScheduler::new(demo_config(), opts, demo_store(), None).unwrap();
        let (_, store) = scheduler.run().await.unwrap();
        store
            .events
            .iter()
            .map(|e| (e.agent_id, e.action, e.stamp.tick))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(42).await, run(42).await);
}

#[tokio::test]
async fn test_daily_reports_written_per_day() {
    let reports_dir = tempfile::tempdir().unwrap();
    let mut config = demo_config();
    scheduled_only(&mut config);
    config.action_weights.solo_reflection = 1.0;

    let backend: Arc<dyn DialogueBackend> = Arc::new(ScriptedBackend::repeating("All quiet."));
    let opts = RunOptions {
        days: 2,
        tick_minutes: 60,
        start_hour: 9,
        end_hour: 11,
        persist: true,
        report_format: ReportFormat::Both,
        reports_dir: reports_dir.path().to_path_buf(),
        ..RunOptions::default()
    };

    let scheduler = WorldScheduler::new(config, opts, demo_store(), Some(backend)).unwrap();
    let (_, store) = scheduler.run().await.unwrap();

    assert_eq!(store.reports.len(), 2);
    for day in 1..=2 {
        let md = reports_dir.path().join(format!("world_day_{}.md", day));
        let json = reports_dir.path().join(format!("world_day_{}.json", day));
        assert!(md.exists(), "missing {}", md.display());
        assert!(json.exists(), "missing {}", json.display());
        let body = std::fs::read_to_string(&md).unwrap();
        assert!(body.contains(&format!("day_{}", day)));
    }
}
