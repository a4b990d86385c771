//! Autonomous World Simulator
//!
//! Tick-based multi-agent world where LLM-backed personas move between
//! locations, hold conversations, and accumulate memories and
//! relationships over simulated days.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use world_core::{
    default_location_graph, seed_demo_world, EventLog, ReportFormat, RunOptions, WorldConfig,
    WorldScheduler, WorldStore,
};
use world_dialogue::{DialogueBackend, OllamaBackend};

/// Command line arguments for the world simulator
#[derive(Parser, Debug)]
#[command(name = "world_sim")]
#[command(about = "An autonomous multi-agent world simulator")]
struct Args {
    /// Path to the world configuration file
    #[arg(long, default_value = "world.toml")]
    config: PathBuf,

    /// Simulated days to run
    #[arg(long, default_value_t = 1)]
    days: u32,

    /// Cap on how many agents act each tick
    #[arg(long, default_value_t = 4)]
    agents: usize,

    /// Minutes of simulated time per tick
    #[arg(long, default_value_t = 60)]
    tick_minutes: u32,

    /// Hour the waking window opens
    #[arg(long, default_value_t = 8)]
    start_hour: u8,

    /// Hour the waking window closes
    #[arg(long, default_value_t = 20)]
    end_hour: u8,

    /// Skip durable event, conversation and report output
    #[arg(long)]
    no_persist: bool,

    /// Select actions but skip all dialogue backend calls
    #[arg(long)]
    dry_run: bool,

    /// Concurrent dialogue call cap
    #[arg(long, default_value_t = 1)]
    max_concurrent_chats: usize,

    /// Daily report output format
    #[arg(long, value_enum, default_value = "markdown")]
    report_format: ReportFormat,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Path for the append-only event log
    #[arg(long, default_value = "events.jsonl")]
    events_out: PathBuf,

    /// Directory for daily report files
    #[arg(long, default_value = "reports")]
    reports_dir: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = if args.config.exists() {
        WorldConfig::from_file(&args.config)?
    } else {
        warn!(path = %args.config.display(), "config file not found, using defaults");
        WorldConfig::default()
    };
    if config.location_graph.is_empty() {
        config.location_graph = default_location_graph();
    }

    let options = RunOptions {
        days: args.days,
        max_agents: args.agents,
        tick_minutes: args.tick_minutes,
        start_hour: args.start_hour,
        end_hour: args.end_hour,
        persist: !args.no_persist,
        dry_run: args.dry_run,
        max_concurrent_chats: args.max_concurrent_chats,
        report_format: args.report_format,
        seed: args.seed,
        reports_dir: args.reports_dir.clone(),
    };

    println!("World Simulator");
    println!("===============");
    println!("Seed: {}", options.seed);
    println!("Days: {} ({} min ticks)", options.days, options.tick_minutes);
    println!(
        "Waking window: {:02}:00-{:02}:00",
        options.start_hour, options.end_hour
    );
    if options.dry_run {
        println!("Mode: dry run (no dialogue calls)");
    }
    println!();

    let log = if options.persist && !options.dry_run {
        EventLog::new(&args.events_out)?
    } else {
        EventLog::null()
    };
    let mut store = WorldStore::new(log);
    let agents = seed_demo_world(&mut store);
    println!("Seeded {} agents across {} locations", agents.len(), store.locations.len());

    let backend: Option<Arc<dyn DialogueBackend>> = if options.dry_run {
        None
    } else {
        let timeout = Duration::from_secs(config.dialogue.call_timeout_secs);
        Some(Arc::new(OllamaBackend::with_base_url(
            config.dialogue.ollama_url.clone(),
            timeout,
        )?) as Arc<dyn DialogueBackend>)
    };

    let scheduler = WorldScheduler::new(config, options, store, backend)?;
    let (summary, _store) = scheduler.run().await?;

    println!();
    println!(
        "Run {} complete: {} ticks over {} days.",
        summary.run_id, summary.ticks, summary.days
    );
    println!(
        "Recorded {} events, {} conversations, {} dialogue turns.",
        summary.events, summary.conversations, summary.turns
    );

    Ok(())
}
