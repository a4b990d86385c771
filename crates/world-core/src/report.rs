//! Daily Reporting
//!
//! End-of-day metric aggregation over the event stream plus markdown
//! and JSON report files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use world_events::DailyReport;

use crate::error::PersistenceError;
use crate::store::WorldStore;

/// Output format for daily report files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
    Both,
}

/// Aggregated counters for one simulated day.
#[derive(Debug, Clone, Serialize)]
pub struct DayMetrics {
    pub total_events: u64,
    pub activities: BTreeMap<String, u64>,
    pub locations: BTreeMap<String, u64>,
    pub agent_actions: BTreeMap<String, BTreeMap<String, u64>>,
    pub memory_count: u64,
    pub relationship_count: u64,
    pub strong_relationship_count: u64,
    pub agents_active: u64,
}

impl DayMetrics {
    /// Aggregates all events stamped with `day_label` plus current
    /// memory and relationship totals.
    pub fn collect(store: &WorldStore, day_label: &str) -> Self {
        let mut activities: BTreeMap<String, u64> = BTreeMap::new();
        let mut locations: BTreeMap<String, u64> = BTreeMap::new();
        let mut agent_actions: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        let mut total_events = 0;

        for event in &store.events {
            if event.stamp.day_label() != day_label {
                continue;
            }
            total_events += 1;
            let action = event.action.name().to_string();
            *activities.entry(action.clone()).or_default() += 1;
            if let Some(location) = event.location_id.and_then(|id| store.location(id)) {
                *locations.entry(location.name.clone()).or_default() += 1;
            }
            if let Some(agent) = store.agent(event.agent_id) {
                *agent_actions
                    .entry(agent.name.clone())
                    .or_default()
                    .entry(action)
                    .or_default() += 1;
            }
        }

        let strong = store
            .relationships
            .iter()
            .filter(|r| r.strength > 0.5)
            .count();

        Self {
            total_events,
            agents_active: agent_actions.len() as u64,
            activities,
            locations,
            agent_actions,
            memory_count: store.memories.len() as u64,
            relationship_count: store.relationships.len() as u64,
            strong_relationship_count: strong as u64,
        }
    }

    /// Human-readable summary text.
    pub fn summary(&self, day_label: &str) -> String {
        let mut lines = vec![
            format!("Day {} Summary:", day_label),
            format!("- Total events: {}", self.total_events),
            format!("- Active agents: {}", self.agents_active),
            format!("- Memories recorded: {}", self.memory_count),
            format!(
                "- Relationships: {} ({} strong)",
                self.relationship_count, self.strong_relationship_count
            ),
        ];

        if !self.activities.is_empty() {
            lines.push(String::new());
            lines.push("Top activities:".to_string());
            for (name, count) in top_counts(&self.activities, 5) {
                lines.push(format!("  - {}: {}", name, count));
            }
        }
        if !self.locations.is_empty() {
            lines.push(String::new());
            lines.push("Most visited locations:".to_string());
            for (name, count) in top_counts(&self.locations, 5) {
                lines.push(format!("  - {}: {}", name, count));
            }
        }
        lines.join("\n")
    }
}

/// Entries sorted by count descending, name ascending on ties.
fn top_counts(counts: &BTreeMap<String, u64>, limit: usize) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    entries.truncate(limit);
    entries
}

/// Writes daily report files and the store's report row.
pub struct DailyReporter {
    reports_dir: PathBuf,
    format: ReportFormat,
}

impl DailyReporter {
    pub fn new(reports_dir: impl Into<PathBuf>, format: ReportFormat) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            format,
        }
    }

    /// Aggregates the day, writes the configured files and upserts the
    /// report row. Returns the paths written.
    pub fn generate(
        &self,
        store: &mut WorldStore,
        day_label: &str,
    ) -> Result<Vec<PathBuf>, PersistenceError> {
        let metrics = DayMetrics::collect(store, day_label);
        let summary = metrics.summary(day_label);
        let metrics_value = serde_json::to_value(&metrics)?;

        store.record_report(DailyReport {
            day_label: day_label.to_string(),
            summary: summary.clone(),
            metrics: metrics_value.clone(),
        });

        std::fs::create_dir_all(&self.reports_dir).map_err(PersistenceError::Report)?;
        let mut written = Vec::new();

        if matches!(self.format, ReportFormat::Markdown | ReportFormat::Both) {
            let path = self.reports_dir.join(format!("world_{}.md", day_label));
            self.write_markdown(&path, day_label, &summary, &metrics)?;
            written.push(path);
        }
        if matches!(self.format, ReportFormat::Json | ReportFormat::Both) {
            let path = self.reports_dir.join(format!("world_{}.json", day_label));
            self.write_json(&path, day_label, &summary, &metrics_value)?;
            written.push(path);
        }
        Ok(written)
    }

    fn write_markdown(
        &self,
        path: &Path,
        day_label: &str,
        summary: &str,
        metrics: &DayMetrics,
    ) -> Result<(), PersistenceError> {
        let mut content = vec![
            format!("# World Simulation Report - {}", day_label),
            String::new(),
            "## Summary".to_string(),
            String::new(),
            summary.to_string(),
            String::new(),
            "## Agent Activity Breakdown".to_string(),
            String::new(),
        ];

        for (agent_name, actions) in &metrics.agent_actions {
            content.push(format!("### {}", agent_name));
            for (action, count) in top_counts(actions, usize::MAX) {
                content.push(format!("- {}: {}", action, count));
            }
            content.push(String::new());
        }

        content.extend([
            "## Metrics".to_string(),
            String::new(),
            format!("- Total Events: {}", metrics.total_events),
            format!("- Active Agents: {}", metrics.agents_active),
            format!("- Memory Count: {}", metrics.memory_count),
            format!("- Relationships: {}", metrics.relationship_count),
        ]);

        std::fs::write(path, content.join("\n")).map_err(PersistenceError::Report)
    }

    fn write_json(
        &self,
        path: &Path,
        day_label: &str,
        summary: &str,
        metrics: &serde_json::Value,
    ) -> Result<(), PersistenceError> {
        let report = serde_json::json!({
            "day_label": day_label,
            "summary": summary,
            "metrics": metrics,
        });
        let body = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, body).map_err(PersistenceError::Report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventLog;
    use world_events::{
        ActionKind, EventMeta, EventStatus, MemoryKind, TickClock, WorldEvent,
    };

    fn populated_store() -> WorldStore {
        let mut store = WorldStore::new(EventLog::null());
        let ada = store.insert_agent("Ada", "", "", vec![]);
        let sam = store.insert_agent("Sam", "", "", vec![]);
        let cafe = store.insert_location("Cafe", "cafe", 6, None);

        let clock = TickClock::new(2, 60, 8, 20);
        for (tick, agent, action) in [
            (0u64, ada, ActionKind::DuoChat),
            (1, ada, ActionKind::SoloReflection),
            (2, sam, ActionKind::DuoChat),
            (12, ada, ActionKind::TaskUpdate), // day 2
        ] {
            store
                .append_event(WorldEvent {
                    id: 0,
                    agent_id: agent,
                    stamp: clock.stamp(tick),
                    action,
                    activity_id: None,
                    location_id: Some(cafe),
                    status: EventStatus::Completed,
                    meta: EventMeta::default(),
                })
                .unwrap();
        }

        store.upsert_memory(ada, MemoryKind::Preference, "likes tea", 0.8, None, 1);
        store.bump_relationship(ada, sam, "friend", 0.6, 0.05, 1);
        store
    }

    #[test]
    fn test_metrics_scoped_to_day() {
        let store = populated_store();
        let metrics = DayMetrics::collect(&store, "day_1");

        assert_eq!(metrics.total_events, 3);
        assert_eq!(metrics.activities.get("duo_chat"), Some(&2));
        assert_eq!(metrics.activities.get("solo_reflection"), Some(&1));
        assert!(metrics.activities.get("task_update").is_none());
        assert_eq!(metrics.locations.get("Cafe"), Some(&3));
        assert_eq!(metrics.agents_active, 2);
        assert_eq!(metrics.memory_count, 1);
        assert_eq!(metrics.relationship_count, 1);
        assert_eq!(metrics.strong_relationship_count, 1);
    }

    #[test]
    fn test_summary_lists_top_activities() {
        let store = populated_store();
        let metrics = DayMetrics::collect(&store, "day_1");
        let summary = metrics.summary("day_1");

        assert!(summary.starts_with("Day day_1 Summary:"));
        assert!(summary.contains("- Total events: 3"));
        assert!(summary.contains("Top activities:"));
        assert!(summary.contains("  - duo_chat: 2"));
        assert!(summary.contains("Most visited locations:"));
    }

    #[test]
    fn test_reporter_writes_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = populated_store();
        let reporter = DailyReporter::new(dir.path(), ReportFormat::Both);

        let written = reporter.generate(&mut store, "day_1").unwrap();
        assert_eq!(written.len(), 2);

        let md = std::fs::read_to_string(&written[0]).unwrap();
        assert!(md.starts_with("# World Simulation Report - day_1"));
        assert!(md.contains("### Ada"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
        assert_eq!(json["day_label"], "day_1");
        assert_eq!(json["metrics"]["total_events"], 3);

        // Report row landed in the store
        assert_eq!(store.reports.len(), 1);
        assert_eq!(store.reports[0].day_label, "day_1");
    }

    #[test]
    fn test_markdown_only_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = populated_store();
        let reporter = DailyReporter::new(dir.path(), ReportFormat::default());
        let written = reporter.generate(&mut store, "day_1").unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].to_string_lossy().ends_with(".md"));
    }
}
