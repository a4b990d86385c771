//! Environment
//!
//! Location graph travel and in-transit tracking. Travel time between
//! named locations comes from the configured graph; a missing edge falls
//! back to a flat default so agents are never stranded.

use std::collections::HashMap;

use world_events::{AgentId, Location, LocationId, TickStamp};

use crate::store::WorldStore;

const FALLBACK_TRAVEL_MINUTES: u32 = 30;

/// A trip in progress. The agent has no open placement row while a plan
/// exists.
#[derive(Debug, Clone)]
pub struct TravelPlan {
    pub destination: LocationId,
    pub depart_tick: u64,
    pub arrive_tick: u64,
}

/// Travel graph plus the set of agents currently between locations.
pub struct Environment {
    graph: HashMap<String, HashMap<String, u32>>,
    tick_minutes: u32,
    in_transit: HashMap<AgentId, TravelPlan>,
}

impl Environment {
    pub fn new(graph: HashMap<String, HashMap<String, u32>>, tick_minutes: u32) -> Self {
        Self {
            graph,
            tick_minutes,
            in_transit: HashMap::new(),
        }
    }

    /// Minutes to travel between two named locations. Zero for the same
    /// place, the flat fallback when the graph has no edge.
    pub fn travel_minutes(&self, from: &str, to: &str) -> u32 {
        if from.eq_ignore_ascii_case(to) {
            return 0;
        }
        self.edge(from, to)
            .or_else(|| self.edge(to, from))
            .unwrap_or(FALLBACK_TRAVEL_MINUTES)
    }

    fn edge(&self, from: &str, to: &str) -> Option<u32> {
        let row = self
            .graph
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(from))?
            .1;
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(to))
            .map(|(_, v)| *v)
    }

    /// Whole ticks a trip occupies, at least one.
    pub fn travel_ticks(&self, from: &str, to: &str) -> u32 {
        let minutes = self.travel_minutes(from, to);
        if minutes == 0 {
            return 0;
        }
        minutes.div_ceil(self.tick_minutes).max(1)
    }

    /// Whether a destination is within the travel budget.
    pub fn reachable(&self, from: &str, to: &str, max_minutes: u32) -> bool {
        self.travel_minutes(from, to) <= max_minutes
    }

    pub fn is_traveling(&self, agent_id: AgentId) -> bool {
        self.in_transit.contains_key(&agent_id)
    }

    /// Closes the agent's open placement and records the trip.
    /// Returns the arrival tick.
    pub fn begin_travel(
        &mut self,
        store: &mut WorldStore,
        agent_id: AgentId,
        from: &str,
        destination: LocationId,
        to: &str,
        tick: u64,
    ) -> u64 {
        let ticks = self.travel_ticks(from, to).max(1);
        let arrive_tick = tick + ticks as u64;
        store.close_open_row(agent_id, tick);
        self.in_transit.insert(
            agent_id,
            TravelPlan {
                destination,
                depart_tick: tick,
                arrive_tick,
            },
        );
        arrive_tick
    }

    /// Places every agent whose trip has completed by `tick` and returns
    /// their ids in ascending order.
    pub fn resolve_arrivals(&mut self, store: &mut WorldStore, tick: u64) -> Vec<AgentId> {
        let mut arrived: Vec<(AgentId, LocationId)> = self
            .in_transit
            .iter()
            .filter(|(_, plan)| plan.arrive_tick <= tick)
            .map(|(id, plan)| (*id, plan.destination))
            .collect();
        arrived.sort_unstable_by_key(|(id, _)| *id);
        for (agent_id, destination) in &arrived {
            self.in_transit.remove(agent_id);
            store.place_agent(*agent_id, *destination, tick);
        }
        arrived.into_iter().map(|(id, _)| id).collect()
    }

    /// Whether an agent may enter the location at this stamp: it must be
    /// within open hours and under capacity.
    pub fn can_enter(&self, store: &WorldStore, location: &Location, stamp: &TickStamp) -> bool {
        if let Some(hours) = location.open_hours {
            if !hours.contains(stamp.hour) {
                return false;
            }
        }
        store.occupancy(location.id) < location.capacity as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventLog;
    use world_events::{OpenHours, TickClock};

    fn graph() -> HashMap<String, HashMap<String, u32>> {
        let mut g = HashMap::new();
        let mut cafe = HashMap::new();
        cafe.insert("Office".to_string(), 15);
        cafe.insert("Park".to_string(), 10);
        g.insert("Cafe".to_string(), cafe);
        g
    }

    #[test]
    fn test_travel_minutes() {
        let env = Environment::new(graph(), 60);
        assert_eq!(env.travel_minutes("Cafe", "Office"), 15);
        // Reverse direction uses the same edge
        assert_eq!(env.travel_minutes("Office", "Cafe"), 15);
        assert_eq!(env.travel_minutes("Cafe", "Cafe"), 0);
        // Missing edge falls back
        assert_eq!(env.travel_minutes("Cafe", "Gym"), 30);
    }

    #[test]
    fn test_travel_ticks_rounds_up_with_minimum_one() {
        let env = Environment::new(graph(), 60);
        assert_eq!(env.travel_ticks("Cafe", "Office"), 1);
        assert_eq!(env.travel_ticks("Cafe", "Cafe"), 0);

        let env = Environment::new(graph(), 10);
        assert_eq!(env.travel_ticks("Cafe", "Office"), 2);
    }

    #[test]
    fn test_reachable_respects_budget() {
        let env = Environment::new(graph(), 60);
        assert!(env.reachable("Cafe", "Office", 15));
        assert!(!env.reachable("Cafe", "Office", 10));
    }

    #[test]
    fn test_travel_lifecycle() {
        let mut store = WorldStore::new(EventLog::null());
        let agent = store.insert_agent("Ada", "", "", vec![]);
        let cafe = store.insert_location("Cafe", "cafe", 6, None);
        let office = store.insert_location("Office", "office", 20, None);
        store.place_agent(agent, cafe, 0);

        let mut env = Environment::new(graph(), 60);
        let arrive = env.begin_travel(&mut store, agent, "Cafe", office, "Office", 2);
        assert_eq!(arrive, 3);
        assert!(env.is_traveling(agent));
        // Mid-travel there is no open placement row
        assert!(store.open_location_row(agent).is_none());

        assert!(env.resolve_arrivals(&mut store, 2).is_empty());
        let arrived = env.resolve_arrivals(&mut store, 3);
        assert_eq!(arrived, vec![agent]);
        assert!(!env.is_traveling(agent));
        assert_eq!(
            store.open_location_row(agent).map(|r| r.location_id),
            Some(office)
        );
    }

    #[test]
    fn test_can_enter_checks_hours_and_capacity() {
        let mut store = WorldStore::new(EventLog::null());
        let a = store.insert_agent("Ada", "", "", vec![]);
        let gym = store.insert_location("Gym", "gym", 1, Some(OpenHours { start: 9, end: 18 }));
        let env = Environment::new(HashMap::new(), 60);
        let clock = TickClock::new(1, 60, 8, 20);

        let gym_row = store.location(gym).unwrap().clone();
        // Closed at 08:00
        assert!(!env.can_enter(&store, &gym_row, &clock.stamp(0)));
        // Open at 09:00
        assert!(env.can_enter(&store, &gym_row, &clock.stamp(1)));

        store.place_agent(a, gym, 1);
        // Now at capacity
        assert!(!env.can_enter(&store, &gym_row, &clock.stamp(2)));
    }
}
