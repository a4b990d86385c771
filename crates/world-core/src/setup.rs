//! World Seeding
//!
//! Built-in deterministic world: locations, the activity catalog, a
//! small cast of personas with initial placements, and the default
//! travel graph matching those location names.

use std::collections::HashMap;

use world_events::OpenHours;

use crate::store::WorldStore;

/// Seeds the demo world into an empty store and returns the agent ids
/// in creation order.
pub fn seed_demo_world(store: &mut WorldStore) -> Vec<u64> {
    let home = store.insert_location("Home", "home", 4, None);
    let cafe = store.insert_location("Cafe", "cafe", 6, Some(OpenHours { start: 7, end: 22 }));
    let office = store.insert_location("Office", "office", 20, Some(OpenHours { start: 8, end: 20 }));
    store.insert_location("Gym", "gym", 10, Some(OpenHours { start: 6, end: 23 }));
    store.insert_location("Park", "park", 30, None);

    store.insert_activity("reflection", "wellness", 30);
    store.insert_activity("coffee_chat", "social", 30);
    store.insert_activity("team_standup", "work", 15);
    store.insert_activity("work_task", "work", 60);

    let ada = store.insert_agent(
        "Ada",
        "Software engineer focused on backend systems",
        "Senior Backend Engineer",
        vec![
            "distributed systems".to_string(),
            "coffee".to_string(),
            "rock climbing".to_string(),
        ],
    );
    let sam = store.insert_agent(
        "Sam",
        "Product designer who loves user research",
        "UX Designer",
        vec![
            "design thinking".to_string(),
            "coffee".to_string(),
            "photography".to_string(),
        ],
    );
    let mia = store.insert_agent(
        "Mia",
        "Data scientist passionate about ML",
        "ML Engineer",
        vec![
            "machine learning".to_string(),
            "running".to_string(),
            "cooking".to_string(),
        ],
    );
    let leo = store.insert_agent(
        "Leo",
        "Site reliability engineer who keeps things boring on purpose",
        "SRE",
        vec!["automation".to_string(), "cycling".to_string()],
    );

    store.place_agent(ada, cafe, 0);
    store.place_agent(sam, cafe, 0);
    store.place_agent(mia, office, 0);
    store.place_agent(leo, home, 0);

    vec![ada, sam, mia, leo]
}

/// Travel minutes between the demo locations. Edges are symmetric;
/// missing pairs fall back to the environment default.
pub fn default_location_graph() -> HashMap<String, HashMap<String, u32>> {
    let mut graph: HashMap<String, HashMap<String, u32>> = HashMap::new();
    let edges = [
        ("Home", "Cafe", 10),
        ("Home", "Office", 20),
        ("Home", "Gym", 15),
        ("Home", "Park", 10),
        ("Cafe", "Office", 10),
        ("Cafe", "Park", 15),
        ("Office", "Park", 15),
        ("Gym", "Park", 10),
    ];
    for (from, to, minutes) in edges {
        graph
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), minutes);
    }
    graph
}
