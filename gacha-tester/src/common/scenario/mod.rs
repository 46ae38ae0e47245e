pub mod catalog;

use crate::logic::SimulationPlan;
use catalog::{catalog_scenarios, find_catalog_scenario};

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Look a scenario up by key or alias.
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = match name.to_lowercase().as_str() {
        "smoke" => "smoke",
        "full-reveal" | "full" => "full-reveal",
        "rapid-taps" | "taps" => "rapid-taps",
        "replay" => "replay",
        "teardown" | "unmount" => "teardown",
        "audio-blocked" | "autoplay" => "audio-blocked",
        "redeem-offline" | "offline" => "redeem-offline",
        "redeem-online" | "online" => "redeem-online",
        "clamp-guard" | "clamp" => "clamp-guard",
        _ => return None,
    };
    find_catalog_scenario(key)
}

pub fn list_scenarios() -> Vec<(&'static str, String)> {
    catalog_scenarios()
        .into_iter()
        .map(|(key, scenario)| (key, scenario.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_catalog_entries() {
        assert_eq!(get_scenario("full").unwrap().name, "Full Reveal");
        assert_eq!(get_scenario("AUTOPLAY").unwrap().name, "Blocked Ambient Audio");
        assert!(get_scenario("nope").is_none());
    }

    #[test]
    fn every_listed_key_resolves() {
        for (key, name) in list_scenarios() {
            let scenario = get_scenario(key).expect("listed scenario resolves");
            assert_eq!(scenario.name, name);
        }
    }
}
