//! Named logic scenarios the harness can run.

use anyhow::{Result, ensure};
use rabbithole_engine::{DebtTransition, Lifecycle, LogKind, PlayerState};

use crate::logic::{GameplayStrategy, SimulationPlan, SimulationSummary};

/// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn new(name: impl Into<String>, description: &'static str, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            description,
            plan,
        }
    }
}

type ScenarioFactory = fn() -> TestScenario;

const CATALOG: &[(&str, &str, ScenarioFactory)] = &[
    ("smoke", "Short autonomous run with log bookkeeping checks", smoke),
    ("full-run", "Autonomous run until the life ends", full_run),
    ("deterministic-replay", "Same seed replays identically", deterministic_replay),
    ("debt-spiral", "Deep debt is entered and becomes fatal", debt_spiral),
    ("manual-play", "Seeded player picks from manual offers", manual_play),
    ("tag-exclusivity", "Exclusive tags are never held together", tag_exclusivity),
    ("ending-finalize", "Authored endings close the run exactly once", ending_finalize),
    ("hidden-content", "Test and meta events never surface", hidden_content),
    ("talent-loadout", "Talents and pack stats seed the run", talent_loadout),
];

/// `(key, description)` for every scenario.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG
        .iter()
        .map(|(key, description, _)| (*key, *description))
        .collect()
}

/// Every scenario key, in listing order.
#[must_use]
pub fn all_scenario_keys() -> Vec<String> {
    CATALOG.iter().map(|(key, _, _)| (*key).to_string()).collect()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = name.trim().to_lowercase().replace('_', "-");
    CATALOG
        .iter()
        .find(|(candidate, _, _)| *candidate == key)
        .map(|(_, _, factory)| factory())
}

fn named(key: &str, plan: SimulationPlan) -> TestScenario {
    let description = CATALOG
        .iter()
        .find(|(candidate, _, _)| *candidate == key)
        .map_or("", |(_, description, _)| *description);
    TestScenario::new(key, description, plan)
}

fn smoke() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::Autonomous)
        .with_max_turns(60)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            let state = &summary.final_state;
            ensure!(!summary.reports.is_empty(), "no turns were played");
            ensure!(
                summary.reports.len() == state.turn as usize,
                "{} reports for {} turns",
                summary.reports.len(),
                state.turn
            );
            ensure!(
                state.log.len() <= state.log_capacity,
                "log holds {} entries over capacity {}",
                state.log.len(),
                state.log_capacity
            );
            let ordered = state
                .log
                .iter()
                .zip(state.log.iter().skip(1))
                .all(|(a, b)| a.seq < b.seq);
            ensure!(ordered, "log sequence numbers are not increasing");
            Ok(())
        });
    named("smoke", plan)
}

fn full_run() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::Autonomous)
        .with_max_turns(1000)
        .with_talents(&["nobody"])
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(
                summary.lifecycle() != Lifecycle::Active,
                "run still active after {} turns",
                summary.final_state.turn
            );
            ensure!(
                summary.final_state.stats.age <= 100.5,
                "aged past the limit: {}",
                summary.final_state.stats.age
            );
            let last = summary.final_state.log.back();
            ensure!(
                last.is_some_and(|entry| entry.kind == LogKind::Ending),
                "the final log entry is not an ending"
            );
            Ok(())
        });
    named("full-run", plan)
}

fn deterministic_replay() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::Autonomous)
        .with_max_turns(200)
        .with_talents(&["third_eye"])
        .with_replay_check()
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(
                summary.replay_consistent == Some(true),
                "replaying seed {} diverged",
                summary.seed
            );
            Ok(())
        });
    named("deterministic-replay", plan)
}

fn drown_in_debt(state: &mut PlayerState) {
    state.stats.money = -4990.0;
}

fn debt_spiral() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::Autonomous)
        .with_max_turns(5)
        .with_setup(drown_in_debt)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            let first = summary.reports.first();
            ensure!(
                first.is_some_and(|report| report.debt == Some(DebtTransition::Entered)),
                "debt was not entered on the first turn"
            );
            ensure!(
                summary.ending_label() == "debt",
                "expected a debt death, got {}",
                summary.ending_label()
            );
            ensure!(
                summary.unlocked.iter().any(|id| id == "broke"),
                "the debt achievement was not unlocked"
            );
            Ok(())
        });
    named("debt-spiral", plan)
}

fn manual_play() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::Random)
        .with_max_turns(150)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(!summary.decisions.is_empty(), "no manual decisions were made");
            let limit = summary.manual_choice_limit;
            ensure!(
                summary.offer_sizes.iter().all(|size| (1..=limit).contains(size)),
                "an offer exceeded {limit} candidates"
            );
            Ok(())
        });
    named("manual-play", plan)
}

fn tag_exclusivity() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::Devout)
        .with_max_turns(300)
        .with_talents(&["third_eye"])
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(
                summary.tag_violations.is_empty(),
                "exclusive tags held together: {}",
                summary.tag_violations.join(", ")
            );
            Ok(())
        });
    named("tag-exclusivity", plan)
}

fn ending_finalize() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::Cautious)
        .with_max_turns(20)
        .with_finale("awakening")
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(
                summary.lifecycle() == Lifecycle::Ended,
                "run is {} after the finale",
                summary.lifecycle()
            );
            ensure!(
                summary.finale_repeat_refused == Some(true),
                "the ending was applied twice"
            );
            if summary.ending_label() == "awakening" {
                ensure!(
                    summary.unlocked.iter().any(|id| id == "awake"),
                    "the ending achievement was not unlocked"
                );
            }
            Ok(())
        });
    named("ending-finalize", plan)
}

fn hidden_content() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::Autonomous)
        .with_max_turns(300)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            for hidden in ["system_debug_room", "meta_title_card"] {
                ensure!(
                    !summary.events_seen.contains(hidden),
                    "{hidden} surfaced during play"
                );
            }
            Ok(())
        });
    named("hidden-content", plan)
}

fn talent_loadout() -> TestScenario {
    let plan = SimulationPlan::new(GameplayStrategy::FirstOffer)
        .with_max_turns(1)
        .with_talents(&["trust_fund", "unknown_gift", "third_eye"])
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            let ids: Vec<&str> = summary
                .final_state
                .talents
                .iter()
                .map(|talent| talent.id.as_str())
                .collect();
            ensure!(
                ids == ["trust_fund", "third_eye"],
                "unexpected talents {ids:?}"
            );
            ensure!(
                summary.final_state.custom_stats.contains_key("caffeine"),
                "pack stat `caffeine` was not seeded"
            );
            Ok(())
        });
    named("talent-loadout", plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, description) in list_scenarios() {
            let scenario = get_scenario(key).expect("listed scenario exists");
            assert_eq!(scenario.name, key);
            assert_eq!(scenario.description, description);
            assert!(!scenario.plan.expectations.is_empty());
        }
        assert_eq!(all_scenario_keys().len(), CATALOG.len());
    }

    #[test]
    fn lookups_normalize_names() {
        assert!(get_scenario("Debt_Spiral").is_some());
        assert!(get_scenario(" smoke ").is_some());
        assert!(get_scenario("boss-fight").is_none());
    }
}
