use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::debug;
use rabbithole_engine::constants::POOL_CHOICES;
use rabbithole_engine::{
    Catalog, DrawCounts, GameSession, Lifecycle, ManualOffer, ManualTurn, PlayerState, TurnReport,
};

use crate::assets::TesterAssets;
use crate::logic::policy::{GameplayStrategy, PlayerPolicy, PolicyDecision};

pub const DEFAULT_MAX_TURNS: u32 = 400;

/// What one scenario plays and what it must observe.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_turns: u32,
    pub talents: Vec<String>,
    pub setup: Option<fn(&mut PlayerState)>,
    /// Ending to trigger once play stops.
    pub finale: Option<String>,
    /// Play the seed twice and compare the runs.
    pub verify_replay: bool,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_turns: DEFAULT_MAX_TURNS,
            talents: Vec::new(),
            setup: None,
            finale: None,
            verify_replay: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub fn with_talents(mut self, talents: &[&str]) -> Self {
        self.talents = talents.iter().map(|talent| (*talent).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut PlayerState)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_finale(mut self, ending_id: impl Into<String>) -> Self {
        self.finale = Some(ending_id.into());
        self
    }

    #[must_use]
    pub const fn with_replay_check(mut self) -> Self {
        self.verify_replay = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// A resolved choice, whoever made it.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub turn: u32,
    pub event_id: String,
    pub choice_id: String,
    pub policy_name: String,
    pub offered: usize,
    pub rationale: Option<String>,
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub reports: Vec<TurnReport>,
    pub decisions: Vec<DecisionRecord>,
    /// Size of every manual offer that carried candidates.
    pub offer_sizes: Vec<usize>,
    pub events_seen: BTreeSet<String>,
    /// Pairs of mutually exclusive tags observed together, with the turn.
    pub tag_violations: Vec<String>,
    pub final_state: PlayerState,
    pub unlocked: Vec<String>,
    pub draw_counts: DrawCounts,
    /// Whether repeating the finale was refused; `None` without a finale.
    pub finale_repeat_refused: Option<bool>,
    /// Whether a second run of the same seed matched; `None` when not checked.
    pub replay_consistent: Option<bool>,
    pub manual_choice_limit: usize,
}

impl SimulationSummary {
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.final_state.lifecycle()
    }

    #[must_use]
    pub fn ending_label(&self) -> &str {
        self.final_state.death_reason.as_deref().unwrap_or("none")
    }
}

/// Headless deterministic runner for the engine.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    assets: Arc<TesterAssets>,
}

impl GameTester {
    pub const fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self { verbose, assets }
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Play `plan` once for `seed`, twice when the plan checks replays.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects a manual selection.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let mut summary = self.play(plan, seed)?;
        if plan.verify_replay {
            let replay = self.play(plan, seed)?;
            summary.replay_consistent = Some(
                replay.final_state == summary.final_state
                    && replay.draw_counts == summary.draw_counts
                    && replay.reports == summary.reports,
            );
        }
        Ok(summary)
    }

    fn play(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let engine = &self.assets.engine;
        let mut session = engine.create_session(seed, &plan.talents);
        if let Some(setup) = plan.setup {
            session.with_state_mut(setup);
        }

        let mut run = RunLog::default();
        match plan.strategy.create_policy(seed) {
            None => Self::play_autonomous(&mut session, plan.max_turns, &mut run),
            Some(mut policy) => {
                Self::play_manual(&mut session, plan.max_turns, policy.as_mut(), &mut run)?;
            }
        }

        let finale_repeat_refused = plan.finale.as_deref().map(|ending| {
            session.trigger_ending(ending);
            !session.trigger_ending(ending)
        });
        if self.verbose {
            debug!(
                "seed {seed} finished on turn {} as {}",
                session.state().turn,
                session.lifecycle()
            );
        }

        let draw_counts = session.draw_counts();
        let manual_choice_limit = session.config().manual_choice_count;
        let (final_state, ledger) = session.into_parts();
        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            reports: run.reports,
            decisions: run.decisions,
            offer_sizes: run.offer_sizes,
            events_seen: run.events_seen,
            tag_violations: run.tag_violations,
            final_state,
            unlocked: ledger.unlocked().to_vec(),
            draw_counts,
            finale_repeat_refused,
            replay_consistent: None,
            manual_choice_limit,
        })
    }

    fn play_autonomous(session: &mut GameSession, max_turns: u32, run: &mut RunLog) {
        for _ in 0..max_turns {
            if session.lifecycle() != Lifecycle::Active {
                break;
            }
            let report = session.run_turn();
            if let (Some(event_id), Some(choice_id)) = (&report.event_id, &report.choice_id) {
                run.decisions.push(DecisionRecord {
                    turn: report.turn,
                    event_id: event_id.clone(),
                    choice_id: choice_id.clone(),
                    policy_name: "engine".to_string(),
                    offered: report
                        .traces
                        .iter()
                        .find(|trace| trace.pool_id == POOL_CHOICES)
                        .map_or(1, |trace| trace.candidates.len()),
                    rationale: None,
                });
            }
            run.record(session.catalog(), session.state(), report);
        }
    }

    fn play_manual(
        session: &mut GameSession,
        max_turns: u32,
        policy: &mut dyn PlayerPolicy,
        run: &mut RunLog,
    ) -> Result<()> {
        let mut current = session.begin_manual_turn();
        while session.state().turn <= max_turns {
            let ManualTurn { report, offer } = current;
            run.record(session.catalog(), session.state(), report);
            current = match offer {
                ManualOffer::RunOver => break,
                ManualOffer::TimePasses => session
                    .time_passes()
                    .context("time could not pass in an active run")?,
                ManualOffer::Candidates(candidates) => {
                    run.offer_sizes.push(candidates.len());
                    let PolicyDecision {
                        candidate_index,
                        rationale,
                    } = policy.pick(session.state(), &candidates);
                    let picked = &candidates[candidate_index.min(candidates.len() - 1)];
                    run.decisions.push(DecisionRecord {
                        turn: session.state().turn,
                        event_id: picked.parent.id.clone(),
                        choice_id: picked.choice.id.clone().unwrap_or_default(),
                        policy_name: policy.name().to_string(),
                        offered: candidates.len(),
                        rationale,
                    });
                    let resolved = session
                        .choose(picked.id)
                        .with_context(|| format!("candidate {} was rejected", picked.id))?;
                    run.record(session.catalog(), session.state(), resolved);
                    if session.lifecycle() != Lifecycle::Active {
                        break;
                    }
                    session.begin_manual_turn()
                }
            };
        }
        Ok(())
    }
}

#[derive(Default)]
struct RunLog {
    reports: Vec<TurnReport>,
    decisions: Vec<DecisionRecord>,
    offer_sizes: Vec<usize>,
    events_seen: BTreeSet<String>,
    tag_violations: Vec<String>,
}

impl RunLog {
    fn record(&mut self, catalog: &Catalog, state: &PlayerState, report: TurnReport) {
        if let Some(event_id) = &report.event_id {
            self.events_seen.insert(event_id.clone());
        }
        self.tag_violations.extend(tag_violations(catalog, state));
        self.reports.push(report);
    }
}

/// Held tag pairs that the catalog declares mutually exclusive.
#[must_use]
pub fn tag_violations(catalog: &Catalog, state: &PlayerState) -> Vec<String> {
    let resolver = catalog.tag_resolver();
    let mut found = Vec::new();
    for (idx, tag) in state.tags.iter().enumerate() {
        for other in &state.tags[idx + 1..] {
            if resolver.are_exclusive(tag, other) {
                found.push(format!("turn {}: {tag} + {other}", state.turn));
            }
        }
    }
    found
}
