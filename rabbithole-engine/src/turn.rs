//! Turn orchestration for autonomous and manual play.
//!
//! A turn advances time first (aging, debt rule, status effects, timed
//! modifiers, termination), then selects and resolves content. Every
//! narrative line lands in the state's log; the returned [`TurnReport`]
//! carries the lines appended during the call plus the decision traces.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::achievements::AchievementSink;
use crate::catalog::Catalog;
use crate::choice::{available_choices, pick_choice, resolve_result};
use crate::config::{AgingConfig, EngineConfig};
use crate::constants::{
    LOG_DIRECTIONLESS, LOG_NOTHING_HAPPENS, LOG_TIME_PASSES, TIME_PASSES_ID, TIME_PASSES_TEXT,
};
use crate::content::ChoiceDefinition;
use crate::error::EngineError;
use crate::lifecycle::enforce_termination;
use crate::outcome::{ApplyContext, apply_outcomes};
use crate::rng::RngBundle;
use crate::selection::{DecisionTrace, ManualCandidate, eligible_events, manual_candidates, pick_event};
use crate::state::{DeathCause, Lifecycle, LogEntry, LogKind, PlayerState};
use crate::status::{DebtTransition, StatusTick, tick_event_modifiers, tick_status_effects};
use crate::template;

/// Shared, read-only inputs of a turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnEnv<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a EngineConfig,
    pub rng: &'a RngBundle,
}

/// What the time-advance phase did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceReport {
    pub status: StatusTick,
    pub modifiers_expired: usize,
    pub death: Option<DeathCause>,
}

/// Summary of one orchestrator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: u32,
    pub lifecycle: Lifecycle,
    pub event_id: Option<String>,
    pub choice_id: Option<String>,
    pub bucket: Option<usize>,
    pub debt: Option<DebtTransition>,
    pub death: Option<DeathCause>,
    pub traces: Vec<DecisionTrace>,
    /// Log lines appended during the call, oldest first.
    pub entries: Vec<LogEntry>,
}

impl TurnReport {
    fn begin(state: &PlayerState) -> (Self, u64) {
        let report = Self {
            turn: state.turn,
            lifecycle: state.lifecycle(),
            event_id: None,
            choice_id: None,
            bucket: None,
            debt: None,
            death: None,
            traces: Vec::new(),
            entries: Vec::new(),
        };
        (report, state.next_log_seq)
    }

    fn finish(mut self, state: &PlayerState, since: u64) -> Self {
        self.turn = state.turn;
        self.lifecycle = state.lifecycle();
        self.entries = state.log_since(since);
        self
    }

    fn absorb(&mut self, advance: &AdvanceReport) {
        self.debt = advance.status.debt;
        self.death = advance.death;
    }
}

/// Advance time by one turn. Does nothing unless the run is active.
pub fn advance_turn(
    state: &mut PlayerState,
    env: TurnEnv<'_>,
    sink: &mut dyn AchievementSink,
) -> AdvanceReport {
    if state.lifecycle() != Lifecycle::Active {
        return AdvanceReport::default();
    }
    state.turn = state.turn.saturating_add(1);
    age_one_turn(state, &env.config.aging);

    let mut text_rng = env.rng.text();
    let mut ctx = ApplyContext {
        catalog: env.catalog,
        achievements: sink,
        rng: &mut *text_rng,
    };
    let status = tick_status_effects(state, &mut ctx);
    let modifiers_expired = tick_event_modifiers(state);
    let death = enforce_termination(state, &env.config.thresholds, &mut ctx);
    AdvanceReport {
        status,
        modifiers_expired,
        death,
    }
}

fn age_one_turn(state: &mut PlayerState, aging: &AgingConfig) {
    let stats = &mut state.stats;
    stats.age += aging.age_per_turn;
    if stats.age > aging.health_decay_age {
        stats.health -= aging.health_decay;
    }
    if stats.age > aging.sanity_decay_age {
        stats.sanity -= aging.sanity_decay;
    }
}

/// One autonomous turn: advance, draw an event, let the simulated player choose.
pub fn run_turn(
    state: &mut PlayerState,
    env: TurnEnv<'_>,
    sink: &mut dyn AchievementSink,
) -> TurnReport {
    let (mut report, since) = TurnReport::begin(state);
    if state.lifecycle() != Lifecycle::Active {
        return report.finish(state, since);
    }
    let advance = advance_turn(state, env, &mut *sink);
    report.absorb(&advance);
    if state.lifecycle() != Lifecycle::Active {
        return report.finish(state, since);
    }

    let selection = {
        let mut rng = env.rng.events();
        pick_event(env.catalog, state, env.config.show_test_events, &mut *rng)
    };
    report.traces.push(selection.trace);
    let Some(event) = selection.event else {
        state.push_log(LogKind::System, None, LOG_NOTHING_HAPPENS);
        return report.finish(state, since);
    };
    report.event_id = Some(event.id.clone());
    log_event(state, &event.title, &event.text, env);
    state.triggered_event_ids.insert(event.id.clone());

    let choices = available_choices(event, state, env.catalog);
    let pick = {
        let mut rng = env.rng.choices();
        pick_choice(&choices, state, env.config.choice_chaos, &mut *rng)
    };
    report.traces.push(pick.trace);
    match pick.choice {
        Some(choice) => resolve_picked(state, choice, env, sink, &mut report),
        None => {
            state.push_log(LogKind::System, None, LOG_DIRECTIONLESS);
        }
    }
    report.finish(state, since)
}

/// What the player may pick at the start of a manual turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "candidates", rename_all = "snake_case")]
pub enum ManualOffer {
    Candidates(Vec<ManualCandidate>),
    /// Nothing to choose; the only option is to let time pass.
    TimePasses,
    /// The run left `Active` while advancing.
    RunOver,
}

impl ManualOffer {
    #[must_use]
    pub fn candidates(&self) -> &[ManualCandidate] {
        match self {
            Self::Candidates(candidates) => candidates,
            Self::TimePasses | Self::RunOver => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualTurn {
    pub report: TurnReport,
    pub offer: ManualOffer,
}

/// The system choice offered when no real choice is available.
#[must_use]
pub fn time_passes_choice() -> ChoiceDefinition {
    ChoiceDefinition {
        id: Some(TIME_PASSES_ID.to_string()),
        text: TIME_PASSES_TEXT.to_string(),
        ..ChoiceDefinition::default()
    }
}

/// Advance time, then gather the candidates for the player to pick from.
pub fn begin_manual_turn(
    state: &mut PlayerState,
    env: TurnEnv<'_>,
    sink: &mut dyn AchievementSink,
) -> ManualTurn {
    let (mut report, since) = TurnReport::begin(state);
    if state.lifecycle() != Lifecycle::Active {
        return ManualTurn {
            report: report.finish(state, since),
            offer: ManualOffer::RunOver,
        };
    }
    let advance = advance_turn(state, env, sink);
    report.absorb(&advance);
    let offer = if state.lifecycle() == Lifecycle::Active {
        gather_offer(state, env)
    } else {
        ManualOffer::RunOver
    };
    ManualTurn {
        report: report.finish(state, since),
        offer,
    }
}

fn gather_offer(state: &mut PlayerState, env: TurnEnv<'_>) -> ManualOffer {
    if eligible_events(env.catalog, state, env.config.show_test_events).is_empty() {
        state.push_log(LogKind::System, None, LOG_NOTHING_HAPPENS);
        return ManualOffer::TimePasses;
    }
    let candidates = {
        let mut rng = env.rng.choices();
        manual_candidates(
            env.catalog,
            state,
            env.config,
            env.config.manual_choice_count,
            &mut *rng,
        )
    };
    if candidates.is_empty() {
        state.push_log(LogKind::System, None, LOG_DIRECTIONLESS);
        ManualOffer::TimePasses
    } else {
        ManualOffer::Candidates(candidates)
    }
}

/// A player's answer to a [`ManualOffer`].
#[derive(Debug, Clone, Copy)]
pub enum ManualSelection<'a> {
    TimePasses,
    Candidate(&'a ManualCandidate),
}

/// Apply the player's selection. Time does not advance here.
///
/// # Errors
///
/// Returns `EngineError::RunNotActive` when the run is dead or ended.
pub fn resolve_choice(
    state: &mut PlayerState,
    env: TurnEnv<'_>,
    sink: &mut dyn AchievementSink,
    selection: ManualSelection<'_>,
) -> Result<TurnReport, EngineError> {
    ensure_active(state)?;
    let (mut report, since) = TurnReport::begin(state);
    match selection {
        ManualSelection::TimePasses => {
            state.push_log(LogKind::System, None, LOG_TIME_PASSES);
        }
        ManualSelection::Candidate(candidate) => {
            let parent = &candidate.parent;
            report.event_id = Some(parent.id.clone());
            log_event(state, &parent.title, &parent.text, env);
            state.triggered_event_ids.insert(parent.id.clone());
            resolve_picked(state, &candidate.choice, env, sink, &mut report);
        }
    }
    Ok(report.finish(state, since))
}

/// Let time pass and open the next manual turn in one step.
///
/// # Errors
///
/// Returns `EngineError::RunNotActive` when the run is dead or ended.
pub fn pass_time(
    state: &mut PlayerState,
    env: TurnEnv<'_>,
    sink: &mut dyn AchievementSink,
) -> Result<ManualTurn, EngineError> {
    let since = state.next_log_seq;
    resolve_choice(state, env, &mut *sink, ManualSelection::TimePasses)?;
    let mut next = begin_manual_turn(state, env, sink);
    next.report.entries = state.log_since(since);
    Ok(next)
}

fn ensure_active(state: &PlayerState) -> Result<(), EngineError> {
    match state.lifecycle() {
        Lifecycle::Active => Ok(()),
        other => Err(EngineError::RunNotActive {
            lifecycle: other.as_str(),
        }),
    }
}

fn log_event(state: &mut PlayerState, title: &str, text: &str, env: TurnEnv<'_>) {
    let mut rng = env.rng.text();
    let title = template::render(title, state, &mut *rng);
    let text = template::render(text, state, &mut *rng);
    state.push_log(LogKind::Event, (!title.is_empty()).then_some(title), text);
}

// Shared tail of autonomous and manual resolution.
fn resolve_picked(
    state: &mut PlayerState,
    choice: &ChoiceDefinition,
    env: TurnEnv<'_>,
    sink: &mut dyn AchievementSink,
    report: &mut TurnReport,
) {
    if let Some(id) = &choice.id {
        state.made_choice_ids.insert(id.clone());
    }
    report.choice_id.clone_from(&choice.id);

    let mut text_rng = env.rng.text();
    let mut ctx = ApplyContext {
        catalog: env.catalog,
        achievements: sink,
        rng: &mut *text_rng,
    };
    let line = template::render(&choice.text, state, &mut *ctx.rng);
    state.push_log(LogKind::Choice, None, format!("> {line}"));

    let resolution = {
        let mut rng = env.rng.results();
        resolve_result(choice, &mut *rng)
    };
    report.bucket = resolution.bucket;
    if let Some(trace) = resolution.trace {
        report.traces.push(trace);
    }
    if let Some(feedback) = resolution.feedback {
        let feedback = template::render(feedback, state, &mut *ctx.rng);
        state.push_log(LogKind::Feedback, None, feedback);
    }
    let summary = apply_outcomes(resolution.outcomes, state, &mut ctx);
    debug!(
        "choice {:?}: {} directives applied, {} skipped",
        choice.id, summary.applied, summary.skipped
    );
    if let Some(cause) = enforce_termination(state, &env.config.thresholds, &mut ctx) {
        report.death = Some(cause);
    }
}
