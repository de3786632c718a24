use std::sync::Arc;

use log::debug;
use uuid::Uuid;

use crate::achievements::{AchievementLedger, AchievementSink};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::lifecycle;
use crate::outcome::ApplyContext;
use crate::rng::{DrawCounts, RngBundle};
use crate::selection::ManualCandidate;
use crate::state::{Lifecycle, PlayerState};
use crate::turn::{self, ManualSelection, ManualTurn, TurnEnv, TurnReport};

/// One run bound to a shared catalog, its RNG streams and an achievement sink.
#[derive(Debug, Clone)]
pub struct GameSession<A = AchievementLedger> {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    rng: RngBundle,
    state: PlayerState,
    achievements: A,
    pending: Vec<ManualCandidate>,
}

impl<A: AchievementSink> GameSession<A> {
    /// Start a fresh run with the given talents.
    #[must_use]
    pub fn new<S: AsRef<str>>(
        catalog: Arc<Catalog>,
        config: EngineConfig,
        seed: u64,
        achievements: A,
        talents: &[S],
    ) -> Self {
        let mut session = Self::from_state(
            catalog,
            config,
            seed,
            achievements,
            PlayerState::default(),
        );
        session.reset(talents);
        session
    }

    /// Continue an existing state, e.g. one loaded from a save slot.
    #[must_use]
    pub fn from_state(
        catalog: Arc<Catalog>,
        config: EngineConfig,
        seed: u64,
        achievements: A,
        state: PlayerState,
    ) -> Self {
        Self {
            catalog,
            config,
            rng: RngBundle::from_user_seed(seed),
            state,
            achievements,
            pending: Vec::new(),
        }
    }

    fn parts(&mut self) -> (&mut PlayerState, TurnEnv<'_>, &mut A) {
        let env = TurnEnv {
            catalog: &self.catalog,
            config: &self.config,
            rng: &self.rng,
        };
        (&mut self.state, env, &mut self.achievements)
    }

    /// Replace the run with a fresh one. The RNG streams keep going.
    pub fn reset<S: AsRef<str>>(&mut self, talents: &[S]) {
        self.pending.clear();
        let state = {
            let (_, env, sink) = self.parts();
            let mut text_rng = env.rng.text();
            let mut ctx = ApplyContext {
                catalog: env.catalog,
                achievements: sink,
                rng: &mut *text_rng,
            };
            lifecycle::start_run(talents, env.config.log_capacity, &mut ctx)
        };
        self.state = state;
    }

    /// Play one autonomous turn.
    pub fn run_turn(&mut self) -> TurnReport {
        self.pending.clear();
        let (state, env, sink) = self.parts();
        turn::run_turn(state, env, sink)
    }

    /// Play autonomous turns until the run leaves `Active` or `max_turns` is reached.
    pub fn run_until_over(&mut self, max_turns: u32) -> Vec<TurnReport> {
        let mut reports = Vec::new();
        for _ in 0..max_turns {
            if self.state.lifecycle() != Lifecycle::Active {
                break;
            }
            reports.push(self.run_turn());
        }
        debug!(
            "stopped after {} turns in state {}",
            reports.len(),
            self.state.lifecycle()
        );
        reports
    }

    /// Advance time and offer manual candidates; the offer stays pending until resolved.
    pub fn begin_manual_turn(&mut self) -> ManualTurn {
        let (state, env, sink) = self.parts();
        let turn = turn::begin_manual_turn(state, env, sink);
        self.pending = turn.offer.candidates().to_vec();
        turn
    }

    /// Resolve one of the pending candidates by id.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RunNotActive` when the run is over and
    /// `EngineError::UnknownCandidate` when `id` is not in the pending offer.
    pub fn choose(&mut self, id: Uuid) -> Result<TurnReport, EngineError> {
        let lifecycle = self.state.lifecycle();
        if lifecycle != Lifecycle::Active {
            return Err(EngineError::RunNotActive {
                lifecycle: lifecycle.as_str(),
            });
        }
        let idx = self
            .pending
            .iter()
            .position(|candidate| candidate.id == id)
            .ok_or_else(|| EngineError::UnknownCandidate { id: id.to_string() })?;
        let candidate = self.pending.swap_remove(idx);
        self.pending.clear();
        let (state, env, sink) = self.parts();
        turn::resolve_choice(state, env, sink, ManualSelection::Candidate(&candidate))
    }

    /// Let time pass and open the next manual turn.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RunNotActive` when the run is over.
    pub fn time_passes(&mut self) -> Result<ManualTurn, EngineError> {
        self.pending.clear();
        let (state, env, sink) = self.parts();
        let turn = turn::pass_time(state, env, sink)?;
        self.pending = turn.offer.candidates().to_vec();
        Ok(turn)
    }

    /// Finalize the run with an authored ending; `false` when it had already ended.
    pub fn trigger_ending(&mut self, ending_id: &str) -> bool {
        self.pending.clear();
        let (state, env, sink) = self.parts();
        let mut text_rng = env.rng.text();
        let mut ctx = ApplyContext {
            catalog: env.catalog,
            achievements: sink,
            rng: &mut *text_rng,
        };
        lifecycle::trigger_ending(state, ending_id, &mut ctx)
    }

    /// Deterministically reseed every RNG stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = RngBundle::from_user_seed(seed);
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    #[must_use]
    pub fn draw_counts(&self) -> DrawCounts {
        self.rng.draw_counts()
    }

    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }

    /// Candidates offered by the last manual turn that are still open.
    #[must_use]
    pub fn pending_candidates(&self) -> &[ManualCandidate] {
        &self.pending
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn achievements(&self) -> &A {
        &self.achievements
    }

    #[must_use]
    pub const fn state(&self) -> &PlayerState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut PlayerState {
        &mut self.state
    }

    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut PlayerState) -> R) -> R {
        f(&mut self.state)
    }

    #[must_use]
    pub fn into_state(self) -> PlayerState {
        self.state
    }

    /// Consume the session, returning the state and the achievement sink.
    #[must_use]
    pub fn into_parts(self) -> (PlayerState, A) {
        (self.state, self.achievements)
    }
}

impl GameSession<AchievementLedger> {
    /// Start a run with a fresh ledger built from the catalog.
    #[must_use]
    pub fn with_ledger<S: AsRef<str>>(
        catalog: Arc<Catalog>,
        config: EngineConfig,
        seed: u64,
        talents: &[S],
    ) -> Self {
        let ledger = AchievementLedger::new(&catalog);
        Self::new(catalog, config, seed, ledger, talents)
    }
}
