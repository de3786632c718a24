//! Rabbithole Engine
//!
//! Platform-agnostic core of a content-driven, turn-based narrative life
//! simulation. Authored JSON content (events, choices, outcomes, status
//! effects, talents, endings, achievements) is assembled into a shared
//! [`Catalog`]; a [`GameSession`] plays one run against it deterministically.

pub mod achievements;
pub mod catalog;
pub mod choice;
pub mod condition;
pub mod config;
pub mod constants;
pub mod content;
pub mod error;
pub mod lifecycle;
pub mod numbers;
pub mod outcome;
pub mod rng;
pub mod selection;
pub mod session;
pub mod state;
pub mod status;
pub mod tags;
pub mod template;
pub mod turn;

use std::sync::Arc;

pub use achievements::{AchievementLedger, AchievementSink, evaluate_achievements};
pub use catalog::{Catalog, PackImport, SkippedPack, import_packs};
pub use condition::{CompareOp, Condition, evaluate, evaluate_all};
pub use config::{AgingConfig, EngineConfig, Thresholds};
pub use content::{
    AchievementDefinition, BaseContent, ChoiceDefinition, ContentPack, CustomStatDefinition,
    EndingDefinition, EventDefinition, ResultBucket, StatusEffectDefinition, TalentDefinition,
};
pub use error::{ConfigError, ContentError, EngineError};
pub use outcome::{ApplyContext, ApplySummary, OutcomeDirective, apply_outcomes};
pub use rng::{DrawCounts, RngBundle};
pub use selection::{DecisionTrace, ManualCandidate, ParentEvent, WeightedCandidate};
pub use session::GameSession;
pub use state::{
    DeathCause, EventModifier, Lifecycle, LogEntry, LogKind, PlayerState, Stats,
    StatusEffectInstance, TalentRef, VariableValue, Worldview,
};
pub use status::DebtTransition;
pub use tags::{TagConflictResolver, TagMetadata};
pub use turn::{ManualOffer, ManualTurn, TurnReport};

/// Source of authored content. Hosts decide where the JSON lives.
pub trait ContentLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the base content shipped with the game.
    ///
    /// # Errors
    ///
    /// Returns an error if the base content cannot be read or parsed.
    fn load_base_content(&self) -> Result<BaseContent, Self::Error>;

    /// Load the content packs the player has enabled, in merge order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pack list cannot be produced. Individual
    /// malformed packs should be skipped with [`import_packs`] instead.
    fn load_packs(&self) -> Result<Vec<ContentPack>, Self::Error>;

    /// Load engine tuning. Defaults to [`EngineConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns an error if a configured source exists but cannot be parsed.
    fn load_config(&self) -> Result<EngineConfig, Self::Error> {
        Ok(EngineConfig::default())
    }
}

/// Save slot storage for player states.
pub trait SaveStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a state under `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    fn save_state(&self, slot: &str, state: &PlayerState) -> Result<(), Self::Error>;

    /// Load the state stored under `slot`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn load_state(&self, slot: &str) -> Result<Option<PlayerState>, Self::Error>;

    /// Delete the state stored under `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be deleted.
    fn delete_save(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Owns the assembled catalog and hands out sessions and saves.
pub struct GameEngine<L, S>
where
    L: ContentLoader,
    S: SaveStorage,
{
    loader: L,
    storage: S,
    catalog: Arc<Catalog>,
    config: EngineConfig,
}

impl<L, S> GameEngine<L, S>
where
    L: ContentLoader,
    S: SaveStorage,
{
    /// Load content and configuration once and assemble the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if base content, packs or configuration cannot be loaded.
    pub fn new(loader: L, storage: S) -> Result<Self, L::Error> {
        let base = loader.load_base_content()?;
        let packs = loader.load_packs()?;
        let config = loader.load_config()?.with_env_overrides();
        let catalog = Arc::new(Catalog::assemble(base, packs));
        Ok(Self {
            loader,
            storage,
            catalog,
            config,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    /// Start a new run with a fresh achievement ledger.
    #[must_use]
    pub fn create_session<T: AsRef<str>>(&self, seed: u64, talents: &[T]) -> GameSession {
        GameSession::with_ledger(self.catalog(), self.config.clone(), seed, talents)
    }

    /// Start a new run and return only its initial state.
    #[must_use]
    pub fn create_game<T: AsRef<str>>(&self, seed: u64, talents: &[T]) -> PlayerState {
        self.create_session(seed, talents).into_state()
    }

    /// Save a player state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    pub fn save_game(&self, slot: &str, state: &PlayerState) -> Result<(), S::Error> {
        self.storage.save_state(slot, state)
    }

    /// Load a player state and backfill custom stats added since it was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    pub fn load_game(&self, slot: &str) -> Result<Option<PlayerState>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let Some(mut state) = self.storage.load_state(slot).map_err(Into::into)? else {
            return Ok(None);
        };
        for stat in self.catalog.custom_stats() {
            state
                .custom_stats
                .entry(stat.id.clone())
                .or_insert(stat.initial);
        }
        Ok(Some(state))
    }

    /// Resume a saved run as a session.
    ///
    /// The streams are seeded from `seed` and the saved turn (see
    /// [`RngBundle::resume_seed`]), so play continues rather than replaying the
    /// draws made before the save.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    pub fn resume_session(&self, slot: &str, seed: u64) -> Result<Option<GameSession>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        Ok(self.load_game(slot)?.map(|state| {
            let ledger = AchievementLedger::new(&self.catalog);
            let seed = RngBundle::resume_seed(seed, state.turn);
            GameSession::from_state(self.catalog(), self.config.clone(), seed, ledger, state)
        }))
    }

    /// Delete a save slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be deleted.
    pub fn delete_game(&self, slot: &str) -> Result<(), S::Error> {
        self.storage.delete_save(slot)
    }
}
