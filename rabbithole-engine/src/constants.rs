//! Centralized tuning constants and fixed narrative lines for the engine.
//!
//! Values that content authors are expected to tweak live in
//! [`crate::config::EngineConfig`]; everything here changes only through code.

// Reserved identifiers ------------------------------------------------------
/// Status effect attached automatically while money is negative.
pub const DEBT_STATUS_ID: &str = "in_debt";
/// Events carrying this tag never enter the selection pool.
pub const META_TAG: &str = "meta";
/// Events carrying this tag are only eligible when test events are enabled.
pub const TEST_TAG: &str = "test";
/// Identifier of the manual-mode "time passes" pseudo-choice.
pub const TIME_PASSES_ID: &str = "system_time_passes";
/// Environment override for the test-event debug flag.
pub const ENV_SHOW_TEST_EVENTS: &str = "RABBITHOLE_SHOW_TEST_EVENTS";

// Durations -----------------------------------------------------------------
pub(crate) const DEBT_STATUS_DURATION: i32 = 9999;
pub(crate) const DEFAULT_STATUS_DURATION: i32 = 1;

// Selection weights ---------------------------------------------------------
pub(crate) const MIN_EVENT_WEIGHT: f64 = 0.1;
pub(crate) const MIN_CHOICE_SCORE: f64 = 0.1;
pub(crate) const MANUAL_BASE_WEIGHT: f64 = 10.0;
pub(crate) const MANUAL_MIN_WEIGHT: f64 = 1.0;
pub(crate) const DEFAULT_RESULT_WEIGHT: f64 = 1.0;

// Initial stats -------------------------------------------------------------
pub(crate) const INITIAL_HEALTH: f64 = 100.0;
pub(crate) const INITIAL_SANITY: f64 = 100.0;
pub(crate) const INITIAL_MONEY: f64 = 500.0;
pub(crate) const INITIAL_LOGIC: f64 = 10.0;
pub(crate) const INITIAL_IRONY: f64 = 5.0;
pub(crate) const INITIAL_ANONYMITY: f64 = 100.0;

// Trace pools ---------------------------------------------------------------
pub const POOL_EVENTS: &str = "events";
pub const POOL_CHOICES: &str = "choices";
pub const POOL_RESULTS: &str = "results";
pub const POOL_MANUAL: &str = "manual";

// Narrative lines -----------------------------------------------------------
pub(crate) const LOG_RUN_RESET: &str = "...system reset // a new life begins...";
pub(crate) const LOG_DEBT_ENTERED: &str =
    "Your finances take a nosedive. You are now in debt.";
pub(crate) const LOG_DEBT_CLEARED: &str =
    "You pay off every last debt and finally breathe again.";
pub(crate) const LOG_DIRECTIONLESS: &str = "> A wave of confusion: you have no idea where to go.";
pub(crate) const LOG_NOTHING_HAPPENS: &str =
    "You sit with your thoughts. Nothing in particular happens.";
pub(crate) const LOG_TIME_PASSES: &str = "The days drift by uneventfully...";
pub(crate) const LOG_ENDING_PREFIX: &str = "[SIMULATION OVER]";
pub(crate) const LOG_ENDING_GENERIC: &str = "Your story reaches its end.";
pub(crate) const TIME_PASSES_TEXT: &str = "Let time pass";
