//! Run lifecycle: starting a run, termination thresholds, death and endings.

use log::{info, warn};

use crate::achievements::evaluate_achievements;
use crate::config::Thresholds;
use crate::constants::{LOG_ENDING_GENERIC, LOG_ENDING_PREFIX, LOG_RUN_RESET};
use crate::outcome::{ApplyContext, apply_outcomes};
use crate::state::{DeathCause, Lifecycle, LogKind, PlayerState, TalentRef};
use crate::template;

/// Start a fresh run with the chosen talents applied in order.
///
/// Custom stats are seeded from the catalog; unknown talent ids are skipped.
pub fn start_run<S: AsRef<str>>(
    talent_ids: &[S],
    log_capacity: usize,
    ctx: &mut ApplyContext<'_>,
) -> PlayerState {
    let catalog = ctx.catalog;
    let mut state = PlayerState::new(log_capacity);
    for stat in catalog.custom_stats() {
        state.custom_stats.insert(stat.id.clone(), stat.initial);
    }
    state.push_log(LogKind::System, None, LOG_RUN_RESET);

    let talents: Vec<_> = talent_ids
        .iter()
        .filter_map(|id| {
            let id = id.as_ref();
            let talent = catalog.talent(id);
            if talent.is_none() {
                warn!("ignoring unknown talent `{id}`");
            }
            talent
        })
        .collect();
    let names: Vec<&str> = talents.iter().map(|talent| talent.name.as_str()).collect();
    let line = if names.is_empty() {
        "You step into the rabbit hole with nothing but yourself.".to_string()
    } else {
        format!("You step into the rabbit hole carrying: {}.", names.join(", "))
    };
    state.push_log(LogKind::System, None, line);

    for talent in talents {
        state.talents.push(TalentRef {
            id: talent.id.clone(),
            name: talent.name.clone(),
        });
        apply_outcomes(&talent.effects, &mut state, ctx);
    }
    state
}

/// First breached threshold, checked as health, sanity, debt, fame, anonymity, age.
#[must_use]
pub fn check_termination(state: &PlayerState, thresholds: &Thresholds) -> Option<DeathCause> {
    let stats = &state.stats;
    if stats.health <= 0.0 {
        Some(DeathCause::Health)
    } else if stats.sanity <= 0.0 {
        Some(DeathCause::Sanity)
    } else if stats.money < thresholds.debt_floor {
        Some(DeathCause::Debt)
    } else if stats.fame > thresholds.fame_ceiling {
        Some(DeathCause::Fame)
    } else if stats.anonymity < 0.0 {
        Some(DeathCause::Anonymity)
    } else if stats.age > thresholds.max_age {
        Some(DeathCause::OldAge)
    } else {
        None
    }
}

/// End an active run with `cause`. Returns false when the run was not active.
pub fn die(state: &mut PlayerState, cause: DeathCause, ctx: &mut ApplyContext<'_>) -> bool {
    if state.lifecycle() != Lifecycle::Active {
        return false;
    }
    state.is_alive = false;
    state.death_reason = Some(cause.key().to_string());
    state.push_log(
        LogKind::Ending,
        None,
        format!("{LOG_ENDING_PREFIX} {}", cause.message()),
    );
    info!("run over on turn {}: {}", state.turn, cause.key());
    evaluate_achievements(ctx.catalog, state, ctx.achievements);
    true
}

/// Check thresholds and end the run on the first breach.
pub fn enforce_termination(
    state: &mut PlayerState,
    thresholds: &Thresholds,
    ctx: &mut ApplyContext<'_>,
) -> Option<DeathCause> {
    if state.lifecycle() != Lifecycle::Active {
        return None;
    }
    let cause = check_termination(state, thresholds)?;
    die(state, cause, ctx);
    Some(cause)
}

/// Finalize the run with an authored ending.
///
/// Active runs end with the ending id as their reason; dead runs keep their
/// death reason. Already-ended runs are left untouched and yield `false`.
pub fn trigger_ending(state: &mut PlayerState, ending_id: &str, ctx: &mut ApplyContext<'_>) -> bool {
    match state.lifecycle() {
        Lifecycle::Ended => return false,
        Lifecycle::Active => {
            state.is_alive = false;
            state.death_reason = Some(ending_id.to_string());
        }
        Lifecycle::Dead => {
            if state.death_reason.is_none() {
                state.death_reason = Some(ending_id.to_string());
            }
        }
    }
    state.ending_triggered = true;

    let catalog = ctx.catalog;
    match catalog.ending(ending_id) {
        Some(ending) => {
            let title = template::render(&ending.title, state, &mut *ctx.rng);
            let text = template::render(&ending.text, state, &mut *ctx.rng);
            let title = (!title.is_empty()).then_some(title);
            state.push_log(LogKind::Ending, title, format!("{LOG_ENDING_PREFIX} {text}"));
        }
        None => {
            warn!("ending `{ending_id}` is not in the catalog; closing the run generically");
            state.push_log(
                LogKind::Ending,
                None,
                format!("{LOG_ENDING_PREFIX} {LOG_ENDING_GENERIC}"),
            );
        }
    }
    info!("ending `{ending_id}` reached on turn {}", state.turn);
    evaluate_achievements(catalog, state, ctx.achievements);
    true
}
