//! Per-turn status effect scheduling: the debt rule, effect ticks and timed event modifiers.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{DEBT_STATUS_DURATION, DEBT_STATUS_ID, LOG_DEBT_CLEARED, LOG_DEBT_ENTERED};
use crate::outcome::{ApplyContext, apply_outcomes};
use crate::state::{LogKind, PlayerState, StatusEffectInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtTransition {
    Entered,
    Cleared,
}

/// Add `in_debt` when money turns negative, remove it once money recovers.
pub fn debt_transition(state: &mut PlayerState) -> Option<DebtTransition> {
    let in_debt = state.has_status(DEBT_STATUS_ID);
    if state.stats.money < 0.0 && !in_debt {
        state.status_effects.push(StatusEffectInstance {
            effect_id: DEBT_STATUS_ID.to_string(),
            remaining_duration: DEBT_STATUS_DURATION,
        });
        state.push_log(LogKind::Feedback, None, LOG_DEBT_ENTERED);
        Some(DebtTransition::Entered)
    } else if state.stats.money >= 0.0 && in_debt {
        state
            .status_effects
            .retain(|effect| effect.effect_id != DEBT_STATUS_ID);
        state.push_log(LogKind::Feedback, None, LOG_DEBT_CLEARED);
        Some(DebtTransition::Cleared)
    } else {
        None
    }
}

/// What one status phase did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTick {
    pub debt: Option<DebtTransition>,
    /// Effects whose outcomes ran this turn.
    pub ticked: Vec<String>,
    pub expired: Vec<String>,
}

/// Run every active effect's per-turn outcomes, then decrement durations.
///
/// Only effects active when the tick starts are decremented; effects added by
/// another effect's outcomes keep their full duration until the next turn. An
/// effect removed by an earlier effect's outcomes does not fire, and a copy
/// re-added under the same id counts as new.
pub fn tick_status_effects(state: &mut PlayerState, ctx: &mut ApplyContext<'_>) -> StatusTick {
    let debt = debt_transition(state);
    let active: Vec<String> = state
        .status_effects
        .iter()
        .map(|effect| effect.effect_id.clone())
        .collect();

    let catalog = ctx.catalog;
    let mut removed: Vec<String> = Vec::new();
    let mut ticked = Vec::with_capacity(active.len());
    for id in &active {
        if removed.contains(id) || !state.has_status(id) {
            debug!("status effect `{id}` was removed earlier this tick");
            continue;
        }
        match catalog.status_effect(id) {
            Some(def) => {
                let summary = apply_outcomes(&def.outcomes, state, ctx);
                removed.extend(summary.removed_statuses);
                ticked.push(id.clone());
            }
            None => debug!("status effect `{id}` has no definition; only its duration runs"),
        }
    }

    for effect in &mut state.status_effects {
        if active.contains(&effect.effect_id) && !removed.contains(&effect.effect_id) {
            effect.remaining_duration = effect.remaining_duration.saturating_sub(1);
        }
    }
    let mut expired = Vec::new();
    state.status_effects.retain(|effect| {
        let keep = effect.remaining_duration > 0;
        if !keep {
            expired.push(effect.effect_id.clone());
        }
        keep
    });

    StatusTick {
        debt,
        ticked,
        expired,
    }
}

/// Decrement timed event-weight modifiers and drop the exhausted ones.
pub fn tick_event_modifiers(state: &mut PlayerState) -> usize {
    for modifier in &mut state.event_modifiers {
        modifier.remaining_duration = modifier.remaining_duration.saturating_sub(1);
    }
    let before = state.event_modifiers.len();
    state
        .event_modifiers
        .retain(|modifier| modifier.remaining_duration > 0);
    before - state.event_modifiers.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::AchievementLedger;
    use crate::catalog::Catalog;
    use crate::content::BaseContent;
    use crate::state::EventModifier;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use serde_json::json;

    fn catalog() -> Catalog {
        let base: BaseContent = serde_json::from_value(json!({
            "statusEffects": {
                "in_debt": { "name": "In Debt", "outcomes": [
                    { "type": "change_stat", "params": { "sanity": -2 } }
                ] },
                "flu": { "name": "Flu", "outcomes": [
                    { "type": "change_stat", "params": { "health": -5 } }
                ] },
                "contagion": { "name": "Contagion", "outcomes": [
                    { "type": "add_status", "params": { "id": "flu", "duration": 2 } }
                ] },
                "cure": { "name": "Cure", "outcomes": [
                    { "type": "remove_status", "params": { "id": "flu" } }
                ] },
                "relapse": { "name": "Relapse", "outcomes": [
                    { "type": "remove_status", "params": { "id": "flu" } },
                    { "type": "add_status", "params": { "id": "flu", "duration": 3 } }
                ] }
            }
        }))
        .unwrap();
        Catalog::assemble(base, Vec::new())
    }

    fn tick(state: &mut PlayerState) -> StatusTick {
        let catalog = catalog();
        let mut ledger = AchievementLedger::new(&catalog);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let mut ctx = ApplyContext {
            catalog: &catalog,
            achievements: &mut ledger,
            rng: &mut rng,
        };
        tick_status_effects(state, &mut ctx)
    }

    #[test]
    fn negative_money_enters_debt_and_ticks_the_same_turn() {
        let mut state = PlayerState::default();
        state.stats.money = -10.0;
        let report = tick(&mut state);
        assert_eq!(report.debt, Some(DebtTransition::Entered));
        assert!(state.has_status(DEBT_STATUS_ID));
        assert_eq!(state.status_effects[0].remaining_duration, DEBT_STATUS_DURATION - 1);
        assert!((state.stats.sanity - 98.0).abs() < f64::EPSILON);
        let last = state.log.back().unwrap();
        assert_eq!(last.kind, LogKind::Feedback);
        assert_eq!(last.text, LOG_DEBT_ENTERED);
    }

    #[test]
    fn repaying_clears_debt() {
        let mut state = PlayerState::default();
        state.stats.money = -10.0;
        tick(&mut state);
        state.stats.money = 0.0;
        let report = tick(&mut state);
        assert_eq!(report.debt, Some(DebtTransition::Cleared));
        assert!(!state.has_status(DEBT_STATUS_ID));
        assert_eq!(state.log.back().unwrap().text, LOG_DEBT_CLEARED);
        assert_eq!(tick(&mut state).debt, None);
    }

    #[test]
    fn effects_apply_then_expire() {
        let mut state = PlayerState::default();
        state.status_effects.push(StatusEffectInstance {
            effect_id: "flu".into(),
            remaining_duration: 2,
        });
        tick(&mut state);
        assert!((state.stats.health - 95.0).abs() < f64::EPSILON);
        let report = tick(&mut state);
        assert!((state.stats.health - 90.0).abs() < f64::EPSILON);
        assert_eq!(report.expired, vec!["flu".to_string()]);
        assert!(state.status_effects.is_empty());
    }

    #[test]
    fn effects_added_mid_tick_keep_full_duration() {
        let mut state = PlayerState::default();
        state.status_effects.push(StatusEffectInstance {
            effect_id: "contagion".into(),
            remaining_duration: 1,
        });
        let report = tick(&mut state);
        assert_eq!(report.expired, vec!["contagion".to_string()]);
        assert_eq!(state.status_effects.len(), 1);
        assert_eq!(state.status_effects[0].effect_id, "flu");
        assert_eq!(state.status_effects[0].remaining_duration, 2);
        assert!((state.stats.health - 100.0).abs() < f64::EPSILON);
    }

    fn afflicted(first: &str) -> PlayerState {
        let mut state = PlayerState::default();
        for id in [first, "flu"] {
            state.status_effects.push(StatusEffectInstance {
                effect_id: id.into(),
                remaining_duration: 2,
            });
        }
        state
    }

    #[test]
    fn effects_removed_earlier_in_the_tick_do_not_fire() {
        let mut state = afflicted("cure");
        let report = tick(&mut state);
        assert_eq!(report.ticked, vec!["cure".to_string()]);
        assert!(!state.has_status("flu"));
        assert!((state.stats.health - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn effects_re_added_mid_tick_start_fresh() {
        let mut state = afflicted("relapse");
        let report = tick(&mut state);
        assert_eq!(report.ticked, vec!["relapse".to_string()]);
        assert!((state.stats.health - 100.0).abs() < f64::EPSILON);
        let flu = state
            .status_effects
            .iter()
            .find(|effect| effect.effect_id == "flu")
            .unwrap();
        assert_eq!(flu.remaining_duration, 3);
        assert_eq!(state.status_effects[0].remaining_duration, 1);
    }

    #[test]
    fn undefined_effects_only_count_down() {
        let mut state = PlayerState::default();
        state.status_effects.push(StatusEffectInstance {
            effect_id: "mystery".into(),
            remaining_duration: 1,
        });
        let report = tick(&mut state);
        assert!(report.ticked.is_empty());
        assert_eq!(report.expired, vec!["mystery".to_string()]);
    }

    #[test]
    fn event_modifiers_count_down() {
        let mut state = PlayerState::default();
        for duration in [1, 3] {
            state.event_modifiers.push(EventModifier {
                event_id: "party".into(),
                multiplier: 2.0,
                remaining_duration: duration,
            });
        }
        assert_eq!(tick_event_modifiers(&mut state), 1);
        assert_eq!(state.event_modifiers.len(), 1);
        assert_eq!(state.event_modifiers[0].remaining_duration, 2);
    }
}
