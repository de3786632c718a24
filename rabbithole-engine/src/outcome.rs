//! Outcome applicator: the only code path that mutates player state on behalf of content.
//!
//! Directives run strictly in list order and never roll back. Unknown directive
//! types, unknown stat names and malformed params are skipped.

use std::collections::BTreeMap;

use log::debug;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::achievements::AchievementSink;
use crate::catalog::Catalog;
use crate::constants::DEFAULT_STATUS_DURATION;
use crate::lifecycle;
use crate::numbers::round_half_up;
use crate::state::{EventModifier, PlayerState, StatusEffectInstance, VariableValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatValue {
    pub stat: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParams {
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTagParams {
    pub tag: String,
    /// Drop held tags this one conflicts with instead of being blocked by them.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagParams {
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStatusParams {
    #[serde(alias = "effectId", alias = "statusId")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusParams {
    #[serde(alias = "effectId", alias = "statusId")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParams {
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagProbabilityParams {
    pub tag: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWeightParams {
    pub event_id: String,
    pub multiplier: f64,
    pub duration: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingParams {
    pub ending_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementParams {
    pub achievement_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVariableParams {
    pub key: String,
    pub value: VariableValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeVariableParams {
    pub key: String,
    pub delta: f64,
}

/// Closed set of outcome kinds plus a catch-all that is skipped on apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum OutcomeDirective {
    /// Stat name -> raw delta, scaled by the stat's multiplier and rounded.
    ChangeStat(BTreeMap<String, f64>),
    AddMultiplier(StatValue),
    SetStat(StatValue),
    AddItem(ItemParams),
    RemoveItem(ItemParams),
    AddTag(AddTagParams),
    RemoveTag(TagParams),
    AddStatus(AddStatusParams),
    RemoveStatus(StatusParams),
    UnlockEvent(EventParams),
    ResetEvent(EventParams),
    ModifyTagProbability(TagProbabilityParams),
    ModifyEventWeight(EventWeightParams),
    TriggerEnding(EndingParams),
    UnlockAchievement(AchievementParams),
    SetVariable(SetVariableParams),
    ChangeVariable(ChangeVariableParams),
    Unknown(Value),
}

impl OutcomeDirective {
    #[must_use]
    pub const fn type_name(&self) -> Option<&'static str> {
        let name = match self {
            Self::ChangeStat(_) => "change_stat",
            Self::AddMultiplier(_) => "add_multiplier",
            Self::SetStat(_) => "set_stat",
            Self::AddItem(_) => "add_item",
            Self::RemoveItem(_) => "remove_item",
            Self::AddTag(_) => "add_tag",
            Self::RemoveTag(_) => "remove_tag",
            Self::AddStatus(_) => "add_status",
            Self::RemoveStatus(_) => "remove_status",
            Self::UnlockEvent(_) => "unlock_event",
            Self::ResetEvent(_) => "reset_event",
            Self::ModifyTagProbability(_) => "modify_tag_probability",
            Self::ModifyEventWeight(_) => "modify_event_weight",
            Self::TriggerEnding(_) => "trigger_ending",
            Self::UnlockAchievement(_) => "unlock_achievement",
            Self::SetVariable(_) => "set_variable",
            Self::ChangeVariable(_) => "change_variable",
            Self::Unknown(_) => return None,
        };
        Some(name)
    }

    fn params_value(&self) -> Value {
        let params = match self {
            Self::ChangeStat(deltas) => serde_json::to_value(deltas),
            Self::AddMultiplier(params) | Self::SetStat(params) => serde_json::to_value(params),
            Self::AddItem(params) | Self::RemoveItem(params) => serde_json::to_value(params),
            Self::AddTag(params) => serde_json::to_value(params),
            Self::RemoveTag(params) => serde_json::to_value(params),
            Self::AddStatus(params) => serde_json::to_value(params),
            Self::RemoveStatus(params) => serde_json::to_value(params),
            Self::UnlockEvent(params) | Self::ResetEvent(params) => serde_json::to_value(params),
            Self::ModifyTagProbability(params) => serde_json::to_value(params),
            Self::ModifyEventWeight(params) => serde_json::to_value(params),
            Self::TriggerEnding(params) => serde_json::to_value(params),
            Self::UnlockAchievement(params) => serde_json::to_value(params),
            Self::SetVariable(params) => serde_json::to_value(params),
            Self::ChangeVariable(params) => serde_json::to_value(params),
            Self::Unknown(raw) => return raw.clone(),
        };
        params.unwrap_or(Value::Null)
    }
}

impl From<Value> for OutcomeDirective {
    fn from(raw: Value) -> Self {
        let Some(kind) = raw.get("type").and_then(Value::as_str) else {
            return Self::Unknown(raw);
        };
        let Some(params) = raw.get("params").filter(|params| !params.is_null()) else {
            return Self::Unknown(raw);
        };
        let params = params.clone();
        let parsed = match kind {
            "change_stat" => serde_json::from_value(params).map(Self::ChangeStat),
            "add_multiplier" => serde_json::from_value(params).map(Self::AddMultiplier),
            "set_stat" => serde_json::from_value(params).map(Self::SetStat),
            "add_item" => serde_json::from_value(params).map(Self::AddItem),
            "remove_item" => serde_json::from_value(params).map(Self::RemoveItem),
            "add_tag" => serde_json::from_value(params).map(Self::AddTag),
            "remove_tag" => serde_json::from_value(params).map(Self::RemoveTag),
            "add_status" => serde_json::from_value(params).map(Self::AddStatus),
            "remove_status" => serde_json::from_value(params).map(Self::RemoveStatus),
            "unlock_event" | "unlocksEvent" => {
                serde_json::from_value(params).map(Self::UnlockEvent)
            }
            "reset_event" => serde_json::from_value(params).map(Self::ResetEvent),
            "modify_tag_probability" => {
                serde_json::from_value(params).map(Self::ModifyTagProbability)
            }
            "modify_event_weight" => serde_json::from_value(params).map(Self::ModifyEventWeight),
            "trigger_ending" => serde_json::from_value(params).map(Self::TriggerEnding),
            "unlock_achievement" => serde_json::from_value(params).map(Self::UnlockAchievement),
            "set_variable" => serde_json::from_value(params).map(Self::SetVariable),
            "change_variable" => serde_json::from_value(params).map(Self::ChangeVariable),
            _ => return Self::Unknown(raw),
        };
        parsed.unwrap_or(Self::Unknown(raw))
    }
}

impl From<OutcomeDirective> for Value {
    fn from(directive: OutcomeDirective) -> Self {
        match directive.type_name() {
            Some(kind) => json!({ "type": kind, "params": directive.params_value() }),
            None => directive.params_value(),
        }
    }
}

/// Collaborators an outcome list may call out to.
pub struct ApplyContext<'a> {
    pub catalog: &'a Catalog,
    pub achievements: &'a mut dyn AchievementSink,
    /// Random source for rendering ending text.
    pub rng: &'a mut dyn RngCore,
}

/// Counts of directives that changed something versus those that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub applied: usize,
    pub skipped: usize,
    /// Status effect ids actually removed, in directive order.
    pub removed_statuses: Vec<String>,
}

/// Apply directives in order. Later directives observe earlier mutations.
pub fn apply_outcomes(
    outcomes: &[OutcomeDirective],
    state: &mut PlayerState,
    ctx: &mut ApplyContext<'_>,
) -> ApplySummary {
    let mut summary = ApplySummary::default();
    for directive in outcomes {
        if apply_directive(directive, state, ctx) {
            summary.applied += 1;
            if let OutcomeDirective::RemoveStatus(params) = directive {
                summary.removed_statuses.push(params.id.clone());
            }
        } else {
            summary.skipped += 1;
        }
    }
    summary
}

fn apply_directive(
    directive: &OutcomeDirective,
    state: &mut PlayerState,
    ctx: &mut ApplyContext<'_>,
) -> bool {
    match directive {
        OutcomeDirective::ChangeStat(deltas) => {
            let mut touched = false;
            for (stat, raw) in deltas {
                let multiplier = current_multiplier(state, stat);
                if let Some(slot) = state.stat_mut(stat) {
                    *slot += round_half_up(raw * multiplier);
                    touched = true;
                }
            }
            touched
        }
        OutcomeDirective::AddMultiplier(params) => {
            if state.stat(&params.stat).is_none() || params.stat == "turn" {
                return false;
            }
            let next = current_multiplier(state, &params.stat) * params.value;
            state.stat_multipliers.insert(params.stat.clone(), next);
            true
        }
        OutcomeDirective::SetStat(params) => state
            .stat_mut(&params.stat)
            .map(|slot| *slot = params.value)
            .is_some(),
        OutcomeDirective::AddItem(params) => {
            if !state.has_item(&params.item_id) {
                state.inventory.push(params.item_id.clone());
            }
            true
        }
        OutcomeDirective::RemoveItem(params) => {
            match state
                .inventory
                .iter()
                .position(|item| item == &params.item_id)
            {
                Some(idx) => {
                    state.inventory.remove(idx);
                    true
                }
                None => false,
            }
        }
        OutcomeDirective::AddTag(params) => {
            if params.replace {
                let resolver = ctx.catalog.tag_resolver();
                state
                    .tags
                    .retain(|held| !resolver.are_exclusive(&params.tag, held));
            }
            if !state.has_tag(&params.tag) {
                state.tags.push(params.tag.clone());
            }
            true
        }
        OutcomeDirective::RemoveTag(params) => {
            let before = state.tags.len();
            state.tags.retain(|held| held != &params.tag);
            state.tags.len() != before
        }
        OutcomeDirective::AddStatus(params) => {
            if !state.has_status(&params.id) {
                let duration = params
                    .duration
                    .or_else(|| {
                        ctx.catalog
                            .status_effect(&params.id)
                            .and_then(|def| def.duration)
                    })
                    .unwrap_or(DEFAULT_STATUS_DURATION);
                state.status_effects.push(StatusEffectInstance {
                    effect_id: params.id.clone(),
                    remaining_duration: duration,
                });
            }
            true
        }
        OutcomeDirective::RemoveStatus(params) => {
            let before = state.status_effects.len();
            state
                .status_effects
                .retain(|effect| effect.effect_id != params.id);
            state.status_effects.len() != before
        }
        OutcomeDirective::UnlockEvent(params) => {
            state.unlocked_event_ids.insert(params.event_id.clone());
            true
        }
        OutcomeDirective::ResetEvent(params) => {
            state.triggered_event_ids.remove(&params.event_id);
            true
        }
        OutcomeDirective::ModifyTagProbability(params) => {
            let entry = state
                .tag_probability_modifiers
                .entry(params.tag.clone())
                .or_insert(1.0);
            *entry *= params.multiplier;
            true
        }
        OutcomeDirective::ModifyEventWeight(params) => {
            state.event_modifiers.push(EventModifier {
                event_id: params.event_id.clone(),
                multiplier: params.multiplier,
                remaining_duration: params.duration,
            });
            true
        }
        OutcomeDirective::TriggerEnding(params) => {
            lifecycle::trigger_ending(state, &params.ending_id, ctx)
        }
        OutcomeDirective::UnlockAchievement(params) => {
            ctx.achievements.unlock_achievement(&params.achievement_id);
            true
        }
        OutcomeDirective::SetVariable(params) => {
            state
                .variables
                .insert(params.key.clone(), params.value.clone());
            true
        }
        OutcomeDirective::ChangeVariable(params) => {
            let current = state
                .variable(&params.key)
                .map(VariableValue::as_number)
                .filter(|value| !value.is_nan())
                .unwrap_or(0.0);
            state.variables.insert(
                params.key.clone(),
                VariableValue::Number(current + params.delta),
            );
            true
        }
        OutcomeDirective::Unknown(raw) => {
            debug!("skipping unrecognized outcome directive: {raw}");
            false
        }
    }
}

// A zero multiplier is treated as unset, matching the authored content's expectations.
fn current_multiplier(state: &PlayerState, stat: &str) -> f64 {
    state
        .stat_multipliers
        .get(stat)
        .copied()
        .filter(|value| *value != 0.0 && !value.is_nan())
        .unwrap_or(1.0)
}
