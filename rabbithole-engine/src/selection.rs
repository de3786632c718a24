//! Event selection: eligibility filters, weighting, weighted draws and manual-mode candidates.

use log::debug;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

use crate::catalog::Catalog;
use crate::condition::evaluate_all;
use crate::config::EngineConfig;
use crate::constants::{
    MANUAL_BASE_WEIGHT, MANUAL_MIN_WEIGHT, META_TAG, MIN_EVENT_WEIGHT, POOL_EVENTS, POOL_MANUAL,
    TEST_TAG,
};
use crate::content::{ChoiceDefinition, EventDefinition};
use crate::numbers::{f64_to_index, usize_to_f64};
use crate::state::PlayerState;

/// Multiplier applied on top of a candidate's base weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightFactor {
    pub label: String,
    pub value: f64,
}

/// Candidate weight telemetry captured during a draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCandidate {
    pub id: String,
    pub base_weight: f64,
    /// Multipliers applied in order.
    pub multipliers: Vec<WeightFactor>,
    pub final_weight: f64,
}

/// Explainability record for one weighted draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    /// Pool the draw came from (`events`, `choices`, `results`, `manual`).
    pub pool_id: String,
    /// Random target in `0..total_weight`.
    pub roll: f64,
    pub total_weight: f64,
    pub candidates: Vec<WeightedCandidate>,
    pub chosen_id: Option<String>,
}

impl DecisionTrace {
    #[must_use]
    pub fn new(pool_id: &str, candidates: Vec<WeightedCandidate>) -> Self {
        let total_weight = candidates.iter().map(|c| c.final_weight).sum();
        Self {
            pool_id: pool_id.to_string(),
            roll: 0.0,
            total_weight,
            candidates,
            chosen_id: None,
        }
    }

    /// Draw from the recorded candidates, filling in roll and chosen id.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let weights: Vec<f64> = self.candidates.iter().map(|c| c.final_weight).collect();
        let (idx, roll) = choose_weighted(&weights, rng)?;
        self.roll = roll;
        self.chosen_id = self.candidates.get(idx).map(|c| c.id.clone());
        Some(idx)
    }
}

/// Walk `weights` subtracting each from `roll`; the first index where the
/// remainder drops to zero or below wins, falling back to the last index.
#[must_use]
pub fn pick_by_roll(weights: &[f64], roll: f64) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let mut remaining = roll;
    for (idx, weight) in weights.iter().enumerate() {
        remaining -= weight;
        if remaining <= 0.0 {
            return Some(idx);
        }
    }
    Some(weights.len() - 1)
}

/// Weighted draw returning the chosen index and the roll; `None` when the total is not positive.
pub fn choose_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<(usize, f64)> {
    let total: f64 = weights.iter().sum();
    if total.is_nan() || total <= 0.0 {
        return None;
    }
    let roll = rng.r#gen::<f64>() * total;
    pick_by_roll(weights, roll).map(|idx| (idx, roll))
}

/// Filters shared by autonomous and manual selection.
#[must_use]
pub fn is_event_eligible(
    event: &EventDefinition,
    state: &PlayerState,
    catalog: &Catalog,
    show_test_events: bool,
) -> bool {
    if event.has_tag(META_TAG) {
        return false;
    }
    if !show_test_events && event.has_tag(TEST_TAG) {
        return false;
    }
    if event.is_unique && state.triggered_event_ids.contains(&event.id) {
        return false;
    }
    if event.requires_unlock && !state.unlocked_event_ids.contains(&event.id) {
        return false;
    }
    if !catalog
        .tag_metadata()
        .permits_event(&event.tags, &state.tags)
    {
        return false;
    }
    evaluate_all(&event.conditions, state)
}

/// Eligible events in catalog order.
#[must_use]
pub fn eligible_events<'c>(
    catalog: &'c Catalog,
    state: &PlayerState,
    show_test_events: bool,
) -> Vec<&'c EventDefinition> {
    catalog
        .events()
        .iter()
        .filter(|event| is_event_eligible(event, state, catalog, show_test_events))
        .collect()
}

/// Weight of one event: `max(0.1, priority)` times tag and timed modifiers, floored at 0.
#[must_use]
pub fn event_weight(event: &EventDefinition, state: &PlayerState) -> WeightedCandidate {
    let base_weight = event.priority().max(MIN_EVENT_WEIGHT);
    let mut multipliers = Vec::new();
    for tag in &event.tags {
        if let Some(value) = state
            .tag_probability_modifiers
            .get(tag)
            .copied()
            .filter(|value| *value != 0.0)
        {
            multipliers.push(WeightFactor {
                label: format!("tag:{tag}"),
                value,
            });
        }
    }
    for modifier in &state.event_modifiers {
        if modifier.event_id == event.id {
            multipliers.push(WeightFactor {
                label: "event_modifier".to_string(),
                value: modifier.multiplier,
            });
        }
    }
    let final_weight = multipliers
        .iter()
        .fold(base_weight, |weight, factor| weight * factor.value)
        .max(0.0);
    WeightedCandidate {
        id: event.id.clone(),
        base_weight,
        multipliers,
        final_weight,
    }
}

/// Outcome of an event draw.
#[derive(Debug, Clone)]
pub struct EventSelection<'c> {
    pub event: Option<&'c EventDefinition>,
    pub trace: DecisionTrace,
}

/// Draw one eligible event, or none when nothing is eligible or every weight is zero.
pub fn pick_event<'c, R: Rng + ?Sized>(
    catalog: &'c Catalog,
    state: &PlayerState,
    show_test_events: bool,
    rng: &mut R,
) -> EventSelection<'c> {
    let pool = eligible_events(catalog, state, show_test_events);
    let candidates = pool.iter().map(|event| event_weight(event, state)).collect();
    let mut trace = DecisionTrace::new(POOL_EVENTS, candidates);
    let event = trace.draw(rng).and_then(|idx| pool.get(idx).copied());
    debug!(
        "event draw: {} eligible, total weight {:.3}, chose {:?}",
        pool.len(),
        trace.total_weight,
        trace.chosen_id
    );
    EventSelection { event, trace }
}

/// Whether a choice passes its conditions and would not add a conflicting tag.
#[must_use]
pub fn is_choice_available(choice: &ChoiceDefinition, state: &PlayerState, catalog: &Catalog) -> bool {
    evaluate_all(&choice.conditions, state)
        && !catalog
            .tag_resolver()
            .choice_introduces_conflict(choice, &state.tags)
}

/// Originating event of a manual candidate, kept as authored templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentEvent {
    pub id: String,
    pub title: String,
    pub text: String,
}

/// A choice offered in manual mode, tagged with a unique id for later resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualCandidate {
    pub id: Uuid,
    pub choice: ChoiceDefinition,
    pub parent: ParentEvent,
}

/// Manual weight: `max(1, 10 + tendency * magnitude)`.
#[must_use]
pub fn manual_weight(choice: &ChoiceDefinition, state: &PlayerState) -> f64 {
    (MANUAL_BASE_WEIGHT + choice.tendency(state) * choice.magnitude()).max(MANUAL_MIN_WEIGHT)
}

/// Build up to `count` manual candidates across all eligible events.
///
/// At most one special choice is included, with `special_choice_chance`;
/// normal choices are drawn without replacement by [`manual_weight`].
pub fn manual_candidates<R: Rng + ?Sized>(
    catalog: &Catalog,
    state: &PlayerState,
    config: &EngineConfig,
    count: usize,
    rng: &mut R,
) -> Vec<ManualCandidate> {
    let mut special: Vec<(&EventDefinition, &ChoiceDefinition)> = Vec::new();
    let mut normal: Vec<(&EventDefinition, &ChoiceDefinition)> = Vec::new();
    for event in eligible_events(catalog, state, config.show_test_events) {
        for choice in &event.choices {
            if !is_choice_available(choice, state, catalog) {
                continue;
            }
            if choice.is_special {
                special.push((event, choice));
            } else {
                normal.push((event, choice));
            }
        }
    }

    let mut picked: Vec<(&EventDefinition, &ChoiceDefinition)> = Vec::new();
    if !special.is_empty() && rng.r#gen::<f64>() < config.special_choice_chance {
        let roll = rng.r#gen::<f64>() * usize_to_f64(special.len());
        if let Some(idx) = f64_to_index(roll, special.len()) {
            picked.push(special[idx]);
        }
    }

    while picked.len() < count && !normal.is_empty() {
        let candidates = normal
            .iter()
            .map(|(_, choice)| WeightedCandidate {
                id: choice.id.clone().unwrap_or_default(),
                base_weight: MANUAL_BASE_WEIGHT,
                multipliers: Vec::new(),
                final_weight: manual_weight(choice, state),
            })
            .collect();
        let mut trace = DecisionTrace::new(POOL_MANUAL, candidates);
        let Some(idx) = trace.draw(rng) else {
            break;
        };
        picked.push(normal.remove(idx));
    }
    debug!(
        "manual candidates: {} special, {} normal left, offering {}",
        special.len(),
        normal.len(),
        picked.len()
    );

    picked
        .into_iter()
        .map(|(event, choice)| ManualCandidate {
            id: candidate_id(rng),
            choice: choice.clone(),
            parent: ParentEvent {
                id: event.id.clone(),
                title: event.title.clone(),
                text: event.text.clone(),
            },
        })
        .collect()
}

fn candidate_id<R: RngCore + ?Sized>(rng: &mut R) -> Uuid {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    Builder::from_random_bytes(bytes).into_uuid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::BaseContent;
    use crate::state::EventModifier;
    use rand::SeedableRng;
    use rand::rngs::mock::StepRng;
    use rand_chacha::ChaCha20Rng;
    use serde_json::json;

    fn catalog(raw: serde_json::Value) -> Catalog {
        let base: BaseContent = serde_json::from_value(raw).unwrap();
        Catalog::assemble(base, Vec::new())
    }

    #[test]
    fn roll_walk_picks_first_non_positive_remainder_and_falls_back_to_last() {
        let weights = [1.0, 3.0];
        assert_eq!(pick_by_roll(&weights, 0.5), Some(0));
        assert_eq!(pick_by_roll(&weights, 1.0), Some(0));
        assert_eq!(pick_by_roll(&weights, 4.0), Some(1));
        assert_eq!(pick_by_roll(&weights, 4.0 + 1e-9), Some(1));
        assert_eq!(pick_by_roll(&[], 1.0), None);
    }

    #[test]
    fn zero_total_weight_selects_nothing() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(choose_weighted(&[0.0, 0.0], &mut rng).is_none());
        assert!(choose_weighted(&[], &mut rng).is_none());
        for _ in 0..50 {
            let (idx, roll) = choose_weighted(&[2.0, 0.0, 5.0], &mut rng).unwrap();
            assert!(idx == 0 || idx == 2);
            assert!((0.0..7.0).contains(&roll));
        }
    }

    #[test]
    fn filters_drop_meta_test_unique_locked_and_gated_events() {
        let catalog = catalog(json!({
            "events": [
                { "id": "meta", "tags": ["meta"] },
                { "id": "test", "tags": ["test"] },
                { "id": "unique", "isUnique": true },
                { "id": "locked", "requiresUnlock": true },
                { "id": "gated", "tags": ["occult"] },
                { "id": "conditional", "conditions": [
                    { "type": "stat_check", "params": { "stat": "money", "operator": ">", "value": 1000 } }
                ] },
                { "id": "open" }
            ],
            "tags": { "gatedEventTags": ["occult"], "tagUnlocks": { "initiate": ["occult"] } }
        }));
        let mut state = PlayerState::default();
        state.triggered_event_ids.insert("unique".into());
        let ids = |state: &PlayerState, show_test| -> Vec<String> {
            eligible_events(&catalog, state, show_test)
                .into_iter()
                .map(|event| event.id.clone())
                .collect()
        };
        assert_eq!(ids(&state, false), vec!["open".to_string()]);
        state.unlocked_event_ids.insert("locked".into());
        state.tags.push("initiate".into());
        state.stats.money = 2000.0;
        assert_eq!(
            ids(&state, true),
            vec!["test", "locked", "gated", "conditional", "open"]
        );
    }

    #[test]
    fn weights_combine_priority_tag_and_timed_modifiers() {
        let event: EventDefinition = serde_json::from_value(json!({
            "id": "party", "priority": 2, "tags": ["social", "night"]
        }))
        .unwrap();
        let mut state = PlayerState::default();
        state.tag_probability_modifiers.insert("social".into(), 1.5);
        for multiplier in [2.0, 0.5] {
            state.event_modifiers.push(EventModifier {
                event_id: "party".into(),
                multiplier,
                remaining_duration: 1,
            });
        }
        let weighted = event_weight(&event, &state);
        assert!((weighted.final_weight - 3.0).abs() < 1e-9);
        assert_eq!(weighted.multipliers.len(), 3);

        let tiny: EventDefinition =
            serde_json::from_value(json!({ "id": "tiny", "priority": 0.01 })).unwrap();
        assert!((event_weight(&tiny, &state).final_weight - 0.1).abs() < 1e-9);
        state.event_modifiers.push(EventModifier {
            event_id: "tiny".into(),
            multiplier: -3.0,
            remaining_duration: 1,
        });
        assert!(event_weight(&tiny, &state).final_weight.abs() < f64::EPSILON);
    }

    #[test]
    fn pick_event_with_max_roll_takes_last_candidate() {
        let catalog = catalog(json!({ "events": [{ "id": "a" }, { "id": "b" }] }));
        let state = PlayerState::default();
        let mut rng = StepRng::new(u64::MAX, 0);
        let selection = pick_event(&catalog, &state, false, &mut rng);
        assert_eq!(selection.event.map(|e| e.id.as_str()), Some("b"));
        assert_eq!(selection.trace.chosen_id.as_deref(), Some("b"));
        assert_eq!(selection.trace.candidates.len(), 2);
    }

    #[test]
    fn manual_candidates_respect_count_special_cap_and_conflicts() {
        let catalog = catalog(json!({
            "events": [
                { "id": "one", "choices": [
                    { "id": "s1", "text": "Special one", "isSpecial": true },
                    { "id": "s2", "text": "Special two", "isSpecial": true },
                    { "id": "n1", "text": "Normal one", "worldview": "logic" }
                ] },
                { "id": "two", "choices": [
                    { "id": "n2", "text": "Normal two" },
                    { "id": "n3", "text": "Normal three" },
                    { "id": "clash", "text": "Clash", "outcomes": [
                        { "type": "add_tag", "params": { "tag": "skeptic" } }
                    ] }
                ] }
            ],
            "tags": { "conflicts": [["believer", "skeptic"]] }
        }));
        let mut state = PlayerState::default();
        state.tags.push("believer".into());
        let config = EngineConfig {
            special_choice_chance: 1.0,
            ..EngineConfig::default()
        };
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        for _ in 0..20 {
            let offered = manual_candidates(&catalog, &state, &config, 3, &mut rng);
            assert_eq!(offered.len(), 3);
            let specials = offered.iter().filter(|c| c.choice.is_special).count();
            assert_eq!(specials, 1);
            assert!(offered.iter().all(|c| c.choice.id.as_deref() != Some("clash")));
            let ids: std::collections::BTreeSet<Uuid> = offered.iter().map(|c| c.id).collect();
            assert_eq!(ids.len(), 3);
        }

        let never_special = EngineConfig {
            special_choice_chance: 0.0,
            ..EngineConfig::default()
        };
        let offered = manual_candidates(&catalog, &state, &never_special, 10, &mut rng);
        assert_eq!(offered.len(), 3);
        assert!(offered.iter().all(|c| !c.choice.is_special));
    }

    #[test]
    fn manual_weight_has_floor_of_one() {
        let mut state = PlayerState::default();
        state.stats.logic = -50.0;
        let choice: ChoiceDefinition =
            serde_json::from_value(json!({ "text": "x", "worldview": "logic" })).unwrap();
        assert!((manual_weight(&choice, &state) - 1.0).abs() < f64::EPSILON);
        state.stats.logic = 5.0;
        assert!((manual_weight(&choice, &state) - 15.0).abs() < f64::EPSILON);
    }
}
