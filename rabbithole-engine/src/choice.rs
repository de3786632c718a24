//! Choice resolution: autonomous scoring and weighted result buckets.

use log::debug;
use rand::Rng;

use crate::catalog::Catalog;
use crate::constants::{MIN_CHOICE_SCORE, POOL_CHOICES, POOL_RESULTS};
use crate::content::{ChoiceDefinition, EventDefinition};
use crate::outcome::OutcomeDirective;
use crate::selection::{DecisionTrace, WeightFactor, WeightedCandidate, is_choice_available};
use crate::state::PlayerState;

/// Choices of `event` that pass their conditions and introduce no tag conflict.
#[must_use]
pub fn available_choices<'e>(
    event: &'e EventDefinition,
    state: &PlayerState,
    catalog: &Catalog,
) -> Vec<&'e ChoiceDefinition> {
    event
        .choices
        .iter()
        .filter(|choice| is_choice_available(choice, state, catalog))
        .collect()
}

/// `max(0.1, tendency * magnitude + impulse)` where `impulse` is uniform in `0..chaos`.
pub fn autonomous_score<R: Rng + ?Sized>(
    choice: &ChoiceDefinition,
    state: &PlayerState,
    chaos: f64,
    rng: &mut R,
) -> WeightedCandidate {
    let base_weight = choice.tendency(state) * choice.magnitude();
    let impulse = rng.r#gen::<f64>() * chaos;
    WeightedCandidate {
        id: String::new(),
        base_weight,
        multipliers: vec![WeightFactor {
            label: "impulse".to_string(),
            value: impulse,
        }],
        final_weight: (base_weight + impulse).max(MIN_CHOICE_SCORE),
    }
}

/// A choice picked by the autonomous player.
#[derive(Debug, Clone)]
pub struct ChoicePick<'e> {
    pub choice: Option<&'e ChoiceDefinition>,
    pub trace: DecisionTrace,
}

/// Score every available choice, then draw one proportionally to its score.
pub fn pick_choice<'e, R: Rng + ?Sized>(
    choices: &[&'e ChoiceDefinition],
    state: &PlayerState,
    chaos: f64,
    rng: &mut R,
) -> ChoicePick<'e> {
    let candidates = choices
        .iter()
        .enumerate()
        .map(|(idx, choice)| {
            let mut scored = autonomous_score(choice, state, chaos, rng);
            scored.id = choice_label(choice, idx);
            scored
        })
        .collect();
    let mut trace = DecisionTrace::new(POOL_CHOICES, candidates);
    let choice = trace.draw(rng).and_then(|idx| choices.get(idx).copied());
    ChoicePick { choice, trace }
}

/// What a resolved choice produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'c> {
    pub feedback: Option<&'c str>,
    pub outcomes: &'c [OutcomeDirective],
    /// Index of the chosen result bucket, when the choice has buckets.
    pub bucket: Option<usize>,
    pub trace: Option<DecisionTrace>,
}

/// Draw a result bucket when the choice has any, else use its flat outcomes.
///
/// A drawn bucket supplies both feedback and outcomes; the choice's flat
/// `feedback` is ignored once buckets exist.
///
/// Bucket draws that cannot settle (all weights zero after clamping) fall back
/// to the last bucket.
pub fn resolve_result<'c, R: Rng + ?Sized>(
    choice: &'c ChoiceDefinition,
    rng: &mut R,
) -> Resolution<'c> {
    if !choice.has_results() {
        return Resolution {
            feedback: choice.feedback.as_deref(),
            outcomes: &choice.outcomes,
            bucket: None,
            trace: None,
        };
    }
    let candidates = choice
        .results
        .iter()
        .enumerate()
        .map(|(idx, bucket)| WeightedCandidate {
            id: format!("#{idx}"),
            base_weight: bucket.effective_weight(),
            multipliers: Vec::new(),
            final_weight: bucket.effective_weight(),
        })
        .collect();
    let mut trace = DecisionTrace::new(POOL_RESULTS, candidates);
    let last = choice.results.len() - 1;
    let idx = trace.draw(rng).unwrap_or_else(|| {
        trace.chosen_id = Some(format!("#{last}"));
        last
    });
    debug!("result bucket #{idx} of {}", choice.results.len());
    let bucket = &choice.results[idx];
    Resolution {
        feedback: bucket.feedback.as_deref(),
        outcomes: &bucket.outcomes,
        bucket: Some(idx),
        trace: Some(trace),
    }
}

/// Stable label for a choice: its id, else its position.
#[must_use]
pub fn choice_label(choice: &ChoiceDefinition, idx: usize) -> String {
    choice.id.clone().unwrap_or_else(|| format!("#{idx}"))
}
