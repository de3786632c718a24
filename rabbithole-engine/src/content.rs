use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::condition::Condition;
use crate::constants::DEFAULT_RESULT_WEIGHT;
use crate::error::ContentError;
use crate::outcome::OutcomeDirective;
use crate::state::PlayerState;
use crate::tags::TagMetadata;

/// Event tags; almost every event carries a handful at most.
pub type TagList = SmallVec<[String; 4]>;

/// A narrative beat with optional conditions and a set of choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub choices: Vec<ChoiceDefinition>,
    #[serde(default)]
    pub tags: TagList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub requires_unlock: bool,
}

impl EventDefinition {
    /// Authored priority; absent or zero counts as 1.
    #[must_use]
    pub fn priority(&self) -> f64 {
        self.priority
            .filter(|value| *value != 0.0 && !value.is_nan())
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|held| held == tag)
    }
}

/// Weighted result bucket of a choice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultBucket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDirective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ResultBucket {
    /// Absent or zero weight counts as 1; negative weights never win a draw.
    #[must_use]
    pub fn effective_weight(&self) -> f64 {
        self.weight
            .filter(|value| *value != 0.0 && !value.is_nan())
            .unwrap_or(DEFAULT_RESULT_WEIGHT)
            .max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Stat used as the weighting axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worldview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default)]
    pub is_special: bool,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDirective>,
    #[serde(default)]
    pub results: Vec<ResultBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ChoiceDefinition {
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.magnitude
            .filter(|value| *value != 0.0 && !value.is_nan())
            .unwrap_or(1.0)
    }

    /// Current value of the choice's worldview stat, 0 when absent.
    #[must_use]
    pub fn tendency(&self, state: &PlayerState) -> f64 {
        self.worldview
            .as_deref()
            .and_then(|stat| state.stat(stat))
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    /// Every directive the choice could apply: the union of its buckets, or its flat list.
    pub fn all_outcomes(&self) -> Box<dyn Iterator<Item = &OutcomeDirective> + '_> {
        if self.has_results() {
            Box::new(self.results.iter().flat_map(|bucket| bucket.outcomes.iter()))
        } else {
            Box::new(self.outcomes.iter())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusEffectDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Duration used when an `add_status` directive omits one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDirective>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: Vec<OutcomeDirective>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hidden: bool,
    /// Evaluated against the final state when a run leaves `Active`.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomStatDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub initial: f64,
}

/// Content that ships with the game itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseContent {
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub talents: Vec<TalentDefinition>,
    #[serde(default)]
    pub endings: Vec<EndingDefinition>,
    #[serde(default)]
    pub status_effects: BTreeMap<String, StatusEffectDefinition>,
    #[serde(default)]
    pub tags: TagMetadata,
    #[serde(default)]
    pub achievements: Vec<AchievementDefinition>,
}

impl BaseContent {
    /// Parse base content from JSON.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Parse` if the JSON does not match the content shape.
    pub fn from_json(source_name: &str, json: &str) -> Result<Self, ContentError> {
        serde_json::from_str(json).map_err(|source| ContentError::Parse {
            source_name: source_name.to_string(),
            source,
        })
    }
}

/// Optional content pack layered on top of the base content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPack {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub talents: Vec<TalentDefinition>,
    #[serde(default)]
    pub endings: Vec<EndingDefinition>,
    #[serde(default)]
    pub status_effects: BTreeMap<String, StatusEffectDefinition>,
    #[serde(default)]
    pub custom_stats: Vec<CustomStatDefinition>,
    #[serde(default)]
    pub achievements: Vec<AchievementDefinition>,
}

impl ContentPack {
    /// Parse a pack and check that it carries an `id` and a `name`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Parse` for malformed JSON and
    /// `ContentError::MissingField` when `id` or `name` is empty.
    pub fn from_json(source_name: &str, json: &str) -> Result<Self, ContentError> {
        let pack: Self = serde_json::from_str(json).map_err(|source| ContentError::Parse {
            source_name: source_name.to_string(),
            source,
        })?;
        for (field, value) in [("id", &pack.id), ("name", &pack.name)] {
            if value.trim().is_empty() {
                return Err(ContentError::MissingField {
                    source_name: source_name.to_string(),
                    field,
                });
            }
        }
        Ok(pack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_defaults_and_priority_fallback() {
        let event: EventDefinition = serde_json::from_value(json!({
            "id": "quiet_morning",
            "text": "Coffee.",
            "priority": 0
        }))
        .unwrap();
        assert!((event.priority() - 1.0).abs() < f64::EPSILON);
        assert!(!event.is_unique);
        assert!(event.choices.is_empty());
        assert!(event.tags.is_empty());
    }

    #[test]
    fn choice_magnitude_and_tendency() {
        let mut state = PlayerState::default();
        state.stats.gnosis = 7.0;
        let choice: ChoiceDefinition = serde_json::from_value(json!({
            "text": "Meditate",
            "worldview": "gnosis",
            "isSpecial": true
        }))
        .unwrap();
        assert!(choice.is_special);
        assert!((choice.magnitude() - 1.0).abs() < f64::EPSILON);
        assert!((choice.tendency(&state) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bucket_weights_default_to_one() {
        let bucket = ResultBucket::default();
        assert!((bucket.effective_weight() - 1.0).abs() < f64::EPSILON);
        let zero = ResultBucket {
            weight: Some(0.0),
            ..ResultBucket::default()
        };
        assert!((zero.effective_weight() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pack_requires_id_and_name() {
        let err = ContentPack::from_json("nameless.json", r#"{"id": "x"}"#).unwrap_err();
        assert!(matches!(err, ContentError::MissingField { field: "name", .. }));
        let err = ContentPack::from_json("broken.json", "{").unwrap_err();
        assert!(matches!(err, ContentError::Parse { .. }));
        let pack = ContentPack::from_json("ok.json", r#"{"id": "x", "name": "X"}"#).unwrap();
        assert_eq!(pack.id, "x");
    }
}
