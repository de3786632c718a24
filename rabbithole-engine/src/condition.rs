//! Condition evaluator: pure predicates over [`PlayerState`].
//!
//! Conditions are authored as `{ "type": ..., "params": { ... } }`. Anything that
//! does not parse into a known kind (missing `type` or `params`, an unknown
//! `type`, params of the wrong shape) becomes [`Condition::Unknown`], which keeps
//! the raw JSON and always evaluates to `true`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::state::PlayerState;

/// Comparison operator accepted by stat and variable checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompareOp {
    Ge,
    Le,
    Eq,
    Gt,
    Lt,
    Ne,
    Unsupported(String),
}

impl CompareOp {
    #[must_use]
    pub fn parse(symbol: &str) -> Self {
        match symbol.trim() {
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "==" | "===" => Self::Eq,
            ">" => Self::Gt,
            "<" => Self::Lt,
            "!=" | "!==" => Self::Ne,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Apply the operator; `None` for an unsupported symbol.
    ///
    /// Equality is exact, so `0.1 + 0.2 == 0.3` does not hold.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn compare(&self, left: f64, right: f64) -> Option<bool> {
        let outcome = match self {
            Self::Ge => left >= right,
            Self::Le => left <= right,
            Self::Eq => left == right,
            Self::Gt => left > right,
            Self::Lt => left < right,
            Self::Ne => left != right,
            Self::Unsupported(_) => return None,
        };
        Some(outcome)
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ne => "!=",
            Self::Unsupported(raw) => raw,
        }
    }
}

impl From<String> for CompareOp {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<CompareOp> for String {
    fn from(value: CompareOp) -> Self {
        value.symbol().to_string()
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatCheck {
    pub stat: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<CompareOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldviewCheck {
    pub dominant: String,
}

/// `has` / `has_not` pair shared by the membership checks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresenceCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_not: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_triggered: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_not_triggered: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MadeChoiceCheck {
    pub choice_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariableCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<CompareOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingCheck {
    pub is: String,
}

/// Which side of a presence check an instance asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence<'a> {
    Has(&'a str),
    HasNot(&'a str),
    Unspecified,
}

impl PresenceCheck {
    #[must_use]
    pub fn presence(&self) -> Presence<'_> {
        presence_of(self.has.as_deref(), self.has_not.as_deref())
    }
}

impl EventCheck {
    #[must_use]
    pub fn presence(&self) -> Presence<'_> {
        presence_of(
            self.has_triggered.as_deref(),
            self.has_not_triggered.as_deref(),
        )
    }
}

// "has" wins when both are given; empty ids count as absent.
fn presence_of<'a>(has: Option<&'a str>, has_not: Option<&'a str>) -> Presence<'a> {
    match (has.filter(|id| !id.is_empty()), has_not.filter(|id| !id.is_empty())) {
        (Some(id), _) => Presence::Has(id),
        (None, Some(id)) => Presence::HasNot(id),
        (None, None) => Presence::Unspecified,
    }
}

impl Presence<'_> {
    fn test(self, contains: impl Fn(&str) -> bool) -> bool {
        match self {
            Self::Has(id) => contains(id),
            Self::HasNot(id) => !contains(id),
            Self::Unspecified => false,
        }
    }
}

/// Closed set of condition kinds plus a permissive catch-all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Condition {
    Stat(StatCheck),
    Worldview(WorldviewCheck),
    Status(PresenceCheck),
    Event(EventCheck),
    Inventory(PresenceCheck),
    MadeChoice(MadeChoiceCheck),
    Talent(PresenceCheck),
    Tag(PresenceCheck),
    Variable(VariableCheck),
    Ending(EndingCheck),
    Unknown(Value),
}

impl Condition {
    /// Authored `type` string for known kinds.
    #[must_use]
    pub const fn type_name(&self) -> Option<&'static str> {
        let name = match self {
            Self::Stat(_) => "stat_check",
            Self::Worldview(_) => "worldview_check",
            Self::Status(_) => "status_check",
            Self::Event(_) => "event_check",
            Self::Inventory(_) => "inventory_check",
            Self::MadeChoice(_) => "made_choice_check",
            Self::Talent(_) => "talent_check",
            Self::Tag(_) => "tag_check",
            Self::Variable(_) => "variable_check",
            Self::Ending(_) => "ending_check",
            Self::Unknown(_) => return None,
        };
        Some(name)
    }

    fn params_value(&self) -> Value {
        let params = match self {
            Self::Stat(params) => serde_json::to_value(params),
            Self::Worldview(params) => serde_json::to_value(params),
            Self::Status(params)
            | Self::Inventory(params)
            | Self::Talent(params)
            | Self::Tag(params) => serde_json::to_value(params),
            Self::Event(params) => serde_json::to_value(params),
            Self::MadeChoice(params) => serde_json::to_value(params),
            Self::Variable(params) => serde_json::to_value(params),
            Self::Ending(params) => serde_json::to_value(params),
            Self::Unknown(raw) => return raw.clone(),
        };
        params.unwrap_or(Value::Null)
    }
}

impl From<Value> for Condition {
    fn from(raw: Value) -> Self {
        let Some(kind) = raw.get("type").and_then(Value::as_str) else {
            return Self::Unknown(raw);
        };
        let Some(params) = raw.get("params").filter(|params| !params.is_null()) else {
            return Self::Unknown(raw);
        };
        let params = params.clone();
        let parsed = match kind {
            "stat_check" => serde_json::from_value(params).map(Self::Stat),
            "worldview_check" => serde_json::from_value(params).map(Self::Worldview),
            "status_check" => serde_json::from_value(params).map(Self::Status),
            "event_check" => serde_json::from_value(params).map(Self::Event),
            "inventory_check" => serde_json::from_value(params).map(Self::Inventory),
            "made_choice_check" => serde_json::from_value(params).map(Self::MadeChoice),
            "talent_check" => serde_json::from_value(params).map(Self::Talent),
            "tag_check" => serde_json::from_value(params).map(Self::Tag),
            "variable_check" => serde_json::from_value(params).map(Self::Variable),
            "ending_check" | "ending_id" => serde_json::from_value(params).map(Self::Ending),
            _ => return Self::Unknown(raw),
        };
        parsed.unwrap_or(Self::Unknown(raw))
    }
}

impl From<Condition> for Value {
    fn from(condition: Condition) -> Self {
        match condition.type_name() {
            Some(kind) => json!({ "type": kind, "params": condition.params_value() }),
            None => condition.params_value(),
        }
    }
}

/// Evaluate one condition against the state.
#[must_use]
pub fn evaluate(condition: &Condition, state: &PlayerState) -> bool {
    match condition {
        Condition::Stat(check) => {
            let Some(current) = state.stat(&check.stat) else {
                return false;
            };
            match (&check.operator, check.value) {
                (Some(op), Some(target)) => op.compare(current, target).unwrap_or(false),
                _ => false,
            }
        }
        Condition::Worldview(check) => state.dominant_worldview().key() == check.dominant,
        Condition::Status(check) => check.presence().test(|id| state.has_status(id)),
        Condition::Event(check) => check
            .presence()
            .test(|id| state.triggered_event_ids.contains(id)),
        Condition::Inventory(check) => check.presence().test(|id| state.has_item(id)),
        Condition::MadeChoice(check) => state.made_choice_ids.contains(&check.choice_id),
        Condition::Talent(check) => check.presence().test(|id| state.has_talent(id)),
        Condition::Tag(check) => check.presence().test(|id| state.has_tag(id)),
        Condition::Variable(check) => evaluate_variable(check, state),
        Condition::Ending(check) => state.death_reason.as_deref() == Some(check.is.as_str()),
        Condition::Unknown(_) => true,
    }
}

fn evaluate_variable(check: &VariableCheck, state: &PlayerState) -> bool {
    let Some(key) = check.key.as_deref().filter(|key| !key.is_empty()) else {
        return false;
    };
    let Some(value) = state.variable(key) else {
        return check.exists.is_some_and(|exists| !exists);
    };
    match &check.operator {
        Some(op) if !matches!(op, CompareOp::Unsupported(_)) => check
            .value
            .and_then(|target| op.compare(value.as_number(), target))
            .unwrap_or(false),
        _ => value.is_truthy(),
    }
}

/// Logical AND over a condition list; an empty list is satisfied.
#[must_use]
pub fn evaluate_all(conditions: &[Condition], state: &PlayerState) -> bool {
    conditions
        .iter()
        .all(|condition| evaluate(condition, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StatusEffectInstance, TalentRef, VariableValue};

    fn parse(raw: Value) -> Condition {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn missing_type_or_params_is_permissive() {
        let state = PlayerState::default();
        for raw in [
            json!({}),
            json!({ "type": "stat_check" }),
            json!({ "params": { "stat": "health" } }),
            json!({ "type": "from_the_future", "params": {} }),
            json!("not even an object"),
        ] {
            let condition = parse(raw);
            assert!(matches!(condition, Condition::Unknown(_)));
            assert!(evaluate(&condition, &state));
        }
    }

    #[test]
    fn unknown_conditions_serialize_back_verbatim() {
        let raw = json!({ "type": "from_the_future", "params": { "x": 1 } });
        let condition = parse(raw.clone());
        assert_eq!(serde_json::to_value(&condition).unwrap(), raw);
    }

    #[test]
    fn stat_check_compares_and_rejects_missing_stats() {
        let mut state = PlayerState::default();
        state.stats.health = 40.0;
        let low = parse(json!({
            "type": "stat_check",
            "params": { "stat": "health", "operator": "<", "value": 50 }
        }));
        assert!(evaluate(&low, &state));
        let missing = parse(json!({
            "type": "stat_check",
            "params": { "stat": "charisma", "operator": ">=", "value": 0 }
        }));
        assert!(!evaluate(&missing, &state));
        let bad_op = parse(json!({
            "type": "stat_check",
            "params": { "stat": "health", "operator": "~", "value": 40 }
        }));
        assert!(!evaluate(&bad_op, &state));
        let strict_eq = parse(json!({
            "type": "stat_check",
            "params": { "stat": "health", "operator": "===", "value": 40 }
        }));
        assert!(evaluate(&strict_eq, &state));
    }

    #[test]
    fn presence_checks_follow_has_then_has_not() {
        let mut state = PlayerState::default();
        state.status_effects.push(StatusEffectInstance {
            effect_id: "flu".into(),
            remaining_duration: 2,
        });
        state.tags.push("rebel".into());
        state.inventory.push("key".into());
        state.talents.push(TalentRef {
            id: "lucky".into(),
            name: "Lucky".into(),
        });
        state.triggered_event_ids.insert("intro".into());

        let cases = [
            (json!({ "type": "status_check", "params": { "has": "flu" } }), true),
            (json!({ "type": "status_check", "params": { "has_not": "flu" } }), false),
            (json!({ "type": "tag_check", "params": { "has_not": "conformist" } }), true),
            (json!({ "type": "inventory_check", "params": { "has": "key" } }), true),
            (json!({ "type": "talent_check", "params": { "has": "cursed" } }), false),
            (json!({ "type": "event_check", "params": { "has_triggered": "intro" } }), true),
            (
                json!({ "type": "event_check", "params": { "has_not_triggered": "intro" } }),
                false,
            ),
            (json!({ "type": "tag_check", "params": {} }), false),
        ];
        for (raw, expected) in cases {
            let condition = parse(raw.clone());
            assert_eq!(evaluate(&condition, &state), expected, "{raw}");
        }
    }

    #[test]
    fn variable_check_handles_exists_and_truthiness() {
        let mut state = PlayerState::default();
        state
            .variables
            .insert("clues".into(), VariableValue::Number(3.0));
        state
            .variables
            .insert("flag".into(), VariableValue::Bool(false));

        let absent_not_exists = parse(json!({
            "type": "variable_check",
            "params": { "key": "missing", "exists": false }
        }));
        assert!(evaluate(&absent_not_exists, &state));
        let absent_plain = parse(json!({
            "type": "variable_check",
            "params": { "key": "missing", "operator": ">=", "value": 0 }
        }));
        assert!(!evaluate(&absent_plain, &state));
        let compare = parse(json!({
            "type": "variable_check",
            "params": { "key": "clues", "operator": ">=", "value": 3 }
        }));
        assert!(evaluate(&compare, &state));
        let truthy = parse(json!({ "type": "variable_check", "params": { "key": "flag" } }));
        assert!(!evaluate(&truthy, &state));
        let no_key = parse(json!({ "type": "variable_check", "params": {} }));
        assert!(!evaluate(&no_key, &state));
    }

    #[test]
    fn worldview_made_choice_and_ending_checks() {
        let mut state = PlayerState::default();
        state.stats.weirdness = 50.0;
        state.made_choice_ids.insert("took_pill".into());
        state.death_reason = Some("debt".into());

        let worldview = parse(json!({
            "type": "worldview_check",
            "params": { "dominant": "weirdness" }
        }));
        let choice = parse(json!({
            "type": "made_choice_check",
            "params": { "choiceId": "took_pill" }
        }));
        let ending = parse(json!({ "type": "ending_check", "params": { "is": "debt" } }));
        assert!(evaluate_all(&[worldview, choice, ending], &state));
        assert!(evaluate_all(&[], &state));
    }

    #[test]
    fn ending_id_is_an_alias_of_the_ending_check() {
        let mut state = PlayerState::default();
        state.death_reason = Some("sanity".into());
        let other = parse(json!({ "type": "ending_id", "params": { "is": "health" } }));
        assert!(matches!(other, Condition::Ending(_)));
        assert!(!evaluate(&other, &state));
        let same = parse(json!({ "type": "ending_id", "params": { "is": "sanity" } }));
        assert!(evaluate(&same, &state));
    }

    #[test]
    fn equality_operators_are_exact() {
        assert_eq!(CompareOp::Eq.compare(3.0, 3.0), Some(true));
        assert_eq!(CompareOp::Eq.compare(0.1 + 0.2, 0.3), Some(false));
        assert_eq!(CompareOp::Ne.compare(0.1 + 0.2, 0.3), Some(true));
        assert_eq!(CompareOp::Ne.compare(f64::NAN, f64::NAN), Some(true));
        assert_eq!(CompareOp::parse("===").compare(5.0, 5.0), Some(true));
    }
}
