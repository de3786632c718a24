use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::constants::{
    INITIAL_ANONYMITY, INITIAL_HEALTH, INITIAL_IRONY, INITIAL_LOGIC, INITIAL_MONEY,
    INITIAL_SANITY,
};
use crate::numbers::u32_to_f64;

/// Stat axes that drive autonomous choice weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Worldview {
    Logic,
    Gnosis,
    Weirdness,
    Irony,
}

impl Worldview {
    /// Iteration order used for dominance ties.
    pub const ALL: [Self; 4] = [Self::Logic, Self::Gnosis, Self::Weirdness, Self::Irony];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Logic => "logic",
            Self::Gnosis => "gnosis",
            Self::Weirdness => "weirdness",
            Self::Irony => "irony",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|axis| axis.key() == value)
    }
}

impl fmt::Display for Worldview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reason a run left the `Active` state through a stat threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Health,
    Sanity,
    Debt,
    Fame,
    Anonymity,
    OldAge,
}

impl DeathCause {
    /// Value recorded in `death_reason`.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Sanity => "sanity",
            Self::Debt => "debt",
            Self::Fame => "fame",
            Self::Anonymity => "anonymity",
            Self::OldAge => "old_age",
        }
    }

    /// Narrative line appended to the log when the run ends this way.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Health => "Your body has run out of everything it had.",
            Self::Sanity => "The integrity of your mind has collapsed completely.",
            Self::Debt => "Crushed by debt, you end it all in despair.",
            Self::Fame => "Fame devours you. There is nothing private left to live in.",
            Self::Anonymity => "Everyone knows who you are. There is nowhere left to hide.",
            Self::OldAge => "Life reaches its natural end.",
        }
    }
}

/// Coarse run state derived from `is_alive` and `ending_triggered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Dead,
    Ended,
}

impl Lifecycle {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Dead => "dead",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known numeric stats of a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub health: f64,
    pub sanity: f64,
    pub money: f64,
    pub logic: f64,
    pub gnosis: f64,
    pub weirdness: f64,
    pub irony: f64,
    pub fame: f64,
    pub anonymity: f64,
    pub exposure: f64,
    pub age: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            health: INITIAL_HEALTH,
            sanity: INITIAL_SANITY,
            money: INITIAL_MONEY,
            logic: INITIAL_LOGIC,
            gnosis: 0.0,
            weirdness: 0.0,
            irony: INITIAL_IRONY,
            fame: 0.0,
            anonymity: INITIAL_ANONYMITY,
            exposure: 0.0,
            age: 0.0,
        }
    }
}

impl Stats {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "health" => self.health,
            "sanity" => self.sanity,
            "money" => self.money,
            "logic" => self.logic,
            "gnosis" => self.gnosis,
            "weirdness" => self.weirdness,
            "irony" => self.irony,
            "fame" => self.fame,
            "anonymity" => self.anonymity,
            "exposure" => self.exposure,
            "age" => self.age,
            _ => return None,
        };
        Some(value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut f64> {
        let slot = match name {
            "health" => &mut self.health,
            "sanity" => &mut self.sanity,
            "money" => &mut self.money,
            "logic" => &mut self.logic,
            "gnosis" => &mut self.gnosis,
            "weirdness" => &mut self.weirdness,
            "irony" => &mut self.irony,
            "fame" => &mut self.fame,
            "anonymity" => &mut self.anonymity,
            "exposure" => &mut self.exposure,
            "age" => &mut self.age,
            _ => return None,
        };
        Some(slot)
    }

    #[must_use]
    pub const fn worldview(&self, axis: Worldview) -> f64 {
        match axis {
            Worldview::Logic => self.logic,
            Worldview::Gnosis => self.gnosis,
            Worldview::Weirdness => self.weirdness,
            Worldview::Irony => self.irony,
        }
    }
}

/// Free variable stored in the player's open `variables` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl VariableValue {
    /// Numeric coercion: booleans map to 1/0, text parses or yields NaN.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Bool(flag) => {
                if *flag {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(value) => *value,
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(flag) => *flag,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::Text(text) => !text.is_empty(),
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEffectInstance {
    pub effect_id: String,
    pub remaining_duration: i32,
}

/// Timed multiplier applied to one event's selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventModifier {
    pub event_id: String,
    pub multiplier: f64,
    pub remaining_duration: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalentRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Event,
    Choice,
    Feedback,
    System,
    Ending,
}

/// Narrative log line. `seq` increases monotonically across evictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub turn: u32,
    pub kind: LogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
}

/// Complete mutable state of one run; this is also the save shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub custom_stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableValue>,
    pub is_alive: bool,
    #[serde(default)]
    pub death_reason: Option<String>,
    #[serde(default)]
    pub ending_triggered: bool,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub stat_multipliers: BTreeMap<String, f64>,
    #[serde(default)]
    pub status_effects: Vec<StatusEffectInstance>,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub talents: Vec<TalentRef>,
    #[serde(default)]
    pub triggered_event_ids: BTreeSet<String>,
    #[serde(default)]
    pub unlocked_event_ids: BTreeSet<String>,
    #[serde(default)]
    pub made_choice_ids: BTreeSet<String>,
    #[serde(default)]
    pub tag_probability_modifiers: BTreeMap<String, f64>,
    #[serde(default)]
    pub event_modifiers: Vec<EventModifier>,
    #[serde(default)]
    pub log: VecDeque<LogEntry>,
    #[serde(default = "EngineConfig::default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default)]
    pub next_log_seq: u64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(EngineConfig::default_log_capacity())
    }
}

impl PlayerState {
    /// Fresh living state with initial stats and an empty log.
    #[must_use]
    pub fn new(log_capacity: usize) -> Self {
        Self {
            stats: Stats::default(),
            custom_stats: BTreeMap::new(),
            variables: BTreeMap::new(),
            is_alive: true,
            death_reason: None,
            ending_triggered: false,
            turn: 0,
            stat_multipliers: BTreeMap::new(),
            status_effects: Vec::new(),
            inventory: Vec::new(),
            tags: Vec::new(),
            talents: Vec::new(),
            triggered_event_ids: BTreeSet::new(),
            unlocked_event_ids: BTreeSet::new(),
            made_choice_ids: BTreeSet::new(),
            tag_probability_modifiers: BTreeMap::new(),
            event_modifiers: Vec::new(),
            log: VecDeque::new(),
            log_capacity: log_capacity.max(1),
            next_log_seq: 0,
        }
    }

    /// Look up a stat by name: core fields, `turn`, then custom stats.
    #[must_use]
    pub fn stat(&self, name: &str) -> Option<f64> {
        if name == "turn" {
            return Some(u32_to_f64(self.turn));
        }
        self.stats
            .get(name)
            .or_else(|| self.custom_stats.get(name).copied())
    }

    /// Mutable access to a core or custom stat. Unknown names yield `None`.
    pub fn stat_mut(&mut self, name: &str) -> Option<&mut f64> {
        if self.stats.get(name).is_some() {
            return self.stats.get_mut(name);
        }
        self.custom_stats.get_mut(name)
    }

    /// Highest worldview axis; ties keep the earliest axis in [`Worldview::ALL`].
    #[must_use]
    pub fn dominant_worldview(&self) -> Worldview {
        let mut best = Worldview::Logic;
        let mut best_value = self.stats.worldview(best);
        for axis in Worldview::ALL.into_iter().skip(1) {
            let value = self.stats.worldview(axis);
            if value > best_value {
                best = axis;
                best_value = value;
            }
        }
        best
    }

    #[must_use]
    pub fn has_status(&self, effect_id: &str) -> bool {
        self.status_effects
            .iter()
            .any(|effect| effect.effect_id == effect_id)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|held| held == tag)
    }

    #[must_use]
    pub fn has_item(&self, item_id: &str) -> bool {
        self.inventory.iter().any(|item| item == item_id)
    }

    #[must_use]
    pub fn has_talent(&self, talent_id: &str) -> bool {
        self.talents.iter().any(|talent| talent.id == talent_id)
    }

    #[must_use]
    pub fn variable(&self, key: &str) -> Option<&VariableValue> {
        self.variables.get(key)
    }

    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        if self.is_alive {
            Lifecycle::Active
        } else if self.ending_triggered {
            Lifecycle::Ended
        } else {
            Lifecycle::Dead
        }
    }

    /// Append a log line, evicting the oldest entries past capacity.
    pub fn push_log(&mut self, kind: LogKind, title: Option<String>, text: impl Into<String>) -> u64 {
        let seq = self.next_log_seq;
        self.next_log_seq = self.next_log_seq.saturating_add(1);
        let capacity = self.log_capacity.max(1);
        while self.log.len() >= capacity {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            seq,
            turn: self.turn,
            kind,
            title,
            text: text.into(),
        });
        seq
    }

    /// Log entries appended at or after `seq` that are still retained.
    #[must_use]
    pub fn log_since(&self, seq: u64) -> Vec<LogEntry> {
        self.log
            .iter()
            .filter(|entry| entry.seq >= seq)
            .cloned()
            .collect()
    }
}
