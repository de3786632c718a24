//! Tag conflict resolution and tag-gated event access.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::content::ChoiceDefinition;
use crate::outcome::OutcomeDirective;

/// Authored tag metadata shipped with base content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMetadata {
    /// Groups of mutually exclusive tags.
    #[serde(default)]
    pub conflicts: Vec<Vec<String>>,
    /// Event tags that hide an event unless a permitting player tag is held.
    #[serde(default, alias = "gated_event_tags")]
    pub gated_event_tags: Vec<String>,
    /// Player tag -> event tags it opens up.
    #[serde(default, alias = "tag_unlocks")]
    pub tag_unlocks: BTreeMap<String, Vec<String>>,
}

impl TagMetadata {
    /// Whether an event carrying `event_tags` may be offered to a player holding `held`.
    #[must_use]
    pub fn permits_event(&self, event_tags: &[String], held: &[String]) -> bool {
        let gated: Vec<&String> = event_tags
            .iter()
            .filter(|tag| self.gated_event_tags.contains(tag))
            .collect();
        if gated.is_empty() {
            return true;
        }
        held.iter().any(|player_tag| {
            self.tag_unlocks
                .get(player_tag)
                .is_some_and(|opens| gated.iter().any(|tag| opens.contains(tag)))
        })
    }
}

/// Static `tag -> conflicting tags` map built once from the conflict groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagConflictResolver {
    conflicts: HashMap<String, BTreeSet<String>>,
}

impl TagConflictResolver {
    /// A tag listed in several groups conflicts with the union of their members.
    #[must_use]
    pub fn from_groups(groups: &[Vec<String>]) -> Self {
        let mut conflicts: HashMap<String, BTreeSet<String>> = HashMap::new();
        for group in groups {
            for tag in group {
                let entry = conflicts.entry(tag.clone()).or_default();
                entry.extend(group.iter().filter(|other| *other != tag).cloned());
            }
        }
        Self { conflicts }
    }

    pub fn conflicts_of(&self, tag: &str) -> impl Iterator<Item = &str> {
        self.conflicts
            .get(tag)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    #[must_use]
    pub fn are_exclusive(&self, a: &str, b: &str) -> bool {
        self.conflicts.get(a).is_some_and(|set| set.contains(b))
    }

    /// Whether adding `new_tag` would clash with any held tag.
    #[must_use]
    pub fn has_conflict(&self, new_tag: &str, held: &[String]) -> bool {
        held.iter().any(|tag| self.are_exclusive(new_tag, tag))
    }

    /// True when any non-replacing `add_tag` in the choice's outcome set clashes.
    #[must_use]
    pub fn choice_introduces_conflict(&self, choice: &ChoiceDefinition, held: &[String]) -> bool {
        choice.all_outcomes().any(|directive| match directive {
            OutcomeDirective::AddTag(params) => {
                !params.replace && self.has_conflict(&params.tag, held)
            }
            _ => false,
        })
    }
}
