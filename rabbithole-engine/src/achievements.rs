//! Achievement collaborator and end-of-run achievement evaluation.

use std::collections::BTreeSet;

use log::{info, warn};

use crate::catalog::Catalog;
use crate::condition::evaluate_all;
use crate::state::PlayerState;

/// External collaborator notified when content unlocks an achievement.
///
/// Implementations must be idempotent: unlocking an id twice, or an id the
/// host does not know, is a no-op.
pub trait AchievementSink {
    fn unlock_achievement(&mut self, id: &str);
}

impl AchievementSink for BTreeSet<String> {
    fn unlock_achievement(&mut self, id: &str) {
        if !id.is_empty() {
            self.insert(id.to_string());
        }
    }
}

/// In-memory sink that knows the catalog's achievements and keeps unlock order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementLedger {
    known: BTreeSet<String>,
    unlocked: Vec<String>,
}

impl AchievementLedger {
    #[must_use]
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            known: catalog
                .achievements()
                .iter()
                .map(|achievement| achievement.id.clone())
                .collect(),
            unlocked: Vec::new(),
        }
    }

    /// Restore a ledger with achievements unlocked in earlier runs.
    #[must_use]
    pub fn with_unlocked(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        for id in ids {
            self.unlock_achievement(&id);
        }
        self
    }

    /// Unlocked ids in the order they were first unlocked.
    #[must_use]
    pub fn unlocked(&self) -> &[String] {
        &self.unlocked
    }

    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.iter().any(|unlocked| unlocked == id)
    }
}

impl AchievementSink for AchievementLedger {
    fn unlock_achievement(&mut self, id: &str) {
        if id.is_empty() || self.is_unlocked(id) {
            return;
        }
        if !self.known.contains(id) {
            warn!("attempted to unlock unknown achievement `{id}`");
            return;
        }
        info!("achievement unlocked: {id}");
        self.unlocked.push(id.to_string());
    }
}

/// Unlock every achievement whose conditions hold for `state`.
///
/// Achievements without conditions are only reachable through explicit
/// `unlock_achievement` directives and are skipped here.
pub fn evaluate_achievements(
    catalog: &Catalog,
    state: &PlayerState,
    sink: &mut dyn AchievementSink,
) -> usize {
    let mut matched = 0;
    for achievement in catalog.achievements() {
        if achievement.conditions.is_empty() {
            continue;
        }
        if evaluate_all(&achievement.conditions, state) {
            sink.unlock_achievement(&achievement.id);
            matched += 1;
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::BaseContent;
    use serde_json::json;

    fn catalog() -> Catalog {
        let base: BaseContent = serde_json::from_value(json!({
            "achievements": [
                { "id": "broke", "name": "Broke",
                  "conditions": [{ "type": "ending_check", "params": { "is": "debt" } }] },
                { "id": "scripted", "name": "Scripted" }
            ]
        }))
        .unwrap();
        Catalog::assemble(base, Vec::new())
    }

    #[test]
    fn ledger_is_idempotent_and_ignores_unknown_ids() {
        let catalog = catalog();
        let mut ledger = AchievementLedger::new(&catalog);
        ledger.unlock_achievement("scripted");
        ledger.unlock_achievement("scripted");
        ledger.unlock_achievement("made_up");
        assert_eq!(ledger.unlocked(), ["scripted".to_string()]);
    }

    #[test]
    fn evaluation_unlocks_matching_conditional_achievements() {
        let catalog = catalog();
        let mut state = PlayerState::default();
        let mut ledger = AchievementLedger::new(&catalog);
        assert_eq!(evaluate_achievements(&catalog, &state, &mut ledger), 0);
        state.death_reason = Some("debt".into());
        assert_eq!(evaluate_achievements(&catalog, &state, &mut ledger), 1);
        assert!(ledger.is_unlocked("broke"));
        assert!(!ledger.is_unlocked("scripted"));
    }

    #[test]
    fn plain_sets_work_as_sinks() {
        let mut sink = BTreeSet::new();
        sink.unlock_achievement("anything");
        sink.unlock_achievement("");
        assert_eq!(sink.len(), 1);
    }
}
