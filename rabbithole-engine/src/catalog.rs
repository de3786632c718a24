//! Read-only content catalog assembled once from base content plus packs.

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use serde::Serialize;

use crate::content::{
    AchievementDefinition, BaseContent, ContentPack, CustomStatDefinition, EndingDefinition,
    EventDefinition, StatusEffectDefinition, TalentDefinition,
};
use crate::error::ContentError;
use crate::tags::{TagConflictResolver, TagMetadata};

/// Merged content shared by every run; safe to share behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    events: Vec<EventDefinition>,
    talents: Vec<TalentDefinition>,
    endings: Vec<EndingDefinition>,
    status_effects: BTreeMap<String, StatusEffectDefinition>,
    custom_stats: Vec<CustomStatDefinition>,
    achievements: Vec<AchievementDefinition>,
    tag_meta: TagMetadata,
    resolver: TagConflictResolver,
    pack_ids: Vec<String>,
}

impl Catalog {
    /// Merge base content with packs in order.
    ///
    /// Events, talents, endings and achievements append; status effects merge
    /// per key with later packs winning; custom stats come only from packs.
    #[must_use]
    pub fn assemble(base: BaseContent, packs: impl IntoIterator<Item = ContentPack>) -> Self {
        let BaseContent {
            mut events,
            mut talents,
            mut endings,
            mut status_effects,
            tags,
            mut achievements,
        } = base;
        let mut custom_stats = Vec::new();
        let mut pack_ids = Vec::new();

        for pack in packs {
            events.extend(pack.events);
            talents.extend(pack.talents);
            endings.extend(pack.endings);
            achievements.extend(pack.achievements);
            status_effects.extend(pack.status_effects);
            custom_stats.extend(pack.custom_stats);
            pack_ids.push(pack.id);
        }

        let resolver = TagConflictResolver::from_groups(&tags.conflicts);
        info!(
            "catalog assembled: {} events, {} talents, {} endings, {} status effects, {} packs",
            events.len(),
            talents.len(),
            endings.len(),
            status_effects.len(),
            pack_ids.len()
        );
        Self {
            events,
            talents,
            endings,
            status_effects,
            custom_stats,
            achievements,
            tag_meta: tags,
            resolver,
            pack_ids,
        }
    }

    #[must_use]
    pub fn events(&self) -> &[EventDefinition] {
        &self.events
    }

    #[must_use]
    pub fn event(&self, id: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|event| event.id == id)
    }

    #[must_use]
    pub fn talents(&self) -> &[TalentDefinition] {
        &self.talents
    }

    #[must_use]
    pub fn talent(&self, id: &str) -> Option<&TalentDefinition> {
        self.talents.iter().find(|talent| talent.id == id)
    }

    #[must_use]
    pub fn ending(&self, id: &str) -> Option<&EndingDefinition> {
        self.endings.iter().find(|ending| ending.id == id)
    }

    #[must_use]
    pub fn status_effect(&self, id: &str) -> Option<&StatusEffectDefinition> {
        self.status_effects.get(id)
    }

    #[must_use]
    pub fn custom_stats(&self) -> &[CustomStatDefinition] {
        &self.custom_stats
    }

    #[must_use]
    pub fn achievements(&self) -> &[AchievementDefinition] {
        &self.achievements
    }

    #[must_use]
    pub const fn tag_metadata(&self) -> &TagMetadata {
        &self.tag_meta
    }

    #[must_use]
    pub const fn tag_resolver(&self) -> &TagConflictResolver {
        &self.resolver
    }

    #[must_use]
    pub fn pack_ids(&self) -> &[String] {
        &self.pack_ids
    }
}

/// A pack that was left out of an import batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPack {
    pub source: String,
    pub reason: String,
}

/// Result of parsing a batch of candidate packs.
#[derive(Debug, Clone, Default)]
pub struct PackImport {
    pub packs: Vec<ContentPack>,
    pub skipped: Vec<SkippedPack>,
}

/// Parse `(source name, json)` pairs, keeping valid packs and reporting the rest.
///
/// Never fails: malformed JSON, missing `id`/`name` and repeated ids are
/// recorded in [`PackImport::skipped`].
pub fn import_packs<I, N, J>(sources: I) -> PackImport
where
    I: IntoIterator<Item = (N, J)>,
    N: AsRef<str>,
    J: AsRef<str>,
{
    let mut import = PackImport::default();
    let mut seen = BTreeSet::new();
    for (name, json) in sources {
        let name = name.as_ref();
        let parsed = ContentPack::from_json(name, json.as_ref()).and_then(|pack| {
            if seen.insert(pack.id.clone()) {
                Ok(pack)
            } else {
                Err(ContentError::DuplicatePack { id: pack.id })
            }
        });
        match parsed {
            Ok(pack) => import.packs.push(pack),
            Err(err) => {
                warn!("skipping content pack {name}: {err}");
                import.skipped.push(SkippedPack {
                    source: name.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
    info!(
        "content pack import: {} accepted, {} skipped",
        import.packs.len(),
        import.skipped.len()
    );
    import
}
