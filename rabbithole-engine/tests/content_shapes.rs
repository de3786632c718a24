use rabbithole_engine::{
    BaseContent, Catalog, Condition, ContentPack, OutcomeDirective, import_packs,
};

const BASE: &str = include_str!("../../assets/content/base.json");
const NIGHT_SHIFT: &str = include_str!("../../assets/content/packs/night_shift.pack.json");
const FAME_ENGINE: &str = include_str!("../../assets/content/packs/fame_engine.pack.json");

fn full_catalog() -> Catalog {
    let base = BaseContent::from_json("base.json", BASE).unwrap();
    let import = import_packs([
        ("night_shift.pack.json", NIGHT_SHIFT),
        ("fame_engine.pack.json", FAME_ENGINE),
    ]);
    assert!(import.skipped.is_empty(), "{:?}", import.skipped);
    Catalog::assemble(base, import.packs)
}

fn assert_known_outcomes<'a>(context: &str, outcomes: impl IntoIterator<Item = &'a OutcomeDirective>) {
    for outcome in outcomes {
        assert!(
            !matches!(outcome, OutcomeDirective::Unknown(_)),
            "{context}: unrecognized outcome {outcome:?}"
        );
    }
}

fn assert_known_conditions(context: &str, conditions: &[Condition]) {
    for condition in conditions {
        assert!(
            !matches!(condition, Condition::Unknown(_)),
            "{context}: unrecognized condition {condition:?}"
        );
    }
}

#[test]
fn bundled_content_parses_without_unknown_directives() {
    let catalog = full_catalog();
    for event in catalog.events() {
        assert_known_conditions(&event.id, &event.conditions);
        for choice in &event.choices {
            let context = format!("{}::{}", event.id, choice.id.as_deref().unwrap_or("?"));
            assert_known_conditions(&context, &choice.conditions);
            assert_known_outcomes(&context, choice.all_outcomes());
        }
    }
    for talent in catalog.talents() {
        assert_known_outcomes(&talent.id, &talent.effects);
    }
    for achievement in catalog.achievements() {
        assert_known_conditions(&achievement.id, &achievement.conditions);
    }
    for id in ["in_debt", "insomnia"] {
        let effect = catalog.status_effect(id).unwrap();
        assert_known_outcomes(id, &effect.outcomes);
    }
}

#[test]
fn bundled_ids_are_unique() {
    let catalog = full_catalog();
    let mut events: Vec<&str> = catalog.events().iter().map(|e| e.id.as_str()).collect();
    let total = events.len();
    events.sort_unstable();
    events.dedup();
    assert_eq!(events.len(), total);

    let mut choices: Vec<&str> = catalog
        .events()
        .iter()
        .flat_map(|e| e.choices.iter().filter_map(|c| c.id.as_deref()))
        .collect();
    let total = choices.len();
    choices.sort_unstable();
    choices.dedup();
    assert_eq!(choices.len(), total);
}

#[test]
fn packs_merge_in_order() {
    let catalog = full_catalog();
    assert_eq!(
        catalog.pack_ids(),
        ["night_shift".to_string(), "fame_engine".to_string()]
    );
    assert_eq!(catalog.events().first().unwrap().id, "forum_thread");
    assert_eq!(catalog.events().last().unwrap().id, "sponsor_deal");
    // the pack's insomnia replaces the base definition wholesale
    assert_eq!(catalog.status_effect("insomnia").unwrap().duration, Some(3));
    assert_eq!(catalog.custom_stats().len(), 1);
    assert!(catalog.ending("retired_influencer").is_some());
    assert!(catalog.tag_resolver().are_exclusive("believer", "skeptic"));
}

#[test]
fn references_point_at_real_content() {
    let catalog = full_catalog();
    for event in catalog.events() {
        for outcome in event.choices.iter().flat_map(|c| c.all_outcomes()) {
            match outcome {
                OutcomeDirective::TriggerEnding(params) => {
                    assert!(catalog.ending(&params.ending_id).is_some(), "{}", params.ending_id);
                }
                OutcomeDirective::UnlockEvent(params) | OutcomeDirective::ResetEvent(params) => {
                    assert!(catalog.event(&params.event_id).is_some(), "{}", params.event_id);
                }
                OutcomeDirective::AddStatus(params) => {
                    assert!(catalog.status_effect(&params.id).is_some(), "{}", params.id);
                }
                _ => {}
            }
        }
    }
}

#[test]
fn malformed_packs_are_reported_not_fatal() {
    let import = import_packs([
        ("night_shift.pack.json", NIGHT_SHIFT),
        ("truncated.pack.json", &NIGHT_SHIFT[..40]),
        ("duplicate.pack.json", NIGHT_SHIFT),
    ]);
    assert_eq!(import.packs.len(), 1);
    assert_eq!(import.skipped.len(), 2);
    assert!(ContentPack::from_json("base.json", BASE).is_err());
}
