use std::sync::Arc;

use rabbithole_engine::constants::TIME_PASSES_ID;
use rabbithole_engine::turn::time_passes_choice;
use rabbithole_engine::{
    BaseContent, Catalog, EngineConfig, EngineError, GameSession, Lifecycle, LogKind,
    ManualOffer, PlayerState,
};
use serde_json::json;

fn bundled() -> Arc<Catalog> {
    let base =
        BaseContent::from_json("base.json", include_str!("../../assets/content/base.json")).unwrap();
    Arc::new(Catalog::assemble(base, Vec::new()))
}

#[test]
fn manual_play_offers_at_most_three_candidates() {
    let mut session = GameSession::with_ledger(bundled(), EngineConfig::default(), 7, &["trust_fund"]);
    for _ in 0..40 {
        if session.lifecycle() != Lifecycle::Active {
            break;
        }
        let turn = session.begin_manual_turn();
        match turn.offer {
            ManualOffer::Candidates(candidates) => {
                assert!(!candidates.is_empty() && candidates.len() <= 3);
                assert!(candidates.iter().filter(|c| c.choice.is_special).count() <= 1);
                let pick = candidates[0].clone();
                let report = session.choose(pick.id).unwrap();
                assert_eq!(report.event_id.as_deref(), Some(pick.parent.id.as_str()));
                assert_eq!(report.entries[0].kind, LogKind::Event);
                assert_eq!(report.entries[1].kind, LogKind::Choice);
                assert!(session.state().triggered_event_ids.contains(&pick.parent.id));
                if let Some(choice_id) = &pick.choice.id {
                    assert!(session.state().made_choice_ids.contains(choice_id));
                }
            }
            ManualOffer::TimePasses => {
                session.time_passes().unwrap();
            }
            ManualOffer::RunOver => break,
        }
    }
    assert!(session.state().turn > 0);
}

#[test]
fn stale_candidates_are_rejected() {
    let mut session = GameSession::with_ledger(bundled(), EngineConfig::default(), 9, &[] as &[&str]);
    let first = session.begin_manual_turn();
    let stale = first.offer.candidates().first().cloned().expect("bundled content offers choices");
    session.begin_manual_turn();
    if session.pending_candidates().iter().all(|c| c.id != stale.id) {
        let err = session.choose(stale.id).unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownCandidate {
                id: stale.id.to_string()
            }
        );
    }
}

#[test]
fn empty_world_only_lets_time_pass() {
    let base: BaseContent = serde_json::from_value(json!({})).unwrap();
    let catalog = Arc::new(Catalog::assemble(base, Vec::new()));
    let mut session = GameSession::with_ledger(catalog, EngineConfig::default(), 1, &[] as &[&str]);
    let turn = session.begin_manual_turn();
    assert_eq!(turn.offer, ManualOffer::TimePasses);
    let sentinel = time_passes_choice();
    assert_eq!(sentinel.id.as_deref(), Some(TIME_PASSES_ID));
    let next = session.time_passes().unwrap();
    assert_eq!(next.report.turn, 2);
    assert!((session.state().stats.money - 500.0).abs() < f64::EPSILON);
}

#[test]
fn saves_round_trip_through_json() {
    let mut session = GameSession::with_ledger(bundled(), EngineConfig::default(), 3, &["third_eye"]);
    session.run_until_over(25);
    let saved = serde_json::to_string(session.state()).unwrap();
    let restored: PlayerState = serde_json::from_str(&saved).unwrap();
    let original = session.state();
    assert_eq!(restored.turn, original.turn);
    assert_eq!(restored.log, original.log);
    assert_eq!(restored.tags, original.tags);
    assert_eq!(restored.status_effects, original.status_effects);
    assert_eq!(restored.triggered_event_ids, original.triggered_event_ids);
    assert_eq!(restored.made_choice_ids, original.made_choice_ids);
    assert_eq!(restored.lifecycle(), original.lifecycle());
    assert!((restored.stats.money - original.stats.money).abs() < 1e-9);
    assert!((restored.stats.age - original.stats.age).abs() < 1e-9);

    let raw: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert!(raw.get("isAlive").is_some());
    assert!(raw.get("statusEffects").is_some());
    assert!(raw.get("triggeredEventIds").is_some());

    let mut resumed = GameSession::from_state(
        bundled(),
        EngineConfig::default(),
        99,
        rabbithole_engine::AchievementLedger::new(&bundled()),
        restored,
    );
    let before = resumed.state().turn;
    if resumed.lifecycle() == Lifecycle::Active {
        resumed.run_turn();
        assert_eq!(resumed.state().turn, before + 1);
    }
}

#[test]
fn endings_are_final_in_manual_mode() {
    let mut session = GameSession::with_ledger(bundled(), EngineConfig::default(), 5, &[] as &[&str]);
    let turn = session.begin_manual_turn();
    assert!(session.trigger_ending("burnout"));
    assert_eq!(session.lifecycle(), Lifecycle::Ended);
    assert_eq!(session.state().death_reason.as_deref(), Some("burnout"));
    if let Some(candidate) = turn.offer.candidates().first() {
        assert_eq!(
            session.choose(candidate.id).unwrap_err(),
            EngineError::RunNotActive { lifecycle: "ended" }
        );
    }
    assert_eq!(session.begin_manual_turn().offer, ManualOffer::RunOver);
}
