//! Target scoring and selection.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::strategies::*;
use common::*;
use pilot_core::scheduler::ObservingWindow;
use pilot_core::scoring::{ScoringConstraints, TargetScorer};
use pilot_core::{Target, TargetStatus};
use proptest::prelude::*;

fn ephemeris() -> FixedEphemeris {
    let start = Utc::now();
    FixedEphemeris::new(ObservingWindow {
        start,
        end: start + ChronoDuration::hours(8),
    })
}

fn scorer() -> TargetScorer {
    TargetScorer::new(ScoringConstraints::new(30.0, 90.0, 40.0, 0.5, 0.5))
}

#[test]
fn test_higher_priority_wins_at_equal_altitude() {
    let eph = ephemeris();
    let candidates = vec![
        TargetBuilder::new("T1").priority(10.0).build(),
        TargetBuilder::new("T2").priority(50.0).build(),
        TargetBuilder::new("T3").priority(20.0).build(),
    ];

    let best = scorer().best_target(&candidates, Utc::now(), &eph).unwrap();
    assert_eq!(best.target.id, "T2");
    assert!(best.score > 0.0 && best.score <= 1.0);
}

#[test]
fn test_hard_constraints_exclude_candidates() {
    let eph = ephemeris();
    eph.set_altitude("LOW", 20.0);
    let candidates = vec![
        TargetBuilder::new("LOW").priority(100.0).build(),
        TargetBuilder::new("MOON").priority(100.0).moon_separation(10.0).build(),
        TargetBuilder::new("STALE").priority(100.0).stale().build(),
        TargetBuilder::new("OK").priority(1.0).build(),
    ];

    let best = scorer().best_target(&candidates, Utc::now(), &eph).unwrap();
    assert_eq!(best.target.id, "OK");
}

#[test]
fn test_only_unscheduled_candidates_are_selected() {
    let eph = ephemeris();
    let mut busy = TargetBuilder::new("T1").priority(100.0).build();
    busy.status = TargetStatus::Scheduled;
    let candidates = vec![busy, TargetBuilder::new("T2").priority(1.0).build()];

    let best = scorer().best_target(&candidates, Utc::now(), &eph).unwrap();
    assert_eq!(best.target.id, "T2");
}

#[test]
fn test_nothing_selected_in_daylight() {
    let eph = ephemeris();
    eph.set_night(false);
    let candidates = vec![TargetBuilder::new("T1").build()];
    assert!(scorer().best_target(&candidates, Utc::now(), &eph).is_none());
}

#[test]
fn test_equal_scores_keep_first_candidate() {
    let eph = ephemeris();
    let candidates: Vec<Target> = ["A", "B", "C"]
        .iter()
        .map(|id| TargetBuilder::new(id).priority(5.0).build())
        .collect();

    for _ in 0..10 {
        let best = scorer().best_target(&candidates, Utc::now(), &eph).unwrap();
        assert_eq!(best.target.id, "A");
    }
}

#[test]
fn test_best_matching_restricts_to_too() {
    let eph = ephemeris();
    let candidates = vec![
        TargetBuilder::new("ORD").priority(100.0).build(),
        TargetBuilder::new("TOO").priority(1.0).too().build(),
    ];
    let best = scorer()
        .best_matching(&candidates, Utc::now(), &eph, Target::is_too)
        .unwrap();
    assert_eq!(best.target.id, "TOO");
}

proptest! {
    /// Property: the selected target has the highest score, the earliest one
    /// among equals, and selection is repeatable.
    #[test]
    fn selection_is_deterministic_argmax(candidates in candidate_strategy()) {
        let eph = ephemeris();
        let at = Utc::now();
        let targets: Vec<Target> = candidates
            .iter()
            .enumerate()
            .map(|(i, (priority, altitude))| {
                let id = format!("T{i:03}");
                eph.set_altitude(&id, *altitude);
                TargetBuilder::new(&id).priority(*priority).build()
            })
            .collect();

        let scorer = scorer();
        let max_priority = targets.iter().map(|t| t.priority).fold(0.0_f64, f64::max);
        let scores: Vec<f64> = targets
            .iter()
            .map(|t| scorer.score(t, at, max_priority, &eph))
            .collect();

        let first = scorer.best_target(&targets, at, &eph);
        let second = scorer.best_target(&targets, at, &eph);
        prop_assert_eq!(&first, &second);

        let best_score = scores.iter().cloned().fold(0.0_f64, f64::max);
        match first {
            None => prop_assert!(best_score <= 0.0),
            Some(best) => {
                let expected = scores.iter().position(|s| *s == best_score).unwrap();
                prop_assert_eq!(best.target.id, targets[expected].id.clone());
                prop_assert_eq!(best.score, best_score);
            }
        }
    }
}
