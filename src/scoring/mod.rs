//! # Target Scorer
//!
//! Pure ranking of pending targets at a given instant. Astronomical facts
//! (current altitude, night boundaries) come from an [`Ephemeris`]; this
//! module only applies the constraint and weighting policy.
//!
//! A candidate scores 0 (disqualified) when its moon separation is below the
//! minimum, its current altitude is outside `[min_altitude, max_altitude]`,
//! or the instant is not night. Otherwise
//!
//! ```text
//! score = w_alt * clamp(altitude / max_altitude_tonight, 0, 1)
//!       + w_pri * (priority / max_priority_among_candidates)
//! ```
//!
//! with the two weights normalized to sum to 1. Selection is a stable
//! arg-max over the candidates in store order, so equal scores resolve to the
//! earliest candidate.

use crate::config::ScoringConfig;
use crate::constants::TargetStatus;
use crate::models::Target;
use crate::scheduler::Ephemeris;
use chrono::{DateTime, Utc};
use tracing::trace;

/// Scoring constraints and normalized weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConstraints {
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub min_moon_separation: f64,
    weight_altitude: f64,
    weight_priority: f64,
}

impl ScoringConstraints {
    pub fn new(
        min_altitude: f64,
        max_altitude: f64,
        min_moon_separation: f64,
        weight_altitude: f64,
        weight_priority: f64,
    ) -> Self {
        let total = weight_altitude.max(0.0) + weight_priority.max(0.0);
        let (weight_altitude, weight_priority) = if total > 0.0 {
            (weight_altitude.max(0.0) / total, weight_priority.max(0.0) / total)
        } else {
            (0.5, 0.5)
        };
        Self {
            min_altitude,
            max_altitude,
            min_moon_separation,
            weight_altitude,
            weight_priority,
        }
    }

    pub fn weights(&self) -> (f64, f64) {
        (self.weight_altitude, self.weight_priority)
    }
}

impl From<&ScoringConfig> for ScoringConstraints {
    fn from(config: &ScoringConfig) -> Self {
        Self::new(
            config.min_altitude,
            config.max_altitude,
            config.min_moon_separation,
            config.weight_altitude,
            config.weight_priority,
        )
    }
}

impl Default for ScoringConstraints {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

/// A selected target and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTarget {
    pub target: Target,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TargetScorer {
    constraints: ScoringConstraints,
}

impl TargetScorer {
    pub fn new(constraints: ScoringConstraints) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &ScoringConstraints {
        &self.constraints
    }

    /// Whether `target` satisfies every hard constraint at `at`.
    pub fn is_observable(&self, target: &Target, at: DateTime<Utc>, ephemeris: &dyn Ephemeris) -> bool {
        let Some(observability) = &target.observability else {
            return false;
        };
        if observability.moon_separation < self.constraints.min_moon_separation {
            return false;
        }
        if !ephemeris.is_night(at) {
            return false;
        }
        let altitude = ephemeris.altitude(target, at);
        (self.constraints.min_altitude..=self.constraints.max_altitude).contains(&altitude)
    }

    /// Score of one candidate; `max_priority` is the highest priority among
    /// the candidates being compared.
    pub fn score(
        &self,
        target: &Target,
        at: DateTime<Utc>,
        max_priority: f64,
        ephemeris: &dyn Ephemeris,
    ) -> f64 {
        if !self.is_observable(target, at, ephemeris) {
            return 0.0;
        }
        let Some(observability) = &target.observability else {
            return 0.0;
        };

        let altitude = ephemeris.altitude(target, at);
        let altitude_term = if observability.max_altitude > 0.0 {
            (altitude / observability.max_altitude).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let priority_term = if max_priority > 0.0 {
            (target.priority / max_priority).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let (w_alt, w_pri) = self.constraints.weights();
        w_alt * altitude_term + w_pri * priority_term
    }

    /// Highest-scoring unscheduled candidate, or `None` when every candidate
    /// scores 0.
    pub fn best_target(
        &self,
        candidates: &[Target],
        at: DateTime<Utc>,
        ephemeris: &dyn Ephemeris,
    ) -> Option<ScoredTarget> {
        self.best_matching(candidates, at, ephemeris, |_| true)
    }

    /// Like [`best_target`](Self::best_target), restricted to candidates
    /// accepted by `filter`.
    pub fn best_matching(
        &self,
        candidates: &[Target],
        at: DateTime<Utc>,
        ephemeris: &dyn Ephemeris,
        filter: impl Fn(&Target) -> bool,
    ) -> Option<ScoredTarget> {
        let eligible: Vec<&Target> = candidates
            .iter()
            .filter(|t| t.status == TargetStatus::Unscheduled)
            .filter(|t| t.observability.is_some())
            .filter(|t| filter(*t))
            .collect();

        let max_priority = eligible
            .iter()
            .map(|t| t.priority)
            .fold(0.0_f64, f64::max);

        let mut best: Option<(&Target, f64)> = None;
        for target in eligible {
            let score = self.score(target, at, max_priority, ephemeris);
            trace!(target_id = %target.id, score = score, "Scored candidate");
            if score <= 0.0 {
                continue;
            }
            // strict comparison keeps the earliest of equal scores
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((target, score)),
            }
        }

        best.map(|(target, score)| ScoredTarget {
            target: target.clone(),
            score,
        })
    }
}
