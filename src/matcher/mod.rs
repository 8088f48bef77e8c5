//! History matcher: given a target event's variation vector, find historical
//! events whose odds moved the same way and see whether their outcomes agree.
//!
//! Pure logic, deliberately free of any `sqlx`/`reqwest` dependency so it can
//! be exercised without a database or network. Structured around plain data
//! and free functions rather than a trait-object design, since the rule set
//! is closed and doesn't need dynamic dispatch.

use crate::domain::numeric::{approx_eq_2dp, within_tau};
use crate::domain::{Event, EventResult, OddsRecord, SportProfile, VariationVector, WinnerSide};

/// How tightly a historical candidate's variation matched the target's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VariationTier {
    /// Within tolerance only (τ = 0.0401, inclusive).
    Near,
    /// Truncated-to-2dp equal.
    Exact,
}

/// Strength of agreement among the winning candidates' stored results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTier {
    /// Every candidate recorded the identical scoreline.
    A,
    /// Every candidate agreed on winner and point differential.
    B,
    /// Candidates agreed only on the winner; point differential averaged.
    C,
}

impl ResultTier {
    pub fn confidence_pct(self) -> u8 {
        match self {
            ResultTier::A => 100,
            ResultTier::B => 75,
            ResultTier::C => 50,
        }
    }
}

/// One historical (event, odds, result) row fed to `evaluate` as a candidate.
/// Built by the repository from the `alert_eligible` search space.
#[derive(Debug, Clone)]
pub struct HistoricalCandidate {
    pub event_id: i64,
    pub home: String,
    pub away: String,
    pub competition: String,
    pub odds: OddsRecord,
    pub result: EventResult,
}

/// A single candidate as it appears in a report: enough to show why it
/// matched (or didn't fully agree) without re-querying the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateReport {
    pub event_id: i64,
    pub home: String,
    pub away: String,
    pub competition: String,
    pub variation_vector: VariationVector,
    /// Componentwise signed difference of this candidate's vector vs. the
    /// target's, i.e. `candidate - target`.
    pub diff: VariationVector,
    pub winner_side: WinnerSide,
    pub point_diff: i32,
    /// Whether this candidate's sign pattern matched the target's. Non-
    /// symmetric candidates stay in the report but never affect unanimity.
    pub symmetric: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub variation_tier: VariationTier,
    pub candidates: Vec<CandidateReport>,
    pub result_tier: ResultTier,
    pub predicted_side: WinnerSide,
    pub point_diff: i32,
    pub confidence_pct: u8,
    pub support_count: usize,
    pub prediction: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoMatchReport {
    pub variation_tier: VariationTier,
    pub candidates: Vec<CandidateReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Success(MatchOutcome),
    /// Candidates existed but didn't unanimously agree on a winner.
    NoMatch(NoMatchReport),
    /// No historical event's variation matched the target's at either tier.
    NoCandidates,
}

/// Tolerance for the "near" variation tier, per the fixed τ in the engine's
/// matching rule.
pub const TAU: f64 = 0.0401;

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// A zero component matches either sign; otherwise signs must agree exactly.
fn symmetric(a: f64, b: f64) -> bool {
    let (sa, sb) = (sign(a), sign(b));
    sa == 0 || sb == 0 || sa == sb
}

/// Whether every present component of `candidate` carries the same sign
/// pattern as `target` (0 matches either sign).
fn is_symmetric(target: &VariationVector, candidate: &VariationVector) -> bool {
    symmetric(target.d1, candidate.d1)
        && symmetric(target.d2, candidate.d2)
        && match (target.dx, candidate.dx) {
            (Some(t), Some(c)) => symmetric(t, c),
            _ => true,
        }
}

/// Componentwise signed difference, `candidate - target`.
fn diff_vector(candidate: &VariationVector, target: &VariationVector) -> VariationVector {
    VariationVector {
        d1: candidate.d1 - target.d1,
        dx: match (candidate.dx, target.dx) {
            (Some(c), Some(t)) => Some(c - t),
            _ => None,
        },
        d2: candidate.d2 - target.d2,
    }
}

/// Distance-only tier classification for one component. Sign agreement is a
/// separate concern (`is_symmetric`) so a small near-zero candidate of the
/// opposite sign still qualifies for the candidate list, just not the
/// unanimity pool.
fn component_tier(target: f64, candidate: f64) -> Option<VariationTier> {
    if approx_eq_2dp(target, candidate) {
        Some(VariationTier::Exact)
    } else if within_tau(target, candidate, TAU) {
        Some(VariationTier::Near)
    } else {
        None
    }
}

/// Compares two variation vectors, returning the weakest per-component tier
/// that still lets every present component qualify. `None` if any component
/// fails to match at either tier, or if one vector carries a draw component
/// the other lacks.
fn compare_vectors(target: &VariationVector, candidate: &VariationVector) -> Option<VariationTier> {
    let d1_tier = component_tier(target.d1, candidate.d1)?;
    let d2_tier = component_tier(target.d2, candidate.d2)?;

    let dx_tier = match (target.dx, candidate.dx) {
        (None, None) => None,
        (Some(t), Some(c)) => Some(component_tier(t, c)?),
        // Arity mismatch: one vector is 2-way, the other carries a draw leg.
        _ => return None,
    };

    Some([Some(d1_tier), Some(d2_tier), dx_tier].into_iter().flatten().min().unwrap())
}

struct Candidate {
    report: CandidateReport,
    home_score: i32,
    away_score: i32,
}

fn winner_from(result: &EventResult) -> Option<WinnerSide> {
    match result.winner_side.as_str() {
        "1" => Some(WinnerSide::One),
        "X" => Some(WinnerSide::X),
        "2" => Some(WinnerSide::Two),
        _ => None,
    }
}

/// Evaluates the target event's variation vector against historical
/// (odds, result) pairs for the same sport, per the tiered-unanimity rule:
/// prefer the exact-tier candidate pool when non-empty, fall back to the
/// near-tier pool otherwise, and only emit a prediction when every
/// *symmetric* candidate in the chosen pool agrees on the winning side.
/// Non-symmetric candidates stay in the report but never enter that
/// computation. The matcher never considers `event` as its own candidate.
pub fn evaluate(
    event: &Event,
    target: &VariationVector,
    history: &[HistoricalCandidate],
    _profile: &SportProfile,
) -> Verdict {
    let mut exact = Vec::new();
    let mut near = Vec::new();

    for candidate in history {
        if candidate.event_id == event.event_id {
            continue;
        }
        let Some(candidate_vector) = candidate.odds.variation_vector() else { continue };
        let Some(tier) = compare_vectors(target, &candidate_vector) else { continue };
        let Some(winner) = winner_from(&candidate.result) else { continue };

        let report = CandidateReport {
            event_id: candidate.event_id,
            home: candidate.home.clone(),
            away: candidate.away.clone(),
            competition: candidate.competition.clone(),
            variation_vector: candidate_vector,
            diff: diff_vector(&candidate_vector, target),
            winner_side: winner,
            point_diff: candidate.result.point_diff,
            symmetric: is_symmetric(target, &candidate_vector),
        };
        let entry = Candidate {
            report,
            home_score: candidate.result.home_score,
            away_score: candidate.result.away_score,
        };

        match tier {
            VariationTier::Exact => exact.push(entry),
            VariationTier::Near => near.push(entry),
        }
    }

    let (pool, variation_tier) = if !exact.is_empty() {
        (&exact, VariationTier::Exact)
    } else {
        (&near, VariationTier::Near)
    };
    if pool.is_empty() {
        return Verdict::NoCandidates;
    }

    let candidates: Vec<CandidateReport> = pool.iter().map(|c| c.report.clone()).collect();
    let symmetric_pool: Vec<&Candidate> = pool.iter().filter(|c| c.report.symmetric).collect();

    let no_match = || Verdict::NoMatch(NoMatchReport { variation_tier, candidates: candidates.clone() });

    let Some(first) = symmetric_pool.first() else { return no_match() };
    let first_winner = first.report.winner_side;
    if !symmetric_pool.iter().all(|c| c.report.winner_side == first_winner) {
        return no_match();
    }

    let support_count = symmetric_pool.len();
    let shared_point_diff = first.report.point_diff;
    let first_score = (first.home_score, first.away_score);

    let result_tier = if symmetric_pool.iter().all(|c| (c.home_score, c.away_score) == first_score) {
        ResultTier::A
    } else if symmetric_pool.iter().all(|c| c.report.point_diff == shared_point_diff) {
        ResultTier::B
    } else {
        ResultTier::C
    };

    let point_diff = match result_tier {
        ResultTier::A | ResultTier::B => shared_point_diff,
        ResultTier::C => {
            let mean = symmetric_pool.iter().map(|c| c.report.point_diff as f64).sum::<f64>() / support_count as f64;
            mean.round() as i32
        }
    };

    let confidence_pct = result_tier.confidence_pct();
    let prediction = format!("winner={}, point_diff={}", first_winner.as_str(), point_diff);

    Verdict::Success(MatchOutcome {
        variation_tier,
        candidates,
        result_tier,
        predicted_side: first_winner,
        point_diff,
        confidence_pct,
        support_count,
        prediction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile_for;
    use chrono::Utc;

    fn event() -> Event {
        Event {
            event_id: 1,
            sport: "football".into(),
            competition: "".into(),
            home: "A".into(),
            away: "B".into(),
            start_time: Utc::now(),
            ground_type: None,
            status: "scheduled".into(),
            last_checked_at: Utc::now(),
        }
    }

    fn odds_with(event_id: i64, var_one: f64, var_x: Option<f64>, var_two: f64) -> OddsRecord {
        OddsRecord {
            event_id,
            one_open: Some(1.80),
            x_open: var_x.map(|_| 3.40),
            two_open: Some(4.20),
            one_final: Some(1.80 + var_one),
            x_final: var_x.map(|dx| 3.40 + dx),
            two_final: Some(4.20 + var_two),
            var_one: Some(var_one),
            var_x,
            var_two: Some(var_two),
            open_captured_at: Some(Utc::now()),
            final_captured_at: Some(Utc::now()),
        }
    }

    fn result(event_id: i64, home: i32, away: i32) -> EventResult {
        EventResult::new(event_id, home, away, true, Utc::now()).unwrap()
    }

    fn candidate(event_id: i64, var_one: f64, var_x: Option<f64>, var_two: f64, home: i32, away: i32) -> HistoricalCandidate {
        HistoricalCandidate {
            event_id,
            home: "P".into(),
            away: "Q".into(),
            competition: "Comp".into(),
            odds: odds_with(event_id, var_one, var_x, var_two),
            result: result(event_id, home, away),
        }
    }

    #[test]
    fn unanimous_exact_tier_yields_success_tier_a() {
        let target = VariationVector { d1: 0.15, dx: Some(-0.05), d2: -0.20 };
        let history = vec![
            candidate(2, 0.15, Some(-0.05), -0.20, 3, 1),
            candidate(3, 0.15, Some(-0.05), -0.20, 3, 1),
        ];
        let profile = profile_for("football");
        let verdict = evaluate(&event(), &target, &history, &profile);
        match verdict {
            Verdict::Success(outcome) => {
                assert_eq!(outcome.variation_tier, VariationTier::Exact);
                assert_eq!(outcome.result_tier, ResultTier::A);
                assert_eq!(outcome.predicted_side, WinnerSide::One);
                assert_eq!(outcome.support_count, 2);
                assert_eq!(outcome.confidence_pct, 100);
                assert_eq!(outcome.point_diff, 2);
                assert_eq!(outcome.prediction, "winner=1, point_diff=2");
                assert_eq!(outcome.candidates.len(), 2);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn disagreement_among_exact_candidates_is_no_match_with_candidates_listed() {
        let target = VariationVector { d1: 0.15, dx: Some(-0.05), d2: -0.20 };
        let history = vec![
            candidate(2, 0.15, Some(-0.05), -0.20, 3, 1),
            candidate(3, 0.15, Some(-0.05), -0.20, 0, 2),
        ];
        let profile = profile_for("football");
        match evaluate(&event(), &target, &history, &profile) {
            Verdict::NoMatch(report) => assert_eq!(report.candidates.len(), 2),
            other => panic!("expected no-match, got {:?}", other),
        }
    }

    #[test]
    fn no_candidates_within_tau_is_no_candidates() {
        let target = VariationVector { d1: 0.50, dx: Some(0.50), d2: 0.50 };
        let history = vec![candidate(2, -0.30, Some(-0.30), -0.30, 1, 0)];
        let profile = profile_for("football");
        assert_eq!(evaluate(&event(), &target, &history, &profile), Verdict::NoCandidates);
    }

    #[test]
    fn near_tier_used_only_when_no_exact_candidates() {
        // 0.02 difference is within tau but not exactly equal at 2dp.
        let target = VariationVector { d1: 0.15, dx: Some(-0.05), d2: -0.20 };
        let history = vec![candidate(2, 0.17, Some(-0.06), -0.21, 2, 0)];
        let profile = profile_for("football");
        let verdict = evaluate(&event(), &target, &history, &profile);
        match verdict {
            Verdict::Success(outcome) => assert_eq!(outcome.variation_tier, VariationTier::Near),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn zero_component_matches_either_sign() {
        let target = VariationVector { d1: 0.0, dx: Some(-0.05), d2: -0.20 };
        let history = vec![candidate(2, 0.0, Some(-0.05), -0.20, 3, 1)];
        let profile = profile_for("football");
        assert!(matches!(evaluate(&event(), &target, &history, &profile), Verdict::Success(_)));
    }

    #[test]
    fn asymmetric_near_candidate_is_kept_but_excluded_from_unanimity() {
        // Both land in the near tier (neither is an exact d1 match), but
        // candidate 3's d1 carries the opposite sign of the target's.
        let target = VariationVector { d1: 0.02, dx: Some(-0.05), d2: -0.20 };
        let history = vec![
            candidate(2, 0.01, Some(-0.05), -0.20, 3, 1),
            candidate(3, -0.02, Some(-0.05), -0.20, 1, 3),
        ];
        let profile = profile_for("football");
        match evaluate(&event(), &target, &history, &profile) {
            Verdict::Success(outcome) => {
                assert_eq!(outcome.candidates.len(), 2);
                assert_eq!(outcome.support_count, 1);
                let asymmetric = outcome.candidates.iter().find(|c| c.event_id == 3).unwrap();
                assert!(!asymmetric.symmetric);
                let symmetric = outcome.candidates.iter().find(|c| c.event_id == 2).unwrap();
                assert!(symmetric.symmetric);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn self_candidate_is_never_matched() {
        let target = VariationVector { d1: 0.15, dx: Some(-0.05), d2: -0.20 };
        let history = vec![candidate(1, 0.15, Some(-0.05), -0.20, 3, 1)];
        let profile = profile_for("football");
        assert_eq!(evaluate(&event(), &target, &history, &profile), Verdict::NoCandidates);
    }

    #[test]
    fn result_tier_c_when_only_winner_agrees() {
        let target = VariationVector { d1: 0.15, dx: Some(-0.05), d2: -0.20 };
        let history = vec![
            candidate(2, 0.15, Some(-0.05), -0.20, 2, 0),
            candidate(3, 0.15, Some(-0.05), -0.20, 4, 1),
        ];
        let profile = profile_for("football");
        match evaluate(&event(), &target, &history, &profile) {
            Verdict::Success(outcome) => {
                assert_eq!(outcome.result_tier, ResultTier::C);
                assert_eq!(outcome.confidence_pct, 50);
                // diffs 2 and 3, mean 2.5 rounds to 3.
                assert_eq!(outcome.point_diff, 3);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn scenario_two_tier_c_rounds_mean_to_two() {
        let target = VariationVector { d1: 0.13, dx: Some(-0.05), d2: -0.08 };
        // Winner=1 throughout, with diffs 2, 1, 3 — mean exactly 2.0.
        let history = vec![
            candidate(2, 0.12, Some(-0.05), -0.07, 3, 1),
            candidate(3, 0.13, Some(-0.06), -0.08, 2, 1),
            candidate(4, 0.14, Some(-0.04), -0.09, 4, 1),
        ];
        let profile = profile_for("football");
        match evaluate(&event(), &target, &history, &profile) {
            Verdict::Success(outcome) => {
                assert_eq!(outcome.result_tier, ResultTier::C);
                assert_eq!(outcome.point_diff, 2);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }
}
