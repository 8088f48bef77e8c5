//! Per-sport capability table.
//!
//! Draw support, result-cutoff duration, and ground-type applicability vary by
//! sport. Expressed here as data looked up by a sport key rather than as a
//! trait-object hierarchy: the variant set is closed and the differences are
//! a handful of scalars, not behavior.

use std::time::Duration;

/// The three capability shapes a sport can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportKind {
    /// 2-way market, no draw, ground surface matters (tennis and similar).
    TwoWayRacket,
    /// 3-way market with a draw outcome (football/soccer and similar).
    ThreeWayTeam,
    /// 2-way market, no draw, overtime/extra periods fold into the final score
    /// (basketball, baseball and similar).
    TwoWayTeamWithOvertime,
}

#[derive(Debug, Clone, Copy)]
pub struct SportProfile {
    pub kind: SportKind,
    /// Grace period after `start_time` before a result may be requested.
    pub result_cutoff: Duration,
}

impl SportProfile {
    pub fn has_draw(&self) -> bool {
        self.kind == SportKind::ThreeWayTeam
    }

    pub fn has_ground_type(&self) -> bool {
        self.kind == SportKind::TwoWayRacket
    }
}

const DEFAULT_CUTOFF_HOURS: u64 = 3;

/// Look up the capability profile for a sport key (case-insensitive).
///
/// Unknown sports fall back to a 3-way team profile with the default 3h
/// cutoff and no ground type — the most permissive shape, so an unrecognized
/// upstream sport key degrades gracefully instead of panicking.
pub fn profile_for(sport: &str) -> SportProfile {
    match sport.to_ascii_lowercase().as_str() {
        "football" | "soccer" | "futsal" => SportProfile {
            kind: SportKind::ThreeWayTeam,
            result_cutoff: Duration::from_secs_f64(2.5 * 3600.0),
        },
        "tennis" => SportProfile {
            kind: SportKind::TwoWayRacket,
            result_cutoff: Duration::from_secs(4 * 3600),
        },
        "baseball" => SportProfile {
            kind: SportKind::TwoWayTeamWithOvertime,
            result_cutoff: Duration::from_secs(4 * 3600),
        },
        "basketball" => SportProfile {
            kind: SportKind::TwoWayTeamWithOvertime,
            result_cutoff: Duration::from_secs(3 * 3600),
        },
        "badminton" | "table_tennis" | "squash" => SportProfile {
            kind: SportKind::TwoWayRacket,
            result_cutoff: Duration::from_secs(DEFAULT_CUTOFF_HOURS * 3600),
        },
        _ => SportProfile {
            kind: SportKind::ThreeWayTeam,
            result_cutoff: Duration::from_secs(DEFAULT_CUTOFF_HOURS * 3600),
        },
    }
}

/// Upstream terminal status codes for which a `Result` may be written.
pub const TERMINAL_RESULT_CODES: &[i32] = &[100, 110, 92, 120, 130, 140];

/// Upstream cancellation status codes: event is marked terminal, no `Result`.
pub const CANCELLATION_CODES: &[i32] = &[70, 80, 90];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn football_has_draw_and_2_5h_cutoff() {
        let p = profile_for("football");
        assert!(p.has_draw());
        assert!(!p.has_ground_type());
        assert_eq!(p.result_cutoff, Duration::from_secs(9000));
    }

    #[test]
    fn tennis_has_ground_type_no_draw() {
        let p = profile_for("tennis");
        assert!(!p.has_draw());
        assert!(p.has_ground_type());
        assert_eq!(p.result_cutoff, Duration::from_secs(4 * 3600));
    }

    #[test]
    fn basketball_no_draw_3h_cutoff() {
        let p = profile_for("Basketball");
        assert!(!p.has_draw());
        assert_eq!(p.result_cutoff, Duration::from_secs(3 * 3600));
    }

    #[test]
    fn unknown_sport_falls_back_to_default() {
        let p = profile_for("curling");
        assert!(p.has_draw());
        assert_eq!(p.result_cutoff, Duration::from_secs(DEFAULT_CUTOFF_HOURS * 3600));
    }
}
