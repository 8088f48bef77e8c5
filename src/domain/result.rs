//! `Result` — the immutable outcome of a finished event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WinnerSide {
    One,
    X,
    Two,
}

impl WinnerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinnerSide::One => "1",
            WinnerSide::X => "X",
            WinnerSide::Two => "2",
        }
    }

    /// Winner side from a final scoreline: `1` iff home > away, `2` iff away
    /// > home, `X` iff equal and the sport supports draws.
    pub fn from_score(home_score: i32, away_score: i32, has_draw: bool) -> Option<Self> {
        use std::cmp::Ordering::*;
        match home_score.cmp(&away_score) {
            Greater => Some(WinnerSide::One),
            Less => Some(WinnerSide::Two),
            Equal if has_draw => Some(WinnerSide::X),
            Equal => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventResult {
    pub event_id: i64,
    pub home_score: i32,
    pub away_score: i32,
    pub winner_side: String,
    pub point_diff: i32,
    pub collected_at: DateTime<Utc>,
}

impl EventResult {
    pub fn new(event_id: i64, home_score: i32, away_score: i32, has_draw: bool, collected_at: DateTime<Utc>) -> Option<Self> {
        let winner = WinnerSide::from_score(home_score, away_score, has_draw)?;
        Some(Self {
            event_id,
            home_score,
            away_score,
            winner_side: winner.as_str().to_string(),
            point_diff: (home_score - away_score).abs(),
            collected_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_side_home_win() {
        assert_eq!(WinnerSide::from_score(3, 1, true), Some(WinnerSide::One));
    }

    #[test]
    fn winner_side_away_win() {
        assert_eq!(WinnerSide::from_score(0, 2, true), Some(WinnerSide::Two));
    }

    #[test]
    fn winner_side_draw_only_when_supported() {
        assert_eq!(WinnerSide::from_score(1, 1, true), Some(WinnerSide::X));
        assert_eq!(WinnerSide::from_score(1, 1, false), None);
    }

    #[test]
    fn event_result_computes_point_diff() {
        let r = EventResult::new(1, 3, 1, true, Utc::now()).unwrap();
        assert_eq!(r.point_diff, 2);
        assert_eq!(r.winner_side, "1");
    }

    #[test]
    fn event_result_none_on_undecidable_draw() {
        assert!(EventResult::new(1, 1, 1, false, Utc::now()).is_none());
    }
}
