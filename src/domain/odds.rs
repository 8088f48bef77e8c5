//! `OddsRecord` — one opening/final odds pair per event, plus the canonical
//! triple type the normalizer produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::numeric::truncate_raw;

/// A canonical home/draw/away decimal-odds triple. `x` is `None` for 2-way
/// sports and for any market where the draw quote was invalid or absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsTriple {
    pub one: f64,
    pub x: Option<f64>,
    pub two: f64,
}

impl OddsTriple {
    pub fn new(one: f64, x: Option<f64>, two: f64) -> Self {
        Self {
            one: truncate_raw(one),
            x: x.map(truncate_raw),
            two: truncate_raw(two),
        }
    }

    /// Minimum valid decimal quote; anything lower is a feed error, not odds.
    pub const MIN_QUOTE: f64 = 1.001;

    pub fn is_valid(&self) -> bool {
        self.one >= Self::MIN_QUOTE
            && self.two >= Self::MIN_QUOTE
            && self.x.map_or(true, |x| x >= Self::MIN_QUOTE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OddsRecord {
    pub event_id: i64,
    pub one_open: Option<f64>,
    pub x_open: Option<f64>,
    pub two_open: Option<f64>,
    pub one_final: Option<f64>,
    pub x_final: Option<f64>,
    pub two_final: Option<f64>,
    pub var_one: Option<f64>,
    pub var_x: Option<f64>,
    pub var_two: Option<f64>,
    pub open_captured_at: Option<DateTime<Utc>>,
    pub final_captured_at: Option<DateTime<Utc>>,
}

/// A fully-formed variation vector, ready for matching. `dx` is `None` when
/// the event's sport has no draw, or the current event's `ΔX` is null (in
/// which case the event is treated as 2-way for matching purposes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariationVector {
    pub d1: f64,
    pub dx: Option<f64>,
    pub d2: f64,
}

impl OddsRecord {
    /// Build the variation vector for this record, if both opening and final
    /// odds are present for every non-null component. Returns `None` if the
    /// record is incomplete (missing a final, or a 1/2 opening quote).
    pub fn variation_vector(&self) -> Option<VariationVector> {
        let d1 = self.var_one?;
        let d2 = self.var_two?;
        // A present x_open/x_final pair yields Some(dx); absence of either
        // (2-way sport, or a null quote) yields None — treated as 2-way.
        let dx = match (self.x_open, self.x_final) {
            (Some(_), Some(_)) => self.var_x,
            _ => None,
        };
        Some(VariationVector { d1, dx, d2 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_truncates_to_three_decimals() {
        let t = OddsTriple::new(1.8337, Some(3.5019), 4.201);
        assert_eq!(t.one, 1.833);
        assert_eq!(t.x, Some(3.501));
        assert_eq!(t.two, 4.201);
    }

    #[test]
    fn triple_rejects_sub_minimum_quotes() {
        let t = OddsTriple::new(1.0, None, 2.0);
        assert!(!t.is_valid());
        let t2 = OddsTriple::new(1.5, None, 2.0);
        assert!(t2.is_valid());
    }

    fn complete_record() -> OddsRecord {
        OddsRecord {
            event_id: 1,
            one_open: Some(1.80),
            x_open: Some(3.40),
            two_open: Some(4.20),
            one_final: Some(1.95),
            x_final: Some(3.35),
            two_final: Some(4.00),
            var_one: Some(0.15),
            var_x: Some(-0.05),
            var_two: Some(-0.20),
            open_captured_at: Some(Utc::now()),
            final_captured_at: Some(Utc::now()),
        }
    }

    #[test]
    fn variation_vector_present_when_complete() {
        let v = complete_record().variation_vector().unwrap();
        assert_eq!(v.d1, 0.15);
        assert_eq!(v.dx, Some(-0.05));
        assert_eq!(v.d2, -0.20);
    }

    #[test]
    fn variation_vector_none_when_final_missing() {
        let mut r = complete_record();
        r.var_one = None;
        assert!(r.variation_vector().is_none());
    }

    #[test]
    fn variation_vector_treats_missing_draw_as_two_way() {
        let mut r = complete_record();
        r.x_open = None;
        r.x_final = None;
        r.var_x = Some(-0.05); // stale/irrelevant — must still be ignored
        let v = r.variation_vector().unwrap();
        assert_eq!(v.dx, None);
    }
}
