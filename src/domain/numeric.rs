//! Fixed-precision helpers shared by the normalizer and the matcher.
//!
//! All stored odds are truncated, not rounded, to a fixed number of fractional
//! digits: 3 for raw decimal quotes, 2 for variation deltas.

/// Truncate `value` to `decimals` fractional digits (toward zero).
pub fn truncate_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).trunc() / factor
}

pub fn truncate_raw(value: f64) -> f64 {
    truncate_to(value, 3)
}

pub fn truncate_variation(value: f64) -> f64 {
    truncate_to(value, 2)
}

/// Compare two already-truncated 2-decimal values for exact equality,
/// tolerant of floating-point representation error.
pub fn approx_eq_2dp(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

/// `|a - b| <= tau`, inclusive, with floating-point tolerance.
pub fn within_tau(a: f64, b: f64, tau: f64) -> bool {
    (a - b).abs() <= tau + 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_does_not_round() {
        assert_eq!(truncate_to(1.9999, 2), 1.99);
        assert_eq!(truncate_to(-0.125, 2), -0.12);
    }

    #[test]
    fn truncate_raw_keeps_three_digits() {
        assert_eq!(truncate_raw(1.8337), 1.833);
    }

    #[test]
    fn within_tau_is_inclusive() {
        assert!(within_tau(0.15, 0.11, 0.0401));
        assert!(!within_tau(0.15, 0.10, 0.0401));
    }

    #[test]
    fn approx_eq_handles_float_noise() {
        assert!(approx_eq_2dp(0.1 + 0.2 - 0.3, 0.0));
    }
}
