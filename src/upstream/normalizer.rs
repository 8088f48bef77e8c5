//! Raw upstream payload to canonical `OddsTriple`.
//!
//! Matches the head-to-head market by key, scans its outcomes against the
//! event's own team names, and propagates `Option` for absent quotes.
//! Handles both a variable-arity outcome set (2-way or 3-way) and feeds
//! that report fractional instead of decimal prices.

use crate::domain::OddsTriple;

use super::{RawEvent, RawMarket};

const H2H_MARKET_KEYS: &[&str] = &["h2h", "match_winner", "moneyline", "1x2"];

/// Extracts the canonical triple from an event's head-to-head market,
/// matching outcome names against `home_team`/`away_team` and accepting a
/// draw outcome only when `has_draw` is set. A market whose outcome count
/// doesn't match the sport's expected arity (2 for no draw, 3 for draw) is
/// rejected outright rather than guessed at.
pub fn normalize_h2h(event: &RawEvent, has_draw: bool) -> Option<OddsTriple> {
    let market = event
        .bookmakers
        .iter()
        .flat_map(|b| &b.markets)
        .find(|m| H2H_MARKET_KEYS.contains(&m.key.as_str()))?;

    extract_triple(market, &event.home_team, &event.away_team, has_draw)
}

fn extract_triple(market: &RawMarket, home_team: &str, away_team: &str, has_draw: bool) -> Option<OddsTriple> {
    let expected_arity = if has_draw { 3 } else { 2 };
    if market.outcomes.len() != expected_arity {
        return None;
    }

    let mut one = None;
    let mut two = None;
    let mut x = None;

    for outcome in &market.outcomes {
        let price = outcome.price.as_ref().and_then(parse_price)?;
        if outcome.name == home_team {
            one = Some(price);
        } else if outcome.name == away_team {
            two = Some(price);
        } else if has_draw && is_draw_label(&outcome.name) {
            x = Some(price);
        } else {
            // Outcome matches neither team nor a draw label — the feed's
            // naming doesn't line up with the event's own team names.
            return None;
        }
    }

    let (one, two) = (one?, two?);
    if has_draw && x.is_none() {
        return None;
    }

    Some(OddsTriple::new(one, x, two))
}

fn is_draw_label(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "draw" | "tie" | "x")
}

/// Decimal price passes through unchanged; a fractional price ("5/2") is
/// converted to decimal odds as `numerator / denominator + 1.0`.
fn parse_price(value: &serde_json::Value) -> Option<f64> {
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    let s = value.as_str()?;
    let (num, den) = s.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{RawBookmaker, RawOutcome};
    use serde_json::json;

    fn outcome(name: &str, price: serde_json::Value) -> RawOutcome {
        RawOutcome { name: name.to_string(), price: Some(price) }
    }

    fn event_with_market(key: &str, outcomes: Vec<RawOutcome>) -> RawEvent {
        RawEvent {
            home_team: "Home FC".into(),
            away_team: "Away FC".into(),
            bookmakers: vec![RawBookmaker {
                key: "book".into(),
                last_update: None,
                markets: vec![RawMarket { key: key.into(), outcomes }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn three_way_market_normalizes() {
        let event = event_with_market(
            "h2h",
            vec![
                outcome("Home FC", json!(1.85)),
                outcome("Draw", json!(3.40)),
                outcome("Away FC", json!(4.20)),
            ],
        );
        let triple = normalize_h2h(&event, true).unwrap();
        assert_eq!(triple.one, 1.850);
        assert_eq!(triple.x, Some(3.400));
        assert_eq!(triple.two, 4.200);
    }

    #[test]
    fn two_way_market_normalizes_with_no_draw_outcome() {
        let event = event_with_market(
            "moneyline",
            vec![outcome("Home FC", json!(1.50)), outcome("Away FC", json!(2.60))],
        );
        let triple = normalize_h2h(&event, false).unwrap();
        assert_eq!(triple.x, None);
    }

    #[test]
    fn fractional_price_converts_to_decimal() {
        let event = event_with_market(
            "h2h",
            vec![outcome("Home FC", json!("6/4")), outcome("Away FC", json!("1/2"))],
        );
        let triple = normalize_h2h(&event, false).unwrap();
        assert_eq!(triple.one, 2.500);
        assert_eq!(triple.two, 1.500);
    }

    #[test]
    fn arity_mismatch_rejected() {
        let event = event_with_market(
            "h2h",
            vec![
                outcome("Home FC", json!(1.85)),
                outcome("Draw", json!(3.40)),
                outcome("Away FC", json!(4.20)),
            ],
        );
        // Sport declared as no-draw but the market carries three outcomes.
        assert!(normalize_h2h(&event, false).is_none());
    }

    #[test]
    fn unrecognized_outcome_name_rejected() {
        let event = event_with_market(
            "h2h",
            vec![outcome("Home FC", json!(1.85)), outcome("Somebody Else", json!(4.20))],
        );
        assert!(normalize_h2h(&event, false).is_none());
    }
}
