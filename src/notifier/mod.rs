//! Telegram delivery for matcher verdicts.
//!
//! POSTs to `api.telegram.org/bot{token}/sendMessage` with HTML parse mode,
//! warning and continuing on a non-2xx response, with a retry-with-backoff
//! pass for transient delivery failures.

use std::time::Duration;

use tracing::warn;

use crate::domain::{Event, VariationVector};
use crate::error::EngineError;
use crate::matcher::{CandidateReport, MatchOutcome, NoMatchReport, Verdict};

const TELEGRAM_MESSAGE_LIMIT: usize = 4000;
const MAX_BACKOFF_SECS: u64 = 30;

pub struct Notifier {
    http: reqwest::Client,
    bot_token: Option<String>,
    chat_id: Option<String>,
    enabled: bool,
    max_retries: u32,
}

impl Notifier {
    pub fn new(http: reqwest::Client, bot_token: Option<String>, chat_id: Option<String>, enabled: bool, max_retries: u32) -> Self {
        Self { http, bot_token, chat_id, enabled, max_retries }
    }

    /// Delivers a verdict's report. Both `Success` and `NoMatch` are
    /// delivered (the latter still lists the candidates that were found so a
    /// reader can see why no prediction was made); `NoCandidates` is not, as
    /// there is nothing to report.
    pub async fn notify(&self, event: &Event, verdict: &Verdict) -> Result<(), EngineError> {
        let Some(message) = render_verdict(event, verdict) else { return Ok(()) };
        if !self.enabled {
            return Ok(());
        }
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            warn!("notifications enabled but telegram credentials are missing; skipping delivery");
            return Ok(());
        };

        for chunk in split_for_telegram(&message) {
            self.send_with_retry(token, chat_id, &chunk).await?;
        }
        Ok(())
    }

    async fn send_with_retry(&self, token: &str, chat_id: &str, text: &str) -> Result<(), EngineError> {
        let mut attempt = 0;
        loop {
            match self.send_once(token, chat_id, text).await {
                Ok(()) => return Ok(()),
                Err(EngineError::Notifier(msg)) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(EngineError::Notifier(msg));
                    }
                    let backoff = 2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS);
                    warn!("telegram delivery attempt {} failed: {}. retrying in {}s...", attempt, msg, backoff);
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn send_once(&self, token: &str, chat_id: &str, text: &str) -> Result<(), EngineError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .map_err(|e| EngineError::Notifier(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Notifier(format!("telegram returned {}: {}", status, body)));
        }
        Ok(())
    }
}

/// Renders the full message for a verdict, or `None` if there is nothing
/// worth sending (`NoCandidates`).
fn render_verdict(event: &Event, verdict: &Verdict) -> Option<String> {
    match verdict {
        Verdict::Success(outcome) => Some(render_success(event, outcome)),
        Verdict::NoMatch(report) => Some(render_no_match(event, report)),
        Verdict::NoCandidates => None,
    }
}

fn render_success(event: &Event, outcome: &MatchOutcome) -> String {
    format!(
        "<b>{} vs {}</b>\n\
         Sport: {}\n\
         Prediction: {}\n\
         Confidence: {}%\n\
         Variation tier: {:?}\n\
         Result tier: {:?}\n\
         Supporting history: {} event(s)\n\
         {}",
        event.home,
        event.away,
        event.sport,
        outcome.prediction,
        outcome.confidence_pct,
        outcome.variation_tier,
        outcome.result_tier,
        outcome.support_count,
        render_candidates(&outcome.candidates),
    )
}

fn render_no_match(event: &Event, report: &NoMatchReport) -> String {
    format!(
        "<b>{} vs {}</b>\n\
         Sport: {}\n\
         NO_MATCH: candidates found but did not unanimously agree on a winner\n\
         Variation tier: {:?}\n\
         {}",
        event.home,
        event.away,
        event.sport,
        report.variation_tier,
        render_candidates(&report.candidates),
    )
}

fn render_candidates(candidates: &[CandidateReport]) -> String {
    let mut lines = vec![format!("Candidates ({}):", candidates.len())];
    for c in candidates {
        lines.push(format!(
            "- #{} {} vs {} ({}) | vector={} diff={} | winner={} point_diff={} | symmetric={}",
            c.event_id,
            c.home,
            c.away,
            c.competition,
            fmt_vector(&c.variation_vector),
            fmt_vector(&c.diff),
            c.winner_side.as_str(),
            c.point_diff,
            c.symmetric,
        ));
    }
    lines.join("\n")
}

fn fmt_vector(v: &VariationVector) -> String {
    match v.dx {
        Some(dx) => format!("({:.2}, {:.2}, {:.2})", v.d1, dx, v.d2),
        None => format!("({:.2}, -, {:.2})", v.d1, v.d2),
    }
}

/// Splits an overlong message on line boundaries so no chunk exceeds
/// Telegram's message-length limit and no line is cut mid-sentence.
fn split_for_telegram(message: &str) -> Vec<String> {
    if message.len() <= TELEGRAM_MESSAGE_LIMIT {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in message.lines() {
        if current.len() + line.len() + 1 > TELEGRAM_MESSAGE_LIMIT && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WinnerSide;
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

    fn candidate_report(event_id: i64, symmetric: bool) -> CandidateReport {
        CandidateReport {
            event_id,
            home: "P".into(),
            away: "Q".into(),
            competition: "Comp".into(),
            variation_vector: VariationVector { d1: 0.15, dx: Some(-0.05), d2: -0.20 },
            diff: VariationVector { d1: 0.0, dx: Some(0.0), d2: 0.0 },
            winner_side: WinnerSide::One,
            point_diff: 2,
            symmetric,
        }
    }

    #[test]
    fn short_message_is_single_chunk() {
        assert_eq!(split_for_telegram("hello").len(), 1);
    }

    #[test]
    fn long_message_splits_on_line_boundaries() {
        let line = "x".repeat(100);
        let message = std::iter::repeat(line).take(60).collect::<Vec<_>>().join("\n");
        let chunks = split_for_telegram(&message);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= TELEGRAM_MESSAGE_LIMIT);
        }
        assert_eq!(chunks.join("\n"), message);
    }

    #[test]
    fn no_candidates_verdict_renders_nothing() {
        assert!(render_verdict(&event(), &Verdict::NoCandidates).is_none());
    }

    #[test]
    fn success_message_includes_prediction_and_candidates() {
        let outcome = MatchOutcome {
            variation_tier: crate::matcher::VariationTier::Exact,
            candidates: vec![candidate_report(2, true)],
            result_tier: crate::matcher::ResultTier::A,
            predicted_side: WinnerSide::One,
            point_diff: 2,
            confidence_pct: 100,
            support_count: 1,
            prediction: "winner=1, point_diff=2".into(),
        };
        let message = render_verdict(&event(), &Verdict::Success(outcome)).unwrap();
        assert!(message.contains("winner=1, point_diff=2"));
        assert!(message.contains("Confidence: 100%"));
        assert!(message.contains("symmetric=true"));
    }

    #[test]
    fn no_match_message_lists_candidates_without_a_prediction() {
        let report = NoMatchReport {
            variation_tier: crate::matcher::VariationTier::Near,
            candidates: vec![candidate_report(2, true), candidate_report(3, false)],
        };
        let message = render_verdict(&event(), &Verdict::NoMatch(report)).unwrap();
        assert!(message.contains("NO_MATCH"));
        assert!(message.contains("Candidates (2):"));
        assert!(message.contains("symmetric=false"));
    }
}
