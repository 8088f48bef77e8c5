//! Per-job exclusivity flags and the job implementations themselves.
//!
//! Each job acquires its own flag before running so a slow discovery tick
//! can't overlap with the next one. Several independently scheduled jobs
//! share one `Runtime`, each guarded by its own flag rather than one big
//! owned loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{profile_for, Event, EventResult};
use crate::error::EngineError;
use crate::matcher::{self, Verdict};
use crate::notifier::Notifier;
use crate::repository::Repository;
use crate::runtime::Runtime;
use crate::upstream::{normalizer, UpstreamClient};

use super::checkpoint::checkpoint_for;

#[derive(Default)]
pub struct JobFlags {
    discovery: AtomicBool,
    pre_start: AtomicBool,
    midnight: AtomicBool,
    backfill: AtomicBool,
}

/// RAII guard releasing its flag on drop, including on an early return or a
/// panic unwind out of the job body.
pub struct JobGuard<'a>(&'a AtomicBool);

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl JobFlags {
    fn acquire(flag: &AtomicBool) -> Option<JobGuard<'_>> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| JobGuard(flag))
    }

    pub fn try_discovery(&self) -> Option<JobGuard<'_>> {
        Self::acquire(&self.discovery)
    }
    pub fn try_pre_start(&self) -> Option<JobGuard<'_>> {
        Self::acquire(&self.pre_start)
    }
    pub fn try_midnight(&self) -> Option<JobGuard<'_>> {
        Self::acquire(&self.midnight)
    }
    pub fn try_backfill(&self) -> Option<JobGuard<'_>> {
        Self::acquire(&self.backfill)
    }
}

/// Poll every configured sport for new/updated events and upsert them.
pub async fn run_discovery(runtime: &Runtime, client: &UpstreamClient) -> Result<usize, EngineError> {
    let Some(_guard) = runtime.job_flags.try_discovery() else {
        warn!("discovery already running, skipping tick");
        return Ok(0);
    };

    let repo = Repository::new(runtime.db.clone());
    let mut discovered = 0;

    for sport in runtime.config.sport_list() {
        let raw_events = client.fetch_events(&sport).await?;
        for raw in &raw_events {
            let Some(start_time) = raw.commence_time else { continue };
            let event_id = match raw.id.parse::<i64>() {
                Ok(id) => id,
                Err(_) => stable_id_from_string(&raw.id),
            };
            let event = Event {
                event_id,
                sport: sport.clone(),
                competition: String::new(),
                home: raw.home_team.clone(),
                away: raw.away_team.clone(),
                start_time,
                ground_type: None,
                status: "scheduled".to_string(),
                last_checked_at: Utc::now(),
            };
            repo.upsert_event(&event).await?;

            let profile = profile_for(&sport);
            if let Some(triple) = normalizer::normalize_h2h(raw, profile.has_draw()) {
                if triple.is_valid() {
                    repo.upsert_opening_odds(event_id, triple.one, triple.x, triple.two).await?;
                }
            }
            discovered += 1;
        }
    }

    info!("discovery processed {} events", discovered);
    Ok(discovered)
}

/// Sweep events approaching start, applying timestamp corrections and
/// capturing final odds at the 30- and 5-minute checkpoints.
pub async fn run_pre_start(runtime: &Runtime, client: &UpstreamClient) -> Result<usize, EngineError> {
    let Some(_guard) = runtime.job_flags.try_pre_start() else {
        warn!("pre-start sweep already running, skipping tick");
        return Ok(0);
    };

    let repo = Repository::new(runtime.db.clone());
    let now = Utc::now();
    let events = repo
        .events_starting_within(now, runtime.config.pre_start_window_minutes)
        .await?;

    let mut acted = 0;
    for event in events {
        let minutes_to_start = event.minutes_to_start(now).round() as i64;
        if checkpoint_for(minutes_to_start, runtime.config.poll_interval_minutes as i64).is_none() {
            continue;
        }

        if runtime.config.enable_timestamp_correction
            && !runtime.correction_cache.was_recently_corrected(event.event_id).await
        {
            if let Ok(Some(raw)) = client.fetch_event_odds(&event.sport, &event.event_id.to_string()).await {
                if let Some(corrected) = raw.commence_time {
                    if corrected != event.start_time {
                        let mut corrected_event = event.clone();
                        corrected_event.start_time = corrected;
                        repo.upsert_event(&corrected_event).await?;
                        runtime.correction_cache.mark_corrected(event.event_id).await;
                    }
                }
            }
        }

        // Finals are captured at both the T-30 and T-5 checkpoints (at most
        // two fetches per event total); the later checkpoint simply
        // overwrites the earlier capture with a fresher read.
        if let Ok(Some(raw)) = client.fetch_event_odds(&event.sport, &event.event_id.to_string()).await {
            let profile = profile_for(&event.sport);
            if let Some(triple) = normalizer::normalize_h2h(&raw, profile.has_draw()) {
                if triple.is_valid() {
                    repo.upsert_final_odds(event.event_id, triple.one, triple.x, triple.two).await?;
                }
            }
        }
        acted += 1;
    }

    Ok(acted)
}

/// Nightly sweep: collect results for everything past its sport's cutoff.
pub async fn run_midnight(runtime: &Runtime, client: &UpstreamClient) -> Result<usize, EngineError> {
    let Some(_guard) = runtime.job_flags.try_midnight() else {
        warn!("midnight sweep already running, skipping tick");
        return Ok(0);
    };
    collect_results(runtime, client, false).await
}

pub async fn run_backfill(runtime: &Runtime, client: &UpstreamClient) -> Result<usize, EngineError> {
    let Some(_guard) = runtime.job_flags.try_backfill() else {
        warn!("backfill already running, skipping tick");
        return Ok(0);
    };
    collect_results(runtime, client, true).await
}

async fn collect_results(runtime: &Runtime, client: &UpstreamClient, all_history: bool) -> Result<usize, EngineError> {
    let repo = Repository::new(runtime.db.clone());
    let now = Utc::now();
    let events = if all_history {
        repo.events_without_result_all().await?
    } else {
        repo.events_awaiting_result(now).await?
    };

    let mut collected = 0;
    for event in events {
        let profile = profile_for(&event.sport);
        let elapsed = now.signed_duration_since(event.start_time);
        if elapsed.to_std().map(|d| d < profile.result_cutoff).unwrap_or(true) {
            continue;
        }

        let Ok(Some(raw)) = client.fetch_event_odds(&event.sport, &event.event_id.to_string()).await else {
            continue;
        };
        let Some(status) = raw.status else { continue };
        let Some(code) = status.code else { continue };

        if crate::domain::CANCELLATION_CODES.contains(&code) {
            let mut cancelled = event.clone();
            cancelled.status = "cancelled".to_string();
            repo.upsert_event(&cancelled).await?;
            continue;
        }
        if !crate::domain::TERMINAL_RESULT_CODES.contains(&code) {
            continue;
        }

        let (Some(home_score), Some(away_score)) = (status.home_score, status.away_score) else {
            continue;
        };

        if let Some(result) = EventResult::new(event.event_id, home_score, away_score, profile.has_draw(), now) {
            repo.insert_result(&result).await?;
            collected += 1;
        }

        let mut finished = event.clone();
        finished.status = "finished".to_string();
        repo.upsert_event(&finished).await?;
    }

    Ok(collected)
}

/// Run the matcher against every pending prediction target and, when
/// notifications are enabled, publish the resulting report — `Success` and
/// `NoMatch` alike, since a `NoMatch` report still shows the candidates that
/// were found. `NoCandidates` carries nothing worth delivering.
pub async fn run_alerts(runtime: &Runtime, notifier: &Notifier, publish: bool) -> Result<Vec<Verdict>, EngineError> {
    let repo = Repository::new(runtime.db.clone());
    let targets = repo.events_pending_alert().await?;
    let mut verdicts = Vec::new();

    for event in targets {
        let Some(odds) = repo.get_odds_record(event.event_id).await? else { continue };
        let Some(vector) = odds.variation_vector() else { continue };
        let history = repo.historical_matches_for_sport(&event.sport, event.event_id).await?;
        let profile = profile_for(&event.sport);
        let verdict = matcher::evaluate(&event, &vector, &history, &profile);

        if publish {
            notifier.notify(&event, &verdict).await?;
        }
        verdicts.push(verdict);
    }

    Ok(verdicts)
}

fn stable_id_from_string(s: &str) -> i64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    (hasher.finish() as i64).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_flags_prevent_reentry() {
        let flags = JobFlags::default();
        let guard = flags.try_discovery();
        assert!(guard.is_some());
        assert!(flags.try_discovery().is_none());
        drop(guard);
        assert!(flags.try_discovery().is_some());
    }

    #[test]
    fn stable_id_is_deterministic() {
        assert_eq!(stable_id_from_string("abc123"), stable_id_from_string("abc123"));
    }
}
