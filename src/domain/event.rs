//! `Event` — a scheduled sporting contest, keyed by the upstream's opaque id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an `Event`, derived from the upstream status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    InProgress,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub event_id: i64,
    pub sport: String,
    pub competition: String,
    pub home: String,
    pub away: String,
    pub start_time: DateTime<Utc>,
    pub ground_type: Option<String>,
    pub status: String,
    pub last_checked_at: DateTime<Utc>,
}

impl Event {
    pub fn status(&self) -> EventStatus {
        match self.status.as_str() {
            "finished" => EventStatus::Finished,
            "cancelled" => EventStatus::Cancelled,
            "in_progress" => EventStatus::InProgress,
            _ => EventStatus::Scheduled,
        }
    }

    pub fn minutes_to_start(&self, now: DateTime<Utc>) -> f64 {
        (self.start_time - now).num_seconds() as f64 / 60.0
    }
}

/// A single row returned by the upstream discovery/event-odds endpoints,
/// before it has been reconciled against the stored `Event`.
#[derive(Debug, Clone)]
pub struct UpstreamEventRecord {
    pub event_id: i64,
    pub sport: String,
    pub competition: String,
    pub home: String,
    pub away: String,
    pub start_time: DateTime<Utc>,
    pub ground_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: &str) -> Event {
        Event {
            event_id: 1,
            sport: "tennis".into(),
            competition: "ATP".into(),
            home: "Player A".into(),
            away: "Player B".into(),
            start_time: Utc::now(),
            ground_type: Some("hard".into()),
            status: status.into(),
            last_checked_at: Utc::now(),
        }
    }

    #[test]
    fn status_maps_known_strings() {
        assert_eq!(sample("finished").status(), EventStatus::Finished);
        assert_eq!(sample("cancelled").status(), EventStatus::Cancelled);
        assert_eq!(sample("in_progress").status(), EventStatus::InProgress);
        assert_eq!(sample("scheduled").status(), EventStatus::Scheduled);
        assert_eq!(sample("anything_else").status(), EventStatus::Scheduled);
    }

    #[test]
    fn minutes_to_start_is_positive_before_kickoff() {
        let mut e = sample("scheduled");
        e.start_time = Utc::now() + chrono::Duration::minutes(30);
        let m = e.minutes_to_start(Utc::now());
        assert!((29.0..=30.0).contains(&m));
    }
}
