//! Postgres access layer.
//!
//! Built on `sqlx::query`/`query_as`/`query_scalar`, with
//! `ON CONFLICT ... DO UPDATE`/`DO NOTHING` upserts where a row may already
//! exist from an earlier sweep.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Event, EventResult, OddsRecord};
use crate::error::EngineError;
use crate::matcher::HistoricalCandidate;

fn db_err(e: sqlx::Error) -> EngineError {
    EngineError::Database(e.to_string())
}

pub struct Repository {
    pool: PgPool,
}

impl Repository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a newly-discovered event, or refresh its start time and status
    /// if the upstream feed has since corrected them.
    pub async fn upsert_event(&self, event: &Event) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO events (event_id, sport, competition, home, away, start_time, ground_type, status, last_checked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (event_id) DO UPDATE SET
                start_time = EXCLUDED.start_time,
                status = EXCLUDED.status,
                ground_type = COALESCE(EXCLUDED.ground_type, events.ground_type),
                last_checked_at = now()
            "#,
        )
        .bind(event.event_id)
        .bind(&event.sport)
        .bind(&event.competition)
        .bind(&event.home)
        .bind(&event.away)
        .bind(event.start_time)
        .bind(&event.ground_type)
        .bind(&event.status)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn get_event(&self, event_id: i64) -> Result<Option<Event>, EngineError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn list_recent_events(&self, limit: i64) -> Result<Vec<Event>, EngineError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY start_time DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Events whose start time falls within `window` minutes from `now`,
    /// used by the pre-start sweep.
    pub async fn events_starting_within(
        &self,
        now: DateTime<Utc>,
        window_minutes: i64,
    ) -> Result<Vec<Event>, EngineError> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE status = 'scheduled'
              AND start_time > $1
              AND start_time <= $1 + make_interval(mins => $2::int)
            ORDER BY start_time ASC
            "#,
        )
        .bind(now)
        .bind(window_minutes as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Events past their sport's result cutoff that still have no result row.
    pub async fn events_awaiting_result(&self, now: DateTime<Utc>) -> Result<Vec<Event>, EngineError> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT e.* FROM events e
            LEFT JOIN results r ON r.event_id = e.event_id
            WHERE r.event_id IS NULL
              AND e.status <> 'cancelled'
              AND e.start_time < $1
            ORDER BY e.start_time ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn events_without_result_all(&self) -> Result<Vec<Event>, EngineError> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT e.* FROM events e
            LEFT JOIN results r ON r.event_id = e.event_id
            WHERE r.event_id IS NULL AND e.status <> 'cancelled'
            ORDER BY e.start_time ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn events_without_final_odds(&self) -> Result<Vec<Event>, EngineError> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT e.* FROM events e
            JOIN odds_records o ON o.event_id = e.event_id
            WHERE o.one_final IS NULL
            ORDER BY e.start_time ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn upsert_opening_odds(&self, event_id: i64, one: f64, x: Option<f64>, two: f64) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO odds_records (event_id, one_open, x_open, two_open, open_captured_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (event_id) DO UPDATE SET
                one_open = COALESCE(odds_records.one_open, EXCLUDED.one_open),
                x_open = COALESCE(odds_records.x_open, EXCLUDED.x_open),
                two_open = COALESCE(odds_records.two_open, EXCLUDED.two_open),
                open_captured_at = COALESCE(odds_records.open_captured_at, EXCLUDED.open_captured_at)
            "#,
        )
        .bind(event_id)
        .bind(one)
        .bind(x)
        .bind(two)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn upsert_final_odds(&self, event_id: i64, one: f64, x: Option<f64>, two: f64) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO odds_records (event_id, one_final, x_final, two_final, final_captured_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (event_id) DO UPDATE SET
                one_final = EXCLUDED.one_final,
                x_final = EXCLUDED.x_final,
                two_final = EXCLUDED.two_final,
                final_captured_at = now()
            "#,
        )
        .bind(event_id)
        .bind(one)
        .bind(x)
        .bind(two)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn get_odds_record(&self, event_id: i64) -> Result<Option<OddsRecord>, EngineError> {
        sqlx::query_as::<_, OddsRecord>("SELECT * FROM odds_records WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn insert_result(&self, result: &EventResult) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO results (event_id, home_score, away_score, winner_side, collected_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(result.event_id)
        .bind(result.home_score)
        .bind(result.away_score)
        .bind(&result.winner_side)
        .bind(result.collected_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Every historical (event, odds, result) row for a sport, drawn from
    /// the `alert_eligible` search space, used as the candidate pool for the
    /// history matcher. `exclude_event_id` keeps a target event from ever
    /// matching against itself; the matcher also re-checks this
    /// independently of how it was queried.
    pub async fn historical_matches_for_sport(
        &self,
        sport: &str,
        exclude_event_id: i64,
    ) -> Result<Vec<HistoricalCandidate>, EngineError> {
        let rows = sqlx::query_as::<_, HistoricalRow>(
            r#"
            SELECT * FROM alert_eligible
            WHERE sport = $1 AND event_id <> $2
            "#,
        )
        .bind(sport)
        .bind(exclude_event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(HistoricalRow::into_candidate).collect())
    }

    pub async fn refresh_alert_eligible_view(&self) -> Result<(), EngineError> {
        sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY alert_eligible")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Scheduled events with a captured opening triple — the matcher's
    /// prediction targets. Distinct from `alert_eligible`, which is the
    /// *resulted* search space the matcher draws candidates from.
    pub async fn events_pending_alert(&self) -> Result<Vec<Event>, EngineError> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT e.* FROM events e
            JOIN odds_records o ON o.event_id = e.event_id
            WHERE e.status = 'scheduled'
              AND o.one_open IS NOT NULL
              AND o.two_open IS NOT NULL
            ORDER BY e.start_time ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[derive(sqlx::FromRow)]
struct HistoricalRow {
    event_id: i64,
    home: String,
    away: String,
    competition: String,
    one_open: Option<f64>,
    x_open: Option<f64>,
    two_open: Option<f64>,
    one_final: Option<f64>,
    x_final: Option<f64>,
    two_final: Option<f64>,
    var_one: Option<f64>,
    var_x: Option<f64>,
    var_two: Option<f64>,
    open_captured_at: Option<DateTime<Utc>>,
    final_captured_at: Option<DateTime<Utc>>,
    home_score: i32,
    away_score: i32,
    winner_side: String,
    point_diff: i32,
    result_collected_at: DateTime<Utc>,
}

impl HistoricalRow {
    fn into_candidate(self) -> HistoricalCandidate {
        HistoricalCandidate {
            event_id: self.event_id,
            home: self.home,
            away: self.away,
            competition: self.competition,
            odds: OddsRecord {
                event_id: self.event_id,
                one_open: self.one_open,
                x_open: self.x_open,
                two_open: self.two_open,
                one_final: self.one_final,
                x_final: self.x_final,
                two_final: self.two_final,
                var_one: self.var_one,
                var_x: self.var_x,
                var_two: self.var_two,
                open_captured_at: self.open_captured_at,
                final_captured_at: self.final_captured_at,
            },
            result: EventResult {
                event_id: self.event_id,
                home_score: self.home_score,
                away_score: self.away_score,
                winner_side: self.winner_side,
                point_diff: self.point_diff,
                collected_at: self.result_collected_at,
            },
        }
    }
}
