//! Upstream odds feed: wire types, HTTP client, and normalization into the
//! canonical domain model.

pub mod client;
pub mod normalizer;

pub use client::UpstreamClient;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Raw event payload as the upstream feed returns it. Field names mirror the
/// feed's own JSON; `#[serde(default)]` on every struct means a field the
/// feed omits simply decodes as empty/`None` rather than failing the parse.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawEvent {
    pub id: String,
    pub sport_key: String,
    pub commence_time: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub status: Option<RawStatus>,
    pub bookmakers: Vec<RawBookmaker>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawStatus {
    pub code: Option<i32>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawBookmaker {
    pub key: String,
    pub last_update: Option<DateTime<Utc>>,
    pub markets: Vec<RawMarket>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawMarket {
    pub key: String,
    pub outcomes: Vec<RawOutcome>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawOutcome {
    pub name: String,
    /// Decimal odds, or a fractional string ("5/2") for feeds that report
    /// fractional prices — `normalizer` handles both.
    pub price: Option<serde_json::Value>,
}
