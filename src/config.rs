//! Environment/CLI configuration.
//!
//! Every tunable is readable both as an environment variable and as a CLI
//! flag (via clap's `env` attribute), for services with a large flat
//! settings surface. Secret material prefers a Docker-secret file when
//! present, falling back to the env var.

use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "oddspattern-engine", version, about)]
pub struct Config {
    /// Connection string to the Postgres-compatible store.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Pre-start sweep cadence, in minutes.
    #[arg(long, env = "POLL_INTERVAL_MINUTES", default_value = "5")]
    pub poll_interval_minutes: u64,

    /// Discovery cadence, in hours, aligned to wall clock.
    #[arg(long, env = "DISCOVERY_INTERVAL_HOURS", default_value = "2")]
    pub discovery_interval_hours: u64,

    /// Upper bound of the pre-start window, in minutes.
    #[arg(long, env = "PRE_START_WINDOW_MINUTES", default_value = "30")]
    pub pre_start_window_minutes: i64,

    /// Display timezone for rendered reports; internal state stays UTC.
    #[arg(long, env = "TIMEZONE", default_value = "UTC")]
    pub timezone: String,

    /// Threshold for the structured logger (passed straight to `tracing`'s
    /// `EnvFilter`).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Minimum spacing between upstream calls, in seconds.
    #[arg(long, env = "REQUEST_DELAY_SECONDS", default_value = "1")]
    pub request_delay_seconds: u64,

    /// Retries for transient upstream failures.
    #[arg(long, env = "MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    /// Gate on the notifier; verdicts are still computed and logged when off.
    #[arg(long, env = "NOTIFICATIONS_ENABLED", default_value = "true")]
    pub notifications_enabled: bool,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    #[arg(long, env = "PROXY_ENABLED", default_value = "false")]
    pub proxy_enabled: bool,

    #[arg(long, env = "PROXY_USERNAME")]
    pub proxy_username: Option<String>,

    #[arg(long, env = "PROXY_PASSWORD")]
    pub proxy_password: Option<String>,

    #[arg(long, env = "PROXY_ENDPOINT")]
    pub proxy_endpoint: Option<String>,

    /// Toggle the timestamp-correction subsystem.
    #[arg(long, env = "ENABLE_TIMESTAMP_CORRECTION", default_value = "true")]
    pub enable_timestamp_correction: bool,

    /// Worker pool size for fanning out per-event work within a tick.
    #[arg(long, env = "WORKER_POOL_SIZE", default_value = "4")]
    pub worker_pool_size: usize,

    /// Health/status HTTP server bind port.
    #[arg(long, env = "HEALTH_PORT", default_value = "8080")]
    pub health_port: u16,

    /// Comma-separated sport keys the discovery job polls.
    #[arg(long, env = "SPORTS", default_value = "football,tennis,basketball,baseball,futsal")]
    pub sports: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the scheduler until terminated.
    Start,
    /// One-shot discovery job invocation.
    Discovery,
    /// One-shot pre-start sweep invocation.
    PreStart,
    /// One-shot midnight result sweep invocation.
    Midnight,
    /// One-shot result backfill over events from the last 24h.
    Results,
    /// One-shot result backfill over the entire history lacking results.
    ResultsAll,
    /// Fetch final odds for every event still missing them.
    FinalOddsAll,
    /// Run the matcher over all events in the pre-start window without
    /// publishing to the notifier.
    Alerts,
    /// Force a refresh of the materialized alert-eligible view.
    RefreshAlerts,
    /// Print scheduler state and the next scheduled tick per job.
    Status,
    /// Print the N most recent events.
    Events {
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

impl Config {
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let config = Config::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL is required"));
        }
        if self.poll_interval_minutes == 0 {
            return Err(anyhow!("POLL_INTERVAL_MINUTES must be positive"));
        }
        if self.discovery_interval_hours == 0 || self.discovery_interval_hours > 24 {
            return Err(anyhow!("DISCOVERY_INTERVAL_HOURS must be between 1 and 24"));
        }
        if self.pre_start_window_minutes <= 0 {
            return Err(anyhow!("PRE_START_WINDOW_MINUTES must be positive"));
        }
        if self.request_delay_seconds == 0 {
            return Err(anyhow!("REQUEST_DELAY_SECONDS must be positive"));
        }
        if self.max_retries == 0 {
            return Err(anyhow!("MAX_RETRIES must be positive"));
        }
        if self.worker_pool_size == 0 {
            return Err(anyhow!("WORKER_POOL_SIZE must be positive"));
        }
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow!("TIMEZONE '{}' is not a recognized IANA timezone", self.timezone))?;
        if self.notifications_enabled
            && (self.telegram_bot_token.is_none() || self.telegram_chat_id.is_none())
        {
            tracing::warn!(
                "NOTIFICATIONS_ENABLED is true but TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID are unset; \
                 verdicts will be computed and logged but not delivered"
            );
        }
        if self.proxy_enabled
            && (self.proxy_username.is_none()
                || self.proxy_password.is_none()
                || self.proxy_endpoint.is_none())
        {
            return Err(anyhow!(
                "PROXY_ENABLED is true but PROXY_USERNAME/PROXY_PASSWORD/PROXY_ENDPOINT are incomplete"
            ));
        }
        Ok(())
    }

    /// Read a secret, preferring a Docker-secret file at
    /// `/run/secrets/<name>` over the field already loaded from env, so
    /// deployments can choose either mechanism.
    pub fn resolve_secret(name: &str, env_value: Option<String>) -> Option<String> {
        let secret_path = format!("/run/secrets/{}", name);
        if Path::new(&secret_path).exists() {
            return std::fs::read_to_string(&secret_path)
                .ok()
                .map(|s| s.trim().to_string());
        }
        env_value
    }

    pub fn telegram_bot_token(&self) -> Option<String> {
        Self::resolve_secret("telegram_bot_token", self.telegram_bot_token.clone())
    }

    pub fn proxy_password(&self) -> Option<String> {
        Self::resolve_secret("proxy_password", self.proxy_password.clone())
    }

    pub fn sport_list(&self) -> Vec<String> {
        self.sports.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}
