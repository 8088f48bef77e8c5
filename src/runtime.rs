//! `Runtime` bundles the process-wide shared state — DB pool, HTTP client,
//! rate limiter, correction cache, scheduler flags — built once in `main`
//! and handed to every job, so several independently schedulable jobs can
//! share one set of connections and counters.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{Quota, RateLimiter};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::scheduler::correction::CorrectionCache;
use crate::scheduler::jobs::JobFlags;

type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

const MAX_BACKOFF_SECS: u64 = 30;

/// Shared, cloneable process state. Every field is already internally
/// synchronized (`PgPool`, `reqwest::Client`, and `Arc<...>` wrappers are all
/// cheap to clone), so `Runtime` itself derives `Clone` and is passed by
/// value into spawned tasks.
#[derive(Clone)]
pub struct Runtime {
    pub config: Arc<Config>,
    pub db: PgPool,
    pub http_client: reqwest::Client,
    pub rate_limiter: Arc<DirectRateLimiter>,
    pub correction_cache: CorrectionCache,
    pub job_flags: Arc<JobFlags>,
}

impl Runtime {
    pub async fn new(config: Config) -> Result<Self> {
        let db = Self::connect_db_with_retry(&config.database_url, config.max_retries).await?;

        let requests_per_minute = (60 / config.request_delay_seconds.max(1)).max(1) as u32;
        let rate_limiter = RateLimiter::direct(Quota::per_minute(
            NonZeroU32::new(requests_per_minute).unwrap(),
        ));

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(5)
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            );

        if config.proxy_enabled {
            let endpoint = config.proxy_endpoint.as_deref().context("PROXY_ENABLED but PROXY_ENDPOINT is unset")?;
            let username = config.proxy_username.as_deref().context("PROXY_ENABLED but PROXY_USERNAME is unset")?;
            let password = config.proxy_password().context("PROXY_ENABLED but PROXY_PASSWORD is unset")?;
            let proxy = reqwest::Proxy::all(endpoint)
                .context("invalid PROXY_ENDPOINT")?
                .basic_auth(username, &password);
            builder = builder.proxy(proxy);
        }

        let http_client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            db,
            http_client,
            rate_limiter: Arc::new(rate_limiter),
            correction_cache: CorrectionCache::new(Duration::from_secs(30 * 60)),
            job_flags: Arc::new(JobFlags::default()),
        })
    }

    async fn connect_db_with_retry(url: &str, max_retries: u32) -> Result<PgPool> {
        let mut attempt = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
            {
                Ok(pool) => {
                    info!("connected to database");
                    return Ok(pool);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(anyhow::anyhow!(
                            "failed to connect to database after {} attempts: {}",
                            max_retries,
                            e
                        ));
                    }
                    let backoff = 2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS);
                    warn!("database connection attempt {} failed: {}. retrying in {}s...", attempt, e, backoff);
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
            }
        }
    }
}
