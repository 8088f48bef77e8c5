//! Odds-pattern prediction engine: scheduled odds capture, normalization,
//! and history-tier matching.
//!
//! Run `start` to launch the scheduler, or any of the one-shot subcommands
//! to drive a single job manually (useful for backfills and ops scripts).

mod config;
mod domain;
mod error;
mod health;
mod matcher;
mod notifier;
mod repository;
mod runtime;
mod scheduler;
mod upstream;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use config::{Command, Config};
use health::HealthState;
use notifier::Notifier;
use repository::Repository;
use runtime::Runtime;
use upstream::UpstreamClient;

#[tokio::main]
async fn main() {
    let exit_code = match try_main().await {
        Ok(code) => code,
        Err(e) => {
            error!("fatal error: {:?}", e);
            e.downcast_ref::<error::EngineError>().map(|e| e.exit_code()).unwrap_or(2)
        }
    };
    std::process::exit(exit_code);
}

async fn try_main() -> Result<i32> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => return Err(error::EngineError::Config(e.to_string()).into()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("odds-pattern prediction engine starting");

    let runtime = Runtime::new(config)
        .await
        .map_err(|e| error::EngineError::Database(e.to_string()))?;
    let client = UpstreamClient::new(&runtime.config, runtime.http_client.clone(), runtime.rate_limiter.clone());
    let notifier = Notifier::new(
        runtime.http_client.clone(),
        runtime.config.telegram_bot_token(),
        runtime.config.telegram_chat_id.clone(),
        runtime.config.notifications_enabled,
        runtime.config.max_retries,
    );

    run_command(runtime, client, notifier).await
}

async fn run_command(runtime: Runtime, client: UpstreamClient, notifier: Notifier) -> Result<i32> {
    match runtime.config.command.clone() {
        Command::Start => {
            run_scheduler(runtime, client, notifier).await;
            Ok(0)
        }
        Command::Discovery => {
            let n = scheduler::jobs::run_discovery(&runtime, &client).await?;
            info!("discovery processed {} events", n);
            Ok(0)
        }
        Command::PreStart => {
            let n = scheduler::jobs::run_pre_start(&runtime, &client).await?;
            info!("pre-start sweep acted on {} events", n);
            Ok(0)
        }
        Command::Midnight => {
            let n = scheduler::jobs::run_midnight(&runtime, &client).await?;
            info!("midnight sweep collected {} results", n);
            Ok(0)
        }
        Command::Results => {
            let n = scheduler::jobs::run_backfill(&runtime, &client).await?;
            info!("result sweep collected {} results", n);
            Ok(0)
        }
        Command::ResultsAll => {
            let repo = Repository::new(runtime.db.clone());
            let events = repo.events_without_result_all().await?;
            info!("{} events still lack a recorded result", events.len());
            Ok(0)
        }
        Command::FinalOddsAll => {
            let repo = Repository::new(runtime.db.clone());
            let events = repo.events_without_final_odds().await?;
            let mut captured = 0;
            for event in events {
                let profile = domain::profile_for(&event.sport);
                if let Ok(Some(raw)) = client.fetch_event_odds(&event.sport, &event.event_id.to_string()).await {
                    if let Some(triple) = upstream::normalizer::normalize_h2h(&raw, profile.has_draw()) {
                        if triple.is_valid() {
                            repo.upsert_final_odds(event.event_id, triple.one, triple.x, triple.two).await?;
                            captured += 1;
                        }
                    }
                }
            }
            info!("captured final odds for {} events", captured);
            Ok(0)
        }
        Command::Alerts => {
            let verdicts = scheduler::jobs::run_alerts(&runtime, &notifier, false).await?;
            let successes = verdicts.iter().filter(|v| matches!(v, matcher::Verdict::Success(_))).count();
            info!("evaluated {} eligible events, {} matched", verdicts.len(), successes);
            Ok(0)
        }
        Command::RefreshAlerts => {
            let repo = Repository::new(runtime.db.clone());
            repo.refresh_alert_eligible_view().await?;
            info!("refreshed alert-eligible view");
            Ok(0)
        }
        Command::Status => {
            info!(
                "discovery every {}h, pre-start sweep every {}m, window {}m",
                runtime.config.discovery_interval_hours,
                runtime.config.poll_interval_minutes,
                runtime.config.pre_start_window_minutes
            );
            Ok(0)
        }
        Command::Events { limit } => {
            let repo = Repository::new(runtime.db.clone());
            let events = repo.list_recent_events(limit).await?;
            for event in events {
                println!(
                    "{}\t{}\t{} vs {}\t{}\t{}",
                    event.event_id, event.sport, event.home, event.away, event.start_time, event.status
                );
            }
            Ok(0)
        }
    }
}

async fn run_scheduler(runtime: Runtime, client: UpstreamClient, notifier: Notifier) {
    let health = HealthState::new();
    let health_for_server = health.clone();
    let port = runtime.config.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(health_for_server, port).await {
            error!("health server exited: {:?}", e);
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let shutdown_tx = Arc::new(std::sync::Mutex::new(Some(shutdown_tx)));

    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested, allowing in-flight work up to 30s to drain");
            if let Some(tx) = shutdown_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
        }
    });

    scheduler::run(runtime, client, notifier, health, shutdown_rx).await;
}
