//! Avvisi Bot — Binary Entrypoint
//! Polls the UMG Medicina avvisi page and pushes new notices to
//! Telegram subscribers. Runs until externally stopped.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use avvisi_bot::bot;
use avvisi_bot::checker::{spawn_scheduler, Checker, RunKind};
use avvisi_bot::config::AppConfig;
use avvisi_bot::notify::telegram::TelegramTransport;
use avvisi_bot::notify::Notifier;
use avvisi_bot::source::HttpNoticeSource;
use avvisi_bot::state::SeenStore;
use avvisi_bot::subscribers::SubscriberStore;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("avvisi_bot=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when vars come from the environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env()?;
    tracing::info!(source = %cfg.source_url, interval = ?cfg.check_interval, "starting");

    let client = reqwest::Client::new();
    let transport = TelegramTransport::new(cfg.token.clone(), client.clone(), cfg.http_timeout);
    let notifier = Arc::new(Notifier::new(Arc::new(transport.clone()), cfg.primary_chat));
    let subscribers = Arc::new(SubscriberStore::new(
        cfg.subscribers_path.clone(),
        cfg.primary_chat,
    ));
    let source = Arc::new(HttpNoticeSource::new(
        cfg.source_url.clone(),
        cfg.origin.clone(),
        client,
        cfg.http_timeout,
    ));

    let checker = Arc::new(Checker::new(
        source,
        Notifier::new(Arc::new(transport.clone()), cfg.primary_chat),
        SeenStore::new(cfg.seen_path.clone()),
        Arc::clone(&subscribers),
        cfg.source_url.clone(),
        cfg.heartbeat_after,
        cfg.notify_every_run,
    ));

    checker.run_check(RunKind::Startup).await;
    spawn_scheduler(Arc::clone(&checker), cfg.check_interval);

    bot::run_update_loop(transport, notifier, subscribers, checker).await;
    Ok(())
}
