use std::path::Path;
use std::sync::Arc;

use secret_santa::bot::{AdminGate, Bot, BotDeps};
use secret_santa::channels::{Channel, CliChannel, TelegramChannel};
use secret_santa::config::{BotConfig, ChannelKind};
use secret_santa::draw::{self, DrawEngine, DrawScheduler, NotificationDispatcher};
use secret_santa::error::ConfigError;
use secret_santa::registration::ConversationEngine;
use secret_santa::store::{EventStore, JsonFileStore};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = BotConfig::from_env()?;

    // Must stay alive for the file writer to flush.
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("🎅 Secret Santa v{}", env!("CARGO_PKG_VERSION"));

    // ── Store ───────────────────────────────────────────────────────────
    let mut backend = JsonFileStore::new(&config.data_path);
    if let Some(dir) = &config.legacy_dir {
        backend = backend.with_legacy_dir(dir);
    }
    let store = Arc::new(EventStore::open(Arc::new(backend)).await?);
    let (participants, drawn) = store
        .read(|s| (s.profiles.len(), !s.assignments.is_empty()))
        .await;
    eprintln!("   Data: {}", config.data_path.display());
    eprintln!(
        "   Participants: {participants}{}",
        if drawn { " (draw held)" } else { "" }
    );

    // ── Channel ─────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = match config.channel {
        ChannelKind::Telegram => {
            let token = config
                .telegram_token
                .take()
                .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;
            Arc::new(TelegramChannel::new(token))
        }
        ChannelKind::Cli => Arc::new(CliChannel::new()),
    };
    if let Err(e) = channel.health_check().await {
        tracing::warn!("Channel health check failed: {}", e);
    }
    eprintln!("   Channel: {}", channel.name());

    // ── Engines ─────────────────────────────────────────────────────────
    let conversation = Arc::new(ConversationEngine::new(
        store.clone(),
        config.schedule.draw_date,
    ));
    let draws = Arc::new(DrawEngine::new(store.clone()));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        channel.clone(),
        config.gift_rules.clone(),
    ));

    // ── Scheduler ───────────────────────────────────────────────────────
    let scheduler = Arc::new(DrawScheduler::new(
        config.schedule.clone(),
        store.clone(),
        draws.clone(),
        dispatcher.clone(),
    ));
    eprintln!(
        "   Draw date: {} (UTC{})",
        scheduler.draw_date(),
        config.schedule.offset
    );
    if let Some(next) = scheduler.next_fire() {
        eprintln!("   Next draw check: {next}");
    }
    let _ticker = draw::spawn_draw_ticker(scheduler);

    if config.admins.is_empty() {
        eprintln!("   Admins: none (admin commands disabled)");
    } else {
        eprintln!("   Admins: {}", config.admins.len());
    }
    eprintln!();

    let deps = BotDeps {
        store,
        conversation,
        draws,
        dispatcher,
        gate: AdminGate::new(config.admins.iter().cloned()),
    };

    Bot::new(deps, channel).run().await?;

    Ok(())
}

/// Log to stderr, plus a daily-rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "secret-santa.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}
