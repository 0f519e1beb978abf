use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use wiregram_client::{
    feed::{ErrorSink, FeedConfig, LogSink, UpdateFeed},
    handlers::{HandlerGroup, UpdateHandler},
    transport::HttpTransport,
};
use wiregram_core::{
    config::Config,
    schema::SchemaRegistry,
    update::Update,
};

/// Built-in handler: log every decoded update.
struct LogUpdates;

#[async_trait::async_trait]
impl UpdateHandler for LogUpdates {
    async fn handle(&self, update: Update) -> wiregram_core::Result<()> {
        info!(id = update.id, kind = ?update.kind, "update");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wiregram_core::logging::init("wiregram")?;

    let cfg = Config::load()?;
    let registry = Arc::new(SchemaRegistry::bot_api());
    let transport = Arc::new(HttpTransport::new(
        cfg.api_base.clone(),
        cfg.bot_token.clone(),
    ));

    let errors: Arc<dyn ErrorSink> = Arc::new(LogSink);
    let mut group = HandlerGroup::new(cfg.handler_concurrency, errors.clone());
    group.register(Arc::new(LogUpdates));

    let empty_backoff = cfg.empty_backoff;
    let feed = UpdateFeed::new(
        transport,
        registry,
        FeedConfig {
            limit: cfg.poll_limit,
            timeout: cfg.poll_timeout,
            allowed: cfg.allowed_updates.clone(),
        },
    )
    .with_backoff(move |_| empty_backoff)
    .with_error_sink(errors);

    // Ctrl-c asks the feed to wind down; the feed acknowledges its cursor
    // on the way out so nothing is redelivered next run.
    let cancel = feed.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            cancel.cancel();
        }
    });

    info!(kinds = cfg.allowed_updates.len(), "wiregram started");

    let (tx, rx) = mpsc::channel(cfg.poll_limit as usize);
    let consumer = tokio::spawn(Arc::new(group).run(rx));

    feed.run(tx).await?;
    consumer.await?;

    info!("wiregram stopped");
    Ok(())
}
