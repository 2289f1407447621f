mod config;
mod server;
mod telegram;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::server::AppState;
use crate::telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hookbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; a missing bot token refuses to start.
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded");
    info!("  Webhook path: /webhook/{}", config.webhook_secret);
    info!("  External URL: {}", config.external_url.as_deref().unwrap_or("(not set)"));
    info!("  Auto setWebhook: {}", config.auto_set_webhook);

    let telegram = TelegramClient::new(&config.bot_token)?;
    let state = AppState {
        config: Arc::new(config),
        telegram: Arc::new(telegram),
    };

    // Register the webhook before accepting connections, so serving never
    // depends on which request arrives first.
    if state.config.auto_set_webhook {
        server::register_webhook(&state).await;
    }

    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on {}", addr);
    axum::serve(listener, server::router(state))
        .await
        .context("Server error")?;

    Ok(())
}
