use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::telegram::{TelegramClient, Update};

/// Shared application state. Read-only after startup, so handlers run
/// concurrently without any locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub telegram: Arc<TelegramClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook/{secret}", post(webhook))
        .route("/setwebhook", get(set_webhook_endpoint))
        .with_state(state)
}

/// Liveness probe for the hosting platform.
async fn health() -> &'static str {
    "ok"
}

/// Receives one Telegram update. The only access control is the path
/// secret: a plain equality check, good enough at this scale.
async fn webhook(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if secret != state.config.webhook_secret {
        return (StatusCode::FORBIDDEN, "");
    }

    // Malformed or empty bodies are not errors, just updates with nothing
    // in them.
    let update: Update = serde_json::from_slice(&body).unwrap_or_default();

    let Some(msg) = update.effective_message() else {
        return (StatusCode::OK, "no message");
    };

    let chat_id = msg.chat.id;
    let text = msg.text.as_deref().unwrap_or("").trim();

    // Prefix match on purpose: "/start foo" and "/startxyz" both count.
    if text.starts_with("/start") {
        if let Err(e) = state.telegram.send_message(chat_id, "hello").await {
            error!("sendMessage to chat {} failed: {:#}", chat_id, e);
        }
    }

    (StatusCode::OK, "ok")
}

/// Manual registration trigger, useful when the first boot ran before the
/// external URL was known. Unauthenticated; the outcome only shows in logs.
async fn set_webhook_endpoint(State(state): State<AppState>) -> &'static str {
    register_webhook(&state).await;
    "setWebhook attempted (check logs)."
}

/// Register this service's webhook URL with Telegram. Safe to call
/// repeatedly; never fails the caller, the outcome is logged either way.
pub async fn register_webhook(state: &AppState) {
    let Some(external) = state.config.external_url.as_deref() else {
        warn!("External URL not set yet; skipping setWebhook. Retry later via /setwebhook.");
        return;
    };

    let url = format!(
        "{}/webhook/{}",
        external.trim_end_matches('/'),
        state.config.webhook_secret
    );

    match state.telegram.set_webhook(&url).await {
        Ok(()) => info!("setWebhook ok -> {}", url),
        Err(e) => error!("setWebhook failed: {:#}", e),
    }
}
