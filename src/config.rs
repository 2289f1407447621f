use anyhow::{Context, Result};

/// Process-wide configuration, read from the environment once at startup.
/// Handlers receive it through shared state; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token from @BotFather. Required.
    pub bot_token: String,
    /// Secret path segment guarding the webhook endpoint.
    pub webhook_secret: String,
    /// Externally reachable base URL of this service (Render sets
    /// RENDER_EXTERNAL_URL automatically). May be absent at boot.
    pub external_url: Option<String>,
    /// Attempt webhook registration at startup.
    pub auto_set_webhook: bool,
    pub port: u16,
}

const DEFAULT_WEBHOOK_SECRET: &str = "hook";
const DEFAULT_PORT: u16 = 8000;

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Takes a lookup closure instead of touching std::env directly so tests
    // don't race on process-global environment variables.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = get("BOT_TOKEN")
            .filter(|t| !t.is_empty())
            .context("BOT_TOKEN env var is not set (get one from @BotFather)")?;

        let webhook_secret =
            get("WEBHOOK_SECRET").unwrap_or_else(|| DEFAULT_WEBHOOK_SECRET.to_string());

        let external_url = get("RENDER_EXTERNAL_URL").filter(|u| !u.is_empty());

        // Anything other than "true" (case-insensitive) disables it.
        let auto_set_webhook = get("AUTO_SET_WEBHOOK")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            bot_token,
            webhook_secret,
            external_url,
            auto_set_webhook,
            port,
        })
    }
}
