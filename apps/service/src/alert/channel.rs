use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Transport that delivers a rendered notification
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver once; no retry
    async fn send(&self, message: &str) -> Result<()>;
}

/// Telegram Bot API `sendMessage`
pub struct TelegramChannel {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(api_base: &str, token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    fn name(&self) -> &str {
        "Telegram"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let form = [
            ("chat_id", self.chat_id.as_str()),
            ("text", message),
            ("parse_mode", "HTML"),
            ("disable_web_page_preview", "true"),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            // reqwest errors embed the url, which carries the bot token
            .map_err(|e| Error::NotificationFault(e.without_url().to_string()))?;

        let status = response.status();
        if status.as_u16() == 200 {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::NotificationFault(format!("HTTP {}: {}", status.as_u16(), body)))
    }
}
