/// Alert dispatch
///
/// Formats down and certificate-expiry conditions and delivers them through
/// the configured transport. Without credentials the message is only logged.
/// Every qualifying cycle sends again: there is no retry, backoff or
/// deduplication.
pub mod channel;
pub mod message;

pub use channel::{AlertChannel, TelegramChannel};
pub use message::Alert;

use std::sync::Arc;

use tracing::{error, info};

use crate::Result;
use crate::config::NotificationConfig;

/// What happened to one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed,
    /// No transport configured, reported locally only
    LoggedOnly,
}

pub struct AlertDispatcher {
    channel: Option<Arc<dyn AlertChannel>>,
    panel_url: String,
}

impl AlertDispatcher {
    pub fn new(channel: Option<Arc<dyn AlertChannel>>, panel_url: impl Into<String>) -> Self {
        Self { channel, panel_url: panel_url.into() }
    }

    /// Telegram when token and chat id are both set, local logging otherwise
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        let channel: Option<Arc<dyn AlertChannel>> = match config.telegram_credentials() {
            Some((token, chat_id)) => Some(Arc::new(TelegramChannel::new(
                &config.api_base,
                token,
                chat_id,
                config.timeout(),
            )?)),
            None => {
                info!("Telegram is not configured - alerts will only be logged");
                None
            }
        };
        Ok(Self::new(channel, config.panel_url.clone()))
    }

    pub fn is_configured(&self) -> bool {
        self.channel.is_some()
    }

    pub async fn dispatch(&self, alert: &Alert) -> Delivery {
        let message = alert.render(&self.panel_url);

        let Some(channel) = &self.channel else {
            info!(url = alert.url(), "Alert not delivered (no transport configured):\n{message}");
            return Delivery::LoggedOnly;
        };

        match channel.send(&message).await {
            Ok(()) => {
                info!(url = alert.url(), "Notification sent to {}", channel.name());
                Delivery::Sent
            }
            Err(e) => {
                error!(url = alert.url(), "{} notification failed: {}", channel.name(), e);
                Delivery::Failed
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingChannel;
    use super::*;

    fn expiring() -> Alert {
        Alert::CertificateExpiring {
            url: "https://ok.example".into(),
            days_left: 3,
            expiry_date: "2025-01-18".into(),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_dispatcher_only_logs() {
        let dispatcher = AlertDispatcher::from_config(&NotificationConfig::default()).unwrap();
        assert!(!dispatcher.is_configured());
        assert_eq!(dispatcher.dispatch(&expiring()).await, Delivery::LoggedOnly);
    }

    #[tokio::test]
    async fn test_every_dispatch_is_sent() {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = AlertDispatcher::new(Some(channel.clone()), "http://panel");

        assert_eq!(dispatcher.dispatch(&expiring()).await, Delivery::Sent);
        assert_eq!(dispatcher.dispatch(&expiring()).await, Delivery::Sent);
        assert_eq!(channel.count(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let channel = Arc::new(RecordingChannel { fail: true, ..Default::default() });
        let dispatcher = AlertDispatcher::new(Some(channel.clone()), "http://panel");

        assert_eq!(dispatcher.dispatch(&expiring()).await, Delivery::Failed);
        assert_eq!(channel.count(), 1);
    }
}
